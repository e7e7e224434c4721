use crate::models::{CpuMode, ProfileStore};
use crate::monitor::liveness::LivenessOracle;

/// Compute the CPU mode the host should be in right now.
///
/// Starts from the default profile and raises the mode for every running
/// application that asks for more. The result never drops below the default,
/// and the oracle is not consulted for profiles that could not raise it.
pub fn effective_mode<O>(store: &ProfileStore, oracle: &mut O) -> CpuMode
where
    O: LivenessOracle + ?Sized,
{
    let mut mode = store.default_mode();

    for profile in store.profiles() {
        if mode == CpuMode::MAX {
            break;
        }
        let Some(name) = profile.name() else { continue };
        if profile.cpu_mode() > mode && oracle.is_running(name) {
            mode = profile.cpu_mode();
        }
    }

    mode
}

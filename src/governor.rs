//! CPU governor actuation through sysfs
//!
//! Discovers the present cores and writes the selected governor to
//! each of their `scaling_governor` files.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::constants::{CPU_PRESENT_FILE, CPU_SYSFS_ROOT, CPU_SYSFS_ROOT_ENV, SCALING_GOVERNOR_FILE};
use crate::models::{CpuMode, GovernorError};

/// Applies a CPU mode to a set of cores
pub trait GovernorActuator {
    /// Write `mode` to each of `cores`, stopping at the first failure
    fn apply(&mut self, mode: CpuMode, cores: &[usize]) -> Result<(), GovernorError>;
}

/// Governor control through `/sys/devices/system/cpu` (or a stand-in tree)
#[derive(Debug, Clone)]
pub struct SysfsGovernor {
    root: PathBuf,
}

impl SysfsGovernor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Use `TUNA_CPU_SYSFS` if set, else the real sysfs tree
    pub fn from_env() -> Self {
        let root = std::env::var_os(CPU_SYSFS_ROOT_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CPU_SYSFS_ROOT));
        Self::new(root)
    }

    pub fn control_file(&self, core: usize) -> PathBuf {
        self.root.join(format!("cpu{}", core)).join(SCALING_GOVERNOR_FILE)
    }

    /// Read the `present` file and list the cores it names
    pub fn read_present_cores(&self) -> Result<Vec<usize>, GovernorError> {
        let path = self.root.join(CPU_PRESENT_FILE);
        let descriptor = std::fs::read_to_string(&path)
            .map_err(|source| GovernorError::CoreRangeRead { path, source })?;
        parse_core_range(&descriptor)
    }
}

impl GovernorActuator for SysfsGovernor {
    fn apply(&mut self, mode: CpuMode, cores: &[usize]) -> Result<(), GovernorError> {
        let value = mode.as_str().as_bytes();
        for &core in cores {
            let path = self.control_file(core);
            // sysfs attributes always exist, a missing file is an error
            let result = OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(&path)
                .and_then(|mut file| file.write_all(value));
            if let Err(source) = result {
                return Err(GovernorError::ControlFile { core, path, source });
            }
        }
        Ok(())
    }
}

/// Expand a range list such as `0-7`, `0` or `0-3,6-7` into core indices.
/// Gaps stay gaps: `0-3,6-7` yields cpu0..cpu3 and cpu6, cpu7.
pub fn parse_core_range(descriptor: &str) -> Result<Vec<usize>, GovernorError> {
    let invalid = || GovernorError::CoreRangeParse(descriptor.to_string());
    let trimmed = descriptor.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let mut cores = Vec::new();
    for part in trimmed.split(',') {
        let part = part.trim();
        let (low, high) = match part.split_once('-') {
            Some((low, high)) => {
                let low: usize = low.trim().parse().map_err(|_| invalid())?;
                let high: usize = high.trim().parse().map_err(|_| invalid())?;
                (low, high)
            }
            None => {
                let core: usize = part.parse().map_err(|_| invalid())?;
                (core, core)
            }
        };
        // Ranges must ascend and must not overlap earlier ones
        if high < low || cores.last().is_some_and(|&last| low <= last) {
            return Err(invalid());
        }
        cores.extend(low..=high);
    }
    Ok(cores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    /// Build a fake cpu sysfs tree with `cores` governor files set to `initial`
    fn fake_sysfs(cores: usize, present: &str, initial: &str) -> TempDir {
        let temp_dir = tempdir().unwrap();
        fs::write(temp_dir.path().join("present"), present).unwrap();
        for core in 0..cores {
            let dir = temp_dir.path().join(format!("cpu{}", core)).join("cpufreq");
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("scaling_governor"), initial).unwrap();
        }
        temp_dir
    }

    fn read_governor(root: &Path, core: usize) -> String {
        fs::read_to_string(root.join(format!("cpu{}/cpufreq/scaling_governor", core))).unwrap()
    }

    #[test]
    fn test_parse_core_range_simple() {
        assert_eq!(parse_core_range("0-7").unwrap(), (0..8).collect::<Vec<_>>());
        assert_eq!(parse_core_range("0-7\n").unwrap().len(), 8);
        assert_eq!(parse_core_range("0-15").unwrap().len(), 16);
        assert_eq!(parse_core_range("2-5").unwrap(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_parse_core_range_single_core() {
        assert_eq!(parse_core_range("0\n").unwrap(), vec![0]);
    }

    #[test]
    fn test_parse_core_range_list() {
        assert_eq!(parse_core_range("0-3,6-7").unwrap(), vec![0, 1, 2, 3, 6, 7]);
        assert_eq!(parse_core_range("0,2,4").unwrap(), vec![0, 2, 4]);
    }

    #[test]
    fn test_parse_core_range_rejects_garbage() {
        for bad in ["", "\n", "a-b", "7-0", "0-", "-3", "0-3,,5", "0-3,2-5", "4,2"] {
            assert!(
                matches!(parse_core_range(bad), Err(GovernorError::CoreRangeParse(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_read_present_cores() {
        let sysfs = fake_sysfs(0, "0-7\n", "");
        let governor = SysfsGovernor::new(sysfs.path());
        assert_eq!(governor.read_present_cores().unwrap().len(), 8);
    }

    #[test]
    fn test_read_present_cores_missing_file() {
        let temp_dir = tempdir().unwrap();
        let governor = SysfsGovernor::new(temp_dir.path());
        assert!(matches!(
            governor.read_present_cores(),
            Err(GovernorError::CoreRangeRead { .. })
        ));
    }

    #[test]
    fn test_control_file_layout() {
        let governor = SysfsGovernor::new("/sys/devices/system/cpu");
        assert_eq!(
            governor.control_file(3),
            PathBuf::from("/sys/devices/system/cpu/cpu3/cpufreq/scaling_governor")
        );
    }

    #[test]
    fn test_apply_writes_every_core_exactly() {
        let sysfs = fake_sysfs(9, "0-7", "untouched");
        let mut governor = SysfsGovernor::new(sysfs.path());
        let cores = governor.read_present_cores().unwrap();

        governor.apply(CpuMode::Performance, &cores).unwrap();

        for core in 0..8 {
            assert_eq!(read_governor(sysfs.path(), core), "performance");
        }
        // cpu8 exists in the tree but is outside the present range
        assert_eq!(read_governor(sysfs.path(), 8), "untouched");
    }

    #[test]
    fn test_apply_overwrites_without_newline() {
        let sysfs = fake_sysfs(2, "0-1", "performance");
        let mut governor = SysfsGovernor::new(sysfs.path());

        governor.apply(CpuMode::Powersave, &[0, 1]).unwrap();

        assert_eq!(read_governor(sysfs.path(), 0), "powersave");
        assert_eq!(read_governor(sysfs.path(), 1), "powersave");
    }

    #[test]
    fn test_apply_fails_on_missing_control_file() {
        let sysfs = fake_sysfs(2, "0-3", "powersave");
        let mut governor = SysfsGovernor::new(sysfs.path());

        let err = governor.apply(CpuMode::Performance, &[0, 1, 2, 3]).unwrap_err();
        match err {
            GovernorError::ControlFile { core, .. } => assert_eq!(core, 2),
            other => panic!("unexpected error: {other}"),
        }
        // Cores before the failure were already switched
        assert_eq!(read_governor(sysfs.path(), 0), "performance");
        assert_eq!(read_governor(sysfs.path(), 1), "performance");
    }

    #[test]
    fn test_apply_skips_gaps_in_present_list() {
        let sysfs = fake_sysfs(8, "0-3,6-7\n", "untouched");
        fs::remove_dir_all(sysfs.path().join("cpu5")).unwrap();
        let mut governor = SysfsGovernor::new(sysfs.path());
        let cores = governor.read_present_cores().unwrap();

        governor.apply(CpuMode::Performance, &cores).unwrap();

        for core in [0, 1, 2, 3, 6, 7] {
            assert_eq!(read_governor(sysfs.path(), core), "performance");
        }
        // cpu4 is outside the list, cpu5 does not exist at all
        assert_eq!(read_governor(sysfs.path(), 4), "untouched");
        assert!(!sysfs.path().join("cpu5").exists());
    }

    #[test]
    fn test_apply_starts_at_lowest_present_core() {
        let sysfs = fake_sysfs(6, "2-5", "untouched");
        let mut governor = SysfsGovernor::new(sysfs.path());
        let cores = governor.read_present_cores().unwrap();

        governor.apply(CpuMode::Performance, &cores).unwrap();

        assert_eq!(read_governor(sysfs.path(), 0), "untouched");
        assert_eq!(read_governor(sysfs.path(), 1), "untouched");
        for core in 2..6 {
            assert_eq!(read_governor(sysfs.path(), core), "performance");
        }
    }
}

//! Data models module
//!
//! Defines core data structures:
//! - CpuMode: Ordered governor setting (powersave < performance)
//! - Profile / ProfileStore: Immutable configuration snapshot
//! - SysInfo: What the daemon believes the host is running
//! - DaemonSettings: Loop timings and liveness backend
//! - Error kinds for configuration and actuation failures

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_POLLING_INTERVAL, DEFAULT_QUERY_TIMEOUT, DEFAULT_RETRY_INTERVAL, GOVERNOR_PERFORMANCE,
    GOVERNOR_POWERSAVE, INTERVAL_MAX_SECS, INTERVAL_MIN_SECS,
};


/// CPU frequency-scaling mode, ordered by how much performance it requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuMode {
    #[default]
    Powersave,
    Performance,
}

impl CpuMode {
    /// Highest mode; a decision pass can stop once it gets here
    pub const MAX: CpuMode = CpuMode::Performance;

    /// Canonical governor name written to sysfs
    pub fn as_str(self) -> &'static str {
        match self {
            CpuMode::Powersave => GOVERNOR_POWERSAVE,
            CpuMode::Performance => GOVERNOR_PERFORMANCE,
        }
    }
}

/// Unrecognized names fall back to the default mode instead of failing.
impl From<&str> for CpuMode {
    fn from(value: &str) -> Self {
        match value {
            GOVERNOR_POWERSAVE => CpuMode::Powersave,
            GOVERNOR_PERFORMANCE => CpuMode::Performance,
            _ => CpuMode::default(),
        }
    }
}

impl fmt::Display for CpuMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A desired CPU mode, either for the whole host (default) or for one application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    name: Option<String>,
    cpu_mode: CpuMode,
}

impl Profile {
    /// The unnamed fallback profile
    pub fn default_profile(cpu_mode: CpuMode) -> Self {
        Self { name: None, cpu_mode }
    }

    /// A profile that applies while a process called `name` is running
    pub fn app(name: impl Into<String>, cpu_mode: CpuMode) -> Self {
        Self {
            name: Some(name.into()),
            cpu_mode,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn cpu_mode(&self) -> CpuMode {
        self.cpu_mode
    }
}

/// Immutable snapshot of the profiles read from one configuration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileStore {
    default_profile: Profile,
    /// Application profiles in file order
    profiles: Vec<Profile>,
}

impl ProfileStore {
    pub fn new(default_mode: CpuMode, profiles: Vec<Profile>) -> Self {
        Self {
            default_profile: Profile::default_profile(default_mode),
            profiles,
        }
    }

    pub fn default_profile(&self) -> &Profile {
        &self.default_profile
    }

    pub fn default_mode(&self) -> CpuMode {
        self.default_profile.cpu_mode
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }
}

impl fmt::Display for ProfileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[default] cpu_mode={}", self.default_profile.cpu_mode)?;
        for profile in &self.profiles {
            write!(
                f,
                "\n[{}] cpu_mode={}",
                profile.name().unwrap_or_default(),
                profile.cpu_mode
            )?;
        }
        Ok(())
    }
}

/// The daemon's view of the machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysInfo {
    /// Mode last written to every core (assumed still in effect)
    pub applied_cpu_mode: CpuMode,
    /// Indices of the cores listed in `present` at startup
    pub cores: Vec<usize>,
}

impl SysInfo {
    pub fn core_count(&self) -> usize {
        self.cores.len()
    }
}

/// How the daemon decides whether a process is running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LivenessBackend {
    /// Scan the process table in-process
    #[default]
    ProcessTable,
    /// Spawn `pgrep <name>` per query
    Pgrep,
}

/// Runtime settings from the optional `[daemon]` table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DaemonSettings {
    /// Sleep after a completed decide/act cycle
    pub polling_interval: Duration,
    /// Sleep after the config file could not be stat'ed
    pub retry_interval: Duration,
    pub liveness: LivenessBackend,
    /// Upper bound on a single `pgrep` run
    pub query_timeout: Duration,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            polling_interval: DEFAULT_POLLING_INTERVAL,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            liveness: LivenessBackend::default(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

impl DaemonSettings {
    /// Whether switching to `other` needs a new liveness oracle
    pub fn oracle_changed(&self, other: &DaemonSettings) -> bool {
        self.liveness != other.liveness || self.query_timeout != other.query_timeout
    }
}

/// Fatal configuration problems
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("no default profile found")]
    MissingDefault,
    #[error("{entry} is missing required field `{field}`")]
    MissingField { entry: String, field: &'static str },
    /// Note: bounds must match INTERVAL_MIN_SECS/INTERVAL_MAX_SECS in constants.rs
    #[error("Invalid {field}: {value}. Must be between 0.1 and 300.0 seconds")]
    InvalidInterval { field: &'static str, value: f64 },
}

impl ConfigError {
    /// Convert a `[daemon]` interval in seconds, rejecting out-of-range values
    pub fn check_interval(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
        if !(INTERVAL_MIN_SECS..=INTERVAL_MAX_SECS).contains(&value) {
            return Err(ConfigError::InvalidInterval { field, value });
        }
        Ok(Duration::from_secs_f64(value))
    }
}

/// Failures while discovering cores or writing governors
#[derive(Debug, thiserror::Error)]
pub enum GovernorError {
    #[error("Failed to read core range from {}: {source}", path.display())]
    CoreRangeRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid core range descriptor: {0:?}")]
    CoreRangeParse(String),
    #[error("Failed to set governor for cpu{core} ({}): {source}", path.display())]
    ControlFile {
        core: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors the decision loop cannot continue from
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("fatal configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("fatal actuation error: {0}")]
    Actuation(#[from] GovernorError),
}

//! Configuration management for daemon mode
//!
//! Handles TOML configuration parsing and validation into a
//! [`ProfileStore`] plus [`DaemonSettings`].
//!
//! ```toml
//! [default]
//! cpu_mode = "powersave"
//!
//! [[apps]]
//! name = "game"
//! cpu_mode = "performance"
//!
//! [daemon]            # optional
//! polling_interval = 2.0
//! ```

use log::warn;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::models::{ConfigError, CpuMode, DaemonSettings, LivenessBackend, Profile, ProfileStore};

/// Everything read from one configuration file
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonConfiguration {
    pub store: ProfileStore,
    pub settings: DaemonSettings,
}

/// On-disk layout, before validation
#[derive(Debug, Deserialize)]
struct RawConfiguration {
    default: Option<RawProfile>,
    apps: Option<Vec<RawProfile>>,
    #[serde(default)]
    daemon: RawDaemonSettings,
}

#[derive(Debug, Deserialize)]
struct RawProfile {
    name: Option<String>,
    cpu_mode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDaemonSettings {
    polling_interval: Option<f64>,
    retry_interval: Option<f64>,
    liveness: Option<LivenessBackend>,
    query_timeout: Option<f64>,
}

impl DaemonConfiguration {
    /// Load and validate configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Parse configuration text; `origin` is only used in error messages
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfiguration = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

        let default = raw.default.ok_or(ConfigError::MissingDefault)?;
        let default_mode = parse_cpu_mode(default.cpu_mode, "default profile")?;

        let profiles = match raw.apps {
            Some(apps) => apps
                .into_iter()
                .enumerate()
                .map(|(index, app)| parse_app_profile(index, app))
                .collect::<Result<Vec<_>, _>>()?,
            None => {
                warn!("no apps found in {}", origin.display());
                Vec::new()
            }
        };

        Ok(Self {
            store: ProfileStore::new(default_mode, profiles),
            settings: raw.daemon.validate()?,
        })
    }
}

fn parse_cpu_mode(value: Option<String>, entry: &str) -> Result<CpuMode, ConfigError> {
    value
        .map(|mode| CpuMode::from(mode.as_str()))
        .ok_or_else(|| ConfigError::MissingField {
            entry: entry.to_string(),
            field: "cpu_mode",
        })
}

fn parse_app_profile(index: usize, app: RawProfile) -> Result<Profile, ConfigError> {
    let entry = format!("apps[{}]", index);
    let name = app.name.ok_or_else(|| ConfigError::MissingField {
        entry: entry.clone(),
        field: "name",
    })?;
    let cpu_mode = parse_cpu_mode(app.cpu_mode, &format!("{} ({})", entry, name))?;
    Ok(Profile::app(name, cpu_mode))
}

impl RawDaemonSettings {
    fn validate(self) -> Result<DaemonSettings, ConfigError> {
        let defaults = DaemonSettings::default();
        let interval = |field, value: Option<f64>, fallback| match value {
            Some(secs) => ConfigError::check_interval(field, secs),
            None => Ok(fallback),
        };

        Ok(DaemonSettings {
            polling_interval: interval("polling_interval", self.polling_interval, defaults.polling_interval)?,
            retry_interval: interval("retry_interval", self.retry_interval, defaults.retry_interval)?,
            liveness: self.liveness.unwrap_or(defaults.liveness),
            query_timeout: interval("query_timeout", self.query_timeout, defaults.query_timeout)?,
        })
    }
}

/// Modification time of the config file, used for change detection
pub fn last_modified(path: &Path) -> std::io::Result<SystemTime> {
    std::fs::metadata(path)?.modified()
}

/// Check the config file can be opened for reading
pub fn ensure_readable(path: &Path) -> Result<PathBuf, ConfigError> {
    std::fs::File::open(path)
        .map(|_| path.to_path_buf())
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })
}

//! Global constants for tuna
//!
//! Centralized location for application-wide constants

use std::time::Duration;

/// Application name used in log events and CLI output
pub const APP_NAME: &str = "tuna";

/// Root of the per-core cpufreq sysfs tree
pub const CPU_SYSFS_ROOT: &str = "/sys/devices/system/cpu";

/// Environment variable that overrides [`CPU_SYSFS_ROOT`]
pub const CPU_SYSFS_ROOT_ENV: &str = "TUNA_CPU_SYSFS";

/// File (relative to the sysfs root) describing the present cores, e.g. `0-7`
pub const CPU_PRESENT_FILE: &str = "present";

/// Governor control file, relative to a `cpuK` directory
pub const SCALING_GOVERNOR_FILE: &str = "cpufreq/scaling_governor";

/// Environment variable holding the log filter directive
pub const LOG_FILTER_ENV: &str = "TUNA_LOG";

/// Log filter used when [`LOG_FILTER_ENV`] is unset or invalid
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Canonical governor names
pub const GOVERNOR_POWERSAVE: &str = "powersave";
pub const GOVERNOR_PERFORMANCE: &str = "performance";

/// Delay between two decision cycles
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(2);

/// Delay after the config file could not be stat'ed
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound on a single `pgrep` invocation
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Bounds (seconds) for every interval in the `[daemon]` table
pub const INTERVAL_MIN_SECS: f64 = 0.1;
pub const INTERVAL_MAX_SECS: f64 = 300.0;

/// Granularity at which sleeps observe the stop flag
pub const SHUTDOWN_POLL_SLICE: Duration = Duration::from_millis(100);

/// How often a running `pgrep` child is checked for completion
pub const PGREP_POLL_SLICE: Duration = Duration::from_millis(10);

/// Structured event identifiers
pub const EVENT_STARTUP: &str = "daemon_startup";
pub const EVENT_SHUTDOWN: &str = "daemon_shutdown";
pub const EVENT_CONFIG_RELOADED: &str = "config_reloaded";
pub const EVENT_MODE_CHANGED: &str = "cpu_mode_changed";
pub const EVENT_QUERY_FAILED: &str = "liveness_query_failed";
pub const EVENT_ERROR: &str = "error";

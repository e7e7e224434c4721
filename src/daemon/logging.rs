//! Structured logging for daemon events
//!
//! Events go through the `log` facade as `"<message> | <json>"`.
//! [`init_logging`] installs a tracing-subscriber fmt backend on stderr,
//! filtered by the `TUNA_LOG` environment variable.

use anyhow::Result;
use log::{debug, log, Level};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::constants::{
    APP_NAME, DEFAULT_LOG_FILTER, EVENT_CONFIG_RELOADED, EVENT_ERROR, EVENT_MODE_CHANGED,
    EVENT_QUERY_FAILED, EVENT_SHUTDOWN, EVENT_STARTUP, LOG_FILTER_ENV,
};
use crate::models::{CpuMode, ProfileStore};

/// Install the global log backend
pub fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set logger: {}", e))
}

/// Emits the daemon's structured events
#[derive(Debug, Clone, Default)]
pub struct DaemonLogger;

impl DaemonLogger {
    pub fn new() -> Self {
        Self
    }

    /// Log daemon startup event
    pub fn log_startup(&self, config_path: &Path, pid: u32, core_count: usize, applied: CpuMode) {
        let message = json!({
            "event": EVENT_STARTUP,
            "pid": pid,
            "config_path": config_path.display().to_string(),
            "core_count": core_count,
            "cpu_mode": applied,
            "version": env!("TUNA_VERSION"),
            "git_hash": env!("GIT_HASH"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(Level::Info, &format!("{} started", APP_NAME), &message);
    }

    /// Log daemon shutdown event
    pub fn log_shutdown(&self, reason: &str) {
        let message = json!({
            "event": EVENT_SHUTDOWN,
            "reason": reason,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(Level::Info, "Exiting", &message);
    }

    /// Log a configuration (re)load and list the resulting profiles
    pub fn log_config_loaded(&self, config_path: &Path, store: &ProfileStore, reloaded: bool) {
        let message = json!({
            "event": EVENT_CONFIG_RELOADED,
            "config_path": config_path.display().to_string(),
            "default_cpu_mode": store.default_mode(),
            "app_count": store.profiles().len(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let headline = if reloaded {
            "Config file updated".to_string()
        } else {
            format!("Using config file: {}", config_path.display())
        };
        self.log_structured(Level::Info, &headline, &message);
        for line in store.to_string().lines() {
            debug!("  {}", line);
        }
    }

    /// Log a governor switch across all cores
    pub fn log_mode_change(&self, from: CpuMode, to: CpuMode, core_count: usize) {
        let message = json!({
            "event": EVENT_MODE_CHANGED,
            "from": from,
            "to": to,
            "core_count": core_count,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(Level::Info, &format!("cpu mode: {} -> {}", from, to), &message);
    }

    /// Log a liveness query that could not be answered
    pub fn log_query_failure(&self, process_name: &str, error: &str) {
        let message = json!({
            "event": EVENT_QUERY_FAILED,
            "process_name": process_name,
            "error": error,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(
            Level::Warn,
            &format!("Could not query process {}, assuming not running", process_name),
            &message,
        );
    }

    /// Log error events
    pub fn log_error(&self, error_message: &str, context: Option<&str>) {
        let message = json!({
            "event": EVENT_ERROR,
            "message": error_message,
            "context": context,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(Level::Error, error_message, &message);
    }

    /// Log the time one decide/act cycle took
    pub fn log_cycle_duration(&self, elapsed: Duration) {
        debug!("Time taken: {:.6}s", elapsed.as_secs_f64());
    }

    fn log_structured(&self, level: Level, message: &str, data: &serde_json::Value) {
        log!(level, "{} | {}", message, data);
    }
}

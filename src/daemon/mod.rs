//! Daemon module: the decision loop that drives the CPU governor
//!
//! Each cycle:
//! - Re-reads the configuration when its modification time changes
//! - Asks the liveness oracle which configured applications are running
//! - Writes the resulting governor to every core, only when it changes
//!
//! The loop is single-threaded. A signal handler only sets a [`ShutdownFlag`],
//! which is checked between cycles and while sleeping.

pub mod config;
pub mod logging;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use log::info;

use crate::constants::SHUTDOWN_POLL_SLICE;
use crate::daemon::config::{last_modified, DaemonConfiguration};
use crate::daemon::logging::DaemonLogger;
use crate::governor::{GovernorActuator, SysfsGovernor};
use crate::models::{CpuMode, DaemonError, SysInfo};
use crate::monitor::{effective_mode, liveness, LivenessOracle};

/// Cooperative stop request shared with the signal handler
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag on SIGINT or SIGTERM
    pub fn register_signals(&self) -> std::io::Result<()> {
        signal_hook::flag::register(signal_hook::consts::SIGINT, self.0.clone())?;
        signal_hook::flag::register(signal_hook::consts::SIGTERM, self.0.clone())?;
        Ok(())
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` unless the flag gets set first.
    /// Returns true if the sleep was cut short.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_set() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(SHUTDOWN_POLL_SLICE.min(deadline - now));
        }
    }
}

/// All mutable daemon state
#[derive(Debug, Clone)]
pub struct DaemonState {
    pub config_path: PathBuf,
    pub config: DaemonConfiguration,
    pub sys_info: SysInfo,
    /// Modification time of the file `config` was read from
    pub last_config_change: Option<SystemTime>,
}

/// Result of the config-check step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCheck {
    Unchanged,
    Reloaded,
    /// The file could not be stat'ed; the previous configuration stays in use
    StatFailed,
}

/// What one pass of the loop did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub config: ConfigCheck,
    pub mode: CpuMode,
    /// Whether the governor files were written this cycle
    pub switched: bool,
}

pub struct Daemon {
    state: DaemonState,
    oracle: Box<dyn LivenessOracle>,
    governor: Box<dyn GovernorActuator>,
    logger: DaemonLogger,
}

/// Load the configuration, discover the cores and build the daemon.
///
/// The applied mode starts as the default profile's mode; nothing is
/// written until the effective mode differs from it.
pub fn startup(config_path: &Path, governor: SysfsGovernor, logger: DaemonLogger) -> Result<Daemon, DaemonError> {
    // Stat before reading so a write in between shows up as a change
    let last_config_change = last_modified(config_path).ok();
    let config = DaemonConfiguration::load_from_file(config_path)?;
    let cores = governor.read_present_cores()?;

    let sys_info = SysInfo {
        applied_cpu_mode: config.store.default_mode(),
        cores,
    };

    logger.log_config_loaded(config_path, &config.store, false);
    logger.log_startup(
        config_path,
        std::process::id(),
        sys_info.core_count(),
        sys_info.applied_cpu_mode,
    );

    let oracle = liveness::from_settings(&config.settings, logger.clone());
    let state = DaemonState {
        config_path: config_path.to_path_buf(),
        config,
        sys_info,
        last_config_change,
    };

    Ok(Daemon::new(state, oracle, Box::new(governor), logger))
}

impl Daemon {
    pub fn new(
        state: DaemonState,
        oracle: Box<dyn LivenessOracle>,
        governor: Box<dyn GovernorActuator>,
        logger: DaemonLogger,
    ) -> Self {
        Self {
            state,
            oracle,
            governor,
            logger,
        }
    }

    pub fn state(&self) -> &DaemonState {
        &self.state
    }

    /// Run cycles until `shutdown` is set
    pub fn run(&mut self, shutdown: &ShutdownFlag) -> Result<(), DaemonError> {
        while !shutdown.is_set() {
            let report = self.run_cycle()?;

            let settings = &self.state.config.settings;
            let delay = match report.config {
                ConfigCheck::StatFailed => settings.retry_interval,
                _ => settings.polling_interval,
            };
            shutdown.sleep(delay);
        }

        self.logger.log_shutdown("Received shutdown signal");
        Ok(())
    }

    /// One CheckConfig -> Decide -> Act pass
    pub fn run_cycle(&mut self) -> Result<CycleReport, DaemonError> {
        let start = Instant::now();

        let config = self.check_config()?;
        let mode = self.decide();
        let switched = self.act(mode)?;

        self.logger.log_cycle_duration(start.elapsed());
        Ok(CycleReport { config, mode, switched })
    }

    /// Reload the configuration if the file changed on disk
    pub fn check_config(&mut self) -> Result<ConfigCheck, DaemonError> {
        let path = &self.state.config_path;
        let modified = match last_modified(path) {
            Ok(modified) => modified,
            Err(e) => {
                self.logger.log_error(
                    &format!("Failed to stat config file {}: {}", path.display(), e),
                    Some("keeping previous configuration"),
                );
                return Ok(ConfigCheck::StatFailed);
            }
        };

        if self.state.last_config_change == Some(modified) {
            return Ok(ConfigCheck::Unchanged);
        }

        let config = DaemonConfiguration::load_from_file(path)?;
        if self.state.config.settings.oracle_changed(&config.settings) {
            info!(
                "liveness backend: {:?}, query timeout {:?}",
                config.settings.liveness, config.settings.query_timeout
            );
            self.oracle = liveness::from_settings(&config.settings, self.logger.clone());
        }

        self.logger.log_config_loaded(path, &config.store, true);
        self.state.config = config;
        self.state.last_config_change = Some(modified);
        Ok(ConfigCheck::Reloaded)
    }

    /// Compute this cycle's effective mode
    pub fn decide(&mut self) -> CpuMode {
        self.oracle.refresh();
        effective_mode(&self.state.config.store, self.oracle.as_mut())
    }

    /// Apply `mode` to every core if it differs from the applied mode.
    /// Returns whether anything was written.
    pub fn act(&mut self, mode: CpuMode) -> Result<bool, DaemonError> {
        let sys_info = &self.state.sys_info;
        let applied_cpu_mode = sys_info.applied_cpu_mode;
        if mode == applied_cpu_mode {
            return Ok(false);
        }

        self.logger
            .log_mode_change(applied_cpu_mode, mode, sys_info.core_count());
        self.governor.apply(mode, &sys_info.cores)?;
        self.state.sys_info.applied_cpu_mode = mode;
        Ok(true)
    }
}

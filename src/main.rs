#![forbid(unsafe_code)]

mod cli;

use anyhow::{Context, Result};

use tuna::daemon::config::ensure_readable;
use tuna::daemon::logging::{init_logging, DaemonLogger};
use tuna::daemon::{self, ShutdownFlag};
use tuna::governor::SysfsGovernor;

fn main() -> Result<()> {
    let config_path = cli::parse_args();

    init_logging()?;

    ensure_readable(&config_path).context("File does not exist or couldn't be read")?;

    // Set up interrupt handling before the first cycle
    let shutdown = ShutdownFlag::new();
    shutdown
        .register_signals()
        .context("Failed to register signal handlers")?;

    let logger = DaemonLogger::new();
    let mut daemon = daemon::startup(&config_path, SysfsGovernor::from_env(), logger.clone())?;

    if let Err(e) = daemon.run(&shutdown) {
        logger.log_error(&e.to_string(), Some("decision loop"));
        return Err(e.into());
    }

    Ok(())
}

use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use sysinfo::{ProcessesToUpdate, System};

use crate::constants::PGREP_POLL_SLICE;
use crate::daemon::logging::DaemonLogger;
use crate::models::{DaemonSettings, LivenessBackend};

/// Answers whether a process with a given name is currently running
pub trait LivenessOracle {
    /// Called once at the start of every decision pass
    fn refresh(&mut self) {}

    /// Never fails: an unanswerable query counts as "not running"
    fn is_running(&mut self, name: &str) -> bool;
}

/// Build the oracle selected in the `[daemon]` table
pub fn from_settings(settings: &DaemonSettings, logger: DaemonLogger) -> Box<dyn LivenessOracle> {
    match settings.liveness {
        LivenessBackend::ProcessTable => Box::new(ProcessTableOracle::new()),
        LivenessBackend::Pgrep => Box::new(PgrepOracle::new(settings.query_timeout, logger)),
    }
}

/// Scans the process table in-process, at most once per decision pass
pub struct ProcessTableOracle {
    system: System,
    stale: bool,
}

impl ProcessTableOracle {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            stale: true,
        }
    }
}

impl Default for ProcessTableOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl LivenessOracle for ProcessTableOracle {
    fn refresh(&mut self) {
        self.stale = true;
    }

    fn is_running(&mut self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        // Only pay for the scan when a pass actually needs it
        if self.stale {
            self.system.refresh_processes(ProcessesToUpdate::All, true);
            self.stale = false;
        }

        // Unanchored match, same as `pgrep <name>`
        self.system
            .processes()
            .values()
            .any(|process| process.name().to_string_lossy().contains(name))
    }
}

#[derive(Debug, thiserror::Error)]
enum QueryError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} did not finish within {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
    #[error("{program} exited with status {code}")]
    Status { program: String, code: i32 },
    #[error("{program} was terminated by a signal")]
    Signaled { program: String },
}

/// Spawns `pgrep <name>` per query; exit 0 means running
pub struct PgrepOracle {
    program: String,
    timeout: Duration,
    logger: DaemonLogger,
}

impl PgrepOracle {
    pub fn new(timeout: Duration, logger: DaemonLogger) -> Self {
        Self::with_program("pgrep", timeout, logger)
    }

    /// Use a different pgrep-compatible executable
    pub fn with_program(program: impl Into<String>, timeout: Duration, logger: DaemonLogger) -> Self {
        Self {
            program: program.into(),
            timeout,
            logger,
        }
    }

    fn query(&self, name: &str) -> Result<bool, QueryError> {
        // No shell: the name is passed as a single argument
        let mut child = Command::new(&self.program)
            .arg("--")
            .arg(name)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| QueryError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let deadline = Instant::now() + self.timeout;
        loop {
            let status = child.try_wait().map_err(|source| QueryError::Wait {
                program: self.program.clone(),
                source,
            })?;

            match status {
                Some(status) => {
                    return match status.code() {
                        Some(0) => Ok(true),
                        Some(1) => Ok(false),
                        Some(code) => Err(QueryError::Status {
                            program: self.program.clone(),
                            code,
                        }),
                        None => Err(QueryError::Signaled {
                            program: self.program.clone(),
                        }),
                    };
                }
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(QueryError::TimedOut {
                        program: self.program.clone(),
                        timeout: self.timeout,
                    });
                }
                None => std::thread::sleep(PGREP_POLL_SLICE),
            }
        }
    }
}

impl LivenessOracle for PgrepOracle {
    fn is_running(&mut self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        match self.query(name) {
            Ok(running) => running,
            Err(e) => {
                self.logger.log_query_failure(name, &e.to_string());
                false
            }
        }
    }
}

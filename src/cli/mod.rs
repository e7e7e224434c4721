//! CLI argument parsing module
//!
//! `tuna <CONFIG>`: exactly one positional argument, the configuration
//! file. Usage errors exit with status 1; `--help` and `--version` exit 0.

use clap::error::ErrorKind;
use clap::{Arg, Command};
use std::ffi::OsString;
use std::path::PathBuf;

fn command() -> Command {
    Command::new("tuna")
        .version(env!("TUNA_VERSION"))
        .about("Switch the CPU governor while configured applications are running")
        .long_about(
            "Polls the process table and sets every core's cpufreq governor to the highest \
             mode requested by a running application, falling back to the default profile. \
             The configuration file is reloaded whenever it changes on disk.",
        )
        .arg(
            Arg::new("config")
                .value_name("CONFIG")
                .help("Path to the TOML configuration file")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
}

/// Parse arguments without exiting
pub fn parse_args_from<I, T>(args: I) -> Result<PathBuf, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command().try_get_matches_from(args)?;
    matches
        .get_one::<PathBuf>("config")
        .cloned()
        .ok_or_else(|| command().error(ErrorKind::MissingRequiredArgument, "missing CONFIG"))
}

/// Parse process arguments, exiting on `--help`, `--version` or misuse
pub fn parse_args() -> PathBuf {
    match parse_args_from(std::env::args_os()) {
        Ok(path) => path,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    }
}

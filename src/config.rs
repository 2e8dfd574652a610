//! Command line configuration of the simulator binary.

use std::path::PathBuf;
use std::str::FromStr;

use color_eyre::eyre::{bail, eyre, Result};
use log::LevelFilter;

/// Environment variable holding the log level
pub const LOG_ENV: &str = "HATCHLING_LOG";

pub const USAGE: &str = "\
Usage: hatchling [OPTIONS] [PROGRAM]

Runs a Hatchling program. Without PROGRAM the program is entered word by word
on the terminal; enter -99999 to finish.

Options:
  -v, --verbose   Log every executed instruction
  -q, --quiet     Only log errors
  -h, --help      Print this help";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// File to load the program from. `None` reads it from the terminal.
    pub program: Option<PathBuf>,
    pub log_level: LevelFilter,
    pub help: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            program: None,
            log_level: LevelFilter::Warn,
            help: false,
        }
    }
}

impl Config {
    /// Builds the configuration from the process arguments and environment
    pub fn from_env() -> Result<Self> {
        Self::parse(std::env::args().skip(1), std::env::var(LOG_ENV).ok())
    }

    /// Builds the configuration from `args` (without the program name) and the
    /// value of [`LOG_ENV`]. Flags take precedence over the environment.
    pub fn parse<I>(args: I, log_env: Option<String>) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Config::default();

        if let Some(level) = log_env.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            config.log_level = LevelFilter::from_str(level)
                .map_err(|_| eyre!("Invalid log level `{}` in {}", level, LOG_ENV))?;
        }

        for arg in args {
            match arg.as_str() {
                "-v" | "--verbose" => config.log_level = LevelFilter::Debug,
                "-q" | "--quiet" => config.log_level = LevelFilter::Error,
                "-h" | "--help" => config.help = true,
                flag if flag.starts_with('-') && flag.len() > 1 => {
                    bail!("Unknown option `{}`\n\n{}", flag, USAGE)
                }
                path => {
                    if let Some(previous) = &config.program {
                        bail!(
                            "Expected a single program, got `{}` and `{}`\n\n{}",
                            previous.display(),
                            path,
                            USAGE
                        );
                    }
                    config.program = Some(PathBuf::from(path));
                }
            }
        }

        Ok(config)
    }
}

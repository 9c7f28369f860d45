//! Logger setup for the arm executables
//!
//! Every line is stamped with the session-elapsed time so that log output can
//! be lined up against the `ts` field of the telemetry records.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{self, info};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, str::FromStr};
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Logging parameters, normally found under a `[log]` table in the exec's
/// parameter file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogParams {
    /// Minimum level written by the logger, e.g. `"debug"`.
    pub level: String,

    /// Per-target overrides, e.g. `{ "comms_if::net" = "info" }`.
    pub targets: BTreeMap<String, String>,

    /// Also write to stdout, not just the session log file.
    pub stdout: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Unknown log level `{0}`")]
    InvalidLogLevel(String),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LogParams {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            targets: BTreeMap::new(),
            stdout: true,
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// # Safety
///
/// - This function must only be called once, `log` only accepts a single
///   global logger.
pub fn logger_init(
    params: &LogParams,
    session: &session::Session
) -> Result<(), LoggerInitError> {

    let min_level = parse_level(&params.level)?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {

            // Debug and trace lines carry the target so per-tick solver output
            // can be told apart from the network threads.
            if record.level() > log::Level::Info {
                out.finish(format_args!(
                    "[{:10.6} {}] {}: {}",
                    session::try_get_elapsed_seconds().unwrap_or(0.0),
                    level_to_str(record.level()),
                    record.target(),
                    message
                ))
            }
            else {
                out.finish(format_args!(
                    "[{:10.6} {}] {}",
                    session::try_get_elapsed_seconds().unwrap_or(0.0),
                    level_to_str(record.level()),
                    message
                ))
            }

        })
        .level(min_level);

    for (target, level) in params.targets.iter() {
        dispatch = dispatch.level_for(target.clone(), parse_level(level)?);
    }

    if params.stdout {
        dispatch = dispatch.chain(std::io::stdout());
    }

    let log_file = fern::log_file(session.log_file_path.clone())
        .map_err(LoggerInitError::LogFileInitError)?;

    dispatch
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Parse a level name into a filter.
fn parse_level(level: &str) -> Result<LevelFilter, LoggerInitError> {
    LevelFilter::from_str(level)
        .map_err(|_| LoggerInitError::InvalidLogLevel(level.into()))
}

/// Get the string representation of a log level
fn level_to_str(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => "TRC".dimmed().italic(),
        log::Level::Debug => "DBG".dimmed(),
        log::Level::Info  => "INF".normal(),
        log::Level::Warn  => "WRN".yellow(),
        log::Level::Error => "ERR".red().bold()
    }
}

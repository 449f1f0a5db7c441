//! Error types for the interference model.

use thiserror::Error;

use crate::time_driver::SimTime;

/// Errors raised at the boundary of the interference model.
///
/// Frame loss is never an error: a transfer that cannot be found when its PER is
/// requested is reported as PER 1 instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhyError {
    #[error("Invalid argument: transmission starts at {start} but the clock is already at {now}")]
    StartInPast { start: SimTime, now: SimTime },

    #[error("Invalid argument: transmission start {start} is not before its end {end}")]
    EmptyInterval { start: SimTime, end: SimTime },

    #[error("Unsupported configuration: mode {mode} is not supported by the {model} error rate model")]
    UnsupportedConfiguration { mode: String, model: &'static str },

    #[error("Unknown wifi mode: {0}")]
    UnknownMode(String),
}

impl PhyError {
    /// True for the errors rejected at the call boundary (bad timing arguments).
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, PhyError::StartInPast { .. } | PhyError::EmptyInterval { .. })
    }
}

/// Errors raised while loading the TOML configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

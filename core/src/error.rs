use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SweshErr>;

/// Failures raised by an [`crate::environment::Environment`].
#[derive(Debug, Error)]
pub enum EnvironmentError {
    /// The command ran past its deadline. Whatever output was captured before
    /// the deadline is kept so it can be shown to the model.
    #[error("command `{command}` timed out after {timeout:?}")]
    Timeout {
        command: String,
        timeout: Duration,
        output: String,
    },

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("i/o error while running command: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SweshErr {
    #[error("model query failed: {0}")]
    Model(String),

    #[error("no model backend is configured; pass --replay or stay in human mode")]
    NoModelConfigured,

    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error("failed to load config from {path}: {source}")]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid whitelist pattern `{pattern}`: {source}")]
    InvalidWhitelistPattern {
        pattern: String,
        source: regex_lite::Error,
    },

    #[error("invalid prompt template `{name}`: {source}")]
    Template {
        name: &'static str,
        source: minijinja::Error,
    },

    #[error("failed to read replay file {path}: {source}")]
    ReplayFile {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The session was cancelled by the user. Not a fault; the step loop maps
    /// it to the `Interrupted` exit status.
    #[error("session interrupted by user")]
    Interrupted,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SweshErr {
    /// Identifying name reported as the session exit status on fatal errors.
    pub fn name(&self) -> &'static str {
        match self {
            SweshErr::Model(_) => "ModelError",
            SweshErr::NoModelConfigured => "NoModelConfigured",
            SweshErr::Environment(EnvironmentError::Timeout { .. }) => "ExecutionTimeoutError",
            SweshErr::Environment(_) => "EnvironmentError",
            SweshErr::Config { .. } => "ConfigError",
            SweshErr::InvalidWhitelistPattern { .. } => "InvalidWhitelistPattern",
            SweshErr::Template { .. } => "TemplateError",
            SweshErr::ReplayFile { .. } => "ReplayFileError",
            SweshErr::Interrupted => "Interrupted",
            SweshErr::Io(_) => "IoError",
        }
    }
}

use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("Failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` failed ({status}): {output}")]
    CommandFailed {
        program: String,
        status: ExitStatus,
        output: String,
    },

    #[error("`{program}` timed out after {timeout:?}: {output}")]
    Timeout {
        program: String,
        timeout: Duration,
        /// Exit status after the kill, if the child could be reaped
        status: Option<ExitStatus>,
        output: String,
    },

    #[error("Metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP server error: {0}")]
    Server(String),
}

impl ExporterError {
    /// True for failures of an external diagnostic tool (not found, nonzero exit, timeout).
    pub fn is_execution_failure(&self) -> bool {
        matches!(
            self,
            Self::Spawn { .. } | Self::CommandFailed { .. } | Self::Timeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ExporterError>;

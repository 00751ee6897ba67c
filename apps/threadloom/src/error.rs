//! # Application Errors
//!
//! Engine faults pass through unchanged; the variants added here cover
//! configuration, files and the async runtime.

use thiserror::Error;
use threadloom_core::ThreadError;

#[derive(Debug, Error)]
pub enum AppError {
    /// A fault raised by the reconciliation engine.
    #[error(transparent)]
    Thread(#[from] ThreadError),

    /// An engine fault tied to one input file.
    #[error("{path}: {source}")]
    File {
        path: String,
        #[source]
        source: ThreadError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    /// A worker task failed or was cancelled.
    #[error("task failed: {0}")]
    Task(String),

    #[error("server error: {0}")]
    Server(String),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

//! Error handling for extraction, statistics, and operation dispatch.
//!
//! Every failure a library caller can observe is a distinct variant so the
//! top-level entry point can decide how to report it. Nothing in the library
//! terminates the process.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PopdataError {
    #[error("Source file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("No data rows survived header/footer filtering in: {path}")]
    EmptyResult { path: PathBuf },

    #[error("I/O failure on {path}: {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown function: {name}")]
    UnknownOperation { name: String },

    #[error("Invalid arguments for {operation}: {reason}")]
    InvalidArguments { operation: String, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid table in {path}: {reason}")]
    InvalidTable { path: PathBuf, reason: String },

    #[error("No row labelled '{label}' in {path}")]
    LabelNotFound { label: String, path: PathBuf },

    #[error("Request to {endpoint} failed: {source}")]
    Generate {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Generate endpoint {endpoint} returned status {status}")]
    GenerateStatus { endpoint: String, status: u16 },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl PopdataError {
    /// Classify an I/O error raised while touching `path`.
    ///
    /// A missing file becomes [`PopdataError::NotFound`]; everything else is
    /// an [`PopdataError::IoFailure`] carrying the original cause.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::IoFailure { path, source }
        }
    }

    pub fn invalid_arguments(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// True for conditions caused by the input data rather than the environment
    pub fn is_data_condition(&self) -> bool {
        matches!(
            self,
            Self::EmptyResult { .. } | Self::InvalidTable { .. } | Self::LabelNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PopdataError>;

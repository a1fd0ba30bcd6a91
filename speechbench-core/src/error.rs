//! Error types for the benchmark data pipeline
//!
//! Covers configuration, task selection, feature I/O and
//! sequence-matching input errors.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for all pipeline operations
#[derive(Debug, Error)]
pub enum BenchError {
    // ========== Configuration Errors ==========

    /// Manifest for a requested split does not exist
    #[error("Manifest for split '{split}' not found at {}", path.display())]
    SplitNotFound { split: String, path: PathBuf },

    /// Manifest exists but could not be parsed
    #[error("Malformed manifest {}: {reason}", path.display())]
    ManifestInvalid { path: PathBuf, reason: String },

    /// Task needs an auxiliary directory that was not configured
    #[error("`{name}` must be provided for task '{task}'")]
    MissingAuxiliaryPath { task: String, name: &'static str },

    /// Numeric option outside its accepted range
    #[error("Invalid range for `{name}`: {value}, {expected} is the appropriate range")]
    InvalidRange {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },

    /// Any other invalid configuration value
    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    // ========== Task Errors ==========

    /// Unknown task keyword
    #[error("Unsupported task: '{task}'")]
    UnsupportedTask { task: String },

    /// Unknown split keyword
    #[error("Unsupported split: '{split}'")]
    UnsupportedSplit { split: String },

    /// Task cannot be built for the requested split
    #[error("Task '{task}' cannot be built for split '{split}': {reason}")]
    InvalidTaskSplit {
        task: String,
        split: String,
        reason: String,
    },

    // ========== I/O Errors ==========

    /// Referenced feature or label file is missing
    #[error("Feature file not found: {}", path.display())]
    FeatureNotFound { path: PathBuf },

    /// File exists but could not be decoded
    #[error("Failed to read {}: {reason}", path.display())]
    ReadFailed { path: PathBuf, reason: String },

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ========== Input Errors ==========

    /// Malformed input to a pure operation
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Bucket index past the end of the dataset
    #[error("Bucket index {index} out of range for {len} buckets")]
    IndexOutOfRange { index: usize, len: usize },

    // ========== Loader Errors ==========

    /// Data exhausted (end of epoch)
    #[error("Data exhausted for current epoch")]
    DataExhausted,

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BenchError {
    /// Returns true if this error comes from a misconfigured experiment
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BenchError::SplitNotFound { .. }
                | BenchError::ManifestInvalid { .. }
                | BenchError::MissingAuxiliaryPath { .. }
                | BenchError::InvalidRange { .. }
                | BenchError::Configuration { .. }
                | BenchError::UnsupportedTask { .. }
                | BenchError::UnsupportedSplit { .. }
                | BenchError::InvalidTaskSplit { .. }
        )
    }

    /// Returns true if this error was raised while reading sample files
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            BenchError::FeatureNotFound { .. }
                | BenchError::ReadFailed { .. }
                | BenchError::Io(_)
        )
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, BenchError>;

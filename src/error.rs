//! Error types for portprobe.
//!
//! Uses `thiserror` for ergonomic error definitions.

use std::path::PathBuf;
use thiserror::Error;

/// Scan-level error.
///
/// Individual probe failures never surface here; they are encoded as a
/// [`PortStatus`](crate::scanner::PortStatus) on each result. The only
/// condition a scan reports as an error is its governing context ending
/// before aggregation finished.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanError {
    #[error("scan cancelled")]
    Cancelled,

    #[error("scan deadline exceeded")]
    DeadlineExceeded,
}

/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors raised while loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid configuration format: {0}")]
    InvalidFormat(String),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

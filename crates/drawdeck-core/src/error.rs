//! Error types shared across the core.

use thiserror::Error;

/// Errors produced by core operations.
///
/// Every operation returns either a success payload or exactly one of these;
/// the transport layer decides how to represent them on the wire.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A cross-field constraint was violated (bad element type, filename
    /// suffix, malformed patch value, ...).
    #[error("validation error: {0}")]
    Validation(String),
    /// A referenced element or group id does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Writing through the document sink failed.
    #[error("io error: {0}")]
    Io(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

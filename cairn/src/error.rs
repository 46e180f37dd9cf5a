//! Error and result types for spatial index operations.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in spatial indexing operations
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A query or insert argument does not match the index dimension.
    #[error("Dimension mismatch: index is {expected}-dimensional, argument is {actual}-dimensional")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A per-node lock could not be acquired within the configured timeout.
    #[error("Lock wait exceeded {timeout:?} for node {region}")]
    LockTimeout { region: String, timeout: Duration },

    /// A valid node identifier is referenced by the index but has no entry
    /// in storage. Distinct from a plain storage miss, which is not an error.
    #[error("Node missing from storage: {0}")]
    NodeNotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("Storage is disposed")]
    Disposed,
}

/// Result type for spatial operations
pub type SpatialResult<T> = Result<T, SpatialError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_display() {
        let err = SpatialError::DimensionMismatch {
            expected: 2,
            actual: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("2-dimensional"));
        assert!(msg.contains("3-dimensional"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing file");
        let err: SpatialError = io_err.into();
        assert!(matches!(err, SpatialError::Io(_)));
    }

    #[test]
    fn test_lock_timeout_display() {
        let err = SpatialError::LockTimeout {
            region: "[0, 0] .. [1, 1]".to_string(),
            timeout: Duration::from_secs(1),
        };
        assert!(err.to_string().contains("Lock wait exceeded"));
    }
}

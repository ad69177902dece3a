//! Error types and handling infrastructure for stagehand.
//!
//! Every failure that leaves the library is one of the variants below. Each
//! variant carries the offending location, path, or pattern together with the
//! underlying message, so a failure can be diagnosed without re-deriving its
//! context.
//!
//! Failures reported by a remote client cross the [`crate::backend`] seam as a
//! boxed error and are always wrapped here; they are never passed through raw.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for stagehand operations.
#[derive(Error, Debug)]
pub enum StagehandError {
    /// Access mode outside the fixed set of read/write/append modes
    #[error("Unsupported mode: {mode}; must be one of {}", crate::file_handler::SUPPORTED_MODES.join(", "))]
    UnsupportedMode { mode: String },

    /// Scheme has no handler for the requested direction
    #[error("Unsupported protocol: {scheme} in {location}")]
    UnsupportedProtocol { scheme: String, location: String },

    /// A cache operation resolved outside the cache root
    #[error("Cannot access {}; details: {message}", path.display())]
    InvalidAccess { path: PathBuf, message: String },

    /// A reclamation pattern could not be parsed
    #[error("Invalid pattern {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Local unlink or remote delete failed
    #[error("Error deleting {location}; details: {message}")]
    DeleteError { location: String, message: String },

    /// The remote store rejected a get or put
    #[error("Object store error for {location}: {message}")]
    ObjectStoreError { location: String, message: String },

    /// The session pool factory could not build a client
    #[error("Failed to construct remote client: {message}")]
    ClientConstruction { message: String },

    /// File system related errors (file not found, permission denied, etc.)
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

/// Standard Result type for stagehand operations.
pub type Result<T> = std::result::Result<T, StagehandError>;

/// Error type produced by remote clients and client factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

impl StagehandError {
    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    /// Create a ConfigError with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Wrap a remote client failure for the given source or destination
    pub fn object_store(location: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::ObjectStoreError {
            location: location.into(),
            message: error.to_string(),
        }
    }

    /// Wrap any delete failure for the given location
    pub fn delete(location: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::DeleteError {
            location: location.into(),
            message: error.to_string(),
        }
    }

    pub fn invalid_access(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidAccess {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn unsupported_protocol(scheme: impl Into<String>, location: impl Into<String>) -> Self {
        Self::UnsupportedProtocol {
            scheme: scheme.into(),
            location: location.into(),
        }
    }
}

impl From<std::io::Error> for StagehandError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileError {
                message: "File not found".to_string(),
                source: err,
            },
            std::io::ErrorKind::PermissionDenied => Self::FileError {
                message: "Permission denied".to_string(),
                source: err,
            },
            _ => Self::FileError {
                message: "IO operation failed".to_string(),
                source: err,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let mode = StagehandError::UnsupportedMode {
            mode: "rw".to_string(),
        };
        assert_eq!(
            mode.to_string(),
            "Unsupported mode: rw; must be one of r, rb, rt, w, wb, wt, a, ab, at"
        );

        let access = StagehandError::invalid_access("/etc/passwd", "outside of the cache");
        assert_eq!(
            access.to_string(),
            "Cannot access /etc/passwd; details: outside of the cache"
        );

        let delete = StagehandError::delete("s3://bucket/key", "AccessDenied");
        assert_eq!(
            delete.to_string(),
            "Error deleting s3://bucket/key; details: AccessDenied"
        );

        let protocol = StagehandError::unsupported_protocol("ftp", "ftp://host/file");
        assert_eq!(
            protocol.to_string(),
            "Unsupported protocol: ftp in ftp://host/file"
        );
    }

    #[test]
    fn test_object_store_wraps_message() {
        let err = StagehandError::object_store("bucket/key", "NoSuchKey");
        match err {
            StagehandError::ObjectStoreError { location, message } => {
                assert_eq!(location, "bucket/key");
                assert_eq!(message, "NoSuchKey");
            }
            other => panic!("Expected ObjectStoreError, got {other:?}"),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: StagehandError = io_err.into();

        match err {
            StagehandError::FileError { message, .. } => {
                assert_eq!(message, "File not found");
            }
            _ => panic!("Expected FileError variant"),
        }
    }
}

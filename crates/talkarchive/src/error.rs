//! Error types for talkarchive.
//!
//! This module defines all error types used throughout the talkarchive crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for talkarchive operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Reference Errors ===
    /// Two reference definitions share a label but point at different targets.
    #[error("duplicate label [{label}]: defined as '{first}' and again as '{second}'")]
    DuplicateLabel {
        /// The (normalized) label.
        label: String,
        /// Target of the first definition.
        first: String,
        /// Target of the conflicting definition.
        second: String,
    },

    /// A link names a label that the document never defines.
    #[error("missing reference: label [{label}] is not defined")]
    MissingReference {
        /// The label as written in the entry.
        label: String,
    },

    /// A relative-path target does not exist on disk.
    #[error("missing asset: {}", path.display())]
    MissingAsset {
        /// The path as it was looked up.
        path: PathBuf,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Archive Errors ===
    /// A path given to the archive loader does not exist.
    #[error("not found: {}", path.display())]
    NotFound {
        /// The path that was looked up.
        path: PathBuf,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to read a document.
    #[error("failed to read {}: {source}", path.display())]
    FileRead {
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for talkarchive operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a missing reference error.
    #[must_use]
    pub fn missing_reference(label: impl Into<String>) -> Self {
        Self::MissingReference {
            label: label.into(),
        }
    }

    /// Create a duplicate label error.
    #[must_use]
    pub fn duplicate_label(
        label: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self::DuplicateLabel {
            label: label.into(),
            first: first.into(),
            second: second.into(),
        }
    }

    /// Create a file read error.
    #[must_use]
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Check if this error is a dangling reference.
    #[must_use]
    pub fn is_missing_reference(&self) -> bool {
        matches!(self, Self::MissingReference { .. })
    }

    /// Check if this error is a label collision.
    #[must_use]
    pub fn is_duplicate_label(&self) -> bool {
        matches!(self, Self::DuplicateLabel { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_reference_display() {
        let err = Error::missing_reference("3");
        assert_eq!(
            err.to_string(),
            "missing reference: label [3] is not defined"
        );
        assert!(err.is_missing_reference());
        assert!(!err.is_duplicate_label());
    }

    #[test]
    fn test_duplicate_label_display() {
        let err = Error::duplicate_label("1", "https://a.example/", "https://b.example/");
        let msg = err.to_string();
        assert!(msg.contains("[1]"));
        assert!(msg.contains("https://a.example/"));
        assert!(msg.contains("https://b.example/"));
        assert!(err.is_duplicate_label());
    }

    #[test]
    fn test_missing_asset_display() {
        let err = Error::MissingAsset {
            path: PathBuf::from("docs/2025/qemu/qemu-docker.pdf"),
        };
        assert!(err.to_string().contains("qemu-docker.pdf"));
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::NotFound {
            path: PathBuf::from("/nonexistent/docs"),
        };
        assert_eq!(err.to_string(), "not found: /nonexistent/docs");
    }

    #[test]
    fn test_file_read_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::file_read("/root/index.md", io_err);
        let msg = err.to_string();
        assert!(msg.contains("/root/index.md"));
        assert!(msg.contains("access denied"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "separators must not be empty".to_string(),
        };
        assert!(err.to_string().contains("separators"));
    }
}

//! Error types for carecode.
//!
//! This module defines all error types used throughout the carecode crate.
//! Write-path errors (issue, extend, revoke) are specific, since the caller
//! there is the authenticated owner. Read-path (validation) failures are
//! folded into the single opaque [`Error::InvalidOrExpired`] variant so that
//! an untrusted caller cannot enumerate codes.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for carecode operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
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

    // === Aggregation Errors ===
    /// An origin document collection failed to read.
    ///
    /// Aggregation is fail-closed: a partial bundle would misstate what a
    /// recipient believes is "everything", so one failed collection fails
    /// the whole call.
    #[error("failed to aggregate documents from '{collection}': {source}")]
    Aggregation {
        /// Name of the origin collection that failed.
        collection: &'static str,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    // === Sharing (write-path) Errors ===
    /// The owner has no documents to share.
    #[error("no documents available to share for this owner")]
    EmptyBundle,

    /// Code generation failed to find an unused value after bounded retries.
    #[error("could not generate a unique access code after {attempts} attempts")]
    CollisionExhausted {
        /// Number of attempts made.
        attempts: u32,
    },

    /// No grant exists for the given code.
    #[error("no access grant found for code '{code}'")]
    GrantNotFound {
        /// The presented code.
        code: String,
    },

    /// The grant exists but is expired or revoked.
    #[error("access grant '{code}' is no longer active")]
    GrantInactive {
        /// The presented code.
        code: String,
    },

    // === Validation (read-path) Errors ===
    /// The single opaque validation failure.
    ///
    /// Deliberately indistinguishable between "code never existed",
    /// "expired", "revoked", "identity mismatch", and "rate limited".
    #[error("invalid or expired code")]
    InvalidOrExpired,

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for carecode operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a grant-not-found error.
    #[must_use]
    pub fn grant_not_found(code: impl Into<String>) -> Self {
        Self::GrantNotFound { code: code.into() }
    }

    /// Create a grant-inactive error.
    #[must_use]
    pub fn grant_inactive(code: impl Into<String>) -> Self {
        Self::GrantInactive { code: code.into() }
    }

    /// Create an aggregation error for the named origin collection.
    #[must_use]
    pub fn aggregation(collection: &'static str, source: rusqlite::Error) -> Self {
        Self::Aggregation { collection, source }
    }

    /// Check if this error is the opaque validation failure.
    #[must_use]
    pub fn is_invalid_or_expired(&self) -> bool {
        matches!(self, Self::InvalidOrExpired)
    }

    /// Check if this error is the empty-bundle rejection.
    #[must_use]
    pub fn is_empty_bundle(&self) -> bool {
        matches!(self, Self::EmptyBundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidOrExpired;
        assert_eq!(err.to_string(), "invalid or expired code");

        let err = Error::EmptyBundle;
        assert_eq!(
            err.to_string(),
            "no documents available to share for this owner"
        );
    }

    #[test]
    fn test_opaque_failure_reveals_nothing() {
        // The opaque variant must not carry the presented code or any cause.
        let msg = Error::InvalidOrExpired.to_string();
        assert!(!msg.contains("revoked"));
        assert!(!msg.contains("not found"));
    }

    #[test]
    fn test_error_is_invalid_or_expired() {
        assert!(Error::InvalidOrExpired.is_invalid_or_expired());
        assert!(!Error::EmptyBundle.is_invalid_or_expired());
    }

    #[test]
    fn test_error_is_empty_bundle() {
        assert!(Error::EmptyBundle.is_empty_bundle());
        assert!(!Error::InvalidOrExpired.is_empty_bundle());
    }

    #[test]
    fn test_grant_not_found_display() {
        let err = Error::grant_not_found("ABCD2345");
        assert!(err.to_string().contains("ABCD2345"));
    }

    #[test]
    fn test_grant_inactive_display() {
        let err = Error::grant_inactive("ABCD2345");
        let msg = err.to_string();
        assert!(msg.contains("ABCD2345"));
        assert!(msg.contains("no longer active"));
    }

    #[test]
    fn test_collision_exhausted_display() {
        let err = Error::CollisionExhausted { attempts: 5 };
        assert!(err.to_string().contains('5'));
    }

    #[test]
    fn test_internal_error() {
        let err = Error::internal("something went wrong");
        assert_eq!(err.to_string(), "internal error: something went wrong");
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
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_aggregation_error_names_collection() {
        let err = Error::aggregation("directives", rusqlite::Error::InvalidQuery);
        assert!(err.to_string().contains("directives"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "invalid code length".to_string(),
        };
        assert!(err.to_string().contains("invalid code length"));
    }
}

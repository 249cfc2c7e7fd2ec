//! Unified application error types for BlockVault.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. The [`ErrorKind`] is the stable,
//! caller-facing classification; the message is human readable and the
//! boxed source never crosses the process boundary.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// An upload carried zero bytes.
    EmptyPayload,
    /// The principal does not have enough remaining quota.
    QuotaExceeded,
    /// The principal does not own the requested file.
    AccessDenied,
    /// Unknown file id, content address, version, or principal.
    NotFound,
    /// The file is encrypted and no key was supplied.
    KeyRequired,
    /// Authentication tag mismatch on decrypt (tampered data or wrong key).
    IntegrityError,
    /// The blob store is unreachable or timed out. Retryable.
    StorageUnavailable,
    /// The metadata store failed.
    PersistenceError,
    /// Caller input is malformed.
    Validation,
    /// The content is already the current content of another file record.
    DuplicateContent,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "EMPTY_PAYLOAD"),
            Self::QuotaExceeded => write!(f, "QUOTA_EXCEEDED"),
            Self::AccessDenied => write!(f, "ACCESS_DENIED"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::KeyRequired => write!(f, "KEY_REQUIRED"),
            Self::IntegrityError => write!(f, "INTEGRITY_ERROR"),
            Self::StorageUnavailable => write!(f, "STORAGE_UNAVAILABLE"),
            Self::PersistenceError => write!(f, "PERSISTENCE_ERROR"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::DuplicateContent => write!(f, "DUPLICATE_CONTENT"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout BlockVault.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an empty-payload error.
    pub fn empty_payload(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EmptyPayload, message)
    }

    /// Create a quota-exceeded error.
    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::QuotaExceeded, message)
    }

    /// Create an access-denied error.
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccessDenied, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a key-required error.
    pub fn key_required(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::KeyRequired, message)
    }

    /// Create an integrity error.
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IntegrityError, message)
    }

    /// Create a storage-unavailable error.
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StorageUnavailable, message)
    }

    /// Create a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PersistenceError, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a duplicate-content error.
    pub fn duplicate_content(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateContent, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether the caller may retry the same operation unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::StorageUnavailable
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_stable_kind() {
        let err = AppError::quota_exceeded("Storage quota exceeded");
        assert_eq!(err.to_string(), "QUOTA_EXCEEDED: Storage quota exceeded");
    }

    #[test]
    fn test_only_storage_unavailable_is_retryable() {
        assert!(AppError::storage_unavailable("daemon down").is_retryable());
        assert!(!AppError::persistence("db down").is_retryable());
        assert!(!AppError::integrity("bad tag").is_retryable());
    }

    #[test]
    fn test_clone_drops_source() {
        let io = std::io::Error::other("boom");
        let err = AppError::with_source(ErrorKind::Internal, "wrapped", io);
        let cloned = err.clone();
        assert_eq!(cloned.kind, ErrorKind::Internal);
        assert!(cloned.source.is_none());
    }
}

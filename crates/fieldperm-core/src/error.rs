//! Error types for fieldperm operations.
//!
//! This module provides a common `Error` type and `Result<T>` alias used across
//! all fieldperm crates. Uses `thiserror` for derive macros.
//!
//! A field being hidden from a caller is never an error: it is the normal
//! outcome of filtering. The variants here describe defects the caller must
//! fix (missing wiring, broken predicates, malformed input).

use thiserror::Error;

/// Boxed error produced by a permission predicate.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in fieldperm operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Integration or configuration defect, e.g. no request context wired in.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A permission predicate failed while being evaluated.
    #[error("Permission check failed for field '{field}': {source}")]
    PermissionCheck {
        /// Name of the field whose check failed.
        field: String,
        /// Underlying predicate failure.
        #[source]
        source: BoxError,
    },

    /// A required attribute was absent from the instance being serialized.
    #[error("Attribute '{path}' not found for field '{field}'")]
    MissingAttribute {
        /// Name of the output field.
        field: String,
        /// Source path that was looked up.
        path: String,
    },

    /// Invalid data or format.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid data error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Wrap a predicate failure with the name of the field it guards.
    pub fn permission_check(field: impl Into<String>, source: BoxError) -> Self {
        Self::PermissionCheck {
            field: field.into(),
            source,
        }
    }

    /// Create a missing attribute error.
    pub fn missing_attribute(field: impl Into<String>, path: impl Into<String>) -> Self {
        Self::MissingAttribute {
            field: field.into(),
            path: path.into(),
        }
    }

    /// Error raised when a representation pass has no request context.
    pub fn missing_request() -> Self {
        Self::config(
            "Request context not available. Install one with \
             `fieldperm_core::scope::with_request` (or `sync_with_request`), \
             or pass it explicitly via `SerializerContext::with_request`.",
        )
    }

    /// Returns true if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this wraps a failing permission predicate.
    pub fn is_permission_check(&self) -> bool {
        matches!(self, Self::PermissionCheck { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias using fieldperm's Error type.
pub type Result<T> = std::result::Result<T, Error>;

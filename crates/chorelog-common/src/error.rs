//! Common error types used throughout chorelog.
//!
//! This module provides a unified error type covering the failure cases of
//! the record/contributor API: unknown ids, field-level validation failures,
//! name conflicts, database errors, and object storage failures.

use std::collections::BTreeMap;

use serde::Serialize;

/// Field-level validation messages, keyed by field name.
///
/// Serializes as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Create an empty set of field errors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field.
    pub fn add<F: Into<String>, M: Into<String>>(&mut self, field: F, message: M) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Builder-style variant of [`add`](Self::add).
    pub fn with<F: Into<String>, M: Into<String>>(mut self, field: F, message: M) -> Self {
        self.add(field, message);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for a field, if any.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Turn the collected messages into `Err(Error::Validation)` if any exist.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Common error type for chorelog.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// One or more request fields failed validation.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// A uniqueness constraint rejected the write.
    #[error("Conflict on {field}: {message}")]
    Conflict { field: String, message: String },

    /// A database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// The object store could not be reached or rejected the request.
    #[error("Storage unavailable: {0}")]
    Storage(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error with a single field message.
    pub fn field<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation(FieldErrors::new().with(field, message))
    }

    /// Create a new Conflict error.
    pub fn conflict<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Conflict {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new Database error.
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }

    /// Create a new Storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status code this error maps to.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) | Self::Conflict { .. } => 400,
            Self::Storage(_) => 502,
            Self::Database(_) | Self::Io(_) | Self::Internal(_) => 500,
        }
    }

    /// Field-level messages for client errors, if this is one.
    ///
    /// Conflicts are reported against the field that collided, the same way a
    /// validation failure would be.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            Self::Validation(errors) => Some(errors.clone()),
            Self::Conflict { field, message } => {
                Some(FieldErrors::new().with(field.as_str(), message.as_str()))
            }
            _ => None,
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

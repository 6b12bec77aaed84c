//! Error taxonomy for the data access layer.
//!
//! Validation and not-found conditions are always detected before a mutating
//! statement leaves the process. Store failures are passed through unchanged;
//! this layer never retries.

use std::fmt;

use thiserror::Error;

use crate::services::StoreError;

/// Errors surfaced to callers of the repository and the statement builders.
#[derive(Debug, Error)]
pub enum DataError {
    /// Malformed caller input. Never retried.
    #[error("validation error on '{identifier}': {message}")]
    Validation { identifier: String, message: String },

    /// A referenced entity or relational target does not exist.
    #[error("{kind} not found: {identifier}")]
    NotFound { kind: String, identifier: String },

    /// The deterministic identity of a new entity is already taken.
    #[error("{kind} already exists: {identifier}")]
    Conflict { kind: String, identifier: String },

    /// The store executor failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DataError {
    pub fn validation(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        DataError::Validation {
            identifier: identifier.into(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: impl fmt::Display, identifier: impl Into<String>) -> Self {
        DataError::NotFound {
            kind: kind.to_string(),
            identifier: identifier.into(),
        }
    }

    pub fn conflict(kind: impl fmt::Display, identifier: impl Into<String>) -> Self {
        DataError::Conflict {
            kind: kind.to_string(),
            identifier: identifier.into(),
        }
    }

    /// True for input problems the caller has to fix before trying again.
    pub fn is_validation(&self) -> bool {
        matches!(self, DataError::Validation { .. })
    }
}

/// Result alias used throughout the crate.
pub type DataResult<T> = Result<T, DataError>;

/// A row read back from the store that lacks a structurally required field.
///
/// Never returned to callers: the row is dropped and the violation logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintViolation {
    pub iri: Option<String>,
    pub field: &'static str,
    pub reason: &'static str,
}

impl ConstraintViolation {
    pub fn new(iri: Option<&str>, field: &'static str, reason: &'static str) -> Self {
        Self {
            iri: iri.map(str::to_string),
            field,
            reason,
        }
    }

    /// Emit the violation as a warning.
    pub fn log(&self, database: Option<&str>) {
        tracing::warn!(
            database = database.unwrap_or("-"),
            iri = self.iri.as_deref().unwrap_or("<unknown>"),
            field = self.field,
            "CONSTRAINT-VIOLATION: {}",
            self
        );
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} '{}'; skipping",
            self.iri.as_deref().unwrap_or("<unknown>"),
            self.reason,
            self.field
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_identifier() {
        let err = DataError::not_found("software", "1234");
        assert_eq!(err.to_string(), "software not found: 1234");

        let err = DataError::validation("mac_address", "value must not be empty");
        assert!(err.is_validation());
        assert!(err.to_string().contains("mac_address"));
    }

    #[test]
    fn test_constraint_violation_display() {
        let violation = ConstraintViolation::new(Some("http://x#Software-1"), "id", "missing field");
        assert_eq!(
            violation.to_string(),
            "http://x#Software-1 missing field 'id'; skipping"
        );
    }
}

//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Identity attribute that must be unique across all accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniqueField {
    Email,
    Username,
    EmployeeId,
}

impl core::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            UniqueField::Email => "email",
            UniqueField::Username => "username",
            UniqueField::EmployeeId => "employee_id",
        })
    }
}

/// Domain-level error.
///
/// Every variant is a deterministic decision (validation, uniqueness,
/// lifecycle, authorization). Nothing here is transient, so callers never
/// retry on a `DomainError`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or missing input (e.g. absent email/username).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Duplicate email, username or employee id.
    #[error("{field} '{value}' is already in use")]
    UniquenessConflict { field: UniqueField, value: String },

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced account, profile or grant does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The acting account failed a decision-layer check.
    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),

    /// A status change outside the allowed lifecycle.
    #[error("invalid status transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    /// An internal consistency rule was broken.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(field: UniqueField, value: impl Into<String>) -> Self {
        Self::UniquenessConflict {
            field,
            value: value.into(),
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn denied(msg: impl Into<String>) -> Self {
        Self::AuthorizationDenied(msg.into())
    }

    pub fn transition(from: impl core::fmt::Display, to: impl core::fmt::Display) -> Self {
        Self::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }
}

//! Directory error model.

use thiserror::Error;

use gala_auth::{AccountError, AccountStatus, AuthzError, PasswordError};
use gala_core::DomainError;

/// Why an authentication attempt failed.
///
/// The variants are distinct for logging; callers should show every one of
/// them to end users with the same message.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationError {
    #[error("invalid email or password")]
    UnknownAccount,

    #[error("invalid email or password")]
    InvalidPassword,

    /// Credentials were right but the account may not sign in.
    #[error("invalid email or password")]
    NotActive(AccountStatus),
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    #[error("password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    /// The backing store is unusable (e.g. a poisoned lock).
    #[error("storage failure: {0}")]
    Storage(String),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

impl DirectoryError {
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            DirectoryError::Domain(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.domain(), Some(DomainError::NotFound { .. }))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self.domain(), Some(DomainError::AuthorizationDenied(_)))
    }
}

impl From<PasswordError> for DirectoryError {
    fn from(value: PasswordError) -> Self {
        match value {
            PasswordError::TooShort { .. } => DirectoryError::Domain(DomainError::validation(value.to_string())),
            PasswordError::Hashing(err) => DirectoryError::Hashing(err),
        }
    }
}

impl From<AccountError> for DirectoryError {
    fn from(value: AccountError) -> Self {
        match value {
            AccountError::Domain(err) => DirectoryError::Domain(err),
            AccountError::Password(err) => err.into(),
        }
    }
}

impl From<AuthzError> for DirectoryError {
    fn from(value: AuthzError) -> Self {
        DirectoryError::Domain(value.into())
    }
}

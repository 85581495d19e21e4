//! Password hashing (bcrypt).

use thiserror::Error;

/// Rules applied when a password is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    /// bcrypt work factor (4..=31).
    pub cost: u32,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password must be at least {min_length} characters")]
    TooShort { min_length: usize },

    #[error("password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

/// Stored password credential.
///
/// An account created without a password gets an unusable credential that
/// never verifies.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PasswordHash(Option<String>);

impl PasswordHash {
    pub fn hash(raw: &str, policy: &PasswordPolicy) -> Result<Self, PasswordError> {
        if raw.chars().count() < policy.min_length {
            return Err(PasswordError::TooShort {
                min_length: policy.min_length,
            });
        }
        Ok(Self(Some(bcrypt::hash(raw.as_bytes(), policy.cost)?)))
    }

    pub fn unusable() -> Self {
        Self(None)
    }

    pub fn is_usable(&self) -> bool {
        self.0.is_some()
    }

    pub fn verify(&self, raw: &str) -> Result<bool, PasswordError> {
        match &self.0 {
            Some(hash) => Ok(bcrypt::verify(raw.as_bytes(), hash)?),
            None => Ok(false),
        }
    }
}

impl core::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.0 {
            Some(_) => f.write_str("PasswordHash(<redacted>)"),
            None => f.write_str("PasswordHash(<unusable>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: PasswordPolicy = PasswordPolicy {
        min_length: 8,
        cost: 4,
    };

    #[test]
    fn hash_verifies_only_the_original_password() {
        let hash = PasswordHash::hash("correct horse", &FAST).unwrap();
        assert!(hash.is_usable());
        assert!(hash.verify("correct horse").unwrap());
        assert!(!hash.verify("Correct horse").unwrap());
    }

    #[test]
    fn short_passwords_are_rejected() {
        let err = PasswordHash::hash("short", &FAST).unwrap_err();
        assert!(matches!(err, PasswordError::TooShort { min_length: 8 }));
    }

    #[test]
    fn unusable_never_verifies() {
        assert!(!PasswordHash::unusable().verify("").unwrap());
        assert!(!PasswordHash::unusable().is_usable());
    }

    #[test]
    fn debug_output_hides_the_hash() {
        let hash = PasswordHash::hash("correct horse", &FAST).unwrap();
        assert_eq!(format!("{hash:?}"), "PasswordHash(<redacted>)");
    }
}

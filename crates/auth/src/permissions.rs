use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use gala_core::{DomainError, DomainResult};

/// Name of a custom permission (e.g. "export_reports").
///
/// Names are opaque and compared exactly: case matters and there is no
/// wildcard or hierarchy between names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionName(Cow<'static, str>);

impl PermissionName {
    pub const MAX_LEN: usize = 100;

    /// Validate and wrap a permission name. The name is stored verbatim.
    pub fn new(name: impl Into<Cow<'static, str>>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("permission name cannot be empty"));
        }
        if name.chars().count() > Self::MAX_LEN {
            return Err(DomainError::validation(format!(
                "permission name exceeds {} characters",
                Self::MAX_LEN
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, name: &str) -> bool {
        self.as_str() == name
    }
}

impl TryFrom<String> for PermissionName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PermissionName> for String {
    fn from(value: PermissionName) -> Self {
        value.0.into_owned()
    }
}

impl core::fmt::Display for PermissionName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_is_exact_and_case_sensitive() {
        let name = PermissionName::new("export_reports").unwrap();
        assert!(name.matches("export_reports"));
        assert!(!name.matches("Export_Reports"));
        assert!(!name.matches("export_reports "));
        assert!(!name.matches("export_*"));
        assert!(!name.matches("*"));
    }

    #[test]
    fn blank_and_oversized_names_are_rejected() {
        assert!(PermissionName::new("").is_err());
        assert!(PermissionName::new("   ").is_err());
        assert!(PermissionName::new("x".repeat(101)).is_err());
        assert!(PermissionName::new("x".repeat(100)).is_ok());
    }

    #[test]
    fn deserialization_validates() {
        assert!(serde_json::from_str::<PermissionName>("\"\"").is_err());
        let name: PermissionName = serde_json::from_str("\"validate_tickets\"").unwrap();
        assert_eq!(name.as_str(), "validate_tickets");
    }
}

//! Account status lifecycle.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use gala_core::{DomainError, DomainResult};

/// Eligibility state of an account.
///
/// Only [`AccountStatus::Active`] accounts may authenticate or act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Inactive,
    Suspended,
    /// Awaiting approval; the initial state for normal registration.
    #[default]
    Pending,
}

/// How status changes are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Only the lifecycle edges in [`AccountStatus::can_transition_to`].
    #[default]
    Strict,
    /// Any status may be set from any status.
    Permissive,
}

impl AccountStatus {
    pub const ALL: [AccountStatus; 4] = [
        AccountStatus::Active,
        AccountStatus::Inactive,
        AccountStatus::Suspended,
        AccountStatus::Pending,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Inactive => "INACTIVE",
            AccountStatus::Suspended => "SUSPENDED",
            AccountStatus::Pending => "PENDING",
        }
    }

    /// Eligible to authenticate and act.
    pub const fn is_active(self) -> bool {
        matches!(self, AccountStatus::Active)
    }

    /// Strict lifecycle edges:
    ///
    /// - Pending -> Active (approval), Pending -> Inactive (rejection)
    /// - Active <-> Suspended
    /// - Active/Suspended -> Inactive (offboarding)
    ///
    /// Inactive is terminal.
    pub const fn can_transition_to(self, to: AccountStatus) -> bool {
        use AccountStatus::*;
        matches!(
            (self, to),
            (Pending, Active)
                | (Pending, Inactive)
                | (Active, Suspended)
                | (Suspended, Active)
                | (Active, Inactive)
                | (Suspended, Inactive)
        )
    }

    /// Validate a change to `to` under `policy` and return the new status.
    pub fn transition(self, to: AccountStatus, policy: TransitionPolicy) -> DomainResult<AccountStatus> {
        match policy {
            TransitionPolicy::Permissive => Ok(to),
            TransitionPolicy::Strict if self.can_transition_to(to) => Ok(to),
            TransitionPolicy::Strict => Err(DomainError::transition(self, to)),
        }
    }
}

impl FromStr for AccountStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountStatus::ALL
            .into_iter()
            .find(|status| status.code() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown status code '{s}'")))
    }
}

impl core::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TransitionPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(TransitionPolicy::Strict),
            "permissive" => Ok(TransitionPolicy::Permissive),
            other => Err(DomainError::validation(format!(
                "unknown transition policy '{other}' (expected 'strict' or 'permissive')"
            ))),
        }
    }
}

//! Authorization decision layer.
//!
//! - No IO
//! - No panics
//! - No mutation
//!
//! Every check fails closed: a subject whose status is not Active is denied
//! before its role or grants are looked at.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gala_core::{AccountId, DomainError};

use crate::{AccessSubject, AccountStatus, Principal, Role};

/// Role-based capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Any HR role (HR Assistant and above).
    HrStaff,
    /// Create, edit, suspend accounts and manage grants.
    ManageUsers,
    /// Approve or reject pending registrations.
    ApproveUsers,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::HrStaff,
        Capability::ManageUsers,
        Capability::ApproveUsers,
    ];

    pub const fn required_role(self) -> Role {
        match self {
            Capability::HrStaff => Role::HrAssistant,
            Capability::ManageUsers => Role::HrManager,
            Capability::ApproveUsers => Role::HrAdmin,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Capability::HrStaff => "hr-staff",
            Capability::ManageUsers => "manage-users",
            Capability::ApproveUsers => "approve-users",
        }
    }
}

impl FromStr for Capability {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown capability '{s}'")))
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn has_capability<S: AccessSubject + ?Sized>(subject: &S, capability: Capability) -> bool {
    subject.status().is_active() && subject.role().at_least(capability.required_role())
}

pub fn is_hr_staff<S: AccessSubject + ?Sized>(subject: &S) -> bool {
    has_capability(subject, Capability::HrStaff)
}

pub fn can_manage_users<S: AccessSubject + ?Sized>(subject: &S) -> bool {
    has_capability(subject, Capability::ManageUsers)
}

pub fn can_approve_users<S: AccessSubject + ?Sized>(subject: &S) -> bool {
    has_capability(subject, Capability::ApproveUsers)
}

/// True iff the principal is Active and holds a grant named exactly `name`
/// that is valid at `now`.
pub fn has_custom_permission(principal: &Principal, name: &str, now: DateTime<Utc>) -> bool {
    principal.status.is_active()
        && principal
            .grants()
            .iter()
            .any(|g| g.permission().matches(name) && g.is_valid(now))
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("account is {status}, only active accounts may act")]
    NotActive { status: AccountStatus },

    #[error("requires role {required} or higher (has {actual})")]
    InsufficientRole { required: Role, actual: Role },

    #[error("missing permission '{0}'")]
    MissingPermission(String),

    #[error("{0}")]
    Forbidden(String),
}

impl From<AuthzError> for DomainError {
    fn from(value: AuthzError) -> Self {
        DomainError::denied(value.to_string())
    }
}

/// Require `capability`, naming the first failed condition.
pub fn authorize<S: AccessSubject + ?Sized>(subject: &S, capability: Capability) -> Result<(), AuthzError> {
    let status = subject.status();
    if !status.is_active() {
        return Err(AuthzError::NotActive { status });
    }
    let required = capability.required_role();
    let actual = subject.role();
    if !actual.at_least(required) {
        return Err(AuthzError::InsufficientRole { required, actual });
    }
    Ok(())
}

/// Require a valid custom permission.
pub fn authorize_permission(principal: &Principal, name: &str, now: DateTime<Utc>) -> Result<(), AuthzError> {
    if !principal.status.is_active() {
        return Err(AuthzError::NotActive {
            status: principal.status,
        });
    }
    if has_custom_permission(principal, name, now) {
        Ok(())
    } else {
        Err(AuthzError::MissingPermission(name.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision explanation (audit trail)
// ─────────────────────────────────────────────────────────────────────────────

/// What a decision was asked about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Check {
    Capability(Capability),
    Permission(String),
}

/// Why a decision came out the way it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionExplanation {
    pub account_id: AccountId,
    pub check: Check,
    pub granted: bool,
    pub reason: String,
    pub role: Role,
    pub status: AccountStatus,
    pub required_role: Option<Role>,
    /// Grants valid at `evaluated_at`, sorted.
    pub valid_permissions: Vec<String>,
    pub evaluated_at: DateTime<Utc>,
}

/// Evaluate `check` at `now` and explain the outcome. The outcome always
/// agrees with [`authorize`] / [`authorize_permission`].
pub fn explain(principal: &Principal, check: &Check, now: DateTime<Utc>) -> DecisionExplanation {
    let (outcome, required_role) = match check {
        Check::Capability(capability) => (authorize(principal, *capability), Some(capability.required_role())),
        Check::Permission(name) => (authorize_permission(principal, name, now), None),
    };

    let reason = match (&outcome, check) {
        (Ok(()), Check::Capability(capability)) => format!(
            "role {} meets the {} requirement for '{}'",
            principal.role,
            capability.required_role(),
            capability
        ),
        (Ok(()), Check::Permission(name)) => format!("holds a valid grant for '{name}'"),
        (Err(err), _) => err.to_string(),
    };

    DecisionExplanation {
        account_id: principal.account_id,
        check: check.clone(),
        granted: outcome.is_ok(),
        reason,
        role: principal.role,
        status: principal.status,
        required_role,
        valid_permissions: principal
            .valid_permissions(now)
            .into_iter()
            .map(String::from)
            .collect(),
        evaluated_at: now,
    }
}

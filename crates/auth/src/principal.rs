use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use gala_core::{AccountId, Entity};

use crate::{Account, AccountStatus, PermissionGrant, PermissionName, Role, valid_permission_names};

/// Anything whose role and status can be checked by the decision layer.
pub trait AccessSubject {
    fn role(&self) -> Role;
    fn status(&self) -> AccountStatus;
}

impl AccessSubject for Account {
    fn role(&self) -> Role {
        Account::role(self)
    }

    fn status(&self) -> AccountStatus {
        Account::status(self)
    }
}

/// A fully resolved principal for authorization decisions: a snapshot of an
/// account's role and status plus its permission grants.
///
/// Building a principal does no IO; the directory loads the account and
/// grants and hands them over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub account_id: AccountId,
    pub role: Role,
    pub status: AccountStatus,
    grants: Vec<PermissionGrant>,
}

impl Principal {
    /// Grants belonging to other accounts are dropped.
    pub fn new(account: &Account, grants: impl IntoIterator<Item = PermissionGrant>) -> Self {
        let account_id = account.id();
        Self {
            account_id,
            role: account.role(),
            status: account.status(),
            grants: grants
                .into_iter()
                .filter(|g| g.account_id() == account_id)
                .collect(),
        }
    }

    pub fn without_grants(account: &Account) -> Self {
        Self::new(account, Vec::new())
    }

    pub fn grants(&self) -> &[PermissionGrant] {
        &self.grants
    }

    /// Names of grants valid at `now` (ignores account status).
    pub fn valid_permissions(&self, now: DateTime<Utc>) -> BTreeSet<PermissionName> {
        valid_permission_names(&self.grants, self.account_id, now)
    }
}

impl AccessSubject for Principal {
    fn role(&self) -> Role {
        self.role
    }

    fn status(&self) -> AccountStatus {
        self.status
    }
}

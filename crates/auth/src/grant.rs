//! Custom permission grants: named, time-bounded, revocable capabilities
//! attached to an account outside the role hierarchy.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gala_core::{AccountId, Entity, GrantId};

use crate::PermissionName;

/// A custom permission granted to one account.
///
/// `granted_at` never changes after issue. The only mutations are toggling
/// `is_active`, moving `expires_at`, and clearing `granted_by` when the
/// granting account is deleted. Expired grants are kept as history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    id: GrantId,
    account_id: AccountId,
    permission: PermissionName,
    description: String,
    is_active: bool,
    granted_by: Option<AccountId>,
    granted_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl PermissionGrant {
    /// Issue a new, active grant. `granted_by` is stored as given.
    pub fn issue(
        account_id: AccountId,
        permission: PermissionName,
        description: impl Into<String>,
        granted_by: Option<AccountId>,
        granted_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: GrantId::new(),
            account_id,
            permission,
            description: description.into(),
            is_active: true,
            granted_by,
            granted_at,
            expires_at,
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn permission(&self) -> &PermissionName {
        &self.permission
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn granted_by(&self) -> Option<AccountId> {
        self.granted_by
    }

    pub fn granted_at(&self) -> DateTime<Utc> {
        self.granted_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Expired once `now` reaches `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Active and not expired at `now`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now)
    }

    /// Deactivate. Returns `false` when the grant was already inactive.
    pub fn revoke(&mut self) -> bool {
        core::mem::replace(&mut self.is_active, false)
    }

    /// Reactivate. Returns `false` when the grant was already active.
    pub fn reactivate(&mut self) -> bool {
        !core::mem::replace(&mut self.is_active, true)
    }

    /// Extend, shorten or remove the expiry.
    pub fn set_expiry(&mut self, expires_at: Option<DateTime<Utc>>) {
        self.expires_at = expires_at;
    }

    /// Drop the back-reference to a deleted granter.
    pub fn clear_granter(&mut self) {
        self.granted_by = None;
    }
}

impl Entity for PermissionGrant {
    type Id = GrantId;

    fn id(&self) -> GrantId {
        self.id
    }
}

/// Names of the grants on `account_id` that are valid at `now`.
pub fn valid_permission_names<'a, I>(
    grants: I,
    account_id: AccountId,
    now: DateTime<Utc>,
) -> BTreeSet<PermissionName>
where
    I: IntoIterator<Item = &'a PermissionGrant>,
{
    grants
        .into_iter()
        .filter(|g| g.account_id == account_id && g.is_valid(now))
        .map(|g| g.permission.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn name(s: &'static str) -> PermissionName {
        PermissionName::new(s).unwrap()
    }

    fn grant_expiring(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> PermissionGrant {
        PermissionGrant::issue(AccountId::new(), name("export_reports"), "", None, now, expires_at)
    }

    #[test]
    fn new_grants_are_active() {
        let now = Utc::now();
        let grant = grant_expiring(None, now);
        assert!(grant.is_active());
        assert_eq!(grant.granted_at(), now);
        assert!(grant.is_valid(now + Duration::days(3650)));
    }

    #[test]
    fn expiry_is_strict() {
        let now = Utc::now();
        let grant = grant_expiring(Some(now + Duration::hours(1)), now);
        assert!(grant.is_valid(now));
        assert!(grant.is_valid(now + Duration::minutes(59)));
        assert!(!grant.is_valid(now + Duration::hours(1)));
        assert!(!grant.is_valid(now + Duration::hours(2)));
        // Expired but still active: kept as history.
        assert!(grant.is_active());
    }

    #[test]
    fn revoke_is_idempotent() {
        let now = Utc::now();
        let mut grant = grant_expiring(None, now);
        assert!(grant.revoke());
        assert!(!grant.revoke());
        assert!(!grant.is_active());
        assert!(!grant.is_valid(now));
        assert!(grant.reactivate());
        assert!(grant.is_valid(now));
    }

    #[test]
    fn valid_names_filter_by_account_and_validity() {
        let now = Utc::now();
        let owner = AccountId::new();
        let other = AccountId::new();
        let mut revoked = PermissionGrant::issue(owner, name("validate_tickets"), "", None, now, None);
        revoked.revoke();
        let grants = vec![
            PermissionGrant::issue(owner, name("export_reports"), "", None, now, None),
            PermissionGrant::issue(owner, name("export_reports"), "", None, now, None),
            PermissionGrant::issue(owner, name("manage_agenda"), "", None, now, Some(now - Duration::seconds(1))),
            PermissionGrant::issue(other, name("approve_companies"), "", None, now, None),
            revoked,
        ];

        let names: Vec<String> = valid_permission_names(&grants, owner, now)
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(names, vec!["export_reports".to_string()]);
    }

    proptest! {
        #[test]
        fn validity_matches_definition(
            active in any::<bool>(),
            offset_secs in proptest::option::of(-7200i64..7200),
        ) {
            let now = Utc::now();
            let mut grant = grant_expiring(offset_secs.map(|s| now + Duration::seconds(s)), now);
            if !active {
                grant.revoke();
            }
            let expected = active && offset_secs.is_none_or(|s| s > 0);
            prop_assert_eq!(grant.is_valid(now), expected);
        }
    }
}

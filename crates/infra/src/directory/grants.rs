//! Permission grant lifecycle.
//!
//! Grants are never deleted on expiry; they stay in the history returned by
//! [`AccountDirectory::grants_for`]. Callers are expected to have checked
//! `can_manage_users` before issuing or revoking (see [`crate::AdminService`]).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::info;

use gala_auth::{PermissionGrant, PermissionName, has_custom_permission};
use gala_core::{AccountId, Entity, GrantId};
use gala_events::EventBus;

use super::AccountDirectory;
use crate::error::DirectoryResult;
use crate::events::DirectoryEnvelope;

impl<B> AccountDirectory<B> {
    pub fn grant_by_id(&self, id: GrantId) -> DirectoryResult<PermissionGrant> {
        self.read(|s| Ok(s.grant(id)?.clone()))
    }

    /// Every grant issued to the account, including revoked and expired
    /// ones, oldest first.
    pub fn grants_for(&self, account_id: AccountId) -> DirectoryResult<Vec<PermissionGrant>> {
        self.read(|s| {
            s.account(account_id)?;
            Ok(s.grants_of(account_id).into_iter().cloned().collect())
        })
    }

    /// Names of the account's grants that are active and unexpired at `now`.
    pub fn list_valid(&self, account_id: AccountId, now: DateTime<Utc>) -> DirectoryResult<BTreeSet<PermissionName>> {
        Ok(self.principal(account_id)?.valid_permissions(now))
    }

    /// Decision-layer check against a fresh snapshot. Fails closed for
    /// accounts that are not Active.
    pub fn has_custom_permission(&self, account_id: AccountId, name: &str, now: DateTime<Utc>) -> DirectoryResult<bool> {
        let principal = self.principal(account_id)?;
        Ok(has_custom_permission(&principal, name, now))
    }
}

impl<B> AccountDirectory<B>
where
    B: EventBus<DirectoryEnvelope>,
{
    /// Issue a new active grant. Identical grants are not merged.
    pub fn grant(
        &self,
        account_id: AccountId,
        permission: PermissionName,
        description: &str,
        granted_by: Option<AccountId>,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DirectoryResult<PermissionGrant> {
        let grant = PermissionGrant::issue(account_id, permission, description, granted_by, now, expires_at);
        let grant = self.commit(|s| Ok(s.insert_grant(grant)?))?;

        info!(
            grant_id = %grant.id(),
            account_id = %account_id,
            permission = %grant.permission(),
            "permission granted"
        );
        Ok(grant)
    }

    /// Deactivate the grant. Revoking an already inactive grant succeeds and
    /// changes nothing.
    pub fn revoke(&self, grant_id: GrantId, now: DateTime<Utc>) -> DirectoryResult<PermissionGrant> {
        let grant = self.commit(|s| Ok(s.revoke_grant(grant_id, now)?))?;

        info!(
            grant_id = %grant_id,
            account_id = %grant.account_id(),
            permission = %grant.permission(),
            "permission revoked"
        );
        Ok(grant)
    }

    pub fn reactivate(&self, grant_id: GrantId, now: DateTime<Utc>) -> DirectoryResult<PermissionGrant> {
        let grant = self.commit(|s| Ok(s.reactivate_grant(grant_id, now)?))?;

        info!(grant_id = %grant_id, permission = %grant.permission(), "permission reactivated");
        Ok(grant)
    }

    /// Extend, shorten or remove the expiry.
    pub fn set_expiry(
        &self,
        grant_id: GrantId,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DirectoryResult<PermissionGrant> {
        let grant = self.commit(|s| Ok(s.set_grant_expiry(grant_id, expires_at, now)?))?;

        info!(grant_id = %grant_id, expires_at = ?expires_at, "permission expiry changed");
        Ok(grant)
    }
}

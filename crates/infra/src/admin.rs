//! Guarded administrative operations.
//!
//! Each operation loads the acting account, checks its capability and the
//! escalation rules, and applies the change inside the same transaction, so a
//! role or status change of the actor cannot slip in between check and write.
//!
//! Escalation rules:
//! - an actor never changes their own role or status,
//! - an actor never acts on an account ranked above them,
//! - an actor never assigns a role above their own.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use gala_auth::{
    Account, AccountStatus, AuthzError, Capability, PermissionGrant, PermissionName, Principal, Role,
    authorize,
};
use gala_core::{AccountId, DomainError, Entity, GrantId};
use gala_events::{EventBus, InMemoryEventBus};

use crate::directory::AccountDirectory;
use crate::error::DirectoryResult;
use crate::events::DirectoryEnvelope;
use crate::store::DirectoryState;

pub struct AdminService<'a, B = InMemoryEventBus<DirectoryEnvelope>> {
    directory: &'a AccountDirectory<B>,
}

fn guard_target(actor: &Principal, target: &Account) -> Result<(), AuthzError> {
    if actor.account_id == target.id() {
        return Err(AuthzError::Forbidden(
            "cannot change your own role or status".to_string(),
        ));
    }
    if target.role() > actor.role {
        return Err(AuthzError::Forbidden(format!(
            "target account is {}, above your role {}",
            target.role(),
            actor.role
        )));
    }
    Ok(())
}

impl<'a, B> AdminService<'a, B>
where
    B: EventBus<DirectoryEnvelope>,
{
    pub fn new(directory: &'a AccountDirectory<B>) -> Self {
        Self { directory }
    }

    /// Check `capability` for `actor` and run `work` in one transaction.
    /// Denials are logged.
    fn guarded<T, F>(&self, action: &'static str, actor: AccountId, capability: Capability, work: F) -> DirectoryResult<T>
    where
        F: FnOnce(&mut DirectoryState, &Principal) -> DirectoryResult<T>,
    {
        let result = self.directory.commit(|s| {
            let principal = s.principal(actor)?;
            authorize(&principal, capability)?;
            work(s, &principal)
        });

        match &result {
            Ok(_) => info!(actor = %actor, action, "admin action applied"),
            Err(err) if err.is_denied() => warn!(actor = %actor, action, error = %err, "admin action denied"),
            Err(_) => {}
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn move_status(
        &self,
        action: &'static str,
        actor: AccountId,
        target: AccountId,
        capability: Capability,
        expected: &[AccountStatus],
        to: AccountStatus,
        now: DateTime<Utc>,
    ) -> DirectoryResult<Account> {
        let policy = self.directory.config().transitions;

        self.guarded(action, actor, capability, |s, principal| {
            let account = s.account(target)?;
            guard_target(principal, account)?;

            let from = account.status();
            if !expected.contains(&from) {
                return Err(DomainError::transition(from, to).into());
            }
            Ok(s.change_status(target, to, policy, Some(actor), now)?)
        })
    }

    /// Pending -> Active. Requires `can_approve_users`.
    pub fn approve(&self, actor: AccountId, target: AccountId, now: DateTime<Utc>) -> DirectoryResult<Account> {
        self.move_status(
            "approve",
            actor,
            target,
            Capability::ApproveUsers,
            &[AccountStatus::Pending],
            AccountStatus::Active,
            now,
        )
    }

    /// Pending -> Inactive. Requires `can_approve_users`.
    pub fn reject(&self, actor: AccountId, target: AccountId, now: DateTime<Utc>) -> DirectoryResult<Account> {
        self.move_status(
            "reject",
            actor,
            target,
            Capability::ApproveUsers,
            &[AccountStatus::Pending],
            AccountStatus::Inactive,
            now,
        )
    }

    /// Active -> Suspended. Requires `can_manage_users`.
    pub fn suspend(&self, actor: AccountId, target: AccountId, now: DateTime<Utc>) -> DirectoryResult<Account> {
        self.move_status(
            "suspend",
            actor,
            target,
            Capability::ManageUsers,
            &[AccountStatus::Active],
            AccountStatus::Suspended,
            now,
        )
    }

    /// Suspended -> Active. Requires `can_manage_users`.
    pub fn reinstate(&self, actor: AccountId, target: AccountId, now: DateTime<Utc>) -> DirectoryResult<Account> {
        self.move_status(
            "reinstate",
            actor,
            target,
            Capability::ManageUsers,
            &[AccountStatus::Suspended],
            AccountStatus::Active,
            now,
        )
    }

    /// Active or Suspended -> Inactive. Requires `can_manage_users`.
    pub fn deactivate(&self, actor: AccountId, target: AccountId, now: DateTime<Utc>) -> DirectoryResult<Account> {
        self.move_status(
            "deactivate",
            actor,
            target,
            Capability::ManageUsers,
            &[AccountStatus::Active, AccountStatus::Suspended],
            AccountStatus::Inactive,
            now,
        )
    }

    /// Requires `can_manage_users`; `role` may not exceed the actor's own.
    pub fn change_role(
        &self,
        actor: AccountId,
        target: AccountId,
        role: Role,
        now: DateTime<Utc>,
    ) -> DirectoryResult<Account> {
        self.guarded("change_role", actor, Capability::ManageUsers, |s, principal| {
            guard_target(principal, s.account(target)?)?;
            if role > principal.role {
                return Err(AuthzError::Forbidden(format!(
                    "cannot assign {role}, above your role {}",
                    principal.role
                ))
                .into());
            }
            Ok(s.change_role(target, role, Some(actor), now)?)
        })
    }

    /// Issue a grant recorded as given by `actor`. Requires `can_manage_users`.
    pub fn grant_permission(
        &self,
        actor: AccountId,
        target: AccountId,
        permission: PermissionName,
        description: &str,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DirectoryResult<PermissionGrant> {
        self.guarded("grant_permission", actor, Capability::ManageUsers, |s, _| {
            let grant = PermissionGrant::issue(target, permission, description, Some(actor), now, expires_at);
            Ok(s.insert_grant(grant)?)
        })
    }

    /// Requires `can_manage_users`.
    pub fn revoke_permission(&self, actor: AccountId, grant_id: GrantId, now: DateTime<Utc>) -> DirectoryResult<PermissionGrant> {
        self.guarded("revoke_permission", actor, Capability::ManageUsers, |s, _| {
            Ok(s.revoke_grant(grant_id, now)?)
        })
    }

    /// Pending registrations, newest first. Requires HR staff.
    pub fn pending_registrations(&self, actor: AccountId) -> DirectoryResult<Vec<Account>> {
        let principal = self.directory.principal(actor)?;
        authorize(&principal, Capability::HrStaff)?;
        self.directory.pending_accounts()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use gala_auth::{NewAccount, PasswordPolicy};

    use super::*;
    use crate::config::DirectoryConfig;
    use crate::error::DirectoryError;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn directory() -> AccountDirectory {
        AccountDirectory::in_memory(DirectoryConfig {
            password: PasswordPolicy { min_length: 8, cost: 4 },
            ..DirectoryConfig::default()
        })
    }

    fn member(dir: &AccountDirectory, name: &str, role: Role, status: AccountStatus) -> AccountId {
        dir.create_account(
            NewAccount::new(format!("{name}@example.com"), name)
                .with_role(role)
                .with_status(status),
            now(),
        )
        .unwrap()
        .id()
    }

    fn assert_denied(result: DirectoryResult<impl core::fmt::Debug>) {
        match result {
            Err(err) => assert!(err.is_denied(), "expected denial, got {err:?}"),
            Ok(value) => panic!("expected denial, got {value:?}"),
        }
    }

    #[test]
    fn hr_admin_approves_and_rejects() {
        let dir = directory();
        let admin = member(&dir, "admin", Role::HrAdmin, AccountStatus::Active);
        let a = member(&dir, "a", Role::Employee, AccountStatus::Pending);
        let b = member(&dir, "b", Role::Employee, AccountStatus::Pending);
        let service = AdminService::new(&dir);

        assert_eq!(service.approve(admin, a, now()).unwrap().status(), AccountStatus::Active);
        assert_eq!(service.reject(admin, b, now()).unwrap().status(), AccountStatus::Inactive);
    }

    #[test]
    fn hr_manager_cannot_approve() {
        let dir = directory();
        let manager = member(&dir, "manager", Role::HrManager, AccountStatus::Active);
        let pending = member(&dir, "p", Role::Employee, AccountStatus::Pending);

        assert_denied(AdminService::new(&dir).approve(manager, pending, now()));
        assert_eq!(dir.account(pending).unwrap().status(), AccountStatus::Pending);
    }

    #[test]
    fn approving_a_non_pending_account_is_a_transition_error() {
        let dir = directory();
        let admin = member(&dir, "admin", Role::HrAdmin, AccountStatus::Active);
        let active = member(&dir, "a", Role::Employee, AccountStatus::Active);

        let err = AdminService::new(&dir).approve(admin, active, now()).unwrap_err();

        assert!(matches!(
            err,
            DirectoryError::Domain(DomainError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn suspended_admin_is_denied_everything() {
        let dir = directory();
        let admin = member(&dir, "admin", Role::SuperAdmin, AccountStatus::Active);
        let target = member(&dir, "t", Role::Employee, AccountStatus::Active);
        let service = AdminService::new(&dir);

        dir.set_status(admin, AccountStatus::Suspended, None, now()).unwrap();

        assert_denied(service.suspend(admin, target, now()));
        assert_denied(service.change_role(admin, target, Role::HrAssistant, now()));
        assert_denied(service.grant_permission(
            admin,
            target,
            PermissionName::new("export_reports").unwrap(),
            "",
            None,
            now(),
        ));
        assert_denied(service.pending_registrations(admin));
    }

    #[test]
    fn no_escalation_above_own_role() {
        let dir = directory();
        let manager = member(&dir, "manager", Role::HrManager, AccountStatus::Active);
        let employee = member(&dir, "e", Role::Employee, AccountStatus::Active);
        let admin = member(&dir, "admin", Role::HrAdmin, AccountStatus::Active);
        let service = AdminService::new(&dir);

        assert_denied(service.change_role(manager, employee, Role::HrAdmin, now()));
        assert_denied(service.suspend(manager, admin, now()));
        assert_denied(service.change_role(manager, manager, Role::HrAssistant, now()));

        let promoted = service
            .change_role(manager, employee, Role::HrManager, now())
            .unwrap();
        assert_eq!(promoted.role(), Role::HrManager);
    }

    #[test]
    fn suspend_reinstate_deactivate_cycle() {
        let dir = directory();
        let manager = member(&dir, "manager", Role::HrManager, AccountStatus::Active);
        let target = member(&dir, "t", Role::Employee, AccountStatus::Active);
        let service = AdminService::new(&dir);

        service.suspend(manager, target, now()).unwrap();
        service.reinstate(manager, target, now()).unwrap();
        service.suspend(manager, target, now()).unwrap();
        let gone = service.deactivate(manager, target, now()).unwrap();

        assert_eq!(gone.status(), AccountStatus::Inactive);
        assert!(service.reinstate(manager, target, now()).is_err());
    }

    #[test]
    fn grants_issued_by_admin_record_the_granter() {
        let dir = directory();
        let manager = member(&dir, "manager", Role::HrManager, AccountStatus::Active);
        let target = member(&dir, "t", Role::Employee, AccountStatus::Active);
        let service = AdminService::new(&dir);

        let grant = service
            .grant_permission(
                manager,
                target,
                PermissionName::new("export_reports").unwrap(),
                "reporting",
                Some(now() + Duration::days(7)),
                now(),
            )
            .unwrap();
        assert_eq!(grant.granted_by(), Some(manager));

        let revoked = service.revoke_permission(manager, grant.id(), now()).unwrap();
        assert!(!revoked.is_active());
    }

    #[test]
    fn assistants_see_pending_registrations() {
        let dir = directory();
        let assistant = member(&dir, "assistant", Role::HrAssistant, AccountStatus::Active);
        let employee = member(&dir, "e", Role::Employee, AccountStatus::Active);
        member(&dir, "p", Role::Employee, AccountStatus::Pending);
        let service = AdminService::new(&dir);

        assert_eq!(service.pending_registrations(assistant).unwrap().len(), 1);
        assert_denied(service.pending_registrations(employee));
    }
}

//! In-memory directory state and its unit of work.
//!
//! All writes go through [`DirectoryStore::transaction`]: the closure works on
//! a private copy of the state, and the copy replaces the live state only when
//! the closure returns `Ok`. Events recorded during the closure are assigned
//! sequence numbers at commit and handed back for publishing.
//!
//! Intended for tests/dev. Not optimized for performance.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::debug;

use gala_auth::{
    Account, AccountStatus, PasswordHash, PermissionGrant, Principal, Profile, Registration, Role,
    TransitionPolicy, normalize_email,
};
use gala_core::{AccountId, DomainError, DomainResult, Entity, GrantId, UniqueField};
use gala_events::EventEnvelope;

use crate::error::{AuthenticationError, DirectoryError, DirectoryResult};
use crate::events::{DirectoryEnvelope, DirectoryEvent};

/// Accounts, profiles and grants plus the uniqueness indexes.
#[derive(Debug, Clone, Default)]
pub struct DirectoryState {
    accounts: BTreeMap<AccountId, Account>,
    profiles: HashMap<AccountId, Profile>,
    grants: BTreeMap<GrantId, PermissionGrant>,
    emails: HashMap<String, AccountId>,
    usernames: HashMap<String, AccountId>,
    employee_ids: HashMap<String, AccountId>,
    outbox: Vec<DirectoryEvent>,
    sequence: u64,
}

impl DirectoryState {
    // ── reads ───────────────────────────────────────────────────────────────

    pub fn account(&self, id: AccountId) -> DomainResult<&Account> {
        self.accounts
            .get(&id)
            .ok_or_else(|| DomainError::not_found("account", id))
    }

    pub fn profile(&self, id: AccountId) -> DomainResult<&Profile> {
        self.profiles
            .get(&id)
            .ok_or_else(|| DomainError::not_found("profile", id))
    }

    pub fn grant(&self, id: GrantId) -> DomainResult<&PermissionGrant> {
        self.grants
            .get(&id)
            .ok_or_else(|| DomainError::not_found("permission grant", id))
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    /// Email lookups are case-insensitive.
    pub fn find_by_email(&self, email: &str) -> Option<&Account> {
        let email = normalize_email(email).ok()?;
        self.emails.get(&email).and_then(|id| self.accounts.get(id))
    }

    pub fn find_by_username(&self, username: &str) -> Option<&Account> {
        self.usernames
            .get(username.trim())
            .and_then(|id| self.accounts.get(id))
    }

    /// Every grant ever issued to the account, oldest first.
    pub fn grants_of(&self, account_id: AccountId) -> Vec<&PermissionGrant> {
        let mut grants: Vec<&PermissionGrant> = self
            .grants
            .values()
            .filter(|g| g.account_id() == account_id)
            .collect();
        grants.sort_by_key(|g| (g.granted_at(), g.id()));
        grants
    }

    /// A consistent snapshot of the account's role, status and grants.
    pub fn principal(&self, account_id: AccountId) -> DomainResult<Principal> {
        let account = self.account(account_id)?;
        Ok(Principal::new(
            account,
            self.grants_of(account_id).into_iter().cloned(),
        ))
    }

    /// Checks the one-profile-per-account pairing and that every grant has an
    /// owner.
    pub fn check_integrity(&self) -> DomainResult<()> {
        if self.accounts.len() != self.profiles.len() {
            return Err(DomainError::invariant(format!(
                "{} accounts but {} profiles",
                self.accounts.len(),
                self.profiles.len()
            )));
        }
        for id in self.accounts.keys() {
            match self.profiles.get(id) {
                Some(profile) if profile.account_id() == *id => {}
                _ => return Err(DomainError::invariant(format!("account {id} has no profile"))),
            }
        }
        if let Some(orphan) = self
            .grants
            .values()
            .find(|g| !self.accounts.contains_key(&g.account_id()))
        {
            return Err(DomainError::invariant(format!(
                "grant {} belongs to a missing account",
                orphan.id()
            )));
        }
        Ok(())
    }

    // ── writes ──────────────────────────────────────────────────────────────

    fn record(&mut self, event: DirectoryEvent) {
        self.outbox.push(event);
    }

    fn account_mut(&mut self, id: AccountId) -> DomainResult<&mut Account> {
        self.accounts
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("account", id))
    }

    fn grant_mut(&mut self, id: GrantId) -> DomainResult<&mut PermissionGrant> {
        self.grants
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("permission grant", id))
    }

    fn ensure_unique(
        index: &HashMap<String, AccountId>,
        field: UniqueField,
        value: &str,
        owner: Option<AccountId>,
    ) -> DomainResult<()> {
        match index.get(value) {
            Some(existing) if Some(*existing) != owner => Err(DomainError::conflict(field, value)),
            _ => Ok(()),
        }
    }

    /// Store a freshly registered account together with its profile.
    pub fn insert_registration(&mut self, registration: Registration) -> DomainResult<Account> {
        let Registration { account, profile } = registration;
        let id = account.id();

        if profile.account_id() != id {
            return Err(DomainError::invariant("profile belongs to another account"));
        }
        Self::ensure_unique(&self.emails, UniqueField::Email, account.email(), None)?;
        Self::ensure_unique(&self.usernames, UniqueField::Username, account.username(), None)?;
        if let Some(employee_id) = account.employee_id() {
            Self::ensure_unique(&self.employee_ids, UniqueField::EmployeeId, employee_id, None)?;
        }

        self.emails.insert(account.email().to_string(), id);
        self.usernames.insert(account.username().to_string(), id);
        if let Some(employee_id) = account.employee_id() {
            self.employee_ids.insert(employee_id.to_string(), id);
        }

        self.record(DirectoryEvent::AccountCreated {
            account_id: id,
            email: account.email().to_string(),
            role: account.role(),
            status: account.status(),
            occurred_at: account.created_at(),
        });
        self.profiles.insert(id, profile);
        self.accounts.insert(id, account.clone());

        Ok(account)
    }

    /// Move the account to `to`. A same-state change under the permissive
    /// policy is a no-op and records nothing.
    pub fn change_status(
        &mut self,
        id: AccountId,
        to: AccountStatus,
        policy: TransitionPolicy,
        changed_by: Option<AccountId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Account> {
        let account = self.account_mut(id)?;
        let from = account.transition_status(to, policy, now)?;
        let account = account.clone();

        if from != to {
            self.record(DirectoryEvent::StatusChanged {
                account_id: id,
                from,
                to,
                changed_by,
                occurred_at: now,
            });
        }
        Ok(account)
    }

    pub fn change_role(
        &mut self,
        id: AccountId,
        role: Role,
        changed_by: Option<AccountId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Account> {
        let account = self.account_mut(id)?;
        let from = account.change_role(role, now);
        let account = account.clone();

        if from != role {
            self.record(DirectoryEvent::RoleChanged {
                account_id: id,
                from,
                to: role,
                changed_by,
                occurred_at: now,
            });
        }
        Ok(account)
    }

    pub fn set_employee_id(
        &mut self,
        id: AccountId,
        employee_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> DomainResult<Account> {
        let mut account = self.account(id)?.clone();
        let previous = account.employee_id().map(str::to_string);
        account.set_employee_id(employee_id, now)?;

        if let Some(next) = account.employee_id() {
            Self::ensure_unique(&self.employee_ids, UniqueField::EmployeeId, next, Some(id))?;
        }
        if let Some(previous) = previous {
            self.employee_ids.remove(&previous);
        }
        if let Some(next) = account.employee_id() {
            self.employee_ids.insert(next.to_string(), id);
        }
        self.accounts.insert(id, account.clone());
        Ok(account)
    }

    /// Apply `edit` to the account. Identity fields (email, username,
    /// employee id), role and status are not reachable from here.
    pub fn edit_account<F>(&mut self, id: AccountId, now: DateTime<Utc>, edit: F) -> DomainResult<Account>
    where
        F: FnOnce(&mut Account) -> DomainResult<()>,
    {
        let mut account = self.account(id)?.clone();
        edit(&mut account)?;
        account.contact.validate()?;
        account.touch(now);
        self.accounts.insert(id, account.clone());
        Ok(account)
    }

    pub fn edit_profile<F>(&mut self, id: AccountId, edit: F) -> DomainResult<Profile>
    where
        F: FnOnce(&mut Profile) -> DomainResult<()>,
    {
        let mut profile = self.profile(id)?.clone();
        edit(&mut profile)?;
        self.profiles.insert(id, profile.clone());
        Ok(profile)
    }

    pub fn set_password(&mut self, id: AccountId, password: PasswordHash, now: DateTime<Utc>) -> DomainResult<()> {
        self.account_mut(id)?.set_password(password, now);
        Ok(())
    }

    /// Stamp a successful login. The stored status is checked again here so a
    /// suspension committed after the credential check still wins.
    pub fn record_login(&mut self, id: AccountId, ip: Option<IpAddr>, now: DateTime<Utc>) -> DirectoryResult<Account> {
        let account = self.account_mut(id)?;
        if !account.status().is_active() {
            return Err(AuthenticationError::NotActive(account.status()).into());
        }
        account.record_login(ip, now);
        Ok(account.clone())
    }

    /// Delete the account with its profile and its own grants. Grants the
    /// account issued to others survive with `granted_by` cleared.
    ///
    /// Returns the number of grants removed.
    pub fn remove_account(&mut self, id: AccountId, now: DateTime<Utc>) -> DomainResult<usize> {
        let account = self
            .accounts
            .remove(&id)
            .ok_or_else(|| DomainError::not_found("account", id))?;
        self.profiles.remove(&id);
        self.emails.remove(account.email());
        self.usernames.remove(account.username());
        if let Some(employee_id) = account.employee_id() {
            self.employee_ids.remove(employee_id);
        }

        let before = self.grants.len();
        self.grants.retain(|_, g| g.account_id() != id);
        let removed = before - self.grants.len();

        for grant in self.grants.values_mut() {
            if grant.granted_by() == Some(id) {
                grant.clear_granter();
            }
        }

        self.record(DirectoryEvent::AccountDeleted {
            account_id: id,
            occurred_at: now,
        });
        Ok(removed)
    }

    /// The grantee must exist; `granted_by` is stored as given.
    pub fn insert_grant(&mut self, grant: PermissionGrant) -> DomainResult<PermissionGrant> {
        self.account(grant.account_id())?;

        self.record(DirectoryEvent::GrantIssued {
            grant_id: grant.id(),
            account_id: grant.account_id(),
            permission: grant.permission().clone(),
            granted_by: grant.granted_by(),
            expires_at: grant.expires_at(),
            occurred_at: grant.granted_at(),
        });
        self.grants.insert(grant.id(), grant.clone());
        Ok(grant)
    }

    /// Deactivate the grant. Revoking an inactive grant changes nothing.
    pub fn revoke_grant(&mut self, id: GrantId, now: DateTime<Utc>) -> DomainResult<PermissionGrant> {
        let grant = self.grant_mut(id)?;
        let changed = grant.revoke();
        let grant = grant.clone();

        if changed {
            self.record(DirectoryEvent::GrantRevoked {
                grant_id: id,
                account_id: grant.account_id(),
                occurred_at: now,
            });
        }
        Ok(grant)
    }

    pub fn reactivate_grant(&mut self, id: GrantId, now: DateTime<Utc>) -> DomainResult<PermissionGrant> {
        let grant = self.grant_mut(id)?;
        let changed = grant.reactivate();
        let grant = grant.clone();

        if changed {
            self.record(DirectoryEvent::GrantReactivated {
                grant_id: id,
                account_id: grant.account_id(),
                occurred_at: now,
            });
        }
        Ok(grant)
    }

    pub fn set_grant_expiry(
        &mut self,
        id: GrantId,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DomainResult<PermissionGrant> {
        let grant = self.grant_mut(id)?;
        grant.set_expiry(expires_at);
        let grant = grant.clone();

        self.record(DirectoryEvent::GrantExpiryChanged {
            grant_id: id,
            account_id: grant.account_id(),
            expires_at,
            occurred_at: now,
        });
        Ok(grant)
    }

    fn seal(&mut self) -> Vec<DirectoryEnvelope> {
        let events = std::mem::take(&mut self.outbox);
        events
            .into_iter()
            .map(|event| {
                self.sequence += 1;
                EventEnvelope::new(event.subject_id(), self.sequence, event)
            })
            .collect()
    }
}

/// Shared directory state guarded by a lock.
#[derive(Debug, Default)]
pub struct DirectoryStore {
    state: RwLock<DirectoryState>,
}

impl DirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the current state.
    pub fn read<T, F>(&self, f: F) -> DirectoryResult<T>
    where
        F: FnOnce(&DirectoryState) -> DirectoryResult<T>,
    {
        let state = self
            .state
            .read()
            .map_err(|_| DirectoryError::Storage("lock poisoned".to_string()))?;
        f(&state)
    }

    /// Run `work` as one atomic unit.
    ///
    /// On `Ok` the modified copy becomes the live state and the recorded
    /// events come back in commit order. On `Err` nothing changes.
    pub fn transaction<T, F>(&self, work: F) -> DirectoryResult<(T, Vec<DirectoryEnvelope>)>
    where
        F: FnOnce(&mut DirectoryState) -> DirectoryResult<T>,
    {
        let mut state = self
            .state
            .write()
            .map_err(|_| DirectoryError::Storage("lock poisoned".to_string()))?;

        let mut staged = state.clone();
        staged.outbox.clear();

        let out = work(&mut staged)?;
        let envelopes = staged.seal();
        *state = staged;

        debug!(events = envelopes.len(), "directory transaction committed");
        Ok((out, envelopes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gala_auth::{NewAccount, PasswordPolicy, PermissionName, RegistrationDefaults};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn registration(email: &str, username: &str) -> Registration {
        Account::register(
            NewAccount::new(email, username),
            &PasswordPolicy::default(),
            &RegistrationDefaults::default(),
            now(),
        )
        .unwrap()
    }

    #[test]
    fn failed_transaction_leaves_state_untouched() {
        let store = DirectoryStore::new();

        let result = store.transaction(|state| {
            state.insert_registration(registration("ada@example.com", "ada"))?;
            Err::<(), _>(DomainError::validation("boom").into())
        });

        assert!(result.is_err());
        let counts = store
            .read(|s| Ok((s.account_count(), s.profile_count())))
            .unwrap();
        assert_eq!(counts, (0, 0));
    }

    #[test]
    fn commit_assigns_increasing_sequence_numbers() {
        let store = DirectoryStore::new();

        let (_, first) = store
            .transaction(|state| state.insert_registration(registration("a@example.com", "a")).map_err(Into::into))
            .unwrap();
        let (_, second) = store
            .transaction(|state| state.insert_registration(registration("b@example.com", "b")).map_err(Into::into))
            .unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].sequence_number(), 1);
        assert_eq!(second[0].sequence_number(), 2);
        assert_eq!(first[0].event_type(), "account.created");
    }

    #[test]
    fn rolled_back_events_are_not_emitted_later() {
        let store = DirectoryStore::new();
        let _ = store.transaction(|state| {
            state.insert_registration(registration("a@example.com", "a"))?;
            Err::<(), _>(DomainError::validation("nope").into())
        });

        let (_, events) = store
            .transaction(|state| state.insert_registration(registration("b@example.com", "b")).map_err(Into::into))
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sequence_number(), 1);
    }

    #[test]
    fn duplicate_email_is_a_conflict_regardless_of_case() {
        let mut state = DirectoryState::default();
        state
            .insert_registration(registration("ada@example.com", "ada"))
            .unwrap();

        let err = state
            .insert_registration(registration("ADA@example.com", "ada2"))
            .unwrap_err();

        assert_eq!(err, DomainError::conflict(UniqueField::Email, "ada@example.com"));
    }

    #[test]
    fn duplicate_username_is_a_conflict() {
        let mut state = DirectoryState::default();
        state
            .insert_registration(registration("a@example.com", "ada"))
            .unwrap();

        let err = state
            .insert_registration(registration("b@example.com", "ada"))
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::UniquenessConflict {
                field: UniqueField::Username,
                ..
            }
        ));
    }

    #[test]
    fn removing_an_account_cascades_and_clears_granter() {
        let mut state = DirectoryState::default();
        let admin = state
            .insert_registration(registration("admin@example.com", "admin"))
            .unwrap();
        let member = state
            .insert_registration(registration("member@example.com", "member"))
            .unwrap();

        let issued = state
            .insert_grant(PermissionGrant::issue(
                member.id(),
                PermissionName::new("export_reports").unwrap(),
                "",
                Some(admin.id()),
                now(),
                None,
            ))
            .unwrap();
        state
            .insert_grant(PermissionGrant::issue(
                admin.id(),
                PermissionName::new("manage_events").unwrap(),
                "",
                None,
                now(),
                None,
            ))
            .unwrap();

        let removed = state.remove_account(admin.id(), now()).unwrap();

        assert_eq!(removed, 1);
        assert_eq!(state.grant(issued.id()).unwrap().granted_by(), None);
        assert!(state.profile(admin.id()).is_err());
        assert!(state.find_by_email("admin@example.com").is_none());
        state.check_integrity().unwrap();
    }

    #[test]
    fn login_is_refused_once_the_stored_account_is_suspended() {
        let mut state = DirectoryState::default();
        let id = state
            .insert_registration(registration("ada@example.com", "ada"))
            .unwrap()
            .id();
        state
            .change_status(id, AccountStatus::Active, TransitionPolicy::Strict, None, now())
            .unwrap();
        assert!(state.record_login(id, None, now()).unwrap().last_login().is_some());

        state
            .change_status(id, AccountStatus::Suspended, TransitionPolicy::Strict, None, now())
            .unwrap();
        let later = now() + chrono::Duration::minutes(5);
        let err = state.record_login(id, None, later).unwrap_err();

        assert!(matches!(
            err,
            DirectoryError::Authentication(AuthenticationError::NotActive(AccountStatus::Suspended))
        ));
        assert_eq!(state.account(id).unwrap().last_login(), Some(now()));
    }

    #[test]
    fn employee_id_moves_between_index_entries() {
        let mut state = DirectoryState::default();
        let a = state
            .insert_registration(registration("a@example.com", "a"))
            .unwrap();
        let b = state
            .insert_registration(registration("b@example.com", "b"))
            .unwrap();

        state.set_employee_id(a.id(), Some("E-1"), now()).unwrap();
        let err = state.set_employee_id(b.id(), Some("E-1"), now()).unwrap_err();
        assert!(matches!(
            err,
            DomainError::UniquenessConflict {
                field: UniqueField::EmployeeId,
                ..
            }
        ));

        state.set_employee_id(a.id(), Some("E-2"), now()).unwrap();
        state.set_employee_id(b.id(), Some("E-1"), now()).unwrap();
    }

    #[test]
    fn revoking_twice_records_one_event() {
        let mut state = DirectoryState::default();
        let a = state
            .insert_registration(registration("a@example.com", "a"))
            .unwrap();
        let grant = state
            .insert_grant(PermissionGrant::issue(
                a.id(),
                PermissionName::new("export_reports").unwrap(),
                "",
                None,
                now(),
                None,
            ))
            .unwrap();

        state.revoke_grant(grant.id(), now()).unwrap();
        state.revoke_grant(grant.id(), now()).unwrap();

        let revocations = state
            .outbox
            .iter()
            .filter(|e| matches!(e, DirectoryEvent::GrantRevoked { .. }))
            .count();
        assert_eq!(revocations, 1);
    }
}

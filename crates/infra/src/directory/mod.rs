//! Account directory: the command and query surface over the in-memory store.
//!
//! Every write runs inside one [`DirectoryStore`] transaction. Events recorded
//! by the transaction are published on the bus only after it commits.

mod grants;
mod queries;

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use gala_auth::{
    Account, AccountStatus, Check, ContactDetails, DecisionExplanation, HrDetails, NewAccount,
    PasswordHash, Principal, Profile, ProfileUpdate, Role, explain,
};
use gala_core::{AccountId, Entity};
use gala_events::{EventBus, InMemoryEventBus, Subscription};

use crate::config::DirectoryConfig;
use crate::error::{AuthenticationError, DirectoryResult};
use crate::events::DirectoryEnvelope;
use crate::store::{DirectoryState, DirectoryStore};

pub use queries::LocationFilter;

/// Partial edit of an account's descriptive attributes. `None` leaves a field
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AccountUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub hr: Option<HrDetails>,
    pub contact: Option<ContactDetails>,
    pub notes: Option<String>,
}

/// In-memory account directory.
#[derive(Debug)]
pub struct AccountDirectory<B = InMemoryEventBus<DirectoryEnvelope>> {
    config: DirectoryConfig,
    store: DirectoryStore,
    bus: B,
}

impl AccountDirectory {
    /// A directory publishing to a private in-memory bus.
    pub fn in_memory(config: DirectoryConfig) -> Self {
        Self::new(config, InMemoryEventBus::new())
    }
}

impl<B> AccountDirectory<B> {
    pub fn new(config: DirectoryConfig, bus: B) -> Self {
        Self {
            config,
            store: DirectoryStore::new(),
            bus,
        }
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub(crate) fn read<T, F>(&self, f: F) -> DirectoryResult<T>
    where
        F: FnOnce(&DirectoryState) -> DirectoryResult<T>,
    {
        self.store.read(f)
    }

    pub fn account(&self, id: AccountId) -> DirectoryResult<Account> {
        self.read(|s| Ok(s.account(id)?.clone()))
    }

    pub fn profile(&self, id: AccountId) -> DirectoryResult<Profile> {
        self.read(|s| Ok(s.profile(id)?.clone()))
    }

    /// Case-insensitive.
    pub fn find_by_email(&self, email: &str) -> DirectoryResult<Option<Account>> {
        self.read(|s| Ok(s.find_by_email(email).cloned()))
    }

    pub fn find_by_username(&self, username: &str) -> DirectoryResult<Option<Account>> {
        self.read(|s| Ok(s.find_by_username(username).cloned()))
    }

    pub fn account_count(&self) -> DirectoryResult<usize> {
        self.read(|s| Ok(s.account_count()))
    }

    /// Role, status and grants of the account, read in one snapshot.
    pub fn principal(&self, id: AccountId) -> DirectoryResult<Principal> {
        self.read(|s| Ok(s.principal(id)?))
    }

    /// Evaluate `check` for the account at `now` and say why it passed or
    /// failed.
    pub fn explain(&self, id: AccountId, check: &Check, now: DateTime<Utc>) -> DirectoryResult<DecisionExplanation> {
        Ok(explain(&self.principal(id)?, check, now))
    }

    /// Verify the account/profile pairing and grant ownership.
    pub fn check_integrity(&self) -> DirectoryResult<()> {
        self.read(|s| Ok(s.check_integrity()?))
    }
}

impl<B> AccountDirectory<B>
where
    B: EventBus<DirectoryEnvelope>,
{
    /// Run `work` in a transaction and publish what it recorded.
    pub(crate) fn commit<T, F>(&self, work: F) -> DirectoryResult<T>
    where
        F: FnOnce(&mut DirectoryState) -> DirectoryResult<T>,
    {
        let (out, envelopes) = self.store.transaction(work)?;

        for envelope in envelopes {
            let sequence = envelope.sequence_number();
            if let Err(err) = self.bus.publish(envelope) {
                warn!(sequence, error = ?err, "failed to publish directory event");
            }
        }

        Ok(out)
    }

    pub fn subscribe(&self) -> Subscription<DirectoryEnvelope> {
        self.bus.subscribe()
    }

    /// Register an account and its profile as one unit.
    ///
    /// The password is hashed before the store is locked.
    pub fn create_account(&self, new: NewAccount, now: DateTime<Utc>) -> DirectoryResult<Account> {
        let registration = Account::register(new, &self.config.password, &self.config.defaults, now)?;
        let account = self.commit(|s| Ok(s.insert_registration(registration)?))?;

        info!(
            account_id = %account.id(),
            role = %account.role(),
            status = %account.status(),
            "account created"
        );
        Ok(account)
    }

    /// Register a Super Admin. Role and status in `new` are ignored.
    pub fn create_superuser(&self, new: NewAccount, now: DateTime<Utc>) -> DirectoryResult<Account> {
        let registration =
            Account::register_superuser(new, &self.config.password, &self.config.defaults, now)?;
        let account = self.commit(|s| Ok(s.insert_registration(registration)?))?;

        info!(account_id = %account.id(), "superuser created");
        Ok(account)
    }

    /// Move the account through its lifecycle under the configured
    /// transition policy.
    pub fn set_status(
        &self,
        id: AccountId,
        to: AccountStatus,
        changed_by: Option<AccountId>,
        now: DateTime<Utc>,
    ) -> DirectoryResult<Account> {
        let policy = self.config.transitions;
        let account = self.commit(|s| Ok(s.change_status(id, to, policy, changed_by, now)?))?;

        info!(account_id = %id, status = %to, "account status changed");
        Ok(account)
    }

    pub fn change_role(
        &self,
        id: AccountId,
        role: Role,
        changed_by: Option<AccountId>,
        now: DateTime<Utc>,
    ) -> DirectoryResult<Account> {
        let account = self.commit(|s| Ok(s.change_role(id, role, changed_by, now)?))?;

        info!(account_id = %id, role = %role, "account role changed");
        Ok(account)
    }

    pub fn set_verified(&self, id: AccountId, verified: bool, now: DateTime<Utc>) -> DirectoryResult<Account> {
        self.commit(|s| {
            Ok(s.edit_account(id, now, |account| {
                account.is_verified = verified;
                Ok(())
            })?)
        })
    }

    /// Edit names, HR and contact attributes, and notes. Phone numbers are
    /// re-validated; a failed edit changes nothing.
    pub fn update_account(&self, id: AccountId, update: AccountUpdate, now: DateTime<Utc>) -> DirectoryResult<Account> {
        self.commit(|s| {
            Ok(s.edit_account(id, now, |account| {
                let AccountUpdate {
                    first_name,
                    last_name,
                    hr,
                    contact,
                    notes,
                } = update;

                if let Some(first_name) = first_name {
                    account.first_name = first_name.trim().to_string();
                }
                if let Some(last_name) = last_name {
                    account.last_name = last_name.trim().to_string();
                }
                if let Some(hr) = hr {
                    account.hr = hr;
                }
                if let Some(contact) = contact {
                    account.contact = contact;
                }
                if let Some(notes) = notes {
                    account.notes = notes;
                }
                Ok(())
            })?)
        })
    }

    /// Set or clear the employee id. A blank id clears it.
    pub fn set_employee_id(
        &self,
        id: AccountId,
        employee_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> DirectoryResult<Account> {
        self.commit(|s| Ok(s.set_employee_id(id, employee_id, now)?))
    }

    pub fn update_profile(&self, id: AccountId, update: ProfileUpdate, now: DateTime<Utc>) -> DirectoryResult<Profile> {
        self.commit(|s| Ok(s.edit_profile(id, |profile| profile.apply(update, now))?))
    }

    pub fn set_notification(
        &self,
        id: AccountId,
        channel: &str,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> DirectoryResult<Profile> {
        self.commit(|s| {
            Ok(s.edit_profile(id, |profile| {
                profile.set_notification(channel, enabled, now);
                Ok(())
            })?)
        })
    }

    /// Hash `raw` under the configured policy and store it.
    pub fn set_password(&self, id: AccountId, raw: &str, now: DateTime<Utc>) -> DirectoryResult<()> {
        let password = PasswordHash::hash(raw, &self.config.password)?;
        self.commit(|s| Ok(s.set_password(id, password, now)?))?;

        info!(account_id = %id, "password changed");
        Ok(())
    }

    /// Delete the account with its profile and grants.
    pub fn delete_account(&self, id: AccountId, now: DateTime<Utc>) -> DirectoryResult<()> {
        let removed_grants = self.commit(|s| Ok(s.remove_account(id, now)?))?;

        info!(account_id = %id, removed_grants, "account deleted");
        Ok(())
    }

    /// Check credentials and record the login.
    ///
    /// The password is checked before the status so that a wrong password
    /// never reveals whether an account is suspended.
    pub fn authenticate(
        &self,
        email: &str,
        password: &str,
        ip: Option<IpAddr>,
        now: DateTime<Utc>,
    ) -> DirectoryResult<Account> {
        let Some(account) = self.find_by_email(email)? else {
            warn!("authentication failed: unknown account");
            return Err(AuthenticationError::UnknownAccount.into());
        };
        let id = account.id();

        if !account.verify_password(password)? {
            warn!(account_id = %id, "authentication failed: invalid password");
            return Err(AuthenticationError::InvalidPassword.into());
        }
        if !account.status().is_active() {
            warn!(account_id = %id, status = %account.status(), "authentication failed: account not active");
            return Err(AuthenticationError::NotActive(account.status()).into());
        }

        let account = self.commit(|s| s.record_login(id, ip, now)).inspect_err(|err| {
            warn!(account_id = %id, error = %err, "authentication failed while recording login");
        })?;
        debug!(account_id = %id, "authenticated");
        Ok(account)
    }
}

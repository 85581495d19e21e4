//! Lifecycle events published by the directory after each commit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gala_auth::{AccountStatus, PermissionName, Role};
use gala_core::{AccountId, GrantId};
use gala_events::{Event, EventEnvelope};

pub type DirectoryEnvelope = EventEnvelope<DirectoryEvent>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DirectoryEvent {
    AccountCreated {
        account_id: AccountId,
        email: String,
        role: Role,
        status: AccountStatus,
        occurred_at: DateTime<Utc>,
    },
    StatusChanged {
        account_id: AccountId,
        from: AccountStatus,
        to: AccountStatus,
        changed_by: Option<AccountId>,
        occurred_at: DateTime<Utc>,
    },
    RoleChanged {
        account_id: AccountId,
        from: Role,
        to: Role,
        changed_by: Option<AccountId>,
        occurred_at: DateTime<Utc>,
    },
    AccountDeleted {
        account_id: AccountId,
        occurred_at: DateTime<Utc>,
    },
    GrantIssued {
        grant_id: GrantId,
        account_id: AccountId,
        permission: PermissionName,
        granted_by: Option<AccountId>,
        expires_at: Option<DateTime<Utc>>,
        occurred_at: DateTime<Utc>,
    },
    GrantRevoked {
        grant_id: GrantId,
        account_id: AccountId,
        occurred_at: DateTime<Utc>,
    },
    GrantReactivated {
        grant_id: GrantId,
        account_id: AccountId,
        occurred_at: DateTime<Utc>,
    },
    GrantExpiryChanged {
        grant_id: GrantId,
        account_id: AccountId,
        expires_at: Option<DateTime<Utc>>,
        occurred_at: DateTime<Utc>,
    },
}

impl DirectoryEvent {
    /// The account or grant the event is about.
    pub fn subject_id(&self) -> uuid::Uuid {
        match self {
            DirectoryEvent::AccountCreated { account_id, .. }
            | DirectoryEvent::StatusChanged { account_id, .. }
            | DirectoryEvent::RoleChanged { account_id, .. }
            | DirectoryEvent::AccountDeleted { account_id, .. } => *account_id.as_uuid(),
            DirectoryEvent::GrantIssued { grant_id, .. }
            | DirectoryEvent::GrantRevoked { grant_id, .. }
            | DirectoryEvent::GrantReactivated { grant_id, .. }
            | DirectoryEvent::GrantExpiryChanged { grant_id, .. } => *grant_id.as_uuid(),
        }
    }
}

impl Event for DirectoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DirectoryEvent::AccountCreated { .. } => "account.created",
            DirectoryEvent::StatusChanged { .. } => "account.status_changed",
            DirectoryEvent::RoleChanged { .. } => "account.role_changed",
            DirectoryEvent::AccountDeleted { .. } => "account.deleted",
            DirectoryEvent::GrantIssued { .. } => "grant.issued",
            DirectoryEvent::GrantRevoked { .. } => "grant.revoked",
            DirectoryEvent::GrantReactivated { .. } => "grant.reactivated",
            DirectoryEvent::GrantExpiryChanged { .. } => "grant.expiry_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DirectoryEvent::AccountCreated { occurred_at, .. }
            | DirectoryEvent::StatusChanged { occurred_at, .. }
            | DirectoryEvent::RoleChanged { occurred_at, .. }
            | DirectoryEvent::AccountDeleted { occurred_at, .. }
            | DirectoryEvent::GrantIssued { occurred_at, .. }
            | DirectoryEvent::GrantRevoked { occurred_at, .. }
            | DirectoryEvent::GrantReactivated { occurred_at, .. }
            | DirectoryEvent::GrantExpiryChanged { occurred_at, .. } => *occurred_at,
        }
    }
}

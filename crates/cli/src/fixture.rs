//! JSON account fixtures: a portable snapshot of accounts and grants that the
//! audit command loads into an in-memory directory.
//!
//! ```json
//! {
//!   "accounts": [
//!     { "email": "ada@example.com", "username": "ada", "role": "HR_MANAGER", "status": "ACTIVE" },
//!     { "email": "root@example.com", "username": "root", "superuser": true }
//!   ],
//!   "grants": [
//!     { "email": "ada@example.com", "permission": "export_reports",
//!       "expires_at": "2026-04-01T00:00:00Z", "granted_by": "root@example.com" }
//!   ]
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use gala_auth::{NewAccount, PermissionName};
use gala_core::Entity;
use gala_infra::{AccountDirectory, DirectoryConfig};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub accounts: Vec<FixtureAccount>,
    pub grants: Vec<FixtureGrant>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureAccount {
    #[serde(default)]
    pub superuser: bool,
    #[serde(flatten)]
    pub account: NewAccount,
}

#[derive(Debug, Deserialize)]
pub struct FixtureGrant {
    /// Grantee email.
    pub email: String,
    pub permission: PermissionName,
    #[serde(default)]
    pub description: String,
    /// Granter email, if any.
    #[serde(default)]
    pub granted_by: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "active_by_default")]
    pub active: bool,
}

fn active_by_default() -> bool {
    true
}

impl Fixture {
    pub fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Build a directory holding the fixture, with every record created at
    /// `at`.
    pub fn load(self, config: DirectoryConfig, at: DateTime<Utc>) -> Result<AccountDirectory> {
        let dir = AccountDirectory::in_memory(config);

        for entry in self.accounts {
            let email = entry.account.email.clone();
            let created = if entry.superuser {
                dir.create_superuser(entry.account, at)
            } else {
                dir.create_account(entry.account, at)
            };
            created.with_context(|| format!("creating account {email}"))?;
        }

        for grant in self.grants {
            let grantee = lookup(&dir, &grant.email)?;
            let granter = grant
                .granted_by
                .as_deref()
                .map(|email| lookup(&dir, email))
                .transpose()?;

            let issued = dir
                .grant(
                    grantee,
                    grant.permission,
                    &grant.description,
                    granter,
                    grant.expires_at,
                    at,
                )
                .with_context(|| format!("granting to {}", grant.email))?;
            if !grant.active {
                dir.revoke(issued.id(), at)?;
            }
        }

        Ok(dir)
    }
}

pub fn lookup(dir: &AccountDirectory, email: &str) -> Result<gala_core::AccountId> {
    dir.find_by_email(email)?
        .map(|account| account.id())
        .ok_or_else(|| anyhow!("no account with email {email}"))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use gala_auth::{AccountStatus, PasswordPolicy, Role};

    use super::*;

    const FIXTURE: &str = r#"{
        "accounts": [
            { "email": "ada@example.com", "username": "ada", "role": "HR_MANAGER", "status": "ACTIVE" },
            { "email": "root@example.com", "username": "root", "superuser": true, "role": "GUEST" }
        ],
        "grants": [
            { "email": "ada@example.com", "permission": "export_reports",
              "expires_at": "2026-03-01T10:00:00Z", "granted_by": "root@example.com" },
            { "email": "ada@example.com", "permission": "old_access", "active": false }
        ]
    }"#;

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn config() -> DirectoryConfig {
        DirectoryConfig {
            password: PasswordPolicy { min_length: 8, cost: 4 },
            ..DirectoryConfig::default()
        }
    }

    #[test]
    fn loads_accounts_and_grants() {
        let dir = Fixture::parse(FIXTURE).unwrap().load(config(), at()).unwrap();

        let ada = lookup(&dir, "ada@example.com").unwrap();
        let root = dir.find_by_email("root@example.com").unwrap().unwrap();

        assert_eq!(root.role(), Role::SuperAdmin);
        assert_eq!(root.status(), AccountStatus::Active);
        assert_eq!(dir.grants_for(ada).unwrap().len(), 2);
        assert_eq!(
            dir.list_valid(ada, at())
                .unwrap()
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>(),
            ["export_reports"]
        );
        assert!(dir.list_valid(ada, at() + Duration::hours(2)).unwrap().is_empty());
    }

    #[test]
    fn grant_for_unknown_email_fails() {
        let raw = r#"{ "grants": [ { "email": "ghost@example.com", "permission": "x" } ] }"#;

        let err = Fixture::parse(raw).unwrap().load(config(), at()).unwrap_err();

        assert!(err.to_string().contains("ghost@example.com"));
    }
}

//! Account entity: the authenticable identity.
//!
//! Accounts are only created through [`Account::register`] or
//! [`Account::register_superuser`], which validate identity fields, hash the
//! password and build the account's profile in the same step.

use std::net::IpAddr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gala_core::{AccountId, DomainError, DomainResult, Entity, ValueObject};

use crate::password::{PasswordError, PasswordHash, PasswordPolicy};
use crate::{AccountStatus, Profile, Role, TransitionPolicy};

// ─────────────────────────────────────────────────────────────────────────────
// Attribute groups
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HrDetails {
    pub department: String,
    pub position: String,
    pub hire_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl ValueObject for Address {
    fn is_blank(&self) -> bool {
        [
            &self.line1,
            &self.line2,
            &self.city,
            &self.state,
            &self.postal_code,
            &self.country,
        ]
        .iter()
        .all(|field| field.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    pub relationship: String,
}

impl ValueObject for EmergencyContact {
    fn is_blank(&self) -> bool {
        self.name.trim().is_empty() && self.phone.trim().is_empty() && self.relationship.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactDetails {
    pub phone: String,
    pub address: Address,
    pub date_of_birth: Option<NaiveDate>,
    pub emergency_contact: EmergencyContact,
}

impl ContactDetails {
    pub fn validate(&self) -> DomainResult<()> {
        validate_phone("phone", &self.phone)?;
        validate_phone("emergency contact phone", &self.emergency_contact.phone)
    }
}

/// Values applied when a registration leaves them unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationDefaults {
    pub country: String,
    pub language: String,
    pub timezone: String,
}

impl Default for RegistrationDefaults {
    fn default() -> Self {
        Self {
            country: "United States".to_string(),
            language: "en".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration input
// ─────────────────────────────────────────────────────────────────────────────

/// Input for creating an account.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub password: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
    pub employee_id: Option<String>,
    pub hr: HrDetails,
    pub contact: ContactDetails,
    pub is_verified: bool,
    pub notes: String,
}

impl NewAccount {
    pub fn new(email: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_employee_id(mut self, employee_id: impl Into<String>) -> Self {
        self.employee_id = Some(employee_id.into());
        self
    }

    pub fn in_department(mut self, department: impl Into<String>) -> Self {
        self.hr.department = department.into();
        self
    }
}

impl core::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NewAccount")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("has_password", &self.password.is_some())
            .field("role", &self.role)
            .field("status", &self.status)
            .field("employee_id", &self.employee_id)
            .finish_non_exhaustive()
    }
}

/// A freshly built account together with its profile.
#[derive(Debug, Clone)]
pub struct Registration {
    pub account: Account,
    pub profile: Profile,
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Password(#[from] PasswordError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Account
// ─────────────────────────────────────────────────────────────────────────────

/// The authenticable identity.
///
/// # Invariants
/// - `email` is normalised (trimmed, lower-case) and `username` is trimmed.
/// - Role and status only change through [`Account::change_role`] and
///   [`Account::transition_status`].
/// - Uniqueness of email, username and employee id is enforced by the
///   directory that stores accounts.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    id: AccountId,
    email: String,
    username: String,
    pub first_name: String,
    pub last_name: String,
    role: Role,
    status: AccountStatus,
    employee_id: Option<String>,
    pub hr: HrDetails,
    pub contact: ContactDetails,
    pub is_verified: bool,
    last_login_ip: Option<IpAddr>,
    last_login: Option<DateTime<Utc>>,
    pub notes: String,
    #[serde(skip)]
    password: PasswordHash,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Account {
    /// Validate `new`, hash its password and build the account with its
    /// profile. Role defaults to Employee and status to Pending.
    pub fn register(
        new: NewAccount,
        policy: &PasswordPolicy,
        defaults: &RegistrationDefaults,
        now: DateTime<Utc>,
    ) -> Result<Registration, AccountError> {
        let email = normalize_email(&new.email)?;
        let username = normalize_username(&new.username)?;
        let employee_id = normalize_employee_id(new.employee_id.as_deref())?;
        new.contact.validate()?;

        let password = match new.password.as_deref() {
            Some(raw) => PasswordHash::hash(raw, policy)?,
            None => PasswordHash::unusable(),
        };

        let mut contact = new.contact;
        if contact.address.country.trim().is_empty() {
            contact.address.country = defaults.country.clone();
        }

        let account = Account {
            id: AccountId::new(),
            email,
            username,
            first_name: new.first_name.trim().to_string(),
            last_name: new.last_name.trim().to_string(),
            role: new.role.unwrap_or_default(),
            status: new.status.unwrap_or_default(),
            employee_id,
            hr: new.hr,
            contact,
            is_verified: new.is_verified,
            last_login_ip: None,
            last_login: None,
            notes: new.notes,
            password,
            created_at: now,
            updated_at: now,
        };
        let profile = Profile::for_account(account.id, &defaults.language, &defaults.timezone, now);

        Ok(Registration { account, profile })
    }

    /// Like [`Account::register`], but the account is always a Super Admin
    /// and Active, whatever `new` asks for.
    pub fn register_superuser(
        new: NewAccount,
        policy: &PasswordPolicy,
        defaults: &RegistrationDefaults,
        now: DateTime<Utc>,
    ) -> Result<Registration, AccountError> {
        let new = NewAccount {
            role: Some(Role::SuperAdmin),
            status: Some(AccountStatus::Active),
            ..new
        };
        Self::register(new, policy, defaults, now)
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    pub fn employee_id(&self) -> Option<&str> {
        self.employee_id.as_deref()
    }

    pub fn last_login_ip(&self) -> Option<IpAddr> {
        self.last_login_ip
    }

    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        self.last_login
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// "first last", trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    pub fn short_name(&self) -> &str {
        &self.first_name
    }

    pub fn has_usable_password(&self) -> bool {
        self.password.is_usable()
    }

    pub fn verify_password(&self, raw: &str) -> Result<bool, PasswordError> {
        self.password.verify(raw)
    }

    /// Replace the credential. Hash with [`PasswordHash::hash`] first so the
    /// slow part happens outside any lock.
    pub fn set_password(&mut self, password: PasswordHash, now: DateTime<Utc>) {
        self.password = password;
        self.updated_at = now;
    }

    /// Move to `to` under `policy`. Returns the previous status.
    pub fn transition_status(
        &mut self,
        to: AccountStatus,
        policy: TransitionPolicy,
        now: DateTime<Utc>,
    ) -> DomainResult<AccountStatus> {
        let next = self.status.transition(to, policy)?;
        let previous = core::mem::replace(&mut self.status, next);
        self.updated_at = now;
        Ok(previous)
    }

    /// Returns the previous role.
    pub fn change_role(&mut self, role: Role, now: DateTime<Utc>) -> Role {
        let previous = core::mem::replace(&mut self.role, role);
        self.updated_at = now;
        previous
    }

    /// Set or clear the employee id. Uniqueness is checked by the caller.
    pub fn set_employee_id(&mut self, employee_id: Option<&str>, now: DateTime<Utc>) -> DomainResult<()> {
        self.employee_id = normalize_employee_id(employee_id)?;
        self.updated_at = now;
        Ok(())
    }

    pub fn record_login(&mut self, ip: Option<IpAddr>, now: DateTime<Utc>) {
        if ip.is_some() {
            self.last_login_ip = ip;
        }
        self.last_login = Some(now);
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> AccountId {
        self.id
    }
}

impl core::fmt::Display for Account {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.full_name(), self.email)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Field validation
// ─────────────────────────────────────────────────────────────────────────────

/// Trim and lower-case an email address; requires a single `@` with
/// non-empty local part and domain.
pub fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(DomainError::validation("email is required"));
    }
    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(DomainError::validation("invalid email format")),
    };
    if local.is_empty()
        || domain.is_empty()
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
        || email.len() > 254
    {
        return Err(DomainError::validation("invalid email format"));
    }
    Ok(email)
}

fn normalize_username(raw: &str) -> DomainResult<String> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(DomainError::validation("username is required"));
    }
    if username.chars().count() > 150 {
        return Err(DomainError::validation("username exceeds 150 characters"));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(DomainError::validation(
            "username may only contain letters, digits and @/./+/-/_",
        ));
    }
    Ok(username.to_string())
}

fn normalize_employee_id(raw: Option<&str>) -> DomainResult<Option<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(id) if id.chars().count() > 20 => {
            Err(DomainError::validation("employee id exceeds 20 characters"))
        }
        Some(id) => Ok(Some(id.to_string())),
    }
}

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?1?\d{9,15}$").expect("invalid phone regex"));

/// Empty is allowed; otherwise an optional `+`, an optional leading `1`, then
/// 9 to 15 digits.
fn validate_phone(field: &str, phone: &str) -> DomainResult<()> {
    if phone.is_empty() || PHONE.is_match(phone) {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "{field} must be entered in the format '+999999999' (up to 15 digits)"
        )))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

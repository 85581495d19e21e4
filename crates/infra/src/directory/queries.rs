//! Read-only account listings. Every listing is ordered newest first.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;

use gala_auth::{Account, AccountStatus, Role, is_hr_staff};
use gala_core::{Entity, ValueObject};

use super::AccountDirectory;
use crate::error::DirectoryResult;

/// Location criteria; unset or blank fields match anything. Matching is exact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LocationFilter {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl LocationFilter {
    fn matches(&self, account: &Account) -> bool {
        let address = &account.contact.address;
        let field = |want: &Option<String>, have: &str| {
            want.as_deref()
                .filter(|want| !want.trim().is_empty())
                .is_none_or(|want| want == have)
        };

        field(&self.city, &address.city)
            && field(&self.state, &address.state)
            && field(&self.country, &address.country)
    }
}

fn is_active(account: &Account) -> bool {
    account.status() == AccountStatus::Active
}

impl<B> AccountDirectory<B> {
    fn select<P>(&self, predicate: P) -> DirectoryResult<Vec<Account>>
    where
        P: Fn(&Account) -> bool,
    {
        self.read(|s| {
            let mut accounts: Vec<Account> = s.accounts().filter(|a| predicate(*a)).cloned().collect();
            accounts.sort_by(|a, b| {
                b.created_at()
                    .cmp(&a.created_at())
                    .then_with(|| b.id().cmp(&a.id()))
            });
            Ok(accounts)
        })
    }

    pub fn active_accounts(&self) -> DirectoryResult<Vec<Account>> {
        self.select(is_active)
    }

    /// Active accounts ranked HR Assistant or above.
    pub fn hr_staff(&self) -> DirectoryResult<Vec<Account>> {
        self.select(|a| is_hr_staff(a))
    }

    pub fn pending_accounts(&self) -> DirectoryResult<Vec<Account>> {
        self.by_status(AccountStatus::Pending)
    }

    pub fn by_status(&self, status: AccountStatus) -> DirectoryResult<Vec<Account>> {
        self.select(|a| a.status() == status)
    }

    /// Active accounts in `department`.
    pub fn by_department(&self, department: &str) -> DirectoryResult<Vec<Account>> {
        self.select(|a| is_active(a) && a.hr.department == department)
    }

    /// Active accounts holding exactly `role`.
    pub fn by_role(&self, role: Role) -> DirectoryResult<Vec<Account>> {
        self.select(|a| is_active(a) && a.role() == role)
    }

    pub fn verified_accounts(&self) -> DirectoryResult<Vec<Account>> {
        self.select(|a| is_active(a) && a.is_verified)
    }

    pub fn needing_verification(&self) -> DirectoryResult<Vec<Account>> {
        self.select(|a| is_active(a) && !a.is_verified)
    }

    /// Accounts of any status created on a day within `start..=end` (UTC).
    pub fn created_between(&self, start: NaiveDate, end: NaiveDate) -> DirectoryResult<Vec<Account>> {
        self.select(|a| (start..=end).contains(&a.created_at().date_naive()))
    }

    /// Active accounts hired within `start..=end`.
    pub fn hired_between(&self, start: NaiveDate, end: NaiveDate) -> DirectoryResult<Vec<Account>> {
        self.select(|a| is_active(a) && a.hr.hire_date.is_some_and(|d| (start..=end).contains(&d)))
    }

    pub fn with_employee_id(&self) -> DirectoryResult<Vec<Account>> {
        self.select(|a| is_active(a) && a.employee_id().is_some())
    }

    pub fn without_employee_id(&self) -> DirectoryResult<Vec<Account>> {
        self.select(|a| is_active(a) && a.employee_id().is_none())
    }

    /// Accounts of any status created in the last `days` days. A window
    /// reaching past the representable range covers every account.
    pub fn recent(&self, days: i64, now: DateTime<Utc>) -> DirectoryResult<Vec<Account>> {
        let cutoff = Duration::try_days(days)
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.select(|a| a.created_at() >= cutoff)
    }

    pub fn with_phone(&self) -> DirectoryResult<Vec<Account>> {
        self.select(|a| is_active(a) && !a.contact.phone.trim().is_empty())
    }

    pub fn with_address(&self) -> DirectoryResult<Vec<Account>> {
        self.select(|a| is_active(a) && !a.contact.address.line1.trim().is_empty())
    }

    pub fn with_emergency_contact(&self) -> DirectoryResult<Vec<Account>> {
        self.select(|a| is_active(a) && !a.contact.emergency_contact.is_blank())
    }

    pub fn by_location(&self, filter: &LocationFilter) -> DirectoryResult<Vec<Account>> {
        self.select(|a| is_active(a) && filter.matches(a))
    }
}

#[cfg(test)]
mod tests {
    use gala_auth::{NewAccount, PasswordPolicy};

    use super::*;
    use crate::config::DirectoryConfig;

    fn at(day: u32) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&format!("2026-03-{day:02}T09:00:00Z"))
            .unwrap()
            .with_timezone(&Utc)
    }

    fn directory() -> AccountDirectory {
        AccountDirectory::in_memory(DirectoryConfig {
            password: PasswordPolicy { min_length: 8, cost: 4 },
            ..DirectoryConfig::default()
        })
    }

    fn seeded() -> AccountDirectory {
        let dir = directory();
        let mut ada = NewAccount::new("ada@example.com", "ada")
            .with_role(Role::HrManager)
            .with_status(AccountStatus::Active)
            .with_employee_id("E-1")
            .in_department("People");
        ada.contact.address.city = "Lisbon".to_string();
        ada.hr.hire_date = NaiveDate::from_ymd_opt(2025, 6, 1);
        ada.is_verified = true;
        dir.create_account(ada, at(1)).unwrap();

        let bob = NewAccount::new("bob@example.com", "bob")
            .with_status(AccountStatus::Active)
            .in_department("People");
        dir.create_account(bob, at(5)).unwrap();

        dir.create_account(NewAccount::new("cy@example.com", "cy").in_department("People"), at(10))
            .unwrap();
        dir
    }

    fn emails(accounts: Vec<Account>) -> Vec<String> {
        accounts.into_iter().map(|a| a.email().to_string()).collect()
    }

    #[test]
    fn department_listing_skips_inactive_and_is_newest_first() {
        let dir = seeded();

        assert_eq!(
            emails(dir.by_department("People").unwrap()),
            ["bob@example.com", "ada@example.com"]
        );
    }

    #[test]
    fn status_and_role_filters() {
        let dir = seeded();

        assert_eq!(emails(dir.pending_accounts().unwrap()), ["cy@example.com"]);
        assert_eq!(emails(dir.hr_staff().unwrap()), ["ada@example.com"]);
        assert_eq!(emails(dir.by_role(Role::Employee).unwrap()), ["bob@example.com"]);
        assert_eq!(emails(dir.needing_verification().unwrap()), ["bob@example.com"]);
        assert_eq!(emails(dir.verified_accounts().unwrap()), ["ada@example.com"]);
    }

    #[test]
    fn date_range_listings() {
        let dir = seeded();
        let day = |d| NaiveDate::from_ymd_opt(2026, 3, d).unwrap();

        assert_eq!(
            emails(dir.created_between(day(5), day(10)).unwrap()),
            ["cy@example.com", "bob@example.com"]
        );
        assert_eq!(
            emails(
                dir.hired_between(
                    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                    NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
                )
                .unwrap()
            ),
            ["ada@example.com"]
        );
        assert_eq!(
            emails(dir.recent(6, at(10)).unwrap()),
            ["cy@example.com", "bob@example.com"]
        );
    }

    #[test]
    fn employee_id_and_location_filters() {
        let dir = seeded();

        assert_eq!(emails(dir.with_employee_id().unwrap()), ["ada@example.com"]);
        assert_eq!(emails(dir.without_employee_id().unwrap()), ["bob@example.com"]);

        let lisbon = LocationFilter {
            city: Some("Lisbon".to_string()),
            ..LocationFilter::default()
        };
        assert_eq!(emails(dir.by_location(&lisbon).unwrap()), ["ada@example.com"]);

        let default_country = LocationFilter {
            country: Some("United States".to_string()),
            ..LocationFilter::default()
        };
        assert_eq!(dir.by_location(&default_country).unwrap().len(), 2);

        let blank_city = LocationFilter {
            city: Some("  ".to_string()),
            country: Some(String::new()),
            ..LocationFilter::default()
        };
        assert_eq!(
            emails(dir.by_location(&blank_city).unwrap()),
            ["bob@example.com", "ada@example.com"]
        );
    }

    #[test]
    fn recent_window_beyond_the_calendar_lists_everyone() {
        let dir = seeded();

        assert_eq!(dir.recent(i64::MAX, at(10)).unwrap().len(), 3);
        assert_eq!(dir.recent(1_000_000_000_000, at(10)).unwrap().len(), 3);
    }
}

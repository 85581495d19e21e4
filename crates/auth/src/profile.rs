//! Account profile: professional data and preferences, one per account.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gala_core::{AccountId, DomainError, DomainResult, Entity, ProfileId, ValueObject};

/// One education or work-experience entry (free-form key/value record).
pub type ProfileEntry = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Language code, e.g. "en".
    pub language: String,
    /// Timezone identifier, e.g. "UTC" or "Europe/Berlin".
    pub timezone: String,
    /// Notification channel -> enabled.
    pub notifications: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    pub linkedin: Option<String>,
    /// Code-hosting profile (GitHub, GitLab, ...).
    pub code_host: Option<String>,
    pub website: Option<String>,
}

impl ValueObject for SocialLinks {
    fn is_blank(&self) -> bool {
        self.linkedin.is_none() && self.code_host.is_none() && self.website.is_none()
    }
}

impl SocialLinks {
    fn validate(&self) -> DomainResult<()> {
        let links = [
            ("linkedin", &self.linkedin),
            ("code_host", &self.code_host),
            ("website", &self.website),
        ];
        for (field, url) in links {
            if let Some(url) = url {
                validate_url(field, url)?;
            }
        }
        Ok(())
    }
}

fn validate_url(field: &str, url: &str) -> DomainResult<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| DomainError::validation(format!("{field} must be an http(s) URL")))?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || rest.chars().any(char::is_whitespace) {
        return Err(DomainError::validation(format!("{field} is not a valid URL")));
    }
    Ok(())
}

/// Partial profile edit. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
    pub certifications: Option<Vec<String>>,
    pub education: Option<Vec<ProfileEntry>>,
    pub work_experience: Option<Vec<ProfileEntry>>,
    pub language: Option<String>,
    pub timezone: Option<String>,
    pub notifications: Option<BTreeMap<String, bool>>,
    pub links: Option<SocialLinks>,
}

/// Professional data attached 1:1 to an account.
///
/// Profiles are only ever built together with their account (see
/// [`crate::Account::register`]) and are removed with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    id: ProfileId,
    account_id: AccountId,
    pub bio: String,
    skills: Vec<String>,
    pub certifications: Vec<String>,
    pub education: Vec<ProfileEntry>,
    pub work_experience: Vec<ProfileEntry>,
    pub preferences: Preferences,
    links: SocialLinks,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Profile {
    pub(crate) fn for_account(
        account_id: AccountId,
        language: &str,
        timezone: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ProfileId::new(),
            account_id,
            bio: String::new(),
            skills: Vec::new(),
            certifications: Vec::new(),
            education: Vec::new(),
            work_experience: Vec::new(),
            preferences: Preferences {
                language: language.to_string(),
                timezone: timezone.to_string(),
                notifications: BTreeMap::new(),
            },
            links: SocialLinks::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn skills(&self) -> &[String] {
        &self.skills
    }

    pub fn links(&self) -> &SocialLinks {
        &self.links
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Append a skill unless already present. Returns whether it was added.
    pub fn add_skill(&mut self, skill: &str, now: DateTime<Utc>) -> bool {
        let skill = skill.trim();
        if skill.is_empty() || self.skills.iter().any(|s| s == skill) {
            return false;
        }
        self.skills.push(skill.to_string());
        self.updated_at = now;
        true
    }

    pub fn remove_skill(&mut self, skill: &str, now: DateTime<Utc>) -> bool {
        let before = self.skills.len();
        self.skills.retain(|s| s != skill.trim());
        let removed = self.skills.len() != before;
        if removed {
            self.updated_at = now;
        }
        removed
    }

    /// `None` when the channel has never been configured.
    pub fn notification_enabled(&self, channel: &str) -> Option<bool> {
        self.preferences.notifications.get(channel).copied()
    }

    pub fn set_notification(&mut self, channel: impl Into<String>, enabled: bool, now: DateTime<Utc>) {
        self.preferences.notifications.insert(channel.into(), enabled);
        self.updated_at = now;
    }

    pub fn set_links(&mut self, links: SocialLinks, now: DateTime<Utc>) -> DomainResult<()> {
        links.validate()?;
        self.links = links;
        self.updated_at = now;
        Ok(())
    }

    /// Apply a partial edit. Nothing changes if any field fails validation.
    pub fn apply(&mut self, update: ProfileUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(links) = &update.links {
            links.validate()?;
        }
        if let Some(language) = &update.language {
            if language.trim().is_empty() || language.len() > 10 {
                return Err(DomainError::validation("language must be 1-10 characters"));
            }
        }
        if let Some(timezone) = &update.timezone {
            if timezone.trim().is_empty() || timezone.len() > 50 {
                return Err(DomainError::validation("timezone must be 1-50 characters"));
            }
        }

        if let Some(bio) = update.bio {
            self.bio = bio;
        }
        if let Some(skills) = update.skills {
            self.skills = clean_list(skills);
        }
        if let Some(certifications) = update.certifications {
            self.certifications = clean_list(certifications);
        }
        if let Some(education) = update.education {
            self.education = education;
        }
        if let Some(work_experience) = update.work_experience {
            self.work_experience = work_experience;
        }
        if let Some(language) = update.language {
            self.preferences.language = language.trim().to_string();
        }
        if let Some(timezone) = update.timezone {
            self.preferences.timezone = timezone.trim().to_string();
        }
        if let Some(notifications) = update.notifications {
            self.preferences.notifications = notifications;
        }
        if let Some(links) = update.links {
            self.links = links;
        }
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for Profile {
    type Id = ProfileId;

    fn id(&self) -> ProfileId {
        self.id
    }
}

/// Trim, drop blanks and duplicates, keep first-seen order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|existing| existing == item) {
            out.push(item.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile() -> Profile {
        Profile::for_account(AccountId::new(), "en", "UTC", Utc::now())
    }

    #[test]
    fn new_profile_uses_defaults() {
        let p = profile();
        assert_eq!(p.preferences.language, "en");
        assert_eq!(p.preferences.timezone, "UTC");
        assert!(p.skills().is_empty());
        assert!(p.links().is_blank());
    }

    #[test]
    fn skills_are_unique_and_ordered() {
        let mut p = profile();
        let now = Utc::now();
        assert!(p.add_skill("Python", now));
        assert!(p.add_skill("Rust", now));
        assert!(!p.add_skill("Python", now));
        assert_eq!(p.skills(), ["Python", "Rust"]);
        assert!(p.remove_skill("Python", now));
        assert!(!p.remove_skill("Python", now));
        assert_eq!(p.skills(), ["Rust"]);
    }

    #[test]
    fn update_cleans_lists_and_keeps_entries() {
        let mut p = profile();
        let entry = json!({"school": "TU Delft", "degree": "MSc"});
        let update = ProfileUpdate {
            bio: Some("Recruiter".into()),
            skills: Some(vec![" Hiring ".into(), "".into(), "Hiring".into(), "Sourcing".into()]),
            education: Some(vec![entry.as_object().unwrap().clone()]),
            timezone: Some("Europe/Amsterdam".into()),
            ..Default::default()
        };
        p.apply(update, Utc::now()).unwrap();

        assert_eq!(p.bio, "Recruiter");
        assert_eq!(p.skills(), ["Hiring", "Sourcing"]);
        assert_eq!(p.education[0]["degree"], "MSc");
        assert_eq!(p.preferences.timezone, "Europe/Amsterdam");
        assert_eq!(p.preferences.language, "en");
    }

    #[test]
    fn invalid_links_leave_profile_unchanged() {
        let mut p = profile();
        let update = ProfileUpdate {
            bio: Some("changed".into()),
            links: Some(SocialLinks {
                website: Some("ftp://example.com".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(p.apply(update, Utc::now()).is_err());
        assert_eq!(p.bio, "");
    }

    #[test]
    fn links_accept_http_urls() {
        let mut p = profile();
        let links = SocialLinks {
            linkedin: Some("https://www.linkedin.com/in/jdoe".into()),
            code_host: Some("https://github.com/jdoe".into()),
            website: Some("http://jdoe.dev".into()),
        };
        p.set_links(links.clone(), Utc::now()).unwrap();
        assert_eq!(p.links(), &links);
        assert!(p.set_links(SocialLinks { website: Some("https://".into()), ..Default::default() }, Utc::now()).is_err());
    }

    #[test]
    fn notification_preferences() {
        let mut p = profile();
        assert_eq!(p.notification_enabled("email"), None);
        p.set_notification("email", true, Utc::now());
        p.set_notification("sms", false, Utc::now());
        assert_eq!(p.notification_enabled("email"), Some(true));
        assert_eq!(p.notification_enabled("sms"), Some(false));
    }
}

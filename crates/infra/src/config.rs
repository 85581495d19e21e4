//! Directory configuration loaded from the environment.

use gala_auth::{PasswordPolicy, RegistrationDefaults, TransitionPolicy};
use thiserror::Error;

pub const ENV_PASSWORD_COST: &str = "GALA_PASSWORD_COST";
pub const ENV_MIN_PASSWORD_LENGTH: &str = "GALA_MIN_PASSWORD_LENGTH";
pub const ENV_STATUS_TRANSITIONS: &str = "GALA_STATUS_TRANSITIONS";
pub const ENV_DEFAULT_LANGUAGE: &str = "GALA_DEFAULT_LANGUAGE";
pub const ENV_DEFAULT_TIMEZONE: &str = "GALA_DEFAULT_TIMEZONE";
pub const ENV_DEFAULT_COUNTRY: &str = "GALA_DEFAULT_COUNTRY";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: {message}")]
    Invalid { var: &'static str, message: String },
}

impl ConfigError {
    fn invalid(var: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            message: message.into(),
        }
    }
}

/// Account directory configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    pub password: PasswordPolicy,
    pub transitions: TransitionPolicy,
    pub defaults: RegistrationDefaults,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            password: PasswordPolicy::default(),
            transitions: TransitionPolicy::Strict,
            defaults: RegistrationDefaults::default(),
        }
    }
}

impl DirectoryConfig {
    /// Read `GALA_*` variables, falling back to defaults for unset ones.
    /// Set but malformed values are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_PASSWORD_COST) {
            let cost: u32 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(ENV_PASSWORD_COST, format!("'{raw}' is not a number")))?;
            if !(4..=31).contains(&cost) {
                return Err(ConfigError::invalid(ENV_PASSWORD_COST, "bcrypt cost must be within 4..=31"));
            }
            config.password.cost = cost;
        }

        if let Some(raw) = lookup(ENV_MIN_PASSWORD_LENGTH) {
            let min: usize = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(ENV_MIN_PASSWORD_LENGTH, format!("'{raw}' is not a number")))?;
            if min == 0 {
                return Err(ConfigError::invalid(ENV_MIN_PASSWORD_LENGTH, "must be at least 1"));
            }
            config.password.min_length = min;
        }

        if let Some(raw) = lookup(ENV_STATUS_TRANSITIONS) {
            config.transitions = raw
                .parse()
                .map_err(|e: gala_core::DomainError| ConfigError::invalid(ENV_STATUS_TRANSITIONS, e.to_string()))?;
        }

        if let Some(language) = non_blank(&lookup, ENV_DEFAULT_LANGUAGE)? {
            config.defaults.language = language;
        }
        if let Some(timezone) = non_blank(&lookup, ENV_DEFAULT_TIMEZONE)? {
            config.defaults.timezone = timezone;
        }
        if let Some(country) = non_blank(&lookup, ENV_DEFAULT_COUNTRY)? {
            config.defaults.country = country;
        }

        Ok(config)
    }

    pub fn with_transitions(mut self, transitions: TransitionPolicy) -> Self {
        self.transitions = transitions;
        self
    }

    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password.cost = cost;
        self
    }
}

fn non_blank<F>(lookup: &F, var: &'static str) -> Result<Option<String>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Err(ConfigError::invalid(var, "must not be blank")),
        Some(value) => Ok(Some(value.trim().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = DirectoryConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, DirectoryConfig::default());
        assert_eq!(config.transitions, TransitionPolicy::Strict);
        assert_eq!(config.password.cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.defaults.country, "United States");
    }

    #[test]
    fn values_are_applied() {
        let config = DirectoryConfig::from_lookup(lookup(&[
            (ENV_PASSWORD_COST, "6"),
            (ENV_MIN_PASSWORD_LENGTH, "12"),
            (ENV_STATUS_TRANSITIONS, "permissive"),
            (ENV_DEFAULT_LANGUAGE, "nl"),
            (ENV_DEFAULT_TIMEZONE, "Europe/Amsterdam"),
            (ENV_DEFAULT_COUNTRY, "Netherlands"),
        ]))
        .unwrap();

        assert_eq!(config.password.cost, 6);
        assert_eq!(config.password.min_length, 12);
        assert_eq!(config.transitions, TransitionPolicy::Permissive);
        assert_eq!(config.defaults.language, "nl");
        assert_eq!(config.defaults.timezone, "Europe/Amsterdam");
        assert_eq!(config.defaults.country, "Netherlands");
    }

    #[test]
    fn malformed_values_are_errors() {
        for (var, value) in [
            (ENV_PASSWORD_COST, "cheap"),
            (ENV_PASSWORD_COST, "3"),
            (ENV_MIN_PASSWORD_LENGTH, "0"),
            (ENV_STATUS_TRANSITIONS, "lenient"),
            (ENV_DEFAULT_TIMEZONE, "  "),
        ] {
            let err = DirectoryConfig::from_lookup(lookup(&[(var, value)])).unwrap_err();
            let ConfigError::Invalid { var: reported, .. } = err;
            assert_eq!(reported, var);
        }
    }
}

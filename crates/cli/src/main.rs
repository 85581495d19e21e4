//! `gala`: account directory tooling.
//!
//! - `gala audit` explains authorization decisions for an account in a JSON
//!   fixture.
//! - `gala create-superuser` adds a Super Admin entry to a fixture.
//! - `gala check-config` validates the `GALA_*` environment.

mod fixture;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use gala_auth::{Capability, Check, normalize_email};
use gala_infra::DirectoryConfig;

use crate::fixture::{Fixture, lookup};

#[derive(Parser, Debug)]
#[command(name = "gala", author, version, about = "Account directory and authorization tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Explain authorization decisions for one account of a fixture.
    Audit {
        /// Fixture file (JSON accounts and grants).
        #[arg(long, env = "GALA_FIXTURE")]
        fixture: PathBuf,

        /// Account to evaluate.
        #[arg(long)]
        email: String,

        /// Capability to check (hr-staff, manage-users, approve-users).
        #[arg(long, conflicts_with = "permission")]
        capability: Option<Capability>,

        /// Custom permission name to check.
        #[arg(long)]
        permission: Option<String>,

        /// Evaluation time (RFC 3339). Defaults to now.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Append a Super Admin entry to a fixture, creating the file if needed.
    CreateSuperuser {
        #[arg(long, env = "GALA_FIXTURE")]
        fixture: PathBuf,

        #[arg(long)]
        email: String,

        #[arg(long)]
        username: String,
    },

    /// Validate the GALA_* environment and print the effective settings.
    CheckConfig,
}

fn main() -> ExitCode {
    gala_observability::init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Audit {
            fixture,
            email,
            capability,
            permission,
            at,
        } => {
            let checks = match (capability, permission) {
                (Some(capability), _) => vec![Check::Capability(capability)],
                (None, Some(permission)) => vec![Check::Permission(permission)],
                (None, None) => Capability::ALL.into_iter().map(Check::Capability).collect(),
            };
            audit(&fixture, &email, &checks, at.unwrap_or_else(Utc::now))
        }
        Command::CreateSuperuser {
            fixture,
            email,
            username,
        } => create_superuser(&fixture, &email, &username),
        Command::CheckConfig => check_config(),
    }
}

fn config() -> Result<DirectoryConfig> {
    DirectoryConfig::from_env().context("invalid GALA_* configuration")
}

fn audit(path: &Path, email: &str, checks: &[Check], at: DateTime<Utc>) -> Result<()> {
    let dir = Fixture::read(path)?.load(config()?, at)?;
    let id = lookup(&dir, email)?;

    let explanations = checks
        .iter()
        .map(|check| dir.explain(id, check, at))
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        account_id = %id,
        checks = explanations.len(),
        granted = explanations.iter().filter(|e| e.granted).count(),
        "audit evaluated"
    );
    println!("{}", serde_json::to_string_pretty(&explanations)?);
    Ok(())
}

fn create_superuser(path: &Path, email: &str, username: &str) -> Result<()> {
    let email = normalize_email(email)?;
    if username.trim().is_empty() {
        bail!("username is required");
    }

    let mut document = if path.exists() {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str::<serde_json::Value>(&raw).with_context(|| format!("parsing {}", path.display()))?
    } else {
        serde_json::json!({ "accounts": [], "grants": [] })
    };

    let Some(accounts) = document
        .as_object_mut()
        .map(|doc| doc.entry("accounts").or_insert_with(|| serde_json::json!([])))
        .and_then(serde_json::Value::as_array_mut)
    else {
        bail!("{} is not a fixture object", path.display());
    };
    accounts.push(serde_json::json!({
        "email": email,
        "username": username.trim(),
        "superuser": true,
    }));

    // Load the result before writing so a duplicate never reaches disk.
    let fixture: Fixture = serde_json::from_value(document.clone())?;
    fixture.load(config()?, Utc::now())?;

    std::fs::write(path, serde_json::to_string_pretty(&document)?)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(email = %email, fixture = %path.display(), "superuser added");
    Ok(())
}

fn check_config() -> Result<()> {
    let summary = config_summary(&config()?);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn config_summary(config: &DirectoryConfig) -> serde_json::Value {
    serde_json::json!({
        "password": {
            "min_length": config.password.min_length,
            "cost": config.password.cost,
        },
        "status_transitions": config.transitions,
        "defaults": {
            "language": config.defaults.language,
            "timezone": config.defaults.timezone,
            "country": config.defaults.country,
        },
    })
}

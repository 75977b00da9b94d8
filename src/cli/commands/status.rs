//! Status command implementation.

use crate::cli::commands::{block_on, open_database, owner};
use crate::config::Settings;
use crate::error::Result;
use crate::model::{Domain, SyncStateEntry};
use crate::storage::{Database, GoalStore, KickStore, SymptomStore, SyncStateTracker};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

/// Output for status command.
#[derive(Serialize)]
struct StatusOutput {
    user: Option<String>,
    schema_version: i64,
    domains: Vec<DomainStatus>,
}

#[derive(Serialize)]
struct DomainStatus {
    domain: Domain,
    last_success_at: Option<String>,
    last_error: Option<String>,
    needs_attention: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending: Option<usize>,
}

/// Execute status command.
///
/// Shows every domain's last sync outcome. When a user is known, pending
/// row counts are included; otherwise they are omitted rather than failing.
pub fn execute(db_path: Option<&PathBuf>, user: Option<&str>, json: bool) -> Result<()> {
    let settings = Settings::load()?;
    // Stale after two missed background intervals.
    let max_age = settings.sync_interval() * 2;
    let user = owner(user).ok();

    block_on(async {
        let db = open_database(db_path).await?;
        let tracker = SyncStateTracker::new(db.clone());
        let schema_version = db.schema_version().await?;

        let mut domains = Vec::with_capacity(Domain::ALL.len());
        for (domain, entry) in tracker.all().await? {
            let SyncStateEntry {
                last_success_at,
                last_error,
            } = entry;
            let pending = match &user {
                Some(user) => pending_count(&db, domain, user).await?,
                None => None,
            };
            domains.push(DomainStatus {
                domain,
                last_success_at,
                last_error,
                needs_attention: tracker.needs_attention(domain, max_age).await?,
                pending,
            });
        }

        let output = StatusOutput {
            user,
            schema_version,
            domains,
        };
        if json {
            println!("{}", serde_json::to_string(&output)?);
        } else {
            print_status(&output);
        }
        Ok(())
    })
}

async fn pending_count(db: &Database, domain: Domain, user: &str) -> Result<Option<usize>> {
    let count = match domain {
        Domain::Kicks => KickStore::new(db.clone()).get_pending(user).await?.len(),
        Domain::Symptoms => SymptomStore::new(db.clone()).get_pending(user).await?.len(),
        Domain::Goals => GoalStore::new(db.clone()).get_pending(user).await?.len(),
        Domain::Profile | Domain::Content => return Ok(None),
    };
    Ok(Some(count))
}

fn print_status(output: &StatusOutput) {
    println!("{}", "kicksync status".bold());
    println!();
    match &output.user {
        Some(user) => println!("User:    {user}"),
        None => println!("User:    {}", "not signed in".yellow()),
    }
    println!("Schema:  v{}", output.schema_version);
    println!();

    for d in &output.domains {
        let marker = if d.last_error.is_some() {
            "✗".red()
        } else if d.needs_attention {
            "!".yellow()
        } else {
            "✓".green()
        };
        let last = d.last_success_at.as_deref().unwrap_or("never");
        let pending = d
            .pending
            .map(|n| format!("  {n} pending"))
            .unwrap_or_default();
        println!("{marker} {:<9} last synced {}{}", d.domain, last.dimmed(), pending);
        if let Some(err) = &d.last_error {
            println!("  {}", err.red());
        }
    }
}

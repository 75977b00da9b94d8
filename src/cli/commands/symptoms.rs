//! Symptoms command implementation.

use crate::cli::SymptomCommands;
use crate::cli::commands::kicks::status_label;
use crate::cli::commands::{block_on, open_database, owner};
use crate::clock::iso_to_millis;
use crate::error::{Error, Result};
use crate::model::SymptomLogDraft;
use crate::storage::SymptomStore;
use colored::Colorize;
use std::path::PathBuf;

/// Execute symptoms commands.
///
/// # Errors
///
/// Returns an error if no user is signed in, an argument is invalid or the
/// store fails.
pub fn execute(command: &SymptomCommands, db_path: Option<&PathBuf>, user: Option<&str>, json: bool) -> Result<()> {
    let owner = owner(user)?;
    block_on(async {
        let store = SymptomStore::new(open_database(db_path).await?);
        match command {
            SymptomCommands::Add {
                symptom,
                severity,
                notes,
                at,
            } => {
                if symptom.trim().is_empty() {
                    return Err(Error::InvalidArgument("symptom cannot be empty".into()));
                }
                let mut draft = SymptomLogDraft::new(&owner, symptom.trim());
                if let Some(severity) = severity {
                    draft = draft.with_severity(*severity);
                }
                if let Some(at) = at {
                    if iso_to_millis(at).is_none() {
                        return Err(Error::InvalidArgument(format!("--at must be an ISO-8601 timestamp, got '{at}'")));
                    }
                    draft = draft.logged_at(at);
                }
                draft.notes.clone_from(notes);
                let log = store.upsert(draft).await?;

                if json {
                    println!("{}", serde_json::to_string(&log)?);
                } else {
                    println!("Logged {} at {} [{}]", log.symptom, log.logged_at, log.id);
                }
            }
            SymptomCommands::List { limit } => {
                let logs = store.get_recent(&owner, *limit).await?;

                if json {
                    println!("{}", serde_json::to_string(&logs)?);
                } else if logs.is_empty() {
                    println!("No symptom logs");
                } else {
                    for log in &logs {
                        let severity = log.severity.map_or_else(|| "-".to_string(), |s| s.to_string());
                        println!(
                            "{}  {:<20} severity {}  {}",
                            log.logged_at,
                            log.symptom,
                            severity,
                            status_label(log.sync_status)
                        );
                        if let Some(notes) = &log.notes {
                            println!("    {}", notes.dimmed());
                        }
                    }
                }
            }
        }
        Ok(())
    })
}

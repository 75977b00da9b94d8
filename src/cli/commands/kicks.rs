//! Kicks command implementation.

use crate::cli::KickCommands;
use crate::cli::commands::{block_on, check_date, open_database, owner, today};
use crate::error::{Error, Result};
use crate::model::{KickEntry, KickEntryDraft, SyncStatus};
use crate::storage::{KickFilter, KickStore};
use colored::Colorize;
use std::path::PathBuf;

/// Execute kicks commands.
///
/// # Errors
///
/// Returns an error if no user is signed in, an argument is invalid or the
/// store fails.
pub fn execute(command: &KickCommands, db_path: Option<&PathBuf>, user: Option<&str>, json: bool) -> Result<()> {
    let owner = owner(user)?;
    block_on(async {
        let store = KickStore::new(open_database(db_path).await?);
        match command {
            KickCommands::Add {
                count,
                date,
                time_of_day,
                notes,
                id,
            } => {
                let date = date.clone().unwrap_or_else(today);
                check_date(&date, "date")?;
                if time_of_day.trim().is_empty() {
                    return Err(Error::InvalidArgument("time of day cannot be empty".into()));
                }

                let mut draft = KickEntryDraft::new(&owner, date, time_of_day.trim(), *count);
                if let Some(id) = id {
                    draft = draft.with_id(id);
                }
                if let Some(notes) = notes {
                    draft = draft.with_notes(notes);
                }
                let entry = store.upsert(draft).await?;

                if json {
                    println!("{}", serde_json::to_string(&entry)?);
                } else {
                    println!("Recorded {} kicks on {} ({}) [{}]", entry.count, entry.date, entry.time_of_day, entry.id);
                }
            }
            KickCommands::List { date, from, to } => {
                let mut filter = KickFilter::owner(&owner);
                if let Some(date) = date {
                    check_date(date, "date")?;
                    filter = filter.on(date);
                }
                if let (Some(from), Some(to)) = (from, to) {
                    check_date(from, "from")?;
                    check_date(to, "to")?;
                    filter = filter.between(from, to);
                }
                let entries = store.get(filter).await?;

                if json {
                    println!("{}", serde_json::to_string(&entries)?);
                } else {
                    print_entries(&entries);
                }
            }
            KickCommands::Totals { from, to } => {
                let to = to.clone().unwrap_or_else(today);
                check_date(from, "from")?;
                check_date(&to, "to")?;
                let totals = store.daily_totals(&owner, from, &to).await?;

                if json {
                    println!("{}", serde_json::to_string(&totals)?);
                } else if totals.is_empty() {
                    println!("No kicks recorded between {from} and {to}");
                } else {
                    for day in &totals {
                        println!("{}  {:>4} kicks  ({} sessions)", day.date, day.total, day.sessions);
                    }
                }
            }
        }
        Ok(())
    })
}

fn print_entries(entries: &[KickEntry]) {
    if entries.is_empty() {
        println!("No kick entries");
        return;
    }
    for entry in entries {
        println!(
            "{}  {:<10} {:>4}  {}  {}",
            entry.date,
            entry.time_of_day,
            entry.count,
            status_label(entry.sync_status),
            entry.id.dimmed()
        );
        if let Some(notes) = &entry.notes {
            println!("            {}", notes.dimmed());
        }
    }
}

/// Colored sync status for list output.
pub(crate) fn status_label(status: SyncStatus) -> colored::ColoredString {
    match status {
        SyncStatus::Synced => status.as_str().green(),
        SyncStatus::Pending => status.as_str().yellow(),
        SyncStatus::Failed => status.as_str().red(),
    }
}

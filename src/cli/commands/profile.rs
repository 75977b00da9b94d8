//! Profile command implementation.

use crate::cli::ProfileCommands;
use crate::cli::commands::kicks::status_label;
use crate::cli::commands::{block_on, open_database, owner};
use crate::error::Result;
use crate::storage::ProfileStore;
use std::path::PathBuf;

/// Execute profile commands.
///
/// # Errors
///
/// Returns an error if no user is signed in or the store fails.
pub fn execute(command: &ProfileCommands, db_path: Option<&PathBuf>, user: Option<&str>, json: bool) -> Result<()> {
    let owner = owner(user)?;
    block_on(async {
        let store = ProfileStore::new(open_database(db_path).await?);
        match command {
            ProfileCommands::Show => {
                let profile = store.get(&owner).await?;
                if json {
                    println!("{}", serde_json::to_string(&profile)?);
                    return Ok(());
                }
                let Some(profile) = profile else {
                    println!("No profile stored for {owner}. Run `kicksync sync` to fetch it.");
                    return Ok(());
                };
                println!("User:      {}", profile.user_id);
                if let Some(name) = &profile.display_name {
                    println!("Name:      {name}");
                }
                if let Some(due) = &profile.due_date {
                    println!("Due date:  {due}");
                }
                if let Some(week) = profile.pregnancy_week {
                    println!("Week:      {week}");
                }
                println!("Updated:   {} ({})", profile.updated_at, status_label(profile.sync_status));
            }
        }
        Ok(())
    })
}

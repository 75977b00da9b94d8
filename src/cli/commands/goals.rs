//! Goals command implementation.

use crate::cli::GoalCommands;
use crate::cli::commands::kicks::status_label;
use crate::cli::commands::{block_on, check_date, open_database, owner};
use crate::error::{Error, Result};
use crate::model::{Goal, GoalDraft};
use crate::storage::GoalStore;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct RemoveOutput<'a> {
    id: &'a str,
    removed: bool,
}

/// Execute goals commands.
///
/// # Errors
///
/// Returns an error if no user is signed in, an argument is invalid, the
/// goal does not belong to the user or the store fails.
pub fn execute(command: &GoalCommands, db_path: Option<&PathBuf>, user: Option<&str>, json: bool) -> Result<()> {
    let owner = owner(user)?;
    block_on(async {
        let store = GoalStore::new(open_database(db_path).await?);
        match command {
            GoalCommands::Add {
                title,
                category,
                target_date,
                id,
            } => {
                if title.trim().is_empty() {
                    return Err(Error::InvalidArgument("title cannot be empty".into()));
                }
                if let Some(date) = target_date {
                    check_date(date, "target date")?;
                }
                let mut draft = GoalDraft::new(&owner, title.trim());
                draft.category.clone_from(category);
                draft.target_date.clone_from(target_date);
                if let Some(id) = id {
                    draft = draft.with_id(id);
                }
                let goal = store.upsert(draft).await?;
                print_goal(&goal, json)?;
            }
            GoalCommands::List => {
                let goals = store.get_all(&owner).await?;
                if json {
                    println!("{}", serde_json::to_string(&goals)?);
                } else if goals.is_empty() {
                    println!("No goals");
                } else {
                    for goal in &goals {
                        let mark = if goal.completed { "[x]".green() } else { "[ ]".normal() };
                        let target = goal.target_date.as_deref().unwrap_or("");
                        println!(
                            "{mark} {:<32} {:<10} {}  {}",
                            goal.title,
                            target,
                            status_label(goal.sync_status),
                            goal.id.dimmed()
                        );
                    }
                }
            }
            GoalCommands::Complete { id } => {
                let goal = store
                    .get(id)
                    .await?
                    .filter(|g| g.user_id == owner)
                    .ok_or_else(|| Error::InvalidArgument(format!("no goal with id '{id}'")))?;
                let mut draft = GoalDraft::from(goal);
                draft.completed = true;
                let goal = store.upsert(draft).await?;
                print_goal(&goal, json)?;
            }
            GoalCommands::Remove { id } => {
                let removed = match store.get(id).await? {
                    Some(goal) if goal.user_id == owner => {
                        store.remove(id).await?;
                        true
                    }
                    _ => false,
                };
                if json {
                    println!("{}", serde_json::to_string(&RemoveOutput { id, removed })?);
                } else if removed {
                    println!("Removed goal {id}");
                } else {
                    println!("No goal with id {id}");
                }
            }
        }
        Ok(())
    })
}

fn print_goal(goal: &Goal, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(goal)?);
    } else {
        let state = if goal.completed { "completed" } else { "open" };
        println!("Goal {} ({state}) [{}]", goal.title, goal.id);
    }
    Ok(())
}

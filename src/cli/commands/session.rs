//! Session command implementation.
//!
//! Manages the local session marker. Signing out also wipes local user
//! data unless asked to keep it.

use crate::cli::SessionCommands;
use crate::cli::commands::{block_on, open_database, session_marker};
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct SessionOutput {
    user_id: Option<String>,
    updated_at: Option<String>,
}

#[derive(Serialize)]
struct ClearOutput {
    signed_out: bool,
    data_cleared: bool,
}

/// Execute session commands.
///
/// # Errors
///
/// Returns an error if the marker cannot be written or local data cannot be
/// cleared.
pub fn execute(command: &SessionCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    match command {
        SessionCommands::Set { user } => set(user, json),
        SessionCommands::Clear { keep_data } => clear(*keep_data, db_path, json),
        SessionCommands::Show => show(json),
    }
}

fn set(user: &str, json: bool) -> Result<()> {
    let user = user.trim();
    if user.is_empty() {
        return Err(Error::InvalidArgument("user id cannot be empty".into()));
    }

    let marker = session_marker()?;
    let now = SystemClock.now_iso();
    marker.write(user, &now)?;

    if json {
        let output = SessionOutput {
            user_id: Some(user.to_string()),
            updated_at: Some(now),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Signed in as {user}");
    }
    Ok(())
}

fn clear(keep_data: bool, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let marker = session_marker()?;
    let signed_out = marker.clear()?;

    let data_cleared = if keep_data {
        false
    } else {
        block_on(async {
            let db = open_database(db_path).await?;
            db.clear_user_data().await?;
            Ok(())
        })?;
        true
    };

    if json {
        let output = ClearOutput {
            signed_out,
            data_cleared,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        if signed_out {
            println!("Signed out");
        } else {
            println!("No user was signed in");
        }
        if data_cleared {
            println!("Local data cleared");
        }
    }
    Ok(())
}

fn show(json: bool) -> Result<()> {
    let entry = session_marker()?.read();

    if json {
        let output = SessionOutput {
            user_id: entry.as_ref().map(|e| e.user_id.clone()),
            updated_at: entry.map(|e| e.updated_at),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        match entry {
            Some(e) => println!("Signed in as {} (since {})", e.user_id, e.updated_at),
            None => println!("Not signed in"),
        }
    }
    Ok(())
}

//! Migrate command implementation.

use crate::cli::commands::{block_on, open_database};
use crate::error::Result;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct MigrateOutput {
    schema_version: i64,
}

/// Open (creating if needed) the store and apply pending migrations.
///
/// # Errors
///
/// Returns an error if a migration fails; the process should not continue
/// against an unknown schema.
pub fn execute(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    block_on(async {
        let db = open_database(db_path).await?;
        let schema_version = db.schema_version().await?;

        if json {
            println!("{}", serde_json::to_string(&MigrateOutput { schema_version })?);
        } else {
            println!("Schema at version {schema_version}");
        }
        Ok(())
    })
}

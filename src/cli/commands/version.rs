//! Version command implementation.

use crate::error::Result;
use crate::storage::migrations;
use serde::Serialize;

#[derive(Serialize)]
struct VersionOutput {
    version: &'static str,
    profile: &'static str,
    /// Highest schema version this binary migrates to.
    schema: i64,
}

impl VersionOutput {
    fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            profile: if cfg!(debug_assertions) { "dev" } else { "release" },
            schema: migrations::latest_version(),
        }
    }
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let output = VersionOutput::current();
    if json {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!(
            "kicksync {} ({}, schema v{})",
            output.version, output.profile, output.schema
        );
    }
    Ok(())
}

//! Sync command implementation.

use crate::cli::SyncArgs;
use crate::cli::commands::{block_on, open_database, orchestrator, owner};
use crate::config::Settings;
use crate::error::{Error, Result, SyncError};
use crate::model::Domain;
use crate::sync::{DomainOutcome, SyncCounts, SyncOptions, SyncReport};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct DomainOutput {
    domain: Domain,
    pushed: usize,
    pulled: usize,
}

/// Execute the sync command.
///
/// With `--domain` only that domain runs; otherwise a full run.
///
/// # Errors
///
/// Returns an error if the remote is not configured or any domain failed.
/// Failed domains are also recorded in the sync state.
pub fn execute(args: &SyncArgs, db_path: Option<&PathBuf>, user: Option<&str>, json: bool) -> Result<()> {
    let settings = Settings::load()?;
    let domain = args
        .domain
        .as_deref()
        .map(str::parse::<Domain>)
        .transpose()
        .map_err(Error::InvalidArgument)?;
    let owner = match domain {
        Some(Domain::Content) => String::new(),
        _ => owner(user)?,
    };

    block_on(async {
        let sync = orchestrator(open_database(db_path).await?, &settings)?;

        if let Some(domain) = domain {
            if args.skip_if_offline && !sync.is_online().await {
                print_report(&SyncReport::offline(), json)?;
                return Ok(());
            }
            let counts = sync.sync_domain(&owner, domain).await?;
            print_domain(domain, counts, json)?;
            return Ok(());
        }

        let options = SyncOptions {
            include_content: args.content,
            skip_if_offline: args.skip_if_offline,
        };
        match sync.sync_all(&owner, options).await {
            Ok(report) => print_report(&report, json),
            Err(SyncError::Partial { failed, report }) => {
                print_report(&report, json)?;
                Err(SyncError::Partial { failed, report }.into())
            }
            Err(e) => Err(e.into()),
        }
    })
}

fn print_domain(domain: Domain, counts: SyncCounts, json: bool) -> Result<()> {
    if json {
        let output = DomainOutput {
            domain,
            pushed: counts.pushed,
            pulled: counts.pulled,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{domain}: pushed {}, pulled {}", counts.pushed, counts.pulled);
    }
    Ok(())
}

fn print_report(report: &SyncReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
        return Ok(());
    }

    if report.skipped_offline {
        println!("{}", "Offline, nothing synced".yellow());
        return Ok(());
    }

    for (domain, outcome) in &report.outcomes {
        match outcome {
            DomainOutcome::Synced { pushed, pulled } => {
                println!("{} {domain:<9} pushed {pushed}, pulled {pulled}", "✓".green());
            }
            DomainOutcome::Failed { error } => {
                println!("{} {domain:<9} {}", "✗".red(), error.red());
            }
        }
    }
    Ok(())
}

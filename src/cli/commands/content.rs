//! Content command implementation.

use crate::cli::{ContentCommands, ContentKind};
use crate::cli::commands::{block_on, open_database};
use crate::clock::millis_to_iso;
use crate::error::Result;
use crate::storage::{ContentCache, ContentFilter};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct PurgeOutput {
    purged: usize,
}

/// Execute content commands. Content is shared, so no user is needed.
///
/// # Errors
///
/// Returns an error if the store fails.
pub fn execute(command: &ContentCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    block_on(async {
        let cache = ContentCache::new(open_database(db_path).await?);
        match command {
            ContentCommands::List {
                kind,
                category,
                include_expired,
            } => {
                let mut filter = ContentFilter::default().include_expired(*include_expired);
                if let Some(category) = category {
                    filter = filter.category(category);
                }

                match kind {
                    ContentKind::Articles => {
                        let articles = cache.get_cached_articles(filter).await?;
                        if json {
                            println!("{}", serde_json::to_string(&articles)?);
                        } else if articles.is_empty() {
                            println!("No cached articles");
                        } else {
                            for article in &articles {
                                let category = article.category.as_deref().unwrap_or("-");
                                println!("{:<40} {:<14} {}", article.title, category, expiry(article.expires_at).dimmed());
                            }
                        }
                    }
                    ContentKind::Tips => {
                        let tips = cache.get_cached_tips(filter).await?;
                        if json {
                            println!("{}", serde_json::to_string(&tips)?);
                        } else if tips.is_empty() {
                            println!("No cached tips");
                        } else {
                            for tip in &tips {
                                let week = tip.week.map_or_else(|| "-".to_string(), |w| format!("week {w}"));
                                println!("{:<40} {:<8} {}", tip.title, week, expiry(tip.expires_at).dimmed());
                            }
                        }
                    }
                }
            }
            ContentCommands::Purge => {
                let purged = cache.purge_expired().await?;
                if json {
                    println!("{}", serde_json::to_string(&PurgeOutput { purged })?);
                } else {
                    println!("Purged {purged} expired items");
                }
            }
        }
        Ok(())
    })
}

fn expiry(expires_at: Option<i64>) -> String {
    expires_at.map_or_else(|| "never expires".to_string(), |ms| format!("expires {}", millis_to_iso(ms)))
}

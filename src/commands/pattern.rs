use clap::{Args, Subcommand};
use serde_json::json;

use gutwise_core::{Pattern, SyncAction, SyncKind};

use super::{queue_change, OutputFormat};
use crate::api::ApiClient;
use crate::config::Config;
use crate::context::AppContext;

/// Cache key for the server-computed pattern list.
const PATTERNS_CACHE_KEY: &str = "patterns";

#[derive(Args)]
pub struct PatternCommand {
    #[command(subcommand)]
    pub command: PatternSubcommand,
}

#[derive(Subcommand)]
pub enum PatternSubcommand {
    /// Show detected food/symptom patterns
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Ignore the cached copy and ask the server again
        #[arg(long)]
        refresh: bool,
    },

    /// Dismiss a pattern so it is no longer shown
    Dismiss {
        /// Pattern ID
        id: String,
    },
}

impl PatternCommand {
    pub async fn run(
        &self,
        ctx: &AppContext,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            PatternSubcommand::List { format, refresh } => {
                if *refresh {
                    ctx.cache.remove(PATTERNS_CACHE_KEY);
                }
                let (patterns, fresh) = load_patterns(ctx, config).await;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&patterns)?);
                    }
                    OutputFormat::Text => {
                        if !fresh {
                            println!("(offline: showing last saved patterns)");
                            println!();
                        }
                        if patterns.is_empty() {
                            println!("No patterns detected yet. Keep logging meals and symptoms.");
                            return Ok(());
                        }
                        for pattern in &patterns {
                            println!("{}", pattern);
                            println!("  ID: {}", pattern.id);
                        }
                    }
                }
                Ok(())
            }

            PatternSubcommand::Dismiss { id } => {
                if !ctx.domain.delete_pattern(id) {
                    return Err(format!("Pattern not found: {}", id).into());
                }
                ctx.cache.remove(PATTERNS_CACHE_KEY);
                queue_change(ctx, SyncKind::Pattern, SyncAction::Delete, &json!({ "id": id }));

                println!("Dismissed pattern {}", id);
                Ok(())
            }
        }
    }

    /// Whether this subcommand changes local data.
    pub fn is_write(&self) -> bool {
        matches!(self.command, PatternSubcommand::Dismiss { .. })
    }
}

/// Returns the current patterns and whether they came from the server or a
/// still-valid cached copy. When neither is available the last saved local
/// copy is returned instead.
async fn load_patterns(ctx: &AppContext, config: &Config) -> (Vec<Pattern>, bool) {
    let fetched: Option<Vec<Pattern>> = match ApiClient::from_config(&config.sync) {
        Ok(client) => {
            ctx.cache
                .get_or_fetch(PATTERNS_CACHE_KEY, config.cache_ttl(), || {
                    client.fetch_patterns()
                })
                .await
        }
        Err(_) => ctx.cache.get(PATTERNS_CACHE_KEY),
    };

    match fetched {
        Some(patterns) => {
            ctx.domain.save_patterns(&patterns);
            (patterns, true)
        }
        None => (ctx.domain.list_patterns(), false),
    }
}

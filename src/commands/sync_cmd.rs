//! Sync CLI commands for delivering queued changes to the server.

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};

use gutwise_core::{spawn_auto_drain_with_retry, DrainReport};

use crate::api::{spawn_probe, ApiClient};
use crate::config::Config;
use crate::context::AppContext;
use crate::sync::drain_queue;

/// Timeout of the first reachability check.
const INITIAL_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Sync with remote server
#[derive(Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    pub command: Option<SyncSubcommand>,
}

#[derive(Subcommand)]
pub enum SyncSubcommand {
    /// Show sync configuration, queued changes and server status
    Status,

    /// Discard every queued change without sending it
    Clear,

    /// Keep running and sync whenever the server becomes reachable
    Watch,
}

impl SyncCommand {
    pub async fn run(
        &self,
        ctx: &AppContext,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            None => self.sync(ctx, config).await,
            Some(SyncSubcommand::Status) => self.status(ctx, config).await,
            Some(SyncSubcommand::Clear) => {
                let count = ctx.queue.len();
                if !ctx.queue.clear() {
                    return Err("Failed to clear the sync queue".into());
                }
                println!("Discarded {} queued change(s).", count);
                Ok(())
            }
            Some(SyncSubcommand::Watch) => self.watch(ctx, config).await,
        }
    }

    async fn sync(&self, ctx: &AppContext, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let client = ApiClient::from_config(&config.sync)?;

        if ctx.queue.is_empty() {
            println!("Nothing to sync.");
            return Ok(());
        }

        println!("Syncing {} queued change(s) with {}...", ctx.queue.len(), client.api_url());

        let online = client.check_server(INITIAL_PROBE_TIMEOUT).await;
        ctx.monitor.set_online(online);

        if !online {
            println!(
                "Server unreachable, waiting up to {}s...",
                config.sync.connect_timeout_secs
            );
            let probe = spawn_probe(
                client.clone(),
                ctx.monitor.clone(),
                config.sync.probe_interval(),
            );
            let connected = ctx
                .monitor
                .wait_for_connection(config.sync.connect_timeout())
                .await;
            probe.abort();

            if !connected {
                println!("Still offline. {} change(s) remain queued.", ctx.queue.len());
                return Ok(());
            }
        }

        let report = drain_queue(&ctx.queue, &client).await;
        print_report(&report, ctx.queue.len());
        Ok(())
    }

    async fn status(&self, ctx: &AppContext, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        let items = ctx.queue.peek_all();
        println!("Namespace:   {}", ctx.store.namespace());
        println!("Queued:      {} change(s)", items.len());
        println!("Max retries: {}", ctx.queue.max_retries());
        for item in &items {
            println!("  - {}", item);
        }
        println!();

        let url = match config.sync.api_url.as_ref() {
            Some(url) => url,
            None => {
                println!("Status: Not configured");
                println!();
                println!("To enable sync, add to your config file:");
                println!();
                println!("  sync:");
                println!("    api_url: \"https://api.example.com\"");
                println!();
                println!("Or set environment variable:");
                println!("  GUTWISE_API_URL");
                return Ok(());
            }
        };

        println!("Server:    {}", url);
        println!(
            "Auto-sync: {}",
            if config.sync.auto_sync {
                "enabled"
            } else {
                "disabled"
            }
        );

        let client = ApiClient::from_config(&config.sync)?;
        if client.check_server(INITIAL_PROBE_TIMEOUT).await {
            println!("Server status: ✓ reachable");
        } else {
            println!("Server status: ✗ unreachable");
        }

        Ok(())
    }

    async fn watch(&self, ctx: &AppContext, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let client = ApiClient::from_config(&config.sync)?;

        let probe = spawn_probe(
            client.clone(),
            ctx.monitor.clone(),
            config.sync.probe_interval(),
        );
        let auto = spawn_auto_drain_with_retry(
            Arc::clone(&ctx.queue),
            &ctx.monitor,
            config.sync.probe_interval(),
            move |item| {
                let client = client.clone();
                async move { client.send_item(&item).await }
            },
        );

        println!(
            "Watching {} every {}s. Press Ctrl-C to stop.",
            config.sync.api_url.as_deref().unwrap_or_default(),
            config.sync.probe_interval().as_secs()
        );
        tokio::signal::ctrl_c().await?;

        auto.stop();
        probe.abort();
        println!("Stopped. {} change(s) still queued.", ctx.queue.len());
        Ok(())
    }
}

fn print_report(report: &DrainReport, remaining: usize) {
    if report.skipped {
        println!("Another sync is already running.");
        return;
    }

    println!();
    println!("  ✓ {} sent", report.sent.len());
    if !report.retried.is_empty() {
        println!("  ↻ {} failed, will retry", report.retried.len());
    }
    if !report.dropped.is_empty() {
        println!("  ✗ {} dropped after repeated failures:", report.dropped.len());
        for id in &report.dropped {
            println!("      {}", id);
        }
    }
    println!();

    if remaining == 0 {
        println!("Sync complete.");
    } else {
        println!("{} change(s) remain queued.", remaining);
    }
}

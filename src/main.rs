use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod commands;
mod config;
mod context;
mod sync;

use commands::{
    CacheCommand, ConfigCommand, MealCommand, PatternCommand, ResetCommand, SymptomCommand,
    SyncCommand,
};
use config::Config;
use context::AppContext;
use sync::try_auto_sync;

#[derive(Parser)]
#[command(name = "gutwise")]
#[command(version)]
#[command(about = "Track meals and gut symptoms, offline first", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log and review meals
    Meal(MealCommand),

    /// Log and review symptoms
    Symptom(SymptomCommand),

    /// View food/symptom patterns detected by the server
    Pattern(PatternCommand),

    /// Send queued changes to the server
    Sync(SyncCommand),

    /// Manage cached server responses
    Cache(CacheCommand),

    /// Manage configuration
    Config(ConfigCommand),

    /// Delete all local data
    Reset(ResetCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gutwise=warn,gutwise_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Save config path for config init
    let cli_config_path = cli.config.clone();

    let config = Config::load(cli.config)?;

    let command = match cli.command {
        Some(command) => command,
        None => {
            println!("Use --help to see available commands");
            return Ok(());
        }
    };

    if let Commands::Config(cmd) = &command {
        return cmd.run(&config, cli_config_path);
    }

    let ctx = AppContext::open(&config);
    tracing::debug!("Opened store at {}", config.data_dir.value.display());

    execute_command(&command, &ctx, &config).await?;

    // Auto-sync AFTER write commands (only if command succeeded)
    if is_write_command(&command) {
        try_auto_sync(&config, &ctx).await;
    }

    Ok(())
}

async fn execute_command(
    command: &Commands,
    ctx: &AppContext,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Meal(cmd) => cmd.run(ctx, config),
        Commands::Symptom(cmd) => cmd.run(ctx, config),
        Commands::Pattern(cmd) => cmd.run(ctx, config).await,
        Commands::Sync(cmd) => cmd.run(ctx, config).await,
        Commands::Cache(cmd) => cmd.run(ctx),
        Commands::Reset(cmd) => cmd.run(ctx),
        // Handled before the store is opened.
        Commands::Config(_) => Ok(()),
    }
}

/// Returns true if the command is a write operation that should sync after execution.
fn is_write_command(command: &Commands) -> bool {
    match command {
        Commands::Meal(cmd) => cmd.is_write(),
        Commands::Symptom(cmd) => cmd.is_write(),
        Commands::Pattern(cmd) => cmd.is_write(),
        _ => false,
    }
}

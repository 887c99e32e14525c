use clap::{Args, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use super::OutputFormat;
use crate::config::{Config, ConfigValue};

const DEFAULT_CONFIG: &str = r#"# gutwise configuration

# Where meals, symptoms and the sync queue are stored
# data_dir: ~/.local/share/gutwise

# Prefix for stored keys
# namespace: gutwise

# User id stamped on new entries
user_id: default

# How long server responses stay cached, in seconds
# cache_ttl_secs: 300

# Failed deliveries before a queued change is dropped
# max_retries: 3

# sync:
#   api_url: https://api.example.com
#   api_token: your-token
#   connect_timeout_secs: 30
#   probe_interval_secs: 5
#   auto_sync: false
"#;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

impl ConfigCommand {
    pub fn run(
        &self,
        config: &Config,
        cli_config_path: Option<PathBuf>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        print_value("data_dir", &config.data_dir, |v| v.display().to_string());
                        print_value("namespace", &config.namespace, |v| v.clone());
                        print_value("user_id", &config.user_id, |v| v.clone());
                        print_value("cache_ttl_secs", &config.cache_ttl_secs, |v| v.to_string());
                        print_value("max_retries", &config.max_retries, |v| v.to_string());

                        println!("sync:");
                        println!(
                            "  api_url: {}",
                            config.sync.api_url.as_deref().unwrap_or("(not set)")
                        );
                        println!(
                            "  api_token: {}",
                            if config.sync.api_token.is_some() {
                                "(set)"
                            } else {
                                "(not set)"
                            }
                        );
                        println!("  connect_timeout_secs: {}", config.sync.connect_timeout_secs);
                        println!("  probe_interval_secs: {}", config.sync.probe_interval_secs);
                        println!("  auto_sync: {}", config.sync.auto_sync);
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = cli_config_path.unwrap_or_else(Config::default_config_path);
                if write_default_config(&config_path)? {
                    println!("Created config file: {}", config_path.display());
                    println!("\nEdit this file to customize your settings.");
                } else {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'gutwise config show' to view current configuration.");
                }
                Ok(())
            }
        }
    }
}

fn print_value<T>(name: &str, value: &ConfigValue<T>, render: impl Fn(&T) -> String) {
    println!("{}: {}", name, render(&value.value));
    println!("  source: {}", value.source);
    println!();
}

/// Writes the commented default config to `path` unless a file is already
/// there. Returns whether a file was written.
fn write_default_config(path: &Path) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, DEFAULT_CONFIG)?;
    Ok(true)
}

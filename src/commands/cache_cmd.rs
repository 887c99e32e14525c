use clap::{Args, Subcommand};

use crate::context::AppContext;

#[derive(Args)]
pub struct CacheCommand {
    #[command(subcommand)]
    pub command: CacheSubcommand,
}

#[derive(Subcommand)]
pub enum CacheSubcommand {
    /// Drop every cached server response
    Clear,
}

impl CacheCommand {
    pub fn run(&self, ctx: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            CacheSubcommand::Clear => {
                if !ctx.cache.clear() {
                    return Err("Failed to clear some cache entries".into());
                }
                println!("Cache cleared.");
                Ok(())
            }
        }
    }
}

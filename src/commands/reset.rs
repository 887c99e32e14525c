use clap::Args;

use crate::context::AppContext;

/// Delete all local data, queued changes and cached responses
#[derive(Args)]
pub struct ResetCommand {
    /// Skip the confirmation check
    #[arg(long, short)]
    pub yes: bool,
}

impl ResetCommand {
    pub fn run(&self, ctx: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
        if !self.yes {
            let pending = ctx.queue.len();
            println!("This deletes every meal, symptom and saved item on this device.");
            if pending > 0 {
                println!("{} change(s) have not been synced and will be lost.", pending);
            }
            println!("Run again with --yes to confirm.");
            return Ok(());
        }

        if !ctx.reset() {
            return Err("Reset incomplete: some data could not be removed".into());
        }
        println!("All local data deleted.");
        Ok(())
    }
}

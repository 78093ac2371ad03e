use clap::Subcommand;

use crate::common::{load_engine, print_json, CliResult};

#[derive(Subcommand)]
pub enum LogAction {
    /// Print the activity log, oldest first
    Show {
        /// Emit JSON instead of the plain listing
        #[arg(long)]
        json: bool,
        /// Only the most recent N entries
        #[arg(long)]
        tail: Option<usize>,
    },
    /// Clear the log, leaving one entry recording the reset (authority only)
    Reset {
        /// Acting user
        #[arg(long)]
        actor: String,
    },
}

pub fn run(action: LogAction) -> CliResult {
    let engine = load_engine()?;
    match action {
        LogAction::Show { json, tail } => {
            let snapshot = engine.snapshot();
            let entries = snapshot.history.all();
            let entries = match tail {
                Some(n) => &entries[entries.len().saturating_sub(n)..],
                None => entries,
            };
            if json {
                return print_json(entries);
            }
            for entry in entries {
                let who = entry.username.as_deref().unwrap_or("-");
                let zone = entry
                    .zone
                    .map(|z| z.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}  {:<12} {:<8} {}",
                    entry.at.format("%Y-%m-%d %H:%M:%S"),
                    who,
                    zone,
                    entry.details
                );
            }
        }
        LogAction::Reset { actor } => {
            engine.reset_log(&actor)?;
            println!("activity log cleared");
        }
    }
    Ok(())
}

use clap::Subcommand;

use crate::common::{load_engine, print_json, CliResult};

#[derive(Subcommand)]
pub enum CutoffAction {
    /// Flip the organization-wide cutoff (authority only)
    Toggle {
        /// Acting user
        #[arg(long)]
        actor: String,
    },
    /// Reset system status and all cycle state (authority only)
    Clear {
        /// Acting user
        #[arg(long)]
        actor: String,
    },
    /// Print the current system status as JSON
    Show,
}

pub fn run(action: CutoffAction) -> CliResult {
    let engine = load_engine()?;
    match action {
        CutoffAction::Toggle { actor } => {
            let system = engine.toggle_cutoff(&actor)?;
            print_json(&system)
        }
        CutoffAction::Clear { actor } => {
            engine.clear_commands(&actor)?;
            print_json(&engine.snapshot().system)
        }
        CutoffAction::Show => print_json(&engine.snapshot().system),
    }
}

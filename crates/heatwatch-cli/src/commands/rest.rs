use clap::Subcommand;

use crate::common::{load_engine, print_json, CliResult};

#[derive(Subcommand)]
pub enum RestAction {
    /// Start the rest phase for a user's current zone
    Start { username: String },
    /// Complete the cycle early, returning the user to idle
    Finish { username: String },
}

pub fn run(action: RestAction) -> CliResult {
    let engine = load_engine()?;
    match action {
        RestAction::Start { username } => {
            let window = engine.start_rest(&username)?;
            print_json(&window)
        }
        RestAction::Finish { username } => {
            engine.complete_early(&username)?;
            let snapshot = engine.snapshot();
            print_json(&snapshot.users[&username])
        }
    }
}

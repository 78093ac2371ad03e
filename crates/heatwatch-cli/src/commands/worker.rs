use clap::Subcommand;
use heatwatch_core::Role;

use crate::common::{load_engine, parse_role, print_json, CliResult};

#[derive(Subcommand)]
pub enum WorkerAction {
    /// Register a user (re-registering resets their cycle state)
    Register {
        username: String,
        /// trainer, safety-officer or supervisor
        #[arg(long, value_parser = parse_role)]
        role: Role,
        /// Work-crew label
        #[arg(long)]
        group: Option<String>,
        /// Shared secret, required for authority roles when configured
        #[arg(long)]
        secret: Option<String>,
    },
    /// Revert a user's last cycle mutation
    Undo { username: String },
    /// Print one user's cycle state as JSON
    Show { username: String },
}

pub fn run(action: WorkerAction) -> CliResult {
    let engine = load_engine()?;
    match action {
        WorkerAction::Register {
            username,
            role,
            group,
            secret,
        } => {
            engine.register(&username, role, group.as_deref(), secret.as_deref())?;
            println!("registered {username}");
        }
        WorkerAction::Undo { username } => {
            engine.undo(&username)?;
            let snapshot = engine.snapshot();
            print_json(&snapshot.users[&username])?;
        }
        WorkerAction::Show { username } => {
            let snapshot = engine.snapshot();
            let user = snapshot
                .users
                .get(&username)
                .ok_or_else(|| format!("unknown user '{username}'"))?;
            print_json(user)?;
        }
    }
    Ok(())
}

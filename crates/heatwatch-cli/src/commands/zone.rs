use std::str::FromStr;

use clap::Subcommand;
use heatwatch_core::{Coordinates, ZoneId};

use crate::common::{load_engine, print_json, CliResult};

#[derive(Subcommand)]
pub enum ZoneAction {
    /// Assign a zone, starting (or shortening) a work window
    Set {
        /// Zone name: white, green, yellow, red, black, cutoff or test
        zone: String,
        /// Acting user
        #[arg(long)]
        actor: String,
        /// Target user (defaults to the actor)
        #[arg(long)]
        target: Option<String>,
        /// Worker latitude
        #[arg(long, requires = "lng")]
        lat: Option<f64>,
        /// Worker longitude
        #[arg(long, requires = "lat")]
        lng: Option<f64>,
    },
    /// Print the zone policy table as JSON
    List,
}

pub fn run(action: ZoneAction) -> CliResult {
    match action {
        ZoneAction::Set {
            zone,
            actor,
            target,
            lat,
            lng,
        } => {
            let engine = load_engine()?;
            let zone = ZoneId::from_str(&zone)?;
            let location = match (lat, lng) {
                (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
                _ => None,
            };
            let target = target.as_deref().unwrap_or(&actor);
            let window = engine.set_zone(&actor, target, zone, location)?;
            print_json(&window)
        }
        ZoneAction::List => {
            let engine = load_engine()?;
            print_json(engine.policies().zones())
        }
    }
}

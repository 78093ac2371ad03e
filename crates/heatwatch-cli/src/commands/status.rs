use crate::common::{load_engine, print_json, CliResult};

/// Sweep any due transitions, then print the full engine snapshot.
pub fn run() -> CliResult {
    let engine = load_engine()?;
    print_json(&engine.snapshot())
}

//! Shared plumbing for CLI commands: engine construction from the on-disk
//! config and state file, plus output helpers.

use heatwatch_core::{
    AuthorizationGuard, Config, Engine, EngineOptions, JsonFileStore, NullNotifier, Role,
    SharedSecret, StateStore,
};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Build an engine backed by the default config and state file. Every
/// mutation writes through, so commands do not save explicitly.
pub fn load_engine() -> Result<Engine, Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let store = JsonFileStore::new(JsonFileStore::default_path()?);
    let snapshot = store.load()?;

    let guard = match &config.authority_secret {
        Some(secret) => {
            AuthorizationGuard::with_credential_check(Box::new(SharedSecret::new(secret)))
        }
        None => AuthorizationGuard::new(),
    };
    let options = EngineOptions {
        policies: config.policy_table()?,
        guard,
        timings: config.timings(),
        notifier: Box::new(NullNotifier),
        store: Box::new(store),
    };

    Ok(match snapshot {
        Some(snapshot) => Engine::restore(options, snapshot),
        None => Engine::with_options(options),
    })
}

pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Role names as accepted on the command line.
pub fn parse_role(raw: &str) -> Result<Role, String> {
    match raw.to_ascii_lowercase().as_str() {
        "trainer" => Ok(Role::Trainer),
        "safety-officer" | "safety_officer" => Ok(Role::SafetyOfficer),
        "supervisor" => Ok(Role::Supervisor),
        other => Err(format!(
            "unknown role '{other}' (expected trainer, safety-officer or supervisor)"
        )),
    }
}

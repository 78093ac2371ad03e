use clap::Subcommand;
use heatwatch_core::Config;

use crate::common::CliResult;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
    /// Write the default configuration file (refuses to overwrite)
    Init,
}

pub fn run(action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::Show => {
            let config = Config::load_or_default();
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", Config::config_path()?.display());
            Ok(())
        }
        ConfigAction::Init => {
            let path = Config::config_path()?;
            if path.exists() {
                return Err(format!("config already exists at {}", path.display()).into());
            }
            Config::default().save(&path)?;
            println!("wrote {}", path.display());
            Ok(())
        }
    }
}

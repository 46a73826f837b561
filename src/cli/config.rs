//! `config` command

use std::path::PathBuf;

use clap::{Args, Subcommand};

use super::exit_codes;
use crate::config::ConfigStore;

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print all entries
    Show,
    /// Print one value
    Get { key: String },
    /// Set a value
    Set { key: String, value: String },
    /// Remove a key
    Unset { key: String },
    /// Print the config file location
    Path,
}

pub async fn run(config_path: PathBuf, args: ConfigArgs) -> anyhow::Result<i32> {
    let mut store = ConfigStore::open(config_path);

    match args.action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(store.entries())?);
        }
        ConfigAction::Get { key } => match store.get(&key) {
            Some(value) => println!("{}", value),
            None => {
                eprintln!("'{}' is not set", key);
                return Ok(exit_codes::UNEXPECTED_FAILURE);
            }
        },
        ConfigAction::Set { key, value } => {
            if let Err(e) = store.set(key, value) {
                eprintln!("Error: {}", e);
                return Ok(exit_codes::PERSISTENCE_FAILED);
            }
        }
        ConfigAction::Unset { key } => match store.remove(&key) {
            Ok(true) => {}
            Ok(false) => eprintln!("'{}' was not set", key),
            Err(e) => {
                eprintln!("Error: {}", e);
                return Ok(exit_codes::PERSISTENCE_FAILED);
            }
        },
        ConfigAction::Path => {
            println!("{}", store.path().display());
        }
    }

    Ok(exit_codes::SUCCESS)
}

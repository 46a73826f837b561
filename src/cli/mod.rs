//! Command-line interface
//!
//! Stands in for the login window: `detect` runs the startup discovery the
//! window would run, `set-path` is the file-chooser result, and `typewriter`
//! renders the slogan animation in the terminal.

pub mod config;
pub mod discover;
pub mod typewriter;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Process exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const UNEXPECTED_FAILURE: i32 = 1;
    pub const UNRESOLVED: i32 = 2;
    pub const VALIDATION_FAILED: i32 = 3;
    pub const PERSISTENCE_FAILED: i32 = 4;
}

#[derive(Debug, Parser)]
#[command(name = "wxquantum", version, about = "WeChat installation discovery and login-shell core")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long = "json-output", global = true)]
    pub json_output: bool,

    /// Config file to use instead of config.json next to the executable
    #[arg(long, global = true, env = "WXQUANTUM_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Locate the WeChat installation (saved path, registry, common locations)
    Detect(discover::DetectArgs),

    /// Use a specific WeChat executable
    SetPath(discover::SetPathArgs),

    /// Inspect or edit the config file
    Config(config::ConfigArgs),

    /// Play the slogan animation in the terminal
    Typewriter(typewriter::TypewriterArgs),
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::default_config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_path() {
        let cli = Cli::try_parse_from(["wxquantum", "--config", "cfg.json", "set-path", r"C:\WeChat\WeChat.exe"]).unwrap();
        assert_eq!(cli.config_path(), PathBuf::from("cfg.json"));
        match cli.command {
            Commands::SetPath(args) => assert_eq!(args.path, PathBuf::from(r"C:\WeChat\WeChat.exe")),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_typewriter_defaults() {
        let cli = Cli::try_parse_from(["wxquantum", "typewriter"]).unwrap();
        match cli.command {
            Commands::Typewriter(args) => {
                assert!(args.sentences.is_empty());
                assert_eq!(args.seconds, 10);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

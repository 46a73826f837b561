//! wxquantum - core of the WeChat automation login shell
//!
//! Provides:
//! - WeChat installation discovery (saved config, registry, common locations)
//! - Manual installation override with executable validation
//! - Persistent JSON configuration next to the executable
//! - The typewriter slogan animation

mod cli;
mod config;
mod discovery;
mod logging;
mod typewriter;

use clap::Parser;
use cli::{exit_codes, Cli, Commands};

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose, cli.json_output) {
        eprintln!("Failed to initialize logging: {}", e);
        return exit_codes::UNEXPECTED_FAILURE;
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create runtime: {}", e);
            return exit_codes::UNEXPECTED_FAILURE;
        }
    };

    let config_path = cli.config_path();
    tracing::debug!("Using config file {}", config_path.display());

    let result = rt.block_on(async move {
        match cli.command {
            Commands::Detect(args) => cli::discover::run_detect(config_path, args).await,
            Commands::SetPath(args) => cli::discover::run_set_path(config_path, args).await,
            Commands::Config(args) => cli::config::run(config_path, args).await,
            Commands::Typewriter(args) => cli::typewriter::run(args).await,
        }
    });

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_codes::UNEXPECTED_FAILURE
        }
    }
}

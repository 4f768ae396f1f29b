// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Workwire - realtime communication core for a two-sided jobs marketplace.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod serve;

/// Workwire - realtime communication core.
#[derive(Parser, Debug)]
#[command(name = "workwire", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Workwire realtime server.
    Serve,
    /// Print the effective configuration and exit.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match workwire_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            workwire_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.server.log_level);

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run(config).await {
                tracing::error!("server failed: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => {
            // Secrets are elided; this is for operator inspection.
            let mut printable = config.clone();
            if printable.auth.jwt_secret.is_some() {
                printable.auth.jwt_secret = Some("[redacted]".to_string());
            }
            match toml::to_string_pretty(&printable) {
                Ok(rendered) => println!("{rendered}"),
                Err(e) => {
                    eprintln!("failed to render config: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => {
            println!("workwire: use --help for available commands");
        }
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parley - chat backend with queued Gemini replies.
//!
//! This is the binary entry point.

mod chat;
mod runtime;
mod serve;
mod worker;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;

/// Parley - chat backend with queued Gemini replies.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about, long_about = None)]
struct Cli {
    /// Config file to load instead of the standard lookup.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API with embedded workers.
    Serve,
    /// Run reply workers and the reconciliation sweep without the HTTP API.
    Worker,
    /// Interactive client for a running server.
    Chat {
        /// Server URL, overriding `client.base_url`.
        #[arg(long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match parley_config::load_and_validate(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            parley_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Worker => worker::run_worker(config).await,
        Commands::Chat { url } => chat::run_chat(config, url).await,
    };

    if let Err(e) = result {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # apphost CLI
//!
//! Loads an application definition file and either runs it locally or
//! publishes its deployment manifest.
//!
//! ## Commands
//!
//! - `apphost run --app <FILE>` - Allocate endpoints, print the `$ENDPOINTS: `
//!   line, wait for Ctrl-C
//! - `apphost publish --app <FILE> [--output <FILE>]` - Write the JSON manifest
//! - `apphost config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use apphost_core::domain::app_config::AppHostConfigManifest;

mod commands;

use commands::ConfigCommand;

/// apphost - Describe an application once, run it locally or publish it
#[derive(Parser)]
#[command(name = "apphost")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "APPHOST_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, global = true, env = "APPHOST_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the application locally
    #[command(name = "run")]
    Run {
        /// Application definition file
        #[arg(short, long, value_name = "FILE")]
        app: PathBuf,
    },

    /// Publish the deployment manifest
    #[command(name = "publish")]
    Publish {
        /// Application definition file
        #[arg(short, long, value_name = "FILE")]
        app: PathBuf,

        /// Manifest path (default: spec.manifest.outputPath)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppHostConfigManifest::load_or_default(cli.config.clone())
        .context("Failed to load configuration")?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.spec.observability.log_level.clone());
    init_logging(&level)?;

    match cli.command {
        Some(Commands::Run { app }) => commands::run::execute(app, &config).await,
        Some(Commands::Publish { app, output }) => {
            commands::publish::execute(app, output, &config).await
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config, config).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
///
/// Logs go to stderr so stdout carries only the endpoint report.
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}

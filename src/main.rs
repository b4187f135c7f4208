//! livewatch - live preview server for data files.
//!
//! Watches a file or a directory of units, recomputes the changed unit's
//! derived data, and pushes it to every connected browser over
//! Server-Sent Events.

mod cli;
mod config;
mod core;
mod embed;
mod logger;
mod stream;
mod unit;
mod utils;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands, serve::ServeContext};
use config::AppConfig;
use std::sync::Arc;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = Arc::new(AppConfig::load(&cli)?);

    match &cli.command {
        Commands::Serve { view, .. } => {
            let ctx = ServeContext::new(&view.target, config, core::shutdown_signal())?;
            cli::serve::bind_server(ctx)?.run()
        }
        Commands::Export { view, unit, output } => {
            cli::export::export_unit(&view.target, unit.as_deref(), output.as_deref(), &config)
        }
    }
}

//! Typing Bot: types a text file into the focused window, one keystroke at a
//! time, for fields that block pasting.

#![cfg_attr(windows, windows_subsystem = "windows")]

mod app;
mod config;
mod feedback;
mod hotkey;
mod tray;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use app::App;
use config::Config;

/// Main entry point: load configuration, set up logging, and run the app.
fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    setup_logging(&config)?;
    App::new(config)?.run()
}

/// Log file used when `LOG_TO_FILE` is set
const LOG_FILE: &str = "typing-bot.log";

/// Send logs to stderr, or to [`LOG_FILE`] without colours.
fn setup_logging(config: &Config) -> Result<()> {
    // enigo is held to error-only so typed text never reaches the log file
    let filter = EnvFilter::new(format!("{},enigo=error", config.log_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    if !config.log_to_file {
        subscriber.init();
        return Ok(());
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)
        .with_context(|| format!("Failed to open {LOG_FILE}"))?;
    subscriber.with_writer(file).with_ansi(false).init();

    Ok(())
}

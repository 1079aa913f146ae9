//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use clap::Parser;

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "pomodoro-keeper")]
#[command(about = "A restart-safe Pomodoro timer daemon driven by wall-clock deadlines")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// State file (defaults to the XDG state directory)
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// Keep state in memory only; nothing survives a restart
    #[arg(long, conflicts_with = "state_file")]
    pub ephemeral: bool,

    /// Countdown polling interval in milliseconds
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(50..))]
    pub tick_ms: u64,

    /// Shell command run as the alarm when a phase ends
    #[arg(long)]
    pub alarm_command: Option<String>,

    /// Seconds after which a still-running alarm command is killed
    #[arg(long, default_value = "30")]
    pub alarm_timeout_secs: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn alarm_timeout(&self) -> Duration {
        Duration::from_secs(self.alarm_timeout_secs)
    }

    /// Resolve where the timer state is persisted
    pub fn state_path(&self) -> anyhow::Result<PathBuf> {
        match &self.state_file {
            Some(path) => Ok(path.clone()),
            None => xdg::BaseDirectories::with_prefix("pomodoro-keeper")
                .place_state_file("state.json")
                .context("Failed to resolve XDG state directory"),
        }
    }
}

//! Streamer CLI - headless driver for the playback session controller
//!
//! Features:
//! - Content-type classification of URIs and paths
//! - Manifest probing and renderer plan inspection
//! - Headless playback through the controller with a clock-driven engine

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod commands;
mod headless;
mod output;

use output::OutputFormat;

/// Streamer CLI - streaming playback session toolkit
#[derive(Parser)]
#[command(name = "streamer")]
#[command(version)]
#[command(about = "Classify, probe and headlessly play streaming sources", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the content type of URIs or paths
    Classify {
        /// URIs or file paths
        #[arg(required = true)]
        inputs: Vec<String>,
    },

    /// Probe a source and print the renderers it would get
    Probe {
        /// URI or file path
        input: String,
    },

    /// Play a source through the controller with a headless engine
    Play {
        /// URI or file path
        input: String,

        /// Media seconds advanced per wall-clock second
        #[arg(short, long, default_value = "1.0", value_parser = parse_speed)]
        speed: f64,

        /// Clock tick in milliseconds
        #[arg(long, default_value = "100")]
        tick_ms: u64,

        /// Prepare without starting playback
        #[arg(long)]
        paused: bool,

        /// Seek to this position (seconds) after loading
        #[arg(long)]
        seek: Option<f64>,

        /// Stop after this many wall-clock seconds
        #[arg(short, long)]
        limit: Option<u64>,
    },
}

fn parse_speed(value: &str) -> Result<f64, String> {
    let speed: f64 = value.parse().map_err(|e| format!("{}", e))?;
    if speed.is_finite() && speed > 0.0 {
        Ok(speed)
    } else {
        Err(format!("must be a positive finite number, got {}", value))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    streamer_core::init();
    let format = OutputFormat::from(cli.format.as_str());

    match cli.command {
        Commands::Classify { inputs } => {
            commands::classify(&inputs, format)?;
        }
        Commands::Probe { input } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::probe(&input, config, format).await?;
        }
        Commands::Play { input, speed, tick_ms, paused, seek, limit } => {
            let config = commands::load_config(cli.config.as_deref())?;
            let options = commands::PlayOptions {
                speed,
                tick: Duration::from_millis(tick_ms.max(1)),
                start_paused: paused,
                seek,
                limit: limit.map(Duration::from_secs),
            };
            commands::play(&input, config, options, format).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_speed() {
        assert_eq!(parse_speed("2.5"), Ok(2.5));
        assert!(parse_speed("0").is_err());
        assert!(parse_speed("-1").is_err());
        assert!(parse_speed("NaN").is_err());
        assert!(parse_speed("inf").is_err());
        assert!(parse_speed("fast").is_err());
    }

    #[test]
    fn test_cli_rejects_non_finite_speed() {
        let parsed = Cli::try_parse_from(["streamer", "play", "clip.mp4", "--speed", "NaN"]);
        assert!(parsed.is_err());
        let parsed = Cli::try_parse_from(["streamer", "play", "clip.mp4", "--speed", "4"]);
        assert!(parsed.is_ok());
    }
}

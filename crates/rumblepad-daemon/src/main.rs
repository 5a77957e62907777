//! rumblepad daemon
//!
//! Creates virtual joypads and turns the force-feedback effects games play on
//! them into rumble intensity reports.

mod joypad;
mod sink;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use rumblepad_config::{Config, JoypadConfig};
use rumblepad_ff::{FfError, ListenerConfig, RumbleListener};
use tracing_subscriber::EnvFilter;

use crate::joypad::VirtualJoypad;
use crate::sink::{rumble_callback, SinkFormat};

#[derive(Parser, Debug)]
#[command(name = "rumblepadd")]
#[command(about = "Virtual joypad force-feedback daemon")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/rumblepad/config.kdl")]
    config: String,

    /// Write rumble changes to stdout as JSON lines instead of logging them
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&args.config).into_owned().into();
    let config = load_config(&config_path)?;

    // Initialize tracing; RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.global.log_level.as_str())),
        )
        .init();

    tracing::info!(
        "Loaded configuration with {} joypad(s)",
        config.joypads.len()
    );

    let listener_config = ListenerConfig {
        tick_interval: config.global.tick_interval(),
        startup_delay: config.global.startup_delay(),
    };
    let format = if args.json {
        SinkFormat::Json
    } else {
        SinkFormat::Log
    };

    let mut listeners = Vec::with_capacity(config.joypads.len());
    for joypad_config in &config.joypads {
        let joypad = VirtualJoypad::create(joypad_config)?;

        for node in &joypad.dev_nodes {
            tracing::info!("'{}' available at {}", joypad.name, node.display());
        }

        let callback = rumble_callback(joypad.name.clone(), format);
        let listener = RumbleListener::spawn(joypad.device, Some(callback), listener_config);
        listeners.push((joypad.name, listener));
    }

    tracing::info!("rumblepad daemon running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");

    for (name, listener) in listeners {
        if let Some(e) = unreported_stop_error(listener.stop().await) {
            tracing::warn!("Listener for '{}' ended with error: {}", name, e);
        }
    }

    Ok(())
}

/// Load the configuration, falling back to one default joypad when the file
/// does not exist.
fn load_config(path: &std::path::Path) -> Result<Config> {
    let mut config = if path.exists() {
        rumblepad_config::parse_config(path)?
    } else {
        Config::default()
    };

    if config.joypads.is_empty() {
        if path.exists() {
            bail!("{} defines no joypad", path.display());
        }
        config.joypads.push(JoypadConfig::new("Rumblepad Virtual Joypad"));
    }

    Ok(config)
}

/// The error from stopping a listener that still needs logging.
///
/// A listener that could not prepare its device has already logged why.
fn unreported_stop_error(result: Result<(), FfError>) -> Option<FfError> {
    match result {
        Ok(()) | Err(FfError::DeviceUnavailable(_)) => None,
        Err(e) => Some(e),
    }
}

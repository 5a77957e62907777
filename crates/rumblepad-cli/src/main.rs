//! rumblepad CLI
//!
//! Configuration checks and force-feedback testing for rumblepad.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use evdev::{
    Device, EventType, FFEffectData, FFEffectKind, FFEffectType, FFReplay, FFTrigger, InputEvent,
};
use miette::IntoDiagnostic;

#[derive(Parser, Debug)]
#[command(name = "rumblepad")]
#[command(about = "Virtual joypad force-feedback tool")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/rumblepad/config.kdl")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration file
    Validate,

    /// List input devices that accept rumble effects
    Devices,

    /// Upload a rumble effect to a device and play it once
    Play {
        /// Event device to play on (e.g., /dev/input/event21)
        device: PathBuf,

        /// Strong (low frequency) motor magnitude
        #[arg(long, default_value_t = 0xC000)]
        strong: u16,

        /// Weak (high frequency) motor magnitude
        #[arg(long, default_value_t = 0x4000)]
        weak: u16,

        /// Effect length in milliseconds
        #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u16).range(0..=0x7FFF))]
        length: u16,

        /// Device gain to set before playing (0-65535)
        #[arg(long)]
        gain: Option<u16>,
    },
}

fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&cli.config).into_owned().into();

    match cli.command {
        Commands::Validate => cmd_validate(&config_path),
        Commands::Devices => cmd_devices(),
        Commands::Play {
            device,
            strong,
            weak,
            length,
            gain,
        } => cmd_play(&device, strong, weak, length, gain),
    }
}

fn cmd_validate(config_path: &Path) -> miette::Result<()> {
    println!("Validating configuration: {}", config_path.display());

    let config = rumblepad_config::parse_config(config_path)?;

    println!("Configuration is valid!");
    println!(
        "  Tick interval: {} ms, startup delay: {} ms",
        config.global.tick_interval_ms, config.global.startup_delay_ms
    );
    println!("  Joypads: {}", config.joypads.len());
    for joypad in &config.joypads {
        println!(
            "    - {} [{}] ({} effect slot(s))",
            joypad.name,
            joypad.vendor_product(),
            joypad.ff_effects_max
        );
    }
    Ok(())
}

fn cmd_devices() -> miette::Result<()> {
    println!("Devices with rumble support:\n");

    let mut found = 0;
    for entry in std::fs::read_dir("/dev/input").into_diagnostic()? {
        let entry = entry.into_diagnostic()?;
        let path = entry.path();

        if !path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false)
        {
            continue;
        }

        let device = match Device::open(&path) {
            Ok(device) => device,
            Err(e) => {
                tracing::debug!("Could not open {}: {}", path.display(), e);
                continue;
            }
        };

        let supports_rumble = device
            .supported_ff()
            .map(|ff| ff.contains(FFEffectType::FF_RUMBLE))
            .unwrap_or(false);
        if !supports_rumble {
            continue;
        }

        let id = device.input_id();
        println!("  {}", device.name().unwrap_or("Unknown"));
        println!("    Path: {}", path.display());
        println!("    ID: {:04x}:{:04x}", id.vendor(), id.product());
        println!();
        found += 1;
    }

    if found == 0 {
        println!("  (none found, are you in the 'input' group?)");
    }
    Ok(())
}

fn cmd_play(path: &Path, strong: u16, weak: u16, length: u16, gain: Option<u16>) -> miette::Result<()> {
    let mut device = Device::open(path)
        .into_diagnostic()
        .map_err(|e| e.wrap_err(format!("Failed to open {}", path.display())))?;

    if let Some(gain) = gain {
        let event = InputEvent::new(
            EventType::FORCEFEEDBACK,
            FFEffectType::FF_GAIN.0,
            i32::from(gain),
        );
        device.send_events(&[event]).into_diagnostic()?;
    }

    let mut effect = device
        .upload_ff_effect(rumble_effect(strong, weak, length))
        .into_diagnostic()
        .map_err(|e| e.wrap_err("Device rejected the rumble effect"))?;

    println!(
        "Playing rumble (strong {:#06x}, weak {:#06x}) for {} ms on {}",
        strong,
        weak,
        length,
        device.name().unwrap_or("Unknown")
    );
    effect.play(1).into_diagnostic()?;
    std::thread::sleep(Duration::from_millis(u64::from(length)));
    effect.stop().into_diagnostic()?;

    Ok(())
}

fn rumble_effect(strong: u16, weak: u16, length: u16) -> FFEffectData {
    FFEffectData {
        direction: 0,
        trigger: FFTrigger {
            button: 0,
            interval: 0,
        },
        replay: FFReplay { length, delay: 0 },
        kind: FFEffectKind::Rumble {
            strong_magnitude: strong,
            weak_magnitude: weak,
        },
    }
}

//! Rumble consumers
//!
//! The daemon has no motor either; it hands every intensity change to a sink.
//! The log sink is meant for humans, the JSON sink for a backend that forwards
//! rumble to a remote controller (one object per line on stdout).

use std::io::Write;

use rumblepad_ff::RumbleCallback;
use serde::Serialize;

/// Where intensity changes of one joypad go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkFormat {
    Log,
    Json,
}

/// One intensity change, as written by the JSON sink
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RumbleReport<'a> {
    pub device: &'a str,
    pub strong: u16,
    pub weak: u16,
}

/// Build the rumble callback for the joypad named `device`.
pub fn rumble_callback(device: String, format: SinkFormat) -> RumbleCallback {
    match format {
        SinkFormat::Log => Box::new(move |strong, weak| {
            tracing::info!(device = %device, strong, weak, "rumble");
        }),
        SinkFormat::Json => Box::new(move |strong, weak| {
            let report = RumbleReport {
                device: &device,
                strong,
                weak,
            };
            match serde_json::to_string(&report) {
                Ok(line) => {
                    let mut stdout = std::io::stdout().lock();
                    if let Err(e) = writeln!(stdout, "{}", line).and_then(|_| stdout.flush()) {
                        tracing::warn!("Failed to write rumble report: {}", e);
                    }
                }
                Err(e) => tracing::warn!("Failed to serialize rumble report: {}", e),
            }
        }),
    }
}

//! Effect descriptors and active rumble effects
//!
//! An [`EffectDescriptor`] is what a game uploads to the device. When the game
//! starts playing it, the descriptor is resolved into an [`ActiveRumbleEffect`]
//! with absolute start/end points and per-channel magnitudes.

use std::time::{Duration, Instant};

/// Maximum value of the device-wide gain (`FF_GAIN`)
pub const MAX_GAIN: u16 = 0xFFFF;

/// Replay delay and length above 32767 ms (0x7fff) must not be used
pub const MAX_DURATION_MS: u16 = 0x7FFF;

/// Effect slot id as assigned by the kernel on upload
pub type EffectId = u16;

/// Attack/fade shaping of an effect, kernel `ff_envelope` semantics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Duration of the attack in milliseconds
    pub attack_length: u16,
    /// Level reached at the end of the attack
    pub attack_level: u16,
    /// Duration of the fade in milliseconds
    pub fade_length: u16,
    /// Level at the start of the fade
    pub fade_level: u16,
}

/// Scheduling of an effect, kernel `ff_replay` semantics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Replay {
    /// Duration of the effect in milliseconds
    pub length: u16,
    /// Delay before the effect starts, in milliseconds
    pub delay: u16,
}

/// The effect types this crate emulates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Constant {
        level: i16,
        envelope: Envelope,
    },
    Periodic {
        magnitude: i16,
        envelope: Envelope,
    },
    Ramp {
        start_level: i16,
        end_level: i16,
        envelope: Envelope,
    },
    Rumble {
        strong_magnitude: u16,
        weak_magnitude: u16,
    },
}

/// An uploaded force-feedback effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectDescriptor {
    pub id: EffectId,
    pub replay: Replay,
    pub kind: EffectKind,
}

impl EffectDescriptor {
    /// Convenience constructor for a rumble effect without delay
    pub fn rumble(id: EffectId, strong: u16, weak: u16, length_ms: u16) -> Self {
        Self {
            id,
            replay: Replay {
                length: length_ms,
                delay: 0,
            },
            kind: EffectKind::Rumble {
                strong_magnitude: strong,
                weak_magnitude: weak,
            },
        }
    }
}

/// A (weak, strong) motor intensity pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Intensity {
    pub weak: u16,
    pub strong: u16,
}

impl Intensity {
    pub const ZERO: Intensity = Intensity { weak: 0, strong: 0 };

    pub fn new(weak: u16, strong: u16) -> Self {
        Self { weak, strong }
    }
}

/// A running instance of an uploaded effect
///
/// Several instances of the same descriptor may be alive at once when a game
/// replays an effect without stopping it first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRumbleEffect {
    pub effect_id: EffectId,
    pub start_point: Instant,
    pub end_point: Instant,
    pub length: Duration,
    pub envelope: Envelope,
    /// Magnitudes at the start of the effect
    pub start: Intensity,
    /// Magnitudes at the end of the effect
    pub end: Intensity,
    /// Gain in effect when the instance was activated
    pub gain: u16,
    /// Last intensity reported to the rumble callback
    pub previous: Intensity,
}

impl ActiveRumbleEffect {
    /// Resolve `descriptor` into an instance starting `delay` after `now`.
    pub fn new(effect_id: EffectId, gain: u16, descriptor: &EffectDescriptor, now: Instant) -> Self {
        let delay = Duration::from_millis(u64::from(descriptor.replay.delay.min(MAX_DURATION_MS)));
        let length =
            Duration::from_millis(u64::from(descriptor.replay.length.min(MAX_DURATION_MS)));

        let (start, end, envelope) = match descriptor.kind {
            EffectKind::Constant { level, envelope } => {
                let level = level.unsigned_abs();
                (Intensity::new(level, level), Intensity::new(level, level), envelope)
            }
            EffectKind::Periodic {
                magnitude,
                envelope,
            } => {
                let magnitude = magnitude.unsigned_abs();
                (
                    Intensity::new(magnitude, magnitude),
                    Intensity::new(magnitude, magnitude),
                    envelope,
                )
            }
            EffectKind::Ramp {
                start_level,
                end_level,
                envelope,
            } => {
                let start_level = start_level.unsigned_abs();
                let end_level = end_level.unsigned_abs();
                (
                    Intensity::new(start_level, start_level),
                    Intensity::new(end_level, end_level),
                    envelope,
                )
            }
            EffectKind::Rumble {
                strong_magnitude,
                weak_magnitude,
            } => {
                let magnitudes = Intensity::new(weak_magnitude, strong_magnitude);
                (magnitudes, magnitudes, Envelope::default())
            }
        };

        Self {
            effect_id,
            start_point: now + delay,
            end_point: now + delay + length,
            length,
            envelope,
            start,
            end,
            gain,
            previous: Intensity::ZERO,
        }
    }

    /// Whether the effect has run its full length at `now`
    pub fn has_ended(&self, now: Instant) -> bool {
        self.end_point <= now
    }
}

//! Envelope simulation
//!
//! Reduces an [`ActiveRumbleEffect`] to the motor intensity it produces at a
//! given instant, following the kernel force-feedback envelope model:
//!
//! ```text
//!  level
//!    │        sustain (start/end interpolation)
//!    │      ┌─────────────────────────────┐
//!    │     /                               \
//!    │    / attack                     fade \
//!    │   /                                   \
//!    └──┴─────────────────────────────────────┴──── time
//!     start_point                         end_point
//! ```

use std::time::{Duration, Instant};

use crate::effect::{ActiveRumbleEffect, Intensity, MAX_GAIN};

/// Compute the (weak, strong) intensity of `effect` at `now`.
///
/// Outside `[start_point, end_point]` the effect is silent.
pub fn simulate(effect: &ActiveRumbleEffect, now: Instant) -> Intensity {
    if now < effect.start_point || effect.end_point < now {
        return Intensity::ZERO;
    }

    let length = millis(effect.length);
    let time_left = millis(effect.end_point - now);
    let t = length - time_left;
    let envelope = &effect.envelope;

    let attack_length = i64::from(envelope.attack_length);
    let fade_length = i64::from(envelope.fade_length);

    let (weak, strong) = if attack_length > 0 && t < attack_length {
        let level = i64::from(envelope.attack_level) * t / attack_length;
        (level, level)
    } else if fade_length > 0 && time_left < fade_length {
        let dt = (t - length) + fade_length;
        let level = i64::from(envelope.fade_level) * (fade_length - dt) / fade_length;
        (level, level)
    } else {
        (
            sustain_magnitude(time_left, effect.start.weak, effect.end.weak, length),
            sustain_magnitude(time_left, effect.start.strong, effect.end.strong, length),
        )
    };

    Intensity {
        weak: apply_gain(weak, effect.gain),
        strong: apply_gain(strong, effect.gain),
    }
}

/// Interpolate between `start` and `end` by the time remaining.
///
/// This counts down: a ramp reports its end level first and approaches its
/// start level as the effect runs out.
fn sustain_magnitude(time_left: i64, start: u16, end: u16, length: i64) -> i64 {
    let start = i64::from(start);
    if length == 0 {
        return start;
    }
    let rel = i64::from(end) - start;
    start + rel * time_left / length
}

fn apply_gain(value: i64, gain: u16) -> u16 {
    let scaled = value.clamp(0, i64::from(u16::MAX)) * i64::from(gain) / i64::from(MAX_GAIN);
    scaled as u16
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

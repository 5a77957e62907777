//! Effect store and lifecycle management
//!
//! The [`EffectStore`] holds everything one virtual device needs to emulate
//! force feedback:
//!
//! - the uploaded descriptors, keyed by effect id
//! - the active effect instances, in activation order
//! - the device-wide gain set through `FF_GAIN`
//! - the optional rumble callback
//!
//! Every removal of an active instance (explicit stop, erase of its descriptor,
//! or natural expiry) reports `(0, 0)` to the callback, so a consumer cannot
//! tell those apart.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, trace};

use crate::effect::{ActiveRumbleEffect, EffectDescriptor, EffectId, Intensity, MAX_GAIN};
use crate::envelope::simulate;

/// Receives rumble intensity changes as `(strong, weak)`.
pub type RumbleCallback = Box<dyn FnMut(u16, u16) + Send + 'static>;

/// Uploaded effects, running effects and gain of one virtual device
pub struct EffectStore {
    effects: HashMap<EffectId, EffectDescriptor>,
    active: Vec<ActiveRumbleEffect>,
    gain: u16,
    on_rumble: Option<RumbleCallback>,
}

impl EffectStore {
    /// Create an empty store at full gain.
    ///
    /// Without a callback all lifecycle processing still happens, nothing is
    /// reported.
    pub fn new(on_rumble: Option<RumbleCallback>) -> Self {
        Self {
            effects: HashMap::new(),
            active: Vec::new(),
            gain: MAX_GAIN,
            on_rumble,
        }
    }

    /// Insert or replace the descriptor for `id`.
    pub fn upload(&mut self, id: EffectId, descriptor: EffectDescriptor) {
        if self.effects.insert(id, descriptor).is_some() {
            debug!("Replaced effect {}", id);
        } else {
            debug!("Uploaded effect {}", id);
        }
    }

    /// Remove the descriptor for `id` and stop every instance derived from it.
    pub fn erase(&mut self, id: EffectId) {
        if self.effects.remove(&id).is_some() {
            debug!("Erased effect {}", id);
        } else {
            debug!("Erase of unknown effect {}, ignored", id);
        }
        self.deactivate(id);
    }

    /// Start a new instance of effect `id` using the current gain.
    ///
    /// Returns `false` when no descriptor was uploaded for `id`.
    pub fn activate(&mut self, id: EffectId, now: Instant) -> bool {
        match self.effects.get(&id) {
            Some(descriptor) => {
                let effect = ActiveRumbleEffect::new(id, self.gain, descriptor, now);
                debug!(
                    "Activated effect {} for {:?} (gain {})",
                    id, effect.length, effect.gain
                );
                self.active.push(effect);
                true
            }
            None => {
                debug!("Activation of unknown effect {}, dropped", id);
                false
            }
        }
    }

    /// Stop every active instance of effect `id`.
    pub fn deactivate(&mut self, id: EffectId) {
        let removed = self.remove_where(|effect| effect.effect_id == id);
        if removed > 0 {
            debug!("Deactivated {} instance(s) of effect {}", removed, id);
        }
    }

    /// Set the device-wide gain used by later activations.
    pub fn set_gain(&mut self, value: i32) {
        self.gain = value.clamp(0, i32::from(MAX_GAIN)) as u16;
        debug!("Gain set to {}", self.gain);
    }

    /// Drop every instance whose end point has passed.
    pub fn expire(&mut self, now: Instant) {
        let removed = self.remove_where(|effect| effect.has_ended(now));
        if removed > 0 {
            trace!("{} effect(s) ran to completion", removed);
        }
    }

    /// Simulate every active instance and report the ones that changed.
    pub fn render(&mut self, now: Instant) {
        for effect in &mut self.active {
            let intensity = simulate(effect, now);
            if intensity != effect.previous {
                effect.previous = intensity;
                if let Some(callback) = self.on_rumble.as_mut() {
                    callback(intensity.strong, intensity.weak);
                }
            }
        }
    }

    pub fn gain(&self) -> u16 {
        self.gain
    }

    pub fn descriptor(&self, id: EffectId) -> Option<&EffectDescriptor> {
        self.effects.get(&id)
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    pub fn active_effects(&self) -> &[ActiveRumbleEffect] {
        &self.active
    }

    fn remove_where(&mut self, mut predicate: impl FnMut(&ActiveRumbleEffect) -> bool) -> usize {
        let before = self.active.len();
        let on_rumble = &mut self.on_rumble;
        self.active.retain(|effect| {
            let remove = predicate(effect);
            if remove {
                if let Some(callback) = on_rumble.as_mut() {
                    callback(Intensity::ZERO.strong, Intensity::ZERO.weak);
                }
            }
            !remove
        });
        before - self.active.len()
    }
}

impl std::fmt::Debug for EffectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectStore")
            .field("effects", &self.effects)
            .field("active", &self.active)
            .field("gain", &self.gain)
            .field("on_rumble", &self.on_rumble.is_some())
            .finish()
    }
}

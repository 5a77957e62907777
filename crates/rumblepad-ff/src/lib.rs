//! Force-feedback emulation for virtual joypads
//!
//! A virtual uinput joypad receives force-feedback (FF) effects from games the
//! same way a physical gamepad does, but it has no motor to drive. This crate
//! emulates the kernel's effect semantics in software and reduces every running
//! effect to a two-channel (strong/weak) rumble intensity.
//!
//! ## Architecture
//!
//! - [`EffectStore`]: uploaded effect descriptors, active effect instances and
//!   the device-wide gain
//! - [`simulate`]: envelope simulation of one active effect at a point in time
//! - [`ControlLoop`]: drains device events, drives the store and reports changes
//! - [`RumbleListener`]: background task running a [`ControlLoop`] every tick
//! - [`UinputFf`]: [`FfDevice`] backend for an `evdev` virtual device

mod device;
mod effect;
mod envelope;
mod error;
mod event;
mod listener;
mod store;
mod uinput;

pub use device::{EraseRequest, FfDevice, UploadRequest};
pub use effect::{
    ActiveRumbleEffect, EffectDescriptor, EffectId, EffectKind, Envelope, Intensity, Replay,
    MAX_DURATION_MS, MAX_GAIN,
};
pub use envelope::simulate;
pub use error::FfError;
pub use event::{DeviceEvent, InputRecord};
pub use listener::{
    ControlLoop, ListenerConfig, ListenerState, RumbleListener, DEFAULT_STARTUP_DELAY,
    DEFAULT_TICK_INTERVAL,
};
pub use store::{EffectStore, RumbleCallback};
pub use uinput::UinputFf;

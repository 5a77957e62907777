//! Virtual joypad creation via uinput
//!
//! Each configured joypad becomes one uinput gamepad advertising buttons, axes
//! and force feedback. The device is handed to an [`UinputFf`] backend whose
//! listener emulates the effects games upload to it.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use evdev::uinput::VirtualDeviceBuilder;
use evdev::{
    AbsInfo, AbsoluteAxisType, AttributeSet, BusType, FFEffectType, InputId, Key, UinputAbsSetup,
};
use rumblepad_config::JoypadConfig;
use rumblepad_ff::UinputFf;

/// Firmware version reported for every virtual joypad
const JOYPAD_VERSION: u16 = 0x0114;

const BUTTONS: &[Key] = &[
    Key::BTN_SOUTH,
    Key::BTN_EAST,
    Key::BTN_NORTH,
    Key::BTN_WEST,
    Key::BTN_TL,
    Key::BTN_TR,
    Key::BTN_SELECT,
    Key::BTN_START,
    Key::BTN_MODE,
    Key::BTN_THUMBL,
    Key::BTN_THUMBR,
];

/// Effect types the listener emulates, plus the waveforms periodic effects need
const FF_FEATURES: &[FFEffectType] = &[
    FFEffectType::FF_RUMBLE,
    FFEffectType::FF_CONSTANT,
    FFEffectType::FF_PERIODIC,
    FFEffectType::FF_RAMP,
    FFEffectType::FF_SINE,
    FFEffectType::FF_SQUARE,
    FFEffectType::FF_TRIANGLE,
    FFEffectType::FF_SAW_UP,
    FFEffectType::FF_SAW_DOWN,
    FFEffectType::FF_GAIN,
];

/// Stick axes: signed 16-bit with a small dead zone
const STICK_AXES: &[AbsoluteAxisType] = &[
    AbsoluteAxisType::ABS_X,
    AbsoluteAxisType::ABS_Y,
    AbsoluteAxisType::ABS_RX,
    AbsoluteAxisType::ABS_RY,
];

/// Analog triggers: unsigned 8-bit
const TRIGGER_AXES: &[AbsoluteAxisType] = &[AbsoluteAxisType::ABS_Z, AbsoluteAxisType::ABS_RZ];

/// D-pad as a hat
const HAT_AXES: &[AbsoluteAxisType] = &[AbsoluteAxisType::ABS_HAT0X, AbsoluteAxisType::ABS_HAT0Y];

/// A created virtual joypad, ready to be listened on
pub struct VirtualJoypad {
    pub name: String,
    /// `/dev/input/event*` nodes of the device
    pub dev_nodes: Vec<PathBuf>,
    pub device: UinputFf,
}

impl VirtualJoypad {
    /// Create the uinput gamepad described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the virtual device cannot be created (e.g., insufficient
    /// permissions to access /dev/uinput).
    pub fn create(config: &JoypadConfig) -> Result<Self> {
        let mut keys = AttributeSet::<Key>::new();
        for button in BUTTONS {
            keys.insert(*button);
        }

        let mut ff = AttributeSet::<FFEffectType>::new();
        for feature in FF_FEATURES {
            ff.insert(*feature);
        }

        let mut builder = VirtualDeviceBuilder::new()
            .context("Failed to open /dev/uinput")?
            .name(&config.name)
            .input_id(InputId::new(
                BusType::BUS_USB,
                config.vendor,
                config.product,
                JOYPAD_VERSION,
            ))
            .with_keys(&keys)?
            .with_ff(&ff)?
            .with_ff_effects_max(config.ff_effects_max);

        for axis in STICK_AXES {
            let setup = UinputAbsSetup::new(*axis, AbsInfo::new(0, -32768, 32767, 16, 128, 0));
            builder = builder.with_absolute_axis(&setup)?;
        }
        for axis in TRIGGER_AXES {
            let setup = UinputAbsSetup::new(*axis, AbsInfo::new(0, 0, 255, 0, 0, 0));
            builder = builder.with_absolute_axis(&setup)?;
        }
        for axis in HAT_AXES {
            let setup = UinputAbsSetup::new(*axis, AbsInfo::new(0, -1, 1, 0, 0, 0));
            builder = builder.with_absolute_axis(&setup)?;
        }

        let mut device = builder
            .build()
            .with_context(|| format!("Failed to create virtual joypad '{}'", config.name))?;

        let dev_nodes = match device.enumerate_dev_nodes_blocking() {
            Ok(nodes) => collect_dev_nodes(&config.name, nodes),
            Err(e) => {
                tracing::debug!("Could not list nodes of '{}': {}", config.name, e);
                Vec::new()
            }
        };

        tracing::info!(
            "Created virtual joypad '{}' ({}, {} effect slot(s))",
            config.name,
            config.vendor_product(),
            config.ff_effects_max
        );

        Ok(Self {
            name: config.name.clone(),
            dev_nodes,
            device: UinputFf::new(device),
        })
    }
}

/// Sorted device nodes; entries that could not be resolved are skipped.
fn collect_dev_nodes(
    name: &str,
    nodes: impl IntoIterator<Item = io::Result<PathBuf>>,
) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = nodes
        .into_iter()
        .filter_map(|node| match node {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::debug!("Skipping a device node of '{}': {}", name, e);
                None
            }
        })
        .collect();
    paths.sort();
    paths
}

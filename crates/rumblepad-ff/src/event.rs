//! Decoding of raw events read from a uinput device

use evdev::{EventType, FFEffectType, UInputEventType};

use crate::effect::EffectId;

pub(crate) const EV_LED: u16 = EventType::LED.0;
pub(crate) const EV_FF: u16 = EventType::FORCEFEEDBACK.0;
pub(crate) const EV_UINPUT: u16 = EventType::UINPUT.0;

pub(crate) const UI_FF_UPLOAD: u16 = UInputEventType::UI_FF_UPLOAD.0;
pub(crate) const UI_FF_ERASE: u16 = UInputEventType::UI_FF_ERASE.0;

pub(crate) const FF_GAIN: u16 = FFEffectType::FF_GAIN.0;

/// A raw `(type, code, value)` event as read from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputRecord {
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl InputRecord {
    pub fn new(kind: u16, code: u16, value: i32) -> Self {
        Self { kind, code, value }
    }

    /// The kernel asks us to accept an effect upload.
    pub fn upload_request(request_id: u32) -> Self {
        Self::new(EV_UINPUT, UI_FF_UPLOAD, request_id as i32)
    }

    /// The kernel asks us to accept an effect erase.
    pub fn erase_request(request_id: u32) -> Self {
        Self::new(EV_UINPUT, UI_FF_ERASE, request_id as i32)
    }

    /// A game started (`play == true`) or stopped an effect.
    pub fn play(effect_id: EffectId, play: bool) -> Self {
        Self::new(EV_FF, effect_id, i32::from(play))
    }

    pub fn gain(value: i32) -> Self {
        Self::new(EV_FF, FF_GAIN, value)
    }

    pub fn led(code: u16, value: i32) -> Self {
        Self::new(EV_LED, code, value)
    }
}

/// What a raw event means to the force-feedback emulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// `UI_FF_UPLOAD` with the kernel request id
    Upload { request_id: u32 },
    /// `UI_FF_ERASE` with the kernel request id
    Erase { request_id: u32 },
    /// `FF_GAIN` with the requested gain (not yet clamped)
    Gain(i32),
    /// Effect started playing
    Play(EffectId),
    /// Effect stopped playing
    Stop(EffectId),
    /// LED state change; LEDs are not emulated
    Led { code: u16, value: i32 },
    /// Anything else (e.g. `EV_SYN`)
    Other(InputRecord),
}

impl From<InputRecord> for DeviceEvent {
    fn from(record: InputRecord) -> Self {
        match (record.kind, record.code) {
            (EV_UINPUT, UI_FF_UPLOAD) => DeviceEvent::Upload {
                request_id: record.value as u32,
            },
            (EV_UINPUT, UI_FF_ERASE) => DeviceEvent::Erase {
                request_id: record.value as u32,
            },
            (EV_FF, FF_GAIN) => DeviceEvent::Gain(record.value),
            (EV_FF, effect_id) if record.value != 0 => DeviceEvent::Play(effect_id),
            (EV_FF, effect_id) => DeviceEvent::Stop(effect_id),
            (EV_LED, code) => DeviceEvent::Led {
                code,
                value: record.value,
            },
            _ => DeviceEvent::Other(record),
        }
    }
}

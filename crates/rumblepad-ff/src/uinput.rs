//! uinput backend for [`FfDevice`]
//!
//! Drives force-feedback requests on an `evdev` [`VirtualDevice`]. evdev runs
//! the begin ioctl in `process_ff_upload`/`process_ff_erase` and the matching
//! end ioctl when the returned request is dropped. The device stays owned by
//! the backend so the node lives exactly as long as its listener.

use std::collections::HashMap;
use std::io::{self, ErrorKind};
use std::os::fd::AsRawFd;

use evdev::uinput::{UInputEvent, VirtualDevice};
use evdev::{FFEffectData, FFEffectKind, FFEnvelope};
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use tracing::{debug, trace, warn};

use crate::device::{EraseRequest, FfDevice, UploadRequest};
use crate::effect::{EffectDescriptor, EffectId, EffectKind, Envelope, Replay};
use crate::error::FfError;
use crate::event::{InputRecord, EV_UINPUT};

/// Force-feedback backend over an evdev virtual device
pub struct UinputFf {
    device: VirtualDevice,
    nonblocking: bool,
    /// Request events fetched but not yet processed, by request id
    pending: HashMap<u32, UInputEvent>,
}

impl UinputFf {
    pub fn new(device: VirtualDevice) -> Self {
        Self {
            device,
            nonblocking: false,
            pending: HashMap::new(),
        }
    }

    /// The wrapped device
    pub fn get_ref(&self) -> &VirtualDevice {
        &self.device
    }

    pub fn get_mut(&mut self) -> &mut VirtualDevice {
        &mut self.device
    }

    pub fn into_inner(self) -> VirtualDevice {
        self.device
    }

    fn take_request(&mut self, request_id: u32) -> Result<UInputEvent, FfError> {
        self.pending
            .remove(&request_id)
            .ok_or(FfError::UnknownRequest { request_id })
    }
}

impl FfDevice for UinputFf {
    fn prepare(&mut self) -> Result<(), FfError> {
        let fd = self.device.as_raw_fd();

        let flags = fcntl(fd, FcntlArg::F_GETFL)
            .map_err(|e| FfError::DeviceUnavailable(e.into()))?;
        let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
        fcntl(fd, FcntlArg::F_SETFL(flags)).map_err(|e| FfError::DeviceUnavailable(e.into()))?;

        self.nonblocking = true;
        debug!("uinput fd {} switched to non-blocking reads", fd);
        Ok(())
    }

    fn fetch_events(&mut self) -> Result<Vec<InputRecord>, FfError> {
        // A blocking read would stall the listener
        if !self.nonblocking {
            return Ok(Vec::new());
        }

        let device = &mut self.device;
        let pending = &mut self.pending;
        let records = drain(|records: &mut Vec<InputRecord>| {
            let mut read = 0;
            for event in device.fetch_events()? {
                let record = InputRecord::new(event.event_type().0, event.code(), event.value());
                if record.kind == EV_UINPUT {
                    pending.insert(record.value as u32, event);
                }
                records.push(record);
                read += 1;
            }
            Ok(read)
        })?;

        if !records.is_empty() {
            trace!("Fetched {} event(s) from uinput", records.len());
        }
        Ok(records)
    }

    fn upload<F>(&mut self, request_id: u32, apply: F) -> Result<(), FfError>
    where
        F: FnOnce(&mut UploadRequest),
    {
        let event = self.take_request(request_id)?;
        let mut upload = self
            .device
            .process_ff_upload(event)
            .map_err(|source| FfError::Ioctl {
                request: "UI_BEGIN_FF_UPLOAD",
                request_id,
                source: std::io::Error::other(source),
            })?;

        let effect_id = upload.effect_id() as EffectId;
        let mut request = UploadRequest {
            request_id,
            retval: 0,
            effect_id,
            effect: descriptor_from(effect_id, &upload.effect()),
        };
        apply(&mut request);

        // UI_END_FF_UPLOAD runs when `upload` drops
        upload.set_retval(request.retval);
        Ok(())
    }

    fn erase<F>(&mut self, request_id: u32, apply: F) -> Result<(), FfError>
    where
        F: FnOnce(&mut EraseRequest),
    {
        let event = self.take_request(request_id)?;
        let mut erase = self
            .device
            .process_ff_erase(event)
            .map_err(|source| FfError::Ioctl {
                request: "UI_BEGIN_FF_ERASE",
                request_id,
                source: std::io::Error::other(source),
            })?;

        let mut request = EraseRequest {
            request_id,
            retval: 0,
            effect_id: erase.effect_id() as EffectId,
        };
        apply(&mut request);

        // UI_END_FF_ERASE runs when `erase` drops
        erase.set_retval(request.retval);
        Ok(())
    }
}

/// Call `read` until the device would block.
///
/// `read` appends to the buffer and returns how many records it added. Records
/// read before a failure are kept so pending requests still get completed.
fn drain<T>(mut read: impl FnMut(&mut Vec<T>) -> io::Result<usize>) -> Result<Vec<T>, FfError> {
    let mut records = Vec::new();
    loop {
        match read(&mut records) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) if records.is_empty() => return Err(FfError::ReadFailed(e)),
            Err(e) => {
                warn!(
                    "Read from uinput failed after {} event(s), keeping them: {}",
                    records.len(),
                    e
                );
                break;
            }
        }
    }
    Ok(records)
}

/// Convert an uploaded effect, `None` for effect types that are not emulated.
fn descriptor_from(id: EffectId, data: &FFEffectData) -> Option<EffectDescriptor> {
    let kind = match &data.kind {
        FFEffectKind::Constant { level, envelope } => EffectKind::Constant {
            level: *level,
            envelope: envelope_from(envelope),
        },
        FFEffectKind::Periodic {
            magnitude,
            envelope,
            ..
        } => EffectKind::Periodic {
            magnitude: *magnitude,
            envelope: envelope_from(envelope),
        },
        FFEffectKind::Ramp {
            start_level,
            end_level,
            envelope,
        } => EffectKind::Ramp {
            start_level: *start_level,
            end_level: *end_level,
            envelope: envelope_from(envelope),
        },
        FFEffectKind::Rumble {
            strong_magnitude,
            weak_magnitude,
        } => EffectKind::Rumble {
            strong_magnitude: *strong_magnitude,
            weak_magnitude: *weak_magnitude,
        },
        _ => return None,
    };

    Some(EffectDescriptor {
        id,
        replay: Replay {
            length: data.replay.length,
            delay: data.replay.delay,
        },
        kind,
    })
}

fn envelope_from(envelope: &FFEnvelope) -> Envelope {
    Envelope {
        attack_length: envelope.attack_length,
        attack_level: envelope.attack_level,
        fade_length: envelope.fade_length,
        fade_level: envelope.fade_level,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use evdev::{FFReplay, FFTrigger, FFWaveform};

    use super::*;

    fn effect_data(length: u16, delay: u16, kind: FFEffectKind) -> FFEffectData {
        FFEffectData {
            direction: 0,
            trigger: FFTrigger {
                button: 0,
                interval: 0,
            },
            replay: FFReplay { length, delay },
            kind,
        }
    }

    fn ff_envelope() -> FFEnvelope {
        FFEnvelope {
            attack_length: 10,
            attack_level: 20,
            fade_length: 30,
            fade_level: 40,
        }
    }

    /// Reads that replay `results` in order, then report `WouldBlock`
    fn scripted_reads(
        results: Vec<io::Result<Vec<u32>>>,
    ) -> impl FnMut(&mut Vec<u32>) -> io::Result<usize> {
        let mut results = VecDeque::from(results);
        move |records: &mut Vec<u32>| match results.pop_front() {
            Some(Ok(batch)) => {
                let read = batch.len();
                records.extend(batch);
                Ok(read)
            }
            Some(Err(e)) => Err(e),
            None => Err(ErrorKind::WouldBlock.into()),
        }
    }

    #[test]
    fn test_rumble_effect_to_descriptor() {
        let data = effect_data(
            500,
            10,
            FFEffectKind::Rumble {
                strong_magnitude: 0xC000,
                weak_magnitude: 0x4000,
            },
        );

        assert_eq!(
            descriptor_from(2, &data),
            Some(EffectDescriptor {
                id: 2,
                replay: Replay {
                    length: 500,
                    delay: 10
                },
                kind: EffectKind::Rumble {
                    strong_magnitude: 0xC000,
                    weak_magnitude: 0x4000
                },
            })
        );
    }

    #[test]
    fn test_periodic_effect_keeps_envelope() {
        let data = effect_data(
            1000,
            0,
            FFEffectKind::Periodic {
                waveform: FFWaveform::Sine,
                period: 100,
                magnitude: 0x3000,
                offset: 0,
                phase: 0,
                envelope: ff_envelope(),
            },
        );

        let descriptor = descriptor_from(0, &data).unwrap();
        assert_eq!(
            descriptor.kind,
            EffectKind::Periodic {
                magnitude: 0x3000,
                envelope: Envelope {
                    attack_length: 10,
                    attack_level: 20,
                    fade_length: 30,
                    fade_level: 40,
                },
            }
        );
    }

    #[test]
    fn test_constant_and_ramp_levels_stay_signed() {
        let constant = effect_data(
            100,
            0,
            FFEffectKind::Constant {
                level: -1200,
                envelope: ff_envelope(),
            },
        );
        assert!(matches!(
            descriptor_from(1, &constant).map(|d| d.kind),
            Some(EffectKind::Constant { level: -1200, .. })
        ));

        let ramp = effect_data(
            100,
            0,
            FFEffectKind::Ramp {
                start_level: 100,
                end_level: -300,
                envelope: ff_envelope(),
            },
        );
        assert!(matches!(
            descriptor_from(1, &ramp).map(|d| d.kind),
            Some(EffectKind::Ramp {
                start_level: 100,
                end_level: -300,
                ..
            })
        ));
    }

    #[test]
    fn test_condition_effects_are_not_emulated() {
        let data = effect_data(100, 0, FFEffectKind::Damper);
        assert!(descriptor_from(0, &data).is_none());
    }

    #[test]
    fn test_drain_reads_until_would_block() {
        let records = drain(scripted_reads(vec![Ok(vec![1, 2]), Ok(vec![3])])).unwrap();
        assert_eq!(records, vec![1, 2, 3]);

        let records = drain(scripted_reads(vec![])).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_drain_keeps_records_read_before_a_failure() {
        let records = drain(scripted_reads(vec![
            Ok(vec![7]),
            Err(io::Error::from_raw_os_error(nix::libc::EIO)),
            Ok(vec![8]),
        ]))
        .unwrap();

        assert_eq!(records, vec![7]);
    }

    #[test]
    fn test_drain_retries_interrupted_reads() {
        let records = drain(scripted_reads(vec![
            Err(ErrorKind::Interrupted.into()),
            Ok(vec![5]),
        ]))
        .unwrap();

        assert_eq!(records, vec![5]);
    }

    #[test]
    fn test_drain_failure_without_records_is_an_error() {
        let err = drain(scripted_reads(vec![Err(io::Error::from_raw_os_error(
            nix::libc::EIO,
        ))]))
        .unwrap_err();

        assert!(matches!(err, FfError::ReadFailed(_)));
    }
}

//! The device seam of the control loop
//!
//! Uploads and erases in uinput are two-phase: the kernel announces a request
//! with an event, the device handler fetches the request (begin), acts on it,
//! then completes it with a return code (end). Both phases run inside one
//! [`FfDevice::upload`] / [`FfDevice::erase`] call: the request is handed to the
//! caller as a plain value between them, and its `retval` is read back for the
//! end phase.

use crate::effect::{EffectDescriptor, EffectId};
use crate::error::FfError;
use crate::event::InputRecord;

/// A pending `UI_FF_UPLOAD` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub request_id: u32,
    /// Return code handed back to the kernel in the end phase
    pub retval: i32,
    /// Slot the kernel assigned to the effect
    pub effect_id: EffectId,
    /// The uploaded effect, `None` for effect types that are not emulated
    pub effect: Option<EffectDescriptor>,
}

/// A pending `UI_FF_ERASE` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EraseRequest {
    pub request_id: u32,
    /// Return code handed back to the kernel in the end phase
    pub retval: i32,
    pub effect_id: EffectId,
}

/// A virtual device that delivers force-feedback requests
pub trait FfDevice {
    /// Make the device readable without blocking. Called once before listening.
    fn prepare(&mut self) -> Result<(), FfError> {
        Ok(())
    }

    /// Drain every pending event; empty when nothing is queued.
    fn fetch_events(&mut self) -> Result<Vec<InputRecord>, FfError>;

    /// Begin upload `request_id`, let `apply` act on it, then end it with the
    /// `retval` `apply` left in the request.
    ///
    /// `apply` is not called when the begin phase fails.
    fn upload<F>(&mut self, request_id: u32, apply: F) -> Result<(), FfError>
    where
        F: FnOnce(&mut UploadRequest);

    /// Same as [`FfDevice::upload`] for an erase request.
    fn erase<F>(&mut self, request_id: u32, apply: F) -> Result<(), FfError>
    where
        F: FnOnce(&mut EraseRequest);
}

#[cfg(test)]
pub(crate) mod scripted {
    //! In-memory device used by the control loop and listener tests

    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Default)]
    pub(crate) struct Script {
        /// Each fetch drains one batch
        pub batches: VecDeque<Vec<InputRecord>>,
        pub uploads: HashMap<u32, EffectDescriptor>,
        /// Accepted uploads of effect types that are not emulated
        pub unsupported: HashMap<u32, EffectId>,
        pub erases: HashMap<u32, EffectId>,
        pub completed_uploads: Vec<(u32, i32)>,
        pub completed_erases: Vec<(u32, i32)>,
        pub fetches: usize,
        pub fail_prepare: bool,
    }

    /// Cloneable handle so tests can keep feeding a device owned by a task
    #[derive(Debug, Clone, Default)]
    pub(crate) struct ScriptedDevice {
        pub script: Arc<Mutex<Script>>,
    }

    impl ScriptedDevice {
        pub fn push(&self, batch: Vec<InputRecord>) {
            self.script.lock().unwrap().batches.push_back(batch);
        }

        /// Queue an upload of `descriptor` announced under `request_id`.
        pub fn queue_upload(&self, request_id: u32, descriptor: EffectDescriptor) {
            let mut script = self.script.lock().unwrap();
            script.uploads.insert(request_id, descriptor);
            script
                .batches
                .push_back(vec![InputRecord::upload_request(request_id)]);
        }

        pub fn queue_unsupported_upload(&self, request_id: u32, effect_id: EffectId) {
            let mut script = self.script.lock().unwrap();
            script.unsupported.insert(request_id, effect_id);
            script
                .batches
                .push_back(vec![InputRecord::upload_request(request_id)]);
        }

        pub fn queue_erase(&self, request_id: u32, effect_id: EffectId) {
            let mut script = self.script.lock().unwrap();
            script.erases.insert(request_id, effect_id);
            script
                .batches
                .push_back(vec![InputRecord::erase_request(request_id)]);
        }

        pub fn fetches(&self) -> usize {
            self.script.lock().unwrap().fetches
        }
    }

    impl FfDevice for ScriptedDevice {
        fn prepare(&mut self) -> Result<(), FfError> {
            if self.script.lock().unwrap().fail_prepare {
                return Err(FfError::DeviceUnavailable(std::io::Error::from_raw_os_error(
                    9,
                )));
            }
            Ok(())
        }

        fn fetch_events(&mut self) -> Result<Vec<InputRecord>, FfError> {
            let mut script = self.script.lock().unwrap();
            script.fetches += 1;
            Ok(script.batches.pop_front().unwrap_or_default())
        }

        fn upload<F>(&mut self, request_id: u32, apply: F) -> Result<(), FfError>
        where
            F: FnOnce(&mut UploadRequest),
        {
            let mut request = {
                let script = self.script.lock().unwrap();
                if let Some(effect_id) = script.unsupported.get(&request_id) {
                    UploadRequest {
                        request_id,
                        retval: -1,
                        effect_id: *effect_id,
                        effect: None,
                    }
                } else {
                    match script.uploads.get(&request_id) {
                        Some(descriptor) => UploadRequest {
                            request_id,
                            retval: -1,
                            effect_id: descriptor.id,
                            effect: Some(*descriptor),
                        },
                        None => {
                            return Err(FfError::UnknownRequest { request_id });
                        }
                    }
                }
            };

            apply(&mut request);

            self.script
                .lock()
                .unwrap()
                .completed_uploads
                .push((request.request_id, request.retval));
            Ok(())
        }

        fn erase<F>(&mut self, request_id: u32, apply: F) -> Result<(), FfError>
        where
            F: FnOnce(&mut EraseRequest),
        {
            let effect_id = self
                .script
                .lock()
                .unwrap()
                .erases
                .get(&request_id)
                .copied()
                .unwrap_or_default();
            let mut request = EraseRequest {
                request_id,
                retval: -1,
                effect_id,
            };

            apply(&mut request);

            self.script
                .lock()
                .unwrap()
                .completed_erases
                .push((request.request_id, request.retval));
            Ok(())
        }
    }
}

//! Error types for force-feedback emulation

use thiserror::Error;

/// Errors raised by a force-feedback device backend or the listener task
#[derive(Debug, Error)]
pub enum FfError {
    /// The device descriptor could not be switched to non-blocking reads
    #[error("Unable to prepare uinput device for event reading: {0}")]
    DeviceUnavailable(#[source] std::io::Error),

    /// Reading pending events from the device failed
    #[error("Failed to read events from uinput device: {0}")]
    ReadFailed(#[source] std::io::Error),

    /// An upload or erase was requested that no fetched event announced
    #[error("No pending force-feedback request {request_id}")]
    UnknownRequest { request_id: u32 },

    /// A force-feedback ioctl was rejected by the kernel
    #[error("{request} ioctl failed for request {request_id}: {source}")]
    Ioctl {
        request: &'static str,
        request_id: u32,
        #[source]
        source: std::io::Error,
    },

    /// The listener task panicked or was aborted
    #[error("Rumble listener task failed: {0}")]
    ListenerFailed(#[source] tokio::task::JoinError),
}

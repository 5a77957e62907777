//! Force-feedback control loop
//!
//! One listener runs per virtual device. It owns the device, the
//! [`EffectStore`] and the gain; nothing else touches them.
//!
//! ## States
//!
//! ```text
//!  ┌──────┐  startup delay   ┌───────────┐   stop signal   ┌─────────┐
//!  │ IDLE │ ───────────────► │ LISTENING │ ──────────────► │ STOPPED │
//!  └──┬───┘                  └───────────┘                 └─────────┘
//!     │ prepare() failed / stop signal                          ▲
//!     └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tick
//!
//! Every tick (20 ms by default) the loop:
//! 1. drains pending device events without blocking
//! 2. dispatches them to the store (upload, erase, gain, play, stop)
//! 3. drops effects that ran to completion, reporting `(0, 0)` for each
//! 4. simulates the remaining effects and reports the ones that changed
//!
//! The tick period bounds the latency to both new events and the stop signal.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

use crate::device::FfDevice;
use crate::error::FfError;
use crate::event::DeviceEvent;
use crate::store::{EffectStore, RumbleCallback};

/// Default period between two ticks
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(20);

/// Default wait before the first read so the new device node becomes readable
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_millis(100);

/// Timing of a [`RumbleListener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerConfig {
    pub tick_interval: Duration,
    pub startup_delay: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            startup_delay: DEFAULT_STARTUP_DELAY,
        }
    }
}

/// Lifecycle of a [`RumbleListener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Waiting for the device node to become readable
    Idle,
    /// Polling the device every tick
    Listening,
    /// Stopped on request or because the device could not be prepared
    Stopped,
}

/// Device events to effect store, one tick at a time
///
/// The loop itself has no notion of wall-clock time; callers pass `now` so the
/// same code runs under the listener task and in tests.
pub struct ControlLoop<D> {
    device: D,
    store: EffectStore,
}

impl<D: FfDevice> ControlLoop<D> {
    pub fn new(device: D, on_rumble: Option<RumbleCallback>) -> Self {
        Self {
            device,
            store: EffectStore::new(on_rumble),
        }
    }

    /// Run one tick at `now`.
    pub fn poll(&mut self, now: Instant) {
        match self.device.fetch_events() {
            Ok(events) => {
                for event in events {
                    self.dispatch(DeviceEvent::from(event), now);
                }
            }
            Err(e) => {
                warn!("Failed to fetch force-feedback events: {}", e);
            }
        }

        self.store.expire(now);
        self.store.render(now);
    }

    /// Apply one device event to the store.
    pub fn dispatch(&mut self, event: DeviceEvent, now: Instant) {
        match event {
            DeviceEvent::Upload { request_id } => self.handle_upload(request_id),
            DeviceEvent::Erase { request_id } => self.handle_erase(request_id),
            DeviceEvent::Gain(value) => self.store.set_gain(value),
            DeviceEvent::Play(effect_id) => {
                self.store.activate(effect_id, now);
            }
            DeviceEvent::Stop(effect_id) => self.store.deactivate(effect_id),
            DeviceEvent::Led { code, value } => {
                trace!("LED {} set to {}, not emulated", code, value);
            }
            DeviceEvent::Other(_) => {}
        }
    }

    fn handle_upload(&mut self, request_id: u32) {
        let store = &mut self.store;
        let result = self.device.upload(request_id, |request| {
            match request.effect {
                Some(descriptor) => store.upload(request.effect_id, descriptor),
                None => debug!(
                    "Effect {} uses a type that is not emulated, not stored",
                    request.effect_id
                ),
            }
            request.retval = 0;
        });
        if let Err(e) = result {
            warn!("{}", e);
        }
    }

    fn handle_erase(&mut self, request_id: u32) {
        let store = &mut self.store;
        let result = self.device.erase(request_id, |request| {
            store.erase(request.effect_id);
            request.retval = 0;
        });
        if let Err(e) = result {
            warn!("{}", e);
        }
    }

    pub fn store(&self) -> &EffectStore {
        &self.store
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}

/// Handle to a background task running a [`ControlLoop`]
///
/// Dropping the handle also stops the task, at the next tick.
#[derive(Debug)]
pub struct RumbleListener {
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<ListenerState>,
    handle: JoinHandle<Result<(), FfError>>,
}

impl RumbleListener {
    /// Spawn the listener for `device` on the current tokio runtime.
    pub fn spawn<D>(device: D, on_rumble: Option<RumbleCallback>, config: ListenerConfig) -> Self
    where
        D: FfDevice + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(ListenerState::Idle);

        let handle = tokio::spawn(run(device, on_rumble, config, shutdown_rx, state_tx));

        Self {
            shutdown: shutdown_tx,
            state: state_rx,
            handle,
        }
    }

    pub fn state(&self) -> ListenerState {
        *self.state.borrow()
    }

    /// Wait until the listener reaches `state`.
    ///
    /// Returns the state actually reached if the task finished first.
    pub async fn wait_for(&mut self, state: ListenerState) -> ListenerState {
        let reached = match self.state.wait_for(|current| *current == state).await {
            Ok(current) => Some(*current),
            Err(_) => None,
        };
        reached.unwrap_or_else(|| *self.state.borrow())
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the loop to stop and wait for it to exit.
    ///
    /// Returns the error that kept the loop from starting, if any.
    pub async fn stop(self) -> Result<(), FfError> {
        // The task may already be gone, in which case there is nobody to tell
        let _ = self.shutdown.send(true);
        self.handle.await.map_err(FfError::ListenerFailed)?
    }
}

async fn run<D: FfDevice>(
    mut device: D,
    on_rumble: Option<RumbleCallback>,
    config: ListenerConfig,
    mut shutdown: watch::Receiver<bool>,
    state: watch::Sender<ListenerState>,
) -> Result<(), FfError> {
    tokio::select! {
        _ = tokio::time::sleep(config.startup_delay) => {}
        _ = shutdown.changed() => {
            state.send_replace(ListenerState::Stopped);
            debug!("Rumble listener stopped before it started");
            return Ok(());
        }
    }

    if let Err(e) = device.prepare() {
        error!("{}, force feedback will be disabled", e);
        state.send_replace(ListenerState::Stopped);
        return Err(e);
    }

    let mut control = ControlLoop::new(device, on_rumble);
    let mut ticker = tokio::time::interval(config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    state.send_replace(ListenerState::Listening);
    info!("Rumble listener started (tick {:?})", config.tick_interval);

    loop {
        tokio::select! {
            biased;
            // A dropped handle counts as a stop request
            _ = shutdown.changed() => break,
            _ = ticker.tick() => control.poll(Instant::now()),
        }
        if *shutdown.borrow() {
            break;
        }
    }

    state.send_replace(ListenerState::Stopped);
    info!("Rumble listener stopped");
    Ok(())
}

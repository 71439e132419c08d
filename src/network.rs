//! Radio bring-up and the one-shot "attached" gate.
//!
//! The radio driver owns registration. This module only initializes it,
//! requests registration, and listens to the events it reports back: the
//! first registered status (home or roaming) opens the [`AttachmentGate`],
//! everything else is logged. Deregistration after that point is not acted
//! upon.

use core::cell::Cell;
use core::fmt::Debug;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;
use log::{debug, error, info};

use crate::error::StartupError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationStatus {
    NotRegistered,
    RegisteredHome,
    Searching,
    RegistrationDenied,
    Unknown,
    RegisteredRoaming,
}

impl RegistrationStatus {
    pub fn is_registered(self) -> bool {
        matches!(self, Self::RegisteredHome | Self::RegisteredRoaming)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadioMode {
    Idle,
    Connected,
}

/// Events the radio driver reports while registering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    RegistrationStatus(RegistrationStatus),
    RadioModeChanged(RadioMode),
    /// Anything else the driver emits (cell changes, power saving updates...).
    Other,
}

/// Receives [`LinkEvent`]s from the radio driver's context.
pub trait LinkListener {
    fn on_event(&self, event: LinkEvent);
}

/// Radio driver seam.
#[allow(async_fn_in_trait)]
pub trait Modem {
    type Error: Debug;

    async fn init(&mut self) -> Result<(), Self::Error>;

    /// Starts registration in the background; progress is reported to `listener`.
    async fn connect_async(
        &mut self,
        listener: &'static (dyn LinkListener + Sync),
    ) -> Result<(), Self::Error>;
}

/// Gate that opens once and stays open.
pub struct AttachmentGate<M: RawMutex> {
    opened: Mutex<M, Cell<bool>>,
    signal: Signal<M, ()>,
}

impl<M: RawMutex> AttachmentGate<M> {
    pub const fn new() -> Self {
        Self {
            opened: Mutex::new(Cell::new(false)),
            signal: Signal::new(),
        }
    }

    /// Returns `true` only for the call that actually opened the gate.
    pub fn open(&self) -> bool {
        let first = self.opened.lock(|opened| !opened.replace(true));
        if first {
            self.signal.signal(());
        }
        first
    }

    pub fn is_open(&self) -> bool {
        self.opened.lock(Cell::get)
    }

    pub async fn wait(&self) {
        if self.is_open() {
            return;
        }
        self.signal.wait().await;
    }
}

impl<M: RawMutex> Default for AttachmentGate<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener that turns registration events into the attachment gate.
pub struct NetworkAttachment<M: RawMutex> {
    gate: AttachmentGate<M>,
}

impl<M: RawMutex> NetworkAttachment<M> {
    pub const fn new() -> Self {
        Self {
            gate: AttachmentGate::new(),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.gate.is_open()
    }

    /// Blocks until the radio reports a registered status. No timeout.
    pub async fn wait_attached(&self) {
        self.gate.wait().await;
    }
}

impl<M: RawMutex> Default for NetworkAttachment<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> LinkListener for NetworkAttachment<M> {
    fn on_event(&self, event: LinkEvent) {
        match event {
            LinkEvent::RegistrationStatus(status) if status.is_registered() => {
                info!(
                    "Network registration status: {}",
                    if status == RegistrationStatus::RegisteredHome {
                        "Connected - home network"
                    } else {
                        "Connected - roaming"
                    }
                );
                if !self.gate.open() {
                    debug!("Already attached, ignoring {:?}", status);
                }
            }
            LinkEvent::RegistrationStatus(status) => {
                debug!("Network registration status: {:?}", status);
            }
            LinkEvent::RadioModeChanged(mode) => {
                info!(
                    "Radio mode: {}",
                    match mode {
                        RadioMode::Connected => "Connected",
                        RadioMode::Idle => "Idle",
                    }
                );
            }
            LinkEvent::Other => {}
        }
    }
}

/// Initializes the radio and requests registration. Errors are fatal to startup.
pub async fn configure_modem<D: Modem>(
    modem: &mut D,
    listener: &'static (dyn LinkListener + Sync),
) -> Result<(), StartupError> {
    info!("Initializing radio");
    modem.init().await.map_err(|e| {
        error!("Failed to initialize radio: {:?}", e);
        StartupError::RadioInit
    })?;

    info!("Requesting network registration");
    modem.connect_async(listener).await.map_err(|e| {
        error!("Error requesting network registration: {:?}", e);
        StartupError::Registration
    })?;

    Ok(())
}

use core::fmt::Debug;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;
use embedded_hal::digital::OutputPin;
use log::{error, info, warn};

use crate::error::StartupError;

/// Single-slot flag raised by the button handler and consumed by the event loop.
///
/// Presses that arrive before the flag is taken collapse into one event.
pub struct PendingEvent<M: RawMutex> {
    signal: Signal<M, ()>,
}

impl<M: RawMutex> PendingEvent<M> {
    pub const fn new() -> Self {
        Self {
            signal: Signal::new(),
        }
    }

    pub fn set(&self) {
        self.signal.signal(());
    }

    /// Clears the flag and reports whether it was set, in one step.
    pub fn take(&self) -> bool {
        self.signal.try_take().is_some()
    }

    pub fn is_set(&self) -> bool {
        self.signal.signaled()
    }
}

impl<M: RawMutex> Default for PendingEvent<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonTransition {
    pub button: u8,
    pub state: ButtonState,
}

impl ButtonTransition {
    pub fn pressed(button: u8) -> Self {
        Self {
            button,
            state: ButtonState::Pressed,
        }
    }

    pub fn released(button: u8) -> Self {
        Self {
            button,
            state: ButtonState::Released,
        }
    }
}

/// Turns transitions of the designated button into LED updates and pending events.
pub struct ButtonMonitor<'a, M: RawMutex, L: OutputPin> {
    button: u8,
    led: L,
    pending: &'a PendingEvent<M>,
}

impl<'a, M: RawMutex, L: OutputPin> ButtonMonitor<'a, M, L> {
    /// Switches the indicator off and registers the monitor for `button`.
    pub fn new(button: u8, mut led: L, pending: &'a PendingEvent<M>) -> Result<Self, StartupError> {
        led.set_low().map_err(|_| StartupError::Leds)?;
        Ok(Self {
            button,
            led,
            pending,
        })
    }

    pub fn on_transition(&mut self, transition: ButtonTransition) {
        if transition.button != self.button {
            return;
        }

        match transition.state {
            ButtonState::Pressed => {
                info!("Button {} pressed", self.button);
                if self.led.set_high().is_err() {
                    warn!("Could not switch LED on");
                }
                self.pending.set();
            }
            ButtonState::Released => {
                info!("Button {} released", self.button);
                if self.led.set_low().is_err() {
                    warn!("Could not switch LED off");
                }
            }
        }
    }
}

/// Hands `monitor` to the driver's edge handler through `register`. A failed
/// registration is fatal to startup.
pub fn register_button_handler<'a, M, L, E, F>(
    monitor: ButtonMonitor<'a, M, L>,
    register: F,
) -> Result<(), StartupError>
where
    M: RawMutex,
    L: OutputPin,
    E: Debug,
    F: FnOnce(ButtonMonitor<'a, M, L>) -> Result<(), E>,
{
    register(monitor).map_err(|e| {
        error!("Failed to register button handler: {:?}", e);
        StartupError::Buttons
    })
}

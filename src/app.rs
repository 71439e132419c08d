use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Timer;
use embedded_hal::digital::OutputPin;
use log::{error, info, warn};

use crate::button::PendingEvent;
use crate::config::GatewayConfig;
use crate::error::{PayloadError, StartupError, TransportError};
use crate::http::{HttpTransport, NetworkStack, Response};
use crate::network::NetworkAttachment;
use crate::payload::build_button_payload;

/// State shared between the button handler, the radio listener and the event loop.
pub struct AppContext<M: RawMutex> {
    pub pending: PendingEvent<M>,
    pub attachment: NetworkAttachment<M>,
}

impl<M: RawMutex> AppContext<M> {
    pub const fn new() -> Self {
        Self {
            pending: PendingEvent::new(),
            attachment: NetworkAttachment::new(),
        }
    }
}

impl<M: RawMutex> Default for AppContext<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayState {
    AwaitingAttachment,
    Running,
}

#[derive(Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing pending, or not attached yet.
    Idle,
    /// The server answered, whatever the status.
    Delivered(Response),
    /// The send failed and the event was dropped.
    Dropped(TransportError),
    PayloadRejected(PayloadError),
}

/// The event loop: waits for the network once, then polls for button events
/// and posts each one.
pub struct Gateway<'a, M: RawMutex, N: NetworkStack, L: OutputPin> {
    context: &'a AppContext<M>,
    transport: HttpTransport<'a, N>,
    status_led: L,
    config: &'a GatewayConfig,
    state: GatewayState,
}

impl<'a, M: RawMutex, N: NetworkStack, L: OutputPin> Gateway<'a, M, N, L> {
    /// Switches the "attached" LED off and builds the loop around `stack`.
    pub fn new(
        context: &'a AppContext<M>,
        stack: N,
        mut status_led: L,
        config: &'a GatewayConfig,
    ) -> Result<Self, StartupError> {
        status_led.set_low().map_err(|_| StartupError::Leds)?;
        Ok(Self {
            context,
            transport: HttpTransport::new(stack, config),
            status_led,
            config,
            state: GatewayState::AwaitingAttachment,
        })
    }

    pub fn state(&self) -> GatewayState {
        self.state
    }

    pub async fn wait_for_attachment(&mut self) {
        if self.state == GatewayState::Running {
            return;
        }
        self.context.attachment.wait_attached().await;
        info!("Connected to network");
        if self.status_led.set_high().is_err() {
            warn!("Could not switch status LED on");
        }
        self.state = GatewayState::Running;
    }

    /// One loop iteration without the trailing sleep.
    pub async fn poll_once(&mut self) -> PollOutcome {
        if self.state != GatewayState::Running || !self.context.pending.take() {
            return PollOutcome::Idle;
        }

        let payload = match build_button_payload(self.config.button_id, self.config.device_id) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to build event payload: {}", e);
                return PollOutcome::PayloadRejected(e);
            }
        };

        match self.transport.send_event(&payload).await {
            Ok(response) => PollOutcome::Delivered(response),
            Err(e) => {
                error!("Failed to send HTTP request: {}", e);
                PollOutcome::Dropped(e)
            }
        }
    }

    pub async fn run(&mut self) -> ! {
        self.wait_for_attachment().await;
        loop {
            self.poll_once().await;
            Timer::after(self.config.poll_interval).await;
        }
    }
}

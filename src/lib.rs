//! Button-press reporter.
//!
//! Waits for the radio to attach to the network, then posts one JSON event to
//! an HTTP endpoint for every press of the designated button. Hardware sits
//! behind small seams ([`network::Modem`], [`http::NetworkStack`],
//! [`embedded_hal::digital::OutputPin`]) so the firmware binary wires in the
//! real drivers and the tests wire in fakes.
#![cfg_attr(not(test), no_std)]

pub mod app;
pub mod button;
pub mod config;
pub mod error;
pub mod http;
pub mod network;
pub mod payload;

pub use app::{AppContext, Gateway, GatewayState, PollOutcome};
pub use button::{
    ButtonMonitor, ButtonState, ButtonTransition, PendingEvent, register_button_handler,
};
pub use config::GatewayConfig;
pub use error::{PayloadError, RequestFailure, StartupError, TransportError};
pub use http::{HttpTransport, NetworkStack, Response, StreamSocket};
pub use network::{
    LinkEvent, LinkListener, Modem, NetworkAttachment, RadioMode, RegistrationStatus,
    configure_modem,
};

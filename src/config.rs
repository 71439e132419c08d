//! Compile-time configuration.
//!
//! Every value has a built-in default. The server location and the device
//! identifier can be overridden at build time, e.g.
//! `SERVER_HOST="10.0.0.10" SERVER_PORT="5000" DEVICE_ID="02" cargo r -r`.

use embassy_time::Duration;

const SERVER_HOST_ENV: Option<&'static str> = option_env!("SERVER_HOST");
const SERVER_PORT_ENV: Option<&'static str> = option_env!("SERVER_PORT");
const DEVICE_ID_ENV: Option<&'static str> = option_env!("DEVICE_ID");

pub const DEFAULT_SERVER_HOST: &str = "events.example.com";
pub const DEFAULT_SERVER_PORT: u16 = 5000;
pub const DEFAULT_DEVICE_ID: &str = "01";

/// Path the events are posted to.
pub const EVENTS_PATH: &str = "/api/events";

/// The only button wired to the event pipeline.
pub const BUTTON_ID: u8 = 1;

pub const HTTP_TIMEOUT_MS: u64 = 10_000;
pub const MAIN_LOOP_SLEEP_MS: u64 = 200;

/// Size of the buffer the HTTP response is read into.
pub const RECV_BUF_LEN: usize = 512;
/// Capacity of the serialized event body.
pub const PAYLOAD_BUF_LEN: usize = 256;

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub server_host: &'static str,
    pub server_port: u16,
    pub device_id: &'static str,
    pub events_path: &'static str,
    pub button_id: u8,
    /// Upper bound on one request/response exchange, connect excluded.
    pub request_timeout: Duration,
    /// Sleep between two polls of the pending button event.
    pub poll_interval: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server_host: SERVER_HOST_ENV.unwrap_or(DEFAULT_SERVER_HOST),
            server_port: SERVER_PORT_ENV
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(DEFAULT_SERVER_PORT),
            device_id: DEVICE_ID_ENV.unwrap_or(DEFAULT_DEVICE_ID),
            events_path: EVENTS_PATH,
            button_id: BUTTON_ID,
            request_timeout: Duration::from_millis(HTTP_TIMEOUT_MS),
            poll_interval: Duration::from_millis(MAIN_LOOP_SLEEP_MS),
        }
    }
}

impl GatewayConfig {
    pub fn with_server(mut self, host: &'static str, port: u16) -> Self {
        self.server_host = host;
        self.server_port = port;
        self
    }

    pub fn with_device_id(mut self, device_id: &'static str) -> Self {
        self.device_id = device_id;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

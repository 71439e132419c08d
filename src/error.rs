use thiserror::Error;

/// Failures that abort startup before the event loop is entered.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum StartupError {
    #[error("failed to initialize LEDs")]
    Leds,
    #[error("failed to initialize buttons")]
    Buttons,
    #[error("failed to initialize the radio")]
    RadioInit,
    #[error("failed to request network registration")]
    Registration,
}

/// Why a single send attempt did not complete.
///
/// A response with a status other than 201 is not a transport error.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("could not resolve the server address")]
    ResolutionFailed,
    #[error("could not create a socket")]
    SocketCreateFailed,
    #[error("could not connect to the server")]
    ConnectFailed,
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] RequestFailure),
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum RequestFailure {
    #[error("no complete response within the request timeout")]
    Timeout,
    #[error("socket I/O error")]
    Io,
    #[error("connection closed by the server")]
    ConnectionClosed,
    #[error("response headers do not fit the receive buffer")]
    HeadersTooLong,
    #[error("malformed response")]
    MalformedResponse,
    #[error("request head does not fit its buffer")]
    RequestTooLarge,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("event does not fit the payload buffer")]
    Overflow,
}

//! One-shot HTTP/1.1 POST over a plain TCP socket.
//!
//! Every call resolves the server, opens a fresh socket, connects, runs one
//! request/response exchange bounded by the request timeout and closes the
//! socket again, whatever the outcome.

use core::fmt::{Debug, Write as FmtWrite};
use core::net::{IpAddr, SocketAddr};

use embassy_time::with_timeout;
use embedded_io_async::{Read, Write};
use log::{debug, error, info, warn};

use crate::config::{GatewayConfig, RECV_BUF_LEN};
use crate::error::{RequestFailure, TransportError};

const REQUEST_HEAD_LEN: usize = 256;
const HTTP_CREATED: u16 = 201;

/// DNS and socket factory the transport runs on.
#[allow(async_fn_in_trait)]
pub trait NetworkStack {
    type Error: Debug;
    type Socket<'s>: StreamSocket
    where
        Self: 's;

    /// Resolves `host` and returns the first address found.
    async fn resolve(&self, host: &str, port: u16) -> Result<SocketAddr, Self::Error>;

    /// Creates an unconnected stream socket for the family of `remote`.
    fn open(&mut self, remote: &SocketAddr) -> Result<Self::Socket<'_>, Self::Error>;
}

/// Stream socket handed out by a [`NetworkStack`].
#[allow(async_fn_in_trait)]
pub trait StreamSocket: Read + Write {
    type ConnectError: Debug;

    async fn connect(&mut self, remote: SocketAddr) -> Result<(), Self::ConnectError>;

    fn close(&mut self);
}

/// Open socket bound to one request. Closed when dropped, including when a
/// timed-out exchange is abandoned.
pub struct ConnectionHandle<S: StreamSocket> {
    remote: SocketAddr,
    socket: S,
}

impl<S: StreamSocket> ConnectionHandle<S> {
    fn new(remote: SocketAddr, socket: S) -> Self {
        Self { remote, socket }
    }
}

impl<S: StreamSocket> Drop for ConnectionHandle<S> {
    fn drop(&mut self) {
        self.socket.close();
        debug!("Closed connection to {}", self.remote);
    }
}

/// Outcome of a completed exchange. Any status counts as completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body_len: usize,
}

impl Response {
    pub fn is_created(&self) -> bool {
        self.status == HTTP_CREATED
    }
}

pub struct HttpTransport<'c, N: NetworkStack> {
    stack: N,
    config: &'c GatewayConfig,
    recv_buf: [u8; RECV_BUF_LEN],
}

impl<'c, N: NetworkStack> HttpTransport<'c, N> {
    pub fn new(stack: N, config: &'c GatewayConfig) -> Self {
        Self {
            stack,
            config,
            recv_buf: [0; RECV_BUF_LEN],
        }
    }

    /// Posts `payload` as JSON to the events endpoint. Single attempt.
    pub async fn send_event(&mut self, payload: &str) -> Result<Response, TransportError> {
        let host = self.config.server_host;
        let port = self.config.server_port;

        // IP literals skip DNS
        let remote = match host.parse::<IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, port),
            Err(_) => self.stack.resolve(host, port).await.map_err(|e| {
                error!("DNS lookup for {} failed: {:?}", host, e);
                TransportError::ResolutionFailed
            })?,
        };

        let socket = self.stack.open(&remote).map_err(|e| {
            error!("Failed to create socket: {:?}", e);
            TransportError::SocketCreateFailed
        })?;
        let mut connection = ConnectionHandle::new(remote, socket);

        connection.socket.connect(remote).await.map_err(|e| {
            error!("Cannot connect to server: {:?}", e);
            TransportError::ConnectFailed
        })?;
        info!("Connected to {}:{}", host, port);

        info!("Sending HTTP POST: {}", payload);
        let exchange = post(
            &mut connection.socket,
            self.config,
            payload,
            &mut self.recv_buf,
        );
        match with_timeout(self.config.request_timeout, exchange).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(failure)) => {
                error!("HTTP request failed: {}", failure);
                Err(failure.into())
            }
            Err(_) => {
                error!(
                    "HTTP request failed: no response within {} ms",
                    self.config.request_timeout.as_millis()
                );
                Err(RequestFailure::Timeout.into())
            }
        }
    }
}

async fn post<S: StreamSocket>(
    socket: &mut S,
    config: &GatewayConfig,
    payload: &str,
    buf: &mut [u8],
) -> Result<Response, RequestFailure> {
    let mut head = heapless::String::<REQUEST_HEAD_LEN>::new();
    write!(
        head,
        "POST {} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        config.events_path,
        config.server_host,
        payload.len()
    )
    .map_err(|_| RequestFailure::RequestTooLarge)?;

    socket
        .write_all(head.as_bytes())
        .await
        .map_err(io_failure)?;
    socket
        .write_all(payload.as_bytes())
        .await
        .map_err(io_failure)?;
    socket.flush().await.map_err(io_failure)?;

    // Read until the end of the headers
    let mut filled = 0;
    let body_start = loop {
        if filled >= buf.len() {
            return Err(RequestFailure::HeadersTooLong);
        }
        match socket.read(&mut buf[filled..]).await.map_err(io_failure)? {
            0 => return Err(RequestFailure::ConnectionClosed),
            n => filled += n,
        }
        if let Some(end) = header_end(&buf[..filled]) {
            break end;
        }
    };

    let (status, content_length) = {
        let head = ResponseHead::parse(&buf[..body_start])?;
        info!("Response status: {} {}", head.status, head.reason);
        (head.status, head.content_length)
    };

    let mut body_len = filled - body_start;
    loop {
        if content_length.is_some_and(|expected| body_len >= expected) {
            break;
        }
        if body_len > 0 {
            info!("Partial data received ({} bytes)", body_len);
        }
        match socket.read(buf).await.map_err(io_failure)? {
            0 if content_length.is_some() => return Err(RequestFailure::ConnectionClosed),
            0 => break,
            n => body_len += n,
        }
    }
    info!("All the data received ({} bytes)", body_len);

    // Queue the FIN and wait for it to go out before the socket is dropped
    socket.close();
    if let Err(e) = socket.flush().await {
        debug!("Connection did not close cleanly: {:?}", e);
    }

    let response = Response { status, body_len };
    if response.is_created() {
        info!("Request successful!");
    } else {
        warn!("Request returned non-201 status");
    }
    Ok(response)
}

fn io_failure<E: Debug>(e: E) -> RequestFailure {
    debug!("Socket error: {:?}", e);
    RequestFailure::Io
}

/// Index just past the `\r\n\r\n` that terminates the headers.
fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

#[derive(Debug, PartialEq, Eq)]
struct ResponseHead<'a> {
    status: u16,
    reason: &'a str,
    content_length: Option<usize>,
}

impl<'a> ResponseHead<'a> {
    fn parse(raw: &'a [u8]) -> Result<Self, RequestFailure> {
        let text = core::str::from_utf8(raw).map_err(|_| RequestFailure::MalformedResponse)?;
        let mut lines = text.split("\r\n");

        let status_line = lines.next().ok_or(RequestFailure::MalformedResponse)?;
        let mut parts = status_line.splitn(3, ' ');
        let version = parts.next().unwrap_or_default();
        if !version.starts_with("HTTP/") {
            return Err(RequestFailure::MalformedResponse);
        }
        let status = parts
            .next()
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or(RequestFailure::MalformedResponse)?;
        let reason = parts.next().unwrap_or_default().trim();

        let mut content_length = None;
        for line in lines.take_while(|line| !line.is_empty()) {
            let Some((name, value)) = line.split_once(':') else {
                return Err(RequestFailure::MalformedResponse);
            };
            if name.trim().eq_ignore_ascii_case("content-length") {
                let length = value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| RequestFailure::MalformedResponse)?;
                content_length = Some(length);
            }
        }

        Ok(Self {
            status,
            reason,
            content_length,
        })
    }
}

//! Fakes for the hardware and network seams.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::rc::Rc;

use button_gateway::{NetworkStack, StreamSocket};
use embedded_io_async::{ErrorKind, ErrorType, Read, Write};

pub const SERVER_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 10)), 5000);

pub const CREATED: &[u8] =
    b"HTTP/1.1 201 CREATED\r\nContent-Type: application/json\r\nContent-Length: 21\r\n\r\n{\"status\":\"success\"}\n";
pub const SERVER_ERROR: &[u8] =
    b"HTTP/1.1 500 INTERNAL SERVER ERROR\r\nContent-Length: 0\r\n\r\n";

/// Output pin that remembers its level.
#[derive(Clone, Default)]
pub struct FakeLed(Rc<Cell<bool>>);

impl FakeLed {
    pub fn is_on(&self) -> bool {
        self.0.get()
    }
}

impl embedded_hal::digital::ErrorType for FakeLed {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for FakeLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set(true);
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Serve the next scripted response.
    Respond,
    /// Accept the request and never answer.
    Hang,
}

#[derive(Default)]
pub struct StackState {
    pub resolve_fails: bool,
    pub open_fails: bool,
    pub connect_fails: bool,
    pub hang: bool,
    /// Responses served in order, one per connection, in chunks.
    pub responses: VecDeque<Vec<Vec<u8>>>,
    pub resolved: Vec<String>,
    pub opened: usize,
    pub closed: usize,
    /// Connections flushed after `close`, i.e. shut down with a FIN.
    pub graceful_closes: usize,
    pub connected_to: Vec<SocketAddr>,
    /// Bytes written on each closed connection.
    pub requests: Vec<Vec<u8>>,
}

impl StackState {
    pub fn open_handles(&self) -> usize {
        self.opened - self.closed
    }
}

/// Scripted network stack. Clones share state so a test can keep a handle
/// after moving the stack into a transport.
#[derive(Clone, Default)]
pub struct FakeStack {
    pub state: Rc<RefCell<StackState>>,
}

impl FakeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response delivered in one read.
    pub fn respond(&self, response: &[u8]) -> &Self {
        self.state
            .borrow_mut()
            .responses
            .push_back(vec![response.to_vec()]);
        self
    }

    /// Queues a response delivered in chunks of `chunk` bytes.
    pub fn respond_chunked(&self, response: &[u8], chunk: usize) -> &Self {
        let chunks = response.chunks(chunk).map(<[u8]>::to_vec).collect();
        self.state.borrow_mut().responses.push_back(chunks);
        self
    }

    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.state.borrow().requests.clone()
    }
}

#[derive(Debug)]
pub struct FakeNetError;

impl NetworkStack for FakeStack {
    type Error = FakeNetError;
    type Socket<'s>
        = FakeSocket
    where
        Self: 's;

    async fn resolve(&self, host: &str, port: u16) -> Result<SocketAddr, Self::Error> {
        let mut state = self.state.borrow_mut();
        state.resolved.push(host.to_string());
        if state.resolve_fails {
            return Err(FakeNetError);
        }
        Ok(SocketAddr::new(SERVER_ADDR.ip(), port))
    }

    fn open(&mut self, _remote: &SocketAddr) -> Result<Self::Socket<'_>, Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.open_fails {
            return Err(FakeNetError);
        }
        state.opened += 1;
        let reply = if state.hang { Reply::Hang } else { Reply::Respond };
        let chunks = state.responses.pop_front().unwrap_or_default();
        Ok(FakeSocket {
            state: self.state.clone(),
            reply,
            incoming: chunks.into(),
            written: Vec::new(),
            closed: false,
        })
    }
}

pub struct FakeSocket {
    state: Rc<RefCell<StackState>>,
    reply: Reply,
    incoming: VecDeque<Vec<u8>>,
    written: Vec<u8>,
    closed: bool,
}

impl ErrorType for FakeSocket {
    type Error = ErrorKind;
}

impl Read for FakeSocket {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.reply == Reply::Hang {
            return Ok(core::future::pending::<usize>().await);
        }
        let Some(mut chunk) = self.incoming.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.incoming.push_front(chunk.split_off(n));
        }
        Ok(n)
    }
}

impl Write for FakeSocket {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        if self.closed {
            self.state.borrow_mut().graceful_closes += 1;
        }
        Ok(())
    }
}

impl StreamSocket for FakeSocket {
    type ConnectError = FakeNetError;

    async fn connect(&mut self, remote: SocketAddr) -> Result<(), Self::ConnectError> {
        let mut state = self.state.borrow_mut();
        if state.connect_fails {
            return Err(FakeNetError);
        }
        state.connected_to.push(remote);
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let mut state = self.state.borrow_mut();
        state.closed += 1;
        state.requests.push(std::mem::take(&mut self.written));
    }
}

/// Splits a recorded request into its head and body.
pub fn split_request(raw: &[u8]) -> (String, Vec<u8>) {
    let text = String::from_utf8(raw.to_vec()).expect("request is utf-8");
    let (head, body) = text.split_once("\r\n\r\n").expect("request has a head");
    (head.to_string(), body.as_bytes().to_vec())
}

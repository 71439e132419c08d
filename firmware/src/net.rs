use core::net::{IpAddr, SocketAddr};

use button_gateway::{NetworkStack, StreamSocket};
use embassy_net::tcp::{ConnectError, Error as TcpError, TcpSocket};
use embassy_net::{IpAddress, Stack, dns::DnsQueryType};
use embedded_io_async::{ErrorType, Read, Write};
use log::debug;

const SOCKET_BUF_LEN: usize = 1536;

#[derive(Debug)]
pub enum NetError {
    Dns(embassy_net::dns::Error),
    NoAddress,
    /// The stack is built for IPv4 only.
    UnsupportedFamily,
}

/// TCP and DNS over the embassy-net station stack. Owns the socket buffers,
/// so only one socket exists at a time.
pub struct EmbassyNet {
    stack: Stack<'static>,
    rx_buffer: [u8; SOCKET_BUF_LEN],
    tx_buffer: [u8; SOCKET_BUF_LEN],
}

impl EmbassyNet {
    pub fn new(stack: Stack<'static>) -> Self {
        Self {
            stack,
            rx_buffer: [0; SOCKET_BUF_LEN],
            tx_buffer: [0; SOCKET_BUF_LEN],
        }
    }
}

impl NetworkStack for EmbassyNet {
    type Error = NetError;
    type Socket<'s>
        = EmbassySocket<'s>
    where
        Self: 's;

    async fn resolve(&self, host: &str, port: u16) -> Result<SocketAddr, Self::Error> {
        debug!("Resolving {}...", host);
        let addresses = self
            .stack
            .dns_query(host, DnsQueryType::A)
            .await
            .map_err(NetError::Dns)?;
        let address = addresses.first().copied().ok_or(NetError::NoAddress)?;
        debug!("Resolved {} to {}", host, address);

        match address {
            IpAddress::Ipv4(ip) => Ok(SocketAddr::new(IpAddr::V4(ip), port)),
            #[allow(unreachable_patterns)]
            _ => Err(NetError::UnsupportedFamily),
        }
    }

    fn open(&mut self, remote: &SocketAddr) -> Result<Self::Socket<'_>, Self::Error> {
        if !remote.is_ipv4() {
            return Err(NetError::UnsupportedFamily);
        }
        Ok(EmbassySocket(TcpSocket::new(
            self.stack,
            &mut self.rx_buffer,
            &mut self.tx_buffer,
        )))
    }
}

pub struct EmbassySocket<'s>(TcpSocket<'s>);

impl ErrorType for EmbassySocket<'_> {
    type Error = TcpError;
}

impl Read for EmbassySocket<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.0.read(buf).await
    }
}

impl Write for EmbassySocket<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.write(buf).await
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.flush().await
    }
}

impl StreamSocket for EmbassySocket<'_> {
    type ConnectError = ConnectError;

    async fn connect(&mut self, remote: SocketAddr) -> Result<(), Self::ConnectError> {
        let IpAddr::V4(ip) = remote.ip() else {
            return Err(ConnectError::NoRoute);
        };
        self.0.connect((IpAddress::Ipv4(ip), remote.port())).await
    }

    fn close(&mut self) {
        self.0.close();
    }
}

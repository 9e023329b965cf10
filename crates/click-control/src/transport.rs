//! Byte-stream transports a ControlSocket client can run over.
//!
//! Routers expose their ControlSocket on a TCP port or a Unix domain socket.
//! [`connect`] opens either kind and returns a [`Connection`]; protocol code
//! only sees the [`ControlTransport`] trait.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use click_config::SocketEndpoint;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};

use crate::error::{ControlError, Result};

/// Byte stream a [`ControlSocket`](crate::ControlSocket) can run over.
pub trait ControlTransport: Read + Write {
    /// Applies a read timeout; `None` blocks indefinitely.
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    /// Shuts down both halves of the stream.
    fn shutdown(&self) -> io::Result<()>;
}

/// A connected TCP or Unix domain stream.
#[derive(Debug)]
pub enum Connection {
    /// TCP connection.
    Tcp(TcpStream),
    /// Unix domain socket connection.
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Connection {
    fn stream(&mut self) -> &mut dyn ControlTransport {
        match self {
            Self::Tcp(stream) => stream,
            #[cfg(unix)]
            Self::Unix(stream) => stream,
        }
    }

    fn stream_ref(&self) -> &dyn ControlTransport {
        match self {
            Self::Tcp(stream) => stream,
            #[cfg(unix)]
            Self::Unix(stream) => stream,
        }
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream().read(buf)
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream().flush()
    }
}

impl ControlTransport for Connection {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream_ref().set_read_timeout(timeout)
    }

    fn shutdown(&self) -> io::Result<()> {
        self.stream_ref().shutdown()
    }
}

impl ControlTransport for TcpStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        Self::set_read_timeout(self, timeout)
    }

    fn shutdown(&self) -> io::Result<()> {
        Self::shutdown(self, Shutdown::Both)
    }
}

#[cfg(unix)]
impl ControlTransport for UnixStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        Self::set_read_timeout(self, timeout)
    }

    fn shutdown(&self) -> io::Result<()> {
        Self::shutdown(self, Shutdown::Both)
    }
}

/// Opens a stream to `endpoint`, giving up after `timeout`.
pub fn connect(endpoint: &SocketEndpoint, timeout: Duration) -> Result<Connection> {
    let connect_error = |source: io::Error| ControlError::Connect {
        endpoint: endpoint.to_string(),
        source,
    };
    match endpoint {
        SocketEndpoint::Tcp { host, port } => {
            let address = first_address(host, *port).map_err(|source| ControlError::Resolve {
                endpoint: endpoint.to_string(),
                source,
            })?;
            TcpStream::connect_timeout(&address, timeout)
                .map(Connection::Tcp)
                .map_err(connect_error)
        }
        #[cfg(unix)]
        SocketEndpoint::Unix { path } => connect_unix(path.as_str(), timeout).map_err(connect_error),
        #[cfg(not(unix))]
        SocketEndpoint::Unix { .. } => Err(connect_error(io::Error::new(
            io::ErrorKind::Unsupported,
            "platform does not support Unix sockets",
        ))),
    }
}

fn first_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    (host, port).to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("{host} did not resolve to any address"),
        )
    })
}

#[cfg(unix)]
fn connect_unix(path: &str, timeout: Duration) -> io::Result<Connection> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    socket.connect_timeout(&SockAddr::unix(path)?, timeout)?;
    Ok(Connection::Unix(UnixStream::from(socket)))
}

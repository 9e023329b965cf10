//! Connection state and handler RPCs.
//!
//! A [`ControlSocket`] owns one transport and strictly alternates requests
//! and responses over it. Every RPC takes `&mut self`, so a request, its
//! status lines and its payload are fully consumed before the next request
//! can be written. Errors that leave the stream at an unknown offset close
//! the connection; later calls fail with [`ControlError::Closed`].

use std::io::{BufReader, Read, Write};
use std::time::Duration;

use click_config::{Config, DEFAULT_CONNECT_TIMEOUT_MS, SocketEndpoint};
use tracing::{debug, trace};

use crate::error::{ControlError, Result};
use crate::greeting::{PROTOCOL_MINOR_VERSION, ProtocolVersion};
use crate::handler::HandlerAddress;
use crate::status::{self, TextJoin};
use crate::transport::{self, Connection, ControlTransport};

/// Connection tuning supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Upper bound on establishing the connection.
    pub connect_timeout: Duration,
    /// Per-read timeout; `None` blocks indefinitely.
    pub read_timeout: Option<Duration>,
    /// Lowest acceptable protocol minor version.
    pub min_protocol_minor: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            read_timeout: None,
            min_protocol_minor: PROTOCOL_MINOR_VERSION,
        }
    }
}

impl From<&Config> for ClientOptions {
    fn from(config: &Config) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
            min_protocol_minor: config.min_protocol_minor(),
        }
    }
}

/// Client for a router's ControlSocket.
#[derive(Debug)]
pub struct ControlSocket<T: ControlTransport = Connection> {
    stream: Option<BufReader<T>>,
    peer: String,
    version: ProtocolVersion,
}

impl ControlSocket<Connection> {
    /// Connects to `endpoint` and performs the greeting handshake.
    pub fn connect(endpoint: &SocketEndpoint, options: &ClientOptions) -> Result<Self> {
        debug!(%endpoint, "connecting to ControlSocket");
        let connection = transport::connect(endpoint, options.connect_timeout)?;
        Self::handshake(connection, endpoint.to_string(), options)
    }

    /// Connects using the endpoint and options from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::connect(config.control_socket(), &ClientOptions::from(config))
    }
}

impl<T: ControlTransport> ControlSocket<T> {
    /// Reads and validates the greeting on an already-open transport.
    ///
    /// The transport is shut down before any handshake error is returned.
    pub fn handshake(transport: T, peer: impl Into<String>, options: &ClientOptions) -> Result<Self> {
        let peer = peer.into();
        let mut reader = BufReader::new(transport);
        match Self::read_greeting(&mut reader, options) {
            Ok(version) => {
                debug!(%peer, %version, "ControlSocket handshake complete");
                Ok(Self {
                    stream: Some(reader),
                    peer,
                    version,
                })
            }
            Err(error) => {
                debug!(%peer, %error, "ControlSocket handshake failed");
                shutdown_quietly(reader.get_ref());
                Err(error)
            }
        }
    }

    fn read_greeting(reader: &mut BufReader<T>, options: &ClientOptions) -> Result<ProtocolVersion> {
        reader
            .get_ref()
            .set_read_timeout(options.read_timeout)
            .map_err(ControlError::Receive)?;
        let line = status::read_line(reader, |received| ControlError::MalformedGreeting {
            greeting: String::from_utf8_lossy(received).into_owned(),
        })?;
        let greeting = String::from_utf8_lossy(&line);
        trace!(%greeting, "greeting");
        ProtocolVersion::from_greeting(&greeting)?.ensure_supported(options.min_protocol_minor)
    }

    /// Minor protocol version negotiated during the handshake.
    #[must_use]
    pub fn protocol_minor_version(&self) -> u32 {
        self.version.minor
    }

    /// Full protocol version announced by the router.
    #[must_use]
    pub fn protocol_version(&self) -> ProtocolVersion {
        self.version
    }

    /// Description of the remote endpoint.
    #[must_use]
    pub fn peer_name(&self) -> &str {
        &self.peer
    }

    /// Whether [`close`](Self::close) has run or a failed exchange dropped the stream.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Closes the connection. Repeated calls are no-ops.
    pub fn close(&mut self) {
        if let Some(reader) = self.stream.take() {
            debug!(peer = %self.peer, "closing ControlSocket");
            shutdown_quietly(reader.get_ref());
        }
    }

    /// Reads `handler`, optionally on `element`.
    pub fn read(&mut self, element: Option<&str>, handler: &str) -> Result<Vec<u8>> {
        self.read_address(&HandlerAddress::new(element, handler))
    }

    /// Reads the handler at `address` and returns its payload.
    pub fn read_address(&mut self, address: &HandlerAddress) -> Result<Vec<u8>> {
        self.exchange(|reader| {
            send(reader.get_mut(), format!("READ {address}\n").as_bytes(), &[])?;
            status::expect_success(reader, TextJoin::Concatenate, address)?;
            let length = status::read_length(reader)?;
            let payload = read_payload(reader, length)?;
            trace!(handler = %address, length, "read payload");
            Ok(payload)
        })
    }

    /// Reads `handler` and decodes the payload as UTF-8.
    pub fn read_string(&mut self, element: Option<&str>, handler: &str) -> Result<String> {
        let address = HandlerAddress::new(element, handler);
        let payload = self.read_address(&address)?;
        String::from_utf8(payload).map_err(|_| ControlError::HandlerFormat {
            handler: address.to_string(),
        })
    }

    /// Writes `data` to `handler`, optionally on `element`.
    pub fn write(&mut self, element: Option<&str>, handler: &str, data: &[u8]) -> Result<()> {
        self.write_address(&HandlerAddress::new(element, handler), data)
    }

    /// Writes `data` to the handler at `address`.
    pub fn write_address(&mut self, address: &HandlerAddress, data: &[u8]) -> Result<()> {
        self.exchange(|reader| {
            let header = format!("WRITEDATA {address} {}\n", data.len());
            send(reader.get_mut(), header.as_bytes(), data)?;
            status::expect_success(reader, TextJoin::Newline, address)?;
            Ok(())
        })
    }

    /// Runs one request/response exchange, closing the connection if the
    /// exchange leaves the stream misaligned.
    fn exchange<R, F>(&mut self, operation: F) -> Result<R>
    where
        F: FnOnce(&mut BufReader<T>) -> Result<R>,
    {
        let reader = self.stream.as_mut().ok_or(ControlError::Closed)?;
        let result = operation(reader);
        if let Err(error) = &result
            && error.kind().poisons_connection()
        {
            debug!(peer = %self.peer, %error, "discarding ControlSocket after failed exchange");
            self.close();
        }
        result
    }
}

/// Upper bound on the buffer reserved before any payload byte arrives.
const PAYLOAD_RESERVE_LIMIT: usize = 64 * 1024;

/// Reads exactly `length` payload bytes.
///
/// The buffer grows with the bytes actually received, so an inflated length
/// line ends in [`ControlError::ConnectionClosed`] rather than a huge
/// allocation.
fn read_payload<R: Read>(reader: &mut R, length: usize) -> Result<Vec<u8>> {
    let mut payload = Vec::with_capacity(length.min(PAYLOAD_RESERVE_LIMIT));
    let limit = u64::try_from(length).map_err(|_| ControlError::MalformedLength {
        line: length.to_string(),
    })?;
    reader
        .by_ref()
        .take(limit)
        .read_to_end(&mut payload)
        .map_err(ControlError::receive)?;
    if payload.len() < length {
        return Err(ControlError::ConnectionClosed);
    }
    Ok(payload)
}

fn send<W: Write>(writer: &mut W, header: &[u8], body: &[u8]) -> Result<()> {
    trace!(request = %String::from_utf8_lossy(header).trim_end(), "sending request");
    writer.write_all(header).map_err(ControlError::Send)?;
    writer.write_all(body).map_err(ControlError::Send)?;
    writer.flush().map_err(ControlError::Send)
}

fn shutdown_quietly<T: ControlTransport>(transport: &T) {
    if let Err(error) = transport.shutdown() {
        debug!(%error, "ignoring ControlSocket shutdown failure");
    }
}

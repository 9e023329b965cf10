//! Error taxonomy for ControlSocket clients.

use std::io;

use thiserror::Error;

/// Coarse classification of a [`ControlError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connecting, reading or writing the transport failed.
    Transport,
    /// The router sent bytes that do not follow the wire grammar.
    Protocol,
    /// The router speaks an unsupported protocol version.
    VersionMismatch,
    /// A directory payload did not match its expected layout.
    Format,
    /// The connection was already closed.
    Closed,
    /// Status 500.
    Syntax,
    /// Status 501.
    Unimplemented,
    /// Status 510.
    NoSuchElement,
    /// Status 511.
    NoSuchHandler,
    /// Status 520.
    HandlerError,
    /// Status 530.
    PermissionDenied,
    /// Any other status code.
    Unknown,
}

impl ErrorKind {
    /// Whether an error of this kind leaves the stream at an unknown offset.
    ///
    /// Classified status errors and format errors are raised after the whole
    /// response has been consumed, so the connection stays usable.
    #[must_use]
    pub const fn poisons_connection(self) -> bool {
        matches!(self, Self::Transport | Self::Protocol)
    }
}

/// Errors raised by [`ControlSocket`](crate::ControlSocket) operations.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The TCP host name did not resolve.
    #[error("failed to resolve ControlSocket address {endpoint}: {source}")]
    Resolve {
        /// Endpoint being resolved.
        endpoint: String,
        /// Resolver failure.
        #[source]
        source: io::Error,
    },
    /// The transport could not be opened.
    #[error("failed to connect to ControlSocket at {endpoint}: {source}")]
    Connect {
        /// Endpoint being dialled.
        endpoint: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// Writing a request failed.
    #[error("failed to send request to ControlSocket: {0}")]
    Send(#[source] io::Error),
    /// Reading a response failed.
    #[error("failed to read from ControlSocket: {0}")]
    Receive(#[source] io::Error),
    /// The router hung up mid-response.
    #[error("ControlSocket closed the connection")]
    ConnectionClosed,
    /// The greeting line is not `<name>/<major>.<minor>`.
    #[error("unexpected greeting from ControlSocket: {greeting:?}")]
    MalformedGreeting {
        /// Greeting as received.
        greeting: String,
    },
    /// The router speaks a protocol version this client rejects.
    #[error("wrong ControlSocket version {major}.{minor}")]
    VersionMismatch {
        /// Announced major version.
        major: u32,
        /// Announced minor version.
        minor: u32,
    },
    /// A status line lacks a three-digit code.
    #[error("bad response line from ControlSocket: {line:?}")]
    MalformedStatusLine {
        /// Line as received.
        line: String,
    },
    /// The payload length line is missing or unusable.
    #[error("bad length returned from ControlSocket: {line:?}")]
    MalformedLength {
        /// Line as received.
        line: String,
    },
    /// A directory payload did not match its layout.
    #[error("bad format in handler `{handler}'")]
    HandlerFormat {
        /// Handler whose payload was rejected.
        handler: String,
    },
    /// The connection was closed before this call.
    #[error("ControlSocket connection is closed")]
    Closed,
    /// Status 500.
    #[error("Syntax error calling handler `{handler}`")]
    Syntax {
        /// Handler being called.
        handler: String,
    },
    /// Status 501.
    #[error("unimplemented ControlSocket command")]
    Unimplemented,
    /// Status 510.
    #[error("no such element `{element}'")]
    NoSuchElement {
        /// Element named by the address.
        element: String,
    },
    /// Status 511.
    #[error("no such handler `{handler}'")]
    NoSuchHandler {
        /// Handler being called.
        handler: String,
    },
    /// Status 520.
    #[error("handler `{handler}' failed: {}", .message.trim_end())]
    Handler {
        /// Handler being called.
        handler: String,
        /// Error text sent by the router.
        message: String,
    },
    /// Status 530.
    #[error("permission denied calling handler `{handler}'")]
    PermissionDenied {
        /// Handler being called.
        handler: String,
    },
    /// Any status code without a dedicated variant.
    #[error("unknown ControlSocket error code {code}")]
    UnknownStatus {
        /// Code as received.
        code: u16,
        /// Accumulated status text.
        message: String,
    },
}

impl ControlError {
    /// Returns the coarse classification for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Resolve { .. }
            | Self::Connect { .. }
            | Self::Send(_)
            | Self::Receive(_)
            | Self::ConnectionClosed => ErrorKind::Transport,
            Self::MalformedGreeting { .. }
            | Self::MalformedStatusLine { .. }
            | Self::MalformedLength { .. } => ErrorKind::Protocol,
            Self::VersionMismatch { .. } => ErrorKind::VersionMismatch,
            Self::HandlerFormat { .. } => ErrorKind::Format,
            Self::Closed => ErrorKind::Closed,
            Self::Syntax { .. } => ErrorKind::Syntax,
            Self::Unimplemented => ErrorKind::Unimplemented,
            Self::NoSuchElement { .. } => ErrorKind::NoSuchElement,
            Self::NoSuchHandler { .. } => ErrorKind::NoSuchHandler,
            Self::Handler { .. } => ErrorKind::HandlerError,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::UnknownStatus { .. } => ErrorKind::Unknown,
        }
    }

    /// Handler address the router reported on, when the error names one.
    #[must_use]
    pub fn handler(&self) -> Option<&str> {
        match self {
            Self::HandlerFormat { handler }
            | Self::Syntax { handler }
            | Self::NoSuchHandler { handler }
            | Self::Handler { handler, .. }
            | Self::PermissionDenied { handler } => Some(handler),
            _ => None,
        }
    }

    pub(crate) fn receive(source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::UnexpectedEof {
            Self::ConnectionClosed
        } else {
            Self::Receive(source)
        }
    }
}

/// Result alias for ControlSocket operations.
pub type Result<T> = std::result::Result<T, ControlError>;

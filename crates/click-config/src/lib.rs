//! Shared configuration for the Click ControlSocket tooling.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then an
//! optional TOML file (`--config-path` or `CLICK_CONFIG_PATH`), then
//! `CLICK_*` environment variables, then command-line flags. The resulting
//! [`Config`] tells clients where the router's ControlSocket listens, how long
//! to wait on it, which protocol versions to accept, and how to log.

mod defaults;
mod logging;
mod socket;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_MIN_PROTOCOL_MINOR,
    DEFAULT_READ_TIMEOUT_MS, DEFAULT_TCP_PORT, default_control_socket, default_log_filter,
    default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError};

/// Resolved configuration shared by the CLI and library consumers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "CLICK")]
pub struct Config {
    /// ControlSocket endpoint, e.g. `tcp://127.0.0.1:7777` or `unix:///run/click.sock`.
    #[ortho_config(default = default_control_socket())]
    pub control_socket: SocketEndpoint,
    /// Upper bound on establishing the connection, in milliseconds.
    #[ortho_config(default = DEFAULT_CONNECT_TIMEOUT_MS)]
    pub connect_timeout_ms: u64,
    /// Per-read timeout in milliseconds. Zero disables the timeout.
    #[ortho_config(default = DEFAULT_READ_TIMEOUT_MS)]
    pub read_timeout_ms: u64,
    /// Lowest protocol minor version accepted from the router greeting.
    #[ortho_config(default = DEFAULT_MIN_PROTOCOL_MINOR)]
    pub min_protocol_minor: u32,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log line format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            control_socket: default_control_socket(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            min_protocol_minor: DEFAULT_MIN_PROTOCOL_MINOR,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Endpoint of the router's ControlSocket.
    #[must_use]
    pub fn control_socket(&self) -> &SocketEndpoint {
        &self.control_socket
    }

    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Read timeout, or `None` when reads should block indefinitely.
    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }

    /// Minimum accepted protocol minor version.
    #[must_use]
    pub fn min_protocol_minor(&self) -> u32 {
        self.min_protocol_minor
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

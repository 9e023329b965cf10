use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// Host used when no ControlSocket endpoint is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Conventional TCP port for `ControlSocket(TCP, 7777)`.
pub const DEFAULT_TCP_PORT: u16 = 7777;

/// Connect timeout applied when none is configured.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Read timeout in milliseconds; zero leaves reads blocking.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 0;

/// Lowest protocol minor version accepted from a router greeting.
pub const DEFAULT_MIN_PROTOCOL_MINOR: u32 = 0;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Computes the default ControlSocket endpoint.
pub fn default_control_socket() -> SocketEndpoint {
    SocketEndpoint::tcp(DEFAULT_HOST, DEFAULT_TCP_PORT)
}

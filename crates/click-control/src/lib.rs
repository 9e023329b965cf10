//! Client for the Click modular router's ControlSocket protocol.
//!
//! A router configured with a `ControlSocket` element accepts line-oriented
//! commands on a TCP port or Unix socket. This crate opens that connection,
//! checks the greeting's protocol version, and exposes handler reads and
//! writes plus the directory queries built on them (element names, handler
//! listings, classes, packages, requirements, configuration and version).
//!
//! ```no_run
//! use click_config::SocketEndpoint;
//! use click_control::{ClientOptions, ControlSocket};
//!
//! # fn main() -> click_control::Result<()> {
//! let endpoint = SocketEndpoint::tcp("127.0.0.1", 7777);
//! let mut socket = ControlSocket::connect(&endpoint, &ClientOptions::default())?;
//! println!("router version {}", socket.version()?);
//! for handler in socket.list_handlers("src")? {
//!     println!("{}\t{}", handler.name(), handler.flags());
//! }
//! socket.close();
//! # Ok(())
//! # }
//! ```

mod client;
mod directory;
mod error;
mod greeting;
mod handler;
pub mod status;
mod transport;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use client::{ClientOptions, ControlSocket};
pub use directory::{parse_element_list, parse_handler_list, split_lines};
pub use error::{ControlError, ErrorKind, Result};
pub use greeting::{PROTOCOL_MAJOR_VERSION, PROTOCOL_MINOR_VERSION, ProtocolVersion};
pub use handler::{HandlerAddress, HandlerAddressParseError, HandlerDescriptor};
pub use status::{Outcome, ResponseStatus, classify};
pub use transport::{Connection, ControlTransport, connect};

#[cfg(test)]
mod tests;

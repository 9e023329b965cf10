//! Greeting parsing and protocol version negotiation.

use std::fmt;

use crate::error::{ControlError, Result};

/// Protocol major version this client speaks.
pub const PROTOCOL_MAJOR_VERSION: u32 = 1;

/// Lowest protocol minor version accepted unless configured otherwise.
pub const PROTOCOL_MINOR_VERSION: u32 = 0;

/// Version announced by the router greeting, e.g. `Click::ControlSocket/1.3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion {
    /// Major version; must equal [`PROTOCOL_MAJOR_VERSION`].
    pub major: u32,
    /// Minor version.
    pub minor: u32,
}

impl ProtocolVersion {
    /// Parses the `<major>.<minor>` pair following the first `/`.
    pub fn from_greeting(greeting: &str) -> Result<Self> {
        let malformed = || ControlError::MalformedGreeting {
            greeting: greeting.to_owned(),
        };
        let (_, version) = greeting.split_once('/').ok_or_else(malformed)?;
        let (major, minor) = version.split_once('.').ok_or_else(malformed)?;
        Ok(Self {
            major: major.parse().map_err(|_| malformed())?,
            minor: minor.parse().map_err(|_| malformed())?,
        })
    }

    /// Rejects versions this client cannot talk to.
    pub fn ensure_supported(self, min_minor: u32) -> Result<Self> {
        if self.major != PROTOCOL_MAJOR_VERSION || self.minor < min_minor {
            return Err(ControlError::VersionMismatch {
                major: self.major,
                minor: self.minor,
            });
        }
        Ok(self)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}.{}", self.major, self.minor)
    }
}

//! Handler addressing.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Identifies one handler, either on an element or global to the router.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerAddress {
    element: Option<String>,
    handler: String,
}

impl HandlerAddress {
    /// Addresses `handler` on `element`.
    #[must_use]
    pub fn element(element: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            element: Some(element.into()),
            handler: handler.into(),
        }
    }

    /// Addresses a router-global handler such as `version` or `list`.
    #[must_use]
    pub fn global(handler: impl Into<String>) -> Self {
        Self {
            element: None,
            handler: handler.into(),
        }
    }

    /// Builds an address from an optional element name.
    ///
    /// An empty element name is treated as absent.
    #[must_use]
    pub fn new(element: Option<&str>, handler: impl Into<String>) -> Self {
        match element.filter(|name| !name.is_empty()) {
            Some(name) => Self::element(name, handler),
            None => Self::global(handler),
        }
    }

    /// Element name, if the handler belongs to an element.
    #[must_use]
    pub fn element_name(&self) -> Option<&str> {
        self.element.as_deref()
    }

    /// Bare handler name.
    #[must_use]
    pub fn handler_name(&self) -> &str {
        &self.handler
    }
}

impl fmt::Display for HandlerAddress {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.element {
            Some(element) => write!(formatter, "{element}.{}", self.handler),
            None => formatter.write_str(&self.handler),
        }
    }
}

/// Errors raised while parsing a [`HandlerAddress`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandlerAddressParseError {
    /// The input was blank.
    #[error("handler address is empty")]
    Empty,
    /// The input ends in `.`.
    #[error("handler address '{0}' has an empty handler name")]
    MissingHandler(String),
}

impl FromStr for HandlerAddress {
    type Err = HandlerAddressParseError;

    /// Splits at the last `.`: element names may be compound
    /// (`c/queue`) but handler names never contain a dot.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(HandlerAddressParseError::Empty);
        }
        match trimmed.rsplit_once('.') {
            Some((_, "")) => Err(HandlerAddressParseError::MissingHandler(trimmed.to_owned())),
            Some((element, handler)) => Ok(Self::new(Some(element), handler)),
            None => Ok(Self::global(trimmed)),
        }
    }
}

/// A handler together with the operations it supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerDescriptor {
    address: HandlerAddress,
    can_read: bool,
    can_write: bool,
}

impl HandlerDescriptor {
    /// Describes the handler at `address`.
    #[must_use]
    pub fn new(address: HandlerAddress, can_read: bool, can_write: bool) -> Self {
        Self {
            address,
            can_read,
            can_write,
        }
    }

    /// Full address of the handler.
    #[must_use]
    pub fn address(&self) -> &HandlerAddress {
        &self.address
    }

    /// Bare handler name, without the element prefix.
    #[must_use]
    pub fn name(&self) -> &str {
        self.address.handler_name()
    }

    /// Whether the handler accepts `READ`.
    #[must_use]
    pub fn can_read(&self) -> bool {
        self.can_read
    }

    /// Whether the handler accepts `WRITEDATA`.
    #[must_use]
    pub fn can_write(&self) -> bool {
        self.can_write
    }

    /// Flags in the router's listing notation (`r`, `w`, `rw` or empty).
    #[must_use]
    pub fn flags(&self) -> String {
        let mut flags = String::with_capacity(2);
        if self.can_read {
            flags.push('r');
        }
        if self.can_write {
            flags.push('w');
        }
        flags
    }
}

impl fmt::Display for HandlerDescriptor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.address.fmt(formatter)
    }
}

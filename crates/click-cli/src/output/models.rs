//! Serialisable shapes for `--output json`.

use click_control::HandlerDescriptor;
use serde::Serialize;

/// Everything the `info` command gathers from a router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct RouterInfo {
    pub(crate) version: String,
    pub(crate) classes: Vec<String>,
    pub(crate) config: String,
    pub(crate) elements: Vec<String>,
    pub(crate) packages: Vec<String>,
    pub(crate) requirements: Vec<String>,
}

/// One row of a handler listing.
#[derive(Debug, Serialize)]
pub(crate) struct HandlerEntry<'a> {
    pub(crate) name: &'a str,
    pub(crate) address: String,
    pub(crate) readable: bool,
    pub(crate) writable: bool,
}

impl<'a> From<&'a HandlerDescriptor> for HandlerEntry<'a> {
    fn from(descriptor: &'a HandlerDescriptor) -> Self {
        Self {
            name: descriptor.name(),
            address: descriptor.address().to_string(),
            readable: descriptor.can_read(),
            writable: descriptor.can_write(),
        }
    }
}

/// Acknowledgement for a successful write.
#[derive(Debug, Serialize)]
pub(crate) struct WriteReceipt<'a> {
    pub(crate) handler: &'a str,
    pub(crate) bytes: usize,
}

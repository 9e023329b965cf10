//! Router introspection built on the global and per-element read handlers.

use crate::client::ControlSocket;
use crate::error::{ControlError, Result};
use crate::handler::{HandlerAddress, HandlerDescriptor};
use crate::transport::ControlTransport;

const LIST: &str = "list";
const HANDLERS: &str = "handlers";
const CLASSES: &str = "classes";
const PACKAGES: &str = "packages";
const REQUIREMENTS: &str = "requirements";
const CONFIG: &str = "config";
const FLAT_CONFIG: &str = "flatconfig";
const VERSION: &str = "version";

/// Splits `text` into `\n`-separated lines, dropping a trailing empty line.
///
/// ```
/// use click_control::split_lines;
///
/// let lines: Vec<&str> = split_lines("a\nb\n").collect();
/// assert_eq!(lines, ["a", "b"]);
/// ```
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let body = text.strip_suffix('\n').unwrap_or(text);
    (!text.is_empty())
        .then(|| body.split('\n'))
        .into_iter()
        .flatten()
}

/// Parses the payload of the global `list` handler.
///
/// The first line holds the element count; each following line names one
/// element.
pub fn parse_element_list(payload: &str) -> Result<Vec<String>> {
    let format_error = || ControlError::HandlerFormat {
        handler: String::from(LIST),
    };
    let (count, rest) = payload.split_once('\n').unwrap_or((payload, ""));
    let expected: usize = count.trim().parse().map_err(|_| format_error())?;
    let names: Vec<String> = split_lines(rest).map(str::to_owned).collect();
    if names.len() != expected {
        return Err(format_error());
    }
    Ok(names)
}

/// Parses the payload of an element's `handlers` handler.
///
/// Each line is `<name><whitespace><flags>`; flags are scanned
/// case-insensitively for `r` and `w` up to the next whitespace.
pub fn parse_handler_list(element: &str, payload: &str) -> Result<Vec<HandlerDescriptor>> {
    split_lines(payload)
        .map(|line| parse_handler_line(element, line))
        .collect()
}

fn parse_handler_line(element: &str, line: &str) -> Result<HandlerDescriptor> {
    let (name, rest) = line
        .split_once(char::is_whitespace)
        .ok_or_else(|| ControlError::HandlerFormat {
            handler: HandlerAddress::element(element, HANDLERS).to_string(),
        })?;
    let flags = rest
        .trim_start()
        .split(char::is_whitespace)
        .next()
        .unwrap_or_default();
    let has_flag = |flag: char| flags.chars().any(|c| c.eq_ignore_ascii_case(&flag));
    Ok(HandlerDescriptor::new(
        HandlerAddress::new(Some(element), name.trim()),
        has_flag('r'),
        has_flag('w'),
    ))
}

impl<T: ControlTransport> ControlSocket<T> {
    /// Names of the elements in the running configuration.
    pub fn list_element_names(&mut self) -> Result<Vec<String>> {
        let payload = self.read_string(None, LIST)?;
        parse_element_list(&payload)
    }

    /// Handlers exposed by `element`, with their read/write capabilities.
    pub fn list_handlers(&mut self, element: &str) -> Result<Vec<HandlerDescriptor>> {
        let payload = self.read_string(Some(element), HANDLERS)?;
        parse_handler_list(element, &payload)
    }

    /// Element classes the router knows about.
    pub fn list_classes(&mut self) -> Result<Vec<String>> {
        self.read_lines(CLASSES)
    }

    /// Packages loaded into the router.
    pub fn list_packages(&mut self) -> Result<Vec<String>> {
        self.read_lines(PACKAGES)
    }

    /// Requirements declared by the running configuration.
    pub fn list_requirements(&mut self) -> Result<Vec<String>> {
        self.read_lines(REQUIREMENTS)
    }

    /// The router configuration as written.
    pub fn config(&mut self) -> Result<String> {
        self.read_string(None, CONFIG)
    }

    /// The flattened router configuration.
    pub fn flat_config(&mut self) -> Result<String> {
        self.read_string(None, FLAT_CONFIG)
    }

    /// The router's version string, without surrounding whitespace.
    pub fn version(&mut self) -> Result<String> {
        Ok(self.read_string(None, VERSION)?.trim().to_owned())
    }

    fn read_lines(&mut self, handler: &str) -> Result<Vec<String>> {
        let payload = self.read_string(None, handler)?;
        Ok(split_lines(&payload).map(str::to_owned).collect())
    }
}

//! Response status lines and their classification.
//!
//! A router answers every command with one or more lines of the form
//! `<3-digit code><sep><text>`. The separator is `-` on every line except the
//! last; only the final line's code is authoritative. Successful reads are
//! followed by a length line announcing the payload size.

use std::io::{BufRead, Read};

use tracing::{trace, warn};

use crate::error::{ControlError, Result};
use crate::handler::HandlerAddress;

/// Success.
pub const CODE_OK: u16 = 200;
/// Success with a warning in the status text.
pub const CODE_OK_WARN: u16 = 220;
/// Command syntax error.
pub const CODE_SYNTAX_ERR: u16 = 500;
/// Unknown command.
pub const CODE_UNIMPLEMENTED: u16 = 501;
/// No element with that name.
pub const CODE_NO_ELEMENT: u16 = 510;
/// No handler with that name.
pub const CODE_NO_HANDLER: u16 = 511;
/// The handler itself reported an error.
pub const CODE_HANDLER_ERR: u16 = 520;
/// The handler does not allow the operation.
pub const CODE_NO_PERMISSION: u16 = 530;

const CONTINUATION: u8 = b'-';
const MIN_STATUS_LINE: usize = 4;

/// Longest greeting, status or length line accepted, terminator included.
pub(crate) const MAX_LINE_LENGTH: usize = 64 * 1024;

/// How message text from consecutive status lines is joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextJoin {
    /// Append each line's text directly (`READ` responses).
    Concatenate,
    /// Terminate each line's text with `\n` (`WRITEDATA` responses).
    Newline,
}

/// Final status of one response: code plus accumulated message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseStatus {
    code: u16,
    message: String,
}

impl ResponseStatus {
    /// Builds a status from its final code and joined text.
    #[must_use]
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Code from the final status line.
    #[must_use]
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Text accumulated across every status line.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the code is 200 or 220.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.code, CODE_OK | CODE_OK_WARN)
    }
}

/// Successful outcome of a handler call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Status 200.
    Ok,
    /// Status 220.
    OkWithWarning,
}

/// Maps a status onto a success outcome or the matching [`ControlError`].
pub fn classify(status: &ResponseStatus, address: &HandlerAddress) -> Result<Outcome> {
    let handler = || address.to_string();
    match status.code {
        CODE_OK => Ok(Outcome::Ok),
        CODE_OK_WARN => Ok(Outcome::OkWithWarning),
        CODE_SYNTAX_ERR => Err(ControlError::Syntax { handler: handler() }),
        CODE_UNIMPLEMENTED => Err(ControlError::Unimplemented),
        CODE_NO_ELEMENT => Err(ControlError::NoSuchElement {
            element: address
                .element_name()
                .map_or_else(handler, str::to_owned),
        }),
        CODE_NO_HANDLER => Err(ControlError::NoSuchHandler { handler: handler() }),
        CODE_HANDLER_ERR => Err(ControlError::Handler {
            handler: handler(),
            message: status.message.clone(),
        }),
        CODE_NO_PERMISSION => Err(ControlError::PermissionDenied { handler: handler() }),
        code => Err(ControlError::UnknownStatus {
            code,
            message: status.message.clone(),
        }),
    }
}

/// Reads status lines until the final one and returns the parsed status.
pub(crate) fn read_status<R>(reader: &mut R, join: TextJoin) -> Result<ResponseStatus>
where
    R: BufRead,
{
    let mut message = String::new();
    loop {
        let line = read_line(reader, malformed_status)?;
        trace!(line = %String::from_utf8_lossy(&line), "status line");
        let (head, text) = match line.split_at_checked(MIN_STATUS_LINE) {
            Some(parts) => parts,
            None => return Err(malformed_status(&line)),
        };
        message.push_str(&String::from_utf8_lossy(text));
        if join == TextJoin::Newline {
            message.push('\n');
        }
        if head.get(3) != Some(&CONTINUATION) {
            let code = parse_code(head).ok_or_else(|| malformed_status(&line))?;
            return Ok(ResponseStatus { code, message });
        }
    }
}

/// Reads a status and converts failures into errors, logging warnings.
pub(crate) fn expect_success<R>(
    reader: &mut R,
    join: TextJoin,
    address: &HandlerAddress,
) -> Result<ResponseStatus>
where
    R: BufRead,
{
    let status = read_status(reader, join)?;
    if classify(&status, address)? == Outcome::OkWithWarning {
        warn!(
            handler = %address,
            detail = status.message().trim_end(),
            "ControlSocket reported a warning"
        );
    }
    Ok(status)
}

/// Reads the line announcing the payload length.
pub(crate) fn read_length<R>(reader: &mut R) -> Result<usize>
where
    R: BufRead,
{
    let line = read_line(reader, malformed_length)?;
    trace!(line = %String::from_utf8_lossy(&line), "length line");
    parse_length(&line)
}

/// Parses the integer starting at the first digit of `line`.
///
/// Everything from that digit to the end of the line must be numeric.
pub(crate) fn parse_length(line: &[u8]) -> Result<usize> {
    let malformed = || malformed_length(line);
    let start = line
        .iter()
        .position(u8::is_ascii_digit)
        .ok_or_else(malformed)?;
    let digits = line.get(start..).ok_or_else(malformed)?;
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(malformed());
    }
    std::str::from_utf8(digits)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or_else(malformed)
}

/// Reads one line, stripping the `\n` or `\r\n` terminator.
///
/// End of stream before any byte is reported as a closed connection. A line
/// reaching [`MAX_LINE_LENGTH`] without a terminator is rejected through
/// `overlong`.
pub(crate) fn read_line<R, F>(reader: &mut R, overlong: F) -> Result<Vec<u8>>
where
    R: BufRead,
    F: FnOnce(&[u8]) -> ControlError,
{
    let mut line = Vec::new();
    let read = reader
        .by_ref()
        .take(MAX_LINE_LENGTH as u64)
        .read_until(b'\n', &mut line)
        .map_err(ControlError::receive)?;
    if read == 0 {
        return Err(ControlError::ConnectionClosed);
    }
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    } else if line.len() >= MAX_LINE_LENGTH {
        return Err(overlong(&line));
    }
    Ok(line)
}

fn parse_code(head: &[u8]) -> Option<u16> {
    let digits = head.get(..3)?;
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    Some(
        digits
            .iter()
            .fold(0_u16, |code, digit| code * 10 + u16::from(digit - b'0')),
    )
}

fn malformed_status(line: &[u8]) -> ControlError {
    ControlError::MalformedStatusLine {
        line: String::from_utf8_lossy(line).into_owned(),
    }
}

fn malformed_length(line: &[u8]) -> ControlError {
    ControlError::MalformedLength {
        line: String::from_utf8_lossy(line).into_owned(),
    }
}

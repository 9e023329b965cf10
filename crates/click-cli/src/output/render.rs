//! Plain-text rendering for terminals.

use std::io::{self, Write};

use click_control::HandlerDescriptor;

use super::models::RouterInfo;

/// Writes the router summary in the layout of the classic ControlSocket driver.
pub(crate) fn write_info<W: Write>(out: &mut W, info: &RouterInfo) -> io::Result<()> {
    writeln!(out, "Click version: {}", info.version)?;
    writeln!(out, "Router classes: {}", info.classes.join(" "))?;
    writeln!(out, "Router config:")?;
    write_text(out, &info.config)?;
    writeln!(out, "Config element names: {}", info.elements.join(" "))?;
    writeln!(out, "Router packages: {}", info.packages.join(" "))?;
    writeln!(out, "Config requirements: {}", info.requirements.join(" "))
}

pub(crate) fn write_names<W: Write>(out: &mut W, names: &[String]) -> io::Result<()> {
    names.iter().try_for_each(|name| writeln!(out, "{name}"))
}

/// One `name<TAB>flags` line per handler.
pub(crate) fn write_handlers<W: Write>(
    out: &mut W,
    handlers: &[HandlerDescriptor],
) -> io::Result<()> {
    handlers
        .iter()
        .try_for_each(|handler| writeln!(out, "{}\t{}", handler.name(), handler.flags()))
}

/// Writes `text`, terminating it with a newline when it lacks one.
pub(crate) fn write_text<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    out.write_all(text.as_bytes())?;
    if !text.is_empty() && !text.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    Ok(())
}

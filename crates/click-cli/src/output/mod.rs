//! Rendering of command results.
//!
//! Human output mirrors the router's own listing conventions; JSON output
//! serialises the same data for scripts. Handler payloads from `read` are
//! always written raw, since they may be binary.

mod models;
mod render;

use std::io::Write;

use clap::ValueEnum;
use click_control::HandlerDescriptor;
use serde::Serialize;
use serde_json::json;

use crate::AppError;
pub(crate) use models::RouterInfo;
use models::{HandlerEntry, WriteReceipt};

/// Output format selection for command results.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Selects `human` for terminal output and `json` for redirected output.
    #[default]
    Auto,
    /// Always render human-readable output.
    Human,
    /// Always emit JSON documents.
    Json,
}

/// Output format after resolving `auto` based on TTY detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResolvedOutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    /// Resolves the output format based on whether stdout is a terminal.
    #[must_use]
    pub fn resolve(self, stdout_is_terminal: bool) -> ResolvedOutputFormat {
        match self {
            Self::Auto if stdout_is_terminal => ResolvedOutputFormat::Human,
            Self::Auto | Self::Json => ResolvedOutputFormat::Json,
            Self::Human => ResolvedOutputFormat::Human,
        }
    }
}

/// Result of one CLI command, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Report {
    Info(RouterInfo),
    Names(Vec<String>),
    Handlers(Vec<HandlerDescriptor>),
    Version(String),
    Config(String),
    Payload(Vec<u8>),
    Written { handler: String, bytes: usize },
}

/// Writes `report` to `out` in the requested format and flushes.
pub(crate) fn emit<W: Write>(
    report: &Report,
    format: ResolvedOutputFormat,
    out: &mut W,
) -> Result<(), AppError> {
    match format {
        ResolvedOutputFormat::Human => emit_human(report, out).map_err(AppError::EmitOutput)?,
        ResolvedOutputFormat::Json => emit_json(report, out)?,
    }
    out.flush().map_err(AppError::EmitOutput)
}

fn emit_human<W: Write>(report: &Report, out: &mut W) -> std::io::Result<()> {
    match report {
        Report::Info(info) => render::write_info(out, info),
        Report::Names(names) => render::write_names(out, names),
        Report::Handlers(handlers) => render::write_handlers(out, handlers),
        Report::Version(text) | Report::Config(text) => render::write_text(out, text),
        Report::Payload(bytes) => out.write_all(bytes),
        Report::Written { .. } => Ok(()),
    }
}

fn emit_json<W: Write>(report: &Report, out: &mut W) -> Result<(), AppError> {
    match report {
        Report::Info(info) => write_document(out, info),
        Report::Names(names) => write_document(out, names),
        Report::Handlers(handlers) => {
            let entries: Vec<HandlerEntry<'_>> = handlers.iter().map(HandlerEntry::from).collect();
            write_document(out, &entries)
        }
        Report::Version(version) => write_document(out, &json!({ "version": version })),
        Report::Config(config) => write_document(out, &json!({ "config": config })),
        Report::Payload(bytes) => out.write_all(bytes).map_err(AppError::EmitOutput),
        Report::Written { handler, bytes } => write_document(
            out,
            &WriteReceipt {
                handler,
                bytes: *bytes,
            },
        ),
    }
}

fn write_document<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<(), AppError> {
    serde_json::to_writer_pretty(&mut *out, value).map_err(AppError::SerialiseOutput)?;
    out.write_all(b"\n").map_err(AppError::EmitOutput)
}

//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use click_control::{ControlError, HandlerAddressParseError};
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error("invalid handler address {input:?}: {source}")]
    InvalidHandler {
        input: String,
        #[source]
        source: HandlerAddressParseError,
    },
    #[error("failed to read handler data from stdin: {0}")]
    ReadInput(io::Error),
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(serde_json::Error),
    #[error("failed to write output: {0}")]
    EmitOutput(io::Error),
}

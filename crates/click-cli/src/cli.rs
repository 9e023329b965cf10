//! CLI argument definitions for `clickctl`.

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

/// Inspects and drives a Click router through its ControlSocket.
///
/// Configuration flags such as `--control-socket` must precede `--output`
/// and the command.
#[derive(Parser, Debug)]
#[command(name = "clickctl", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Controls how results are rendered.
    #[arg(long, value_enum, default_value_t = OutputFormat::Auto, global = true)]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Operations exposed by the CLI.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Prints version, classes, configuration, elements, packages and requirements.
    Info,
    /// Lists the elements in the running configuration.
    List,
    /// Lists an element's handlers with their read/write flags.
    Handlers {
        /// Element name, for example `src`.
        element: String,
    },
    /// Reads a handler and writes its raw payload to stdout.
    Read {
        /// Handler address, for example `src.count` or `version`.
        handler: String,
    },
    /// Writes data to a handler.
    Write {
        /// Handler address, for example `src.rate`.
        handler: String,
        /// Data to write; read from stdin when omitted.
        data: Option<String>,
    },
    /// Lists the element classes the router knows about.
    Classes,
    /// Lists the packages loaded into the router.
    Packages,
    /// Lists the requirements of the running configuration.
    Requirements,
    /// Prints the router configuration.
    Config {
        /// Prints the flattened configuration instead.
        #[arg(long)]
        flat: bool,
    },
    /// Prints the router version.
    Version,
}

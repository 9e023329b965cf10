//! Maps CLI commands onto ControlSocket operations.

use std::io::Read;

use click_control::{ControlSocket, ControlTransport, HandlerAddress};
use tracing::debug;

use crate::AppError;
use crate::cli::CliCommand;
use crate::output::{Report, RouterInfo};

/// Runs `command` over an open connection.
///
/// `stdin` is consulted only by `write` when no inline data is given.
pub(crate) fn execute<T, R>(
    socket: &mut ControlSocket<T>,
    command: CliCommand,
    stdin: &mut R,
) -> Result<Report, AppError>
where
    T: ControlTransport,
    R: Read,
{
    debug!(?command, peer = socket.peer_name(), "executing command");
    let report = match command {
        CliCommand::Info => Report::Info(gather_info(socket)?),
        CliCommand::List => Report::Names(socket.list_element_names()?),
        CliCommand::Handlers { element } => Report::Handlers(socket.list_handlers(&element)?),
        CliCommand::Read { handler } => {
            Report::Payload(socket.read_address(&parse_address(&handler)?)?)
        }
        CliCommand::Write { handler, data } => {
            let address = parse_address(&handler)?;
            let data = match data {
                Some(text) => text.into_bytes(),
                None => read_input(stdin)?,
            };
            socket.write_address(&address, &data)?;
            Report::Written {
                handler: address.to_string(),
                bytes: data.len(),
            }
        }
        CliCommand::Classes => Report::Names(socket.list_classes()?),
        CliCommand::Packages => Report::Names(socket.list_packages()?),
        CliCommand::Requirements => Report::Names(socket.list_requirements()?),
        CliCommand::Config { flat: false } => Report::Config(socket.config()?),
        CliCommand::Config { flat: true } => Report::Config(socket.flat_config()?),
        CliCommand::Version => Report::Version(socket.version()?),
    };
    Ok(report)
}

fn gather_info<T: ControlTransport>(socket: &mut ControlSocket<T>) -> Result<RouterInfo, AppError> {
    Ok(RouterInfo {
        version: socket.version()?,
        classes: socket.list_classes()?,
        config: socket.config()?,
        elements: socket.list_element_names()?,
        packages: socket.list_packages()?,
        requirements: socket.list_requirements()?,
    })
}

fn parse_address(input: &str) -> Result<HandlerAddress, AppError> {
    input
        .parse()
        .map_err(|source| AppError::InvalidHandler {
            input: input.to_owned(),
            source,
        })
}

fn read_input<R: Read>(stdin: &mut R) -> Result<Vec<u8>, AppError> {
    let mut data = Vec::new();
    stdin.read_to_end(&mut data).map_err(AppError::ReadInput)?;
    Ok(data)
}

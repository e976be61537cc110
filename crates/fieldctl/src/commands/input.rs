//! Input subcommand handlers.

use fieldctl_api::{ControllerBinding, FieldClient};
use fieldctl_core::{ControlFrame, FieldLocation};

use crate::cli::{InputArgs, InputCommand, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

fn describe(binding: &ControllerBinding) -> String {
    match &binding.replaced {
        Some(old) => format!("{} -> {} (was {old})", binding.field, binding.controller),
        None => format!("{} -> {}", binding.field, binding.controller),
    }
}

fn unbound(field: FieldLocation) -> impl FnOnce(fieldctl_api::Error) -> CliError {
    move |e| {
        if e.is_not_found() {
            CliError::NotFound {
                resource_type: "controller binding".into(),
                identifier: field.to_string(),
                list_command: "input bind".into(),
            }
        } else {
            e.into()
        }
    }
}

pub async fn handle(
    client: &FieldClient,
    args: InputArgs,
    format: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    let binding = match args.command {
        InputCommand::Bind {
            location,
            controller,
        } => client.bind_controller(location, &controller).await?,

        InputCommand::Show { location } => client
            .controller_binding(location)
            .await
            .map_err(unbound(location))?,

        InputCommand::Unbind { location } => client
            .unbind_controller(location)
            .await
            .map_err(unbound(location))?,

        InputCommand::Set { location, file } => {
            let frame: ControlFrame = util::read_json(&file)?;
            client
                .update_input(location, &frame)
                .await
                .map_err(unbound(location))?;
            return Ok(());
        }
    };

    let out = output::render_single(format, &binding, describe)?;
    output::print_output(&out, quiet);
    Ok(())
}

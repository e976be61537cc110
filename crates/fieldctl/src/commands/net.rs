//! Net subcommand handlers.

use fieldctl_api::FieldClient;

use crate::cli::{NetArgs, NetCommand, OutputFormat};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    client: &FieldClient,
    args: NetArgs,
    format: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    match args.command {
        NetCommand::Reconcile => {
            client.reconcile().await?;
            let out = output::render_single(
                format,
                &serde_json::json!({ "reconciled": true }),
                |_| "network reconciled".into(),
            )?;
            output::print_output(&out, quiet);
            Ok(())
        }
    }
}

//! Config subcommand handlers.

use fieldctl_config::{self as config, Config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = global.config.clone().unwrap_or_else(config::config_path);

    match args.command {
        ConfigCommand::Show => {
            let cfg = config::load_config(Some(&path))?;
            let out = match util::output_format(&cfg, global) {
                OutputFormat::Json => serde_json::to_string_pretty(&cfg)?,
                OutputFormat::JsonCompact => serde_json::to_string(&cfg)?,
                OutputFormat::Table | OutputFormat::Plain => cfg.to_toml()?,
            };
            output::print_output(&out, global.quiet);
        }

        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
        }

        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            config::save_config(&Config::default(), &path)?;
            eprintln!("Wrote {}", path.display());
        }
    }
    Ok(())
}

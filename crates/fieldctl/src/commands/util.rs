//! Shared helpers for command handlers.

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use clap::ValueEnum;
use fieldctl_api::FieldClient;
use fieldctl_config::Config;
use serde::de::DeserializeOwned;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

/// `--output`, else `defaults.output`, else table.
pub fn output_format(cfg: &Config, global: &GlobalOpts) -> OutputFormat {
    global.output.unwrap_or_else(|| {
        OutputFormat::from_str(&cfg.defaults.output, true).unwrap_or(OutputFormat::Table)
    })
}

/// Client for the control plane named by `--url` or `client.url`.
pub fn client(cfg: &Config, global: &GlobalOpts) -> Result<FieldClient, CliError> {
    let url = global.url.as_deref().unwrap_or(&cfg.client.url);
    let timeout = global
        .timeout
        .map_or_else(|| cfg.client_timeout(), Duration::from_secs);
    tracing::debug!(url, timeout_secs = timeout.as_secs(), "control plane client");
    Ok(FieldClient::new(url, timeout)?)
}

/// Read and decode a JSON document from a file, or stdin when `path` is `-`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    Ok(serde_json::from_str(&raw)?)
}

// ── Network configurator seam ──
//
// The mapper never touches routers itself. It asks a configurator to
// (1) push the new mapping into declared network state and (2) converge
// physical devices onto that state. Both steps are fallible and neither
// failure rolls back the in-memory mapping.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::ReconcileError;
use crate::model::Mapping;

#[async_trait]
pub trait NetworkConfigurator: Send + Sync {
    /// Record `mapping` in the declarative network configuration.
    async fn sync_mapping(&self, mapping: &Mapping) -> Result<(), ReconcileError>;

    /// Apply pending declarative changes to devices. `skip_refresh`
    /// trusts the last known device state instead of re-reading it, which
    /// is much faster but blind to manual changes made on the devices.
    async fn converge(&self, skip_refresh: bool) -> Result<(), ReconcileError>;
}

/// Configurator for deployments without a managed network.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullConfigurator;

#[async_trait]
impl NetworkConfigurator for NullConfigurator {
    async fn sync_mapping(&self, _mapping: &Mapping) -> Result<(), ReconcileError> {
        Ok(())
    }

    async fn converge(&self, _skip_refresh: bool) -> Result<(), ReconcileError> {
        Ok(())
    }
}

/// Runs external provisioning commands.
///
/// `sync_mapping` writes the mapping as JSON to `state_file` and then runs
/// `sync_command` (if any). `converge` runs `converge_command`, appending
/// `skip_refresh_arg` when a refresh is skipped.
///
/// Each command is killed once it runs longer than `command_timeout`.
#[derive(Debug, Clone)]
pub struct CommandConfigurator {
    pub state_file: PathBuf,
    pub sync_command: Vec<String>,
    pub converge_command: Vec<String>,
    pub skip_refresh_arg: Option<String>,
    pub command_timeout: Duration,
}

impl CommandConfigurator {
    /// Default deadline for one sync or converge command.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
}

#[async_trait]
impl NetworkConfigurator for CommandConfigurator {
    async fn sync_mapping(&self, mapping: &Mapping) -> Result<(), ReconcileError> {
        let body = serde_json::to_vec_pretty(mapping).map_err(|e| ReconcileError::Sync {
            message: e.to_string(),
        })?;

        // Write-then-rename so a crashed write never leaves a torn file.
        let tmp = self.state_file.with_extension("tmp");
        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &self.state_file).await?;
        debug!(path = %self.state_file.display(), teams = mapping.len(), "wrote mapping state");

        if !self.sync_command.is_empty() {
            run(&self.sync_command, None, self.command_timeout).await?;
        }
        Ok(())
    }

    async fn converge(&self, skip_refresh: bool) -> Result<(), ReconcileError> {
        if self.converge_command.is_empty() {
            return Ok(());
        }
        let extra = if skip_refresh {
            self.skip_refresh_arg.as_deref()
        } else {
            None
        };
        info!(skip_refresh, "converging network devices");
        run(&self.converge_command, extra, self.command_timeout).await
    }
}

async fn run(
    argv: &[String],
    extra: Option<&str>,
    deadline: Duration,
) -> Result<(), ReconcileError> {
    let Some((program, args)) = argv.split_first() else {
        return Ok(());
    };

    let mut cmd = Command::new(program);
    cmd.args(args).kill_on_drop(true);
    if let Some(arg) = extra {
        cmd.arg(arg);
    }

    // Dropping the output future on timeout kills the child.
    let Ok(output) = tokio::time::timeout(deadline, cmd.output()).await else {
        warn!(
            command = %argv.join(" "),
            deadline_secs = deadline.as_secs(),
            "network command timed out"
        );
        return Err(ReconcileError::Timeout {
            command: argv.join(" "),
            after: deadline,
        });
    };
    let output = output?;
    if output.status.success() {
        return Ok(());
    }

    Err(ReconcileError::Command {
        command: argv.join(" "),
        status: output.status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
    })
}

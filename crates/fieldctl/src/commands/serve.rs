//! `serve`: run the control plane until interrupted.

use std::sync::Arc;

use fieldctl_config::Config;
use fieldctl_core::LogExporter;
use fieldctl_server::FieldServer;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::ServeArgs;
use crate::error::CliError;

pub async fn handle(cfg: &Config, args: ServeArgs) -> Result<(), CliError> {
    let mut server_config = cfg.server_config()?;
    if let Some(bind) = args.bind {
        server_config.bind = bind;
    }
    if args.no_broker {
        server_config.broker = None;
    }
    server_config.pcsm_enabled |= args.pcsm;

    if cfg.network.state_file.is_none() {
        warn!("network.state_file is not set; remaps will not reconfigure the field network");
    }
    info!(
        fields = ?server_config.fields,
        broker = server_config.broker.is_some(),
        pcsm = server_config.pcsm_enabled,
        "starting control plane"
    );

    let server = FieldServer::new(
        server_config,
        cfg.network_configurator(),
        Arc::new(LogExporter),
    );

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, shutting down");
                trigger.cancel();
            }
            Err(e) => warn!(error = %e, "cannot listen for interrupts"),
        }
    });

    server.run(shutdown).await?;
    Ok(())
}

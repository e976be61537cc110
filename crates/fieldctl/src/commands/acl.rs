//! Offline evaluation of the topology ACL.

use fieldctl_config::Config;
use fieldctl_core::acl::{expected_team, team_from_client_id};
use fieldctl_core::{AclDecision, ClientInfo, TopologyHook};
use serde::Serialize;

use crate::cli::{AclArgs, AclCommand, OutputFormat};
use crate::error::CliError;
use crate::output;

/// What the broker would decide, plus the identity diagnostics it logs.
#[derive(Debug, Serialize)]
struct AclReport {
    allowed: bool,
    privileged: bool,
    team: Option<u32>,
    reason: Option<String>,
    address_team: Option<u32>,
    client_id_team: Option<u32>,
}

fn evaluate(cfg: &Config, remote: &str, topic: &str, client_id: &str) -> Result<AclReport, CliError> {
    let acl = cfg.acl_config()?;
    let client = ClientInfo::new(client_id, remote);
    let address_team = client.remote_ip().and_then(expected_team).map(|t| t.get());
    let client_id_team = team_from_client_id(client_id, &acl.device_prefixes).map(|t| t.get());
    let hook = TopologyHook::new(acl);

    let decision = hook.evaluate(&client, topic);
    Ok(AclReport {
        allowed: decision.is_allowed(),
        privileged: decision == AclDecision::Privileged,
        team: match decision {
            AclDecision::Matched(team) => Some(team.get()),
            _ => None,
        },
        reason: match decision {
            AclDecision::Denied(reason) => Some(reason.to_string()),
            _ => None,
        },
        address_team,
        client_id_team,
    })
}

fn describe(report: &AclReport) -> String {
    let verdict = match (report.allowed, report.privileged, &report.reason) {
        (true, true, _) => "allow (privileged address)".to_owned(),
        (true, false, _) => format!("allow (team {})", report.team.unwrap_or_default()),
        (false, _, reason) => format!("deny: {}", reason.as_deref().unwrap_or("unknown")),
    };
    let mut lines = vec![verdict];
    if let (Some(claimed), Some(actual)) = (report.client_id_team, report.address_team) {
        if claimed != actual {
            lines.push(format!(
                "warning: client id claims team {claimed}, address belongs to team {actual}"
            ));
        }
    }
    lines.join("\n")
}

pub fn handle(cfg: &Config, args: AclArgs, format: OutputFormat, quiet: bool) -> Result<(), CliError> {
    match args.command {
        AclCommand::Check {
            remote,
            topic,
            client_id,
        } => {
            let report = evaluate(cfg, &remote, &topic, &client_id)?;
            output::print_output(&output::render_single(format, &report, describe)?, quiet);
            if report.allowed {
                Ok(())
            } else {
                Err(CliError::AclDenied {
                    reason: report.reason.unwrap_or_default(),
                })
            }
        }
    }
}

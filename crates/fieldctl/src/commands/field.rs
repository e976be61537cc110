//! Field inventory: configured locations and scrape targets.

use fieldctl_api::FieldClient;
use fieldctl_core::{FieldLocation, TeamNumber};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::output;

// ── Quads ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct QuadStatus {
    location: FieldLocation,
    team: Option<TeamNumber>,
}

#[derive(Tabled)]
struct QuadRow {
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Team")]
    team: String,
}

pub async fn quads(client: &FieldClient, format: OutputFormat, quiet: bool) -> Result<(), CliError> {
    let (configured, current) = tokio::try_join!(client.configured_quads(), client.current_map())?;

    let statuses: Vec<QuadStatus> = configured
        .into_iter()
        .map(|location| QuadStatus {
            location,
            team: current.occupant(location),
        })
        .collect();

    let out = output::render_list(
        format,
        &statuses,
        &statuses,
        |s| QuadRow {
            location: s.location.to_string(),
            team: s.team.map_or_else(|| "-".into(), |t| t.to_string()),
        },
        |s| s.location.to_string(),
    )?;
    output::print_output(&out, quiet);
    Ok(())
}

// ── Targets ─────────────────────────────────────────────────────────

#[derive(Tabled)]
struct TargetRow {
    #[tabled(rename = "Target")]
    target: String,
}

pub async fn targets(
    client: &FieldClient,
    format: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    let groups = client.metrics_targets().await?;
    let targets: Vec<String> = groups.iter().flat_map(|g| g.targets.clone()).collect();

    let out = output::render_list(
        format,
        &groups,
        &targets,
        |t| TargetRow { target: t.clone() },
        Clone::clone,
    )?;
    output::print_output(&out, quiet);
    Ok(())
}

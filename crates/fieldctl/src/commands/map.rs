//! Map subcommand handlers.

use fieldctl_api::{FieldClient, TeamLocation};
use fieldctl_core::{FieldLocation, Mapping, TeamNumber};
use tabled::Tabled;

use crate::cli::{MapArgs, MapCommand, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct AssignmentRow {
    #[tabled(rename = "Team")]
    team: u32,
    #[tabled(rename = "Field")]
    field: u32,
    #[tabled(rename = "Quadrant")]
    quadrant: &'static str,
    #[tabled(rename = "Robot")]
    robot: String,
}

fn assignment_row(entry: &(TeamNumber, FieldLocation)) -> AssignmentRow {
    let (team, location) = *entry;
    AssignmentRow {
        team: team.get(),
        field: location.field(),
        quadrant: location.quadrant().as_str(),
        robot: team.robot_address().to_string(),
    }
}

/// Render a whole mapping: one row per team, JSON in the API's shape.
pub(crate) fn render_mapping(format: OutputFormat, mapping: &Mapping) -> Result<String, CliError> {
    let entries: Vec<(TeamNumber, FieldLocation)> = mapping.iter().collect();
    if entries.is_empty() && format == OutputFormat::Table {
        return Ok("(no teams mapped)".into());
    }
    output::render_list(format, mapping, &entries, assignment_row, |(team, location)| {
        format!("{team} {location}")
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &FieldClient,
    args: MapArgs,
    format: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    let mapping = match args.command {
        MapCommand::Current => client.current_map().await?,

        MapCommand::Team { team } => {
            let location = client.team_location(team).await.map_err(|e| {
                if e.is_not_found() {
                    CliError::NotFound {
                        resource_type: "team".into(),
                        identifier: team.to_string(),
                        list_command: "map current".into(),
                    }
                } else {
                    e.into()
                }
            })?;
            let found = TeamLocation { team, location };
            let out = output::render_single(format, &found, |f| f.location.to_string())?;
            output::print_output(&out, quiet);
            return Ok(());
        }

        MapCommand::Remap { file, pcsm } => {
            if pcsm {
                let document: serde_json::Value = util::read_json(&file)?;
                client.remap_pcsm(&document).await?
            } else {
                let mapping: Mapping = util::read_json(&file)?;
                client.remap_immediate(&mapping).await?
            }
        }

        MapCommand::Stage => client.staged_map().await?,

        MapCommand::StageLoad { file } => {
            let mapping: Mapping = util::read_json(&file)?;
            client.replace_stage(&mapping).await?
        }

        MapCommand::StageSet { team, location } => client.stage_assign(team, location).await?,

        MapCommand::StageRm { team } => client.stage_remove(team).await.map_err(|e| {
            if e.is_not_found() {
                CliError::NotFound {
                    resource_type: "staged team".into(),
                    identifier: team.to_string(),
                    list_command: "map stage".into(),
                }
            } else {
                e.into()
            }
        })?,

        MapCommand::StageClone => client.stage_from_current().await?,

        MapCommand::StageClear => client.clear_stage().await?,

        MapCommand::Commit => client.commit_stage().await?,
    };

    output::print_output(&render_mapping(format, &mapping)?, quiet);
    Ok(())
}

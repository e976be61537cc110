use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use fieldctl_core::{
    ControlFrame, EventPublisher, FieldLocation, Mapping, TeamLocationMapper, TeamNumber, TlmError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::pcsm::PcsmMatch;
use crate::state::AppState;

/// One team's assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamLocation {
    pub team: TeamNumber,
    pub location: FieldLocation,
}

/// A controller bound to a driver position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ControllerBinding {
    pub field: FieldLocation,
    pub controller: String,
    /// Controller that held the position before this binding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdTargets {
    pub targets: Vec<String>,
}

// ── Helpers ──────────────────────────────────────────────────────────

fn parse_team(raw: &str) -> Result<TeamNumber, AppError> {
    raw.parse()
        .map_err(|e| AppError::bad_request(format!("{e}")))
}

fn parse_location(raw: &str) -> Result<FieldLocation, AppError> {
    raw.parse()
        .map_err(|e| AppError::bad_request(format!("{e}")))
}

/// Decode a mapping body and refuse snapshots that put two teams on one
/// location.
fn decode_mapping(body: &[u8]) -> Result<Mapping, AppError> {
    let mapping: Mapping = serde_json::from_slice(body).map_err(|e| {
        AppError::bad_request(format!(
            "requests must be a map of team numbers to field locations: {e}"
        ))
    })?;
    if let Some(conflict) = mapping.conflicts().first() {
        let teams: Vec<String> = conflict.teams.iter().map(ToString::to_string).collect();
        return Err(AppError::bad_request(format!(
            "{} is assigned to more than one team ({})",
            conflict.location,
            teams.join(", ")
        )));
    }
    Ok(mapping)
}

/// Accept either a JSON string or a bare `field<N>:<quadrant>` body.
fn decode_location(body: &[u8]) -> Result<FieldLocation, AppError> {
    let text = match serde_json::from_slice::<String>(body) {
        Ok(s) => s,
        Err(_) => std::str::from_utf8(body)
            .map_err(|_| AppError::bad_request("location must be UTF-8 text"))?
            .to_owned(),
    };
    text.parse()
        .map_err(|e| AppError::bad_request(format!("{e}")))
}

/// Report a reconcile failure on the event stream before handing it back.
fn surface(state: &AppState, err: TlmError) -> AppError {
    if matches!(err, TlmError::Reconcile(_)) {
        state.events.publish_error(&err);
    }
    AppError::from(err)
}

// ── Current mapping ──────────────────────────────────────────────────

pub async fn current_map(State(state): State<AppState>) -> Json<Mapping> {
    Json((*state.store.current_mapping()).clone())
}

pub async fn team_location(
    State(state): State<AppState>,
    Path(team): Path<String>,
) -> Result<Json<TeamLocation>, AppError> {
    let team = parse_team(&team)?;
    let location = state.store.get_field_for_team(team)?;
    Ok(Json(TeamLocation { team, location }))
}

pub async fn remap_immediate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Mapping>, AppError> {
    let mapping = decode_mapping(&body)?;
    let teams = mapping.len();

    state
        .events
        .publish_action_start("remap", &format!("applying on-demand mapping for {teams} teams"));
    state
        .store
        .insert_on_demand_map(mapping)
        .await
        .map_err(|e| surface(&state, e))?;
    state.events.publish_action_complete("remap");

    info!(teams, "immediately remapped teams");
    Ok(Json((*state.store.current_mapping()).clone()))
}

pub async fn remap_pcsm(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Mapping>, AppError> {
    if !state.pcsm_enabled {
        return Err(AppError::precondition_failed("integration is not enabled"));
    }

    let doc: PcsmMatch = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "error decoding match from scoring manager");
        AppError::bad_request(format!("invalid match document: {e}"))
    })?;
    let mapping = doc
        .to_mapping()
        .map_err(|e| AppError::bad_request(e.to_string()))?;
    if !mapping.conflicts().is_empty() {
        return Err(AppError::bad_request(
            "match document assigns a location to more than one team",
        ));
    }

    state
        .store
        .insert_on_demand_map(mapping)
        .await
        .map_err(|e| surface(&state, e))?;

    info!(match_number = doc.number, "remapped field from scoring manager");
    for field in &doc.fields {
        for team in field.teams.iter().filter(|t| t.number != 0) {
            info!(
                field = field.number,
                quadrant = %team.quadrant,
                team = team.number,
                name = %team.name,
                "team location change"
            );
        }
    }
    state
        .events
        .publish_log_line(&format!("remapped from scoring manager match {}", doc.number));
    Ok(Json((*state.store.current_mapping()).clone()))
}

// ── Staging ──────────────────────────────────────────────────────────

pub async fn staged_map(State(state): State<AppState>) -> Json<Mapping> {
    Json(state.store.stage_mapping())
}

pub async fn replace_stage(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Mapping>, AppError> {
    let mapping = decode_mapping(&body)?;
    state.store.insert_stage_mapping(mapping);
    Ok(Json(state.store.stage_mapping()))
}

pub async fn stage_from_current(State(state): State<AppState>) -> Json<Mapping> {
    Json(state.store.stage_from_current())
}

pub async fn stage_assign(
    State(state): State<AppState>,
    Path(team): Path<String>,
    body: Bytes,
) -> Result<Json<Mapping>, AppError> {
    let team = parse_team(&team)?;
    let location = decode_location(&body)?;
    state.store.stage_assign(team, location)?;
    Ok(Json(state.store.stage_mapping()))
}

pub async fn stage_remove(
    State(state): State<AppState>,
    Path(team): Path<String>,
) -> Result<Json<Mapping>, AppError> {
    let team = parse_team(&team)?;
    state
        .store
        .stage_remove(team)
        .ok_or_else(|| AppError::not_found(format!("team {team} is not staged")))?;
    Ok(Json(state.store.stage_mapping()))
}

pub async fn clear_stage(State(state): State<AppState>) -> Json<Mapping> {
    let discarded = state.store.clear_stage();
    debug!(discarded, "cleared staged mapping");
    Json(state.store.stage_mapping())
}

pub async fn commit_stage(State(state): State<AppState>) -> Result<Json<Mapping>, AppError> {
    state
        .store
        .commit_staged_map()
        .await
        .map_err(|e| surface(&state, e))?;
    state.events.publish_log_line("committed staged mapping");
    Ok(Json((*state.store.current_mapping()).clone()))
}

// ── Driver input ─────────────────────────────────────────────────────

pub async fn bind_controller(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ControllerBinding>, AppError> {
    let req: ControllerBinding = serde_json::from_slice(&body).map_err(|e| {
        AppError::bad_request(format!("bind requests need a Field and a Controller: {e}"))
    })?;
    if req.controller.trim().is_empty() {
        return Err(AppError::bad_request("controller id must not be empty"));
    }

    let replaced = state.input.bind_controller(req.field, req.controller.clone());
    info!(field = %req.field, controller = %req.controller, "bound controller");
    Ok(Json(ControllerBinding {
        field: req.field,
        controller: req.controller,
        replaced,
    }))
}

pub async fn controller_binding(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> Result<Json<ControllerBinding>, AppError> {
    let field = parse_location(&location)?;
    let controller = state
        .input
        .controller_for(field)
        .ok_or_else(|| AppError::not_found(format!("no controller bound to {field}")))?;
    Ok(Json(ControllerBinding {
        field,
        controller,
        replaced: None,
    }))
}

pub async fn unbind_controller(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> Result<Json<ControllerBinding>, AppError> {
    let field = parse_location(&location)?;
    let controller = state
        .input
        .unbind(field)
        .ok_or_else(|| AppError::not_found(format!("no controller bound to {field}")))?;
    info!(%field, %controller, "unbound controller");
    Ok(Json(ControllerBinding {
        field,
        controller,
        replaced: None,
    }))
}

/// Latest controller state for a position. Picked up on the next control tick.
pub async fn update_input(
    State(state): State<AppState>,
    Path(location): Path<String>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let field = parse_location(&location)?;
    let frame: ControlFrame = serde_json::from_slice(&body)
        .map_err(|e| AppError::bad_request(format!("invalid control frame: {e}")))?;
    state.input.update_state(field, frame)?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Fields & network ─────────────────────────────────────────────────

pub async fn configured_quads(State(state): State<AppState>) -> Json<Vec<FieldLocation>> {
    Json(state.configured_locations())
}

pub async fn reconcile(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.events.publish_action_start("reconcile", "full network reconcile");
    state
        .store
        .reconcile(true)
        .await
        .map_err(|e| surface(&state, e))?;
    state.events.publish_action_complete("reconcile");
    Ok(StatusCode::NO_CONTENT)
}

/// Prometheus HTTP service discovery for robots in the current mapping.
pub async fn metrics_sd(State(state): State<AppState>) -> Json<Vec<SdTargets>> {
    let targets = state
        .store
        .current_teams()
        .into_iter()
        .map(|team| format!("{}:8080", team.robot_address()))
        .collect();
    Json(vec![SdTargets { targets }])
}

// ── Broker authorization over HTTP ──
//
// External brokers delegate client authentication and topic ACLs to an
// HTTP service. Each request carries the client id and the peer address
// the broker saw; the topology hook decides, and the broker enforces.
// Responses are always 200 with `{"result": "allow" | "deny"}` so the
// broker never mistakes a denial for an outage.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use fieldctl_core::ClientInfo;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthnRequest {
    pub clientid: String,
    pub peerhost: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AclRequest {
    pub clientid: String,
    pub peerhost: String,
    pub topic: String,
    pub action: AclAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AclAction {
    Publish,
    Subscribe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthResult {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub result: AuthResult,
}

impl From<bool> for AuthResponse {
    fn from(allowed: bool) -> Self {
        let result = if allowed {
            AuthResult::Allow
        } else {
            AuthResult::Deny
        };
        Self { result }
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::bad_request(format!("invalid broker auth request: {e}")))
}

/// Connection authentication. Session diagnostics run for accepted clients.
pub async fn authenticate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AuthResponse>, AppError> {
    let req: AuthnRequest = decode(&body)?;
    let client = ClientInfo::new(req.clientid, req.peerhost);

    let allowed = state.acl.on_connect_authenticate(&client);
    if allowed {
        state.acl.on_session_established(&client);
    }
    debug!(client = %client.id, remote = %client.remote, allowed, "broker connect");
    Ok(Json(allowed.into()))
}

/// Per-topic publish or subscribe authorization.
pub async fn authorize(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AuthResponse>, AppError> {
    let req: AclRequest = decode(&body)?;
    let client = ClientInfo::new(req.clientid, req.peerhost);
    let write = req.action == AclAction::Publish;

    Ok(Json(state.acl.on_acl_check(&client, &req.topic, write).into()))
}

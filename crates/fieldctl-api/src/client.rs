// Async HTTP client for the control-plane API.
//
// Base path: /api/ (plus /metrics-sd at the root)
// Errors arrive as `{"error": "<status>", "message": "..."}`.

use std::time::Duration;

use fieldctl_core::{ControlFrame, FieldLocation, Mapping, TeamNumber};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::Error;
use crate::stream::EventStream;

// ── Response shapes ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

/// One team's current assignment.
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
    /// Set on bind when another controller held the position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced: Option<String>,
}

/// One Prometheus `http_sd_configs` target group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    pub targets: Vec<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for one control-plane instance.
#[derive(Debug, Clone)]
pub struct FieldClient {
    http: reqwest::Client,
    base_url: Url,
}

impl FieldClient {
    // ── Constructors ─────────────────────────────────────────────────

    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fieldctl/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::from_reqwest(base_url, http)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let mut base_url = Url::parse(base_url)?;
        let path = base_url.path().trim_end_matches('/').to_owned();
        base_url.set_path(&format!("{path}/"));
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let mut req = self.http.post(url);
        if let Some(body) = body {
            req = req.json(body);
        }
        handle_response(req.send().await?).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self.http.put(url).json(body).send().await?;
        handle_response(resp).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        handle_response(resp).await
    }

    /// Send a request whose success response has no body.
    async fn send_empty(&self, req: reqwest::RequestBuilder) -> Result<(), Error> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(parse_error(status, resp).await)
        }
    }

    // ── Current mapping ──────────────────────────────────────────────

    pub async fn current_map(&self) -> Result<Mapping, Error> {
        self.get("api/map/current").await
    }

    /// Where `team` currently sits. A team with no assignment is a 404
    /// ([`Error::is_not_found`]).
    pub async fn team_location(&self, team: TeamNumber) -> Result<FieldLocation, Error> {
        let found: TeamLocation = self.get(&format!("api/map/team/{team}")).await?;
        Ok(found.location)
    }

    /// Replace the live mapping in one step.
    pub async fn remap_immediate(&self, mapping: &Mapping) -> Result<Mapping, Error> {
        self.post("api/map/immediate", Some(mapping)).await
    }

    /// Replace the live mapping from a match-scheduler document.
    pub async fn remap_pcsm(&self, document: &serde_json::Value) -> Result<Mapping, Error> {
        self.post("api/map/pcsm", Some(document)).await
    }

    // ── Staging ──────────────────────────────────────────────────────

    pub async fn staged_map(&self) -> Result<Mapping, Error> {
        self.get("api/map/stage").await
    }

    pub async fn replace_stage(&self, mapping: &Mapping) -> Result<Mapping, Error> {
        self.post("api/map/stage", Some(mapping)).await
    }

    pub async fn stage_from_current(&self) -> Result<Mapping, Error> {
        self.post::<_, ()>("api/map/stage/from-current", None).await
    }

    pub async fn stage_assign(
        &self,
        team: TeamNumber,
        location: FieldLocation,
    ) -> Result<Mapping, Error> {
        self.put(&format!("api/map/stage/{team}"), &location).await
    }

    pub async fn stage_remove(&self, team: TeamNumber) -> Result<Mapping, Error> {
        self.delete(&format!("api/map/stage/{team}")).await
    }

    /// Discard the staged mapping. Returns the (now empty) stage.
    pub async fn clear_stage(&self) -> Result<Mapping, Error> {
        self.delete("api/map/stage").await
    }

    /// Promote the staged mapping. Nothing staged is a 409.
    pub async fn commit_stage(&self) -> Result<Mapping, Error> {
        self.post::<_, ()>("api/map/commit-stage", None).await
    }

    // ── Field and network ────────────────────────────────────────────

    pub async fn configured_quads(&self) -> Result<Vec<FieldLocation>, Error> {
        self.get("api/field/configured-quads").await
    }

    /// Ask for a full network reconcile.
    pub async fn reconcile(&self) -> Result<(), Error> {
        let url = self.url("api/net/reconcile")?;
        debug!("POST {url}");
        self.send_empty(self.http.post(url)).await
    }

    pub async fn metrics_targets(&self) -> Result<Vec<TargetGroup>, Error> {
        self.get("metrics-sd").await
    }

    // ── Driver input ─────────────────────────────────────────────────

    /// Bind `controller` to `field`, moving it off any other position.
    pub async fn bind_controller(
        &self,
        field: FieldLocation,
        controller: &str,
    ) -> Result<ControllerBinding, Error> {
        let req = ControllerBinding {
            field,
            controller: controller.to_owned(),
            replaced: None,
        };
        self.post("api/field/bind", Some(&req)).await
    }

    /// The controller bound to `field`. Unbound positions are a 404.
    pub async fn controller_binding(
        &self,
        field: FieldLocation,
    ) -> Result<ControllerBinding, Error> {
        self.get(&format!("api/field/bind/{field}")).await
    }

    pub async fn unbind_controller(
        &self,
        field: FieldLocation,
    ) -> Result<ControllerBinding, Error> {
        self.delete(&format!("api/field/bind/{field}")).await
    }

    /// Report the latest controller state for `field`.
    pub async fn update_input(
        &self,
        field: FieldLocation,
        frame: &ControlFrame,
    ) -> Result<(), Error> {
        let url = self.url(&format!("api/input/{field}"))?;
        debug!("PUT {url}");
        self.send_empty(self.http.put(url).json(frame)).await
    }

    // ── Event stream ─────────────────────────────────────────────────

    /// Websocket URL of the event stream.
    pub fn events_url(&self) -> Result<Url, Error> {
        let mut url = self.url("api/eventstream")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| Error::WebSocketConnect(format!("cannot derive websocket URL from {url}")))?;
        Ok(url)
    }

    pub async fn events(&self) -> Result<EventStream, Error> {
        EventStream::connect(&self.events_url()?).await
    }
}

// ── Response handling ────────────────────────────────────────────────

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    if status.is_success() {
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    } else {
        Err(parse_error(status, resp).await)
    }
}

async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
    let raw = resp.text().await.unwrap_or_default();

    let message = match serde_json::from_str::<ErrorResponse>(&raw) {
        Ok(ErrorResponse { message: Some(m) }) => m,
        _ if raw.is_empty() => status.to_string(),
        _ => raw,
    };
    Error::Api {
        status: status.as_u16(),
        message,
    }
}

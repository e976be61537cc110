use thiserror::Error;

/// Every failure a [`FieldClient`](crate::FieldClient) call can produce.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// Connection refused, DNS failure, timeout, and the like.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Control plane ───────────────────────────────────────────────
    /// Non-success status, with the message from the `{error, message}` body.
    #[error("control plane returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// A success body that did not decode, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Event stream ────────────────────────────────────────────────
    #[error("event stream connection failed: {0}")]
    WebSocketConnect(String),

    /// The server closed the stream for a reason other than shutdown.
    #[error("event stream closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },
}

impl Error {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// The request conflicted with the current or staged mapping.
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Worth retrying: the control plane was unreachable or slow.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::WebSocketConnect(_) => true,
            _ => false,
        }
    }
}

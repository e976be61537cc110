//! CLI error types with miette diagnostics.
//!
//! Maps library errors into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use fieldctl_config::ConfigError;
use fieldctl_server::ServerError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const DENIED: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the control plane at {url}")]
    #[diagnostic(
        code(fieldctl::connection_failed),
        help(
            "Check that `fieldctl serve` is running and reachable.\n\
             Set the address with --url or client.url in the config file."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Request timed out")]
    #[diagnostic(
        code(fieldctl::timeout),
        help("Increase the timeout with --timeout, or check whether a reconcile is stuck.")
    )]
    Timeout,

    // ── Control plane ────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(fieldctl::not_found), help("Run: fieldctl {list_command}"))]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Control plane rejected the request (HTTP {status}): {message}")]
    #[diagnostic(code(fieldctl::api_error))]
    Api { status: u16, message: String },

    #[error("Event stream closed by the server (code {code}): {reason}")]
    #[diagnostic(
        code(fieldctl::stream_closed),
        help("A consumer that falls behind is disconnected. Reconnect to resume.")
    )]
    StreamClosed { code: u16, reason: String },

    #[error("Unexpected response from the control plane: {message}")]
    #[diagnostic(code(fieldctl::bad_response))]
    BadResponse { message: String },

    // ── ACL ──────────────────────────────────────────────────────────
    #[error("Access denied: {reason}")]
    #[diagnostic(code(fieldctl::acl_denied))]
    AclDenied { reason: String },

    // ── Validation / configuration ───────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fieldctl::validation))]
    Validation { field: String, reason: String },

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(code(fieldctl::config_exists), help("Pass --force to overwrite it."))]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(
        code(fieldctl::config),
        help("Run: fieldctl config show  to inspect the effective configuration")
    )]
    Config(#[from] ConfigError),

    // ── Server ───────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(fieldctl::server))]
    Server(#[from] ServerError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(fieldctl::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Api { status, .. } => match status {
                404 => exit_code::NOT_FOUND,
                409 => exit_code::CONFLICT,
                400 | 412 => exit_code::USAGE,
                _ => exit_code::GENERAL,
            },
            Self::AclDenied { .. } => exit_code::DENIED,
            Self::Validation { .. } | Self::ConfigExists { .. } | Self::Config(_) => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── API error → CliError mapping ─────────────────────────────────────

impl From<fieldctl_api::Error> for CliError {
    fn from(err: fieldctl_api::Error) -> Self {
        use fieldctl_api::Error as ApiError;

        match err {
            ApiError::Transport(e) if e.is_timeout() => CliError::Timeout,
            ApiError::Transport(e) if e.is_connect() => CliError::ConnectionFailed {
                url: e.url().map(ToString::to_string).unwrap_or_default(),
                source: Box::new(e),
            },
            ApiError::Transport(e) => CliError::BadResponse {
                message: e.to_string(),
            },
            ApiError::WebSocketConnect(reason) => CliError::ConnectionFailed {
                url: "event stream".into(),
                source: reason.into(),
            },
            ApiError::InvalidUrl(e) => CliError::Validation {
                field: "url".into(),
                reason: e.to_string(),
            },
            ApiError::Api { status, message } => CliError::Api { status, message },
            ApiError::Deserialization { message, .. } => CliError::BadResponse { message },
            ApiError::WebSocketClosed { code, reason } => CliError::StreamClosed { code, reason },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn api_status_drives_exit_code() {
        let conflict = CliError::from(fieldctl_api::Error::Api {
            status: 409,
            message: "no staged mapping".into(),
        });
        assert_eq!(conflict.exit_code(), exit_code::CONFLICT);

        let missing = CliError::from(fieldctl_api::Error::Api {
            status: 404,
            message: "team 9 has no location".into(),
        });
        assert_eq!(missing.exit_code(), exit_code::NOT_FOUND);

        let disabled = CliError::Api {
            status: 412,
            message: "pcsm integration is disabled".into(),
        };
        assert_eq!(disabled.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn eviction_maps_to_stream_closed() {
        let err = CliError::from(fieldctl_api::Error::WebSocketClosed {
            code: 1008,
            reason: "connection too slow to keep up with messages".into(),
        });
        assert!(matches!(err, CliError::StreamClosed { code: 1008, .. }));
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }
}

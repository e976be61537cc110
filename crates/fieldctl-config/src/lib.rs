//! Configuration for fieldctl.
//!
//! One TOML file drives both the server and the CLI client. Values are
//! layered: built-in defaults, then the file, then `FIELDCTL_` environment
//! variables (`__` separates sections, e.g. `FIELDCTL_BROKER__HOST`).
//! Translation helpers turn the file shape into the runtime config structs
//! that `fieldctl-core` and `fieldctl-server` take.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fieldctl_core::{
    AclConfig, CommandConfigurator, EventStreamConfig, Ipv4Subnet, NetworkConfigurator,
    NullConfigurator, PusherConfig,
};
use fieldctl_server::{BrokerConfig, ServerConfig};

pub const ENV_PREFIX: &str = "FIELDCTL_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub client: ClientSection,
    pub broker: BrokerSection,
    pub pusher: PusherSection,
    pub events: EventsSection,
    pub fields: FieldsSection,
    pub acl: AclSection,
    pub network: NetworkSection,
    pub integrations: IntegrationsSection,
    pub defaults: Defaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: SocketAddr,
    pub shutdown_grace_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            shutdown_grace_ms: 5_000,
        }
    }
}

/// Where the CLI finds a running control plane.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientSection {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080".into(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BrokerSection {
    /// Without a broker the server runs the HTTP surface only.
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".into(),
            port: 1883,
            client_id: "fieldctl".into(),
            keep_alive_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PusherSection {
    pub control_period_ms: u64,
    pub location_period_ms: u64,
    pub publish_timeout_ms: u64,
}

impl Default for PusherSection {
    fn default() -> Self {
        Self {
            control_period_ms: 40,
            location_period_ms: 5_000,
            publish_timeout_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsSection {
    pub queue_depth: usize,
    pub write_timeout_ms: u64,
}

impl Default for EventsSection {
    fn default() -> Self {
        Self {
            queue_depth: 16,
            write_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FieldsSection {
    pub ids: Vec<u32>,
}

impl Default for FieldsSection {
    fn default() -> Self {
        Self { ids: vec![1] }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AclSection {
    pub management_subnet: String,
    pub device_prefixes: Vec<String>,
}

impl Default for AclSection {
    fn default() -> Self {
        let acl = AclConfig::default();
        Self {
            management_subnet: acl.management_subnet.to_string(),
            device_prefixes: acl.device_prefixes,
        }
    }
}

/// External provisioning hooks. An unset `state_file` disables network
/// reconciliation entirely.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkSection {
    pub state_file: Option<PathBuf>,
    pub sync_command: Vec<String>,
    pub converge_command: Vec<String>,
    pub skip_refresh_arg: Option<String>,
    /// Each sync or converge command is killed after this long.
    pub command_timeout_secs: u64,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            state_file: None,
            sync_command: Vec::new(),
            converge_command: Vec::new(),
            skip_refresh_arg: None,
            command_timeout_secs: CommandConfigurator::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct IntegrationsSection {
    pub pcsm: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Defaults {
    pub output: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: "table".into(),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "fieldctl", "fieldctl").map_or_else(
        || PathBuf::from("fieldctl.toml"),
        |dirs| dirs.config_dir().join("fieldctl.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered figment: defaults, then `path` (or the platform path), then env.
pub fn figment(path: Option<&Path>) -> Figment {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load and validate the config. A missing file is not an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config: Config = figment(path).extract()?;
    config.validate()?;
    Ok(config)
}

/// Serialize config to TOML at `path`, creating parent directories.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, cfg.to_toml()?)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

impl Config {
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values that would only fail later, deep inside a component.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fields.ids.is_empty() {
            return Err(invalid("fields.ids", "at least one field is required"));
        }
        if let Some(bad) = self.fields.ids.iter().find(|id| **id == 0) {
            return Err(invalid("fields.ids", format!("field ids start at 1, got {bad}")));
        }
        if self.pusher.control_period_ms == 0 || self.pusher.location_period_ms == 0 {
            return Err(invalid("pusher", "tick periods must be non-zero"));
        }
        if self.events.queue_depth == 0 {
            return Err(invalid("events.queue_depth", "must be at least 1"));
        }
        if self.network.command_timeout_secs == 0 {
            return Err(invalid("network.command_timeout_secs", "must be at least 1"));
        }
        self.acl_config()?;
        self.client_url()?;
        Ok(())
    }

    pub fn acl_config(&self) -> Result<AclConfig, ConfigError> {
        let management_subnet: Ipv4Subnet = self
            .acl
            .management_subnet
            .parse()
            .map_err(|e: fieldctl_core::acl::SubnetParseError| {
                invalid("acl.management_subnet", e.reason)
            })?;
        Ok(AclConfig {
            management_subnet,
            device_prefixes: self.acl.device_prefixes.clone(),
        })
    }

    pub fn pusher_config(&self) -> PusherConfig {
        PusherConfig {
            control_period: Duration::from_millis(self.pusher.control_period_ms),
            location_period: Duration::from_millis(self.pusher.location_period_ms),
            publish_timeout: Duration::from_millis(self.pusher.publish_timeout_ms),
        }
    }

    pub fn event_stream_config(&self) -> EventStreamConfig {
        EventStreamConfig {
            queue_depth: self.events.queue_depth,
            write_timeout: Duration::from_millis(self.events.write_timeout_ms),
        }
    }

    pub fn broker_config(&self) -> Option<BrokerConfig> {
        let b = &self.broker;
        b.enabled.then(|| BrokerConfig {
            host: b.host.clone(),
            port: b.port,
            client_id: b.client_id.clone(),
            keep_alive: Duration::from_secs(b.keep_alive_secs),
            ..BrokerConfig::default()
        })
    }

    pub fn server_config(&self) -> Result<ServerConfig, ConfigError> {
        Ok(ServerConfig {
            bind: self.server.bind,
            shutdown_grace: Duration::from_millis(self.server.shutdown_grace_ms),
            fields: self.fields.ids.clone(),
            pcsm_enabled: self.integrations.pcsm,
            events: self.event_stream_config(),
            pusher: self.pusher_config(),
            acl: self.acl_config()?,
            broker: self.broker_config(),
        })
    }

    /// The configurator the server hands to the mapping store.
    pub fn network_configurator(&self) -> Arc<dyn NetworkConfigurator> {
        match &self.network.state_file {
            Some(state_file) => Arc::new(CommandConfigurator {
                state_file: state_file.clone(),
                sync_command: self.network.sync_command.clone(),
                converge_command: self.network.converge_command.clone(),
                skip_refresh_arg: self.network.skip_refresh_arg.clone(),
                command_timeout: Duration::from_secs(self.network.command_timeout_secs),
            }),
            None => Arc::new(NullConfigurator),
        }
    }

    pub fn client_url(&self) -> Result<url::Url, ConfigError> {
        self.client
            .url
            .parse()
            .map_err(|_| invalid("client.url", format!("invalid URL: {}", self.client.url)))
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client.timeout_secs)
    }
}

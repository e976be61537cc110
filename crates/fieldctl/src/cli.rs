//! Clap derive structures for the `fieldctl` CLI.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use fieldctl_core::{FieldLocation, TeamNumber};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fieldctl -- field control plane for robotics competitions
#[derive(Debug, Parser)]
#[command(
    name = "fieldctl",
    version,
    about = "Run and operate the competition field control plane",
    long_about = "Binds teams to field locations, gates broker access by network \n\
        address, and distributes driver controls to robots.\n\n\
        `fieldctl serve` runs the control plane; every other command talks to \n\
        a running instance over HTTP.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "FIELDCTL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Control plane URL (overrides client.url)
    #[arg(long, short = 'u', env = "FIELDCTL_URL", global = true)]
    pub url: Option<String>,

    /// Output format (overrides defaults.output)
    #[arg(long, short = 'o', env = "FIELDCTL_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// Request timeout in seconds (overrides client.timeout_secs)
    #[arg(long, env = "FIELDCTL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output Enums ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the control plane (HTTP API, event stream, distribution)
    Serve(ServeArgs),

    /// Inspect and change team location mappings
    #[command(alias = "m")]
    Map(MapArgs),

    /// List every configured field location and who holds it
    Quads,

    /// List the metrics scrape targets for mapped robots
    Targets,

    /// Bind controllers to driver positions and report their input
    Input(InputArgs),

    /// Field network operations
    Net(NetArgs),

    /// Tail the operational event stream
    Events(EventsArgs),

    /// Broker access control
    Acl(AclArgs),

    /// Manage the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Serve ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Listen address (overrides server.bind)
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Run without an MQTT broker (no control distribution)
    #[arg(long)]
    pub no_broker: bool,

    /// Accept match-scheduler documents on /api/map/pcsm
    #[arg(long)]
    pub pcsm: bool,
}

// ── Map ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MapArgs {
    #[command(subcommand)]
    pub command: MapCommand,
}

#[derive(Debug, Subcommand)]
pub enum MapCommand {
    /// Show the live mapping
    #[command(alias = "ls")]
    Current,

    /// Show where one team is
    Team {
        team: TeamNumber,
    },

    /// Replace the live mapping from a JSON file ("-" for stdin)
    Remap {
        file: PathBuf,

        /// The file is a match-scheduler document rather than a mapping
        #[arg(long)]
        pcsm: bool,
    },

    /// Show the staged mapping
    Stage,

    /// Replace the staged mapping from a JSON file ("-" for stdin)
    StageLoad {
        file: PathBuf,
    },

    /// Stage one team at a location
    StageSet {
        team: TeamNumber,
        location: FieldLocation,
    },

    /// Remove one team from the staged mapping
    StageRm {
        team: TeamNumber,
    },

    /// Copy the live mapping into the stage
    StageClone,

    /// Discard the staged mapping
    StageClear,

    /// Promote the staged mapping to live
    Commit,
}

// ── Input ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct InputArgs {
    #[command(subcommand)]
    pub command: InputCommand,
}

#[derive(Debug, Subcommand)]
pub enum InputCommand {
    /// Bind a controller to a location, moving it off any other
    Bind {
        location: FieldLocation,
        controller: String,
    },

    /// Show the controller bound to a location
    Show {
        location: FieldLocation,
    },

    /// Release a location's controller
    Unbind {
        location: FieldLocation,
    },

    /// Report a location's controller state from a JSON file ("-" for stdin)
    Set {
        location: FieldLocation,
        file: PathBuf,
    },
}

// ── Net ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NetArgs {
    #[command(subcommand)]
    pub command: NetCommand,
}

#[derive(Debug, Subcommand)]
pub enum NetCommand {
    /// Run a full network reconcile
    Reconcile,
}

// ── Events ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct EventsArgs {
    /// Stop after this many events
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

// ── ACL ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AclArgs {
    #[command(subcommand)]
    pub command: AclCommand,
}

#[derive(Debug, Subcommand)]
pub enum AclCommand {
    /// Evaluate a topic access against the configured policy, offline
    Check {
        /// Client remote address (ip or ip:port)
        #[arg(long)]
        remote: String,

        /// Topic being accessed
        #[arg(long)]
        topic: String,

        /// Client id, for the claimed-team diagnostic
        #[arg(long, default_value = "")]
        client_id: String,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    pub shell: clap_complete::Shell,
}

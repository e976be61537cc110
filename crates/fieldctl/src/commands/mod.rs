//! Command dispatch: bridges CLI args -> API client / server -> output formatting.

pub mod acl;
pub mod config_cmd;
pub mod events;
pub mod field;
pub mod input;
pub mod map;
pub mod net;
pub mod serve;
pub mod util;

use fieldctl_config::Config;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command that needs the loaded config.
pub async fn dispatch(cmd: Command, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let format = util::output_format(cfg, global);
    let quiet = global.quiet;

    match cmd {
        Command::Serve(args) => serve::handle(cfg, args).await,
        Command::Acl(args) => acl::handle(cfg, args, format, quiet),

        Command::Map(args) => map::handle(&util::client(cfg, global)?, args, format, quiet).await,
        Command::Quads => field::quads(&util::client(cfg, global)?, format, quiet).await,
        Command::Targets => field::targets(&util::client(cfg, global)?, format, quiet).await,
        Command::Input(args) => {
            input::handle(&util::client(cfg, global)?, args, format, quiet).await
        }
        Command::Net(args) => net::handle(&util::client(cfg, global)?, args, format, quiet).await,
        Command::Events(args) => {
            events::handle(&util::client(cfg, global)?, args, format, quiet).await
        }

        // Config and Completions are handled before the config is loaded
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

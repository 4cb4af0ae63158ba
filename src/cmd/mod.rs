//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`], [`init`], or [`validate`]. Each handler
//! lives in its own submodule.

pub mod init;
pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::ShadowteeError;

pub async fn dispatch(cli: Cli) -> Result<(), ShadowteeError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Init(ref args)) => init::execute(args),
        Some(Commands::Validate(ref args)) => validate::execute(args),
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    let revision = env!("SHADOWTEE_GIT_SHORT");
    println!(
        "\n  shadowtee v{version} ({revision}): HTTP traffic mirroring proxy\n\n  \
         No command provided. To get started:\n\n    \
         shadowtee init                              Generate a starter config\n    \
         shadowtee run                               Start the proxy (auto-detects ./shadowtee.yaml)\n    \
         shadowtee run -a prod:8080 -b shadow:8080   Start without a config file\n    \
         shadowtee --help                            See all commands and options\n"
    );
}

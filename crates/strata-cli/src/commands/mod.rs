//! CLI command definitions and dispatch.

pub mod child;
pub mod network;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use strata_common::config::StrataConfig;
use strata_common::constants::{
    CHILD_SETUP_FAILED, DATA_DIR_ENV, DEFAULT_DATA_DIR, DEFAULT_RUN_DIR, RUN_DIR_ENV,
};

/// strata: run commands in isolated, image-backed containers.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Base directory for images and container filesystems.
    #[arg(long, global = true, env = DATA_DIR_ENV, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Base directory for runtime artifacts such as network namespaces.
    #[arg(long, global = true, env = RUN_DIR_ENV, default_value = DEFAULT_RUN_DIR)]
    pub run_dir: PathBuf,
}

impl Cli {
    /// Runtime configuration selected by the global flags.
    #[must_use]
    pub fn config(&self) -> StrataConfig {
        StrataConfig::new(&self.data_dir, &self.run_dir)
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command in a new container.
    Run(run::RunArgs),
    /// Finish container setup inside the new namespaces (internal).
    #[command(name = "child-mode", hide = true)]
    ChildMode(child::ChildArgs),
    /// Create the container's network namespace (internal).
    #[command(name = "setup-netns", hide = true)]
    SetupNetns(network::StageArgs),
    /// Move the container veth into its namespace (internal).
    #[command(name = "fence-veth", hide = true)]
    FenceVeth(network::StageArgs),
    /// Configure the container veth inside its namespace (internal).
    #[command(name = "setup-veth", hide = true)]
    SetupVeth(network::StageArgs),
}

impl Command {
    /// Exit status reported when this command fails.
    ///
    /// `child-mode` uses a reserved status so the spawning parent can tell
    /// a failed bootstrap apart from the user command's own exit status.
    #[must_use]
    pub const fn failure_status(&self) -> u8 {
        match self {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Self::ChildMode(_) => CHILD_SETUP_FAILED as u8,
            _ => 1,
        }
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// Returns the process exit code on success.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<i32> {
    let config = cli.config();
    match cli.command {
        Command::Run(args) => run::execute(config, args),
        Command::ChildMode(args) => child::execute(&config, args),
        Command::SetupNetns(args) => network::execute(&config, "setup-netns", &args),
        Command::FenceVeth(args) => network::execute(&config, "fence-veth", &args),
        Command::SetupVeth(args) => network::execute(&config, "setup-veth", &args),
    }
}

//! `strata child-mode`: in-namespace bootstrap, entered through re-exec.

use anyhow::Context;
use clap::Args;
use strata_common::config::StrataConfig;
use strata_common::types::ContainerId;
use strata_runtime::bootstrap::{self, BootstrapContext, LinuxBootstrap};

/// Arguments for the hidden `child-mode` command.
#[derive(Args, Debug)]
pub struct ChildArgs {
    /// Identity of the container being bootstrapped.
    pub id: String,

    /// Command and arguments to run once setup is complete.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Executes the bootstrap and returns the user command's exit code.
///
/// # Errors
///
/// Returns an error if the identity is invalid or a bootstrap step fails.
pub fn execute(config: &StrataConfig, args: ChildArgs) -> anyhow::Result<i32> {
    let id = ContainerId::parse(&args.id)?;
    let ctx = BootstrapContext::new(config, id, args.command)?;
    let exit = bootstrap::run_bootstrap(&LinuxBootstrap::default(), &ctx)
        .with_context(|| format!("container {} failed during bootstrap", ctx.id))?;
    Ok(exit.code())
}

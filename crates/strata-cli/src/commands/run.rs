//! `strata run`: create a container from an image and run a command in it.

use anyhow::Context;
use clap::Args;
use strata_common::config::StrataConfig;
use strata_runtime::engine::Engine;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Image reference, `name[:tag]` or a stored image hash.
    pub image: String,

    /// Command and arguments to run inside the container.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Executes the `run` command.
///
/// Returns the exit code of the container command.
///
/// # Errors
///
/// Returns an error if any stage of container creation fails.
pub fn execute(config: StrataConfig, args: RunArgs) -> anyhow::Result<i32> {
    let engine = Engine::new(config);
    let run = engine
        .run(&args.image, &args.command)
        .with_context(|| format!("failed to run container from {}", args.image))?;
    tracing::debug!(id = %run.id, exit = %run.exit, "container exited");
    Ok(run.exit.code())
}

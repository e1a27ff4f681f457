//! Hidden per-stage network commands.
//!
//! Each runs a single provisioning stage for an existing container, which
//! is handy when a run aborted half-way through networking.

use anyhow::Context;
use clap::Args;
use strata_common::config::StrataConfig;
use strata_common::types::ContainerId;
use strata_runtime::network;

/// Arguments shared by the network stage commands.
#[derive(Args, Debug)]
pub struct StageArgs {
    /// Identity of the container to provision.
    pub id: String,
}

/// Runs the stage called `stage` for the given container.
///
/// # Errors
///
/// Returns an error if the identity is invalid or the stage fails.
pub fn execute(config: &StrataConfig, stage: &str, args: &StageArgs) -> anyhow::Result<i32> {
    let id = ContainerId::parse(&args.id)?;
    let stage = network::stage_by_name(config, stage)
        .with_context(|| format!("unknown network stage {stage}"))?;
    network::provision(std::slice::from_ref(&stage), &id)
        .with_context(|| format!("network setup for container {id} failed"))?;
    Ok(0)
}

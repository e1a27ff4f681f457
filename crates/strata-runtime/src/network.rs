//! Container network provisioning.
//!
//! Provisioning is a fixed sequence of [`NetworkStage`]s keyed by the
//! container identity. All of them run to completion before the container
//! process is spawned:
//!
//! | stage         | effect                                                     |
//! |---------------|------------------------------------------------------------|
//! | `host-veth`   | veth pair on the host, host end on the bridge and up       |
//! | `setup-netns` | named network namespace pinned at `<netns-root>/<id>`      |
//! | `fence-veth`  | container end of the pair moved into that namespace        |
//! | `setup-veth`  | container end addressed, brought up, default route added   |
//!
//! The first failing stage stops the sequence.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use strata_common::config::StrataConfig;
use strata_common::constants::{BRIDGE_GATEWAY, BRIDGE_NAME, BRIDGE_PREFIX_LEN};
use strata_common::error::{Result, StrataError, display_chain};
use strata_common::types::ContainerId;
use strata_core::namespace::network::NetNs;
use strata_core::netlink;

/// One fallible step of network provisioning.
pub trait NetworkStage {
    /// Stage name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Runs the stage for container `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage could not complete.
    fn run(&self, id: &ContainerId) -> Result<()>;
}

/// Host-side interface name: `veth0_<id[..6]>`.
#[must_use]
pub fn host_veth_name(id: &ContainerId) -> String {
    format!("veth0_{}", id.short())
}

/// Container-side interface name: `veth1_<id[..6]>`.
#[must_use]
pub fn container_veth_name(id: &ContainerId) -> String {
    format!("veth1_{}", id.short())
}

/// Path where the network namespace of `id` is pinned.
#[must_use]
pub fn netns_path(config: &StrataConfig, id: &ContainerId) -> PathBuf {
    config.netns_dir().join(id.as_str())
}

/// Gateway address on the bridge.
#[must_use]
pub const fn gateway() -> Ipv4Addr {
    let [a, b, c, d] = BRIDGE_GATEWAY;
    Ipv4Addr::new(a, b, c, d)
}

/// Address assigned to the container inside the bridge subnet.
///
/// Derived from the first two bytes of the identity, so the same container
/// always gets the same address. The host part never collides with the
/// network, gateway, or broadcast addresses.
#[must_use]
pub fn container_address(id: &ContainerId) -> Ipv4Addr {
    let byte = |i: usize| u8::from_str_radix(&id.as_str()[i * 2..i * 2 + 2], 16).unwrap_or(0);
    let [net_a, net_b, _, _] = BRIDGE_GATEWAY;
    let (hi, lo) = (byte(0), byte(1));
    Ipv4Addr::new(net_a, net_b, hi, 2 + lo % 253)
}

/// Creates the veth pair and plugs the host end into the bridge.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostVeth;

impl NetworkStage for HostVeth {
    fn name(&self) -> &'static str {
        "host-veth"
    }

    fn run(&self, id: &ContainerId) -> Result<()> {
        let host = host_veth_name(id);
        netlink::create_veth_pair(&host, &container_veth_name(id))?;
        if netlink::attach_to_bridge(&host, BRIDGE_NAME)? {
            tracing::debug!(interface = %host, bridge = BRIDGE_NAME, "attached to bridge");
        }
        netlink::set_link_up(&host)
    }
}

/// Creates, or reuses, the container's named network namespace.
#[derive(Debug, Clone)]
pub struct SetupNetns {
    netns_dir: PathBuf,
}

impl SetupNetns {
    /// Stage pinning namespaces under `netns_dir`.
    #[must_use]
    pub fn new(netns_dir: impl Into<PathBuf>) -> Self {
        Self {
            netns_dir: netns_dir.into(),
        }
    }
}

impl NetworkStage for SetupNetns {
    fn name(&self) -> &'static str {
        "setup-netns"
    }

    fn run(&self, id: &ContainerId) -> Result<()> {
        let _ns = NetNs::create_named(&self.netns_dir.join(id.as_str()))?;
        Ok(())
    }
}

/// Moves the container end of the veth pair into the container namespace.
#[derive(Debug, Clone)]
pub struct FenceVeth {
    netns_dir: PathBuf,
}

impl FenceVeth {
    /// Stage resolving namespaces under `netns_dir`.
    #[must_use]
    pub fn new(netns_dir: impl Into<PathBuf>) -> Self {
        Self {
            netns_dir: netns_dir.into(),
        }
    }
}

impl NetworkStage for FenceVeth {
    fn name(&self) -> &'static str {
        "fence-veth"
    }

    fn run(&self, id: &ContainerId) -> Result<()> {
        let ns = NetNs::open(&self.netns_dir.join(id.as_str()))?;
        netlink::move_to_netns(&container_veth_name(id), &ns)
    }
}

/// Configures the container end of the veth pair from inside the
/// container namespace.
#[derive(Debug, Clone)]
pub struct SetupVeth {
    netns_dir: PathBuf,
}

impl SetupVeth {
    /// Stage resolving namespaces under `netns_dir`.
    #[must_use]
    pub fn new(netns_dir: impl Into<PathBuf>) -> Self {
        Self {
            netns_dir: netns_dir.into(),
        }
    }
}

impl NetworkStage for SetupVeth {
    fn name(&self) -> &'static str {
        "setup-veth"
    }

    fn run(&self, id: &ContainerId) -> Result<()> {
        let ns = NetNs::open(&self.netns_dir.join(id.as_str()))?;
        let link = container_veth_name(id);
        let addr = container_address(id);
        ns.run_in(|| {
            netlink::add_address(&link, addr, BRIDGE_PREFIX_LEN)?;
            netlink::set_link_up(&link)?;
            netlink::add_default_route(gateway())
        })?;
        tracing::info!(id = %id, interface = %link, %addr, "container interface configured");
        Ok(())
    }
}

/// The production stage sequence for `config`.
#[must_use]
pub fn default_stages(config: &StrataConfig) -> Vec<Box<dyn NetworkStage>> {
    let netns_dir = config.netns_dir();
    vec![
        Box::new(HostVeth),
        Box::new(SetupNetns::new(&netns_dir)),
        Box::new(FenceVeth::new(&netns_dir)),
        Box::new(SetupVeth::new(netns_dir)),
    ]
}

/// Looks up one of the namespace stages by its command name.
///
/// Used by the hidden per-stage subcommands.
#[must_use]
pub fn stage_by_name(config: &StrataConfig, name: &str) -> Option<Box<dyn NetworkStage>> {
    default_stages(config)
        .into_iter()
        .find(|stage| stage.name() == name)
}

/// Runs `stages` in order for container `id`.
///
/// # Errors
///
/// Returns [`StrataError::Network`] naming the first stage that failed.
/// Stages after it are not run.
pub fn provision(stages: &[Box<dyn NetworkStage>], id: &ContainerId) -> Result<()> {
    for stage in stages {
        tracing::info!(id = %id, stage = stage.name(), "network stage");
        stage.run(id).map_err(|e| match e {
            StrataError::Network { message, .. } => StrataError::Network {
                stage: stage.name(),
                message,
            },
            other => StrataError::Network {
                stage: stage.name(),
                message: display_chain(&other),
            },
        })?;
    }
    Ok(())
}

/// Joins the pinned network namespace of `id` for the rest of the calling
/// thread's life.
///
/// # Errors
///
/// Returns an error if the namespace handle cannot be opened or entered.
pub fn join_network(netns: &Path) -> Result<()> {
    NetNs::open(netns)?.enter()
}

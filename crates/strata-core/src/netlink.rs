//! Link configuration over rtnetlink.
//!
//! Each function opens its own netlink socket on a current-thread `tokio`
//! runtime and drives the request to completion before returning. The
//! socket is bound to the network namespace of the calling thread at the
//! time of the call, so these functions compose with
//! [`NetNs::run_in`](crate::namespace::network::NetNs::run_in).

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr};
use std::os::fd::{AsFd, AsRawFd};

use futures::stream::TryStreamExt;
use rtnetlink::Handle;
use strata_common::error::{Result, StrataError};

use crate::namespace::network::NetNs;

/// Name of the loopback interface.
pub const LOOPBACK: &str = "lo";

fn netlink_error(message: impl Into<String>) -> StrataError {
    StrataError::Network {
        stage: "netlink",
        message: message.into(),
    }
}

/// Runs `op` against a fresh netlink connection and waits for it.
fn with_handle<T, F, Fut>(op: F) -> Result<T>
where
    F: FnOnce(Handle) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
        .map_err(|e| netlink_error(format!("failed to start netlink runtime: {e}")))?;

    runtime.block_on(async move {
        let (connection, handle, _) = rtnetlink::new_connection()
            .map_err(|e| netlink_error(format!("failed to open netlink socket: {e}")))?;
        let driver = tokio::spawn(connection);
        let result = op(handle).await;
        driver.abort();
        result
    })
}

async fn link_index(handle: &Handle, name: &str) -> Result<u32> {
    let mut links = handle.link().get().match_name(name.to_string()).execute();
    links
        .try_next()
        .await
        .map_err(|e| netlink_error(format!("failed to look up {name}: {e}")))?
        .map(|link| link.header.index)
        .ok_or_else(|| netlink_error(format!("interface {name} not found")))
}

/// Treats "File exists" replies as success, for idempotent adds.
fn ignore_exists(
    result: std::result::Result<(), rtnetlink::Error>,
) -> std::result::Result<(), rtnetlink::Error> {
    match result {
        Err(e) if e.to_string().contains("File exists") => {
            tracing::debug!("netlink object already present");
            Ok(())
        }
        other => other,
    }
}

/// Brings the named interface up.
///
/// # Errors
///
/// Returns an error if the interface does not exist or cannot be set up.
pub fn set_link_up(name: &str) -> Result<()> {
    with_handle(|handle| async move {
        let index = link_index(&handle, name).await?;
        handle
            .link()
            .set(index)
            .up()
            .execute()
            .await
            .map_err(|e| netlink_error(format!("failed to bring up {name}: {e}")))?;
        tracing::debug!(interface = name, "link up");
        Ok(())
    })
}

/// Creates a veth pair `name` <-> `peer` in the calling namespace.
///
/// # Errors
///
/// Returns an error if the pair cannot be created.
pub fn create_veth_pair(name: &str, peer: &str) -> Result<()> {
    with_handle(|handle| async move {
        handle
            .link()
            .add()
            .veth(name.to_string(), peer.to_string())
            .execute()
            .await
            .map_err(|e| netlink_error(format!("failed to create veth {name}/{peer}: {e}")))?;
        tracing::debug!(name, peer, "veth pair created");
        Ok(())
    })
}

/// Attaches `link` to `bridge` if the bridge exists.
///
/// Returns whether the link was attached.
///
/// # Errors
///
/// Returns an error if `link` does not exist or cannot be enslaved.
pub fn attach_to_bridge(link: &str, bridge: &str) -> Result<bool> {
    with_handle(|handle| async move {
        let Ok(bridge_index) = link_index(&handle, bridge).await else {
            tracing::warn!(bridge, "bridge not present, leaving {link} unattached");
            return Ok(false);
        };
        let index = link_index(&handle, link).await?;
        handle
            .link()
            .set(index)
            .controller(bridge_index)
            .execute()
            .await
            .map_err(|e| netlink_error(format!("failed to attach {link} to {bridge}: {e}")))?;
        Ok(true)
    })
}

/// Moves the named interface into the network namespace `ns`.
///
/// # Errors
///
/// Returns an error if the interface does not exist or cannot be moved.
pub fn move_to_netns(name: &str, ns: &NetNs) -> Result<()> {
    let fd = ns.as_fd().as_raw_fd();
    with_handle(|handle| async move {
        let index = link_index(&handle, name).await?;
        handle
            .link()
            .set(index)
            .setns_by_fd(fd)
            .execute()
            .await
            .map_err(|e| netlink_error(format!("failed to move {name} into namespace: {e}")))?;
        tracing::debug!(interface = name, netns = %ns.path().display(), "link moved");
        Ok(())
    })
}

/// Assigns `addr/prefix_len` to the named interface.
///
/// # Errors
///
/// Returns an error if the interface does not exist or the address is
/// rejected. An address that is already assigned is not an error.
pub fn add_address(name: &str, addr: Ipv4Addr, prefix_len: u8) -> Result<()> {
    with_handle(|handle| async move {
        let index = link_index(&handle, name).await?;
        let added = handle
            .address()
            .add(index, IpAddr::V4(addr), prefix_len)
            .execute()
            .await;
        ignore_exists(added)
            .map_err(|e| netlink_error(format!("failed to assign {addr}/{prefix_len} to {name}: {e}")))?;
        tracing::debug!(interface = name, %addr, prefix_len, "address assigned");
        Ok(())
    })
}

/// Adds an IPv4 default route through `gateway`.
///
/// # Errors
///
/// Returns an error if the route is rejected. An existing default route
/// is not an error.
pub fn add_default_route(gateway: Ipv4Addr) -> Result<()> {
    with_handle(|handle| async move {
        let added = handle.route().add().v4().gateway(gateway).execute().await;
        ignore_exists(added)
            .map_err(|e| netlink_error(format!("failed to add default route via {gateway}: {e}")))?;
        tracing::debug!(%gateway, "default route added");
        Ok(())
    })
}

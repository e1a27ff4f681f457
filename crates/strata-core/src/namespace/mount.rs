//! Mount namespace isolation.
//!
//! A fresh mount namespace starts as a copy of its parent, including
//! shared propagation. Remounting `/` as recursively private stops mounts
//! made inside the container from leaking back to the host.

use nix::mount::MsFlags;
use strata_common::error::{Result, StrataError};

/// Marks every mount in the calling namespace as private.
///
/// # Errors
///
/// Returns an error if the `mount(2)` propagation change fails.
pub fn make_mounts_private() -> Result<()> {
    nix::mount::mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_REC | MsFlags::MS_PRIVATE,
        None::<&str>,
    )
    .map_err(|source| StrataError::Namespace {
        operation: "mount propagation",
        source,
    })
}

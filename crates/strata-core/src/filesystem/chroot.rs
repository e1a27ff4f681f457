//! Root-jail via `chroot(2)`.
//!
//! The container is confined to its overlay mount with `chroot` followed
//! by a `chdir("/")`, so no relative path can reach back into the host.

use std::path::Path;

use strata_common::error::{Result, StrataError};

/// Changes the root of the calling process to `new_root`.
///
/// # Errors
///
/// Returns [`StrataError::Namespace`] if `chroot(2)` fails.
pub fn change_root(new_root: &Path) -> Result<()> {
    nix::unistd::chroot(new_root).map_err(|source| StrataError::Namespace {
        operation: "chroot",
        source,
    })?;
    tracing::debug!(root = %new_root.display(), "changed root");
    Ok(())
}

/// Changes the working directory to `/` of the current root.
///
/// # Errors
///
/// Returns [`StrataError::Namespace`] if `chdir(2)` fails.
pub fn enter_new_root() -> Result<()> {
    nix::unistd::chdir("/").map_err(|source| StrataError::Namespace {
        operation: "chdir",
        source,
    })
}

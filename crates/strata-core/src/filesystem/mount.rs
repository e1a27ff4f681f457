//! Mount utilities for container filesystem setup.
//!
//! All mounts issued by the runtime go through [`MountOps`], so the
//! pipeline can be driven against a recording implementation in tests and
//! against [`SyscallMounter`] in production.

use std::path::{Path, PathBuf};

use nix::mount::MsFlags;
use strata_common::error::{Result, StrataError};

/// A single `mount(2)` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRequest {
    /// Mount source (device name or pseudo-source such as `proc`).
    pub source: String,
    /// Mount target directory.
    pub target: PathBuf,
    /// Filesystem type.
    pub fstype: String,
    /// Mount flags.
    pub flags: MsFlags,
    /// Filesystem-specific option string.
    pub data: Option<String>,
}

impl MountRequest {
    /// A `proc` filesystem at `target`.
    #[must_use]
    pub fn proc(target: impl Into<PathBuf>) -> Self {
        Self {
            source: "proc".into(),
            target: target.into(),
            fstype: "proc".into(),
            flags: MsFlags::empty(),
            data: None,
        }
    }

    /// A `tmpfs` at `target`.
    #[must_use]
    pub fn tmpfs(target: impl Into<PathBuf>) -> Self {
        Self {
            source: "tmpfs".into(),
            target: target.into(),
            fstype: "tmpfs".into(),
            flags: MsFlags::empty(),
            data: None,
        }
    }
}

/// Issues and reverts mounts.
pub trait MountOps {
    /// Performs the mount described by `request`.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Mount`] if the mount fails.
    fn mount(&self, request: &MountRequest) -> Result<()>;

    /// Unmounts whatever is mounted at `target`.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Unmount`] if the unmount fails.
    fn unmount(&self, target: &Path) -> Result<()>;
}

/// [`MountOps`] backed by the real `mount(2)` and `umount(2)` syscalls.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyscallMounter;

impl MountOps for SyscallMounter {
    fn mount(&self, request: &MountRequest) -> Result<()> {
        tracing::debug!(
            source = %request.source,
            target = %request.target.display(),
            fstype = %request.fstype,
            "mounting"
        );
        nix::mount::mount(
            Some(request.source.as_str()),
            request.target.as_path(),
            Some(request.fstype.as_str()),
            request.flags,
            request.data.as_deref(),
        )
        .map_err(|source| StrataError::Mount {
            fstype: request.fstype.clone(),
            target: request.target.clone(),
            source,
        })
    }

    fn unmount(&self, target: &Path) -> Result<()> {
        tracing::debug!(target = %target.display(), "unmounting");
        nix::mount::umount(target).map_err(|source| StrataError::Unmount {
            target: target.to_path_buf(),
            source,
        })
    }
}

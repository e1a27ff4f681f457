//! `OverlayFS` management for layered container filesystems.
//!
//! Stacks read-only image layers under a single writable upper layer,
//! giving each container a copy-on-write view of its image.

use std::path::{Path, PathBuf};

use nix::mount::MsFlags;
use strata_common::error::{Result, StrataError};

use super::mount::{MountOps, MountRequest};

/// Configuration for an `OverlayFS` mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
    /// Read-only lower layers, highest precedence first.
    ///
    /// This is the order the kernel expects in `lowerdir=`: the first entry
    /// shadows every entry after it.
    pub lower_dirs: Vec<PathBuf>,
    /// Writable upper layer directory.
    pub upper_dir: PathBuf,
    /// Work directory required by `OverlayFS`.
    pub work_dir: PathBuf,
    /// Final merged mount point.
    pub merged_dir: PathBuf,
}

impl OverlayConfig {
    /// Renders the `lowerdir=...,upperdir=...,workdir=...` option string.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Config`] if there are no lower layers or a
    /// layer path contains a character that would corrupt the option string.
    pub fn options(&self) -> Result<String> {
        if self.lower_dirs.is_empty() {
            return Err(StrataError::config("overlay requires at least one lower layer"));
        }
        for path in self
            .lower_dirs
            .iter()
            .chain([&self.upper_dir, &self.work_dir])
        {
            let s = path.display().to_string();
            if s.contains(':') || s.contains(',') {
                return Err(StrataError::config(format!(
                    "overlay path {s} contains a reserved character"
                )));
            }
        }

        let lowers = self
            .lower_dirs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(":");
        Ok(format!(
            "lowerdir={},upperdir={},workdir={}",
            lowers,
            self.upper_dir.display(),
            self.work_dir.display()
        ))
    }

    /// Builds the `mount(2)` request for this overlay.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`OverlayConfig::options`].
    pub fn mount_request(&self) -> Result<MountRequest> {
        Ok(MountRequest {
            source: "none".into(),
            target: self.merged_dir.clone(),
            fstype: "overlay".into(),
            flags: MsFlags::empty(),
            data: Some(self.options()?),
        })
    }
}

/// Mounts an `OverlayFS` with the given configuration.
///
/// The upper, work, and merged directories must already exist.
///
/// # Errors
///
/// Returns an error if the options are invalid or the mount fails.
pub fn mount_overlay(mounter: &dyn MountOps, config: &OverlayConfig) -> Result<()> {
    let request = config.mount_request()?;
    mounter.mount(&request)?;
    tracing::info!(
        merged = %config.merged_dir.display(),
        layers = config.lower_dirs.len(),
        "overlayfs mounted"
    );
    Ok(())
}

/// Unmounts an `OverlayFS` at the given path.
///
/// # Errors
///
/// Returns an error if the unmount syscall fails.
pub fn unmount_overlay(mounter: &dyn MountOps, merged_dir: &Path) -> Result<()> {
    mounter.unmount(merged_dir)?;
    tracing::info!(path = %merged_dir.display(), "overlayfs unmounted");
    Ok(())
}

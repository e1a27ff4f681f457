//! Per-container directory layout.
//!
//! ```text
//! <containers-root>/<id>/
//!   fs/
//!     mnt/        overlay mount target, the container's `/`
//!     upperdir/   writable overlay layer
//!     workdir/    overlay scratch space
//! ```

use std::path::{Path, PathBuf};

use strata_common::error::{Result, StrataError};
use strata_common::types::ContainerId;

/// Filesystem paths owned by one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerLayout {
    id: ContainerId,
    root: PathBuf,
}

impl ContainerLayout {
    /// Computes the layout of container `id` under `containers_dir`.
    #[must_use]
    pub fn new(containers_dir: &Path, id: &ContainerId) -> Self {
        Self {
            id: id.clone(),
            root: containers_dir.join(id.as_str()),
        }
    }

    /// Identity this layout belongs to.
    #[must_use]
    pub const fn id(&self) -> &ContainerId {
        &self.id
    }

    /// `<containers-root>/<id>`.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<containers-root>/<id>/fs`.
    #[must_use]
    pub fn fs_dir(&self) -> PathBuf {
        self.root.join("fs")
    }

    /// Overlay mount target.
    #[must_use]
    pub fn mount_target(&self) -> PathBuf {
        self.fs_dir().join("mnt")
    }

    /// Writable overlay layer.
    #[must_use]
    pub fn upper_dir(&self) -> PathBuf {
        self.fs_dir().join("upperdir")
    }

    /// Overlay work directory.
    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.fs_dir().join("workdir")
    }

    /// Ensures every directory of the layout exists.
    ///
    /// Existing directories and their contents are left untouched, so
    /// calling this repeatedly is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Io`] naming the first directory that could
    /// not be created. Directories created before the failure are kept.
    pub fn create_directories(&self) -> Result<()> {
        for dir in [self.mount_target(), self.upper_dir(), self.work_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| StrataError::io(&dir, e))?;
        }
        tracing::debug!(id = %self.id, root = %self.root.display(), "container directories ready");
        Ok(())
    }
}

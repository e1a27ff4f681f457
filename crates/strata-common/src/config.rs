//! Global configuration model for the strata runtime.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DATA_DIR, DEFAULT_RUN_DIR};

/// Root configuration for the strata runtime.
///
/// Every container-scoped path is derived from these two directories, so a
/// re-executed child must be handed the same values as its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrataConfig {
    /// Base directory for images and container filesystems.
    pub data_dir: PathBuf,
    /// Base directory for runtime artifacts (network namespace pins).
    pub run_dir: PathBuf,
}

impl StrataConfig {
    /// Creates a configuration rooted at the given directories.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>, run_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            run_dir: run_dir.into(),
        }
    }

    /// Directory holding one subdirectory per container.
    #[must_use]
    pub fn containers_dir(&self) -> PathBuf {
        self.data_dir.join("containers")
    }

    /// Directory holding the image index and one subdirectory per image.
    #[must_use]
    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    /// Directory where named network namespaces are pinned.
    #[must_use]
    pub fn netns_dir(&self) -> PathBuf {
        self.run_dir.join("net-ns")
    }
}

impl Default for StrataConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR, DEFAULT_RUN_DIR)
    }
}

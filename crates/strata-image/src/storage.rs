//! Local storage layout for images and layers.
//!
//! ```text
//! <images-root>/
//!   images.json
//!   <image-hash>/
//!     manifest.json
//!     <layer[..12]>/fs/
//! ```

use std::path::PathBuf;

use strata_common::constants::MANIFEST_FILE;
use strata_common::error::Result;
use strata_common::types::ImageId;

use crate::manifest::{Manifest, layer_dir_name};

/// Read-only view of the local image store.
#[derive(Debug, Clone)]
pub struct ImageStore {
    /// Root directory for all stored images.
    root: PathBuf,
}

impl ImageStore {
    /// Opens the image store rooted at `root`.
    #[must_use]
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        tracing::debug!(path = %root.display(), "opening image store");
        Self { root }
    }

    /// Returns the base directory of an image.
    #[must_use]
    pub fn image_path(&self, image: &ImageId) -> PathBuf {
        self.root.join(image.as_str())
    }

    /// Returns the manifest path of an image.
    #[must_use]
    pub fn manifest_path(&self, image: &ImageId) -> PathBuf {
        self.image_path(image).join(MANIFEST_FILE)
    }

    /// Loads the manifest of an image.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be read or parsed.
    pub fn manifest(&self, image: &ImageId) -> Result<Manifest> {
        Manifest::load(&self.manifest_path(image))
    }

    /// Returns the extracted filesystem directory of one layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer identifier is malformed.
    pub fn layer_path(&self, image: &ImageId, layer: &str) -> Result<PathBuf> {
        Ok(self
            .image_path(image)
            .join(layer_dir_name(layer)?)
            .join("fs"))
    }

    /// Returns the layer directories of an image in manifest order,
    /// bottom layer first.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest has an unsupported shape or a
    /// layer identifier is malformed.
    pub fn layer_paths(&self, image: &ImageId, manifest: &Manifest) -> Result<Vec<PathBuf>> {
        manifest
            .layers()?
            .iter()
            .map(|layer| self.layer_path(image, layer))
            .collect()
    }
}

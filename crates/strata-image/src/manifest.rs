//! Image manifest parsing and validation.
//!
//! A manifest is the JSON array written by `docker save`: one entry per
//! image, each listing its layers bottom to top. The runtime supports
//! manifests describing exactly one image.

use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_common::constants::LAYER_PREFIX_LEN;
use strata_common::error::{Result, StrataError};

/// One image entry of a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManifestEntry {
    /// Path of the image config blob.
    #[serde(default)]
    pub config: String,
    /// Repository tags the image was saved under.
    #[serde(default)]
    pub repo_tags: Vec<String>,
    /// Content-addressed layer identifiers, bottom layer first.
    #[serde(default)]
    pub layers: Vec<String>,
}

/// A parsed image manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    /// Image entries in file order.
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Reads and parses the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading manifest");
        let content = std::fs::read_to_string(path).map_err(|e| StrataError::io(path, e))?;
        Self::from_json(&content)
    }

    /// Parses a manifest from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a manifest array.
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Returns the layers of the single image this manifest describes.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Config`] if the manifest has no entries, its
    /// first entry has no layers, or it has more than one entry.
    pub fn layers(&self) -> Result<&[String]> {
        let Some(first) = self.entries.first().filter(|e| !e.layers.is_empty()) else {
            return Err(StrataError::config("could not find any layers in manifest"));
        };
        if self.entries.len() > 1 {
            return Err(StrataError::config(format!(
                "manifest has {} entries, only a single image is supported",
                self.entries.len()
            )));
        }
        Ok(&first.layers)
    }
}

/// Returns the directory name of a layer: the first 12 characters of its
/// identifier, with any `sha256:` prefix removed.
///
/// # Errors
///
/// Returns [`StrataError::Config`] if the identifier is too short.
pub fn layer_dir_name(layer: &str) -> Result<&str> {
    let digest = layer.strip_prefix("sha256:").unwrap_or(layer);
    digest
        .get(..LAYER_PREFIX_LEN)
        .filter(|prefix| prefix.chars().all(|c| c.is_ascii_alphanumeric()))
        .ok_or_else(|| StrataError::config(format!("invalid layer identifier {layer:?}")))
}

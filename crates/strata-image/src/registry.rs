//! Local image catalog.
//!
//! `images.json` maps image names to tags to image hashes:
//!
//! ```json
//! { "alpine": { "latest": "d7d3d98c851f", "test": "0f1e2d3c4b5a" } }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use strata_common::constants::{DEFAULT_TAG, IMAGE_INDEX_FILE, MANIFEST_FILE};
use strata_common::error::{Result, StrataError};
use strata_common::types::ImageId;

/// Name → tag → image hash.
pub type IndexEntries = BTreeMap<String, BTreeMap<String, String>>;

/// Splits an image reference into name and tag.
///
/// The tag defaults to `latest`. A colon that belongs to a registry host
/// (`localhost:5000/alpine`) is not treated as a tag separator.
#[must_use]
pub fn parse_reference(reference: &str) -> (&str, &str) {
    match reference.rsplit_once(':') {
        Some((name, tag)) if !tag.contains('/') && !name.is_empty() => (name, tag),
        _ => (reference, DEFAULT_TAG),
    }
}

/// Image catalog backed by a JSON file.
#[derive(Debug)]
pub struct ImageCatalog {
    images_dir: PathBuf,
    catalog_path: PathBuf,
}

impl ImageCatalog {
    /// Opens the catalog of the image store rooted at `images_dir`.
    #[must_use]
    pub fn open(images_dir: &Path) -> Self {
        Self {
            images_dir: images_dir.to_path_buf(),
            catalog_path: images_dir.join(IMAGE_INDEX_FILE),
        }
    }

    /// Reads all catalog entries. A missing catalog is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog file cannot be read or parsed.
    pub fn entries(&self) -> Result<IndexEntries> {
        if !self.catalog_path.exists() {
            return Ok(IndexEntries::new());
        }
        let content = std::fs::read_to_string(&self.catalog_path)
            .map_err(|e| StrataError::io(&self.catalog_path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Resolves an image reference to a stored image.
    ///
    /// `name[:tag]` is looked up in the catalog. A reference that is itself
    /// the hash of a stored image resolves to that image.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::NotFound`] if the reference matches nothing.
    pub fn resolve(&self, reference: &str) -> Result<ImageId> {
        let (name, tag) = parse_reference(reference);
        if let Some(hash) = self.entries()?.get(name).and_then(|tags| tags.get(tag)) {
            tracing::debug!(reference, image = %hash, "resolved image from catalog");
            return Ok(ImageId::new(hash.clone()));
        }

        let is_hash = !reference.is_empty() && reference.chars().all(|c| c.is_ascii_hexdigit());
        if is_hash && self.images_dir.join(reference).join(MANIFEST_FILE).is_file() {
            return Ok(ImageId::new(reference));
        }

        Err(StrataError::NotFound {
            kind: "image",
            id: reference.to_string(),
        })
    }

    /// Records `name:tag` as pointing at `image`.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read or written.
    pub fn register(&self, name: &str, tag: &str, image: &ImageId) -> Result<()> {
        let mut entries = self.entries()?;
        let _previous = entries
            .entry(name.to_string())
            .or_default()
            .insert(tag.to_string(), image.to_string());
        self.write_entries(&entries)
    }

    fn write_entries(&self, entries: &IndexEntries) -> Result<()> {
        std::fs::create_dir_all(&self.images_dir)
            .map_err(|e| StrataError::io(&self.images_dir, e))?;
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.catalog_path, json)
            .map_err(|e| StrataError::io(&self.catalog_path, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reference_splits_tag() {
        assert_eq!(parse_reference("alpine:test"), ("alpine", "test"));
        assert_eq!(parse_reference("alpine"), ("alpine", "latest"));
        assert_eq!(
            parse_reference("localhost:5000/alpine"),
            ("localhost:5000/alpine", "latest")
        );
        assert_eq!(
            parse_reference("localhost:5000/alpine:3.19"),
            ("localhost:5000/alpine", "3.19")
        );
    }

    #[test]
    fn catalog_empty_on_first_open() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let catalog = ImageCatalog::open(dir.path());
        assert!(catalog.entries().expect("entries failed").is_empty());
    }

    #[test]
    fn catalog_register_then_resolve() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let catalog = ImageCatalog::open(dir.path());
        catalog
            .register("alpine", "test", &ImageId::new("0f1e2d3c4b5a"))
            .expect("register failed");

        let image = catalog.resolve("alpine:test").expect("resolve failed");
        assert_eq!(image.as_str(), "0f1e2d3c4b5a");
        assert!(catalog.resolve("alpine").is_err());
    }

    #[test]
    fn resolve_accepts_stored_image_hash() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let image_dir = dir.path().join("d7d3d98c851f");
        std::fs::create_dir_all(&image_dir).expect("mkdir");
        std::fs::write(image_dir.join("manifest.json"), "[]").expect("write");

        let catalog = ImageCatalog::open(dir.path());
        assert_eq!(
            catalog.resolve("d7d3d98c851f").expect("resolve").as_str(),
            "d7d3d98c851f"
        );
    }

    #[test]
    fn resolve_unknown_image_is_not_found() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let err = ImageCatalog::open(dir.path()).resolve("busybox").unwrap_err();
        assert!(matches!(err, StrataError::NotFound { kind: "image", .. }));
    }

    #[test]
    fn corrupt_catalog_is_serialization_error() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        std::fs::write(dir.path().join("images.json"), "not json").expect("write");
        let err = ImageCatalog::open(dir.path()).entries().unwrap_err();
        assert!(matches!(err, StrataError::Serialization { .. }));
    }
}

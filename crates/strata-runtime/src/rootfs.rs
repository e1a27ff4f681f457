//! Overlay root filesystem assembly.
//!
//! Turns an image manifest into an overlay mount at the container's mount
//! target. Layers later in the manifest take precedence over earlier
//! ones: the lower-directory chain is built by prepending each layer in
//! manifest order, so the last-declared layer ends up first in
//! `lowerdir=` and shadows the others.

use std::path::PathBuf;

use strata_common::error::Result;
use strata_common::types::ImageId;
use strata_core::filesystem::mount::MountOps;
use strata_core::filesystem::overlayfs::{self, OverlayConfig};
use strata_image::storage::ImageStore;

use crate::layout::ContainerLayout;

/// Builds the overlay configuration for `image` on `layout`.
///
/// Nothing is mounted; every manifest check happens here so that an
/// unusable image never produces a mount.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded, does not describe
/// exactly one image with at least one layer, or names a malformed layer.
pub fn overlay_config(
    store: &ImageStore,
    image: &ImageId,
    layout: &ContainerLayout,
) -> Result<OverlayConfig> {
    let manifest = store.manifest(image)?;
    let lower_dirs = store
        .layer_paths(image, &manifest)?
        .into_iter()
        .fold(Vec::<PathBuf>::new(), |mut acc, layer| {
            acc.insert(0, layer);
            acc
        });

    Ok(OverlayConfig {
        lower_dirs,
        upper_dir: layout.upper_dir(),
        work_dir: layout.work_dir(),
        merged_dir: layout.mount_target(),
    })
}

/// Mounts the overlay root filesystem of `image` for `layout`.
///
/// # Errors
///
/// Returns an error if the overlay configuration is invalid or the mount
/// fails.
pub fn mount_rootfs(
    mounter: &dyn MountOps,
    store: &ImageStore,
    image: &ImageId,
    layout: &ContainerLayout,
) -> Result<OverlayConfig> {
    let config = overlay_config(store, image, layout)?;
    tracing::info!(
        id = %layout.id(),
        image = %image,
        layers = config.lower_dirs.len(),
        "mounting container root filesystem"
    );
    overlayfs::mount_overlay(mounter, &config)?;
    Ok(config)
}

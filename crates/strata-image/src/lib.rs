//! # strata-image
//!
//! Read-only access to the local image store for the strata runtime.
//!
//! Handles:
//! - **Registry**: the `images.json` index mapping `name:tag` to image hashes.
//! - **Manifest**: parsing and shape validation of an image's manifest.
//! - **Storage**: on-disk paths of images, manifests, and layers.
//!
//! Fetching images from a remote registry is out of scope; images are
//! expected to be present in the store already.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod manifest;
pub mod registry;
pub mod storage;

//! Container creation pipeline for the strata runtime.
//!
//! Stages, in the order [`engine::Engine::run`] drives them:
//!
//! 1. [`layout`]: container identity and directory skeleton.
//! 2. [`rootfs`]: overlay mount of the image layers.
//! 3. [`network`]: host veth, network namespace, and veth provisioning.
//! 4. [`process`]: namespaced re-execution of the binary in child mode.
//! 5. [`bootstrap`]: in-namespace setup and the user command.
//! 6. Teardown of the overlay mount.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod bootstrap;
pub mod engine;
pub mod layout;
pub mod network;
pub mod process;
pub mod rootfs;

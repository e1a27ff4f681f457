//! Filesystem management for container isolation.
//!
//! Provides the mount abstraction, `OverlayFS` composition, and the
//! `chroot` root-jail used by the in-namespace bootstrap.

pub mod chroot;
pub mod mount;
pub mod overlayfs;

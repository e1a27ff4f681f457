//! # strata-core
//!
//! Low-level Linux isolation primitives for the strata runtime.
//!
//! This crate provides safe abstractions over:
//! - **Namespaces**: clone flags for PID/mount/UTS, hostname, mount
//!   propagation, and network namespace handles with scoped entry.
//! - **Filesystem**: `OverlayFS` mounts, pseudo-filesystem mounts, and
//!   `chroot`.
//! - **Netlink**: veth pairs, link state, addressing, and routes.
//!
//! Every privileged call returns a typed error; nothing here terminates
//! the process.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod filesystem;
pub mod namespace;
pub mod netlink;

//! Linux namespace management for container isolation.
//!
//! Provides the clone flags for the container's namespace set, plus
//! safe wrappers around `sethostname(2)`, mount propagation changes, and
//! `setns(2)` on network namespace handles.

pub mod mount;
pub mod network;
pub mod uts;

use nix::sched::CloneFlags;

/// Which namespaces are created together with the container process.
///
/// The network namespace is not part of this set: it is provisioned
/// before the process exists and joined from inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceConfig {
    /// Isolate PID namespace.
    pub pid: bool,
    /// Isolate mount namespace.
    pub mount: bool,
    /// Isolate UTS (hostname) namespace.
    pub uts: bool,
}

impl NamespaceConfig {
    /// Returns the `clone(2)` flags for this configuration.
    #[must_use]
    pub fn clone_flags(&self) -> CloneFlags {
        let mut flags = CloneFlags::empty();
        if self.pid {
            flags |= CloneFlags::CLONE_NEWPID;
        }
        if self.mount {
            flags |= CloneFlags::CLONE_NEWNS;
        }
        if self.uts {
            flags |= CloneFlags::CLONE_NEWUTS;
        }
        flags
    }
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            pid: true,
            mount: true,
            uts: true,
        }
    }
}

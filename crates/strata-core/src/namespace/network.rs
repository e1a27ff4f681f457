//! Network namespace isolation.
//!
//! Network namespaces are referred to by handle: an open file on an
//! `nsfs` inode, either `/proc/thread-self/ns/net` or a bind mount of it
//! that pins a named namespace to a path. Work that has to happen inside a
//! namespace runs through [`NetNs::run_in`], which enters the namespace on
//! the calling thread and restores the previous one before returning.

use std::fs::File;
use std::os::fd::{AsFd, BorrowedFd};
use std::path::{Path, PathBuf};

use nix::mount::MsFlags;
use nix::sched::CloneFlags;
use nix::sys::statfs::{FsType, statfs};
use strata_common::error::{Result, StrataError};

/// Namespace file of the calling thread.
const THREAD_NETNS: &str = "/proc/thread-self/ns/net";

/// Filesystem magic of `nsfs`, the filesystem namespace handles live on.
const NSFS_MAGIC: i64 = 0x6e73_6673;

/// Handle to a network namespace.
#[derive(Debug)]
pub struct NetNs {
    file: File,
    path: PathBuf,
}

impl NetNs {
    /// Opens the network namespace the calling thread is in.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace file cannot be opened.
    pub fn current() -> Result<Self> {
        Self::open(Path::new(THREAD_NETNS))
    }

    /// Opens a namespace handle at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| StrataError::io(path, e))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Creates a new network namespace pinned at `path`, or opens the one
    /// already pinned there.
    ///
    /// The calling thread's namespace is unchanged when this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the pin file cannot be created, `unshare(2)`
    /// fails, the bind mount fails, or the original namespace cannot be
    /// re-entered.
    pub fn create_named(path: &Path) -> Result<Self> {
        if is_pinned(path) {
            tracing::debug!(path = %path.display(), "reusing pinned network namespace");
            return Self::open(path);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StrataError::io(parent, e))?;
        }
        let _pin = File::create(path).map_err(|e| StrataError::io(path, e))?;

        let original = Self::current()?;
        nix::sched::unshare(CloneFlags::CLONE_NEWNET).map_err(|source| {
            StrataError::Namespace {
                operation: "unshare network namespace",
                source,
            }
        })?;
        let pinned = nix::mount::mount(
            Some(THREAD_NETNS),
            path,
            None::<&str>,
            MsFlags::MS_BIND,
            None::<&str>,
        )
        .map_err(|source| StrataError::Mount {
            fstype: "bind".into(),
            target: path.to_path_buf(),
            source,
        });
        original.enter()?;
        pinned?;

        tracing::info!(path = %path.display(), "network namespace created");
        Self::open(path)
    }

    /// Moves the calling thread into this namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if `setns(2)` fails.
    pub fn enter(&self) -> Result<()> {
        nix::sched::setns(self.file.as_fd(), CloneFlags::CLONE_NEWNET).map_err(|source| {
            StrataError::Namespace {
                operation: "setns network namespace",
                source,
            }
        })?;
        tracing::debug!(path = %self.path.display(), "entered network namespace");
        Ok(())
    }

    /// Runs `work` inside this namespace and returns to the caller's
    /// namespace afterwards, whether or not `work` succeeded.
    ///
    /// # Errors
    ///
    /// Returns the error from `work`, or an error if entering or leaving
    /// the namespace fails. A failure to leave takes precedence because
    /// the thread would otherwise keep running in the wrong namespace.
    pub fn run_in<T>(&self, work: impl FnOnce() -> Result<T>) -> Result<T> {
        let original = Self::current()?;
        self.enter()?;
        let result = work();
        original.enter()?;
        result
    }

    /// Path this handle was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AsFd for NetNs {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

/// Reports whether `path` is a bind-mounted namespace handle.
///
/// An empty file left behind by an interrupted run is not a namespace and
/// gets re-pinned.
fn is_pinned(path: &Path) -> bool {
    statfs(path).is_ok_and(|fs| fs.filesystem_type() == FsType(NSFS_MAGIC as _))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_namespace_can_be_opened() {
        let ns = NetNs::current().expect("open current netns");
        assert_eq!(ns.path(), Path::new(THREAD_NETNS));
    }

    #[test]
    fn current_namespace_is_pinned() {
        assert!(is_pinned(Path::new(THREAD_NETNS)));
    }

    #[test]
    fn plain_file_is_not_pinned() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("ns");
        std::fs::write(&file, b"").expect("write");
        assert!(!is_pinned(&file));
        assert!(!is_pinned(&dir.path().join("missing")));
    }

    #[test]
    fn open_missing_handle_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = NetNs::open(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, StrataError::Io { .. }));
    }

    #[test]
    fn run_in_current_namespace_returns_work_result() {
        let ns = NetNs::current().expect("open current netns");
        match ns.run_in(|| Ok(7)) {
            Ok(value) => assert_eq!(value, 7),
            // Entering a namespace needs CAP_SYS_ADMIN, even the current one.
            Err(StrataError::Namespace { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}

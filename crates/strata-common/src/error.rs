//! Unified error type for the strata workspace.
//!
//! Variants follow the failure taxonomy of the container pipeline:
//! configuration, resource (I/O and mounts), namespace/process, and
//! network provisioning. The exit status of the user's command is never
//! an error; it is reported as data by the runtime.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StrataError {
    /// An I/O operation failed.
    #[error("I/O error at {path}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value or input is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A `mount(2)` call failed.
    #[error("mount of {fstype} at {target} failed")]
    Mount {
        /// Filesystem type that was being mounted.
        fstype: String,
        /// Mount target.
        target: PathBuf,
        /// Underlying errno.
        source: nix::Error,
    },

    /// A `umount(2)` call failed.
    #[error("unmount of {target} failed")]
    Unmount {
        /// Mount target.
        target: PathBuf,
        /// Underlying errno.
        source: nix::Error,
    },

    /// A namespace or process operation failed (clone, setns, chroot, ...).
    #[error("{operation} failed")]
    Namespace {
        /// Short name of the failed operation.
        operation: &'static str,
        /// Underlying errno.
        source: nix::Error,
    },

    /// A network provisioning stage failed.
    #[error("network stage {stage} failed: {message}")]
    Network {
        /// Name of the failing stage.
        stage: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// The container process failed before or instead of running the
    /// user command. Reported through a reserved exit status of the child.
    #[error("container {id} failed during {phase}")]
    ContainerSetup {
        /// Container identity.
        id: String,
        /// Phase that failed, `bootstrap` or `exec`.
        phase: &'static str,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl StrataError {
    /// Builds an [`StrataError::Io`] for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds a [`StrataError::Config`] from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Renders `err` and every error in its source chain, separated by `: `.
///
/// For places that have to flatten an error into a message.
#[must_use]
pub fn display_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StrataError>;

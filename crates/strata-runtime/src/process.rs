//! Namespaced re-execution of the runtime binary.
//!
//! The container process is the runtime itself, cloned into fresh PID,
//! mount, and UTS namespaces and re-executed in child mode. Everything
//! that has to happen inside those namespaces lives in
//! [`bootstrap`](crate::bootstrap).

#![allow(unsafe_code)]

use std::convert::Infallible;
use std::ffi::CString;

use nix::errno::Errno;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::Pid;
use strata_common::config::StrataConfig;
use strata_common::constants::{
    APP_NAME, CHILD_EXEC_FAILED, CHILD_MODE, CHILD_SETUP_FAILED, SELF_EXE,
};
use strata_common::error::{Result, StrataError, display_chain};
use strata_common::types::{ContainerExit, ContainerId};
use strata_core::namespace::NamespaceConfig;
use strata_core::namespace::mount::make_mounts_private;

/// Stack size handed to `clone(2)`. The child only runs until `execv`.
const CHILD_STACK_SIZE: usize = 1024 * 1024;


/// Starts the container process and waits for it.
pub trait ContainerSpawner {
    /// Runs `command` as container `id` and blocks until it ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be created or waited for.
    /// The command's own exit status is not an error; reserved statuses
    /// are left for [`check_child_exit`] to interpret.
    fn spawn_and_wait(&self, id: &ContainerId, command: &[String]) -> Result<ContainerExit>;
}

/// Argument vector of the re-executed child.
///
/// The data and run directories are forwarded so the child derives the
/// same paths as its parent.
#[must_use]
pub fn child_argv(config: &StrataConfig, id: &ContainerId, command: &[String]) -> Vec<String> {
    let mut argv = vec![
        APP_NAME.to_string(),
        "--data-dir".to_string(),
        config.data_dir.display().to_string(),
        "--run-dir".to_string(),
        config.run_dir.display().to_string(),
        CHILD_MODE.to_string(),
        id.to_string(),
        "--".to_string(),
    ];
    argv.extend(command.iter().cloned());
    argv
}

/// Separates runtime failures inside the container from the user
/// command's exit status.
///
/// # Errors
///
/// Returns [`StrataError::ContainerSetup`] if the child exited with one
/// of the reserved statuses: the bootstrap failed, or the runtime could
/// not be re-executed.
pub fn check_child_exit(id: &ContainerId, exit: ContainerExit) -> Result<ContainerExit> {
    let phase = match exit {
        ContainerExit::Exited(CHILD_SETUP_FAILED) => "bootstrap",
        ContainerExit::Exited(CHILD_EXEC_FAILED) => "exec",
        _ => return Ok(exit),
    };
    Err(StrataError::ContainerSetup {
        id: id.to_string(),
        phase,
    })
}

/// [`ContainerSpawner`] built on `clone(2)` and `execv(2)`.
#[derive(Debug, Clone)]
pub struct CloneSpawner {
    config: StrataConfig,
    namespaces: NamespaceConfig,
}

impl CloneSpawner {
    /// Spawner creating the default namespace set.
    #[must_use]
    pub fn new(config: StrataConfig) -> Self {
        Self {
            config,
            namespaces: NamespaceConfig::default(),
        }
    }
}

impl ContainerSpawner for CloneSpawner {
    fn spawn_and_wait(&self, id: &ContainerId, command: &[String]) -> Result<ContainerExit> {
        let to_cstring = |s: &str| {
            CString::new(s)
                .map_err(|_| StrataError::config(format!("argument {s:?} contains a NUL byte")))
        };
        let exe = to_cstring(SELF_EXE)?;
        let argv = child_argv(&self.config, id, command)
            .iter()
            .map(|arg| to_cstring(arg.as_str()))
            .collect::<Result<Vec<_>>>()?;

        let mut stack = vec![0_u8; CHILD_STACK_SIZE];
        let child = Box::new(|| match exec_child(&exe, &argv) {
            Ok(never) => match never {},
            Err(e) => {
                tracing::error!(error = %display_chain(&e), "container process failed to start");
                CHILD_EXEC_FAILED as isize
            }
        });

        // SAFETY: no CLONE_VM, so the child runs on a private copy of the
        // address space, and `stack` outlives the call.
        let pid = unsafe {
            nix::sched::clone(
                child,
                &mut stack,
                self.namespaces.clone_flags(),
                Some(libc::SIGCHLD),
            )
        }
        .map_err(|source| StrataError::Namespace {
            operation: "clone",
            source,
        })?;
        tracing::info!(id = %id, pid = pid.as_raw(), "container process started");

        let exit = wait_for(pid)?;
        tracing::debug!(id = %id, %exit, "container process finished");
        Ok(exit)
    }
}

/// Runs in the cloned child: isolates mount propagation, then replaces
/// the process image.
fn exec_child(exe: &CString, argv: &[CString]) -> Result<Infallible> {
    make_mounts_private()?;
    nix::unistd::execv(exe, argv).map_err(|source| StrataError::Namespace {
        operation: "execv",
        source,
    })
}

/// Blocks until `pid` terminates.
fn wait_for(pid: Pid) -> Result<ContainerExit> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(ContainerExit::Exited(code)),
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                return Ok(ContainerExit::Signaled(signal as i32));
            }
            Ok(status) => tracing::debug!(?status, "ignoring non-terminal wait status"),
            Err(Errno::EINTR) => {}
            Err(source) => {
                return Err(StrataError::Namespace {
                    operation: "waitpid",
                    source,
                });
            }
        }
    }
}

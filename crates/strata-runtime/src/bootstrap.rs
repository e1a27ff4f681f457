//! In-namespace bootstrap of the container process.
//!
//! Runs inside the cloned process, after it has been re-executed in child
//! mode. The steps are strictly ordered and each one is fatal:
//!
//! 1. hostname set to the container identity
//! 2. provisioned network namespace joined
//! 3. root changed to the overlay mount, working directory reset to `/`
//! 4. `proc` mounted at `/proc`, `tmpfs` at `/tmp`
//! 5. loopback brought up
//! 6. user command run to completion
//! 7. `/proc` and `/tmp` unmounted
//!
//! Once the pseudo-filesystems are mounted they are unmounted again
//! whatever the user command did.

use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use strata_common::config::StrataConfig;
use strata_common::error::{Result, StrataError};
use strata_common::types::{ContainerExit, ContainerId};
use strata_core::filesystem::chroot;
use strata_core::filesystem::mount::{MountOps, MountRequest, SyscallMounter};
use strata_core::namespace::uts;
use strata_core::netlink;

use crate::layout::ContainerLayout;
use crate::network;

/// Everything the bootstrap does to the process, so the sequence can be
/// exercised without privileges.
pub trait BootstrapOps: MountOps {
    /// Sets the UTS hostname.
    ///
    /// # Errors
    ///
    /// Returns an error if the hostname cannot be set.
    fn set_hostname(&self, hostname: &str) -> Result<()>;

    /// Moves the process into the network namespace pinned at `netns`.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace cannot be opened or entered.
    fn join_network(&self, netns: &Path) -> Result<()>;

    /// Changes the root directory.
    ///
    /// # Errors
    ///
    /// Returns an error if `chroot(2)` fails.
    fn change_root(&self, root: &Path) -> Result<()>;

    /// Changes the working directory to `/`.
    ///
    /// # Errors
    ///
    /// Returns an error if `chdir(2)` fails.
    fn change_dir_to_root(&self) -> Result<()>;

    /// Creates `dir` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    fn ensure_dir(&self, dir: &Path) -> Result<()>;

    /// Brings the loopback interface up.
    ///
    /// # Errors
    ///
    /// Returns an error if the interface cannot be configured.
    fn loopback_up(&self) -> Result<()>;

    /// Runs the user command with inherited standard streams and waits.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be started. A command that
    /// runs and fails is reported through the returned [`ContainerExit`].
    fn run_command(&self, command: &[String]) -> Result<ContainerExit>;
}

/// Inputs of one bootstrap run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapContext {
    /// Container identity, also used as hostname.
    pub id: ContainerId,
    /// Overlay mount target that becomes `/`.
    pub rootfs: PathBuf,
    /// Pinned network namespace to join.
    pub netns: PathBuf,
    /// User command and its arguments.
    pub command: Vec<String>,
}

impl BootstrapContext {
    /// Derives the context of container `id` from the runtime paths.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Config`] if `command` is empty.
    pub fn new(config: &StrataConfig, id: ContainerId, command: Vec<String>) -> Result<Self> {
        if command.is_empty() {
            return Err(StrataError::config("no command given for the container"));
        }
        let layout = ContainerLayout::new(&config.containers_dir(), &id);
        Ok(Self {
            rootfs: layout.mount_target(),
            netns: network::netns_path(config, &id),
            id,
            command,
        })
    }
}

/// Runs the bootstrap sequence and returns how the user command ended.
///
/// # Errors
///
/// Returns the first failing setup step, a failure to start the command
/// (reported after cleanup), or a cleanup failure.
pub fn run_bootstrap(ops: &dyn BootstrapOps, ctx: &BootstrapContext) -> Result<ContainerExit> {
    tracing::info!(id = %ctx.id, "bootstrapping container");
    ops.set_hostname(ctx.id.as_str())?;
    ops.join_network(&ctx.netns)?;
    ops.change_root(&ctx.rootfs)?;
    ops.change_dir_to_root()?;

    let proc_dir = Path::new("/proc");
    let tmp_dir = Path::new("/tmp");
    ops.ensure_dir(proc_dir)?;
    ops.mount(&MountRequest::proc(proc_dir))?;
    ops.mount(&MountRequest::tmpfs(tmp_dir))?;
    ops.loopback_up()?;

    let outcome = ops.run_command(&ctx.command);

    ops.unmount(proc_dir)?;
    ops.unmount(tmp_dir)?;

    let exit = outcome?;
    tracing::debug!(id = %ctx.id, %exit, "container command finished");
    Ok(exit)
}

/// [`BootstrapOps`] acting on the real process.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxBootstrap {
    mounter: SyscallMounter,
}

impl MountOps for LinuxBootstrap {
    fn mount(&self, request: &MountRequest) -> Result<()> {
        self.mounter.mount(request)
    }

    fn unmount(&self, target: &Path) -> Result<()> {
        self.mounter.unmount(target)
    }
}

impl BootstrapOps for LinuxBootstrap {
    fn set_hostname(&self, hostname: &str) -> Result<()> {
        uts::set_hostname(hostname)
    }

    fn join_network(&self, netns: &Path) -> Result<()> {
        network::join_network(netns)
    }

    fn change_root(&self, root: &Path) -> Result<()> {
        chroot::change_root(root)
    }

    fn change_dir_to_root(&self) -> Result<()> {
        chroot::enter_new_root()
    }

    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir).map_err(|e| StrataError::io(dir, e))
    }

    fn loopback_up(&self) -> Result<()> {
        netlink::set_link_up(netlink::LOOPBACK)
    }

    fn run_command(&self, command: &[String]) -> Result<ContainerExit> {
        let Some((program, args)) = command.split_first() else {
            return Err(StrataError::config("no command given for the container"));
        };
        tracing::debug!(program = %program, ?args, "running container command");
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|e| StrataError::io(program, e))?;
        Ok(match (status.code(), status.signal()) {
            (Some(code), _) => ContainerExit::Exited(code),
            (None, Some(signal)) => ContainerExit::Signaled(signal),
            (None, None) => ContainerExit::Exited(1),
        })
    }
}

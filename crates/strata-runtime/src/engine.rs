//! Runtime engine that drives one container from image to exit.

use strata_common::config::StrataConfig;
use strata_common::error::{Result, StrataError};
use strata_common::types::{ContainerExit, ContainerId, ImageId};
use strata_core::filesystem::mount::{MountOps, SyscallMounter};
use strata_core::filesystem::overlayfs;
use strata_image::registry::ImageCatalog;
use strata_image::storage::ImageStore;

use crate::layout::ContainerLayout;
use crate::network::{self, NetworkStage};
use crate::process::{self, CloneSpawner, ContainerSpawner};
use crate::rootfs;

/// Result of a completed container run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRun {
    /// Identity the container ran under.
    pub id: ContainerId,
    /// Image the container was built from.
    pub image: ImageId,
    /// How the user command ended.
    pub exit: ContainerExit,
}

/// The runtime engine that coordinates container creation.
///
/// Privileged collaborators are injected, so the whole pipeline can run
/// against fakes. [`Engine::new`] wires the real ones.
pub struct Engine {
    config: StrataConfig,
    mounter: Box<dyn MountOps>,
    spawner: Box<dyn ContainerSpawner>,
    stages: Vec<Box<dyn NetworkStage>>,
}

impl Engine {
    /// Creates an engine using the host's mount, network, and process
    /// facilities.
    #[must_use]
    pub fn new(config: StrataConfig) -> Self {
        let stages = network::default_stages(&config);
        let spawner = CloneSpawner::new(config.clone());
        Self::with_parts(config, Box::new(SyscallMounter), Box::new(spawner), stages)
    }

    /// Creates an engine from explicit collaborators.
    #[must_use]
    pub fn with_parts(
        config: StrataConfig,
        mounter: Box<dyn MountOps>,
        spawner: Box<dyn ContainerSpawner>,
        stages: Vec<Box<dyn NetworkStage>>,
    ) -> Self {
        Self {
            config,
            mounter,
            spawner,
            stages,
        }
    }

    /// Creates and runs a container from `image_ref`, blocking until its
    /// command exits.
    ///
    /// The overlay root filesystem is unmounted once the container process
    /// has returned, whatever its exit status and whether or not its setup
    /// succeeded. Nothing is rolled back when an earlier stage fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the command is empty, the image cannot be
    /// resolved or mounted, a network stage fails, the container process
    /// cannot be spawned or waited for, its in-namespace setup fails, or
    /// the final unmount fails.
    pub fn run(&self, image_ref: &str, command: &[String]) -> Result<ContainerRun> {
        if command.is_empty() {
            return Err(StrataError::config("no command given for the container"));
        }

        let id = ContainerId::generate();
        tracing::info!(id = %id, image = image_ref, "creating container");

        let images_dir = self.config.images_dir();
        let image = ImageCatalog::open(&images_dir).resolve(image_ref)?;
        let store = ImageStore::open(images_dir);

        let layout = ContainerLayout::new(&self.config.containers_dir(), &id);
        layout.create_directories()?;
        let overlay = rootfs::mount_rootfs(self.mounter.as_ref(), &store, &image, &layout)?;

        network::provision(&self.stages, &id)?;

        let spawned = self.spawner.spawn_and_wait(&id, command);
        overlayfs::unmount_overlay(self.mounter.as_ref(), &overlay.merged_dir)?;
        let exit = process::check_child_exit(&id, spawned?)?;

        tracing::info!(id = %id, %exit, "container finished");
        Ok(ContainerRun { id, image, exit })
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("stages", &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

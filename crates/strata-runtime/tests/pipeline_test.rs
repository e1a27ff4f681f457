//! Integration tests for the container creation pipeline.
//!
//! The engine runs against a real on-disk image store in a temporary data
//! directory, with recording fakes standing in for mounts, network stages,
//! and the namespaced spawn:
//! 1. Image resolution and overlay assembly
//! 2. Network provisioning order and abort on failure
//! 3. Teardown after the container process returns

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use strata_common::config::StrataConfig;
use strata_common::constants::{CHILD_EXEC_FAILED, CHILD_SETUP_FAILED};
use strata_common::error::{Result, StrataError};
use strata_common::types::{ContainerExit, ContainerId, ImageId};
use strata_core::filesystem::mount::{MountOps, MountRequest};
use strata_image::registry::ImageCatalog;
use strata_runtime::engine::Engine;
use strata_runtime::layout::ContainerLayout;
use strata_runtime::network::NetworkStage;
use strata_runtime::process::ContainerSpawner;

const IMAGE_HASH: &str = "d7d3d98c851f";

type Log = Rc<RefCell<Vec<String>>>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum MountFailure {
    Off,
    Mount,
    Unmount,
}

struct RecordingMounter {
    log: Log,
    fail: MountFailure,
}

impl MountOps for RecordingMounter {
    fn mount(&self, request: &MountRequest) -> Result<()> {
        self.log.borrow_mut().push(format!(
            "mount {} {}",
            request.fstype,
            request.data.as_deref().unwrap_or_default()
        ));
        if self.fail == MountFailure::Mount {
            return Err(StrataError::Mount {
                fstype: request.fstype.clone(),
                target: request.target.clone(),
                source: nix::Error::EPERM,
            });
        }
        Ok(())
    }

    fn unmount(&self, target: &Path) -> Result<()> {
        self.log
            .borrow_mut()
            .push(format!("unmount {}", target.display()));
        if self.fail == MountFailure::Unmount {
            return Err(StrataError::Unmount {
                target: target.to_path_buf(),
                source: nix::Error::EBUSY,
            });
        }
        Ok(())
    }
}

struct FakeSpawner {
    log: Log,
    exit: ContainerExit,
}

impl ContainerSpawner for FakeSpawner {
    fn spawn_and_wait(&self, id: &ContainerId, command: &[String]) -> Result<ContainerExit> {
        self.log
            .borrow_mut()
            .push(format!("spawn {id} {}", command.join(" ")));
        Ok(self.exit)
    }
}

struct FakeStage {
    name: &'static str,
    fail: bool,
    log: Log,
}

impl NetworkStage for FakeStage {
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(&self, _id: &ContainerId) -> Result<()> {
        self.log.borrow_mut().push(format!("net {}", self.name));
        if self.fail {
            return Err(StrataError::Network {
                stage: "netlink",
                message: "operation not permitted".into(),
            });
        }
        Ok(())
    }
}

/// Lays out `alpine:test` with the given manifest JSON.
fn seed_image(config: &StrataConfig, manifest: &str) {
    let images = config.images_dir();
    let image_dir = images.join(IMAGE_HASH);
    std::fs::create_dir_all(&image_dir).expect("mkdir image");
    std::fs::write(image_dir.join("manifest.json"), manifest).expect("write manifest");
    ImageCatalog::open(&images)
        .register("alpine", "test", &ImageId::new(IMAGE_HASH))
        .expect("register");
}

const TWO_LAYERS: &str = r#"[{
    "Config": "3fd9065eaf02.json",
    "RepoTags": ["alpine:test"],
    "Layers": ["aaaaaaaaaaaa0000/layer.tar", "bbbbbbbbbbbb1111/layer.tar"]
}]"#;

fn engine(config: &StrataConfig, log: &Log, exit: ContainerExit, failing: Option<&str>) -> Engine {
    engine_with_mounts(config, log, exit, failing, MountFailure::Off)
}

fn engine_with_mounts(
    config: &StrataConfig,
    log: &Log,
    exit: ContainerExit,
    failing: Option<&str>,
    mount_failure: MountFailure,
) -> Engine {
    let stages = ["host-veth", "setup-netns", "fence-veth", "setup-veth"]
        .into_iter()
        .map(|name| {
            Box::new(FakeStage {
                name,
                fail: failing == Some(name),
                log: Rc::clone(log),
            }) as Box<dyn NetworkStage>
        })
        .collect();
    Engine::with_parts(
        config.clone(),
        Box::new(RecordingMounter {
            log: Rc::clone(log),
            fail: mount_failure,
        }),
        Box::new(FakeSpawner {
            log: Rc::clone(log),
            exit,
        }),
        stages,
    )
}

fn command() -> Vec<String> {
    vec!["echo".into(), "hi".into()]
}

// ── Full run ─────────────────────────────────────────────────────────

#[test]
fn run_drives_every_stage_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StrataConfig::new(dir.path().join("data"), dir.path().join("run"));
    seed_image(&config, TWO_LAYERS);
    let log = Log::default();

    let run = engine(&config, &log, ContainerExit::Exited(0), None)
        .run("alpine:test", &command())
        .expect("run");

    assert_eq!(run.image.as_str(), IMAGE_HASH);
    assert!(run.exit.success());

    let layout = ContainerLayout::new(&config.containers_dir(), &run.id);
    let image_dir = config.images_dir().join(IMAGE_HASH);
    let expected_mount = format!(
        "mount overlay lowerdir={}:{},upperdir={},workdir={}",
        image_dir.join("bbbbbbbbbbbb/fs").display(),
        image_dir.join("aaaaaaaaaaaa/fs").display(),
        layout.upper_dir().display(),
        layout.work_dir().display(),
    );
    assert_eq!(
        *log.borrow(),
        [
            expected_mount,
            "net host-veth".to_string(),
            "net setup-netns".to_string(),
            "net fence-veth".to_string(),
            "net setup-veth".to_string(),
            format!("spawn {} echo hi", run.id),
            format!("unmount {}", layout.mount_target().display()),
        ]
    );
}

#[test]
fn run_creates_container_directories() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StrataConfig::new(dir.path().join("data"), dir.path().join("run"));
    seed_image(&config, TWO_LAYERS);
    let log = Log::default();

    let run = engine(&config, &log, ContainerExit::Exited(0), None)
        .run("alpine:test", &command())
        .expect("run");

    let layout = ContainerLayout::new(&config.containers_dir(), &run.id);
    assert!(layout.mount_target().is_dir());
    assert!(layout.upper_dir().is_dir());
    assert!(layout.work_dir().is_dir());
}

#[test]
fn run_by_image_hash() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StrataConfig::new(dir.path().join("data"), dir.path().join("run"));
    seed_image(&config, TWO_LAYERS);
    let log = Log::default();

    let run = engine(&config, &log, ContainerExit::Exited(0), None)
        .run(IMAGE_HASH, &command())
        .expect("run");
    assert_eq!(run.image.as_str(), IMAGE_HASH);
}

// ── Teardown ─────────────────────────────────────────────────────────

#[test]
fn overlay_unmounted_after_failing_command() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StrataConfig::new(dir.path().join("data"), dir.path().join("run"));
    seed_image(&config, TWO_LAYERS);
    let log = Log::default();

    let run = engine(&config, &log, ContainerExit::Exited(42), None)
        .run("alpine:test", &command())
        .expect("run");

    assert_eq!(run.exit.code(), 42);
    let entries = log.borrow();
    assert_eq!(entries.iter().filter(|e| e.starts_with("unmount")).count(), 1);
    assert!(entries.last().unwrap().starts_with("unmount"));
}

#[test]
fn signaled_command_reports_shell_style_code() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StrataConfig::new(dir.path().join("data"), dir.path().join("run"));
    seed_image(&config, TWO_LAYERS);
    let log = Log::default();

    let run = engine(&config, &log, ContainerExit::Signaled(9), None)
        .run("alpine:test", &command())
        .expect("run");
    assert_eq!(run.exit.code(), 137);
}

#[test]
fn failed_bootstrap_is_an_error_after_teardown() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StrataConfig::new(dir.path().join("data"), dir.path().join("run"));
    seed_image(&config, TWO_LAYERS);
    let log = Log::default();

    let err = engine(&config, &log, ContainerExit::Exited(CHILD_SETUP_FAILED), None)
        .run("alpine:test", &command())
        .unwrap_err();

    assert!(matches!(
        err,
        StrataError::ContainerSetup {
            phase: "bootstrap",
            ..
        }
    ));
    assert!(log.borrow().last().unwrap().starts_with("unmount"));
}

#[test]
fn failed_reexec_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StrataConfig::new(dir.path().join("data"), dir.path().join("run"));
    seed_image(&config, TWO_LAYERS);
    let log = Log::default();

    let err = engine(&config, &log, ContainerExit::Exited(CHILD_EXEC_FAILED), None)
        .run("alpine:test", &command())
        .unwrap_err();
    assert!(matches!(err, StrataError::ContainerSetup { phase: "exec", .. }));
}

#[test]
fn final_unmount_failure_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StrataConfig::new(dir.path().join("data"), dir.path().join("run"));
    seed_image(&config, TWO_LAYERS);
    let log = Log::default();

    let err = engine_with_mounts(
        &config,
        &log,
        ContainerExit::Exited(0),
        None,
        MountFailure::Unmount,
    )
    .run("alpine:test", &command())
    .unwrap_err();

    assert!(matches!(err, StrataError::Unmount { .. }));
    let entries = log.borrow();
    let spawn = entries.iter().position(|e| e.starts_with("spawn")).unwrap();
    let unmount = entries.iter().position(|e| e.starts_with("unmount")).unwrap();
    assert!(spawn < unmount);
    assert_eq!(unmount, entries.len() - 1);
}

// ── Failures ─────────────────────────────────────────────────────────

#[test]
fn overlay_mount_failure_stops_before_network() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StrataConfig::new(dir.path().join("data"), dir.path().join("run"));
    seed_image(&config, TWO_LAYERS);
    let log = Log::default();

    let err = engine_with_mounts(
        &config,
        &log,
        ContainerExit::Exited(0),
        None,
        MountFailure::Mount,
    )
    .run("alpine:test", &command())
    .unwrap_err();

    assert!(matches!(err, StrataError::Mount { .. }));
    let entries = log.borrow();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].starts_with("mount overlay lowerdir="));
}

#[test]
fn failing_network_stage_aborts_before_spawn() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StrataConfig::new(dir.path().join("data"), dir.path().join("run"));
    seed_image(&config, TWO_LAYERS);
    let log = Log::default();

    let err = engine(&config, &log, ContainerExit::Exited(0), Some("fence-veth"))
        .run("alpine:test", &command())
        .unwrap_err();

    assert!(matches!(err, StrataError::Network { stage: "fence-veth", .. }));
    let entries = log.borrow();
    assert!(entries.iter().any(|e| e == "net fence-veth"));
    assert!(!entries.iter().any(|e| e == "net setup-veth"));
    assert!(!entries.iter().any(|e| e.starts_with("spawn")));
}

#[test]
fn empty_manifest_never_mounts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StrataConfig::new(dir.path().join("data"), dir.path().join("run"));
    seed_image(&config, "[]");
    let log = Log::default();

    let err = engine(&config, &log, ContainerExit::Exited(0), None)
        .run("alpine:test", &command())
        .unwrap_err();

    assert!(err.to_string().contains("could not find any layers"));
    assert!(log.borrow().is_empty());
}

#[test]
fn multi_image_manifest_never_mounts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StrataConfig::new(dir.path().join("data"), dir.path().join("run"));
    seed_image(
        &config,
        r#"[{"Layers": ["aaaaaaaaaaaa"]}, {"Layers": ["bbbbbbbbbbbb"]}]"#,
    );
    let log = Log::default();

    assert!(
        engine(&config, &log, ContainerExit::Exited(0), None)
            .run("alpine:test", &command())
            .is_err()
    );
    assert!(log.borrow().is_empty());
}

#[test]
fn unknown_image_is_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StrataConfig::new(dir.path().join("data"), dir.path().join("run"));
    let log = Log::default();

    let err = engine(&config, &log, ContainerExit::Exited(0), None)
        .run("busybox", &command())
        .unwrap_err();
    assert!(matches!(err, StrataError::NotFound { kind: "image", .. }));
    assert!(log.borrow().is_empty());
}

#[test]
fn empty_command_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StrataConfig::new(dir.path().join("data"), dir.path().join("run"));
    seed_image(&config, TWO_LAYERS);
    let log = Log::default();

    let err = engine(&config, &log, ContainerExit::Exited(0), None)
        .run("alpine:test", &[])
        .unwrap_err();
    assert!(matches!(err, StrataError::Config { .. }));
    assert!(!config.containers_dir().exists());
}

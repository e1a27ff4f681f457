//! System-wide constants and default paths.

/// Default base directory for images and container filesystems.
pub const DEFAULT_DATA_DIR: &str = "/var/lib/strata";

/// Default directory for runtime artifacts such as pinned network namespaces.
pub const DEFAULT_RUN_DIR: &str = "/var/run/strata";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "STRATA_DATA_DIR";

/// Environment variable overriding the run directory.
pub const RUN_DIR_ENV: &str = "STRATA_RUN_DIR";

/// Name of the image index file under the images directory.
pub const IMAGE_INDEX_FILE: &str = "images.json";

/// Name of the manifest file inside an image directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Number of leading layer-id characters used for layer directory names.
pub const LAYER_PREFIX_LEN: usize = 12;

/// Tag assumed when an image reference carries none.
pub const DEFAULT_TAG: &str = "latest";

/// Host bridge that container veth endpoints are attached to.
pub const BRIDGE_NAME: &str = "strata0";

/// Gateway address of the container bridge network.
pub const BRIDGE_GATEWAY: [u8; 4] = [172, 29, 0, 1];

/// Prefix length of the container bridge network.
pub const BRIDGE_PREFIX_LEN: u8 = 16;

/// Path the running executable is re-invoked through.
pub const SELF_EXE: &str = "/proc/self/exe";

/// Mode token that selects the in-namespace bootstrap.
pub const CHILD_MODE: &str = "child-mode";

/// Application name used in log output.
pub const APP_NAME: &str = "strata";

/// Exit status of `child-mode` when the in-namespace bootstrap fails.
///
/// Reserved: the parent treats it as a runtime failure, never as the
/// user command's own status.
pub const CHILD_SETUP_FAILED: i32 = 250;

/// Exit status of the cloned child when re-executing the runtime fails.
pub const CHILD_EXEC_FAILED: i32 = 251;

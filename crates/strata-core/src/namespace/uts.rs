//! UTS namespace isolation.
//!
//! Allows the container to have its own hostname.

use strata_common::error::{Result, StrataError};

/// Sets the hostname inside the UTS namespace.
///
/// # Errors
///
/// Returns an error if `sethostname(2)` fails.
pub fn set_hostname(hostname: &str) -> Result<()> {
    nix::unistd::sethostname(hostname).map_err(|source| StrataError::Namespace {
        operation: "sethostname",
        source,
    })?;
    tracing::debug!(hostname, "container hostname set");
    Ok(())
}

//! Domain primitive types used across the strata workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StrataError;

/// Number of random bytes behind a container identity.
const ID_BYTES: usize = 6;

/// Unique identifier for a container instance.
///
/// Always 12 lowercase hexadecimal characters. Identities are drawn fresh
/// for every container and collisions are not checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Length of an identity in hex characters.
    pub const LEN: usize = ID_BYTES * 2;

    /// Generates a random container ID.
    ///
    /// The first six bytes of a v4 UUID carry no version or variant bits,
    /// so they are used as the random source.
    #[must_use]
    pub fn generate() -> Self {
        let uuid = uuid::Uuid::new_v4();
        let hex = uuid.as_bytes()[..ID_BYTES]
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        Self(hex)
    }

    /// Parses an identity received on the command line.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Config`] unless the input is exactly 12
    /// lowercase hex characters.
    pub fn parse(id: &str) -> crate::error::Result<Self> {
        let valid = id.len() == Self::LEN
            && id
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if !valid {
            return Err(StrataError::config(format!(
                "invalid container id {id:?}: expected {} lowercase hex characters",
                Self::LEN
            )));
        }
        Ok(Self(id.to_owned()))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the six-character prefix used in interface names.
    ///
    /// Linux caps interface names at 15 bytes, so `veth0_` plus the full
    /// identity would not fit.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..ID_BYTES]
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContainerId {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Content-addressed identifier of a stored image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(String);

impl ImageId {
    /// Creates a new image ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a container's main process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerExit {
    /// The process exited with the given status code.
    Exited(i32),
    /// The process was killed by the given signal number.
    Signaled(i32),
}

impl ContainerExit {
    /// Shell-style exit code: the status code, or `128 + signal`.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Exited(code) => code,
            Self::Signaled(signal) => 128 + signal,
        }
    }

    /// Whether the process exited with status zero.
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self, Self::Exited(0))
    }
}

impl fmt::Display for ContainerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with status {code}"),
            Self::Signaled(signal) => write!(f, "killed by signal {signal}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_id_is_twelve_lowercase_hex_chars() {
        for _ in 0..64 {
            let id = ContainerId::generate();
            assert_eq!(id.as_str().len(), 12);
            assert!(
                id.as_str()
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)),
                "unexpected id {id}"
            );
        }
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(ContainerId::generate(), ContainerId::generate());
    }

    #[test]
    fn parse_accepts_generated_id() {
        let id = ContainerId::generate();
        let parsed: ContainerId = id.as_str().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_rejects_bad_ids() {
        assert!(ContainerId::parse("abc").is_err());
        assert!(ContainerId::parse("ABCDEF012345").is_err());
        assert!(ContainerId::parse("0123456789ag").is_err());
        assert!(ContainerId::parse("../../etc/xx").is_err());
    }

    #[test]
    fn short_is_first_six_chars() {
        let id = ContainerId::parse("a1b2c3d4e5f6").unwrap();
        assert_eq!(id.short(), "a1b2c3");
    }

    #[test]
    fn exit_code_for_signal_adds_128() {
        assert_eq!(ContainerExit::Signaled(9).code(), 137);
        assert_eq!(ContainerExit::Exited(3).code(), 3);
        assert!(ContainerExit::Exited(0).success());
        assert!(!ContainerExit::Exited(1).success());
    }
}

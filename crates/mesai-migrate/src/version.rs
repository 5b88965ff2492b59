//! Strongly-typed schema version number.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version number of a single migration step.
///
/// Always `>= 1`; a database with nothing applied is at "version 0", which is
/// represented as a plain `u32` by the runner rather than a `SchemaVersion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SchemaVersion(u32);

impl SchemaVersion {
    /// Create a version, panicking (at compile time in const contexts) on 0.
    pub const fn new(version: u32) -> Self {
        assert!(version >= 1, "SchemaVersion must be >= 1");
        Self(version)
    }

    /// Try to create a version, returning `None` for 0.
    pub fn try_new(version: u32) -> Option<Self> {
        (version >= 1).then_some(Self(version))
    }

    /// The raw version number.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{:03}", self.0)
    }
}

impl From<SchemaVersion> for u32 {
    fn from(version: SchemaVersion) -> Self {
        version.0
    }
}

impl TryFrom<u32> for SchemaVersion {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::try_new(value).ok_or_else(|| "SchemaVersion must be >= 1".to_string())
    }
}

impl PartialEq<u32> for SchemaVersion {
    fn eq(&self, other: &u32) -> bool {
        self.0 == *other
    }
}

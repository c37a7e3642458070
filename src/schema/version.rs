use std::fmt;

use crate::core::{Result, StoreError};

/// A named point in the evolution of the stored-record structure.
///
/// Versions form a linear chain with no gaps; every version except the last
/// has exactly one successor. New versions are appended at build time, never
/// at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SchemaVersion {
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    V7,
}

impl SchemaVersion {
    pub const ALL: [SchemaVersion; 7] = [
        Self::V1,
        Self::V2,
        Self::V3,
        Self::V4,
        Self::V5,
        Self::V6,
        Self::V7,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::V1 => "version1",
            Self::V2 => "version2",
            Self::V3 => "version3",
            Self::V4 => "version4",
            Self::V5 => "version5",
            Self::V6 => "version6",
            Self::V7 => "version7",
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SchemaVersion {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.name() == s)
            .ok_or_else(|| StoreError::Configuration(format!("Unknown schema version '{}'", s)))
    }
}

/// Static enumeration of known schema versions in upgrade order.
pub struct VersionCatalog;

impl VersionCatalog {
    /// The latest known schema version. An empty catalog is unreachable in a
    /// correctly built release and reported as a configuration error.
    pub fn current() -> Result<SchemaVersion> {
        SchemaVersion::ALL
            .last()
            .copied()
            .ok_or_else(|| StoreError::Configuration("Schema version catalog is empty".to_string()))
    }

    /// The immediate successor of `after`, or `None` for the latest version.
    pub fn next_version(after: SchemaVersion) -> Option<SchemaVersion> {
        let index = SchemaVersion::ALL.iter().position(|v| *v == after)?;
        SchemaVersion::ALL.get(index + 1).copied()
    }
}

//! Schema and provenance descriptors attached to simulation outputs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Semantic version of the serialized output schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Incremented for breaking changes.
    pub major: u32,
    /// Incremented for additive changes.
    pub minor: u32,
    /// Incremented for fixes that leave the layout untouched.
    pub patch: u32,
}

impl SchemaVersion {
    /// Creates a new schema version descriptor.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Schema version written by this release.
    pub const CURRENT: SchemaVersion = SchemaVersion::new(1, 0, 0);
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// Inputs and tooling that produced a spectrum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunProvenance {
    /// Output schema version.
    pub schema_version: SchemaVersion,
    /// Hash of the spin systems fed to the run.
    pub spin_systems_hash: String,
    /// Hash of the resolved method.
    pub method_hash: String,
    /// Hash of the simulator configuration.
    pub config_hash: String,
    /// Source commit (if available) or package version.
    pub commit: String,
    /// Versions of the crates involved in the run.
    #[serde(default)]
    pub tool_versions: BTreeMap<String, String>,
}

//! Integration volumes over the unit sphere.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use nmr_core::errors::NmrError;
use serde::{Deserialize, Serialize};

/// Region of the unit sphere sampled by the averaging scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationVolume {
    /// One octant (x, y, z >= 0); valid when every tensor is aligned with the common frame.
    #[default]
    Octant,
    /// Upper hemisphere (z >= 0).
    Hemisphere,
    /// Full sphere.
    Sphere,
}

impl IntegrationVolume {
    /// Solid angle covered by the volume in steradians.
    pub fn solid_angle(&self) -> f64 {
        match self {
            IntegrationVolume::Octant => PI / 2.0,
            IntegrationVolume::Hemisphere => 2.0 * PI,
            IntegrationVolume::Sphere => 4.0 * PI,
        }
    }

    /// Octahedron face sign patterns `(sx, sy, sz)` covered by the volume.
    pub(crate) fn faces(&self) -> &'static [(i64, i64, i64)] {
        const ALL: [(i64, i64, i64); 8] = [
            (1, 1, 1),
            (-1, 1, 1),
            (-1, -1, 1),
            (1, -1, 1),
            (1, 1, -1),
            (-1, 1, -1),
            (-1, -1, -1),
            (1, -1, -1),
        ];
        match self {
            IntegrationVolume::Octant => &ALL[..1],
            IntegrationVolume::Hemisphere => &ALL[..4],
            IntegrationVolume::Sphere => &ALL[..],
        }
    }

    /// Lowercase name used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationVolume::Octant => "octant",
            IntegrationVolume::Hemisphere => "hemisphere",
            IntegrationVolume::Sphere => "sphere",
        }
    }
}

impl fmt::Display for IntegrationVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntegrationVolume {
    type Err = NmrError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "octant" => Ok(IntegrationVolume::Octant),
            "hemisphere" => Ok(IntegrationVolume::Hemisphere),
            "sphere" => Ok(IntegrationVolume::Sphere),
            other => Err(NmrError::invalid(
                "unknown-integration-volume",
                format!("integration volume `{other}` is not supported"),
            )
            .with_hint("use one of `octant`, `hemisphere` or `sphere`")),
        }
    }
}

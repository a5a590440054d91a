//! Octahedral orientation grid with spherical-area quadrature weights.
//!
//! Every octahedron face covered by the integration volume is subdivided into
//! `resolution` segments per edge. Lattice points `(i, j, k)` with
//! `i + j + k = resolution` are projected onto the unit sphere. Each vertex
//! receives one third of the area of every spherical triangle it belongs to, so
//! the weights tile the requested solid angle exactly.

use std::collections::BTreeMap;

use nmr_core::errors::NmrError;
use serde::{Deserialize, Serialize};

use crate::volume::IntegrationVolume;

/// Upper bound on the subdivision resolution accepted by [`generate`].
pub const MAX_RESOLUTION: u32 = 4096;

/// A crystallite orientation: direction of the rotor axis in the common frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    /// Unit vector (x, y, z).
    pub direction: [f64; 3],
    /// Azimuthal angle in radians.
    pub alpha: f64,
    /// Polar angle in radians.
    pub beta: f64,
    /// Quadrature weight (steradians).
    pub weight: f64,
}

/// Spherical triangle of the orientation mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    /// Indices into [`OrientationSet::orientations`].
    pub vertices: [usize; 3],
    /// Spherical area (steradians), normalised with the vertex weights.
    pub area: f64,
}

/// Reproducible quadrature over the requested integration volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrientationSet {
    volume: IntegrationVolume,
    resolution: u32,
    orientations: Vec<Orientation>,
    triangles: Vec<Triangle>,
}

impl OrientationSet {
    /// Integration volume the set was generated for.
    pub fn volume(&self) -> IntegrationVolume {
        self.volume
    }

    /// Subdivision resolution the set was generated with.
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Ordered orientations.
    pub fn orientations(&self) -> &[Orientation] {
        &self.orientations
    }

    /// Mesh triangles; empty at resolution zero.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Number of orientations.
    pub fn len(&self) -> usize {
        self.orientations.len()
    }

    /// Whether the set holds no orientation (never true for generated sets).
    pub fn is_empty(&self) -> bool {
        self.orientations.is_empty()
    }

    /// Sum of all orientation weights.
    pub fn total_weight(&self) -> f64 {
        self.orientations.iter().map(|o| o.weight).sum()
    }
}

type LatticeKey = (i64, i64, i64);

fn project(key: LatticeKey) -> [f64; 3] {
    let (x, y, z) = (key.0 as f64, key.1 as f64, key.2 as f64);
    let norm = (x * x + y * y + z * z).sqrt();
    [x / norm, y / norm, z / norm]
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn triple(a: &[f64; 3], b: &[f64; 3], c: &[f64; 3]) -> f64 {
    a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
        + a[2] * (b[0] * c[1] - b[1] * c[0])
}

/// Area of the spherical triangle spanned by three unit vectors.
pub fn spherical_triangle_area(a: &[f64; 3], b: &[f64; 3], c: &[f64; 3]) -> f64 {
    let numerator = triple(a, b, c).abs();
    let denominator = 1.0 + dot(a, b) + dot(b, c) + dot(c, a);
    2.0 * numerator.atan2(denominator)
}

fn face_triangles(resolution: i64, signs: (i64, i64, i64)) -> Vec<[LatticeKey; 3]> {
    let key = |i: i64, j: i64| (signs.0 * i, signs.1 * j, signs.2 * (resolution - i - j));
    let mut triangles = Vec::with_capacity((resolution * resolution) as usize);
    for i in 0..resolution {
        for j in 0..(resolution - i) {
            triangles.push([key(i, j), key(i + 1, j), key(i, j + 1)]);
            if i + j + 1 < resolution {
                triangles.push([key(i + 1, j), key(i + 1, j + 1), key(i, j + 1)]);
            }
        }
    }
    triangles
}

fn pole(volume: IntegrationVolume) -> OrientationSet {
    OrientationSet {
        volume,
        resolution: 0,
        orientations: vec![Orientation {
            direction: [0.0, 0.0, 1.0],
            alpha: 0.0,
            beta: 0.0,
            weight: volume.solid_angle(),
        }],
        triangles: Vec::new(),
    }
}

/// Generates the orientation set for a resolution and integration volume.
///
/// Identical arguments always produce a bit-identical, identically ordered set.
/// Resolution zero yields a single pole orientation carrying the full solid angle.
pub fn generate(resolution: u32, volume: IntegrationVolume) -> Result<OrientationSet, NmrError> {
    if resolution > MAX_RESOLUTION {
        return Err(NmrError::invalid(
            "resolution-too-large",
            "integration resolution exceeds the supported maximum",
        )
        .with_context("resolution", resolution)
        .with_context("maximum", MAX_RESOLUTION));
    }
    if resolution == 0 {
        return Ok(pole(volume));
    }

    let n = resolution as i64;
    let mut keyed: Vec<[LatticeKey; 3]> = Vec::new();
    for &signs in volume.faces() {
        keyed.extend(face_triangles(n, signs));
    }

    let mut weights: BTreeMap<LatticeKey, f64> = BTreeMap::new();
    let mut raw_triangles = Vec::with_capacity(keyed.len());
    for corners in &keyed {
        let [a, b, c] = corners.map(project);
        let area = spherical_triangle_area(&a, &b, &c);
        for key in corners {
            *weights.entry(*key).or_insert(0.0) += area / 3.0;
        }
        raw_triangles.push(area);
    }

    let total: f64 = weights.values().sum();
    let scale = volume.solid_angle() / total;

    let mut index_of = BTreeMap::new();
    let mut orientations = Vec::with_capacity(weights.len());
    for (index, (key, weight)) in weights.iter().enumerate() {
        let direction = project(*key);
        index_of.insert(*key, index);
        orientations.push(Orientation {
            direction,
            alpha: direction[1].atan2(direction[0]),
            beta: direction[2].clamp(-1.0, 1.0).acos(),
            weight: weight * scale,
        });
    }

    let triangles = keyed
        .iter()
        .zip(raw_triangles)
        .map(|(corners, area)| Triangle {
            vertices: corners.map(|key| index_of[&key]),
            area: area * scale,
        })
        .collect();

    Ok(OrientationSet {
        volume,
        resolution,
        orientations,
        triangles,
    })
}

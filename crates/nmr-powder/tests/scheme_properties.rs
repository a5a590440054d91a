use std::f64::consts::PI;

use approx::assert_relative_eq;
use nmr_core::errors::NmrError;
use nmr_powder::{generate, IntegrationVolume};
use proptest::prelude::*;

fn volumes() -> impl Strategy<Value = IntegrationVolume> {
    prop_oneof![
        Just(IntegrationVolume::Octant),
        Just(IntegrationVolume::Hemisphere),
        Just(IntegrationVolume::Sphere),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn weights_tile_the_solid_angle(resolution in 0u32..40, volume in volumes()) {
        let set = generate(resolution, volume).unwrap();
        let expected = volume.solid_angle();
        prop_assert!((set.total_weight() - expected).abs() <= 1e-9 * expected);
        prop_assert!(set.orientations().iter().all(|o| o.weight > 0.0));
    }

    #[test]
    fn triangle_areas_match_vertex_weights(resolution in 1u32..25, volume in volumes()) {
        let set = generate(resolution, volume).unwrap();
        let area: f64 = set.triangles().iter().map(|t| t.area).sum();
        prop_assert!((area - set.total_weight()).abs() <= 1e-9 * area);
    }

    #[test]
    fn directions_are_unit_vectors(resolution in 1u32..20, volume in volumes()) {
        let set = generate(resolution, volume).unwrap();
        for orientation in set.orientations() {
            let [x, y, z] = orientation.direction;
            prop_assert!(((x * x + y * y + z * z) - 1.0).abs() < 1e-12);
            prop_assert!((orientation.beta.cos() - z).abs() < 1e-12);
        }
    }
}

#[test]
fn generation_is_idempotent() {
    let first = generate(25, IntegrationVolume::Sphere).unwrap();
    let second = generate(25, IntegrationVolume::Sphere).unwrap();
    assert_eq!(first, second);
}

#[test]
fn octant_orientation_count_is_triangular() {
    for n in [1u32, 5, 12, 70] {
        let set = generate(n, IntegrationVolume::Octant).unwrap();
        assert_eq!(set.len() as u32, (n + 1) * (n + 2) / 2);
        assert_eq!(set.triangles().len() as u32, n * n);
    }
}

#[test]
fn sphere_orientation_count_matches_octahedron() {
    let n = 10u32;
    let set = generate(n, IntegrationVolume::Sphere).unwrap();
    assert_eq!(set.len() as u32, 4 * n * n + 2);
}

#[test]
fn resolution_zero_is_the_pole() {
    let set = generate(0, IntegrationVolume::Hemisphere).unwrap();
    assert_eq!(set.len(), 1);
    assert!(set.triangles().is_empty());
    let pole = set.orientations()[0];
    assert_eq!(pole.direction, [0.0, 0.0, 1.0]);
    assert_relative_eq!(pole.weight, 2.0 * PI);
}

#[test]
fn octant_mean_of_cos_squared_is_one_third() {
    let set = generate(60, IntegrationVolume::Octant).unwrap();
    let mean: f64 = set
        .orientations()
        .iter()
        .map(|o| o.weight * o.direction[2].powi(2))
        .sum::<f64>()
        / set.total_weight();
    assert_relative_eq!(mean, 1.0 / 3.0, max_relative = 5e-3);
}

#[test]
fn unknown_volume_string_is_invalid_parameter() {
    let err = "cube".parse::<IntegrationVolume>().unwrap_err();
    assert!(matches!(err, NmrError::InvalidParameter(_)));
    assert_eq!(err.info().code, "unknown-integration-volume");
    assert_eq!(" Sphere ".parse::<IntegrationVolume>().unwrap(), IntegrationVolume::Sphere);
}

#[test]
fn orientation_set_serialises_to_json() {
    let set = generate(2, IntegrationVolume::Octant).unwrap();
    let json = serde_json::to_value(&set).unwrap();
    assert_eq!(json["volume"], "octant");
    assert_eq!(json["orientations"].as_array().map(Vec::len), Some(6));
}

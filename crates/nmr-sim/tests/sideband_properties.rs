use approx::assert_abs_diff_eq;
use nmr_core::{Site, SpinSystem, SymmetricTensor};
use nmr_method::{from_json_slice, Event, Method, SpectralDimension};
use nmr_sim::{simulate, FrequencySeries, SidebandEngine, SimulationOutput, SimulatorConfig, SpinningRegime};
use num_complex::Complex64;
use proptest::prelude::*;

fn real_series(isotropic: f64, first: Complex64, second: Complex64) -> FrequencySeries {
    let mut coefficients = [Complex64::new(0.0, 0.0); 9];
    coefficients[4] = Complex64::new(isotropic, 0.0);
    coefficients[5] = first;
    coefficients[3] = first.conj();
    coefficients[6] = second;
    coefficients[2] = second.conj();
    FrequencySeries::from_coefficients(coefficients)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sideband_power_sums_to_one(
        isotropic in -5_000.0f64..5_000.0,
        a in -4_000.0f64..4_000.0,
        b in -4_000.0f64..4_000.0,
        c in -2_000.0f64..2_000.0,
        d in -2_000.0f64..2_000.0,
        rotor in 500.0f64..20_000.0,
        exponent in 3u32..9,
    ) {
        let series = real_series(isotropic, Complex64::new(a, b), Complex64::new(c, d));
        let n = 1usize << exponent;
        let mut engine = SidebandEngine::new(n, 0.0).unwrap();
        let set = engine.compute(&series, SpinningRegime::Finite(rotor)).unwrap();

        prop_assert!((set.total_intensity() - 1.0).abs() < 1e-10);
        prop_assert!(set.sidebands.windows(2).all(|w| w[0].order < w[1].order));
        for line in &set.sidebands {
            let expected = isotropic + f64::from(line.order) * rotor;
            prop_assert!((line.frequency - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn threshold_keeps_the_strongest_sideband(
        a in -4_000.0f64..4_000.0,
        rotor in 1_000.0f64..5_000.0,
        threshold in 0.0f64..1.0,
    ) {
        let series = real_series(0.0, Complex64::new(a, 0.0), Complex64::new(0.0, 0.0));
        let mut full = SidebandEngine::new(64, 0.0).unwrap();
        let mut cut = SidebandEngine::new(64, threshold).unwrap();
        let all = full.compute(&series, SpinningRegime::Finite(rotor)).unwrap();
        let kept = cut.compute(&series, SpinningRegime::Finite(rotor)).unwrap();

        let strongest = all.sidebands.iter().map(|s| s.intensity()).fold(0.0f64, f64::max);
        prop_assert!(!kept.sidebands.is_empty());
        prop_assert!(kept.sidebands.iter().all(|s| s.intensity() >= threshold * strongest));
        prop_assert!(kept.sidebands.len() <= all.sidebands.len());
    }
}

#[test]
fn output_serialises_to_json() {
    let site = Site::new("13C", 30.0).with_shielding(SymmetricTensor::new(40.0, 0.1).unwrap());
    let method = Method::new(
        "json",
        vec!["13C".to_string()],
        vec![SpectralDimension::new(64, 20_000.0, 0.0)
            .with_label("13C")
            .with_events(vec![Event::default().with_rotor_frequency(4_000.0)])],
    );
    let config = SimulatorConfig {
        integration_density: 6,
        number_of_sidebands: 16,
        ..SimulatorConfig::default()
    };
    let output = simulate(&[SpinSystem::new(vec![site])], &method, &config).unwrap();

    let json = serde_json::to_string(&output).unwrap();
    let restored: SimulationOutput = from_json_slice(json.as_bytes()).unwrap();
    assert_eq!(restored.provenance, output.provenance);
    assert_eq!(restored.axes[0].label.as_deref(), Some("13C"));
    assert_eq!(restored.spectra[0].data.shape(), &[64]);
    for (x, y) in restored.spectra[0].data.iter().zip(output.spectra[0].data.iter()) {
        assert_abs_diff_eq!(x.re, y.re, epsilon = 1e-15);
    }
}

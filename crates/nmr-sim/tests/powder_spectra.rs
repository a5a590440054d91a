use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::{ArrayD, Axis as ArrayAxis};
use nmr_core::{Isotope, Site, SpinSystem, SymmetricTensor};
use nmr_method::{
    DimensionParams, Event, Method, MethodParams, MethodTemplate, SpectralDimension,
    TransitionQuery,
};
use nmr_powder::Orientation;
use nmr_sim::{
    select_transitions, simulate, Interpolation, PreparedSystem, SidebandEngine,
    SimulationOutput, SimulatorConfig, SpinBasis, SpinningRegime,
};
use num_complex::Complex64;

fn config(density: u32) -> SimulatorConfig {
    SimulatorConfig {
        integration_density: density,
        ..SimulatorConfig::default()
    }
}

fn one_dim(channel: &str, dim: SpectralDimension, event: Event) -> Method {
    Method::new("test", vec![channel.to_string()], vec![dim.with_events(vec![event])])
}

fn real(data: &ArrayD<Complex64>) -> Vec<f64> {
    data.iter().map(|value| value.re).collect()
}

fn first_moment(output: &SimulationOutput) -> f64 {
    let values = real(&output.spectra[0].data);
    let total: f64 = values.iter().sum();
    values
        .iter()
        .zip(&output.axes[0].coordinates)
        .map(|(value, frequency)| value * frequency)
        .sum::<f64>()
        / total
}

fn larmor(symbol: &str) -> f64 {
    Isotope::parse(symbol).unwrap().larmor_frequency(9.4)
}

fn mean_around(values: &[f64], coordinates: &[f64], frequency: f64, half_width: usize) -> f64 {
    let centre = coordinates
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - frequency).abs().total_cmp(&(*b - frequency).abs()))
        .map(|(index, _)| index)
        .unwrap();
    let window = &values[centre - half_width..=centre + half_width];
    window.iter().sum::<f64>() / window.len() as f64
}

#[test]
fn static_orientation_gives_one_unit_line() {
    let site = Site::new("13C", 5.0).with_shielding(SymmetricTensor::new(60.0, 0.2).unwrap());
    let prepared = PreparedSystem::new(&SpinSystem::new(vec![site])).unwrap();
    let basis = SpinBasis::new(prepared.isotopes());
    let transitions =
        select_transitions(&basis, &[Some(0)], 1, &[TransitionQuery::p(vec![-1])]).unwrap();
    let (alpha, beta) = (0.3_f64, 1.1_f64);
    let orientation = Orientation {
        direction: [beta.sin() * alpha.cos(), beta.sin() * alpha.sin(), beta.cos()],
        alpha,
        beta,
        weight: 1.0,
    };
    let event = Event::default();
    let series = prepared.rotor_frame(&orientation).lab(&event).series(&transitions[0]);

    let mut engine = SidebandEngine::new(64, 0.0).unwrap();
    let set = engine.compute(&series, SpinningRegime::of(&event)).unwrap();
    assert_eq!(set.sidebands.len(), 1);
    assert_eq!(set.sidebands[0].order, 0);
    assert_abs_diff_eq!(set.sidebands[0].amplitude.re, 1.0, epsilon = 1e-15);

    let anisotropy = 60.0
        * (0.5 * (3.0 * beta.cos().powi(2) - 1.0)
            - 0.5 * 0.2 * beta.sin().powi(2) * (2.0 * alpha).cos());
    let expected = larmor("13C") * 1e-6 * (5.0 - anisotropy);
    assert_abs_diff_eq!(set.sidebands[0].frequency, expected, epsilon = 1e-6);
}

#[test]
fn proton_shift_lands_between_two_points_with_unit_integral() {
    let system = SpinSystem::new(vec![Site::new("1H", 10.0)]);
    let method = one_dim("1H", SpectralDimension::new(1024, 10_000.0, 0.0), Event::default());
    let output = simulate(&[system], &method, &config(10)).unwrap();

    let values = real(&output.spectra[0].data);
    assert_abs_diff_eq!(values.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    assert_eq!(values.iter().filter(|v| **v > 0.0).count(), 2);
    let peak = values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(index, _)| index)
        .unwrap();
    assert!(peak == 921 || peak == 922, "peak at {peak}");
    assert_abs_diff_eq!(first_moment(&output), 10.0 * larmor("1H") * 1e-6, epsilon = 1e-6);
}

#[test]
fn axial_static_csa_has_horn_and_sqrt_two_density_ratio() {
    let (zeta, nu0) = (100.0, larmor("13C"));
    let site = Site::new("13C", 0.0).with_shielding(SymmetricTensor::new(zeta, 0.0).unwrap());
    let method = one_dim("13C", SpectralDimension::new(1024, 40_000.0, 0.0), Event::default());
    let config = SimulatorConfig {
        interpolation: Interpolation::Triangle,
        ..config(64)
    };
    let output = simulate(&[SpinSystem::new(vec![site])], &method, &config).unwrap();
    let values = real(&output.spectra[0].data);
    let coordinates = &output.axes[0].coordinates;
    let increment = method.spectral_dimensions[0].increment();
    assert_abs_diff_eq!(values.iter().sum::<f64>(), 1.0, epsilon = 1e-9);

    let horn = 0.5 * zeta * nu0 * 1e-6;
    let edge = -zeta * nu0 * 1e-6;
    let peak = values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(index, _)| index)
        .unwrap();
    assert!((coordinates[peak] - horn).abs() <= 2.0 * increment);

    let outside: f64 = values
        .iter()
        .zip(coordinates)
        .filter(|(_, f)| **f > horn + 2.0 * increment || **f < edge - 2.0 * increment)
        .map(|(v, _)| *v)
        .sum();
    assert!(outside.abs() < 1e-12);

    let centre = mean_around(&values, coordinates, 0.0, 2);
    let shoulder = mean_around(&values, coordinates, -horn, 2);
    assert_relative_eq!(centre / shoulder, 2.0_f64.sqrt(), max_relative = 0.05);
}

#[test]
fn magic_angle_spinning_keeps_the_isotropic_first_moment() {
    let shift = 50.0;
    let site = Site::new("13C", shift).with_shielding(SymmetricTensor::new(100.0, 0.4).unwrap());
    let method = one_dim(
        "13C",
        SpectralDimension::new(2048, 80_000.0, 5_000.0),
        Event::default().with_rotor_frequency(2_000.0),
    );
    let output = simulate(&[SpinSystem::new(vec![site])], &method, &config(16)).unwrap();
    let values = real(&output.spectra[0].data);
    let coordinates = &output.axes[0].coordinates;
    let centre = shift * larmor("13C") * 1e-6;

    // Sideband power sums to one per orientation.
    assert_abs_diff_eq!(values.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(first_moment(&output), centre, epsilon = 0.5);
    // First-order sidebands are visible.
    assert!(mean_around(&values, coordinates, centre + 2_000.0, 1) > 1e-3);
    assert!(mean_around(&values, coordinates, centre - 2_000.0, 1) > 1e-3);
}

#[test]
fn infinite_spinning_collapses_the_anisotropy() {
    let shift = -20.0;
    let site = Site::new("13C", shift).with_shielding(SymmetricTensor::new(150.0, 0.7).unwrap());
    let method = one_dim(
        "13C",
        SpectralDimension::new(1024, 20_000.0, 0.0),
        Event::default().with_rotor_frequency(f64::INFINITY),
    );
    let output = simulate(&[SpinSystem::new(vec![site])], &method, &config(12)).unwrap();
    let values = real(&output.spectra[0].data);
    assert!(values.iter().filter(|v| v.abs() > 1e-9).count() <= 2);
    assert_abs_diff_eq!(values.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(first_moment(&output), shift * larmor("13C") * 1e-6, epsilon = 1e-6);
}

#[test]
fn sodium_central_transition_centroid_is_the_quadrupolar_shift() {
    let cq = 2.0e6;
    let site = Site::new("23Na", 0.0).with_quadrupolar(SymmetricTensor::new(cq, 0.0).unwrap());
    let params = MethodParams::new("23Na", vec![DimensionParams::new(2048, 20_000.0, 0.0)])
        .with_rotor_frequency(f64::INFINITY);
    let method = MethodTemplate::BlochDecayCentralTransitionSpectrum
        .build(&params)
        .unwrap();
    let output = simulate(&[SpinSystem::new(vec![site])], &method, &config(70)).unwrap();

    let expected = -0.025 * cq * cq / larmor("23Na");
    assert_abs_diff_eq!(expected, -944.6, epsilon = 1.0);
    assert_abs_diff_eq!(first_moment(&output), expected, epsilon = 5.0);
}

#[test]
fn three_quantum_shear_gives_a_narrow_isotropic_dimension() {
    let site =
        Site::new("23Na", 0.0).with_quadrupolar(SymmetricTensor::new(3.0e6, 0.3).unwrap());
    let params = MethodParams::new(
        "23Na",
        vec![
            DimensionParams::new(256, 20_000.0, 0.0),
            DimensionParams::new(256, 20_000.0, 0.0),
        ],
    );
    let method = MethodTemplate::ThreeQVas.build(&params).unwrap();
    let output = simulate(&[SpinSystem::new(vec![site])], &method, &config(30)).unwrap();
    let data = &output.spectra[0].data;
    assert_eq!(data.shape(), &[256, 256]);

    let isotropic = real(&data.sum_axis(ArrayAxis(1)));
    let anisotropic = real(&data.sum_axis(ArrayAxis(0)));
    let total: f64 = isotropic.iter().sum();
    assert_abs_diff_eq!(total, 1.0, epsilon = 1e-6);

    let best_pair = isotropic
        .windows(2)
        .map(|pair| pair[0] + pair[1])
        .fold(0.0_f64, f64::max);
    assert!(best_pair > 0.999_999 * total);

    let strongest = anisotropic.iter().cloned().fold(0.0_f64, f64::max);
    let occupied = anisotropic.iter().filter(|v| **v > 1e-3 * strongest).count();
    assert!(occupied >= 10, "central transition spans only {occupied} points");
}

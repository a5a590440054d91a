use approx::assert_relative_eq;
use nmr_core::errors::NmrError;
use nmr_method::{
    from_yaml_slice, to_yaml_string, DimensionParams, Method, MethodParams, MethodTemplate,
    SymmetryQuery, TransitionQuery, MAGIC_ANGLE,
};

#[test]
fn bloch_decay_uses_user_geometry() {
    let params = MethodParams::new("13C", vec![DimensionParams::new(512, 4e4, 0.0)])
        .with_magnetic_flux_density(9.4)
        .with_rotor_frequency(5000.0)
        .with_rotor_angle(0.0);
    let method = MethodTemplate::BlochDecaySpectrum.build(&params).unwrap();
    assert_eq!(method.name, "BlochDecaySpectrum");
    assert_eq!(method.channels, vec!["13C".to_string()]);
    let event = &method.spectral_dimensions[0].events[0];
    assert_eq!(event.rotor_frequency, 5000.0);
    assert_eq!(event.rotor_angle, 0.0);
    assert_eq!(event.transition_queries, vec![TransitionQuery::p(vec![-1])]);
}

#[test]
fn central_transition_template_adds_satellite_constraint() {
    let params = MethodParams::new("27Al", vec![DimensionParams::default()]);
    let method = MethodTemplate::BlochDecayCentralTransitionSpectrum
        .build(&params)
        .unwrap();
    let query = method.spectral_dimensions[0].events[0].transition_queries[0]
        .channel(0)
        .cloned()
        .unwrap();
    assert_eq!(query, SymmetryQuery::new(vec![-1]).with_d(vec![0]));
}

#[test]
fn channel_count_mismatch_is_a_configuration_error() {
    let mut params = MethodParams::new("13C", vec![DimensionParams::default()]);
    params.channels = Some(vec!["13C".into(), "1H".into()]);
    let err = MethodTemplate::BlochDecaySpectrum.build(&params).unwrap_err();
    assert!(matches!(err, NmrError::Configuration(_)));
    assert_eq!(
        err.info().message,
        "the method requires exactly 1 channel(s), 2 provided"
    );
}

#[test]
fn missing_channels_default_to_protons() {
    let method = MethodTemplate::BlochDecaySpectrum
        .build(&MethodParams::default())
        .unwrap();
    assert_eq!(method.channels, vec!["1H".to_string()]);
    assert_eq!(method.spectral_dimensions[0].count, 1024);
}

#[test]
fn too_many_dimensions_are_rejected() {
    let params = MethodParams::new(
        "13C",
        vec![DimensionParams::default(), DimensionParams::default()],
    );
    let err = MethodTemplate::BlochDecaySpectrum.build(&params).unwrap_err();
    assert_eq!(err.info().code, "too-many-dimensions");
}

#[test]
fn triple_quantum_fixes_spinning_geometry() {
    let params = MethodParams::new(
        "87Rb",
        vec![DimensionParams::new(128, 1e4, 0.0), DimensionParams::new(256, 2e4, 0.0)],
    );
    let method = MethodTemplate::ThreeQVas.build(&params).unwrap();
    assert_eq!(method.ndim(), 2);
    for dim in &method.spectral_dimensions {
        assert!(dim.events[0].is_infinite_spinning());
        assert_eq!(dim.events[0].rotor_angle, MAGIC_ANGLE);
    }
    let affine = method.affine_rows().unwrap();
    let k = 7.0 / 9.0;
    assert_relative_eq!(affine[0][0], 1.0 / (1.0 + k), epsilon = 1e-12);
    assert_relative_eq!(affine[0][1], k / (1.0 + k), epsilon = 1e-12);
    assert_eq!(affine[1], vec![0.0, 1.0]);
}

#[test]
fn triple_quantum_rejects_overrides() {
    let params = MethodParams::new("23Na", vec![]).with_rotor_angle(0.5);
    let err = MethodTemplate::ThreeQVas.build(&params).unwrap_err();
    assert_eq!(err.info().code, "fixed-event-attribute");
    assert!(err.info().message.contains("rotor_angle"));

    let params = MethodParams::new("23Na", vec![]).with_rotor_frequency(1e4);
    assert!(MethodTemplate::ThreeQVas.build(&params).is_err());
}

#[test]
fn triple_quantum_on_spin_half_is_rejected() {
    let params = MethodParams::new("13C", vec![]);
    let err = MethodTemplate::ThreeQVas.build(&params).unwrap_err();
    assert_eq!(err.info().code, "unsupported-channel-isotope");
}

#[test]
fn methods_roundtrip_through_yaml() {
    let params = MethodParams::new("23Na", vec![DimensionParams::new(64, 1e4, 100.0)]);
    let method = MethodTemplate::ThreeQVas.build(&params).unwrap();
    let yaml = to_yaml_string(&method).unwrap();
    let restored: Method = from_yaml_slice(yaml.as_bytes()).unwrap();
    assert_eq!(restored, method);
}

#[test]
fn templates_deserialize_by_name() {
    let template: MethodTemplate = from_yaml_slice(b"ThreeQ_VAS").unwrap();
    assert_eq!(template, MethodTemplate::ThreeQVas);
}

//! Named experiment factories.
//!
//! A [`MethodTemplate`] fixes the transition pathway of every event and, for some
//! experiments, global event attributes such as the rotor angle. User supplied
//! [`MethodParams`] fill in everything else. Attempts to override a fixed
//! attribute are rejected rather than silently ignored.

use nmr_core::errors::NmrError;
use nmr_core::isotope::Isotope;
use nmr_core::spin::fourth_rank_transition_function;
use serde::{Deserialize, Serialize};

use crate::dimension::SpectralDimension;
use crate::event::{Event, MAGIC_ANGLE};
use crate::method::Method;
use crate::query::TransitionQuery;

fn template_error(code: &str, message: impl Into<String>) -> NmrError {
    NmrError::configuration(code, message)
}

fn default_count() -> usize {
    1024
}

fn default_spectral_width() -> f64 {
    25_000.0
}

/// Grid parameters for one dimension of a templated method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionParams {
    /// Number of grid points.
    #[serde(default = "default_count")]
    pub count: usize,
    /// Spectral width in Hz.
    #[serde(default = "default_spectral_width")]
    pub spectral_width: f64,
    /// Reference offset in Hz.
    #[serde(default)]
    pub reference_offset: f64,
    /// Optional axis label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Default for DimensionParams {
    fn default() -> Self {
        Self {
            count: default_count(),
            spectral_width: default_spectral_width(),
            reference_offset: 0.0,
            label: None,
        }
    }
}

impl DimensionParams {
    /// Grid with the given count, width and offset.
    pub fn new(count: usize, spectral_width: f64, reference_offset: f64) -> Self {
        Self {
            count,
            spectral_width,
            reference_offset,
            label: None,
        }
    }
}

/// User supplied parameters for a named experiment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MethodParams {
    /// Overrides the template name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Overrides the template description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Channel isotopes; defaults to `1H` on every template channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<String>>,
    /// Static field applied to every event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnetic_flux_density: Option<f64>,
    /// Spinning frequency applied to every event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotor_frequency: Option<f64>,
    /// Rotor angle applied to every event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotor_angle: Option<f64>,
    /// Per-dimension grids; missing trailing dimensions use defaults.
    #[serde(default)]
    pub spectral_dimensions: Vec<DimensionParams>,
    /// Overrides the template's affine matrix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affine_matrix: Option<Vec<f64>>,
}

impl MethodParams {
    /// Parameters observing `channel` with the given dimensions.
    pub fn new(channel: impl Into<String>, spectral_dimensions: Vec<DimensionParams>) -> Self {
        Self {
            channels: Some(vec![channel.into()]),
            spectral_dimensions,
            ..Self::default()
        }
    }

    /// Sets the static field.
    pub fn with_magnetic_flux_density(mut self, value: f64) -> Self {
        self.magnetic_flux_density = Some(value);
        self
    }

    /// Sets the spinning frequency.
    pub fn with_rotor_frequency(mut self, value: f64) -> Self {
        self.rotor_frequency = Some(value);
        self
    }

    /// Sets the rotor angle.
    pub fn with_rotor_angle(mut self, value: f64) -> Self {
        self.rotor_angle = Some(value);
        self
    }
}

/// Built-in experiments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodTemplate {
    /// One-pulse acquisition of every single-quantum transition.
    BlochDecaySpectrum,
    /// One-pulse acquisition restricted to the symmetric (central) transitions.
    BlochDecayCentralTransitionSpectrum,
    /// Triple-quantum variable-angle spinning, sheared to an isotropic dimension.
    #[serde(rename = "ThreeQ_VAS")]
    ThreeQVas,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FixedAttribute {
    RotorFrequency,
    RotorAngle,
}

impl FixedAttribute {
    fn name(self) -> &'static str {
        match self {
            FixedAttribute::RotorFrequency => "rotor_frequency",
            FixedAttribute::RotorAngle => "rotor_angle",
        }
    }
}

impl MethodTemplate {
    /// Canonical name of the experiment.
    pub fn name(&self) -> &'static str {
        match self {
            MethodTemplate::BlochDecaySpectrum => "BlochDecaySpectrum",
            MethodTemplate::BlochDecayCentralTransitionSpectrum => {
                "BlochDecayCentralTransitionSpectrum"
            }
            MethodTemplate::ThreeQVas => "ThreeQ_VAS",
        }
    }

    /// Human readable description.
    pub fn description(&self) -> &'static str {
        match self {
            MethodTemplate::BlochDecaySpectrum => "Simulate a 1D Bloch decay spectrum.",
            MethodTemplate::BlochDecayCentralTransitionSpectrum => {
                "Simulate a 1D Bloch decay central transition selective spectrum."
            }
            MethodTemplate::ThreeQVas => {
                "Simulate a sheared triple-quantum variable-angle spinning spectrum."
            }
        }
    }

    /// Number of channels the experiment observes.
    pub fn number_of_channels(&self) -> usize {
        1
    }

    /// Transition queries for each spectral dimension (one event each).
    fn dimension_queries(&self) -> Vec<TransitionQuery> {
        match self {
            MethodTemplate::BlochDecaySpectrum => vec![TransitionQuery::p(vec![-1])],
            MethodTemplate::BlochDecayCentralTransitionSpectrum => {
                vec![TransitionQuery::pd(vec![-1], vec![0])]
            }
            MethodTemplate::ThreeQVas => vec![
                TransitionQuery::pd(vec![-3], vec![0]),
                TransitionQuery::pd(vec![-1], vec![0]),
            ],
        }
    }

    /// Maximum number of spectral dimensions.
    pub fn max_dimensions(&self) -> usize {
        self.dimension_queries().len()
    }

    fn fixed_attributes(&self) -> &'static [FixedAttribute] {
        match self {
            MethodTemplate::ThreeQVas => &[FixedAttribute::RotorFrequency, FixedAttribute::RotorAngle],
            _ => &[],
        }
    }

    fn check_overrides(&self, params: &MethodParams) -> Result<(), NmrError> {
        for attribute in self.fixed_attributes() {
            let overridden = match attribute {
                FixedAttribute::RotorFrequency => params.rotor_frequency.is_some(),
                FixedAttribute::RotorAngle => params.rotor_angle.is_some(),
            };
            if overridden {
                return Err(template_error(
                    "fixed-event-attribute",
                    format!(
                        "`{}` value cannot be modified for {} method",
                        attribute.name(),
                        self.name()
                    ),
                )
                .with_context("attribute", attribute.name()));
            }
        }
        Ok(())
    }

    fn resolve_channels(&self, params: &MethodParams) -> Result<Vec<String>, NmrError> {
        let expected = self.number_of_channels();
        match &params.channels {
            Some(channels) if channels.len() != expected => Err(template_error(
                "channel-count-mismatch",
                format!(
                    "the method requires exactly {expected} channel(s), {} provided",
                    channels.len()
                ),
            )
            .with_context("method", self.name())),
            Some(channels) => Ok(channels.clone()),
            None => Ok(vec!["1H".to_string(); expected]),
        }
    }

    fn template_event(&self, query: TransitionQuery, params: &MethodParams) -> Event {
        let mut event = Event::default().with_query(query);
        if let Some(b0) = params.magnetic_flux_density {
            event.magnetic_flux_density = b0;
        }
        match self {
            MethodTemplate::ThreeQVas => {
                event.rotor_frequency = f64::INFINITY;
                event.rotor_angle = MAGIC_ANGLE;
            }
            _ => {
                if let Some(rotor_frequency) = params.rotor_frequency {
                    event.rotor_frequency = rotor_frequency;
                }
                if let Some(rotor_angle) = params.rotor_angle {
                    event.rotor_angle = rotor_angle;
                }
            }
        }
        event
    }

    fn default_affine(&self, channels: &[String]) -> Result<Option<Vec<f64>>, NmrError> {
        match self {
            MethodTemplate::ThreeQVas => {
                let isotope = Isotope::parse(&channels[0])?;
                let k = multiple_quantum_shear(&isotope, 3)?;
                let scale = 1.0 + k.abs();
                Ok(Some(vec![1.0 / scale, k / scale, 0.0, 1.0]))
            }
            _ => Ok(None),
        }
    }

    /// Builds and validates the method.
    pub fn build(&self, params: &MethodParams) -> Result<Method, NmrError> {
        self.check_overrides(params)?;
        let channels = self.resolve_channels(params)?;

        let queries = self.dimension_queries();
        if params.spectral_dimensions.len() > queries.len() {
            return Err(template_error(
                "too-many-dimensions",
                format!(
                    "the method allows {} spectral dimension(s), {} given",
                    queries.len(),
                    params.spectral_dimensions.len()
                ),
            )
            .with_context("method", self.name()));
        }

        let spectral_dimensions = queries
            .into_iter()
            .enumerate()
            .map(|(index, query)| {
                let grid = params
                    .spectral_dimensions
                    .get(index)
                    .cloned()
                    .unwrap_or_default();
                let mut dim = SpectralDimension::new(grid.count, grid.spectral_width, grid.reference_offset)
                    .with_events(vec![self.template_event(query, params)]);
                dim.label = grid.label;
                dim
            })
            .collect();

        let affine_matrix = match &params.affine_matrix {
            Some(matrix) => Some(matrix.clone()),
            None => self.default_affine(&channels)?,
        };

        let method = Method {
            name: params.name.clone().unwrap_or_else(|| self.name().to_string()),
            description: Some(
                params
                    .description
                    .clone()
                    .unwrap_or_else(|| self.description().to_string()),
            ),
            label: params.label.clone(),
            channels,
            spectral_dimensions,
            affine_matrix,
        };
        method.validate()?;
        Ok(method)
    }
}

/// Shear factor `k = -c4(p) / c4(CT)` that cancels the fourth-rank anisotropy of
/// a symmetric `p`-quantum transition against the central transition.
pub fn multiple_quantum_shear(isotope: &Isotope, coherence: u32) -> Result<f64, NmrError> {
    let two_spin = isotope.two_spin();
    if two_spin % 2 == 0 || coherence % 2 == 0 || two_spin < coherence {
        return Err(template_error(
            "unsupported-channel-isotope",
            format!("{coherence}-quantum shear needs a half-integer spin of at least {coherence}/2"),
        )
        .with_context("isotope", isotope.symbol()));
    }
    // A symmetric p-quantum transition runs from m = p/2 to m = -p/2.
    let two_m = coherence as i32;
    let multiple = fourth_rank_transition_function(two_spin, two_m, -two_m);
    let central = fourth_rank_transition_function(two_spin, 1, -1);
    Ok(-multiple / central)
}

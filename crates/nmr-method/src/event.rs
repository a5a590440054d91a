//! Acquisition events.

use nmr_core::errors::NmrError;
use serde::{Deserialize, Serialize};

use crate::query::TransitionQuery;

/// The magic angle `acos(1/√3)` in radians.
pub const MAGIC_ANGLE: f64 = 0.955_316_618_124_509_3;

fn default_fraction() -> f64 {
    1.0
}

fn default_magnetic_flux_density() -> f64 {
    9.4
}

fn default_rotor_angle() -> f64 {
    MAGIC_ANGLE
}

fn default_transition_queries() -> Vec<TransitionQuery> {
    vec![TransitionQuery::p(vec![-1])]
}

/// A period of evolution contributing `fraction` of its frequency to the
/// enclosing spectral dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Weight of this event's frequency within its dimension.
    #[serde(default = "default_fraction")]
    pub fraction: f64,
    /// Static field B0 in tesla.
    #[serde(default = "default_magnetic_flux_density")]
    pub magnetic_flux_density: f64,
    /// Sample spinning frequency in Hz; `inf` selects infinite-speed spinning.
    #[serde(default, with = "rotor_frequency_serde")]
    pub rotor_frequency: f64,
    /// Angle between the rotor axis and B0 in radians.
    #[serde(default = "default_rotor_angle")]
    pub rotor_angle: f64,
    /// Alternative selections; a transition is kept when it matches any of them.
    #[serde(default = "default_transition_queries")]
    pub transition_queries: Vec<TransitionQuery>,
}

impl Default for Event {
    fn default() -> Self {
        Self {
            fraction: default_fraction(),
            magnetic_flux_density: default_magnetic_flux_density(),
            rotor_frequency: 0.0,
            rotor_angle: default_rotor_angle(),
            transition_queries: default_transition_queries(),
        }
    }
}

impl Event {
    /// Replaces the transition queries with a single one.
    pub fn with_query(mut self, query: TransitionQuery) -> Self {
        self.transition_queries = vec![query];
        self
    }

    /// Sets the spinning frequency.
    pub fn with_rotor_frequency(mut self, rotor_frequency: f64) -> Self {
        self.rotor_frequency = rotor_frequency;
        self
    }

    /// Sets the rotor angle.
    pub fn with_rotor_angle(mut self, rotor_angle: f64) -> Self {
        self.rotor_angle = rotor_angle;
        self
    }

    /// Sets the static field.
    pub fn with_magnetic_flux_density(mut self, magnetic_flux_density: f64) -> Self {
        self.magnetic_flux_density = magnetic_flux_density;
        self
    }

    /// Sets the fraction.
    pub fn with_fraction(mut self, fraction: f64) -> Self {
        self.fraction = fraction;
        self
    }

    /// Whether the sample is static.
    pub fn is_static(&self) -> bool {
        self.rotor_frequency == 0.0
    }

    /// Whether the sample spins at infinite speed.
    pub fn is_infinite_spinning(&self) -> bool {
        self.rotor_frequency.is_infinite()
    }

    /// Checks numeric fields and channel references.
    pub fn validate(&self, channel_count: usize) -> Result<(), NmrError> {
        if !self.fraction.is_finite() {
            return Err(NmrError::configuration(
                "non-finite-fraction",
                "event fraction must be finite",
            ));
        }
        if !self.magnetic_flux_density.is_finite() || self.magnetic_flux_density < 0.0 {
            return Err(NmrError::configuration(
                "invalid-magnetic-flux-density",
                "magnetic flux density must be finite and non-negative",
            )
            .with_context("magnetic_flux_density", self.magnetic_flux_density));
        }
        if self.rotor_frequency.is_nan() || self.rotor_frequency < 0.0 {
            return Err(NmrError::configuration(
                "invalid-rotor-frequency",
                "rotor frequency must be non-negative",
            )
            .with_context("rotor_frequency", self.rotor_frequency));
        }
        if !self.rotor_angle.is_finite() {
            return Err(NmrError::configuration(
                "invalid-rotor-angle",
                "rotor angle must be finite",
            ));
        }
        if self.transition_queries.is_empty() {
            return Err(NmrError::configuration(
                "empty-transition-queries",
                "an event needs at least one transition query",
            ));
        }
        for (index, query) in self.transition_queries.iter().enumerate() {
            query
                .validate(channel_count)
                .map_err(|err| err.with_context("query", index))?;
        }
        Ok(())
    }
}

mod rotor_frequency_serde {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() && value.is_sign_positive() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "inf" | "+inf" | "infinity" | ".inf" => Ok(f64::INFINITY),
                other => other
                    .parse::<f64>()
                    .map_err(|_| D::Error::custom(format!("invalid rotor frequency `{other}`"))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinite_spinning_roundtrips_through_json() {
        let event = Event::default().with_rotor_frequency(f64::INFINITY);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"rotor_frequency\":\"inf\""));
        let restored: Event = serde_json::from_str(&json).unwrap();
        assert!(restored.is_infinite_spinning());
    }

    #[test]
    fn defaults_select_single_quantum_on_first_channel() {
        let event: Event = serde_json::from_str("{}").unwrap();
        assert_eq!(event, Event::default());
        assert!(event.is_static());
    }

    #[test]
    fn negative_rotor_frequency_is_rejected() {
        let event = Event::default().with_rotor_frequency(-5.0);
        assert!(matches!(event.validate(1), Err(NmrError::Configuration(_))));
    }
}

//! Spectral dimensions and their frequency grids.

use nmr_core::errors::NmrError;
use serde::{Deserialize, Serialize};

use crate::event::Event;

fn default_count() -> usize {
    1024
}

fn default_spectral_width() -> f64 {
    25_000.0
}

fn default_events() -> Vec<Event> {
    vec![Event::default()]
}

fn dimension_error(code: &str, message: impl Into<String>) -> NmrError {
    NmrError::configuration(code, message)
}

/// One axis of the output spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralDimension {
    /// Number of grid points.
    #[serde(default = "default_count")]
    pub count: usize,
    /// Spectral width in Hz.
    #[serde(default = "default_spectral_width")]
    pub spectral_width: f64,
    /// Frequency of the reference point in Hz.
    #[serde(default)]
    pub reference_offset: f64,
    /// Optional axis label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Events whose fractional frequencies sum into this dimension.
    #[serde(default = "default_events")]
    pub events: Vec<Event>,
}

impl Default for SpectralDimension {
    fn default() -> Self {
        Self {
            count: default_count(),
            spectral_width: default_spectral_width(),
            reference_offset: 0.0,
            label: None,
            events: default_events(),
        }
    }
}

impl SpectralDimension {
    /// Dimension with a single default event.
    pub fn new(count: usize, spectral_width: f64, reference_offset: f64) -> Self {
        Self {
            count,
            spectral_width,
            reference_offset,
            ..Self::default()
        }
    }

    /// Replaces the event list.
    pub fn with_events(mut self, events: Vec<Event>) -> Self {
        self.events = events;
        self
    }

    /// Sets the axis label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Grid spacing `Δ = spectral_width / count`.
    pub fn increment(&self) -> f64 {
        self.spectral_width / self.count as f64
    }

    /// Index of the reference point: `count/2` when even, `(count-1)/2` when odd.
    pub fn reference_index(&self) -> usize {
        if self.count % 2 == 0 {
            self.count / 2
        } else {
            (self.count - 1) / 2
        }
    }

    /// Frequency of grid point `index` in Hz.
    pub fn coordinate(&self, index: usize) -> f64 {
        self.reference_offset + (index as f64 - self.reference_index() as f64) * self.increment()
    }

    /// All grid frequencies in Hz.
    pub fn coordinates(&self) -> Vec<f64> {
        (0..self.count).map(|index| self.coordinate(index)).collect()
    }

    /// Fractional grid position of a frequency; integral values land on points.
    pub fn position(&self, frequency: f64) -> f64 {
        (frequency - self.reference_offset) / self.increment() + self.reference_index() as f64
    }

    /// Spinning frequency shared by every event of the dimension.
    pub fn rotor_frequency(&self) -> f64 {
        self.events.first().map(|event| event.rotor_frequency).unwrap_or(0.0)
    }

    /// Validates the grid and every event.
    pub fn validate(&self, channel_count: usize) -> Result<(), NmrError> {
        if self.count == 0 {
            return Err(dimension_error(
                "empty-dimension",
                "spectral dimension count must be positive",
            )
            .with_hint("set count to at least 1"));
        }
        if !(self.spectral_width.is_finite() && self.spectral_width > 0.0) {
            return Err(dimension_error(
                "invalid-spectral-width",
                "spectral width must be a positive finite frequency",
            )
            .with_context("spectral_width", self.spectral_width));
        }
        if !self.reference_offset.is_finite() {
            return Err(dimension_error(
                "invalid-reference-offset",
                "reference offset must be finite",
            ));
        }
        if self.events.is_empty() {
            return Err(dimension_error(
                "missing-events",
                "spectral dimension needs at least one event",
            ));
        }
        let rotor_frequency = self.rotor_frequency();
        for (index, event) in self.events.iter().enumerate() {
            event
                .validate(channel_count)
                .map_err(|err| err.with_context("event", index))?;
            if event.rotor_frequency != rotor_frequency {
                return Err(dimension_error(
                    "inconsistent-rotor-frequency",
                    "all events of a spectral dimension must share one rotor frequency",
                )
                .with_context("event", index)
                .with_context("expected", rotor_frequency)
                .with_context("found", event.rotor_frequency));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn even_grid_puts_reference_at_half_count() {
        let dim = SpectralDimension::new(4, 100.0, 10.0);
        assert_eq!(dim.coordinates(), vec![-40.0, -15.0, 10.0, 35.0]);
    }

    #[test]
    fn odd_grid_is_centred() {
        let dim = SpectralDimension::new(5, 50.0, 0.0);
        assert_eq!(dim.coordinates(), vec![-20.0, -10.0, 0.0, 10.0, 20.0]);
        assert_relative_eq!(dim.position(15.0), 3.5);
    }

    #[test]
    fn mixed_rotor_frequencies_are_rejected() {
        let dim = SpectralDimension::default().with_events(vec![
            Event::default().with_fraction(0.5),
            Event::default().with_fraction(0.5).with_rotor_frequency(1000.0),
        ]);
        let err = dim.validate(1).unwrap_err();
        assert_eq!(err.info().code, "inconsistent-rotor-frequency");
    }
}

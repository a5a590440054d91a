use nmr_core::errors::NmrError;
use nmr_powder::IntegrationVolume;
use serde::{Deserialize, Serialize};

use crate::accumulator::Interpolation;

/// Which spectra a run returns in addition to (or instead of) the combined one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decompose {
    /// One spectrum summed over every spin system and pathway.
    #[default]
    None,
    /// One spectrum per spin system.
    SpinSystem,
    /// One spectrum per (spin system, transition pathway).
    TransitionPathway,
}

/// YAML-configurable knobs of the powder averaging run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Region of the sphere sampled by the orientation scheme.
    #[serde(default)]
    pub integration_volume: IntegrationVolume,
    /// Segments per octahedron edge.
    #[serde(default = "default_integration_density")]
    pub integration_density: u32,
    /// Samples per rotor period; must be a power of two.
    #[serde(default = "default_number_of_sidebands")]
    pub number_of_sidebands: usize,
    /// Spectrum decomposition mode.
    #[serde(default)]
    pub decompose_spectrum: Decompose,
    /// Line deposition mode.
    #[serde(default)]
    pub interpolation: Interpolation,
    /// Relative intensity below which sidebands are dropped.
    #[serde(default)]
    pub sideband_threshold: f64,
    /// Orientations per work unit.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Worker threads; `1` runs on a single thread.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_integration_density() -> u32 {
    70
}

fn default_number_of_sidebands() -> usize {
    64
}

fn default_batch_size() -> usize {
    256
}

fn default_workers() -> usize {
    1
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            integration_volume: IntegrationVolume::default(),
            integration_density: default_integration_density(),
            number_of_sidebands: default_number_of_sidebands(),
            decompose_spectrum: Decompose::default(),
            interpolation: Interpolation::default(),
            sideband_threshold: 0.0,
            batch_size: default_batch_size(),
            workers: default_workers(),
        }
    }
}

impl SimulatorConfig {
    /// Checks the knobs that do not depend on the method.
    pub fn validate(&self) -> Result<(), NmrError> {
        if self.number_of_sidebands == 0 || !self.number_of_sidebands.is_power_of_two() {
            return Err(NmrError::invalid(
                "sideband-count-not-power-of-two",
                "number of sidebands must be a positive power of two",
            )
            .with_context("number_of_sidebands", self.number_of_sidebands));
        }
        if !self.sideband_threshold.is_finite() || self.sideband_threshold < 0.0 {
            return Err(NmrError::invalid(
                "invalid-sideband-threshold",
                "sideband threshold must be finite and non-negative",
            ));
        }
        if self.batch_size == 0 {
            return Err(NmrError::configuration(
                "empty-batch",
                "batch size must be positive",
            ));
        }
        if self.workers == 0 {
            return Err(NmrError::configuration(
                "no-workers",
                "at least one worker thread is required",
            ));
        }
        if self.interpolation == Interpolation::Triangle && self.integration_density == 0 {
            return Err(NmrError::configuration(
                "triangle-interpolation-resolution",
                "triangle interpolation needs an integration density of at least 1",
            ));
        }
        Ok(())
    }
}

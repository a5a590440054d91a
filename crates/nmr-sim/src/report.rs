//! Simulation output and provenance.

use std::collections::BTreeMap;

use ndarray::ArrayD;
use nmr_core::errors::NmrError;
use nmr_core::provenance::{RunProvenance, SchemaVersion};
use nmr_core::spin_system::SpinSystem;
use nmr_method::{stable_hash_string, Method, SpectralDimension};
use nmr_powder::IntegrationVolume;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::config::SimulatorConfig;
use crate::transitions::Transition;

/// Frequency axis of one spectral dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    /// Optional label copied from the dimension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Grid frequencies in Hz.
    pub coordinates: Vec<f64>,
}

impl Axis {
    pub(crate) fn from_dimension(dim: &SpectralDimension) -> Self {
        Self {
            label: dim.label.clone(),
            coordinates: dim.coordinates(),
        }
    }
}

/// A spectrum together with what it covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelledSpectrum {
    /// Human readable label.
    pub label: String,
    /// Spin system index, for decomposed spectra.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spin_system: Option<usize>,
    /// One transition per event, for pathway-resolved spectra.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pathway: Option<Vec<Transition>>,
    /// Grid values.
    pub data: ArrayD<Complex64>,
}

/// Inputs, counts and hashes describing a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputProvenance {
    /// Schema, input hashes and commit.
    pub run: RunProvenance,
    /// Sampled region of the sphere.
    pub integration_volume: IntegrationVolume,
    /// Segments per octahedron edge.
    pub integration_density: u32,
    /// Number of crystallite orientations.
    pub orientation_count: usize,
    /// Number of transition pathways over all spin systems.
    pub pathway_count: usize,
    /// Hash of the returned spectra after rounding to 1e-9.
    pub spectrum_hash: String,
}

/// Result of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    /// One axis per spectral dimension.
    pub axes: Vec<Axis>,
    /// Combined or decomposed spectra; decomposed spectra sum to the combined one.
    pub spectra: Vec<LabelledSpectrum>,
    /// Provenance record.
    pub provenance: OutputProvenance,
}

impl SimulationOutput {
    /// Sum of every returned spectrum.
    pub fn combined(&self) -> Option<ArrayD<Complex64>> {
        let mut spectra = self.spectra.iter();
        let first = spectra.next()?.data.clone();
        Some(spectra.fold(first, |acc, spectrum| acc + &spectrum.data))
    }
}

pub(crate) fn commit_string() -> String {
    option_env!("GIT_COMMIT_HASH")
        .or_else(|| option_env!("VERGEN_GIT_SHA"))
        .map(|value| value.to_string())
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
}

fn tool_versions() -> BTreeMap<String, String> {
    let mut versions = BTreeMap::new();
    versions.insert("nmr-sim".to_string(), env!("CARGO_PKG_VERSION").to_string());
    versions
}

/// Hash of spectra values rounded to 1e-9.
pub fn spectrum_hash(spectra: &[LabelledSpectrum]) -> Result<String, NmrError> {
    let points: Vec<(&str, Vec<[f64; 2]>)> = spectra
        .iter()
        .map(|spectrum| {
            (
                spectrum.label.as_str(),
                spectrum
                    .data
                    .iter()
                    .map(|value| [value.re, value.im])
                    .collect(),
            )
        })
        .collect();
    stable_hash_string(&points)
}

pub(crate) struct ProvenanceInputs<'a> {
    pub spin_systems: &'a [SpinSystem],
    pub method: &'a Method,
    pub config: &'a SimulatorConfig,
    pub orientation_count: usize,
    pub pathway_count: usize,
}

pub(crate) fn build_output(
    inputs: ProvenanceInputs<'_>,
    spectra: Vec<LabelledSpectrum>,
) -> Result<SimulationOutput, NmrError> {
    let run = RunProvenance {
        schema_version: SchemaVersion::CURRENT,
        spin_systems_hash: stable_hash_string(&inputs.spin_systems)?,
        method_hash: stable_hash_string(inputs.method)?,
        config_hash: stable_hash_string(inputs.config)?,
        commit: commit_string(),
        tool_versions: tool_versions(),
    };
    let provenance = OutputProvenance {
        run,
        integration_volume: inputs.config.integration_volume,
        integration_density: inputs.config.integration_density,
        orientation_count: inputs.orientation_count,
        pathway_count: inputs.pathway_count,
        spectrum_hash: spectrum_hash(&spectra)?,
    };
    Ok(SimulationOutput {
        axes: inputs
            .method
            .spectral_dimensions
            .iter()
            .map(Axis::from_dimension)
            .collect(),
        spectra,
        provenance,
    })
}

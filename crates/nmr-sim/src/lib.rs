#![deny(missing_docs)]
#![doc = "Powder-averaged solid-state NMR spectrum simulation."]

/// Spectral grids and line deposition.
pub mod accumulator;
/// Simulator knobs.
pub mod config;
/// Batched parallel run driver.
pub mod engine;
/// Radix-2 FFT.
pub mod fft;
/// Transition frequency series.
pub mod frequency;
/// YAML simulation plans.
pub mod plan;
/// Output and provenance assembly.
pub mod report;
/// Spinning sideband engine.
pub mod sidebands;
/// Spin basis and transition selection.
pub mod transitions;

pub use accumulator::{accumulate, Accumulator, Interpolation, Spectrum};
pub use config::{Decompose, SimulatorConfig};
pub use engine::{run, simulate, CancelToken};
pub use frequency::{FrequencySeries, LabFrame, PreparedSystem, RotorFrame, SpinningRegime};
pub use plan::{load_plan, save_plan, MethodSpec, SimulationPlan, TemplateMethod};
pub use report::{spectrum_hash, Axis, LabelledSpectrum, OutputProvenance, SimulationOutput};
pub use sidebands::{Sideband, SidebandEngine, SidebandSet};
pub use transitions::{pathways, select_transitions, site_channels, SpinBasis, Transition};

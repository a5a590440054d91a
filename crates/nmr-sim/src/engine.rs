//! Powder-averaged run driver.
//!
//! Orientations are split into fixed-size batches. Each batch fills private
//! partial spectra on a rayon pool; partials are summed in batch order once every
//! batch has finished, so the result does not depend on the worker count.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nmr_core::errors::NmrError;
use nmr_core::spin_system::SpinSystem;
use nmr_method::{Event, Method};
use nmr_powder::{Orientation, OrientationCache, OrientationSet};
use num_complex::Complex64;
use rayon::prelude::*;

use crate::accumulator::{Accumulator, Interpolation, Spectrum};
use crate::config::{Decompose, SimulatorConfig};
use crate::frequency::{FrequencySeries, PreparedSystem, SpinningRegime};
use crate::report::{build_output, LabelledSpectrum, ProvenanceInputs, SimulationOutput};
use crate::sidebands::{SidebandEngine, SidebandSet};
use crate::transitions::{pathways, select_transitions, site_channels, SpinBasis, Transition};

/// Shared flag that aborts a run between batches.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; every clone observes it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn check(&self, stage: &str) -> Result<(), NmrError> {
        if self.is_cancelled() {
            return Err(NmrError::cancelled("run-cancelled", "simulation was cancelled")
                .with_context("stage", stage));
        }
        Ok(())
    }
}

struct SystemPlan<'a> {
    index: usize,
    system: &'a SpinSystem,
    prepared: PreparedSystem,
    // transitions[event][k]
    transitions: Vec<Vec<Transition>>,
    pathways: Vec<Vec<usize>>,
    first_pathway: usize,
}

impl SystemPlan<'_> {
    fn abundance_scale(&self) -> f64 {
        self.prepared.abundance() / 100.0
    }

    fn label(&self) -> String {
        self.system
            .name
            .clone()
            .or_else(|| self.system.label.clone())
            .unwrap_or_else(|| format!("spin_system_{}", self.index))
    }
}

struct RunContext<'a> {
    method: &'a Method,
    config: &'a SimulatorConfig,
    accumulator: Accumulator,
    // (dimension, event) in method order
    events: Vec<(usize, &'a Event)>,
    regimes: Vec<SpinningRegime>,
    systems: Vec<SystemPlan<'a>>,
    pathway_count: usize,
}

// Per-vertex lines of one pathway, used by triangle interpolation.
#[derive(Debug, Clone)]
struct VertexLines {
    centre: f64,
    rotor_frequency: f64,
    // (order, intensity), sorted by order
    intensities: Vec<(i32, f64)>,
}

impl VertexLines {
    fn from_set(set: &SidebandSet, regime: SpinningRegime) -> Self {
        let rotor_frequency = match regime {
            SpinningRegime::Finite(value) => value,
            SpinningRegime::Static | SpinningRegime::Infinite => 0.0,
        };
        let centre = set
            .sidebands
            .first()
            .map(|line| line.frequency - f64::from(line.order) * rotor_frequency)
            .unwrap_or(0.0);
        Self {
            centre,
            rotor_frequency,
            intensities: set
                .sidebands
                .iter()
                .map(|line| (line.order, line.intensity()))
                .collect(),
        }
    }

    fn intensity(&self, order: i32) -> f64 {
        self.intensities
            .binary_search_by_key(&order, |(k, _)| *k)
            .map(|found| self.intensities[found].1)
            .unwrap_or(0.0)
    }

    fn frequency(&self, order: i32) -> f64 {
        self.centre + f64::from(order) * self.rotor_frequency
    }
}

impl<'a> RunContext<'a> {
    fn prepare(
        spin_systems: &'a [SpinSystem],
        method: &'a Method,
        config: &'a SimulatorConfig,
    ) -> Result<Self, NmrError> {
        config.validate()?;
        method.validate()?;
        let accumulator = Accumulator::new(method, config.interpolation)?;

        let events: Vec<(usize, &Event)> = method
            .spectral_dimensions
            .iter()
            .enumerate()
            .flat_map(|(dim, dimension)| dimension.events.iter().map(move |event| (dim, event)))
            .collect();
        let regimes = method
            .spectral_dimensions
            .iter()
            .map(|dimension| {
                dimension
                    .events
                    .first()
                    .map(SpinningRegime::of)
                    .unwrap_or(SpinningRegime::Static)
            })
            .collect();

        let mut systems = Vec::with_capacity(spin_systems.len());
        let mut pathway_count = 0;
        for (index, system) in spin_systems.iter().enumerate() {
            let prepared =
                PreparedSystem::new(system).map_err(|err| err.with_context("spin_system", index))?;
            let basis = SpinBasis::new(prepared.isotopes());
            let channels = site_channels(method, prepared.isotopes());
            let mut transitions = Vec::with_capacity(events.len());
            let mut event_in_dimension = 0;
            let mut previous_dimension = None;
            for (dim, event) in &events {
                if previous_dimension != Some(*dim) {
                    event_in_dimension = 0;
                    previous_dimension = Some(*dim);
                }
                let selected = select_transitions(
                    &basis,
                    &channels,
                    method.channels.len(),
                    &event.transition_queries,
                )
                .map_err(|err| {
                    err.with_context("spin_system", index)
                        .with_context("dimension", dim)
                        .with_context("event", event_in_dimension)
                })?;
                transitions.push(selected);
                event_in_dimension += 1;
            }
            let system_pathways = pathways(&transitions);
            log::debug!(
                "spin system {index}: {} states, {} pathways",
                basis.len(),
                system_pathways.len()
            );
            let first_pathway = pathway_count;
            pathway_count += system_pathways.len();
            systems.push(SystemPlan {
                index,
                system,
                prepared,
                transitions,
                pathways: system_pathways,
                first_pathway,
            });
        }

        Ok(Self {
            method,
            config,
            accumulator,
            events,
            regimes,
            systems,
            pathway_count,
        })
    }

    fn slot_count(&self) -> usize {
        match self.config.decompose_spectrum {
            Decompose::None => 1,
            Decompose::SpinSystem => self.systems.len(),
            Decompose::TransitionPathway => self.pathway_count,
        }
    }

    fn slot(&self, system: &SystemPlan<'_>, pathway: usize) -> usize {
        match self.config.decompose_spectrum {
            Decompose::None => 0,
            Decompose::SpinSystem => system.index,
            Decompose::TransitionPathway => system.first_pathway + pathway,
        }
    }

    fn empty_partials(&self) -> Vec<Spectrum> {
        (0..self.slot_count())
            .map(|_| self.accumulator.empty_spectrum())
            .collect()
    }

    /// Sideband sets per pathway and dimension for one crystallite.
    fn pathway_sidebands(
        &self,
        system: &SystemPlan<'_>,
        orientation: &Orientation,
        orientation_index: usize,
        engine: &mut SidebandEngine,
    ) -> Result<Vec<Vec<SidebandSet>>, NmrError> {
        let rotor = system.prepared.rotor_frame(orientation);
        let series: Vec<Vec<FrequencySeries>> = self
            .events
            .iter()
            .zip(&system.transitions)
            .map(|((_, event), transitions)| {
                let lab = rotor.lab(event);
                transitions.iter().map(|t| lab.series(t)).collect()
            })
            .collect();

        let ndim = self.method.ndim();
        let mut sets = Vec::with_capacity(system.pathways.len());
        for (pathway_index, pathway) in system.pathways.iter().enumerate() {
            let mut per_dimension = vec![FrequencySeries::zero(); ndim];
            for (event_index, transition) in pathway.iter().enumerate() {
                let (dim, event) = self.events[event_index];
                per_dimension[dim].add_scaled(&series[event_index][*transition], event.fraction);
            }
            let pathway_sets = per_dimension
                .iter()
                .zip(&self.regimes)
                .enumerate()
                .map(|(dim, (series, regime))| {
                    engine.compute(series, *regime).map_err(|err| {
                        err.with_context("spin_system", system.index)
                            .with_context("pathway", pathway_index)
                            .with_context("orientation", orientation_index)
                            .with_context("dimension", dim)
                    })
                })
                .collect::<Result<Vec<_>, NmrError>>()?;
            sets.push(pathway_sets);
        }
        Ok(sets)
    }

    fn new_engine(&self) -> Result<SidebandEngine, NmrError> {
        SidebandEngine::new(self.config.number_of_sidebands, self.config.sideband_threshold)
    }

    fn linear_batch(
        &self,
        orientations: &[Orientation],
        range: Range<usize>,
    ) -> Result<Vec<Spectrum>, NmrError> {
        let mut partials = self.empty_partials();
        let mut engine = self.new_engine()?;
        for index in range {
            let orientation = &orientations[index];
            for system in &self.systems {
                let scale = orientation.weight * system.abundance_scale();
                let sets = self.pathway_sidebands(system, orientation, index, &mut engine)?;
                for (pathway, pathway_sets) in sets.iter().enumerate() {
                    let slot = self.slot(system, pathway);
                    deposit_combinations(&self.accumulator, &mut partials[slot], pathway_sets, scale);
                }
            }
        }
        Ok(partials)
    }

    fn vertex_batch(
        &self,
        orientations: &[Orientation],
        range: Range<usize>,
    ) -> Result<Vec<Vec<VertexLines>>, NmrError> {
        let mut engine = self.new_engine()?;
        let regime = self.regimes.first().copied().unwrap_or(SpinningRegime::Static);
        let mut vertices = Vec::with_capacity(range.len());
        for index in range {
            let orientation = &orientations[index];
            let mut lines = Vec::with_capacity(self.pathway_count);
            for system in &self.systems {
                let sets = self.pathway_sidebands(system, orientation, index, &mut engine)?;
                lines.extend(
                    sets.iter()
                        .filter_map(|pathway_sets| pathway_sets.first())
                        .map(|set| VertexLines::from_set(set, regime)),
                );
            }
            vertices.push(lines);
        }
        Ok(vertices)
    }

    fn triangle_batch(
        &self,
        set: &OrientationSet,
        vertices: &[Vec<VertexLines>],
        range: Range<usize>,
    ) -> Vec<Spectrum> {
        let mut partials = self.empty_partials();
        let mut orders = Vec::new();
        for triangle in &set.triangles()[range] {
            let [a, b, c] = triangle.vertices;
            for system in &self.systems {
                let scale = triangle.area * system.abundance_scale();
                for pathway in 0..system.pathways.len() {
                    let global = system.first_pathway + pathway;
                    let corners = [&vertices[a][global], &vertices[b][global], &vertices[c][global]];
                    orders.clear();
                    for corner in corners {
                        orders.extend(corner.intensities.iter().map(|(k, _)| *k));
                    }
                    orders.sort_unstable();
                    orders.dedup();
                    let slot = self.slot(system, pathway);
                    for order in &orders {
                        let mean = corners.iter().map(|v| v.intensity(*order)).sum::<f64>() / 3.0;
                        let frequencies = corners.map(|v| v.frequency(*order));
                        self.accumulator
                            .deposit_triangle(&mut partials[slot], frequencies, mean * scale);
                    }
                }
            }
        }
        partials
    }

    fn labels(&self) -> Vec<(String, Option<usize>, Option<Vec<Transition>>)> {
        match self.config.decompose_spectrum {
            Decompose::None => vec![("combined".to_string(), None, None)],
            Decompose::SpinSystem => self
                .systems
                .iter()
                .map(|system| (system.label(), Some(system.index), None))
                .collect(),
            Decompose::TransitionPathway => self
                .systems
                .iter()
                .flat_map(|system| {
                    system.pathways.iter().enumerate().map(move |(index, pathway)| {
                        let steps = pathway
                            .iter()
                            .enumerate()
                            .map(|(event, k)| system.transitions[event][*k].clone())
                            .collect();
                        (
                            format!("{}/pathway_{index}", system.label()),
                            Some(system.index),
                            Some(steps),
                        )
                    })
                })
                .collect(),
        }
    }
}

fn deposit_combinations(
    accumulator: &Accumulator,
    spectrum: &mut Spectrum,
    sets: &[SidebandSet],
    scale: f64,
) {
    if sets.iter().any(|set| set.sidebands.is_empty()) {
        return;
    }
    let ndim = sets.len();
    let mut indices = vec![0usize; ndim];
    let mut frequency = vec![0.0; ndim];
    loop {
        let mut value = scale;
        for (dim, (set, index)) in sets.iter().zip(&indices).enumerate() {
            let line = &set.sidebands[*index];
            frequency[dim] = line.frequency;
            value *= line.intensity();
        }
        accumulator.deposit(spectrum, &frequency, Complex64::new(value, 0.0));

        let mut axis = 0;
        loop {
            if axis == ndim {
                return;
            }
            indices[axis] += 1;
            if indices[axis] < sets[axis].sidebands.len() {
                break;
            }
            indices[axis] = 0;
            axis += 1;
        }
    }
}

fn batch_ranges(len: usize, batch_size: usize) -> Vec<Range<usize>> {
    (0..len)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(len))
        .collect()
}

fn run_batches<T, F>(
    pool: &rayon::ThreadPool,
    ranges: &[Range<usize>],
    cancel: &CancelToken,
    stage: &str,
    work: F,
) -> Result<Vec<T>, NmrError>
where
    T: Send,
    F: Fn(Range<usize>) -> Result<T, NmrError> + Sync,
{
    let results: Result<Vec<(usize, T)>, NmrError> = pool.install(|| {
        ranges
            .par_iter()
            .enumerate()
            .map(|(index, range)| -> Result<(usize, T), NmrError> {
                cancel.check(stage)?;
                let output = work(range.clone())?;
                cancel.check(stage)?;
                log::debug!("{stage} batch {index} done ({} items)", range.len());
                Ok((index, output))
            })
            .collect()
    });

    let mut ordered = results?;
    ordered.sort_by_key(|(index, _)| *index);
    Ok(ordered.into_iter().map(|(_, output)| output).collect())
}

fn sum_partials(context: &RunContext<'_>, partials: Vec<Vec<Spectrum>>) -> Vec<Spectrum> {
    let mut totals = context.empty_partials();
    for batch in &partials {
        for (total, partial) in totals.iter_mut().zip(batch) {
            total.add(partial);
        }
    }
    totals
}

/// Simulates the powder spectrum of `spin_systems` under `method`.
///
/// Orientation sets come from `cache`; `cancel` is polled before and after
/// every batch. On any error no spectrum is returned.
pub fn run(
    spin_systems: &[SpinSystem],
    method: &Method,
    config: &SimulatorConfig,
    cache: &OrientationCache,
    cancel: &CancelToken,
) -> Result<SimulationOutput, NmrError> {
    cancel.check("setup")?;
    let context = RunContext::prepare(spin_systems, method, config)?;
    let set = cache.get_or_generate(config.integration_density, config.integration_volume)?;
    let orientations = set.orientations();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()
        .map_err(|err| NmrError::configuration("thread-pool", err.to_string()))?;

    let ranges = batch_ranges(orientations.len(), config.batch_size);
    log::info!(
        "simulating {} spin systems ({} pathways) over {} orientations in {} batches on {} workers",
        spin_systems.len(),
        context.pathway_count,
        orientations.len(),
        ranges.len(),
        config.workers
    );

    let partials = match context.accumulator.interpolation() {
        Interpolation::Linear => run_batches(&pool, &ranges, cancel, "orientations", |range| {
            context.linear_batch(orientations, range)
        })?,
        Interpolation::Triangle => {
            let vertices: Vec<Vec<VertexLines>> =
                run_batches(&pool, &ranges, cancel, "vertices", |range| {
                    context.vertex_batch(orientations, range)
                })?
                .into_iter()
                .flatten()
                .collect();
            let triangle_ranges = batch_ranges(set.triangles().len(), config.batch_size);
            run_batches(&pool, &triangle_ranges, cancel, "triangles", |range| {
                Ok(context.triangle_batch(&set, &vertices, range))
            })?
        }
    };
    cancel.check("reduce")?;

    let mut totals = sum_partials(&context, partials);
    let norm = 1.0 / set.total_weight();
    for spectrum in &mut totals {
        spectrum.scale(norm);
    }

    let spectra = context
        .labels()
        .into_iter()
        .zip(totals)
        .map(|((label, spin_system, pathway), spectrum)| LabelledSpectrum {
            label,
            spin_system,
            pathway,
            data: spectrum.into_array(),
        })
        .collect();

    let output = build_output(
        ProvenanceInputs {
            spin_systems,
            method,
            config,
            orientation_count: orientations.len(),
            pathway_count: context.pathway_count,
        },
        spectra,
    )?;
    log::info!("simulation finished, spectrum hash {}", output.provenance.spectrum_hash);
    Ok(output)
}

/// [`run`] with a private orientation cache and no cancellation.
pub fn simulate(
    spin_systems: &[SpinSystem],
    method: &Method,
    config: &SimulatorConfig,
) -> Result<SimulationOutput, NmrError> {
    run(
        spin_systems,
        method,
        config,
        &OrientationCache::new(),
        &CancelToken::new(),
    )
}

//! Spin basis enumeration and transition selection.
//!
//! Basis states are the Cartesian product of every site's `m` values from `+I`
//! down to `-I`, with site 0 as the most significant digit. Transitions are
//! ordered by initial state index, then final state index.

use nmr_core::errors::NmrError;
use nmr_core::isotope::Isotope;
use nmr_core::spin::{delta_d, delta_p};
use nmr_method::{Method, TransitionQuery};
use serde::{Deserialize, Serialize};

/// Product basis of a spin system, states stored as per-site `2m` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinBasis {
    two_spins: Vec<u32>,
    states: Vec<Vec<i32>>,
}

impl SpinBasis {
    /// Enumerates the basis of the given sites.
    pub fn new(isotopes: &[Isotope]) -> Self {
        let two_spins: Vec<u32> = isotopes.iter().map(Isotope::two_spin).collect();
        let mut states: Vec<Vec<i32>> = vec![Vec::with_capacity(isotopes.len())];
        for isotope in isotopes {
            states = states
                .into_iter()
                .flat_map(|prefix| {
                    isotope.two_m_values().map(move |two_m| {
                        let mut state = prefix.clone();
                        state.push(two_m);
                        state
                    })
                })
                .collect();
        }
        Self { two_spins, states }
    }

    /// Doubled spin quantum number of every site.
    pub fn two_spins(&self) -> &[u32] {
        &self.two_spins
    }

    /// Number of basis states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the basis is empty (never true; an empty system has one state).
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Per-site `2m` values of state `index`.
    pub fn state(&self, index: usize) -> &[i32] {
        &self.states[index]
    }
}

/// A single-quantum or multiple-quantum transition between two basis states.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Transition {
    /// Index of the initial basis state.
    pub initial: usize,
    /// Index of the final basis state.
    pub final_state: usize,
    /// Per-site `2m` of the initial state.
    pub two_m_initial: Vec<i32>,
    /// Per-site `2m` of the final state.
    pub two_m_final: Vec<i32>,
    /// Per-site `Δm`.
    pub p: Vec<i32>,
    /// Per-site `Δm²`.
    pub d: Vec<i32>,
}

impl Transition {
    fn between(basis: &SpinBasis, initial: usize, final_state: usize) -> Self {
        let two_m_initial = basis.state(initial).to_vec();
        let two_m_final = basis.state(final_state).to_vec();
        let p = two_m_initial
            .iter()
            .zip(&two_m_final)
            .map(|(i, f)| delta_p(*i, *f))
            .collect();
        let d = two_m_initial
            .iter()
            .zip(&two_m_final)
            .map(|(i, f)| delta_d(*i, *f))
            .collect();
        Self {
            initial,
            final_state,
            two_m_initial,
            two_m_final,
            p,
            d,
        }
    }
}

/// Channel index of each site, `None` when the isotope is not observed.
pub fn site_channels(method: &Method, isotopes: &[Isotope]) -> Vec<Option<usize>> {
    isotopes
        .iter()
        .map(|isotope| method.channel_index(isotope.symbol()))
        .collect()
}

fn matches_query(transition: &Transition, channels: &[Option<usize>], query: &TransitionQuery) -> bool {
    for (site, p) in transition.p.iter().enumerate() {
        if *p == 0 {
            continue;
        }
        match channels[site] {
            Some(channel) if query.channel(channel).is_some() => {}
            _ => return false,
        }
    }
    query.iter().all(|(channel, symmetry)| {
        let active: Vec<(i32, i32)> = transition
            .p
            .iter()
            .zip(&transition.d)
            .zip(channels)
            .filter(|((p, _), site_channel)| **p != 0 && **site_channel == Some(channel))
            .map(|((p, d), _)| (*p, *d))
            .collect();
        symmetry.matches(&active)
    })
}

/// Selects every transition matching at least one of `queries`.
///
/// Fails with a configuration error when a query names a channel outside
/// `0..channel_count`.
pub fn select_transitions(
    basis: &SpinBasis,
    channels: &[Option<usize>],
    channel_count: usize,
    queries: &[TransitionQuery],
) -> Result<Vec<Transition>, NmrError> {
    for (index, query) in queries.iter().enumerate() {
        query
            .validate(channel_count)
            .map_err(|err| err.with_context("query", index))?;
    }
    let mut selected = Vec::new();
    for initial in 0..basis.len() {
        for final_state in 0..basis.len() {
            if initial == final_state {
                continue;
            }
            let transition = Transition::between(basis, initial, final_state);
            if queries
                .iter()
                .any(|query| matches_query(&transition, channels, query))
            {
                selected.push(transition);
            }
        }
    }
    Ok(selected)
}

/// Cartesian product of per-event transition lists.
///
/// Each pathway holds one index into every event's list, in event order. An
/// event with no transitions yields no pathways.
pub fn pathways(per_event: &[Vec<Transition>]) -> Vec<Vec<usize>> {
    let mut combos: Vec<Vec<usize>> = vec![Vec::with_capacity(per_event.len())];
    for transitions in per_event {
        combos = combos
            .into_iter()
            .flat_map(|prefix| {
                (0..transitions.len()).map(move |index| {
                    let mut combo = prefix.clone();
                    combo.push(index);
                    combo
                })
            })
            .collect();
    }
    combos
}

//! Transition symmetry queries.
//!
//! A [`SymmetryQuery`] lists the coherence order `P = Δm` (and optionally the
//! satellite order `D = Δm²`) of every site that takes part in a transition on one
//! channel. Sites with zero entries are ignored, so `P = [-1]` and `P = [-1, 0]`
//! select the same transitions. A [`TransitionQuery`] binds queries to channels.

use std::collections::BTreeMap;

use nmr_core::errors::NmrError;
use serde::{Deserialize, Serialize};

fn query_error(code: &str, message: impl Into<String>) -> NmrError {
    NmrError::configuration(code, message)
}

/// Coherence selection for a single channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymmetryQuery {
    /// Per active site `Δm`.
    #[serde(rename = "P")]
    pub p: Vec<i32>,
    /// Per active site `Δm²`, matched together with `P` when present.
    #[serde(rename = "D", default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Vec<i32>>,
}

impl SymmetryQuery {
    /// Query on the coherence order only.
    pub fn new(p: Vec<i32>) -> Self {
        Self { p, d: None }
    }

    /// Adds a satellite order constraint.
    pub fn with_d(mut self, d: Vec<i32>) -> Self {
        self.d = Some(d);
        self
    }

    /// Checks that `P` and `D` describe the same number of sites.
    pub fn validate(&self) -> Result<(), NmrError> {
        if let Some(d) = &self.d {
            if d.len() != self.p.len() {
                return Err(query_error(
                    "query-length-mismatch",
                    "`D` must list one entry per `P` entry",
                )
                .with_context("p_len", self.p.len())
                .with_context("d_len", d.len()));
            }
        }
        Ok(())
    }

    /// Sorted `(p, d)` pairs of the sites this query requires to be active.
    fn required(&self) -> Vec<(i32, Option<i32>)> {
        let mut required: Vec<_> = match &self.d {
            Some(d) => self
                .p
                .iter()
                .zip(d)
                .filter(|(p, _)| **p != 0)
                .map(|(p, d)| (*p, Some(*d)))
                .collect(),
            None => self
                .p
                .iter()
                .filter(|p| **p != 0)
                .map(|p| (*p, None))
                .collect(),
        };
        required.sort_unstable();
        required
    }

    /// Whether the active sites of one channel, given as `(Δm, Δm²)` pairs of the
    /// sites whose `Δm` is non-zero, satisfy this query.
    pub fn matches(&self, active: &[(i32, i32)]) -> bool {
        let required = self.required();
        if required.len() != active.len() {
            return false;
        }
        let mut observed: Vec<(i32, Option<i32>)> = active
            .iter()
            .map(|(p, d)| (*p, self.d.as_ref().map(|_| *d)))
            .collect();
        observed.sort_unstable();
        observed == required
    }
}

/// Channel-indexed set of symmetry queries.
///
/// Channels are zero-based indices into the method's channel list. Channels
/// without an entry must stay inert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionQuery {
    channels: BTreeMap<usize, SymmetryQuery>,
}

impl TransitionQuery {
    /// Empty query; selects only transitions in which every site is inert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Query selecting `symmetry` on a single channel.
    pub fn on_channel(channel: usize, symmetry: SymmetryQuery) -> Self {
        let mut channels = BTreeMap::new();
        channels.insert(channel, symmetry);
        Self { channels }
    }

    /// Shorthand for a `P`-only query on the first channel.
    pub fn p(p: Vec<i32>) -> Self {
        Self::on_channel(0, SymmetryQuery::new(p))
    }

    /// Shorthand for a `P`/`D` query on the first channel.
    pub fn pd(p: Vec<i32>, d: Vec<i32>) -> Self {
        Self::on_channel(0, SymmetryQuery::new(p).with_d(d))
    }

    /// Query attached to a channel, if any.
    pub fn channel(&self, channel: usize) -> Option<&SymmetryQuery> {
        self.channels.get(&channel)
    }

    /// Iterates `(channel, query)` pairs in channel order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &SymmetryQuery)> {
        self.channels.iter().map(|(channel, query)| (*channel, query))
    }

    /// Highest channel index referenced by the query.
    pub fn max_channel(&self) -> Option<usize> {
        self.channels.keys().next_back().copied()
    }

    /// Combines two queries into a new one.
    ///
    /// Channels present in only one side are carried over. A channel defined by
    /// both sides must carry the same query, otherwise the merge is rejected.
    pub fn merge(&self, other: &TransitionQuery) -> Result<TransitionQuery, NmrError> {
        let mut channels = self.channels.clone();
        for (channel, query) in &other.channels {
            match channels.get(channel) {
                Some(existing) if existing != query => {
                    return Err(query_error(
                        "conflicting-transition-query",
                        "both queries define different selections for the same channel",
                    )
                    .with_context("channel", channel));
                }
                Some(_) => {}
                None => {
                    channels.insert(*channel, query.clone());
                }
            }
        }
        Ok(TransitionQuery { channels })
    }

    /// Validates every channel query against the number of method channels.
    pub fn validate(&self, channel_count: usize) -> Result<(), NmrError> {
        if let Some(channel) = self.max_channel().filter(|channel| *channel >= channel_count) {
            return Err(query_error(
                "unknown-channel",
                "transition query refers to a channel the method does not define",
            )
            .with_context("channel", channel)
            .with_context("channel_count", channel_count)
            .with_hint("channel indices are zero-based into `channels`"));
        }
        for (channel, query) in &self.channels {
            query
                .validate()
                .map_err(|err| err.with_context("channel", channel))?;
        }
        Ok(())
    }
}

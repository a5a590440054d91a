//! Fully resolved acquisition methods.

use nmr_core::errors::NmrError;
use nmr_core::isotope::Isotope;
use serde::{Deserialize, Serialize};

use crate::dimension::SpectralDimension;

fn method_error(code: &str, message: impl Into<String>) -> NmrError {
    NmrError::configuration(code, message)
}

fn default_channels() -> Vec<String> {
    vec!["1H".to_string()]
}

/// Acquisition geometry, spectral dimensions and transition selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    /// Method name.
    #[serde(default)]
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Isotope symbols of the observed channels, in channel order.
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
    /// Output axes.
    pub spectral_dimensions: Vec<SpectralDimension>,
    /// Row-major `n x n` matrix applied to the per-dimension frequency tuple.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affine_matrix: Option<Vec<f64>>,
}

impl Method {
    /// Method on the given channels with the given dimensions.
    pub fn new(
        name: impl Into<String>,
        channels: Vec<String>,
        spectral_dimensions: Vec<SpectralDimension>,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            label: None,
            channels,
            spectral_dimensions,
            affine_matrix: None,
        }
    }

    /// Attaches an affine matrix.
    pub fn with_affine_matrix(mut self, matrix: Vec<f64>) -> Self {
        self.affine_matrix = Some(matrix);
        self
    }

    /// Number of spectral dimensions.
    pub fn ndim(&self) -> usize {
        self.spectral_dimensions.len()
    }

    /// Index of the channel observing `isotope`, if any.
    pub fn channel_index(&self, isotope: &str) -> Option<usize> {
        self.channels
            .iter()
            .position(|channel| channel.eq_ignore_ascii_case(isotope))
    }

    /// Affine matrix rows, when one is set.
    pub fn affine_rows(&self) -> Option<Vec<Vec<f64>>> {
        let n = self.ndim();
        self.affine_matrix
            .as_ref()
            .map(|flat| flat.chunks(n.max(1)).map(<[f64]>::to_vec).collect())
    }

    /// Validates channels, dimensions and the affine matrix, returning the
    /// parsed channel isotopes.
    pub fn validate(&self) -> Result<Vec<Isotope>, NmrError> {
        if self.channels.is_empty() {
            return Err(method_error("missing-channels", "a method needs at least one channel"));
        }
        let mut isotopes = Vec::with_capacity(self.channels.len());
        for (index, channel) in self.channels.iter().enumerate() {
            let isotope = Isotope::parse(channel).map_err(|err| err.with_context("channel", index))?;
            if isotopes.iter().any(|known: &Isotope| known.symbol() == isotope.symbol()) {
                return Err(method_error(
                    "duplicate-channel",
                    format!("isotope `{}` appears on more than one channel", isotope.symbol()),
                )
                .with_context("channel", index));
            }
            isotopes.push(isotope);
        }

        if self.spectral_dimensions.is_empty() {
            return Err(method_error(
                "missing-dimensions",
                "a method needs at least one spectral dimension",
            ));
        }
        for (index, dim) in self.spectral_dimensions.iter().enumerate() {
            dim.validate(self.channels.len())
                .map_err(|err| err.with_context("dimension", index))?;
        }

        if let Some(matrix) = &self.affine_matrix {
            let n = self.ndim();
            if matrix.len() != n * n {
                return Err(method_error(
                    "affine-matrix-shape",
                    format!("affine matrix must have {} entries for {n} dimension(s)", n * n),
                )
                .with_context("entries", matrix.len()));
            }
            if matrix.iter().any(|value| !value.is_finite()) {
                return Err(method_error(
                    "affine-matrix-non-finite",
                    "affine matrix entries must be finite",
                ));
            }
        }
        Ok(isotopes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::query::TransitionQuery;

    fn one_dim(query: TransitionQuery) -> Method {
        Method::new(
            "custom",
            vec!["13C".into()],
            vec![SpectralDimension::new(64, 1e4, 0.0)
                .with_events(vec![Event::default().with_query(query)])],
        )
    }

    #[test]
    fn unknown_channel_is_rejected() {
        let method = one_dim(TransitionQuery::on_channel(
            1,
            crate::query::SymmetryQuery::new(vec![-1]),
        ));
        let err = method.validate().unwrap_err();
        assert!(matches!(err, NmrError::Configuration(_)));
        assert_eq!(err.info().code, "unknown-channel");
        assert_eq!(err.info().context.get("dimension").map(String::as_str), Some("0"));
    }

    #[test]
    fn affine_shape_must_match_dimensions() {
        let method = one_dim(TransitionQuery::p(vec![-1])).with_affine_matrix(vec![1.0, 0.0]);
        assert_eq!(method.validate().unwrap_err().info().code, "affine-matrix-shape");
    }

    #[test]
    fn channel_lookup_is_case_insensitive() {
        let method = one_dim(TransitionQuery::p(vec![-1]));
        assert_eq!(method.channel_index("13c"), Some(0));
        assert_eq!(method.channel_index("1H"), None);
    }
}

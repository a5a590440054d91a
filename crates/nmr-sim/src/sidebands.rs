//! Spinning sideband amplitudes.
//!
//! Under finite-speed spinning the accumulated phase over one rotor period,
//! `φ(t) = Σ_{n≠0} f_n e^{-i n ω_r t} / (-i n ν_r)`, is sampled at `N` points and
//! transformed. Sideband `k` sits at `f_0 + k ν_r` with the γ-averaged intensity
//! `|A_k|²`, and the intensities of one set sum to one.

use std::f64::consts::PI;

use nmr_core::errors::NmrError;
use num_complex::Complex64;

use crate::fft::{fft_in_place, Direction};
use crate::frequency::{FrequencySeries, SpinningRegime, MAX_HARMONIC};

/// One spectral line of a sideband manifold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sideband {
    /// Sideband order `k`.
    pub order: i32,
    /// Line position in Hz.
    pub frequency: f64,
    /// Complex amplitude `A_k`.
    pub amplitude: Complex64,
}

impl Sideband {
    /// Intensity `|A_k|²`.
    pub fn intensity(&self) -> f64 {
        self.amplitude.norm_sqr()
    }
}

/// Sidebands of one (orientation, pathway, dimension) triple, in order of `k`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SidebandSet {
    /// Retained sidebands.
    pub sidebands: Vec<Sideband>,
}

impl SidebandSet {
    fn single(frequency: f64) -> Self {
        Self {
            sidebands: vec![Sideband {
                order: 0,
                frequency,
                amplitude: Complex64::new(1.0, 0.0),
            }],
        }
    }

    /// Sum of all retained intensities.
    pub fn total_intensity(&self) -> f64 {
        self.sidebands.iter().map(Sideband::intensity).sum()
    }
}

fn numerical_error(code: &str, message: &str) -> NmrError {
    NmrError::numerical(code, message)
}

/// Reusable sideband calculator holding phase tables and scratch space.
#[derive(Debug, Clone)]
pub struct SidebandEngine {
    number_of_sidebands: usize,
    threshold: f64,
    // twiddles[n - 1][j] = e^{-i n 2π j / N}
    twiddles: Vec<Vec<Complex64>>,
    scratch: Vec<Complex64>,
}

impl SidebandEngine {
    /// Creates an engine sampling `number_of_sidebands` points per rotor period.
    ///
    /// Sidebands weaker than `threshold` times the strongest one are dropped.
    pub fn new(number_of_sidebands: usize, threshold: f64) -> Result<Self, NmrError> {
        if number_of_sidebands == 0 || !number_of_sidebands.is_power_of_two() {
            return Err(NmrError::invalid(
                "sideband-count-not-power-of-two",
                "number of sidebands must be a positive power of two",
            )
            .with_context("number_of_sidebands", number_of_sidebands));
        }
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(NmrError::invalid(
                "invalid-sideband-threshold",
                "sideband threshold must be finite and non-negative",
            )
            .with_context("sideband_threshold", threshold));
        }
        let n = number_of_sidebands;
        let twiddles = (1..=MAX_HARMONIC)
            .map(|harmonic| {
                (0..n)
                    .map(|j| {
                        Complex64::from_polar(1.0, -2.0 * PI * (harmonic as f64) * (j as f64) / n as f64)
                    })
                    .collect()
            })
            .collect();
        Ok(Self {
            number_of_sidebands,
            threshold,
            twiddles,
            scratch: vec![Complex64::new(0.0, 0.0); n],
        })
    }

    /// Number of samples per rotor period.
    pub fn number_of_sidebands(&self) -> usize {
        self.number_of_sidebands
    }

    /// Computes the sidebands of `series` in the given spinning regime.
    pub fn compute(
        &mut self,
        series: &FrequencySeries,
        regime: SpinningRegime,
    ) -> Result<SidebandSet, NmrError> {
        if !series.is_finite() {
            return Err(numerical_error(
                "non-finite-frequency",
                "transition frequency is not finite",
            ));
        }
        let rotor_frequency = match regime {
            SpinningRegime::Static => return Ok(SidebandSet::single(series.at_origin())),
            SpinningRegime::Infinite => return Ok(SidebandSet::single(series.isotropic())),
            SpinningRegime::Finite(rotor_frequency) => rotor_frequency,
        };

        let centre = series.isotropic();
        let n = self.number_of_sidebands;
        let mut weights = Vec::with_capacity(2 * MAX_HARMONIC as usize);
        for harmonic in 1..=MAX_HARMONIC {
            for signed in [harmonic, -harmonic] {
                let coefficient = series.coefficient(signed);
                if coefficient.norm_sqr() > 0.0 {
                    // f_n / (-i n ν_r) = i f_n / (n ν_r)
                    let weight = Complex64::new(0.0, 1.0) * coefficient / (signed as f64 * rotor_frequency);
                    weights.push((signed, weight));
                }
            }
        }

        if weights.is_empty() {
            return Ok(SidebandSet::single(centre));
        }

        for (j, slot) in self.scratch.iter_mut().enumerate() {
            let mut phase = 0.0;
            for (signed, weight) in &weights {
                let table = &self.twiddles[(signed.unsigned_abs() - 1) as usize];
                let factor = if *signed > 0 { table[j] } else { table[j].conj() };
                phase += (*weight * factor).re;
            }
            *slot = Complex64::from_polar(1.0, phase);
        }
        fft_in_place(&mut self.scratch, Direction::Forward);

        let scale = 1.0 / n as f64;
        let mut sidebands = Vec::with_capacity(n);
        let mut strongest = 0.0f64;
        for (index, value) in self.scratch.iter().enumerate() {
            let amplitude = *value * scale;
            if !(amplitude.re.is_finite() && amplitude.im.is_finite()) {
                return Err(numerical_error(
                    "non-finite-amplitude",
                    "sideband amplitude is not finite",
                )
                .with_context("index", index));
            }
            let order = if index < n / 2 {
                index as i32
            } else {
                index as i32 - n as i32
            };
            strongest = strongest.max(amplitude.norm_sqr());
            sidebands.push(Sideband {
                order,
                frequency: centre + order as f64 * rotor_frequency,
                amplitude,
            });
        }
        sidebands.sort_by_key(|sideband| sideband.order);
        if self.threshold > 0.0 {
            let cutoff = self.threshold * strongest;
            sidebands.retain(|sideband| sideband.intensity() >= cutoff);
        }
        Ok(SidebandSet { sidebands })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn non_power_of_two_is_rejected() {
        let err = SidebandEngine::new(48, 0.0).unwrap_err();
        assert!(matches!(err, NmrError::InvalidParameter(_)));
    }

    #[test]
    fn isotropic_series_has_one_line() {
        let mut engine = SidebandEngine::new(32, 0.0).unwrap();
        let set = engine
            .compute(&FrequencySeries::constant(125.0), SpinningRegime::Finite(2000.0))
            .unwrap();
        assert_eq!(set.sidebands.len(), 1);
        assert_eq!(set.sidebands[0].frequency, 125.0);
    }

    #[test]
    fn non_finite_series_is_a_numerical_error() {
        let mut engine = SidebandEngine::new(16, 0.0).unwrap();
        let err = engine
            .compute(&FrequencySeries::constant(f64::NAN), SpinningRegime::Static)
            .unwrap_err();
        assert!(matches!(err, NmrError::Numerical(_)));
    }

    fn cosine_modulation(depth: f64) -> FrequencySeries {
        let mut coefficients = [Complex64::new(0.0, 0.0); 9];
        coefficients[3] = Complex64::new(depth, 0.0);
        coefficients[5] = Complex64::new(depth, 0.0);
        FrequencySeries::from_coefficients(coefficients)
    }

    #[test]
    fn weak_modulation_follows_bessel_intensities() {
        let mut engine = SidebandEngine::new(64, 0.0).unwrap();
        let set = engine
            .compute(&cosine_modulation(100.0), SpinningRegime::Finite(1000.0))
            .unwrap();
        assert_abs_diff_eq!(set.total_intensity(), 1.0, epsilon = 1e-12);
        let first = set.sidebands.iter().find(|s| s.order == 1).unwrap();
        // J_1(0.2)^2
        assert_abs_diff_eq!(first.intensity(), 0.099_500_8_f64.powi(2), epsilon = 1e-6);
        assert_abs_diff_eq!(first.frequency, 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn threshold_drops_weak_sidebands() {
        let mut engine = SidebandEngine::new(64, 0.5).unwrap();
        let set = engine
            .compute(&cosine_modulation(100.0), SpinningRegime::Finite(1000.0))
            .unwrap();
        assert_eq!(set.sidebands.len(), 1);
        assert_eq!(set.sidebands[0].order, 0);
    }
}

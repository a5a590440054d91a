//! Dense spectral grids and interpolated deposition.

use ndarray::{ArrayD, IxDyn};
use nmr_core::errors::NmrError;
use nmr_method::{Method, SpectralDimension};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// How a line is spread over the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Split between the two nearest points of every dimension.
    #[default]
    Linear,
    /// Integrate the frequency distribution of each orientation-mesh triangle
    /// exactly over the bins it covers; one-dimensional methods only.
    Triangle,
}

/// Dense N-dimensional complex spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    data: ArrayD<Complex64>,
}

impl Spectrum {
    /// Zeroed spectrum of the given shape.
    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::zeros(IxDyn(shape)),
        }
    }

    /// Underlying array.
    pub fn data(&self) -> &ArrayD<Complex64> {
        &self.data
    }

    /// Consumes the spectrum, returning the array.
    pub fn into_array(self) -> ArrayD<Complex64> {
        self.data
    }

    /// Adds another spectrum of the same shape point by point.
    pub fn add(&mut self, other: &Spectrum) {
        self.data += &other.data;
    }

    /// Multiplies every point by a real factor.
    pub fn scale(&mut self, factor: f64) {
        self.data.mapv_inplace(|value| value * factor);
    }

    /// Sum over all points.
    pub fn total(&self) -> Complex64 {
        self.data.sum()
    }

    /// Real part as a flat vector in logical order.
    pub fn real(&self) -> Vec<f64> {
        self.data.iter().map(|value| value.re).collect()
    }

    fn add_at(&mut self, index: &[usize], value: Complex64) {
        if let Some(slot) = self.data.get_mut(IxDyn(index)) {
            *slot += value;
        }
    }
}

/// Deposits `amplitude * weight` at `frequency` with multilinear interpolation.
///
/// Portions falling outside the grid are dropped. `frequency` holds one value
/// per dimension; both parts of `amplitude` are deposited.
pub fn accumulate(
    spectrum: &mut Spectrum,
    dims: &[SpectralDimension],
    frequency: &[f64],
    amplitude: Complex64,
    weight: f64,
) {
    let positions: Vec<f64> = dims
        .iter()
        .zip(frequency)
        .map(|(dim, f)| dim.position(*f))
        .collect();
    let counts: Vec<usize> = dims.iter().map(|dim| dim.count).collect();
    deposit_linear(spectrum, &counts, &positions, amplitude * weight);
}

fn deposit_linear(
    spectrum: &mut Spectrum,
    counts: &[usize],
    positions: &[f64],
    value: Complex64,
) {
    if value == Complex64::new(0.0, 0.0) {
        return;
    }
    // Rejects NaN and far-off positions before the isize casts.
    let in_reach = positions
        .iter()
        .zip(counts)
        .all(|(position, count)| *position > -1.0 && *position < *count as f64);
    if !in_reach {
        return;
    }
    let ndim = counts.len();
    let mut floors = Vec::with_capacity(ndim);
    let mut fractions = Vec::with_capacity(ndim);
    for position in positions {
        let floor = position.floor();
        floors.push(floor as isize);
        fractions.push(position - floor);
    }

    let mut index = vec![0usize; ndim];
    'corners: for corner in 0..(1usize << ndim) {
        let mut share = value;
        for axis in 0..ndim {
            let upper = (corner >> axis) & 1 == 1;
            let point = floors[axis] + isize::from(upper);
            if point < 0 || point as usize >= counts[axis] {
                continue 'corners;
            }
            let factor = if upper {
                fractions[axis]
            } else {
                1.0 - fractions[axis]
            };
            if factor == 0.0 {
                continue 'corners;
            }
            share *= factor;
            index[axis] = point as usize;
        }
        spectrum.add_at(&index, share);
    }
}

/// Method-bound accumulator applying the affine matrix before deposition.
#[derive(Debug, Clone)]
pub struct Accumulator {
    dims: Vec<SpectralDimension>,
    affine: Option<Vec<Vec<f64>>>,
    interpolation: Interpolation,
}

impl Accumulator {
    /// Binds to a validated method.
    pub fn new(method: &Method, interpolation: Interpolation) -> Result<Self, NmrError> {
        if interpolation == Interpolation::Triangle && method.ndim() != 1 {
            return Err(NmrError::configuration(
                "triangle-interpolation-dimension",
                "triangle interpolation supports one-dimensional methods only",
            )
            .with_context("dimensions", method.ndim()));
        }
        Ok(Self {
            dims: method.spectral_dimensions.clone(),
            affine: method.affine_rows(),
            interpolation,
        })
    }

    /// Interpolation mode.
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Output grid shape.
    pub fn shape(&self) -> Vec<usize> {
        self.dims.iter().map(|dim| dim.count).collect()
    }

    /// Fresh zeroed spectrum on this grid.
    pub fn empty_spectrum(&self) -> Spectrum {
        Spectrum::zeros(&self.shape())
    }

    /// Applies the affine matrix, when present.
    pub fn transform(&self, frequency: &[f64]) -> Vec<f64> {
        match &self.affine {
            Some(rows) => rows
                .iter()
                .map(|row| row.iter().zip(frequency).map(|(a, f)| a * f).sum())
                .collect(),
            None => frequency.to_vec(),
        }
    }

    /// Deposits one line with multilinear interpolation.
    pub fn deposit(&self, spectrum: &mut Spectrum, frequency: &[f64], value: Complex64) {
        let mapped = self.transform(frequency);
        accumulate(spectrum, &self.dims, &mapped, value, 1.0);
    }

    /// Deposits the frequency distribution of one orientation-mesh triangle.
    ///
    /// The frequency varies linearly across the triangle, so its density is a
    /// triangle between the smallest and largest vertex frequency. That density
    /// is integrated exactly over every bin `[x_i - Δ/2, x_i + Δ/2]`.
    pub fn deposit_triangle(&self, spectrum: &mut Spectrum, vertices: [f64; 3], value: f64) {
        if value == 0.0 {
            return;
        }
        let Some(dim) = self.dims.first() else {
            return;
        };
        let mut mapped = vertices.map(|f| self.transform(&[f])[0]);
        mapped.sort_by(f64::total_cmp);
        let [low, mid, high] = mapped;
        let increment = dim.increment();
        if high - low <= increment * 1e-9 {
            self.deposit_mapped_linear(spectrum, (low + mid + high) / 3.0, value);
            return;
        }

        let cdf = |x: f64| -> f64 {
            if x <= low {
                0.0
            } else if x >= high {
                1.0
            } else if x <= mid {
                (x - low).powi(2) / ((high - low) * (mid - low))
            } else {
                1.0 - (high - x).powi(2) / ((high - low) * (high - mid))
            }
        };

        let first = (dim.position(low) + 0.5).floor().max(0.0) as usize;
        let last = (dim.position(high) + 0.5).floor();
        if last < 0.0 {
            return;
        }
        let last = (last as usize).min(dim.count.saturating_sub(1));
        for index in first..=last {
            let centre = dim.coordinate(index);
            let share = cdf(centre + 0.5 * increment) - cdf(centre - 0.5 * increment);
            if share > 0.0 {
                spectrum.add_at(&[index], Complex64::new(value * share, 0.0));
            }
        }
    }

    fn deposit_mapped_linear(&self, spectrum: &mut Spectrum, frequency: f64, value: f64) {
        accumulate(spectrum, &self.dims, &[frequency], Complex64::new(value, 0.0), 1.0);
    }
}

//! In-place radix-2 FFT over [`Complex64`] buffers.

use std::f64::consts::PI;

use num_complex::Complex64;

/// Transform direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `X_k = Σ x_j e^{-2πi jk/N}`.
    Forward,
    /// `x_j = (1/N) Σ X_k e^{+2πi jk/N}`.
    Inverse,
}

/// Transforms `buf` in place. The length must be a power of two; callers check it.
pub fn fft_in_place(buf: &mut [Complex64], direction: Direction) {
    let n = buf.len();
    if n <= 1 {
        return;
    }
    debug_assert!(n.is_power_of_two());

    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;
        if i < j {
            buf.swap(i, j);
        }
    }

    let sign = match direction {
        Direction::Forward => -1.0,
        Direction::Inverse => 1.0,
    };
    let mut len = 2;
    while len <= n {
        let half = len / 2;
        let step = Complex64::from_polar(1.0, sign * 2.0 * PI / len as f64);
        for start in (0..n).step_by(len) {
            let mut w = Complex64::new(1.0, 0.0);
            for k in 0..half {
                let u = buf[start + k];
                let t = w * buf[start + k + half];
                buf[start + k] = u + t;
                buf[start + k + half] = u - t;
                w *= step;
            }
        }
        len <<= 1;
    }

    if direction == Direction::Inverse {
        let scale = 1.0 / n as f64;
        for value in buf.iter_mut() {
            *value *= scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn single_tone_lands_in_one_bin() {
        let n = 16;
        let mut buf: Vec<Complex64> = (0..n)
            .map(|j| Complex64::from_polar(1.0, 2.0 * PI * 3.0 * j as f64 / n as f64))
            .collect();
        fft_in_place(&mut buf, Direction::Forward);
        for (k, value) in buf.iter().enumerate() {
            let expected = if k == 3 { n as f64 } else { 0.0 };
            assert_abs_diff_eq!(value.norm(), expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn inverse_undoes_forward() {
        let original: Vec<Complex64> = (0..8)
            .map(|j| Complex64::new(j as f64, (j * j) as f64 * 0.1))
            .collect();
        let mut buf = original.clone();
        fft_in_place(&mut buf, Direction::Forward);
        fft_in_place(&mut buf, Direction::Inverse);
        for (a, b) in buf.iter().zip(&original) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-12);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-12);
        }
    }
}

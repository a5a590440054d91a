//! Wigner rotation matrices for first- and second-rank spherical tensors.
//!
//! Conventions: `d^l_{m',m}(β) = <l m'| exp(-iβ J_y) |l m>` and
//! `D^l_{m',m}(α, β, γ) = exp(-i m' α) d^l_{m',m}(β) exp(-i m γ)`. A tensor with
//! components `R_m` in frame A has components `R'_m = Σ_{m'} D_{m',m}(Ω) R_{m'}`
//! in frame B when Ω carries A onto B.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Euler angles (radians) in the z-y-z convention.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EulerAngles {
    /// First rotation about z.
    #[serde(default)]
    pub alpha: f64,
    /// Rotation about the intermediate y axis.
    #[serde(default)]
    pub beta: f64,
    /// Final rotation about z.
    #[serde(default)]
    pub gamma: f64,
}

impl EulerAngles {
    /// Creates a new set of Euler angles.
    pub const fn new(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self { alpha, beta, gamma }
    }

    /// Whether all three angles are exactly zero.
    pub fn is_identity(&self) -> bool {
        self.alpha == 0.0 && self.beta == 0.0 && self.gamma == 0.0
    }

    /// Whether all three angles are finite.
    pub fn is_finite(&self) -> bool {
        self.alpha.is_finite() && self.beta.is_finite() && self.gamma.is_finite()
    }
}

fn parity(exponent: i32) -> f64 {
    if exponent.rem_euclid(2) == 0 {
        1.0
    } else {
        -1.0
    }
}

// Reduces (m', m) to |m'| >= |m|, m' >= 0 using
// d_{m',m} = (-1)^{m-m'} d_{m,m'} = (-1)^{m-m'} d_{-m',-m}.
fn canonical(mut mp: i32, mut m: i32) -> (i32, i32, f64) {
    let mut sign = 1.0;
    if mp.abs() < m.abs() {
        sign *= parity(m - mp);
        std::mem::swap(&mut mp, &mut m);
    }
    if mp < 0 {
        sign *= parity(m - mp);
        mp = -mp;
        m = -m;
    }
    (mp, m, sign)
}

/// Reduced rotation matrix element `d^1_{m',m}(β)`.
pub fn small_d1(mp: i32, m: i32, beta: f64) -> f64 {
    debug_assert!(mp.abs() <= 1 && m.abs() <= 1);
    let (c, s) = (beta.cos(), beta.sin());
    let (mp, m, sign) = canonical(mp, m);
    let value = match (mp, m) {
        (1, 1) => 0.5 * (1.0 + c),
        (1, 0) => -s / std::f64::consts::SQRT_2,
        (1, -1) => 0.5 * (1.0 - c),
        _ => c,
    };
    sign * value
}

/// Reduced rotation matrix element `d^2_{m',m}(β)`.
pub fn small_d2(mp: i32, m: i32, beta: f64) -> f64 {
    debug_assert!(mp.abs() <= 2 && m.abs() <= 2);
    let (c, s) = (beta.cos(), beta.sin());
    let (mp, m, sign) = canonical(mp, m);
    let value = match (mp, m) {
        (2, 2) => 0.25 * (1.0 + c) * (1.0 + c),
        (2, 1) => -0.5 * s * (1.0 + c),
        (2, 0) => (3.0f64 / 8.0).sqrt() * s * s,
        (2, -1) => -0.5 * s * (1.0 - c),
        (2, -2) => 0.25 * (1.0 - c) * (1.0 - c),
        (1, 1) => 0.5 * (1.0 + c) * (2.0 * c - 1.0),
        (1, 0) => -(1.5f64).sqrt() * s * c,
        (1, -1) => 0.5 * (1.0 - c) * (2.0 * c + 1.0),
        _ => 0.5 * (3.0 * c * c - 1.0),
    };
    sign * value
}

fn phase(m: i32, angle: f64) -> Complex64 {
    Complex64::from_polar(1.0, -(m as f64) * angle)
}

/// Rotates second-rank components (indexed `m + 2`) by the given Euler angles.
pub fn rotate_rank2(components: &[Complex64; 5], euler: &EulerAngles) -> [Complex64; 5] {
    if euler.is_identity() {
        return *components;
    }
    let mut rotated = [Complex64::new(0.0, 0.0); 5];
    for (out_idx, slot) in rotated.iter_mut().enumerate() {
        let m = out_idx as i32 - 2;
        let gamma_phase = phase(m, euler.gamma);
        let mut acc = Complex64::new(0.0, 0.0);
        for (in_idx, value) in components.iter().enumerate() {
            if value.re == 0.0 && value.im == 0.0 {
                continue;
            }
            let mp = in_idx as i32 - 2;
            acc += phase(mp, euler.alpha) * small_d2(mp, m, euler.beta) * value;
        }
        *slot = acc * gamma_phase;
    }
    rotated
}

/// Rotates first-rank components (indexed `m + 1`) by the given Euler angles.
pub fn rotate_rank1(components: &[Complex64; 3], euler: &EulerAngles) -> [Complex64; 3] {
    if euler.is_identity() {
        return *components;
    }
    let mut rotated = [Complex64::new(0.0, 0.0); 3];
    for (out_idx, slot) in rotated.iter_mut().enumerate() {
        let m = out_idx as i32 - 1;
        let mut acc = Complex64::new(0.0, 0.0);
        for (in_idx, value) in components.iter().enumerate() {
            let mp = in_idx as i32 - 1;
            acc += phase(mp, euler.alpha) * small_d1(mp, m, euler.beta) * value;
        }
        *slot = acc * phase(m, euler.gamma);
    }
    rotated
}

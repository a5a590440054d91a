//! Transition frequencies as Fourier series over one rotor period.
//!
//! Every spin system is evaluated once into common-frame tensors
//! ([`PreparedSystem`]). Per crystallite orientation those tensors are rotated
//! into the rotor frame ([`RotorFrame`]). Per event the rotor frame is expanded
//! into lab-frame coefficients of `e^{-i n ω_r t}` ([`LabFrame`]), from which the
//! series of any transition is a weighted sum.

use nmr_core::errors::NmrError;
use nmr_core::isotope::Isotope;
use nmr_core::spin::{
    m_value, quadrupolar_first_order_weight, quadrupolar_scale, quadrupolar_second_order_weights,
};
use nmr_core::spin_system::SpinSystem;
use nmr_core::tensor::{evaluate_antisymmetric, evaluate_symmetric, SphericalTensor2};
use nmr_core::wigner::{small_d2, EulerAngles};
use nmr_method::Event;
use nmr_powder::Orientation;
use num_complex::Complex64;

use crate::transitions::Transition;

/// Highest harmonic of the rotor frequency carried by a series.
pub const MAX_HARMONIC: i32 = 4;
const SERIES_LEN: usize = (2 * MAX_HARMONIC + 1) as usize;
const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Coefficients `f_n`, `n = -4..=4`, of `F(t) = Σ f_n e^{-i n ω_r t}` in Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencySeries {
    coefficients: [Complex64; SERIES_LEN],
}

impl Default for FrequencySeries {
    fn default() -> Self {
        Self::zero()
    }
}

impl FrequencySeries {
    /// The zero series.
    pub const fn zero() -> Self {
        Self {
            coefficients: [ZERO; SERIES_LEN],
        }
    }

    /// Series with only an isotropic term.
    pub fn constant(frequency: f64) -> Self {
        let mut series = Self::zero();
        series.coefficients[MAX_HARMONIC as usize] = Complex64::new(frequency, 0.0);
        series
    }

    /// Wraps raw coefficients indexed by `n + 4`.
    pub const fn from_coefficients(coefficients: [Complex64; SERIES_LEN]) -> Self {
        Self { coefficients }
    }

    /// Coefficient of harmonic `n`.
    pub fn coefficient(&self, n: i32) -> Complex64 {
        self.coefficients[(n + MAX_HARMONIC) as usize]
    }

    /// Time-averaged frequency `Re f_0`.
    pub fn isotropic(&self) -> f64 {
        self.coefficient(0).re
    }

    /// Frequency at `t = 0`, `Re Σ f_n`.
    pub fn at_origin(&self) -> f64 {
        self.coefficients.iter().map(|c| c.re).sum()
    }

    /// Adds `fraction * other` into this series.
    pub fn add_scaled(&mut self, other: &FrequencySeries, fraction: f64) {
        for (slot, value) in self.coefficients.iter_mut().zip(other.coefficients.iter()) {
            *slot += *value * fraction;
        }
    }

    /// Whether every coefficient is finite.
    pub fn is_finite(&self) -> bool {
        self.coefficients
            .iter()
            .all(|c| c.re.is_finite() && c.im.is_finite())
    }

    fn add_rank2(&mut self, coefficients: &[Complex64; 5], scale: f64) {
        if scale == 0.0 {
            return;
        }
        for (n, value) in coefficients.iter().enumerate() {
            self.coefficients[n + 2] += *value * scale;
        }
    }

    fn add_squared(&mut self, coefficients: &[Complex64; SERIES_LEN], scale: f64) {
        if scale == 0.0 {
            return;
        }
        for (slot, value) in self.coefficients.iter_mut().zip(coefficients.iter()) {
            *slot += *value * scale;
        }
    }
}

/// How the sample moves during an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpinningRegime {
    /// No rotation; the rotor axis is taken along B0.
    Static,
    /// Finite spinning frequency in Hz.
    Finite(f64),
    /// Infinite-speed spinning; only the time average survives.
    Infinite,
}

impl SpinningRegime {
    /// Regime of an event.
    pub fn of(event: &Event) -> Self {
        if event.is_static() {
            SpinningRegime::Static
        } else if event.is_infinite_spinning() {
            SpinningRegime::Infinite
        } else {
            SpinningRegime::Finite(event.rotor_frequency)
        }
    }
}

#[derive(Debug, Clone)]
struct PreparedSite {
    isotope: Isotope,
    isotropic_chemical_shift: f64,
    shielding: SphericalTensor2,
    quadrupolar: SphericalTensor2,
}

#[derive(Debug, Clone)]
struct PreparedCoupling {
    sites: [usize; 2],
    isotropic_j: f64,
    j_symmetric: SphericalTensor2,
    dipolar: SphericalTensor2,
}

/// Spin system with every tensor evaluated in the common frame.
#[derive(Debug, Clone)]
pub struct PreparedSystem {
    isotopes: Vec<Isotope>,
    sites: Vec<PreparedSite>,
    couplings: Vec<PreparedCoupling>,
    abundance: f64,
}

impl PreparedSystem {
    /// Validates the spin system and evaluates its tensors.
    pub fn new(system: &SpinSystem) -> Result<Self, NmrError> {
        let isotopes = system.validate()?;
        let sites = system
            .sites
            .iter()
            .zip(&isotopes)
            .enumerate()
            .map(|(index, (site, isotope))| {
                let shielding = evaluate_symmetric(site.shielding_symmetric.as_ref())
                    .map_err(|err| err.with_context("site", index))?;
                let quadrupolar = evaluate_symmetric(site.quadrupolar.as_ref())
                    .map_err(|err| err.with_context("site", index))?;
                Ok(PreparedSite {
                    isotope: *isotope,
                    isotropic_chemical_shift: site.isotropic_chemical_shift,
                    shielding: shielding.common_frame(),
                    quadrupolar: quadrupolar.common_frame(),
                })
            })
            .collect::<Result<Vec<_>, NmrError>>()?;
        let couplings = system
            .couplings
            .iter()
            .enumerate()
            .map(|(index, coupling)| {
                let j_symmetric = evaluate_symmetric(coupling.j_symmetric.as_ref())
                    .map_err(|err| err.with_context("coupling", index))?;
                let dipolar = evaluate_symmetric(coupling.dipolar.as_ref())
                    .map_err(|err| err.with_context("coupling", index))?;
                // Antisymmetric J is validated but has no first-order frequency.
                evaluate_antisymmetric(coupling.j_antisymmetric.as_ref())
                    .map_err(|err| err.with_context("coupling", index))?;
                Ok(PreparedCoupling {
                    sites: coupling.site_index,
                    isotropic_j: coupling.isotropic_j,
                    j_symmetric: j_symmetric.common_frame(),
                    dipolar: dipolar.common_frame(),
                })
            })
            .collect::<Result<Vec<_>, NmrError>>()?;
        Ok(Self {
            isotopes,
            sites,
            couplings,
            abundance: system.abundance,
        })
    }

    /// Site isotopes in site order.
    pub fn isotopes(&self) -> &[Isotope] {
        &self.isotopes
    }

    /// Abundance in percent.
    pub fn abundance(&self) -> f64 {
        self.abundance
    }

    /// Rotates every tensor into the rotor frame of one crystallite.
    pub fn rotor_frame(&self, orientation: &Orientation) -> RotorFrame<'_> {
        let euler = EulerAngles::new(orientation.alpha, orientation.beta, 0.0);
        RotorFrame {
            system: self,
            sites: self
                .sites
                .iter()
                .map(|site| [site.shielding.rotate(&euler), site.quadrupolar.rotate(&euler)])
                .collect(),
            couplings: self
                .couplings
                .iter()
                .map(|coupling| [coupling.j_symmetric.rotate(&euler), coupling.dipolar.rotate(&euler)])
                .collect(),
        }
    }
}

/// Tensors of one crystallite expressed in the rotor frame.
#[derive(Debug, Clone)]
pub struct RotorFrame<'a> {
    system: &'a PreparedSystem,
    sites: Vec<[SphericalTensor2; 2]>,
    couplings: Vec<[SphericalTensor2; 2]>,
}

/// Coefficients `a_n = d²_{n,k}(θ) R_n` of lab component `k`.
fn lab_component(rotor: &SphericalTensor2, theta: f64, k: i32) -> [Complex64; 5] {
    let mut out = [ZERO; 5];
    if rotor.is_zero() {
        return out;
    }
    for (index, slot) in out.iter_mut().enumerate() {
        let n = index as i32 - 2;
        *slot = rotor.component(n) * small_d2(n, k, theta);
    }
    out
}

/// Series of `|R_k(t)|²`: `b_n = Σ_{m - m' = n} a_m conj(a_m')`.
fn squared_magnitude(a: &[Complex64; 5]) -> [Complex64; SERIES_LEN] {
    let mut out = [ZERO; SERIES_LEN];
    for (i, am) in a.iter().enumerate() {
        for (j, amp) in a.iter().enumerate() {
            out[i + 4 - j] += *am * amp.conj();
        }
    }
    out
}

#[derive(Debug, Clone)]
struct LabSite {
    larmor: f64,
    shielding: [Complex64; 5],
    quadrupolar: [Complex64; 5],
    second_order: Option<[[Complex64; SERIES_LEN]; 2]>,
}

/// Lab-frame series coefficients of one crystallite during one event.
#[derive(Debug, Clone)]
pub struct LabFrame<'a> {
    system: &'a PreparedSystem,
    sites: Vec<LabSite>,
    couplings: Vec<[[Complex64; 5]; 2]>,
}

impl<'a> RotorFrame<'a> {
    /// Expands the rotor-frame tensors for an event's field and rotor geometry.
    pub fn lab(&self, event: &Event) -> LabFrame<'a> {
        let theta = match SpinningRegime::of(event) {
            SpinningRegime::Static => 0.0,
            _ => event.rotor_angle,
        };
        let sites = self
            .system
            .sites
            .iter()
            .zip(&self.sites)
            .map(|(site, [shielding, quadrupolar])| {
                let second_order = if site.isotope.is_quadrupolar() && !quadrupolar.is_zero() {
                    Some([
                        squared_magnitude(&lab_component(quadrupolar, theta, 1)),
                        squared_magnitude(&lab_component(quadrupolar, theta, 2)),
                    ])
                } else {
                    None
                };
                LabSite {
                    larmor: site.isotope.larmor_frequency(event.magnetic_flux_density),
                    shielding: lab_component(shielding, theta, 0),
                    quadrupolar: lab_component(quadrupolar, theta, 0),
                    second_order,
                }
            })
            .collect();
        let couplings = self
            .couplings
            .iter()
            .map(|[j, d]| [lab_component(j, theta, 0), lab_component(d, theta, 0)])
            .collect();
        LabFrame {
            system: self.system,
            sites,
            couplings,
        }
    }
}

impl LabFrame<'_> {
    /// Frequency series of `E(final) - E(initial)` for one transition.
    pub fn series(&self, transition: &Transition) -> FrequencySeries {
        let mut series = FrequencySeries::zero();
        for (index, (site, lab)) in self.system.sites.iter().zip(&self.sites).enumerate() {
            let p = transition.p[index];
            let (mi, mf) = (transition.two_m_initial[index], transition.two_m_final[index]);
            if p != 0 {
                let zeeman = lab.larmor * 1e-6;
                series.coefficients[MAX_HARMONIC as usize] +=
                    -(p as f64) * zeeman * site.isotropic_chemical_shift;
                series.add_rank2(&lab.shielding, p as f64 * zeeman);
            }
            let two_spin = site.isotope.two_spin();
            let first = quadrupolar_first_order_weight(two_spin, mf)
                - quadrupolar_first_order_weight(two_spin, mi);
            series.add_rank2(&lab.quadrupolar, first);
            if let Some([b1, b2]) = &lab.second_order {
                let [w1f, w2f] = quadrupolar_second_order_weights(two_spin, mf);
                let [w1i, w2i] = quadrupolar_second_order_weights(two_spin, mi);
                let scale = quadrupolar_scale(two_spin).powi(2) / lab.larmor;
                series.add_squared(b1, scale * (w1f - w1i));
                series.add_squared(b2, scale * (w2f - w2i));
            }
        }
        for (coupling, [j, d]) in self.system.couplings.iter().zip(&self.couplings) {
            let [a, b] = coupling.sites;
            let product = |state: &[i32]| m_value(state[a]) * m_value(state[b]);
            let delta = product(&transition.two_m_final[..]) - product(&transition.two_m_initial[..]);
            if delta == 0.0 {
                continue;
            }
            series.coefficients[MAX_HARMONIC as usize] += delta * coupling.isotropic_j;
            series.add_rank2(j, delta);
            series.add_rank2(d, 2.0 * delta);
        }
        series
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transitions::{select_transitions, SpinBasis};
    use approx::assert_abs_diff_eq;
    use nmr_core::spin_system::Site;
    use nmr_core::tensor::SymmetricTensor;
    use nmr_method::TransitionQuery;

    fn orientation(alpha: f64, beta: f64) -> Orientation {
        Orientation {
            direction: [beta.sin() * alpha.cos(), beta.sin() * alpha.sin(), beta.cos()],
            alpha,
            beta,
            weight: 1.0,
        }
    }

    fn single_quantum(system: &PreparedSystem) -> Vec<Transition> {
        let basis = SpinBasis::new(system.isotopes());
        let channels = vec![Some(0); system.isotopes().len()];
        select_transitions(&basis, &channels, 1, &[TransitionQuery::p(vec![-1])]).unwrap()
    }

    #[test]
    fn static_csa_matches_closed_form() {
        let (zeta, eta, shift) = (80.0, 0.3, 12.0);
        let site = Site::new("13C", shift).with_shielding(SymmetricTensor::new(zeta, eta).unwrap());
        let system = PreparedSystem::new(&SpinSystem::new(vec![site])).unwrap();
        let transition = &single_quantum(&system)[0];
        let (alpha, beta) = (0.4_f64, 1.0_f64);
        let event = Event::default().with_magnetic_flux_density(9.4);
        let series = system
            .rotor_frame(&orientation(alpha, beta))
            .lab(&event)
            .series(transition);
        let nu0 = Isotope::parse("13C").unwrap().larmor_frequency(9.4);
        let lab = zeta
            * (0.5 * (3.0 * beta.cos().powi(2) - 1.0)
                - 0.5 * eta * beta.sin().powi(2) * (2.0 * alpha).cos());
        let expected = nu0 * 1e-6 * (shift - lab);
        assert_abs_diff_eq!(series.at_origin(), expected, epsilon = 1e-6);
        assert_abs_diff_eq!(series.isotropic(), expected, epsilon = 1e-6);
    }

    #[test]
    fn magic_angle_average_removes_anisotropy() {
        let site = Site::new("13C", 0.0).with_shielding(SymmetricTensor::new(100.0, 0.5).unwrap());
        let system = PreparedSystem::new(&SpinSystem::new(vec![site])).unwrap();
        let transition = &single_quantum(&system)[0];
        let event = Event::default().with_rotor_frequency(1e3);
        let series = system
            .rotor_frame(&orientation(0.3, 0.8))
            .lab(&event)
            .series(transition);
        assert_abs_diff_eq!(series.isotropic(), 0.0, epsilon = 1e-9);
        assert!(series.coefficient(1).norm() > 0.0);
    }

    #[test]
    fn squared_series_matches_direct_product() {
        let a = [
            Complex64::new(0.1, 0.2),
            Complex64::new(-0.3, 0.5),
            Complex64::new(1.0, 0.0),
            Complex64::new(0.3, 0.5),
            Complex64::new(0.1, -0.2),
        ];
        let b = squared_magnitude(&a);
        let t = 0.37_f64;
        let direct: Complex64 = a
            .iter()
            .enumerate()
            .map(|(i, v)| v * Complex64::from_polar(1.0, -((i as f64) - 2.0) * t))
            .sum();
        let series: Complex64 = b
            .iter()
            .enumerate()
            .map(|(i, v)| v * Complex64::from_polar(1.0, -((i as f64) - 4.0) * t))
            .sum();
        assert_abs_diff_eq!(series.re, direct.norm_sqr(), epsilon = 1e-12);
        assert_abs_diff_eq!(series.im, 0.0, epsilon = 1e-12);
    }
}

//! Interaction tensor parameters and their spherical-tensor evaluation.
//!
//! Symmetric tensors follow the Haeberlen convention. Their principal axis
//! system (PAS) components are scaled so that `R_{2,0} = ζ`, `R_{2,±1} = 0` and
//! `R_{2,±2} = -ηζ/√6`, which makes the lab-frame `R_{2,0}` equal to
//! `ζ[(3cos²β - 1)/2 - η sin²β cos 2α / 2]`.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::errors::NmrError;
use crate::wigner::{rotate_rank1, rotate_rank2, EulerAngles};

fn tensor_error(code: &str, message: impl Into<String>) -> NmrError {
    NmrError::invalid(code, message)
}

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Irreducible second-rank symmetric tensor parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SymmetricTensor {
    /// Anisotropy ζ (ppm for shielding, Hz for quadrupolar `Cq`, J and dipolar).
    #[serde(default, alias = "Cq")]
    pub zeta: f64,
    /// Asymmetry η in [0, 1].
    #[serde(default)]
    pub eta: f64,
    /// PAS to common frame Euler angle α (radians).
    #[serde(default)]
    pub alpha: f64,
    /// PAS to common frame Euler angle β (radians).
    #[serde(default)]
    pub beta: f64,
    /// PAS to common frame Euler angle γ (radians).
    #[serde(default)]
    pub gamma: f64,
}

impl SymmetricTensor {
    /// Creates a validated tensor aligned with the common frame.
    pub fn new(zeta: f64, eta: f64) -> Result<Self, NmrError> {
        let tensor = Self {
            zeta,
            eta,
            ..Self::default()
        };
        tensor.validate()?;
        Ok(tensor)
    }

    /// Returns a copy oriented by the given Euler angles.
    pub fn with_euler(self, euler: EulerAngles) -> Self {
        Self {
            alpha: euler.alpha,
            beta: euler.beta,
            gamma: euler.gamma,
            ..self
        }
    }

    /// Orientation of the principal axis system.
    pub fn euler(&self) -> EulerAngles {
        EulerAngles::new(self.alpha, self.beta, self.gamma)
    }

    /// Checks the asymmetry range and finiteness of every parameter.
    pub fn validate(&self) -> Result<(), NmrError> {
        if !self.zeta.is_finite() {
            return Err(tensor_error("non-finite-zeta", "tensor anisotropy must be finite")
                .with_context("zeta", self.zeta));
        }
        if !self.eta.is_finite() || !(0.0..=1.0).contains(&self.eta) {
            return Err(tensor_error(
                "asymmetry-out-of-range",
                "tensor asymmetry must lie in [0, 1]",
            )
            .with_context("eta", self.eta));
        }
        if !self.euler().is_finite() {
            return Err(tensor_error(
                "non-finite-euler",
                "tensor Euler angles must be finite",
            ));
        }
        Ok(())
    }
}

/// Irreducible first-rank antisymmetric tensor parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AntisymmetricTensor {
    /// Anisotropy of the antisymmetric part (Hz).
    #[serde(default)]
    pub zeta: f64,
    /// Azimuthal orientation of the antisymmetric vector (radians).
    #[serde(default)]
    pub alpha: f64,
    /// Polar orientation of the antisymmetric vector (radians).
    #[serde(default)]
    pub beta: f64,
}

impl AntisymmetricTensor {
    /// Checks finiteness of every parameter.
    pub fn validate(&self) -> Result<(), NmrError> {
        if !(self.zeta.is_finite() && self.alpha.is_finite() && self.beta.is_finite()) {
            return Err(tensor_error(
                "non-finite-antisymmetric",
                "antisymmetric tensor parameters must be finite",
            ));
        }
        Ok(())
    }
}

/// Second-rank spherical tensor components indexed by `m + 2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalTensor2 {
    components: [Complex64; 5],
}

impl SphericalTensor2 {
    /// The zero tensor.
    pub const fn zero() -> Self {
        Self {
            components: [ZERO; 5],
        }
    }

    /// Wraps raw components.
    pub const fn from_components(components: [Complex64; 5]) -> Self {
        Self { components }
    }

    /// PAS components for the given anisotropy and asymmetry.
    pub fn principal(zeta: f64, eta: f64) -> Self {
        let off = Complex64::new(-eta * zeta / 6f64.sqrt(), 0.0);
        Self {
            components: [off, ZERO, Complex64::new(zeta, 0.0), ZERO, off],
        }
    }

    /// Component `R_{2,m}` for `m` in `-2..=2`.
    pub fn component(&self, m: i32) -> Complex64 {
        self.components[(m + 2) as usize]
    }

    /// All five components.
    pub fn components(&self) -> &[Complex64; 5] {
        &self.components
    }

    /// Whether every component is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.components.iter().all(|c| c.re == 0.0 && c.im == 0.0)
    }

    /// Components in the frame reached by the given rotation.
    pub fn rotate(&self, euler: &EulerAngles) -> Self {
        if self.is_zero() {
            return *self;
        }
        Self {
            components: rotate_rank2(&self.components, euler),
        }
    }

    /// Scales every component by a real factor.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            components: self.components.map(|c| c * factor),
        }
    }

    /// Component-wise sum.
    pub fn add(&self, other: &Self) -> Self {
        let mut components = self.components;
        for (slot, value) in components.iter_mut().zip(other.components.iter()) {
            *slot += value;
        }
        Self { components }
    }
}

/// First-rank spherical tensor components indexed by `m + 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalTensor1 {
    components: [Complex64; 3],
}

impl SphericalTensor1 {
    /// The zero tensor.
    pub const fn zero() -> Self {
        Self {
            components: [ZERO; 3],
        }
    }

    /// Component `R_{1,m}` for `m` in `-1..=1`.
    pub fn component(&self, m: i32) -> Complex64 {
        self.components[(m + 1) as usize]
    }

    /// Whether every component is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.components.iter().all(|c| c.re == 0.0 && c.im == 0.0)
    }

    /// Components in the frame reached by the given rotation.
    pub fn rotate(&self, euler: &EulerAngles) -> Self {
        Self {
            components: rotate_rank1(&self.components, euler),
        }
    }
}

/// A symmetric interaction evaluated into PAS components plus its orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluatedTensor {
    /// Components in the principal axis system.
    pub pas: SphericalTensor2,
    /// PAS to common frame rotation.
    pub euler: EulerAngles,
}

impl EvaluatedTensor {
    /// An interaction that contributes nothing.
    pub const fn zero() -> Self {
        Self {
            pas: SphericalTensor2::zero(),
            euler: EulerAngles::new(0.0, 0.0, 0.0),
        }
    }

    /// Components expressed in the common (crystallite) frame.
    pub fn common_frame(&self) -> SphericalTensor2 {
        self.pas.rotate(&self.euler)
    }
}

/// Evaluates a symmetric tensor; `None` becomes an explicit zero tensor.
pub fn evaluate_symmetric(tensor: Option<&SymmetricTensor>) -> Result<EvaluatedTensor, NmrError> {
    let Some(tensor) = tensor else {
        return Ok(EvaluatedTensor::zero());
    };
    tensor.validate()?;
    Ok(EvaluatedTensor {
        pas: SphericalTensor2::principal(tensor.zeta, tensor.eta),
        euler: tensor.euler(),
    })
}

/// Evaluates an antisymmetric tensor into common-frame first-rank components.
pub fn evaluate_antisymmetric(
    tensor: Option<&AntisymmetricTensor>,
) -> Result<SphericalTensor1, NmrError> {
    let Some(tensor) = tensor else {
        return Ok(SphericalTensor1::zero());
    };
    tensor.validate()?;
    let pas = SphericalTensor1 {
        components: [ZERO, Complex64::new(tensor.zeta, 0.0), ZERO],
    };
    Ok(pas.rotate(&EulerAngles::new(tensor.alpha, tensor.beta, 0.0)))
}

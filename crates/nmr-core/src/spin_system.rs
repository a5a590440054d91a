//! Plain parameter structs for sites, couplings and spin systems.

use serde::{Deserialize, Serialize};

use crate::errors::NmrError;
use crate::isotope::Isotope;
use crate::tensor::{AntisymmetricTensor, SymmetricTensor};

fn default_isotope() -> String {
    "1H".to_string()
}

fn default_abundance() -> f64 {
    100.0
}

/// Single-site interaction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Isotope symbol, e.g. `"13C"`.
    #[serde(default = "default_isotope")]
    pub isotope: String,
    /// Isotropic chemical shift in ppm.
    #[serde(default)]
    pub isotropic_chemical_shift: f64,
    /// Symmetric part of the nuclear shielding tensor (ζ in ppm).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shielding_symmetric: Option<SymmetricTensor>,
    /// Electric quadrupolar tensor (ζ is `Cq` in Hz).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quadrupolar: Option<SymmetricTensor>,
    /// Optional site name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional site label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Default for Site {
    fn default() -> Self {
        Self {
            isotope: default_isotope(),
            isotropic_chemical_shift: 0.0,
            shielding_symmetric: None,
            quadrupolar: None,
            name: None,
            label: None,
        }
    }
}

impl Site {
    /// Creates a site with only an isotropic shift.
    pub fn new(isotope: impl Into<String>, isotropic_chemical_shift: f64) -> Self {
        Self {
            isotope: isotope.into(),
            isotropic_chemical_shift,
            ..Self::default()
        }
    }

    /// Adds a shielding tensor.
    pub fn with_shielding(mut self, tensor: SymmetricTensor) -> Self {
        self.shielding_symmetric = Some(tensor);
        self
    }

    /// Adds a quadrupolar tensor.
    pub fn with_quadrupolar(mut self, tensor: SymmetricTensor) -> Self {
        self.quadrupolar = Some(tensor);
        self
    }

    /// Validates the site and resolves its isotope.
    pub fn validate(&self) -> Result<Isotope, NmrError> {
        let isotope = Isotope::parse(&self.isotope)?;
        if !self.isotropic_chemical_shift.is_finite() {
            return Err(NmrError::invalid(
                "non-finite-shift",
                "isotropic chemical shift must be finite",
            ));
        }
        if let Some(tensor) = &self.shielding_symmetric {
            tensor.validate()?;
        }
        if let Some(tensor) = &self.quadrupolar {
            tensor.validate()?;
            if !isotope.is_quadrupolar() && tensor.zeta != 0.0 {
                return Err(NmrError::invalid(
                    "quadrupolar-on-spin-half",
                    "quadrupolar tensors require a spin greater than 1/2",
                )
                .with_context("isotope", isotope.symbol()));
            }
        }
        Ok(isotope)
    }
}

/// Pairwise coupling parameters between two sites of the same spin system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupling {
    /// Indices of the two coupled sites.
    pub site_index: [usize; 2],
    /// Isotropic J coupling in Hz.
    #[serde(default)]
    pub isotropic_j: f64,
    /// Symmetric part of the J tensor (ζ in Hz).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub j_symmetric: Option<SymmetricTensor>,
    /// Antisymmetric part of the J tensor (ζ in Hz).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub j_antisymmetric: Option<AntisymmetricTensor>,
    /// Direct dipolar coupling tensor (ζ in Hz).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dipolar: Option<SymmetricTensor>,
    /// Optional coupling name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional coupling label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Coupling {
    /// Creates an isotropic J coupling between two sites.
    pub fn new(site_index: [usize; 2], isotropic_j: f64) -> Self {
        Self {
            site_index,
            isotropic_j,
            j_symmetric: None,
            j_antisymmetric: None,
            dipolar: None,
            name: None,
            label: None,
            description: None,
        }
    }

    /// Adds a dipolar tensor.
    pub fn with_dipolar(mut self, tensor: SymmetricTensor) -> Self {
        self.dipolar = Some(tensor);
        self
    }

    /// Validates indices against the number of sites and the tensor parameters.
    pub fn validate(&self, num_sites: usize) -> Result<(), NmrError> {
        let [a, b] = self.site_index;
        if a == b {
            return Err(NmrError::invalid(
                "coupling-self-reference",
                "the two coupled site indices must differ",
            ));
        }
        if a >= num_sites || b >= num_sites {
            return Err(NmrError::invalid(
                "coupling-index-out-of-range",
                "coupled site index exceeds the number of sites",
            )
            .with_context("num_sites", num_sites));
        }
        if !self.isotropic_j.is_finite() {
            return Err(NmrError::invalid(
                "non-finite-j",
                "isotropic J coupling must be finite",
            ));
        }
        for tensor in [&self.j_symmetric, &self.dipolar].into_iter().flatten() {
            tensor.validate()?;
        }
        if let Some(tensor) = &self.j_antisymmetric {
            tensor.validate()?;
        }
        Ok(())
    }
}

/// Isolated set of coupled sites with a relative abundance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinSystem {
    /// Sites of the spin system.
    #[serde(default)]
    pub sites: Vec<Site>,
    /// Couplings between sites.
    #[serde(default)]
    pub couplings: Vec<Coupling>,
    /// Abundance in percent.
    #[serde(default = "default_abundance")]
    pub abundance: f64,
    /// Optional name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Default for SpinSystem {
    fn default() -> Self {
        Self {
            sites: Vec::new(),
            couplings: Vec::new(),
            abundance: default_abundance(),
            name: None,
            label: None,
        }
    }
}

impl SpinSystem {
    /// Creates an uncoupled spin system at full abundance.
    pub fn new(sites: Vec<Site>) -> Self {
        Self {
            sites,
            ..Self::default()
        }
    }

    /// Adds couplings to the spin system.
    pub fn with_couplings(mut self, couplings: Vec<Coupling>) -> Self {
        self.couplings = couplings;
        self
    }

    /// Validates every site and coupling and returns the resolved isotopes.
    ///
    /// Errors carry `site` or `coupling` context with the offending index.
    pub fn validate(&self) -> Result<Vec<Isotope>, NmrError> {
        if !self.abundance.is_finite() || !(0.0..=100.0).contains(&self.abundance) {
            return Err(NmrError::invalid(
                "abundance-out-of-range",
                "spin system abundance must lie in [0, 100] percent",
            )
            .with_context("abundance", self.abundance));
        }
        let isotopes = self
            .sites
            .iter()
            .enumerate()
            .map(|(index, site)| site.validate().map_err(|err| err.with_context("site", index)))
            .collect::<Result<Vec<_>, _>>()?;
        for (index, coupling) in self.couplings.iter().enumerate() {
            coupling
                .validate(self.sites.len())
                .map_err(|err| err.with_context("coupling", index))?;
        }
        Ok(isotopes)
    }
}

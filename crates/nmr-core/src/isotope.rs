//! Nuclear isotope table.

use crate::errors::NmrError;

/// Immutable description of an NMR active isotope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Isotope {
    symbol: &'static str,
    two_spin: u32,
    gyromagnetic_ratio: f64,
}

// (symbol, 2I, gamma / 2pi in MHz/T)
const ISOTOPES: &[(&str, u32, f64)] = &[
    ("1H", 1, 42.577_478_92),
    ("2H", 2, 6.535_90),
    ("7Li", 3, 16.548_20),
    ("11B", 3, 13.663_00),
    ("13C", 1, 10.708_39),
    ("14N", 2, 3.077_70),
    ("15N", 1, -4.317_26),
    ("17O", 5, -5.774_26),
    ("19F", 1, 40.077_57),
    ("23Na", 3, 11.269_52),
    ("27Al", 5, 11.103_08),
    ("29Si", 1, -8.465_47),
    ("31P", 1, 17.251_44),
    ("33S", 3, 3.271_61),
    ("35Cl", 3, 4.176_54),
    ("39K", 3, 1.989_35),
    ("43Ca", 7, -2.869_16),
    ("51V", 7, 11.213_27),
    ("59Co", 7, 10.077_00),
    ("71Ga", 3, 13.020_86),
    ("87Rb", 3, 13.984_30),
    ("93Nb", 9, 10.452_30),
    ("113Cd", 1, -9.449_43),
    ("119Sn", 1, -15.968_06),
    ("207Pb", 1, 8.907_66),
];

impl Isotope {
    /// Looks up an isotope by its symbol, e.g. `"13C"` or `"27Al"`.
    pub fn parse(symbol: &str) -> Result<Self, NmrError> {
        let trimmed = symbol.trim();
        ISOTOPES
            .iter()
            .find(|(name, _, _)| name.eq_ignore_ascii_case(trimmed))
            .map(|&(name, two_spin, gyromagnetic_ratio)| Isotope {
                symbol: name,
                two_spin,
                gyromagnetic_ratio,
            })
            .ok_or_else(|| {
                NmrError::invalid("unknown-isotope", format!("isotope `{trimmed}` is not known"))
                    .with_hint("use a mass number followed by the element symbol, e.g. `13C`")
            })
    }

    /// Canonical isotope symbol.
    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    /// Twice the spin quantum number, kept integral to avoid half-integer arithmetic.
    pub fn two_spin(&self) -> u32 {
        self.two_spin
    }

    /// Spin quantum number I.
    pub fn spin(&self) -> f64 {
        self.two_spin as f64 / 2.0
    }

    /// Gyromagnetic ratio divided by 2π, in MHz/T.
    pub fn gyromagnetic_ratio(&self) -> f64 {
        self.gyromagnetic_ratio
    }

    /// Magnitude of the Larmor frequency in Hz at the given field (T).
    pub fn larmor_frequency(&self, magnetic_flux_density: f64) -> f64 {
        (self.gyromagnetic_ratio * magnetic_flux_density * 1e6).abs()
    }

    /// Whether the nucleus carries an electric quadrupole moment (I > 1/2).
    pub fn is_quadrupolar(&self) -> bool {
        self.two_spin > 1
    }

    /// Allowed values of 2m ordered from +2I down to -2I.
    pub fn two_m_values(&self) -> impl Iterator<Item = i32> {
        let two_spin = self.two_spin as i32;
        (0..=two_spin).map(move |step| two_spin - 2 * step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_isotopes() {
        let carbon = Isotope::parse("13C").unwrap();
        assert_eq!(carbon.two_spin(), 1);
        assert!(!carbon.is_quadrupolar());
        let oxygen = Isotope::parse(" 17o ").unwrap();
        assert_eq!(oxygen.symbol(), "17O");
        assert_eq!(oxygen.two_spin(), 5);
    }

    #[test]
    fn rejects_unknown_isotope() {
        let err = Isotope::parse("12C").unwrap_err();
        assert_eq!(err.info().code, "unknown-isotope");
    }

    #[test]
    fn magnetic_quantum_numbers_descend() {
        let sodium = Isotope::parse("23Na").unwrap();
        let values: Vec<_> = sodium.two_m_values().collect();
        assert_eq!(values, vec![3, 1, -1, -3]);
    }

    #[test]
    fn larmor_frequency_is_a_magnitude() {
        let silicon = Isotope::parse("29Si").unwrap();
        assert!(silicon.larmor_frequency(9.4) > 0.0);
    }
}

//! Spin-space functions for single-site energies and transitions.
//!
//! Magnetic quantum numbers are carried as `2m` so that half-integer spins stay
//! integral. Energies are written in the shift convention: the Zeeman term is
//! `E(m) = -m ν0`, so a `m = +1/2 → -1/2` transition appears at positive shift.

/// Magnetic quantum number m from its doubled representation.
pub fn m_value(two_m: i32) -> f64 {
    two_m as f64 / 2.0
}

/// Coherence order change `p = m_f - m_i`.
pub fn delta_p(two_m_initial: i32, two_m_final: i32) -> i32 {
    (two_m_final - two_m_initial) / 2
}

/// Satellite order change `d = m_f² - m_i²`, always integral within one site.
pub fn delta_d(two_m_initial: i32, two_m_final: i32) -> i32 {
    (two_m_final * two_m_final - two_m_initial * two_m_initial) / 4
}

fn spin_product(two_spin: u32) -> f64 {
    let spin = two_spin as f64 / 2.0;
    spin * (spin + 1.0)
}

/// First-order quadrupolar energy weight `(3m² - I(I+1)) / (4I(2I-1))`.
///
/// Multiplies the lab-frame `R_{2,0}` of a tensor whose anisotropy is `Cq`.
pub fn quadrupolar_first_order_weight(two_spin: u32, two_m: i32) -> f64 {
    if two_spin < 2 {
        return 0.0;
    }
    let spin = two_spin as f64 / 2.0;
    let m = m_value(two_m);
    (3.0 * m * m - spin_product(two_spin)) / (4.0 * spin * (2.0 * spin - 1.0))
}

/// Scale `ω_q = √(3/2) / (2I(2I-1))` between `Cq`-scaled components and the
/// spherical tensor form of the quadrupolar Hamiltonian.
pub fn quadrupolar_scale(two_spin: u32) -> f64 {
    if two_spin < 2 {
        return 0.0;
    }
    let spin = two_spin as f64 / 2.0;
    1.5f64.sqrt() / (2.0 * spin * (2.0 * spin - 1.0))
}

/// Second-order quadrupolar energy weights `[w1, w2]` such that
/// `E⁽²⁾(m) = (ω_q² / ν0) (w1 |R_{2,1}|² + w2 |R_{2,2}|²)` with lab-frame components.
pub fn quadrupolar_second_order_weights(two_spin: u32, two_m: i32) -> [f64; 2] {
    if two_spin < 2 {
        return [0.0, 0.0];
    }
    let x = spin_product(two_spin);
    let m = m_value(two_m);
    [
        0.5 * m * (4.0 * x - 8.0 * m * m - 1.0),
        -0.5 * m * (2.0 * x - 2.0 * m * m - 1.0),
    ]
}

/// Fourth-rank second-order spin transition function (up to a constant factor),
/// `c4 = g(m_f) - g(m_i)` with `g(m) = -m (18 I(I+1) - 34 m² - 5)`.
///
/// The ratio of two transitions' values gives the multiple-quantum shear factor.
pub fn fourth_rank_transition_function(two_spin: u32, two_m_initial: i32, two_m_final: i32) -> f64 {
    let x = spin_product(two_spin);
    let g = |two_m: i32| {
        let m = m_value(two_m);
        -m * (18.0 * x - 34.0 * m * m - 5.0)
    };
    g(two_m_final) - g(two_m_initial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn transition_orders() {
        assert_eq!(delta_p(1, -1), -1);
        assert_eq!(delta_d(1, -1), 0);
        assert_eq!(delta_p(3, 1), -1);
        assert_eq!(delta_d(3, 1), -2);
        assert_eq!(delta_p(3, -3), -3);
    }

    #[test]
    fn central_transition_has_no_first_order_quadrupolar_shift() {
        let up = quadrupolar_first_order_weight(3, 1);
        let down = quadrupolar_first_order_weight(3, -1);
        assert_abs_diff_eq!(up - down, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn spin_three_halves_shear_ratio() {
        let ct = fourth_rank_transition_function(3, 1, -1);
        let tq = fourth_rank_transition_function(3, 3, -3);
        assert_abs_diff_eq!(tq / ct, -7.0 / 9.0, epsilon = 1e-12);
    }

    #[test]
    fn spin_five_halves_shear_ratio() {
        let ct = fourth_rank_transition_function(5, 1, -1);
        let tq = fourth_rank_transition_function(5, 3, -3);
        assert_abs_diff_eq!(tq / ct, 19.0 / 12.0, epsilon = 1e-12);
    }

    #[test]
    fn spin_half_has_no_quadrupolar_terms() {
        assert_eq!(quadrupolar_scale(1), 0.0);
        assert_eq!(quadrupolar_second_order_weights(1, 1), [0.0, 0.0]);
    }
}

//! Renewal-equation infectious pressure.
//!
//! ```text
//! Λ(t) = Σ_{s=1}^{K} I(t − s) · w(s)
//! ```
//!
//! `w(0)` is ignored: a case cannot infect on its own onset day. Days before
//! the start of the series contribute nothing.

use crate::distribution::Distribution;

/// `Λ(t)` for every day of `incidence`.
pub fn infectious_pressure(incidence: &[f64], si: &Distribution) -> Vec<f64> {
    (0..incidence.len())
        .map(|t| {
            (1..si.len())
                .take_while(|&s| s <= t)
                .map(|s| incidence[t - s] * si.mass(s))
                .sum()
        })
        .collect()
}

/// Sum of `values[t + 1 - window ..= t]`.
pub fn trailing_sum(values: &[f64], t: usize, window: usize) -> f64 {
    values[t + 1 - window..=t].iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convolution_uses_past_days_only() {
        let si = Distribution::from_weights(vec![0.0, 0.0, 0.25, 0.5, 0.25]).unwrap();
        let incidence = [100.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let lambda = infectious_pressure(&incidence, &si);
        assert_eq!(lambda, vec![0.0, 0.0, 25.0, 50.0, 25.0, 0.0]);
    }

    #[test]
    fn same_day_mass_is_ignored() {
        let si = Distribution::from_weights(vec![0.5, 0.5]).unwrap();
        let lambda = infectious_pressure(&[10.0, 10.0], &si);
        assert_eq!(lambda, vec![0.0, 5.0]);
    }

    #[test]
    fn constant_incidence_gives_pressure_near_incidence() {
        let si = Distribution::from_weights(vec![0.0, 0.2, 0.3, 0.5]).unwrap();
        let lambda = infectious_pressure(&[40.0; 10], &si);
        assert!((lambda[9] - 40.0).abs() < 1e-12);
        assert!((trailing_sum(&lambda, 9, 3) - 120.0).abs() < 1e-12);
    }
}

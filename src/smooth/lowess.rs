//! Robust locally weighted regression (LOWESS) on an equally spaced day index.
//!
//! Backed by the `lowess` crate in batch mode. A bandwidth of `k` days maps to
//! a smoothing fraction of `k / n`, so each local fit sees the `k` nearest
//! days. Fits use the tricube kernel; robustness passes reweight residuals
//! with bisquare weights on the MAD, which keeps single-day reporting spikes
//! from dragging the curve.

use lowess::prelude::*;

use crate::error::EstimationError;
use crate::smooth::Smoother;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowessSmoother {
    /// Number of neighbouring days in each local fit.
    pub bandwidth: usize,
    /// Bisquare reweighting passes after the first fit.
    pub robustness_iters: usize,
}

impl LowessSmoother {
    pub fn new(bandwidth: usize, robustness_iters: usize) -> Self {
        Self {
            bandwidth,
            robustness_iters,
        }
    }

    /// Share of the series each local fit covers.
    fn fraction(&self, n: usize) -> f64 {
        self.bandwidth.min(n) as f64 / n as f64
    }
}

impl Smoother for LowessSmoother {
    fn smooth(&self, values: &[f64]) -> Result<Vec<f64>, EstimationError> {
        if self.bandwidth == 0 {
            return Err(EstimationError::invalid_parameter("LOWESS bandwidth must be >= 1 day"));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(EstimationError::malformed(format!("cannot smooth non-finite value {bad}")));
        }
        if values.len() <= 2 || self.bandwidth == 1 {
            return Ok(values.to_vec());
        }

        let x: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
        let model = Lowess::new()
            .fraction(self.fraction(values.len()))
            .iterations(self.robustness_iters)
            // Every day is fitted; no interpolation between anchor points.
            .delta(0.0)
            .boundary_policy(NoBoundary)
            .weight_function(Tricube)
            .robustness_method(Bisquare)
            .scaling_method(MAD)
            .zero_weight_fallback(UseLocalMean)
            .adapter(Batch)
            .build()
            .map_err(lowess_error)?;

        let fit = model.fit(&x, values).map_err(lowess_error)?;
        if fit.y.len() != values.len() {
            return Err(EstimationError::malformed(format!(
                "LOWESS returned {} values for {} days",
                fit.y.len(),
                values.len()
            )));
        }
        Ok(fit.y)
    }

    fn name(&self) -> &'static str {
        "lowess"
    }
}

fn lowess_error(err: LowessError) -> EstimationError {
    EstimationError::invalid_parameter(format!("LOWESS: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn reproduces_a_straight_line() {
        let y: Vec<f64> = (0..30).map(|i| 5.0 + 2.0 * i as f64).collect();
        let out = LowessSmoother::new(7, 2).smooth(&y).unwrap();
        for (a, b) in out.iter().zip(&y) {
            assert_relative_eq!(a, b, epsilon = 1e-6);
        }
    }

    #[test]
    fn damps_a_single_day_spike() {
        let mut y = vec![100.0; 40];
        y[20] = 1_000.0;
        let plain = LowessSmoother::new(14, 0).smooth(&y).unwrap();
        let robust = LowessSmoother::new(14, 2).smooth(&y).unwrap();
        assert!(plain[20] < 1_000.0);
        assert!(robust[20] <= plain[20] + 1e-9);
        assert!(robust[20] < 200.0, "robust spike={}", robust[20]);
        assert!((robust[5] - 100.0).abs() < 1e-6);
    }

    #[test]
    fn zeros_stay_zero() {
        let out = LowessSmoother::new(14, 2).smooth(&[0.0; 25]).unwrap();
        assert!(out.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn bandwidth_maps_to_a_fraction_of_the_series() {
        let s = LowessSmoother::new(14, 2);
        assert_relative_eq!(s.fraction(28), 0.5);
        assert_relative_eq!(s.fraction(10), 1.0);
    }

    #[test]
    fn preserves_length_and_handles_tiny_inputs() {
        let s = LowessSmoother::new(14, 2);
        assert!(s.smooth(&[]).unwrap().is_empty());
        assert_eq!(s.smooth(&[3.0]).unwrap(), vec![3.0]);
        assert_eq!(s.smooth(&[1.0, 2.0, 9.0, 4.0]).unwrap().len(), 4);
        assert!(LowessSmoother::new(0, 0).smooth(&[1.0]).is_err());
        assert!(s.smooth(&[1.0, f64::NAN, 3.0]).is_err());
    }
}

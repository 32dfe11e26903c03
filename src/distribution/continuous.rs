//! Continuous delay laws that can be discretized into day-offset pmfs.

use std::f64::consts::SQRT_2;

use serde::{Deserialize, Serialize};

use crate::domain::ContinuousFamily;
use crate::error::EstimationError;
use crate::math::{erf, regularized_gamma_p};

/// A fully parameterised continuous distribution on `(0, ∞)`, in days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum ContinuousDistribution {
    Gamma { shape: f64, scale: f64 },
    /// `ln X ~ Normal(mu, sigma²)`.
    LogNormal { mu: f64, sigma: f64 },
}

impl ContinuousDistribution {
    pub fn gamma(shape: f64, scale: f64) -> Result<Self, EstimationError> {
        if !(shape.is_finite() && shape > 0.0 && scale.is_finite() && scale > 0.0) {
            return Err(EstimationError::invalid_distribution(format!(
                "gamma needs finite shape > 0 and scale > 0 (got shape={shape}, scale={scale})"
            )));
        }
        Ok(Self::Gamma { shape, scale })
    }

    pub fn log_normal(mu: f64, sigma: f64) -> Result<Self, EstimationError> {
        if !(mu.is_finite() && sigma.is_finite() && sigma > 0.0) {
            return Err(EstimationError::invalid_distribution(format!(
                "log-normal needs finite mu and sigma > 0 (got mu={mu}, sigma={sigma})"
            )));
        }
        Ok(Self::LogNormal { mu, sigma })
    }

    /// Moment-match a family to a mean and standard deviation (days).
    pub fn from_mean_std(family: ContinuousFamily, mean: f64, std: f64) -> Result<Self, EstimationError> {
        if !(mean.is_finite() && mean > 0.0 && std.is_finite() && std > 0.0) {
            return Err(EstimationError::invalid_distribution(format!(
                "mean and std must be finite and > 0 (got mean={mean}, std={std})"
            )));
        }
        match family {
            ContinuousFamily::Gamma => Self::gamma((mean / std).powi(2), std * std / mean),
            ContinuousFamily::LogNormal => {
                let sigma2 = (1.0 + (std / mean).powi(2)).ln();
                Self::log_normal(mean.ln() - sigma2 / 2.0, sigma2.sqrt())
            }
        }
    }

    pub fn cdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        match *self {
            Self::Gamma { shape, scale } => regularized_gamma_p(shape, x / scale),
            Self::LogNormal { mu, sigma } => 0.5 * (1.0 + erf((x.ln() - mu) / (sigma * SQRT_2))),
        }
    }

    pub fn mean(&self) -> f64 {
        match *self {
            Self::Gamma { shape, scale } => shape * scale,
            Self::LogNormal { mu, sigma } => (mu + sigma * sigma / 2.0).exp(),
        }
    }

    pub fn std(&self) -> f64 {
        match *self {
            Self::Gamma { shape, scale } => shape.sqrt() * scale,
            Self::LogNormal { mu, sigma } => {
                let s2 = sigma * sigma;
                ((s2.exp() - 1.0) * (2.0 * mu + s2).exp()).sqrt()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn moment_matching_round_trips() {
        for family in [ContinuousFamily::Gamma, ContinuousFamily::LogNormal] {
            let d = ContinuousDistribution::from_mean_std(family, 4.8, 2.3).unwrap();
            assert_relative_eq!(d.mean(), 4.8, epsilon = 1e-9);
            assert_relative_eq!(d.std(), 2.3, epsilon = 1e-9);
        }
    }

    #[test]
    fn cdf_is_monotone_and_bounded() {
        let d = ContinuousDistribution::from_mean_std(ContinuousFamily::LogNormal, 5.0, 3.0).unwrap();
        let mut prev = 0.0;
        for i in 0..60 {
            let c = d.cdf(i as f64 * 0.5);
            assert!(c >= prev && c <= 1.0);
            prev = c;
        }
        assert_eq!(d.cdf(-1.0), 0.0);
    }

    #[test]
    fn log_normal_median_is_exp_mu() {
        let d = ContinuousDistribution::log_normal(1.5, 0.4).unwrap();
        assert_relative_eq!(d.cdf(1.5f64.exp()), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn rejects_non_positive_parameters() {
        assert!(ContinuousDistribution::gamma(0.0, 1.0).is_err());
        assert!(ContinuousDistribution::from_mean_std(ContinuousFamily::Gamma, 4.0, -1.0).is_err());
    }
}

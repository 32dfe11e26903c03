//! Discrete probability mass over integer day offsets.

use serde::{Deserialize, Serialize};

use crate::error::EstimationError;

/// Maximum deviation of a pmf's total mass from 1.
pub const PMF_TOLERANCE: f64 = 1e-9;

/// Non-negative probabilities indexed by day offset `0..K`, summing to 1.
///
/// Deserialization goes through the same validation as [`Distribution::from_weights`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Distribution {
    pmf: Vec<f64>,
}

impl Distribution {
    /// Validate an explicit pmf.
    pub fn from_weights(pmf: Vec<f64>) -> Result<Self, EstimationError> {
        if pmf.is_empty() {
            return Err(EstimationError::invalid_distribution("pmf has empty support"));
        }
        if let Some((offset, p)) = pmf.iter().enumerate().find(|(_, p)| !p.is_finite() || **p < 0.0) {
            return Err(EstimationError::invalid_distribution(format!(
                "mass at offset {offset} must be finite and non-negative (got {p})"
            )));
        }
        let total: f64 = pmf.iter().sum();
        if (total - 1.0).abs() > PMF_TOLERANCE {
            return Err(EstimationError::invalid_distribution(format!(
                "pmf sums to {total:.12}, expected 1"
            )));
        }
        Ok(Self { pmf })
    }

    /// Scale non-negative weights so they sum to 1.
    pub fn normalized(weights: Vec<f64>) -> Result<Self, EstimationError> {
        let total: f64 = weights.iter().sum();
        if !(total.is_finite() && total > 0.0) {
            return Err(EstimationError::invalid_distribution(format!(
                "cannot normalize weights with total mass {total}"
            )));
        }
        Self::from_weights(weights.into_iter().map(|w| w / total).collect())
    }

    pub fn weights(&self) -> &[f64] {
        &self.pmf
    }

    /// Mass at `offset` (zero beyond the support).
    pub fn mass(&self, offset: usize) -> f64 {
        self.pmf.get(offset).copied().unwrap_or(0.0)
    }

    /// Number of offsets in the support (`K + 1`).
    pub fn len(&self) -> usize {
        self.pmf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pmf.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.pmf.iter().sum()
    }

    /// Expected offset in days.
    pub fn mean(&self) -> f64 {
        self.pmf.iter().enumerate().map(|(d, p)| d as f64 * p).sum()
    }

    /// Smallest offset whose cumulative mass reaches `p`.
    pub fn quantile_offset(&self, p: f64) -> usize {
        let mut cum = 0.0;
        for (offset, mass) in self.pmf.iter().enumerate() {
            cum += mass;
            if cum + PMF_TOLERANCE >= p {
                return offset;
            }
        }
        self.pmf.len() - 1
    }

    /// Distribution of the sum of two independent offsets.
    pub fn convolve(&self, other: &Distribution) -> Distribution {
        let mut out = vec![0.0; self.pmf.len() + other.pmf.len() - 1];
        for (i, a) in self.pmf.iter().enumerate() {
            for (j, b) in other.pmf.iter().enumerate() {
                out[i + j] += a * b;
            }
        }
        let total: f64 = out.iter().sum();
        Distribution {
            pmf: out.into_iter().map(|p| p / total).collect(),
        }
    }
}

impl TryFrom<Vec<f64>> for Distribution {
    type Error = EstimationError;

    fn try_from(value: Vec<f64>) -> Result<Self, Self::Error> {
        Distribution::from_weights(value)
    }
}

impl From<Distribution> for Vec<f64> {
    fn from(value: Distribution) -> Self {
        value.pmf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_mass() {
        assert!(matches!(
            Distribution::from_weights(vec![]),
            Err(EstimationError::InvalidDistribution(_))
        ));
        assert!(Distribution::from_weights(vec![0.5, 0.6]).is_err());
        assert!(Distribution::from_weights(vec![1.2, -0.2]).is_err());
        assert!(Distribution::from_weights(vec![f64::NAN, 1.0]).is_err());
        assert!(Distribution::from_weights(vec![0.25, 0.75]).is_ok());
    }

    #[test]
    fn normalized_rescales() {
        let d = Distribution::normalized(vec![1.0, 3.0]).unwrap();
        assert_eq!(d.weights(), &[0.25, 0.75]);
        assert!(Distribution::normalized(vec![0.0, 0.0]).is_err());
    }

    #[test]
    fn mean_quantile_and_convolution() {
        let a = Distribution::from_weights(vec![0.0, 0.5, 0.5]).unwrap();
        assert!((a.mean() - 1.5).abs() < 1e-12);
        assert_eq!(a.quantile_offset(0.5), 1);
        assert_eq!(a.quantile_offset(0.9), 2);

        let b = Distribution::from_weights(vec![0.0, 1.0]).unwrap();
        let c = a.convolve(&b);
        assert_eq!(c.len(), 4);
        assert!((c.mean() - 2.5).abs() < 1e-12);
        assert!((c.total() - 1.0).abs() < PMF_TOLERANCE);
    }

    #[test]
    fn deserialization_validates() {
        let ok: Distribution = serde_json::from_str("[0.5, 0.5]").unwrap();
        assert_eq!(ok.len(), 2);
        assert!(serde_json::from_str::<Distribution>("[0.5, 0.4]").is_err());
    }
}

//! DistributionBuilder: default profiles and midpoint discretization.
//!
//! Custom mode discretizes a continuous law `F` as:
//!
//! ```text
//! pmf[0] = F(0.5) - F(0)
//! pmf[d] = F(d + 0.5) - F(d - 0.5)      d >= 1
//! ```
//!
//! stopping at the first offset `K` where `F(K + 0.5)` reaches the truncation
//! mass, then renormalizing so the truncated pmf sums to 1.

use tracing::debug;

use crate::distribution::continuous::ContinuousDistribution;
use crate::distribution::pmf::Distribution;
use crate::distribution::profiles::DefaultProfile;
use crate::domain::DistributionSpec;
use crate::error::EstimationError;

/// Default cumulative mass kept before truncating the tail.
pub const DEFAULT_TRUNCATION_MASS: f64 = 0.999;

/// Default hard cap on the support length, in days.
pub const DEFAULT_MAX_SUPPORT: usize = 365;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistributionBuilder {
    profile: DefaultProfile,
    truncation_mass: f64,
    max_support: usize,
}

impl Default for DistributionBuilder {
    fn default() -> Self {
        Self {
            profile: DefaultProfile::default(),
            truncation_mass: DEFAULT_TRUNCATION_MASS,
            max_support: DEFAULT_MAX_SUPPORT,
        }
    }
}

impl DistributionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, profile: DefaultProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_truncation_mass(mut self, mass: f64) -> Self {
        self.truncation_mass = mass;
        self
    }

    pub fn with_max_support(mut self, days: usize) -> Self {
        self.max_support = days;
        self
    }

    /// The profile's pre-tabulated serial interval.
    pub fn default_serial_interval(&self) -> Result<Distribution, EstimationError> {
        Distribution::from_weights(self.profile.serial_interval().to_vec())
    }

    /// The profile's pre-tabulated infection-to-reporting delay.
    pub fn default_reporting_delay(&self) -> Result<Distribution, EstimationError> {
        Distribution::from_weights(self.profile.reporting_delay().to_vec())
    }

    /// Resolve a spec to a serial-interval pmf.
    pub fn serial_interval(&self, spec: &DistributionSpec) -> Result<Distribution, EstimationError> {
        match spec {
            DistributionSpec::Default => self.default_serial_interval(),
            other => self.custom(other),
        }
    }

    /// Resolve a spec to a reporting-delay pmf.
    pub fn reporting_delay(&self, spec: &DistributionSpec) -> Result<Distribution, EstimationError> {
        match spec {
            DistributionSpec::Default => self.default_reporting_delay(),
            other => self.custom(other),
        }
    }

    fn custom(&self, spec: &DistributionSpec) -> Result<Distribution, EstimationError> {
        match spec {
            DistributionSpec::Default => self.default_serial_interval(),
            DistributionSpec::MeanStd { family, mean, std } => {
                self.discretize(&ContinuousDistribution::from_mean_std(*family, *mean, *std)?)
            }
            DistributionSpec::GammaShapeScale { shape, scale } => {
                self.discretize(&ContinuousDistribution::gamma(*shape, *scale)?)
            }
            DistributionSpec::Weights { pmf } => Distribution::from_weights(pmf.clone()),
        }
    }

    /// Midpoint-discretize a continuous law into a truncated, renormalized pmf.
    pub fn discretize(&self, law: &ContinuousDistribution) -> Result<Distribution, EstimationError> {
        if !(self.truncation_mass > 0.0 && self.truncation_mass < 1.0) {
            return Err(EstimationError::invalid_distribution(format!(
                "truncation mass must be in (0, 1) (got {})",
                self.truncation_mass
            )));
        }
        if self.max_support == 0 {
            return Err(EstimationError::invalid_distribution("max support must be >= 1 day"));
        }

        let mut pmf = Vec::new();
        let mut lower = law.cdf(0.0);
        for offset in 0..self.max_support {
            let upper = law.cdf(offset as f64 + 0.5);
            pmf.push((upper - lower).max(0.0));
            lower = upper;
            if upper >= self.truncation_mass {
                break;
            }
        }

        debug!(
            support = pmf.len(),
            kept_mass = lower,
            mean = law.mean(),
            "discretized continuous distribution"
        );
        Distribution::normalized(pmf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::PMF_TOLERANCE;
    use crate::domain::ContinuousFamily;

    #[test]
    fn default_profile_is_bit_identical_across_calls() {
        let builder = DistributionBuilder::new();
        let a = builder.serial_interval(&DistributionSpec::Default).unwrap();
        let b = DistributionBuilder::new().serial_interval(&DistributionSpec::Default).unwrap();
        let bits = |d: &Distribution| d.weights().iter().map(|p| p.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn gamma_discretization_sums_to_one_for_any_truncation() {
        for mass in [0.5, 0.9, 0.99, 0.999, 0.999_999] {
            let builder = DistributionBuilder::new().with_truncation_mass(mass);
            let spec = DistributionSpec::MeanStd {
                family: ContinuousFamily::Gamma,
                mean: 4.8,
                std: 2.3,
            };
            let d = builder.serial_interval(&spec).unwrap();
            assert!((d.total() - 1.0).abs() < PMF_TOLERANCE, "mass={mass}");
            assert!(d.weights().iter().all(|p| *p >= 0.0));
        }
    }

    #[test]
    fn discretization_reproduces_the_default_table() {
        let spec = DistributionSpec::MeanStd {
            family: ContinuousFamily::Gamma,
            mean: 4.8,
            std: 2.3,
        };
        let built = DistributionBuilder::new().serial_interval(&spec).unwrap();
        let table = DistributionBuilder::new().default_serial_interval().unwrap();
        assert_eq!(built.len(), table.len());
        for (a, b) in built.weights().iter().zip(table.weights()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn truncation_follows_the_mass_threshold() {
        let law = ContinuousDistribution::gamma(1.0, 1.0).unwrap();
        // Exponential(1): F(k + 0.5) >= 0.9 first at k = 2 (F(2.5) = 0.918).
        let d = DistributionBuilder::new().with_truncation_mass(0.9).discretize(&law).unwrap();
        assert_eq!(d.len(), 3);
        let raw0 = 1.0 - (-0.5f64).exp();
        let kept = 1.0 - (-2.5f64).exp();
        assert!((d.mass(0) - raw0 / kept).abs() < 1e-12);
    }

    #[test]
    fn max_support_caps_heavy_tails() {
        let spec = DistributionSpec::MeanStd {
            family: ContinuousFamily::LogNormal,
            mean: 30.0,
            std: 60.0,
        };
        let d = DistributionBuilder::new().with_max_support(20).serial_interval(&spec).unwrap();
        assert_eq!(d.len(), 20);
        assert!((d.total() - 1.0).abs() < PMF_TOLERANCE);
    }

    #[test]
    fn invalid_inputs_are_reported() {
        let builder = DistributionBuilder::new();
        let bad = DistributionSpec::Weights { pmf: vec![0.3, 0.3] };
        assert!(matches!(
            builder.serial_interval(&bad),
            Err(EstimationError::InvalidDistribution(_))
        ));
        let law = ContinuousDistribution::gamma(2.0, 2.0).unwrap();
        assert!(builder.with_truncation_mass(1.0).discretize(&law).is_err());
    }
}

//! Incidence smoothing strategies.
//!
//! The estimator only depends on the [`Smoother`] trait, so the kernel can be
//! swapped without touching the renewal-equation code.

pub mod lowess;

pub use lowess::*;

use crate::error::EstimationError;

/// Maps a raw daily series to a smoothed series of the same length.
pub trait Smoother: Send + Sync {
    fn smooth(&self, values: &[f64]) -> Result<Vec<f64>, EstimationError>;

    /// Short label for logs and reports.
    fn name(&self) -> &'static str;
}

/// Leaves the series untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentitySmoother;

impl Smoother for IdentitySmoother {
    fn smooth(&self, values: &[f64]) -> Result<Vec<f64>, EstimationError> {
        Ok(values.to_vec())
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}

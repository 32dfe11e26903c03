//! RtEstimator: smoothed incidence → renewal equation → windowed posterior.
//!
//! Day `t` (0-based) gets an estimate once its trailing window
//! `[t − r_window_size + 1, t]` lies entirely after the first
//! `smoothing_window` days, i.e. `t ≥ smoothing_window + r_window_size − 1`.
//! A series of exactly `smoothing_window + r_window_size` days therefore yields
//! one estimate.

use chrono::NaiveDate;
use tracing::debug;

use crate::distribution::{Distribution, PMF_TOLERANCE};
use crate::domain::{DailyIncidence, EstimationParams, RtEstimate, RtPoint, UncertaintyMethod};
use crate::error::EstimationError;
use crate::estimate::bootstrap::{BootstrapContext, run_bootstrap};
use crate::estimate::posterior::{GammaPosterior, GammaPrior, UndefinedWindow, window_posterior};
use crate::estimate::renewal::{infectious_pressure, trailing_sum};
use crate::smooth::{LowessSmoother, Smoother};

/// Estimator output, including diagnostics for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RtEstimation {
    pub estimate: RtEstimate,
    /// Smoothed incidence, one value per input day (clamped at zero).
    pub smoothed: Vec<f64>,
    /// Renewal-equation infectious pressure `Λ(t)` on the smoothed curve.
    pub pressure: Vec<f64>,
    /// Days without a defined estimate, with the reason. In bootstrap mode
    /// this includes days where any resample's window was undefined.
    pub undefined: Vec<(NaiveDate, UndefinedWindow)>,
}

pub struct RtEstimator {
    params: EstimationParams,
    smoother: Box<dyn Smoother>,
}

impl std::fmt::Debug for RtEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtEstimator")
            .field("params", &self.params)
            .field("smoother", &self.smoother.name())
            .finish()
    }
}

impl RtEstimator {
    /// Estimator with the default robust LOWESS smoother.
    pub fn new(params: EstimationParams) -> Self {
        let smoother = LowessSmoother::new(params.smoothing_window, params.robustness_iters);
        Self {
            params,
            smoother: Box::new(smoother),
        }
    }

    /// Swap the smoothing strategy.
    pub fn with_smoother(mut self, smoother: impl Smoother + 'static) -> Self {
        self.smoother = Box::new(smoother);
        self
    }

    pub fn params(&self) -> &EstimationParams {
        &self.params
    }

    /// Estimate R(t), failing on the first day whose estimate is undefined.
    pub fn estimate(&self, incidence: &DailyIncidence, si: &Distribution) -> Result<RtEstimation, EstimationError> {
        let estimation = self.estimate_allow_undefined(incidence, si)?;
        if let Some((date, why)) = estimation.undefined.first() {
            return Err(EstimationError::UndefinedEstimate {
                date: *date,
                reason: why.describe().to_string(),
            });
        }
        if let Some(point) = estimation.estimate.first_undefined() {
            return Err(EstimationError::UndefinedEstimate {
                date: point.date,
                reason: "estimate is not finite".to_string(),
            });
        }
        Ok(estimation)
    }

    /// Estimate R(t), keeping undefined days as `NaN` points.
    pub fn estimate_allow_undefined(
        &self,
        incidence: &DailyIncidence,
        si: &Distribution,
    ) -> Result<RtEstimation, EstimationError> {
        self.params.validate()?;
        let total = si.total();
        if si.is_empty() || (total - 1.0).abs() > PMF_TOLERANCE {
            return Err(EstimationError::invalid_distribution(format!(
                "serial interval sums to {total:.12}, expected 1"
            )));
        }
        let required = self.params.required_len();
        if incidence.len() < required {
            return Err(EstimationError::insufficient(required, incidence.len()));
        }

        let raw: Vec<f64> = incidence.points().iter().map(|p| p.count as f64).collect();
        let smoothed: Vec<f64> = self
            .smoother
            .smooth(&raw)?
            .into_iter()
            .map(|v| v.max(0.0))
            .collect();
        let pressure = infectious_pressure(&smoothed, si);

        let r = self.params.r_window_size;
        let first_day = required - 1;
        let prior = GammaPrior {
            shape: self.params.prior_shape,
            scale: self.params.prior_scale,
        };
        let windows: Vec<Result<GammaPosterior, UndefinedWindow>> = (first_day..smoothed.len())
            .map(|t| window_posterior(&prior, trailing_sum(&smoothed, t, r), trailing_sum(&pressure, t, r)))
            .collect();

        let dates: Vec<NaiveDate> = incidence.points()[first_day..].iter().map(|p| p.date).collect();
        let days: Vec<Result<RtPoint, UndefinedWindow>> = match self.params.uncertainty {
            UncertaintyMethod::Posterior => dates
                .iter()
                .zip(&windows)
                .map(|(date, window)| {
                    window.map(|post| RtPoint {
                        date: *date,
                        mean: post.mean(),
                        q025: post.quantile(0.025),
                        q50: post.quantile(0.5),
                        q975: post.quantile(0.975),
                    })
                })
                .collect(),
            UncertaintyMethod::Bootstrap { samples, seed } => {
                let ctx = BootstrapContext {
                    smoother: self.smoother.as_ref(),
                    smoothed: &smoothed,
                    si,
                    prior,
                    r_window_size: r,
                    first_day,
                };
                let base: Vec<Result<f64, UndefinedWindow>> =
                    windows.iter().map(|w| w.map(|post| post.mean())).collect();
                run_bootstrap(&ctx, &base, samples, seed)?
                    .into_iter()
                    .zip(&dates)
                    .map(|(summary, date)| {
                        summary.map(|s| RtPoint {
                            date: *date,
                            mean: s.mean,
                            q025: s.q025,
                            q50: s.q50,
                            q975: s.q975,
                        })
                    })
                    .collect()
            }
        };

        let undefined: Vec<(NaiveDate, UndefinedWindow)> = dates
            .iter()
            .zip(&days)
            .filter_map(|(date, day)| day.err().map(|why| (*date, why)))
            .collect();
        let points: Vec<RtPoint> = dates
            .iter()
            .zip(days)
            .map(|(date, day)| day.unwrap_or_else(|_| RtPoint::undefined(*date)))
            .collect();

        debug!(
            region = incidence.region(),
            smoother = self.smoother.name(),
            days = incidence.len(),
            estimates = points.len(),
            undefined = undefined.len(),
            "estimated reproduction number"
        );

        Ok(RtEstimation {
            estimate: RtEstimate {
                region: incidence.region().to_string(),
                points,
            },
            smoothed,
            pressure,
            undefined,
        })
    }
}

//! Parametric bootstrap around the smoothed incidence curve.
//!
//! Each resample draws `I*(t) ~ Poisson(Î(t))` from the smoothed curve `Î`,
//! re-smooths it and recomputes the posterior mean of R for every estimated
//! day. Resamples are independent, run in parallel, and each owns a seeded
//! RNG, so the aggregate is reproducible for a fixed seed regardless of
//! scheduling.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution as _, Poisson};
use rayon::prelude::*;

use crate::distribution::Distribution;
use crate::error::EstimationError;
use crate::estimate::posterior::{GammaPrior, UndefinedWindow, window_posterior};
use crate::estimate::renewal::{infectious_pressure, trailing_sum};
use crate::math::{mean, quantile_sorted};
use crate::smooth::Smoother;

/// Golden-ratio increment used to decorrelate per-resample seeds.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Everything a resample needs besides its index.
pub struct BootstrapContext<'a> {
    pub smoother: &'a dyn Smoother,
    pub smoothed: &'a [f64],
    pub si: &'a Distribution,
    pub prior: GammaPrior,
    pub r_window_size: usize,
    /// First day index with a full trailing window.
    pub first_day: usize,
}

/// Per-day summary of the resampled posterior means.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootstrapSummary {
    pub mean: f64,
    pub q025: f64,
    pub q50: f64,
    pub q975: f64,
}

impl BootstrapSummary {
    fn of_sorted(sorted: &[f64]) -> Self {
        BootstrapSummary {
            mean: mean(sorted),
            q025: quantile_sorted(sorted, 0.025),
            q50: quantile_sorted(sorted, 0.5),
            q975: quantile_sorted(sorted, 0.975),
        }
    }

    fn is_finite(&self) -> bool {
        self.mean.is_finite() && self.q025.is_finite() && self.q50.is_finite() && self.q975.is_finite()
    }
}

/// Run `samples` resamples and summarize them per estimated day.
///
/// A day is summarized only when its point-estimate window (`base`) and the
/// window of every single resample are defined. Days undefined in `base`
/// keep that reason; days where any resample is undefined become
/// [`UndefinedWindow::UndefinedResample`]. Resamples are never dropped, so
/// the interval always reflects all `samples` draws.
pub fn run_bootstrap(
    ctx: &BootstrapContext<'_>,
    base: &[Result<f64, UndefinedWindow>],
    samples: usize,
    seed: u64,
) -> Result<Vec<Result<BootstrapSummary, UndefinedWindow>>, EstimationError> {
    if samples == 0 {
        return Err(EstimationError::invalid_parameter("bootstrap needs at least one resample"));
    }
    let draws: Vec<Vec<Result<f64, UndefinedWindow>>> = (0..samples)
        .into_par_iter()
        .map(|b| resample_means(ctx, seed.wrapping_add((b as u64).wrapping_mul(SEED_STRIDE))))
        .collect::<Result<_, _>>()?;

    let summaries = base
        .iter()
        .enumerate()
        .map(|(day, window)| -> Result<BootstrapSummary, UndefinedWindow> {
            window.as_ref().map_err(|why| *why)?;
            let mut values = draws
                .iter()
                .map(|d| d.get(day).copied().unwrap_or(Err(UndefinedWindow::UndefinedResample)))
                .map(|v| v.map_err(|_| UndefinedWindow::UndefinedResample))
                .collect::<Result<Vec<f64>, _>>()?;
            values.sort_by(|a, b| a.total_cmp(b));
            let summary = BootstrapSummary::of_sorted(&values);
            if summary.is_finite() {
                Ok(summary)
            } else {
                Err(UndefinedWindow::UndefinedResample)
            }
        })
        .collect();

    Ok(summaries)
}

fn resample_means(
    ctx: &BootstrapContext<'_>,
    seed: u64,
) -> Result<Vec<Result<f64, UndefinedWindow>>, EstimationError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut resampled = Vec::with_capacity(ctx.smoothed.len());
    for &rate in ctx.smoothed {
        let draw = if rate > 0.0 {
            Poisson::new(rate)
                .map_err(|e| EstimationError::invalid_parameter(format!("Poisson rate {rate}: {e}")))?
                .sample(&mut rng)
        } else {
            0.0
        };
        resampled.push(draw);
    }

    let smoothed: Vec<f64> = ctx
        .smoother
        .smooth(&resampled)?
        .into_iter()
        .map(|v| v.max(0.0))
        .collect();
    let pressure = infectious_pressure(&smoothed, ctx.si);

    Ok((ctx.first_day..smoothed.len())
        .map(|t| {
            let incidence_sum = trailing_sum(&smoothed, t, ctx.r_window_size);
            let pressure_sum = trailing_sum(&pressure, t, ctx.r_window_size);
            window_posterior(&ctx.prior, incidence_sum, pressure_sum).map(|post| post.mean())
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smooth::IdentitySmoother;

    fn flat_si() -> Distribution {
        Distribution::from_weights(vec![0.0, 0.5, 0.5]).unwrap()
    }

    fn ctx<'a>(smoothed: &'a [f64], si: &'a Distribution) -> BootstrapContext<'a> {
        BootstrapContext {
            smoother: &IdentitySmoother,
            smoothed,
            si,
            prior: GammaPrior { shape: 1.0, scale: 5.0 },
            r_window_size: 3,
            first_day: 4,
        }
    }

    #[test]
    fn seed_controls_the_draws() {
        let si = flat_si();
        let smoothed = vec![40.0; 12];
        let c = ctx(&smoothed, &si);
        let base = vec![Ok(1.0); 8];

        let a = run_bootstrap(&c, &base, 32, 11).unwrap();
        let b = run_bootstrap(&c, &base, 32, 11).unwrap();
        let other = run_bootstrap(&c, &base, 32, 12).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, other);
        for s in &a {
            let s = s.as_ref().unwrap();
            assert!(s.q025 <= s.q50 && s.q50 <= s.q975);
            assert!((s.mean - 1.0).abs() < 0.3, "mean={}", s.mean);
        }
    }

    #[test]
    fn undefined_base_days_keep_their_reason() {
        let si = flat_si();
        let smoothed = vec![5.0; 6];
        let c = BootstrapContext { first_day: 4, ..ctx(&smoothed, &si) };
        let base = vec![Err(UndefinedWindow::NoIncidence), Ok(1.0)];

        let out = run_bootstrap(&c, &base, 8, 0).unwrap();
        assert_eq!(out[0], Err(UndefinedWindow::NoIncidence));
        assert!(out[1].as_ref().unwrap().mean.is_finite());
    }

    #[test]
    fn zero_rates_resample_to_no_incidence() {
        let si = flat_si();
        let smoothed = vec![0.0; 6];
        let means = resample_means(&ctx(&smoothed, &si), 3).unwrap();
        assert!(means.iter().all(|m| *m == Err(UndefinedWindow::NoIncidence)));
    }

    #[test]
    fn sparse_counts_mark_days_with_undefined_resamples() {
        // Rates of 0.5 leave the last 3-day windows empty in about a fifth of
        // the resamples, so 64 draws always hit at least one.
        let si = flat_si();
        let smoothed = vec![2.0, 2.0, 2.0, 0.5, 0.5, 0.5, 0.5, 0.5];
        let c = ctx(&smoothed, &si);
        let base = vec![Ok(0.4); 4];

        for seed in 0..20 {
            let out = run_bootstrap(&c, &base, 64, seed).unwrap();
            assert_eq!(out.len(), 4);
            assert!(out.iter().any(|s| *s == Err(UndefinedWindow::UndefinedResample)));
            for s in out.iter().flatten() {
                assert!(s.is_finite(), "seed {seed}: {s:?}");
            }
        }
    }

    #[test]
    fn two_resamples_over_single_cases_never_yield_nan() {
        // One case on day 10 and one on day 20: most resamples empty at least
        // one window, and none of that may surface as a NaN summary.
        let si = flat_si();
        let mut smoothed = vec![0.0; 21];
        smoothed[10] = 1.0;
        smoothed[20] = 1.0;
        let c = BootstrapContext { r_window_size: 7, first_day: 14, ..ctx(&smoothed, &si) };
        let base = vec![Ok(1.0); 7];

        for seed in 0..200 {
            for s in run_bootstrap(&c, &base, 2, seed).unwrap() {
                match s {
                    Ok(s) => assert!(s.is_finite(), "seed {seed}: {s:?}"),
                    Err(why) => assert_eq!(why, UndefinedWindow::UndefinedResample),
                }
            }
        }
    }

    #[test]
    fn zero_samples_are_rejected() {
        let si = flat_si();
        let smoothed = vec![40.0; 12];
        assert!(matches!(
            run_bootstrap(&ctx(&smoothed, &si), &[Ok(1.0)], 0, 1),
            Err(EstimationError::InvalidParameter(_))
        ));
    }
}

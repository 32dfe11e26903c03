//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between pipeline stages without copying conventions around
//! - exported to JSON/CSV for the presentation layer
//! - hashed into a cache fingerprint

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::EstimationError;

/// How the value column of an observation series should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    /// Running totals; daily counts are derived by differencing.
    Cumulative,
    /// Already one count per day.
    Daily,
}

/// What to do when consecutive observations skip calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GapPolicy {
    /// Fail with a malformed-series error.
    #[default]
    Reject,
    /// Insert the missing days with zero new cases.
    Fill,
}

/// One raw `(date, region, value)` observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    pub date: NaiveDate,
    pub region: String,
    pub value: f64,
}

/// Raw observations for a single region.
///
/// Rows may arrive in any order; the normalizer sorts them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSeries {
    pub region: String,
    pub kind: SeriesKind,
    pub rows: Vec<ObservationRow>,
}

impl ObservationSeries {
    pub fn new(region: impl Into<String>, kind: SeriesKind, rows: Vec<ObservationRow>) -> Self {
        Self {
            region: region.into(),
            kind,
            rows,
        }
    }

    /// Build a series from bare `(date, value)` pairs, tagging every row with `region`.
    pub fn from_values(
        region: impl Into<String>,
        kind: SeriesKind,
        values: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Self {
        let region = region.into();
        let rows = values
            .into_iter()
            .map(|(date, value)| ObservationRow {
                date,
                region: region.clone(),
                value,
            })
            .collect();
        Self { region, kind, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A multi-region raw table as produced by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationTable {
    pub kind: SeriesKind,
    pub rows: Vec<ObservationRow>,
}

/// Per-region overview used by `rt regions`.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSummary {
    pub region: String,
    pub rows: usize,
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl ObservationTable {
    /// Distinct region names, sorted.
    pub fn regions(&self) -> Vec<String> {
        let mut regions: Vec<String> = self.rows.iter().map(|r| r.region.clone()).collect();
        regions.sort();
        regions.dedup();
        regions
    }

    /// Rows for one region, in table order.
    pub fn series_for(&self, region: &str) -> Option<ObservationSeries> {
        let rows: Vec<ObservationRow> = self
            .rows
            .iter()
            .filter(|r| r.region == region)
            .cloned()
            .collect();
        if rows.is_empty() {
            return None;
        }
        Some(ObservationSeries::new(region, self.kind, rows))
    }

    pub fn summaries(&self) -> Vec<RegionSummary> {
        self.regions()
            .into_iter()
            .filter_map(|region| {
                let rows: Vec<&ObservationRow> =
                    self.rows.iter().filter(|r| r.region == region).collect();
                let first = rows.iter().map(|r| r.date).min()?;
                let last = rows.iter().map(|r| r.date).max()?;
                Some(RegionSummary {
                    region,
                    rows: rows.len(),
                    first,
                    last,
                })
            })
            .collect()
    }
}

/// One day of clean incidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidencePoint {
    pub date: NaiveDate,
    pub count: u64,
}

/// Gap-free, ascending daily incidence for one region.
///
/// Construct through [`DailyIncidence::new`] (or the normalizer) so the
/// one-entry-per-day invariant always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyIncidence {
    region: String,
    points: Vec<IncidencePoint>,
}

impl DailyIncidence {
    /// Validate and wrap a daily series. Dates must step by exactly one day.
    pub fn new(region: impl Into<String>, points: Vec<IncidencePoint>) -> Result<Self, EstimationError> {
        for pair in points.windows(2) {
            let step = (pair[1].date - pair[0].date).num_days();
            if step != 1 {
                return Err(EstimationError::malformed(format!(
                    "daily incidence must advance one day at a time ({} -> {})",
                    pair[0].date, pair[1].date
                )));
            }
        }
        Ok(Self {
            region: region.into(),
            points,
        })
    }

    /// Consecutive days starting at `start`.
    pub fn from_counts(region: impl Into<String>, start: NaiveDate, counts: &[u64]) -> Self {
        let points = start
            .iter_days()
            .zip(counts.iter())
            .map(|(date, &count)| IncidencePoint { date, count })
            .collect();
        Self {
            region: region.into(),
            points,
        }
    }

    pub(crate) fn from_points_unchecked(region: String, points: Vec<IncidencePoint>) -> Self {
        Self { region, points }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn points(&self) -> &[IncidencePoint] {
        &self.points
    }

    pub fn counts(&self) -> Vec<u64> {
        self.points.iter().map(|p| p.count).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    pub fn total(&self) -> u64 {
        self.points.iter().map(|p| p.count).sum()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One day of the reproduction-number estimate.
///
/// `mean` and the quantiles are `NaN` when the day's window carries no
/// information; [`crate::estimate::RtEstimator::estimate`] refuses to return
/// such points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RtPoint {
    pub date: NaiveDate,
    pub mean: f64,
    pub q025: f64,
    pub q50: f64,
    pub q975: f64,
}

impl RtPoint {
    /// Placeholder for a day without an estimate.
    pub fn undefined(date: NaiveDate) -> Self {
        RtPoint {
            date,
            mean: f64::NAN,
            q025: f64::NAN,
            q50: f64::NAN,
            q975: f64::NAN,
        }
    }

    pub fn is_defined(&self) -> bool {
        self.mean.is_finite() && self.q025.is_finite() && self.q50.is_finite() && self.q975.is_finite()
    }
}

/// Daily R(t) for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtEstimate {
    pub region: String,
    pub points: Vec<RtPoint>,
}

impl RtEstimate {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_undefined(&self) -> Option<&RtPoint> {
        self.points.iter().find(|p| !p.is_defined())
    }

    /// Move every date `days` earlier (infection-date alignment).
    pub fn shifted_earlier(mut self, days: usize) -> Self {
        let delta = chrono::Duration::days(days as i64);
        for p in &mut self.points {
            p.date -= delta;
        }
        self
    }

    /// Most recent defined estimate.
    pub fn latest(&self) -> Option<&RtPoint> {
        self.points.iter().rev().find(|p| p.is_defined())
    }
}

/// Continuous family used for custom serial intervals and delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ContinuousFamily {
    Gamma,
    #[value(name = "lognormal")]
    LogNormal,
}

/// How to obtain a serial-interval (or delay) pmf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistributionSpec {
    /// The pre-tabulated reference profile.
    Default,
    /// Continuous family parameterised by its mean and standard deviation (days).
    MeanStd {
        family: ContinuousFamily,
        mean: f64,
        std: f64,
    },
    /// Gamma with explicit shape and scale (days).
    GammaShapeScale { shape: f64, scale: f64 },
    /// Explicit pmf over offsets `0..K`.
    Weights { pmf: Vec<f64> },
}

/// How the 95% interval is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum UncertaintyMethod {
    /// Closed-form Gamma posterior quantiles.
    #[default]
    Posterior,
    /// Poisson resampling of the smoothed curve, re-estimated per resample.
    Bootstrap { samples: usize, seed: u64 },
}

/// Estimation knobs for a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationParams {
    /// LOWESS bandwidth, in days.
    pub smoothing_window: usize,
    /// Trailing likelihood window, in days.
    pub r_window_size: usize,
    /// Gamma prior on R: shape.
    pub prior_shape: f64,
    /// Gamma prior on R: scale (rate = 1 / scale).
    pub prior_scale: f64,
    /// Bisquare reweighting passes after the initial LOWESS fit.
    pub robustness_iters: usize,
    pub uncertainty: UncertaintyMethod,
}

impl Default for EstimationParams {
    fn default() -> Self {
        Self {
            smoothing_window: 14,
            r_window_size: 7,
            prior_shape: 1.0,
            prior_scale: 5.0,
            robustness_iters: 2,
            uncertainty: UncertaintyMethod::Posterior,
        }
    }
}

impl EstimationParams {
    /// Minimum series length for at least one defined estimate.
    /// Saturates at `usize::MAX`; `validate` rejects windows that overflow.
    pub fn required_len(&self) -> usize {
        self.smoothing_window.saturating_add(self.r_window_size)
    }

    pub fn validate(&self) -> Result<(), EstimationError> {
        if self.smoothing_window == 0 {
            return Err(EstimationError::invalid_parameter("smoothing_window must be >= 1"));
        }
        if self.r_window_size == 0 {
            return Err(EstimationError::invalid_parameter("r_window_size must be >= 1"));
        }
        if self.smoothing_window.checked_add(self.r_window_size).is_none() {
            return Err(EstimationError::invalid_parameter(format!(
                "smoothing_window + r_window_size overflows ({} + {})",
                self.smoothing_window, self.r_window_size
            )));
        }
        if !(self.prior_shape.is_finite() && self.prior_shape > 0.0) {
            return Err(EstimationError::invalid_parameter(format!(
                "prior_shape must be finite and > 0 (got {})",
                self.prior_shape
            )));
        }
        if !(self.prior_scale.is_finite() && self.prior_scale > 0.0) {
            return Err(EstimationError::invalid_parameter(format!(
                "prior_scale must be finite and > 0 (got {})",
                self.prior_scale
            )));
        }
        if let UncertaintyMethod::Bootstrap { samples, .. } = self.uncertainty {
            if samples < 2 {
                return Err(EstimationError::invalid_parameter("bootstrap needs at least 2 samples"));
            }
        }
        Ok(())
    }
}

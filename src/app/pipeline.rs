//! Shared estimation pipeline used by every CLI command and by library callers.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! raw series -> normalize -> date filter -> build SI pmf -> estimate -> (shift)
//!
//! The input is an immutable struct and the function is pure, so results can be
//! memoized by input fingerprint (see `app::cache`).

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::distribution::{Distribution, DistributionBuilder};
use crate::domain::{
    DailyIncidence, DistributionSpec, EstimationParams, GapPolicy, ObservationSeries, ObservationTable, RtEstimate,
};
use crate::error::EstimationError;
use crate::estimate::RtEstimator;
use crate::incidence::{DateRange, IncidenceNormalizer, NormalizationReport};

/// Everything about a run except the series itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSettings {
    pub serial_interval: DistributionSpec,
    /// Infection-to-reporting delay; built and reported when present.
    pub reporting_delay: Option<DistributionSpec>,
    /// Move output dates earlier by the delay's median (needs `reporting_delay`).
    pub shift_by_delay: bool,
    pub params: EstimationParams,
    pub date_range: DateRange,
    pub gap_policy: GapPolicy,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            serial_interval: DistributionSpec::Default,
            reporting_delay: None,
            shift_by_delay: false,
            params: EstimationParams::default(),
            date_range: DateRange::all(),
            gap_policy: GapPolicy::Reject,
        }
    }
}

/// One region's raw series plus the run settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineInput {
    pub series: ObservationSeries,
    pub settings: RunSettings,
}

/// All computed outputs of a single region run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub region: String,
    pub estimate: RtEstimate,
    /// Daily incidence after normalization and date filtering.
    pub incidence: DailyIncidence,
    /// Smoothed incidence aligned with `incidence`.
    pub smoothed: Vec<f64>,
    pub serial_interval: Distribution,
    pub reporting_delay: Option<Distribution>,
    /// Days the estimate dates were moved back by (0 when not shifted).
    pub delay_shift_days: usize,
    pub normalization: NormalizationReport,
    pub params: EstimationParams,
    pub date_range: DateRange,
}

/// Per-region result from [`estimate_regions`].
#[derive(Debug, Clone)]
pub struct RegionRun {
    pub region: String,
    pub result: Result<PipelineOutput, EstimationError>,
}

/// Execute the pipeline for one region.
pub fn run(input: &PipelineInput) -> Result<PipelineOutput, EstimationError> {
    let settings = &input.settings;
    settings.params.validate()?;

    // 1) Normalize the whole series so differencing sees the rows before `start`.
    let normalized = IncidenceNormalizer::new(settings.gap_policy).normalize(&input.series)?;

    // 2) Restrict to the requested dates.
    let incidence = normalized.incidence.filter_dates(&settings.date_range);
    debug!(
        region = %input.series.region,
        normalized = normalized.incidence.len(),
        filtered = incidence.len(),
        "prepared daily incidence"
    );

    // 3) Build the pmfs.
    let builder = DistributionBuilder::new();
    let serial_interval = builder.serial_interval(&settings.serial_interval)?;
    let reporting_delay = settings
        .reporting_delay
        .as_ref()
        .map(|spec| builder.reporting_delay(spec))
        .transpose()?;

    // 4) Estimate.
    let estimation = RtEstimator::new(settings.params.clone()).estimate(&incidence, &serial_interval)?;

    // 5) Optionally align to infection dates.
    let (estimate, delay_shift_days) = match (&reporting_delay, settings.shift_by_delay) {
        (Some(delay), true) => {
            let days = delay.quantile_offset(0.5);
            (estimation.estimate.shifted_earlier(days), days)
        }
        _ => (estimation.estimate, 0),
    };

    info!(
        region = %input.series.region,
        estimates = estimate.len(),
        latest = estimate.latest().map(|p| p.mean),
        "pipeline finished"
    );

    Ok(PipelineOutput {
        region: input.series.region.clone(),
        estimate,
        incidence,
        smoothed: estimation.smoothed,
        serial_interval,
        reporting_delay,
        delay_shift_days,
        normalization: normalized.report,
        params: settings.params.clone(),
        date_range: settings.date_range,
    })
}

/// Estimate every requested region independently, in parallel.
///
/// Results come back in the order of `regions`. A region missing from the
/// table yields a malformed-series error for that entry only.
pub fn estimate_regions(
    table: &ObservationTable,
    regions: &[String],
    settings: &RunSettings,
    cache: &super::cache::EstimateCache,
) -> Vec<RegionRun> {
    regions
        .par_iter()
        .map(|region| {
            let result = table
                .series_for(region)
                .ok_or_else(|| EstimationError::malformed(format!("region '{region}' not found in input")))
                .and_then(|series| {
                    let input = PipelineInput {
                        series,
                        settings: settings.clone(),
                    };
                    cache.get_or_run(&input).map(|out| (*out).clone())
                });
            RegionRun {
                region: region.clone(),
                result,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::cache::EstimateCache;
    use crate::domain::{ObservationRow, SeriesKind};
    use chrono::NaiveDate;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()
    }

    /// Cumulative totals for steady growth of ~4% per day.
    fn cumulative_series(region: &str, days: usize) -> ObservationSeries {
        let mut total = 0.0;
        let values = start().iter_days().take(days).map(|date| {
            let t = (date - start()).num_days() as f64;
            total += (20.0 * (0.04 * t).exp()).round();
            (date, total)
        });
        ObservationSeries::from_values(region, SeriesKind::Cumulative, values.collect::<Vec<_>>())
    }

    fn input(series: ObservationSeries) -> PipelineInput {
        PipelineInput {
            series,
            settings: RunSettings::default(),
        }
    }

    #[test]
    fn cumulative_growth_yields_r_above_one() {
        let out = run(&input(cumulative_series("A", 40))).unwrap();
        assert_eq!(out.incidence.len(), 40);
        assert_eq!(out.estimate.len(), 40 - 20);
        assert_eq!(out.smoothed.len(), 40);
        assert!(out.estimate.latest().unwrap().mean > 1.0);
        assert!((out.serial_interval.total() - 1.0).abs() < 1e-9);
        assert_eq!(out.delay_shift_days, 0);
    }

    #[test]
    fn date_range_is_applied_after_differencing() {
        let mut inp = input(cumulative_series("A", 40));
        inp.settings.date_range = DateRange::new(start() + chrono::Duration::days(10), start() + chrono::Duration::days(35));
        let out = run(&inp).unwrap();
        assert_eq!(out.incidence.len(), 26);
        assert_eq!(out.estimate.len(), 26 - 20);
        // First filtered day is a difference, not the running total.
        assert!(out.incidence.points()[0].count < 40);
    }

    #[test]
    fn empty_filter_result_is_insufficient() {
        let mut inp = input(cumulative_series("A", 30));
        let far = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        inp.settings.date_range = DateRange::new(far, far);
        assert!(matches!(run(&inp), Err(EstimationError::InsufficientData { actual: 0, .. })));
    }

    #[test]
    fn delay_shift_moves_dates_back_by_median() {
        let mut inp = input(cumulative_series("A", 40));
        inp.settings.reporting_delay = Some(DistributionSpec::Default);
        inp.settings.shift_by_delay = true;
        let shifted = run(&inp).unwrap();
        let plain = run(&input(cumulative_series("A", 40))).unwrap();

        let days = shifted.reporting_delay.as_ref().unwrap().quantile_offset(0.5);
        assert!(days > 0);
        assert_eq!(shifted.delay_shift_days, days);
        assert_eq!(
            shifted.estimate.points[0].date,
            plain.estimate.points[0].date - chrono::Duration::days(days as i64)
        );
        assert_eq!(shifted.estimate.points[0].mean, plain.estimate.points[0].mean);
    }

    #[test]
    fn regions_run_independently_and_keep_order() {
        let mut rows: Vec<ObservationRow> = cumulative_series("B", 30).rows;
        rows.extend(cumulative_series("A", 12).rows);
        let table = ObservationTable {
            kind: SeriesKind::Cumulative,
            rows,
        };
        let regions = vec!["B".to_string(), "A".to_string(), "Z".to_string()];
        let runs = estimate_regions(&table, &regions, &RunSettings::default(), &EstimateCache::new());

        assert_eq!(runs.iter().map(|r| r.region.as_str()).collect::<Vec<_>>(), ["B", "A", "Z"]);
        assert!(runs[0].result.is_ok());
        assert!(matches!(runs[1].result, Err(EstimationError::InsufficientData { required: 21, actual: 12 })));
        assert!(matches!(runs[2].result, Err(EstimationError::MalformedSeries(_))));
    }
}

//! IncidenceNormalizer: raw observations → gap-free daily incidence.
//!
//! Cumulative mode differences consecutive totals. A negative delta (a
//! downward data correction) is clamped to zero; the day is logged and listed
//! in the [`NormalizationReport`] so the information loss stays visible.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{DailyIncidence, GapPolicy, IncidencePoint, ObservationRow, ObservationSeries, SeriesKind};
use crate::error::EstimationError;

/// What normalization had to change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationReport {
    /// Days whose negative increment was clamped to zero.
    pub clamped_days: Vec<NaiveDate>,
    /// Number of missing calendar days inserted (only with `GapPolicy::Fill`).
    pub filled_days: usize,
}

/// Normalized output plus the report.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub incidence: DailyIncidence,
    pub report: NormalizationReport,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncidenceNormalizer {
    gap_policy: GapPolicy,
}

impl IncidenceNormalizer {
    pub fn new(gap_policy: GapPolicy) -> Self {
        Self { gap_policy }
    }

    pub fn normalize(&self, series: &ObservationSeries) -> Result<Normalized, EstimationError> {
        let mut rows = series.rows.clone();
        for row in &rows {
            if row.region != series.region {
                return Err(EstimationError::malformed(format!(
                    "row for region '{}' in series for '{}' ({})",
                    row.region, series.region, row.date
                )));
            }
            validate_value(row, series.kind)?;
        }

        rows.sort_by_key(|r| r.date);
        if let Some(pair) = rows.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(EstimationError::malformed(format!(
                "duplicate date {} in region '{}'",
                pair[0].date, series.region
            )));
        }

        let mut report = NormalizationReport::default();
        let rows = self.close_gaps(rows, series, &mut report)?;

        let points = match series.kind {
            SeriesKind::Cumulative => cumulative_to_daily(&rows, &mut report),
            SeriesKind::Daily => rows
                .iter()
                .map(|r| IncidencePoint {
                    date: r.date,
                    count: r.value as u64,
                })
                .collect(),
        };

        debug!(
            region = %series.region,
            days = points.len(),
            clamped = report.clamped_days.len(),
            filled = report.filled_days,
            "normalized incidence"
        );

        Ok(Normalized {
            incidence: DailyIncidence::from_points_unchecked(series.region.clone(), points),
            report,
        })
    }

    fn close_gaps(
        &self,
        rows: Vec<ObservationRow>,
        series: &ObservationSeries,
        report: &mut NormalizationReport,
    ) -> Result<Vec<ObservationRow>, EstimationError> {
        let mut out: Vec<ObservationRow> = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some((prev_date, prev_value)) = out.last().map(|p| (p.date, p.value)) {
                let step = (row.date - prev_date).num_days();
                if step > 1 {
                    match self.gap_policy {
                        GapPolicy::Reject => {
                            return Err(EstimationError::malformed(format!(
                                "missing days between {} and {} in region '{}'",
                                prev_date, row.date, series.region
                            )));
                        }
                        GapPolicy::Fill => {
                            warn!(
                                region = %series.region,
                                from = %prev_date,
                                to = %row.date,
                                "filling {} missing day(s) with zero new cases",
                                step - 1
                            );
                            let carried = match series.kind {
                                SeriesKind::Cumulative => prev_value,
                                SeriesKind::Daily => 0.0,
                            };
                            for k in 1..step {
                                out.push(ObservationRow {
                                    date: prev_date + Duration::days(k),
                                    region: series.region.clone(),
                                    value: carried,
                                });
                            }
                            report.filled_days += (step - 1) as usize;
                        }
                    }
                }
            }
            out.push(row);
        }
        Ok(out)
    }
}

fn validate_value(row: &ObservationRow, kind: SeriesKind) -> Result<(), EstimationError> {
    if !row.value.is_finite() || row.value < 0.0 {
        return Err(EstimationError::malformed(format!(
            "value on {} must be finite and non-negative (got {})",
            row.date, row.value
        )));
    }
    if kind == SeriesKind::Daily && row.value.fract() != 0.0 {
        return Err(EstimationError::malformed(format!(
            "daily count on {} must be an integer (got {})",
            row.date, row.value
        )));
    }
    Ok(())
}

fn cumulative_to_daily(rows: &[ObservationRow], report: &mut NormalizationReport) -> Vec<IncidencePoint> {
    let mut points = Vec::with_capacity(rows.len());
    let mut previous: Option<f64> = None;
    for row in rows {
        let increment = match previous {
            None => row.value,
            Some(prev) => {
                let delta = row.value - prev;
                if delta < 0.0 {
                    warn!(
                        region = %row.region,
                        date = %row.date,
                        delta,
                        "negative daily increment clamped to zero"
                    );
                    report.clamped_days.push(row.date);
                    0.0
                } else {
                    delta
                }
            }
        };
        points.push(IncidencePoint {
            date: row.date,
            count: increment.trunc() as u64,
        });
        previous = Some(row.value);
    }
    points
}

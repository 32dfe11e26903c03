//! DateRangeFilter: keep the part of a series inside an inclusive date interval.
//!
//! An empty result is a valid outcome; the estimator turns it into an
//! insufficient-data error later.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{DailyIncidence, IncidencePoint, ObservationRow, ObservationSeries};

/// Anything carrying a calendar date.
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

impl Dated for ObservationRow {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for IncidencePoint {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Inclusive `[start, end]`; a missing bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// The unbounded range.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }
}

/// Items within `range`, in their original order.
pub fn filter_range<T: Dated + Clone>(items: &[T], range: &DateRange) -> Vec<T> {
    items.iter().filter(|item| range.contains(item.date())).cloned().collect()
}

impl DailyIncidence {
    /// Restrict to `range`. The result is still gap-free.
    pub fn filter_dates(&self, range: &DateRange) -> DailyIncidence {
        DailyIncidence::from_points_unchecked(self.region().to_string(), filter_range(self.points(), range))
    }
}

impl ObservationSeries {
    pub fn filter_dates(&self, range: &DateRange) -> ObservationSeries {
        ObservationSeries::new(self.region.clone(), self.kind, filter_range(&self.rows, range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeriesKind;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 5, day).unwrap()
    }

    fn week() -> DailyIncidence {
        DailyIncidence::from_counts("X", d(1), &[1, 2, 3, 4, 5, 6, 7])
    }

    #[test]
    fn keeps_inclusive_bounds() {
        let out = week().filter_dates(&DateRange::new(d(2), d(4)));
        assert_eq!(out.counts(), vec![2, 3, 4]);
        assert_eq!(out.first_date(), Some(d(2)));
        assert_eq!(out.last_date(), Some(d(4)));
    }

    #[test]
    fn out_of_range_yields_empty_series() {
        assert!(week().filter_dates(&DateRange::new(d(20), d(25))).is_empty());
        assert!(week().filter_dates(&DateRange::new(d(5), d(2))).is_empty());
    }

    #[test]
    fn open_bounds() {
        let range = DateRange { start: Some(d(6)), end: None };
        assert_eq!(week().filter_dates(&range).counts(), vec![6, 7]);
        assert_eq!(week().filter_dates(&DateRange::all()).len(), 7);
    }

    #[test]
    fn observation_rows_keep_input_order() {
        let series = ObservationSeries::from_values(
            "X",
            SeriesKind::Cumulative,
            vec![(d(3), 3.0), (d(1), 1.0), (d(2), 2.0), (d(9), 9.0)],
        );
        let out = series.filter_dates(&DateRange::new(d(1), d(3)));
        let dates: Vec<NaiveDate> = out.rows.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![d(3), d(1), d(2)]);
    }
}

//! Reporting utilities: trend classification and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::RtPoint;

/// Direction of the epidemic implied by one day's 95% interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    /// Whole interval above 1.
    Growing,
    /// Whole interval below 1.
    Declining,
    /// Interval straddles 1.
    Uncertain,
}

impl Trend {
    pub fn of(point: &RtPoint) -> Self {
        if point.q025 > 1.0 {
            Trend::Growing
        } else if point.q975 < 1.0 {
            Trend::Declining
        } else {
            Trend::Uncertain
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Trend::Growing => "growing",
            Trend::Declining => "declining",
            Trend::Uncertain => "uncertain",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn point(q025: f64, q975: f64) -> RtPoint {
        RtPoint {
            date: NaiveDate::from_ymd_opt(2020, 5, 1).unwrap(),
            mean: (q025 + q975) / 2.0,
            q025,
            q50: (q025 + q975) / 2.0,
            q975,
        }
    }

    #[test]
    fn trend_uses_the_whole_interval() {
        assert_eq!(Trend::of(&point(1.05, 1.4)), Trend::Growing);
        assert_eq!(Trend::of(&point(0.6, 0.95)), Trend::Declining);
        assert_eq!(Trend::of(&point(0.9, 1.1)), Trend::Uncertain);
    }
}

//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the estimation code stays free of presentation concerns
//! - output changes are localized

use crate::app::pipeline::PipelineOutput;
use crate::distribution::Distribution;
use crate::domain::{RegionSummary, RtEstimate, UncertaintyMethod};
use crate::report::Trend;

/// Width of the widest bar in `format_pmf`.
const PMF_BAR_WIDTH: usize = 40;

/// Run header: data span, settings, normalization notes and the latest R(t).
pub fn format_run_summary(out: &PipelineOutput) -> String {
    let mut s = String::new();

    s.push_str(&format!("=== rt - {} ===\n", out.region));
    match (out.incidence.first_date(), out.incidence.last_date()) {
        (Some(first), Some(last)) => s.push_str(&format!(
            "Data: {} days [{first} .. {last}] | total cases={}\n",
            out.incidence.len(),
            out.incidence.total()
        )),
        _ => s.push_str("Data: empty\n"),
    }

    let params = &out.params;
    let uncertainty = match params.uncertainty {
        UncertaintyMethod::Posterior => "posterior".to_string(),
        UncertaintyMethod::Bootstrap { samples, seed } => format!("bootstrap n={samples} seed={seed}"),
    };
    s.push_str(&format!(
        "Windows: smoothing={}d r={}d | prior Gamma(shape={}, scale={}) | interval: {uncertainty}\n",
        params.smoothing_window, params.r_window_size, params.prior_shape, params.prior_scale
    ));
    s.push_str(&format!(
        "Serial interval: mean={:.2}d support={}d\n",
        out.serial_interval.mean(),
        out.serial_interval.len()
    ));
    if let Some(delay) = &out.reporting_delay {
        s.push_str(&format!(
            "Reporting delay: mean={:.2}d median={}d (dates shifted by {}d)\n",
            delay.mean(),
            delay.quantile_offset(0.5),
            out.delay_shift_days
        ));
    }

    let report = &out.normalization;
    if !report.clamped_days.is_empty() {
        s.push_str(&format!(
            "Note: {} negative daily increment(s) clamped to 0 (first {})\n",
            report.clamped_days.len(),
            report.clamped_days[0]
        ));
    }
    if report.filled_days > 0 {
        s.push_str(&format!("Note: {} missing day(s) filled\n", report.filled_days));
    }

    if let Some(p) = out.estimate.latest() {
        s.push_str(&format!(
            "Latest R(t) on {}: {:.2} [{:.2}, {:.2}] ({})\n",
            p.date,
            p.mean,
            p.q025,
            p.q975,
            Trend::of(p).label()
        ));
    }

    s
}

/// Daily R(t) table, limited to the last `tail` days (`0` prints all).
pub fn format_rt_table(estimate: &RtEstimate, tail: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<10} {:>7} {:>7} {:>7} {:>7}  {}\n",
        "date", "mean", "q2.5", "q50", "q97.5", "trend"
    ));
    out.push_str(&format!("{:-<10} {:-<7} {:-<7} {:-<7} {:-<7}  {:-<9}\n", "", "", "", "", "", ""));

    let skip = if tail == 0 { 0 } else { estimate.len().saturating_sub(tail) };
    for p in estimate.points.iter().skip(skip) {
        out.push_str(&format!(
            "{:<10} {:>7.3} {:>7.3} {:>7.3} {:>7.3}  {}\n",
            p.date,
            p.mean,
            p.q025,
            p.q50,
            p.q975,
            Trend::of(p).label()
        ));
    }
    out
}

pub fn format_regions(summaries: &[RegionSummary]) -> String {
    let width = summaries
        .iter()
        .map(|s| s.region.chars().count())
        .max()
        .unwrap_or(0)
        .max("region".len());

    let mut out = String::new();
    out.push_str(&format!("{:<width$} {:>6} {:<10} {:<10}\n", "region", "rows", "first", "last"));
    for s in summaries {
        out.push_str(&format!(
            "{:<width$} {:>6} {:<10} {:<10}\n",
            s.region, s.rows, s.first, s.last
        ));
    }
    out
}

/// One line per day offset with a proportional bar.
pub fn format_pmf(label: &str, dist: &Distribution) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{label}: {} offsets, mean={:.3}d, median={}d\n",
        dist.len(),
        dist.mean(),
        dist.quantile_offset(0.5)
    ));

    let peak = dist.weights().iter().copied().fold(0.0, f64::max);
    for (offset, w) in dist.weights().iter().enumerate() {
        let bar = if peak > 0.0 {
            ((w / peak) * PMF_BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        out.push_str(&format!("{offset:>4} {w:.6} {}\n", "#".repeat(bar)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RtPoint;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 6, day).unwrap()
    }

    #[test]
    fn rt_table_honours_tail() {
        let est = RtEstimate {
            region: "A".into(),
            points: (1..=5)
                .map(|day| RtPoint { date: d(day), mean: 1.2, q025: 1.1, q50: 1.2, q975: 1.3 })
                .collect(),
        };
        let table = format_rt_table(&est, 2);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2 + 2);
        assert!(lines[2].starts_with("2020-06-04"));
        assert!(lines[3].ends_with("growing"));
        assert_eq!(format_rt_table(&est, 0).lines().count(), 2 + 5);
    }

    #[test]
    fn regions_are_listed_with_spans() {
        let text = format_regions(&[RegionSummary { region: "Hokkaido".into(), rows: 3, first: d(1), last: d(3) }]);
        assert!(text.contains("Hokkaido"));
        assert!(text.contains("2020-06-03"));
    }

    #[test]
    fn pmf_bars_scale_to_peak() {
        let dist = Distribution::from_weights(vec![0.25, 0.5, 0.25]).unwrap();
        let text = format_pmf("si", &dist);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("si: 3 offsets"));
        assert!(lines[2].ends_with(&"#".repeat(PMF_BAR_WIDTH)));
        assert!(lines[1].ends_with(&"#".repeat(PMF_BAR_WIDTH / 2)));
    }
}

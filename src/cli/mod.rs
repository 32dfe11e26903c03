//! Command-line parsing for the `rt` binary.
//!
//! Argument parsing stays separate from estimation code: every option here is
//! turned into plain library types (`IngestOptions`, `RunSettings`) by `app`.
//! Estimation defaults can also come from `RT_*` environment variables (or a
//! `.env` file).

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::{ContinuousFamily, GapPolicy};
use crate::io::SourceFormat;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rt", version, about = "Effective reproduction number R(t) from case counts")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Estimate R(t) for one or more regions and print the table.
    Estimate(EstimateArgs),
    /// List the regions in an input file with row counts and date span.
    Regions(RegionsArgs),
    /// Print a discretized serial-interval or reporting-delay pmf.
    Distribution(DistributionArgs),
}

/// Where to read observations from and how to interpret the columns.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Input CSV file.
    #[arg(short, long, env = "RT_INPUT", value_name = "CSV")]
    pub input: PathBuf,

    /// Input layout.
    #[arg(long, value_enum, env = "RT_FORMAT", default_value_t = SourceFormat::Cumulative)]
    pub format: SourceFormat,

    /// Date column name (defaults depend on --format).
    #[arg(long)]
    pub date_column: Option<String>,

    /// Region column name (defaults depend on --format).
    #[arg(long)]
    pub region_column: Option<String>,

    /// Value column name (defaults depend on --format).
    #[arg(long)]
    pub value_column: Option<String>,
}

/// Serial interval choice: the built-in profile unless a mean/std is given.
#[derive(Debug, Args, Clone)]
pub struct SerialIntervalArgs {
    /// Serial interval mean (days).
    #[arg(long, env = "RT_SI_MEAN", requires = "si_std")]
    pub si_mean: Option<f64>,

    /// Serial interval standard deviation (days).
    #[arg(long, env = "RT_SI_STD", requires = "si_mean")]
    pub si_std: Option<f64>,

    /// Continuous family for --si-mean/--si-std.
    #[arg(long, value_enum, default_value_t = ContinuousFamily::Gamma)]
    pub si_family: ContinuousFamily,
}

#[derive(Debug, Args, Clone)]
pub struct EstimateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Region(s) to estimate. Also labels files without a region column.
    #[arg(short, long = "region", value_name = "REGION")]
    pub regions: Vec<String>,

    /// Estimate every region in the file.
    #[arg(long, conflicts_with = "regions")]
    pub all_regions: bool,

    /// First day to keep (inclusive, YYYY-MM-DD).
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day to keep (inclusive, YYYY-MM-DD).
    #[arg(long)]
    pub end: Option<NaiveDate>,

    #[command(flatten)]
    pub si: SerialIntervalArgs,

    /// LOWESS bandwidth (days).
    #[arg(long, env = "RT_SMOOTHING_WINDOW", default_value_t = 14)]
    pub smoothing_window: usize,

    /// Trailing likelihood window (days).
    #[arg(long = "r-window", env = "RT_R_WINDOW", default_value_t = 7)]
    pub r_window: usize,

    /// Gamma prior shape on R.
    #[arg(long, env = "RT_PRIOR_SHAPE", default_value_t = 1.0)]
    pub prior_shape: f64,

    /// Gamma prior scale on R.
    #[arg(long, env = "RT_PRIOR_SCALE", default_value_t = 5.0)]
    pub prior_scale: f64,

    /// Bisquare robustness passes in LOWESS.
    #[arg(long, default_value_t = 2)]
    pub robustness_iters: usize,

    /// Use N bootstrap resamples for the interval instead of the analytic posterior.
    #[arg(long, value_name = "N")]
    pub bootstrap: Option<usize>,

    /// Bootstrap seed.
    #[arg(long, env = "RT_SEED", default_value_t = 42)]
    pub seed: u64,

    /// How to treat skipped calendar days.
    #[arg(long, value_enum, default_value_t = GapPolicy::Reject)]
    pub gaps: GapPolicy,

    /// Shift estimates to infection dates using the default reporting delay median.
    #[arg(long)]
    pub delay_shift: bool,

    /// Drop unparsable rows instead of failing.
    #[arg(long)]
    pub skip_bad_rows: bool,

    /// Only print the last N estimated days per region.
    #[arg(long, default_value_t = 14)]
    pub tail: usize,

    /// Export the R(t) table(s) to CSV.
    #[arg(long)]
    pub export_csv: Option<PathBuf>,

    /// Export full run outputs (estimate, smoothed incidence, pmfs) to JSON.
    #[arg(long)]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct RegionsArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Label for files without a region column.
    #[arg(short, long)]
    pub region: Option<String>,
}

/// Which pmf `rt distribution` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PmfKind {
    SerialInterval,
    ReportingDelay,
}

#[derive(Debug, Args, Clone)]
pub struct DistributionArgs {
    #[arg(long, value_enum, default_value_t = PmfKind::SerialInterval)]
    pub kind: PmfKind,

    #[command(flatten)]
    pub si: SerialIntervalArgs,

    /// Cumulative mass at which the discretized support is cut.
    #[arg(long, default_value_t = crate::distribution::DEFAULT_TRUNCATION_MASS)]
    pub truncation: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_defaults_match_library_defaults() {
        let cli = Cli::try_parse_from(["rt", "estimate", "--input", "x.csv", "--region", "Tokyo"]).unwrap();
        let Command::Estimate(args) = cli.command else {
            panic!("expected estimate");
        };
        assert_eq!(args.smoothing_window, 14);
        assert_eq!(args.r_window, 7);
        assert_eq!(args.regions, vec!["Tokyo".to_string()]);
        assert!(args.si.si_mean.is_none());
        assert_eq!(args.source.format, SourceFormat::Cumulative);
    }

    #[test]
    fn si_mean_requires_std() {
        let err = Cli::try_parse_from(["rt", "distribution", "--si-mean", "4.0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let cli = Cli::try_parse_from(["rt", "-v", "distribution", "--si-mean", "4", "--si-std", "2", "--si-family", "lognormal"])
            .unwrap();
        assert_eq!(cli.verbose, 1);
        let Command::Distribution(args) = cli.command else {
            panic!("expected distribution");
        };
        assert_eq!(args.si.si_family, ContinuousFamily::LogNormal);
    }

    #[test]
    fn dates_and_formats_parse() {
        let cli = Cli::try_parse_from([
            "rt", "estimate", "-i", "x.csv", "--format", "localized-daily", "--start", "2020-03-01", "--end", "2020-05-31",
            "--bootstrap", "200",
        ])
        .unwrap();
        let Command::Estimate(args) = cli.command else {
            panic!("expected estimate");
        };
        assert_eq!(args.source.format, SourceFormat::LocalizedDaily);
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2020, 3, 1));
        assert_eq!(args.bootstrap, Some(200));
    }
}

//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs logging
//! - parses CLI arguments
//! - ingests the input file
//! - runs the estimation pipeline per region
//! - prints reports and writes optional exports

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, DistributionArgs, EstimateArgs, PmfKind, RegionsArgs, SerialIntervalArgs, SourceArgs};
use crate::distribution::DistributionBuilder;
use crate::domain::{DistributionSpec, EstimationParams, UncertaintyMethod};
use crate::error::AppError;
use crate::incidence::DateRange;
use crate::io::{IngestOptions, IngestedTable, load_observations};

pub mod cache;
pub mod pipeline;

use cache::EstimateCache;
use pipeline::{PipelineOutput, RunSettings, estimate_regions};

/// Entry point for the `rt` binary.
pub fn run() -> Result<(), AppError> {
    // A missing `.env` is fine; RT_* variables may come from the environment.
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Estimate(args) => handle_estimate(args),
        Command::Regions(args) => handle_regions(args),
        Command::Distribution(args) => handle_distribution(args),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Ignore a second init (tests may have installed a subscriber already).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_estimate(args: EstimateArgs) -> Result<(), AppError> {
    let default_region = args.regions.first().cloned();
    let ingest = load(&args.source, default_region)?;
    if args.skip_bad_rows {
        for err in &ingest.row_errors {
            warn!(line = err.line, "skipped row: {}", err.message);
        }
    } else {
        ingest.ensure_clean()?;
    }

    let regions = if args.all_regions || args.regions.is_empty() {
        ingest.table.regions()
    } else {
        args.regions.clone()
    };

    let settings = run_settings_from_args(&args)?;
    let cache = EstimateCache::new();
    let runs = estimate_regions(&ingest.table, &regions, &settings, &cache);

    let mut outputs: Vec<PipelineOutput> = Vec::with_capacity(runs.len());
    for run in runs {
        // The first failing region decides the exit code.
        let output = run
            .result
            .map_err(|e| AppError::new(e.exit_code(), format!("{}: {e}", run.region)))?;
        outputs.push(output);
    }

    for output in &outputs {
        println!("{}", crate::report::format_run_summary(output));
        println!("{}", crate::report::format_rt_table(&output.estimate, args.tail));
    }

    let refs: Vec<&PipelineOutput> = outputs.iter().collect();
    if let Some(path) = &args.export_csv {
        crate::io::export_rt_csv(path, &refs)?;
    }
    if let Some(path) = &args.export_json {
        crate::io::export_json(path, &refs)?;
    }

    Ok(())
}

fn handle_regions(args: RegionsArgs) -> Result<(), AppError> {
    let ingest = load(&args.source, args.region.clone())?;
    if !ingest.row_errors.is_empty() {
        warn!(count = ingest.row_errors.len(), "some rows could not be parsed");
    }
    print!("{}", crate::report::format_regions(&ingest.table.summaries()));
    Ok(())
}

fn handle_distribution(args: DistributionArgs) -> Result<(), AppError> {
    let builder = DistributionBuilder::new().with_truncation_mass(args.truncation);
    let spec = serial_interval_spec(&args.si);
    let (label, dist) = match args.kind {
        PmfKind::SerialInterval => ("serial interval", builder.serial_interval(&spec)?),
        PmfKind::ReportingDelay => ("reporting delay", builder.reporting_delay(&spec)?),
    };
    print!("{}", crate::report::format_pmf(label, &dist));
    Ok(())
}

fn load(source: &SourceArgs, default_region: Option<String>) -> Result<IngestedTable, AppError> {
    let options = IngestOptions {
        format: source.format,
        date_column: source.date_column.clone(),
        region_column: source.region_column.clone(),
        value_column: source.value_column.clone(),
        default_region,
    };
    load_observations(&source.input, &options)
}

/// The built-in profile unless both `--si-mean` and `--si-std` are given.
pub fn serial_interval_spec(args: &SerialIntervalArgs) -> DistributionSpec {
    match (args.si_mean, args.si_std) {
        (Some(mean), Some(std)) => DistributionSpec::MeanStd {
            family: args.si_family,
            mean,
            std,
        },
        _ => DistributionSpec::Default,
    }
}

pub fn run_settings_from_args(args: &EstimateArgs) -> Result<RunSettings, AppError> {
    let uncertainty = match args.bootstrap {
        Some(samples) => UncertaintyMethod::Bootstrap {
            samples,
            seed: args.seed,
        },
        None => UncertaintyMethod::Posterior,
    };
    let params = EstimationParams {
        smoothing_window: args.smoothing_window,
        r_window_size: args.r_window,
        prior_shape: args.prior_shape,
        prior_scale: args.prior_scale,
        robustness_iters: args.robustness_iters,
        uncertainty,
    };
    params.validate()?;

    Ok(RunSettings {
        serial_interval: serial_interval_spec(&args.si),
        reporting_delay: args.delay_shift.then_some(DistributionSpec::Default),
        shift_by_delay: args.delay_shift,
        params,
        date_range: DateRange {
            start: args.start,
            end: args.end,
        },
        gap_policy: args.gaps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    fn estimate_args(extra: &[&str]) -> EstimateArgs {
        let mut argv = vec!["rt", "estimate", "--input", "cases.csv"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Estimate(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn settings_follow_flags() {
        let args = estimate_args(&["--si-mean", "5.2", "--si-std", "1.7", "--bootstrap", "50", "--seed", "9", "--delay-shift"]);
        let settings = run_settings_from_args(&args).unwrap();
        assert!(matches!(settings.serial_interval, DistributionSpec::MeanStd { mean, .. } if mean == 5.2));
        assert_eq!(settings.params.uncertainty, UncertaintyMethod::Bootstrap { samples: 50, seed: 9 });
        assert!(settings.shift_by_delay);
        assert_eq!(settings.reporting_delay, Some(DistributionSpec::Default));
    }

    #[test]
    fn defaults_use_builtin_profile_and_posterior() {
        let settings = run_settings_from_args(&estimate_args(&[])).unwrap();
        assert_eq!(settings.serial_interval, DistributionSpec::Default);
        assert_eq!(settings.params, EstimationParams::default());
        assert_eq!(settings.date_range, DateRange::all());
    }

    #[test]
    fn invalid_window_is_exit_code_two() {
        let err = run_settings_from_args(&estimate_args(&["--r-window", "0"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}

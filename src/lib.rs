//! `rt-estimate` library crate.
//!
//! Estimates the effective reproduction number R(t) from daily case counts
//! with a renewal-equation Gamma–Poisson model on LOWESS-smoothed incidence.
//!
//! The binary (`rt`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the pipeline can be driven from other front-ends
//!
//! Data flow: raw observations → `incidence::IncidenceNormalizer` →
//! `incidence::DateRange` filter → `estimate::RtEstimator`, with
//! `distribution::DistributionBuilder` supplying the serial interval.

pub mod app;
pub mod cli;
pub mod distribution;
pub mod domain;
pub mod error;
pub mod estimate;
pub mod incidence;
pub mod io;
pub mod math;
pub mod report;
pub mod smooth;

//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw observations (`ObservationRow`, `ObservationSeries`, `ObservationTable`)
//! - clean daily incidence (`DailyIncidence`)
//! - estimation inputs (`EstimationParams`, `DistributionSpec`, `UncertaintyMethod`)
//! - estimation outputs (`RtPoint`, `RtEstimate`)

pub mod types;

pub use types::*;

//! Input/output helpers.
//!
//! - CSV ingest for both source layouts (`ingest`)
//! - result exports (CSV/JSON) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;

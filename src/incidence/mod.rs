//! From raw observations to clean daily incidence.
//!
//! - `normalize`: cumulative/daily values → gap-free `DailyIncidence`
//! - `filter`: inclusive date-range restriction

pub mod filter;
pub mod normalize;

pub use filter::*;
pub use normalize::*;

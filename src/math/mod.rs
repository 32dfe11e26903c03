//! Numerical utilities: special functions and sample summaries.

pub mod quantile;
pub mod special;

pub use quantile::*;
pub use special::*;

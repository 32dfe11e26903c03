//! Reproduction-number estimation.
//!
//! Responsibilities:
//!
//! - renewal-equation infectious pressure (`renewal`)
//! - Gamma–Poisson windowed posterior (`posterior`)
//! - resampling-based intervals, parallel over resamples (`bootstrap`)
//! - the `RtEstimator` orchestrating smoothing → pressure → windows (`estimator`)

pub mod bootstrap;
pub mod estimator;
pub mod posterior;
pub mod renewal;

pub use bootstrap::*;
pub use estimator::*;
pub use posterior::*;
pub use renewal::*;

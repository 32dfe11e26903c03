//! Serial-interval and delay distributions.
//!
//! - `pmf`: the validated discrete `Distribution` type
//! - `continuous`: Gamma / log-normal laws and their CDFs
//! - `profiles`: fixed reference tables
//! - `builder`: default vs custom construction, midpoint discretization

pub mod builder;
pub mod continuous;
pub mod pmf;
pub mod profiles;

pub use builder::*;
pub use continuous::*;
pub use pmf::*;
pub use profiles::*;

//! Error types.
//!
//! - `EstimationError` is what the library returns. Every variant names the
//!   first violated precondition; nothing is deferred or swallowed.
//! - `AppError` is what the `rt` binary returns: a message plus a process exit
//!   code. Library errors convert into it at the CLI boundary.

use chrono::NaiveDate;
use thiserror::Error;

/// Failures raised by the estimation pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimationError {
    /// Non-monotonic or duplicate dates, gaps, bad values, or missing columns.
    #[error("malformed series: {0}")]
    MalformedSeries(String),

    /// A pmf that is empty, has negative/non-finite mass, or does not sum to 1.
    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),

    /// A window size, prior or sampling setting outside its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The series is too short for the requested windows (or empty after filtering).
    #[error("insufficient data: need at least {required} days, got {actual}")]
    InsufficientData {
        /// Minimum number of days needed.
        required: usize,
        /// Number of days supplied.
        actual: usize,
    },

    /// A trailing window carries no information (zero incidence or zero infectious pressure).
    #[error("undefined reproduction number on {date}: {reason}")]
    UndefinedEstimate {
        /// First day whose estimate is not a number.
        date: NaiveDate,
        /// Which part of the window was empty.
        reason: String,
    },
}

impl EstimationError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        EstimationError::MalformedSeries(msg.into())
    }

    pub fn invalid_distribution(msg: impl Into<String>) -> Self {
        EstimationError::InvalidDistribution(msg.into())
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        EstimationError::InvalidParameter(msg.into())
    }

    pub fn insufficient(required: usize, actual: usize) -> Self {
        EstimationError::InsufficientData { required, actual }
    }

    /// Process exit code used when this error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            EstimationError::MalformedSeries(_)
            | EstimationError::InvalidDistribution(_)
            | EstimationError::InvalidParameter(_) => 2,
            EstimationError::InsufficientData { .. } => 3,
            EstimationError::UndefinedEstimate { .. } => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<EstimationError> for AppError {
    fn from(err: EstimationError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

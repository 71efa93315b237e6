//! Probability distributions the regression models are built from
mod exponential;
mod gaussian;
mod students_t;
mod truncated;

pub use exponential::{Exponential, ExponentialError};
pub use gaussian::{Gaussian, GaussianError, GaussianParameters};
pub use students_t::{StudentsT, StudentsTError, StudentsTParameters};
pub use truncated::{LeftTruncated, LeftTruncatedError};

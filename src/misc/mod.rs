//! Numerical helpers shared by the figures and the tests
mod func;
mod histogram;
mod ks;
mod quad;

pub use func::{linspace, logsumexp};
pub use histogram::Histogram;
pub use ks::ks_test;
pub use quad::{quad, quad_eps};

//! Bayesian linear regression of crop yield on soil quality.
//!
//! The crate carries everything the analysis needs: a handful of
//! probability distributions, the regression models expressed as log
//! densities over their parameters, prior predictive sampling, a No-U-Turn
//! sampler with warmup adaptation, convergence diagnostics, and figure
//! descriptions that render to PNG.
//!
//! # Example
//!
//! Draw from the prior predictive of the plain regression model
//!
//! ```
//! use yieldreg::model::LinearModel;
//! use yieldreg::predictive::Predictive;
//! use yieldreg::rng::RngKey;
//!
//! let soil = vec![-1.0, -0.2, 0.3, 1.4];
//! let model = LinearModel::standard(soil).unwrap();
//!
//! let prior = Predictive::new(&model, 50).run(RngKey::new(1));
//! assert_eq!(prior.get("Yield").unwrap().n_total(), 50);
//! ```
pub mod consts;
pub mod data;
pub mod diagnostics;
pub mod dist;
pub mod experiment;
pub mod mcmc;
pub mod misc;
pub mod model;
pub mod plot;
pub mod predictive;
pub mod prelude;
mod result;
pub mod rng;
pub mod samples;
pub mod traits;

pub use result::{Error, Result};

#[macro_export]
macro_rules! impl_display {
    ($kind: ty) => {
        impl ::std::fmt::Display for $kind {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                write!(f, "{}", String::from(self))
            }
        }
    };
}

//! Regression models of standardized yield on standardized soil rating
//!
//! A model is a pure function from parameters to a log joint density, plus
//! the ability to draw parameters from the prior and responses from the
//! likelihood. Leaving out the observed response gives prior predictive
//! draws; supplying it conditions the density for posterior inference.
//!
//! All models share the parameter layout `[beta_1, .., beta_k, sigma]`.
mod linear;
mod matrix;
mod truncated;

pub use linear::LinearModel;
pub use matrix::MatrixModel;
pub use truncated::TruncatedModel;

use rand::Rng;
use std::fmt;

use crate::dist::{
    Exponential, ExponentialError, Gaussian, GaussianError, LeftTruncatedError,
};
use crate::traits::HasDensity;

/// Site name of the regression coefficients
pub const BETA: &str = "beta";
/// Site name of the residual scale
pub const SIGMA: &str = "sigma";

/// Regression parameters in their natural (constrained) space
#[derive(Clone, Debug, PartialEq)]
pub struct Params {
    pub beta: Vec<f64>,
    pub sigma: f64,
}

impl Params {
    pub fn new(beta: Vec<f64>, sigma: f64) -> Self {
        Params { beta, sigma }
    }

    /// Map an unconstrained vector `[beta.., ln(sigma)]` to parameters
    pub fn from_unconstrained(z: &[f64]) -> Self {
        let (beta, ln_sigma) = z.split_at(z.len().saturating_sub(1));
        Params {
            beta: beta.to_vec(),
            sigma: ln_sigma.first().map_or(f64::NAN, |s| s.exp()),
        }
    }

    /// Inverse of [`Params::from_unconstrained`]
    pub fn to_unconstrained(&self) -> Vec<f64> {
        let mut z = self.beta.clone();
        z.push(self.sigma.ln());
        z
    }

    /// Flat `[beta.., sigma]`
    pub fn to_vec(&self) -> Vec<f64> {
        let mut theta = self.beta.clone();
        theta.push(self.sigma);
        theta
    }

    /// Inverse of [`Params::to_vec`]
    pub fn from_slice(theta: &[f64]) -> Self {
        let (beta, sigma) = theta.split_at(theta.len().saturating_sub(1));
        Params {
            beta: beta.to_vec(),
            sigma: sigma.first().copied().unwrap_or(f64::NAN),
        }
    }
}

/// Gradient of a log density with respect to [`Params`]
#[derive(Clone, Debug, PartialEq)]
pub struct ParamsGrad {
    pub beta: Vec<f64>,
    pub sigma: f64,
}

impl ParamsGrad {
    pub fn zeros(k: usize) -> Self {
        ParamsGrad {
            beta: vec![0.0; k],
            sigma: 0.0,
        }
    }
}

/// A Bayesian regression model over `[beta.., sigma]`
pub trait Model: Sync {
    /// Number of regression coefficients
    fn n_coefs(&self) -> usize;

    /// Number of rows of explanatory data
    fn n_obs(&self) -> usize;

    /// Site name of the response (`Yield` or `Y`)
    fn response_name(&self) -> &'static str;

    /// Sample-site names of the parameters, in layout order
    fn param_names(&self) -> [&'static str; 2] {
        [BETA, SIGMA]
    }

    /// Number of components of each parameter site
    fn param_dims(&self) -> [usize; 2] {
        [self.n_coefs(), 1]
    }

    /// Dimension of the parameter vector
    fn dim(&self) -> usize {
        self.param_dims().iter().sum()
    }

    /// Linear predictor for each row given coefficients `beta`
    fn linear_predictor(&self, beta: &[f64]) -> Vec<f64>;

    /// Priors on `beta` (one per coefficient) and `sigma`
    fn beta_prior(&self) -> &Gaussian;

    fn sigma_prior(&self) -> &Exponential;

    /// Log likelihood of `y` and its gradient with respect to the linear
    /// predictor `mu` and `sigma`
    fn ln_likelihood_grad(
        &self,
        mu: &[f64],
        sigma: f64,
        y: &[f64],
    ) -> (f64, Vec<f64>, f64);

    /// Draw one response vector given the linear predictor and `sigma`
    fn draw_likelihood<R: Rng>(
        &self,
        mu: &[f64],
        sigma: f64,
        rng: &mut R,
    ) -> Vec<f64>;

    /// Gradient of the linear predictor, chained back onto `beta`
    fn chain_beta_grad(&self, d_mu: &[f64]) -> Vec<f64>;

    /// Check that `y` can be conditioned on
    fn validate_observed(&self, y: &[f64]) -> Result<(), ModelError> {
        check_observed(self.n_obs(), y)
    }

    /// Log prior density of `params`
    fn ln_prior(&self, params: &Params) -> f64 {
        let beta_prior = self.beta_prior();
        params.beta.iter().map(|b| beta_prior.ln_f(b)).sum::<f64>()
            + self.sigma_prior().ln_f(&params.sigma)
    }

    /// Log likelihood of `y` given `params`; `-inf` unless `sigma` is
    /// positive and finite
    fn ln_likelihood(&self, params: &Params, y: &[f64]) -> f64 {
        if !sigma_in_support(params.sigma) {
            return f64::NEG_INFINITY;
        }
        let mu = self.linear_predictor(&params.beta);
        self.ln_likelihood_grad(&mu, params.sigma, y).0
    }

    /// Log joint density `ln p(beta, sigma, y)`
    fn ln_joint(&self, params: &Params, y: &[f64]) -> f64 {
        if !sigma_in_support(params.sigma) {
            return f64::NEG_INFINITY;
        }
        self.ln_prior(params) + self.ln_likelihood(params, y)
    }

    /// Log joint density and its gradient with respect to `params`
    fn ln_joint_grad(&self, params: &Params, y: &[f64]) -> (f64, ParamsGrad) {
        let beta_prior = self.beta_prior();
        let sigma_prior = self.sigma_prior();
        if !sigma_in_support(params.sigma) {
            return (f64::NEG_INFINITY, ParamsGrad::zeros(self.n_coefs()));
        }

        let mu = self.linear_predictor(&params.beta);
        let (ln_lik, d_mu, d_sigma) =
            self.ln_likelihood_grad(&mu, params.sigma, y);

        let mut grad = ParamsGrad {
            beta: self.chain_beta_grad(&d_mu),
            sigma: d_sigma - sigma_prior.rate(),
        };
        let prior_var = beta_prior.sigma() * beta_prior.sigma();
        grad.beta
            .iter_mut()
            .zip(params.beta.iter())
            .for_each(|(g, b)| *g -= (b - beta_prior.mu()) / prior_var);

        (self.ln_prior(params) + ln_lik, grad)
    }

    /// Draw parameters from the prior
    fn draw_prior<R: Rng>(&self, rng: &mut R) -> Params {
        use crate::traits::Sampleable;
        let beta: Vec<f64> = self.beta_prior().sample(self.n_coefs(), rng);
        let sigma: f64 = self.sigma_prior().draw(rng);
        Params { beta, sigma }
    }

    /// Draw a response vector from the likelihood given `params`
    fn draw_response<R: Rng>(&self, params: &Params, rng: &mut R) -> Vec<f64> {
        let mu = self.linear_predictor(&params.beta);
        self.draw_likelihood(&mu, params.sigma, rng)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// No rows of explanatory data
    EmptyData,
    /// An explanatory value is infinite or NaN
    NonFiniteCovariate { index: usize },
    /// Design matrix rows have differing lengths
    RaggedDesign { row: usize, expected: usize, got: usize },
    /// Design matrix columns have differing lengths
    RaggedColumns { column: usize, expected: usize, got: usize },
    /// The observed response does not have one value per row
    ObservedLengthMismatch { expected: usize, got: usize },
    /// An observed value is infinite or NaN
    NonFiniteObservation { index: usize },
    /// An observed value lies below the truncation point
    ObservedBelowTruncation { index: usize, value: f64, low: f64 },
    /// The prior on beta could not be built
    BetaPrior(GaussianError),
    /// The prior on sigma could not be built
    SigmaPrior(ExponentialError),
    /// The truncation point is invalid
    Truncation(LeftTruncatedError),
}

impl std::error::Error for ModelError {}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyData => write!(f, "no explanatory data"),
            Self::NonFiniteCovariate { index } => {
                write!(f, "non-finite explanatory value at row {index}")
            }
            Self::RaggedDesign { row, expected, got } => write!(
                f,
                "design row {row} has {got} columns, expected {expected}"
            ),
            Self::RaggedColumns {
                column,
                expected,
                got,
            } => write!(
                f,
                "design column {column} has {got} rows, expected {expected}"
            ),
            Self::ObservedLengthMismatch { expected, got } => write!(
                f,
                "observed response has {got} values, expected {expected}"
            ),
            Self::NonFiniteObservation { index } => {
                write!(f, "non-finite observation at row {index}")
            }
            Self::ObservedBelowTruncation { index, value, low } => write!(
                f,
                "observation {value} at row {index} is below the \
                 truncation point {low}"
            ),
            Self::BetaPrior(err) => write!(f, "beta prior: {err}"),
            Self::SigmaPrior(err) => write!(f, "sigma prior: {err}"),
            Self::Truncation(err) => write!(f, "truncation: {err}"),
        }
    }
}

fn sigma_in_support(sigma: f64) -> bool {
    sigma > 0.0 && sigma.is_finite()
}

pub(crate) fn check_observed(n_obs: usize, y: &[f64]) -> Result<(), ModelError> {
    if y.len() != n_obs {
        return Err(ModelError::ObservedLengthMismatch {
            expected: n_obs,
            got: y.len(),
        });
    }
    match y.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ModelError::NonFiniteObservation { index }),
        None => Ok(()),
    }
}

pub(crate) fn check_covariates(xs: &[f64]) -> Result<(), ModelError> {
    if xs.is_empty() {
        return Err(ModelError::EmptyData);
    }
    match xs.iter().position(|x| !x.is_finite()) {
        Some(index) => Err(ModelError::NonFiniteCovariate { index }),
        None => Ok(()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Central finite-difference gradient of `ln_joint` in `[beta.., sigma]`
    pub(crate) fn fd_grad<M: Model>(
        model: &M,
        params: &Params,
        y: &[f64],
    ) -> Vec<f64> {
        let h = 1E-6;
        let theta = params.to_vec();
        (0..theta.len())
            .map(|i| {
                let mut up = theta.clone();
                let mut dn = theta.clone();
                up[i] += h;
                dn[i] -= h;
                let f_up = model.ln_joint(&Params::from_slice(&up), y);
                let f_dn = model.ln_joint(&Params::from_slice(&dn), y);
                (f_up - f_dn) / (2.0 * h)
            })
            .collect()
    }

    #[test]
    fn unconstrained_round_trip() {
        let params = Params::new(vec![0.3, -1.2], 0.7);
        let z = params.to_unconstrained();
        assert::close(z[2], 0.7_f64.ln(), 1E-14);
        let back = Params::from_unconstrained(&z);
        for (a, b) in back.beta.iter().zip(params.beta.iter()) {
            assert::close(*a, *b, 1E-14);
        }
        assert::close(back.sigma, 0.7, 1E-14);
    }

    #[test]
    fn slice_round_trip() {
        let params = Params::new(vec![0.3], 2.0);
        assert_eq!(Params::from_slice(&params.to_vec()), params);
    }

    #[test]
    fn check_covariates_rejects_empty_and_nan() {
        assert_eq!(check_covariates(&[]), Err(ModelError::EmptyData));
        assert_eq!(
            check_covariates(&[0.0, f64::NAN]),
            Err(ModelError::NonFiniteCovariate { index: 1 })
        );
    }
}

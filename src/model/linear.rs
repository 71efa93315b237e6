use rand::Rng;

use super::{check_covariates, Model, ModelError};
use crate::dist::{Exponential, Gaussian};
use crate::traits::{HasDensity, Sampleable};

/// Simple regression of yield on soil rating without intercept
///
/// ```text
/// beta  ~ Normal(0, sigma_b)
/// sigma ~ Exponential(1)
/// Yield ~ Normal(Soil * beta, sigma)
/// ```
///
/// With `sigma_b = 1` this is the plain model; other widths are used to
/// compare how strongly the prior pulls on the posterior.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearModel {
    soil: Vec<f64>,
    beta_prior: Gaussian,
    sigma_prior: Exponential,
}

impl LinearModel {
    /// `beta ~ Normal(0, 1)`
    pub fn standard(soil: Vec<f64>) -> Result<Self, ModelError> {
        Self::with_prior_width(soil, 1.0)
    }

    /// `beta ~ Normal(0, sigma_b)`
    pub fn with_prior_width(
        soil: Vec<f64>,
        sigma_b: f64,
    ) -> Result<Self, ModelError> {
        check_covariates(&soil)?;
        let beta_prior =
            Gaussian::new(0.0, sigma_b).map_err(ModelError::BetaPrior)?;
        let sigma_prior =
            Exponential::new(1.0).map_err(ModelError::SigmaPrior)?;
        Ok(LinearModel {
            soil,
            beta_prior,
            sigma_prior,
        })
    }

    /// Prior standard deviation of `beta`
    pub fn sigma_b(&self) -> f64 {
        self.beta_prior.sigma()
    }

    pub fn soil(&self) -> &[f64] {
        &self.soil
    }
}

impl Model for LinearModel {
    fn n_coefs(&self) -> usize {
        1
    }

    fn n_obs(&self) -> usize {
        self.soil.len()
    }

    fn response_name(&self) -> &'static str {
        "Yield"
    }

    fn linear_predictor(&self, beta: &[f64]) -> Vec<f64> {
        let b = beta.first().copied().unwrap_or(0.0);
        self.soil.iter().map(|x| x * b).collect()
    }

    fn beta_prior(&self) -> &Gaussian {
        &self.beta_prior
    }

    fn sigma_prior(&self) -> &Exponential {
        &self.sigma_prior
    }

    fn ln_likelihood_grad(
        &self,
        mu: &[f64],
        sigma: f64,
        y: &[f64],
    ) -> (f64, Vec<f64>, f64) {
        gaussian_likelihood_grad(mu, sigma, y)
    }

    fn draw_likelihood<R: Rng>(
        &self,
        mu: &[f64],
        sigma: f64,
        rng: &mut R,
    ) -> Vec<f64> {
        mu.iter()
            .map(|&m| {
                let y: f64 = Gaussian::new_unchecked(m, sigma).draw(rng);
                y
            })
            .collect()
    }

    fn chain_beta_grad(&self, d_mu: &[f64]) -> Vec<f64> {
        vec![self.soil.iter().zip(d_mu).map(|(x, d)| x * d).sum()]
    }
}

/// Normal likelihood of `y` around `mu` with scale `sigma`, and its
/// gradient with respect to each `mu` and to `sigma`
pub(super) fn gaussian_likelihood_grad(
    mu: &[f64],
    sigma: f64,
    y: &[f64],
) -> (f64, Vec<f64>, f64) {
    let mut ln_lik = 0.0;
    let mut d_sigma = 0.0;
    let d_mu = mu
        .iter()
        .zip(y)
        .map(|(&m, yi)| {
            let fx = Gaussian::new_unchecked(m, sigma);
            ln_lik += fx.ln_f(yi);
            let (dm, ds) = fx.ln_f_grad(*yi);
            d_sigma += ds;
            dm
        })
        .collect();
    (ln_lik, d_mu, d_sigma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::fd_grad;
    use crate::model::Params;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn soil() -> Vec<f64> {
        vec![-1.2, -0.4, 0.0, 0.5, 1.9]
    }

    #[test]
    fn rejects_bad_inputs() {
        assert_eq!(
            LinearModel::standard(vec![]),
            Err(ModelError::EmptyData)
        );
        assert!(LinearModel::with_prior_width(soil(), 0.0).is_err());
        assert!(LinearModel::with_prior_width(soil(), -1.0).is_err());
    }

    #[test]
    fn standard_has_unit_prior_width() {
        let model = LinearModel::standard(soil()).unwrap();
        assert::close(model.sigma_b(), 1.0, 1E-14);
        assert_eq!(model.dim(), 2);
    }

    #[test]
    fn ln_joint_by_hand() {
        let model = LinearModel::with_prior_width(soil(), 5.0).unwrap();
        let params = Params::new(vec![0.4], 0.8);
        let y = vec![-0.3, -0.2, 0.1, 0.3, 0.6];

        let mut expected = Gaussian::new(0.0, 5.0).unwrap().ln_f(&0.4_f64)
            + Exponential::new(1.0).unwrap().ln_f(&0.8_f64);
        for (x, yi) in soil().iter().zip(y.iter()) {
            expected += Gaussian::new(x * 0.4, 0.8).unwrap().ln_f(yi);
        }

        assert::close(model.ln_joint(&params, &y), expected, 1E-12);
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let model = LinearModel::with_prior_width(soil(), 5.0).unwrap();
        let params = Params::new(vec![0.4], 0.8);
        let y = vec![-0.3, -0.2, 0.1, 0.3, 0.6];

        let (_, grad) = model.ln_joint_grad(&params, &y);
        let fd = fd_grad(&model, &params, &y);
        assert::close(grad.beta[0], fd[0], 1E-5);
        assert::close(grad.sigma, fd[1], 1E-5);
    }

    #[test]
    fn ln_joint_grad_value_agrees_with_ln_joint() {
        let model = LinearModel::standard(soil()).unwrap();
        let params = Params::new(vec![-0.1], 1.3);
        let y = vec![0.0, 0.2, -0.1, 0.4, 0.9];
        let (value, _) = model.ln_joint_grad(&params, &y);
        assert::close(value, model.ln_joint(&params, &y), 1E-12);
    }

    #[test]
    fn response_draw_has_one_value_per_row() {
        let model = LinearModel::standard(soil()).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
        let params = model.draw_prior(&mut rng);
        assert_eq!(params.beta.len(), 1);
        assert!(params.sigma > 0.0);
        assert_eq!(model.draw_response(&params, &mut rng).len(), 5);
    }

    #[test]
    fn observed_length_is_checked() {
        let model = LinearModel::standard(soil()).unwrap();
        assert_eq!(
            model.validate_observed(&[0.0; 3]),
            Err(ModelError::ObservedLengthMismatch {
                expected: 5,
                got: 3
            })
        );
        assert!(model.validate_observed(&[0.0; 5]).is_ok());
    }

    #[test]
    fn ln_joint_is_neg_inf_outside_sigma_support() {
        let model = LinearModel::standard(soil()).unwrap();
        let y = vec![0.1, -0.3, 0.0, 0.4, 1.2];
        for sigma in [-1.0, 0.0, f64::INFINITY, f64::NAN] {
            let params = Params::new(vec![0.2], sigma);
            assert_eq!(model.ln_joint(&params, &y), f64::NEG_INFINITY);
            assert_eq!(model.ln_likelihood(&params, &y), f64::NEG_INFINITY);
        }
        assert!(model.ln_joint(&Params::new(vec![0.2], 0.5), &y).is_finite());
    }
}

use rand::Rng;

use super::{check_covariates, check_observed, Model, ModelError};
use crate::consts::STUDENT_T_DF;
use crate::data::Scaler;
use crate::dist::{
    Exponential, Gaussian, LeftTruncated, LeftTruncatedError, StudentsT,
};
use crate::traits::{Cdf, HasDensity, Sampleable};

/// Robust regression with a response bounded below
///
/// ```text
/// beta  ~ Normal(0, sigma_b)
/// sigma ~ Exponential(1)
/// Yield ~ StudentT(5, Soil * beta, sigma) truncated to [low, ∞)
/// ```
///
/// `low` is the standardized value of a zero yield, so no draw corresponds
/// to a negative yield in natural units.
///
/// # Example
///
/// ```
/// use yieldreg::model::{Model, TruncatedModel};
/// use yieldreg::rng::RngKey;
///
/// let model = TruncatedModel::new(vec![-1.0, 0.0, 1.0], 1.0, -0.5).unwrap();
/// let mut rng = RngKey::new(3).rng();
///
/// let params = model.draw_prior(&mut rng);
/// let ys = model.draw_response(&params, &mut rng);
/// assert!(ys.iter().all(|&y| y >= -0.5));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct TruncatedModel {
    soil: Vec<f64>,
    beta_prior: Gaussian,
    sigma_prior: Exponential,
    low: f64,
    df: f64,
}

impl TruncatedModel {
    /// Truncate the response at the standardized value `low`
    pub fn new(
        soil: Vec<f64>,
        sigma_b: f64,
        low: f64,
    ) -> Result<Self, ModelError> {
        check_covariates(&soil)?;
        if !low.is_finite() {
            return Err(ModelError::Truncation(
                LeftTruncatedError::LowNotFinite { low },
            ));
        }
        let beta_prior =
            Gaussian::new(0.0, sigma_b).map_err(ModelError::BetaPrior)?;
        let sigma_prior =
            Exponential::new(1.0).map_err(ModelError::SigmaPrior)?;
        Ok(TruncatedModel {
            soil,
            beta_prior,
            sigma_prior,
            low,
            df: STUDENT_T_DF,
        })
    }

    /// Truncate at the standardized zero yield of `yield_scaler`
    pub fn with_yield_scaler(
        soil: Vec<f64>,
        sigma_b: f64,
        yield_scaler: &Scaler,
    ) -> Result<Self, ModelError> {
        Self::new(soil, sigma_b, yield_scaler.standardize(0.0))
    }

    /// The standardized truncation point
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Prior standard deviation of `beta`
    pub fn sigma_b(&self) -> f64 {
        self.beta_prior.sigma()
    }

    /// Degrees of freedom of the Student's t likelihood
    pub fn df(&self) -> f64 {
        self.df
    }

    pub fn soil(&self) -> &[f64] {
        &self.soil
    }

    /// The likelihood of one row with linear predictor `mu`
    pub fn row_likelihood(
        &self,
        mu: f64,
        sigma: f64,
    ) -> Option<LeftTruncated<StudentsT>> {
        let base = StudentsT::new_unchecked(self.df, mu, sigma);
        LeftTruncated::new(base, self.low).ok()
    }
}

impl Model for TruncatedModel {
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

    fn validate_observed(&self, y: &[f64]) -> Result<(), ModelError> {
        check_observed(self.n_obs(), y)?;
        match y.iter().position(|&v| v < self.low) {
            Some(index) => Err(ModelError::ObservedBelowTruncation {
                index,
                value: y[index],
                low: self.low,
            }),
            None => Ok(()),
        }
    }

    fn ln_likelihood_grad(
        &self,
        mu: &[f64],
        sigma: f64,
        y: &[f64],
    ) -> (f64, Vec<f64>, f64) {
        let std_t = StudentsT::new_unchecked(self.df, 0.0, 1.0);
        let mut ln_lik = 0.0;
        let mut d_sigma = 0.0;
        let mut d_mu = Vec::with_capacity(mu.len());

        for (&m, &yi) in mu.iter().zip(y) {
            if yi < self.low {
                return (f64::NEG_INFINITY, vec![0.0; mu.len()], 0.0);
            }
            let base = StudentsT::new_unchecked(self.df, m, sigma);
            // mass above `low` via the symmetric lower tail
            let a = (self.low - m) / sigma;
            let mass = std_t.cdf(&-a);
            if mass <= 0.0 {
                return (f64::NEG_INFINITY, vec![0.0; mu.len()], 0.0);
            }
            ln_lik += base.ln_f(&yi) - mass.ln();

            let (dm, ds) = base.ln_f_grad(yi);
            let hazard = std_t.standard_pdf(a) / (sigma * mass);
            d_mu.push(dm - hazard);
            d_sigma += ds - hazard * a;
        }
        (ln_lik, d_mu, d_sigma)
    }

    fn draw_likelihood<R: Rng>(
        &self,
        mu: &[f64],
        sigma: f64,
        rng: &mut R,
    ) -> Vec<f64> {
        mu.iter()
            .map(|&m| match self.row_likelihood(m, sigma) {
                Some(fx) => fx.draw(rng),
                // all the mass has piled up on the bound
                None => self.low,
            })
            .collect()
    }

    fn chain_beta_grad(&self, d_mu: &[f64]) -> Vec<f64> {
        vec![self.soil.iter().zip(d_mu).map(|(x, d)| x * d).sum()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::fd_grad;
    use crate::model::Params;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn soil() -> Vec<f64> {
        vec![-1.2, -0.4, 0.0, 0.5, 1.9]
    }

    #[test]
    fn rejects_bad_truncation_point() {
        assert!(matches!(
            TruncatedModel::new(soil(), 1.0, f64::NAN),
            Err(ModelError::Truncation(_))
        ));
        assert!(TruncatedModel::new(soil(), 0.0, -1.0).is_err());
    }

    #[test]
    fn low_comes_from_yield_scaler() {
        let scaler = Scaler::new(70.0, 14.0).unwrap();
        let model =
            TruncatedModel::with_yield_scaler(soil(), 5.0, &scaler).unwrap();
        assert::close(model.low(), -5.0, 1E-12);
        assert::close(model.sigma_b(), 5.0, 1E-12);
    }

    #[test]
    fn ln_likelihood_renormalizes_each_row() {
        let model = TruncatedModel::new(soil(), 1.0, -0.8).unwrap();
        let params = Params::new(vec![0.3], 0.7);
        let y = vec![-0.3, -0.2, 0.1, 0.3, 0.6];

        let expected: f64 = soil()
            .iter()
            .zip(y.iter())
            .map(|(x, yi)| {
                let t = StudentsT::new(5.0, x * 0.3, 0.7).unwrap();
                let sf = 1.0 - t.cdf(&-0.8_f64);
                t.ln_f(yi) - sf.ln()
            })
            .sum();
        assert::close(model.ln_likelihood(&params, &y), expected, 1E-10);
    }

    #[test]
    fn below_truncation_has_no_density() {
        let model = TruncatedModel::new(soil(), 1.0, -0.8).unwrap();
        let params = Params::new(vec![0.3], 0.7);
        let y = vec![-0.3, -0.9, 0.1, 0.3, 0.6];
        assert_eq!(model.ln_joint(&params, &y), f64::NEG_INFINITY);
        assert_eq!(
            model.validate_observed(&y),
            Err(ModelError::ObservedBelowTruncation {
                index: 1,
                value: -0.9,
                low: -0.8
            })
        );
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let model = TruncatedModel::new(soil(), 5.0, -0.8).unwrap();
        let y = vec![-0.3, -0.2, 0.1, 0.3, 0.6];
        for params in [
            Params::new(vec![0.3], 0.7),
            Params::new(vec![-1.1], 0.3),
            Params::new(vec![2.0], 1.6),
        ] {
            let (_, grad) = model.ln_joint_grad(&params, &y);
            let fd = fd_grad(&model, &params, &y);
            assert::close(grad.beta[0], fd[0], 1E-4);
            assert::close(grad.sigma, fd[1], 1E-4);
        }
    }

    #[test]
    fn far_below_bound_draws_sit_on_bound() {
        let model = TruncatedModel::new(vec![1.0], 1.0, 0.0).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);
        let ys = model.draw_likelihood(&[-1E6], 1E-3, &mut rng);
        assert!(ys[0] >= 0.0);
        assert!(ys[0].is_finite());
    }

    proptest! {
        #[test]
        fn prior_predictive_respects_bound(
            low in -3.0..0.5_f64,
            sigma_b in prop_oneof![Just(1.0), Just(5.0)],
            seed in any::<u64>(),
        ) {
            let model = TruncatedModel::new(soil(), sigma_b, low).unwrap();
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
            for _ in 0..10 {
                let params = model.draw_prior(&mut rng);
                let ys = model.draw_response(&params, &mut rng);
                prop_assert!(ys.iter().all(|&y| y >= low));
            }
        }
    }

    #[test]
    fn ln_joint_is_neg_inf_outside_sigma_support() {
        let model = TruncatedModel::new(soil(), 5.0, -3.0).unwrap();
        let y = vec![0.1, -0.3, 0.0, 0.4, 1.2];
        for sigma in [-1.0, 0.0, f64::INFINITY, f64::NAN] {
            let params = Params::new(vec![0.2], sigma);
            assert_eq!(model.ln_joint(&params, &y), f64::NEG_INFINITY);
            assert_eq!(model.ln_likelihood(&params, &y), f64::NEG_INFINITY);
        }
        assert!(model.ln_joint(&Params::new(vec![0.2], 0.5), &y).is_finite());
    }
}

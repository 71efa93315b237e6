//! Prior predictive sampling
use log::debug;

use crate::model::{Model, BETA, SIGMA};
use crate::rng::RngKey;
use crate::samples::{Draws, Samples};

/// Draws parameters from a model's prior and one response per parameter set
///
/// The observed response plays no part, so the draws show what the model
/// believes before seeing any yields.
///
/// # Example
///
/// ```
/// use yieldreg::model::LinearModel;
/// use yieldreg::predictive::Predictive;
/// use yieldreg::rng::RngKey;
///
/// let model = LinearModel::with_prior_width(vec![-0.5, 0.5], 5.0).unwrap();
/// let samples = Predictive::new(&model, 200).run(RngKey::new(0));
///
/// let beta = samples.get("beta").unwrap();
/// assert_eq!(beta.shape(), (1, 200, 1));
/// assert_eq!(samples.get("Yield").unwrap().shape(), (1, 200, 2));
/// ```
pub struct Predictive<'a, M> {
    model: &'a M,
    num_samples: usize,
}

impl<'a, M: Model> Predictive<'a, M> {
    pub fn new(model: &'a M, num_samples: usize) -> Self {
        Predictive { model, num_samples }
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Draw `num_samples` prior parameter sets and responses
    pub fn run(&self, key: RngKey) -> Samples {
        let mut rng = key.rng();
        let k = self.model.n_coefs();
        let n_obs = self.model.n_obs();

        let mut betas = Vec::with_capacity(self.num_samples * k);
        let mut sigmas = Vec::with_capacity(self.num_samples);
        let mut responses = Vec::with_capacity(self.num_samples * n_obs);

        for _ in 0..self.num_samples {
            let params = self.model.draw_prior(&mut rng);
            let y = self.model.draw_response(&params, &mut rng);
            betas.extend_from_slice(&params.beta);
            sigmas.push(params.sigma);
            responses.extend(y);
        }
        debug!(
            "drew {} prior predictive samples of {}",
            self.num_samples,
            self.model.response_name()
        );

        let n = self.num_samples;
        let mut samples = Samples::new();
        samples.insert(BETA, Draws::new_unchecked(1, n, k, betas));
        samples.insert(SIGMA, Draws::new_unchecked(1, n, 1, sigmas));
        samples.insert(
            self.model.response_name(),
            Draws::new_unchecked(1, n, n_obs, responses),
        );
        samples
    }
}

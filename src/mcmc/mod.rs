//! Posterior sampling with the No-U-Turn Sampler
//!
//! Chains run in parallel, each on its own key split off the run key, so
//! results do not depend on thread scheduling.
mod adapt;
mod hmc;
mod nuts;
mod posterior;
mod summary;

pub use nuts::Nuts;
pub use posterior::{LogDensity, Posterior};
pub use summary::{Summary, SummaryRow};

use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::consts::{NUM_CHAINS, NUM_SAMPLES, NUM_WARMUP};
use crate::model::{Model, ModelError, Params, BETA, SIGMA};
use crate::rng::RngKey;
use crate::samples::{Draws, Samples};

/// Sampler diagnostics of one chain after warmup
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainStats {
    /// Adapted leapfrog step size
    pub step_size: f64,
    /// Adapted inverse mass matrix diagonal
    pub inv_mass: Vec<f64>,
    /// Number of divergent transitions among the retained draws
    pub divergences: usize,
    pub mean_accept_prob: f64,
    pub mean_tree_depth: f64,
    /// Total number of gradient evaluations among the retained draws
    pub n_leapfrog: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SamplerError {
    /// The observed response cannot be conditioned on
    Observed(ModelError),
    /// No starting point with finite density was found
    InitializationFailed { attempts: usize },
    /// The run would produce no draws
    NoDraws { num_chains: usize, num_samples: usize },
    /// A NUTS setting is out of range
    InvalidKernel { setting: &'static str, value: f64 },
}

impl std::error::Error for SamplerError {}

impl fmt::Display for SamplerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Observed(err) => write!(f, "invalid observations: {err}"),
            Self::InitializationFailed { attempts } => write!(
                f,
                "no initial point with finite log density in {attempts} \
                 attempts"
            ),
            Self::NoDraws {
                num_chains,
                num_samples,
            } => write!(
                f,
                "{num_chains} chains of {num_samples} samples yield no draws"
            ),
            Self::InvalidKernel { setting, value } => {
                write!(f, "invalid NUTS setting {setting} = {value}")
            }
        }
    }
}

impl From<ModelError> for SamplerError {
    fn from(err: ModelError) -> Self {
        SamplerError::Observed(err)
    }
}

/// Markov chain Monte Carlo driver
///
/// # Example
///
/// ```
/// use yieldreg::mcmc::{Mcmc, Nuts};
/// use yieldreg::model::LinearModel;
/// use yieldreg::rng::RngKey;
///
/// let soil = vec![-1.2, -0.5, 0.1, 0.7, 1.5];
/// let y = vec![-0.8, -0.2, 0.0, 0.5, 1.1];
/// let model = LinearModel::standard(soil).unwrap();
///
/// let mcmc = Mcmc::new(Nuts::default(), 200, 100, 2);
/// let run = mcmc.run(RngKey::new(0), &model, &y).unwrap();
///
/// assert_eq!(run.get_samples().get("beta").unwrap().n_total(), 200);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mcmc {
    pub kernel: Nuts,
    pub num_warmup: usize,
    pub num_samples: usize,
    pub num_chains: usize,
}

impl Default for Mcmc {
    fn default() -> Self {
        Mcmc::new(Nuts::default(), NUM_WARMUP, NUM_SAMPLES, NUM_CHAINS)
    }
}

impl Mcmc {
    pub fn new(
        kernel: Nuts,
        num_warmup: usize,
        num_samples: usize,
        num_chains: usize,
    ) -> Self {
        Mcmc {
            kernel,
            num_warmup,
            num_samples,
            num_chains,
        }
    }

    /// Sample the posterior of `model` conditioned on `observed`
    pub fn run<M: Model>(
        &self,
        key: RngKey,
        model: &M,
        observed: &[f64],
    ) -> Result<McmcRun, SamplerError> {
        if self.num_chains == 0 || self.num_samples == 0 {
            return Err(SamplerError::NoDraws {
                num_chains: self.num_chains,
                num_samples: self.num_samples,
            });
        }
        self.kernel.validate()?;
        let posterior = Posterior::new(model, observed)?;
        info!(
            "running {} chains: {} warmup, {} samples",
            self.num_chains, self.num_warmup, self.num_samples
        );

        let outputs = key
            .split_n(self.num_chains)
            .par_iter()
            .map(|chain_key| {
                let mut rng = chain_key.rng();
                self.kernel.sample_chain(
                    &posterior,
                    self.num_warmup,
                    self.num_samples,
                    &mut rng,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let k = model.n_coefs();
        let mut betas = Vec::with_capacity(self.num_chains * self.num_samples * k);
        let mut sigmas = Vec::with_capacity(self.num_chains * self.num_samples);
        let mut stats = Vec::with_capacity(self.num_chains);
        for output in outputs {
            for z in &output.draws {
                let Params { beta, sigma } = posterior.to_params(z);
                betas.extend(beta);
                sigmas.push(sigma);
            }
            stats.push(output.stats);
        }

        let mut samples = Samples::new();
        samples.insert(
            BETA,
            Draws::new_unchecked(self.num_chains, self.num_samples, k, betas),
        );
        samples.insert(
            SIGMA,
            Draws::new_unchecked(self.num_chains, self.num_samples, 1, sigmas),
        );

        let run = McmcRun { samples, stats };
        info!("sampling done, {} divergences", run.divergences());
        Ok(run)
    }
}

/// The draws and diagnostics of a finished MCMC run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct McmcRun {
    samples: Samples,
    stats: Vec<ChainStats>,
}

impl McmcRun {
    /// Draws with chains kept apart, shaped `(num_chains, num_samples, dim)`
    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Draws with chains concatenated
    pub fn get_samples(&self) -> Samples {
        self.samples.flatten_chains()
    }

    pub fn chain_stats(&self) -> &[ChainStats] {
        &self.stats
    }

    /// Divergent transitions over all chains
    pub fn divergences(&self) -> usize {
        self.stats.iter().map(|s| s.divergences).sum()
    }

    pub fn summary(&self) -> Summary {
        Summary::new(&self.samples, self.divergences())
    }

    /// Write the summary table to stdout
    pub fn print_summary(&self) {
        println!("\n{}\n", self.summary());
    }
}

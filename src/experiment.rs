//! The prior-sensitivity analysis: for each prior width on `beta`, draw
//! from the prior predictive, sample the posterior with NUTS and keep both
//! for the figures.
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_CROP, NUM_CHAINS, NUM_SAMPLES, NUM_WARMUP, N_PRIOR_SAMPLES,
    PRIOR_WIDTHS,
};
use crate::data::{Dataset, Scaler, SyntheticConfig, SOIL_COLUMN};
use crate::diagnostics::mean;
use crate::mcmc::{Mcmc, McmcRun, Nuts, Summary};
use crate::model::{LinearModel, MatrixModel, Model, TruncatedModel};
use crate::plot::{posterior_figure, prior_figure, render_png, RenderError};
use crate::predictive::Predictive;
use crate::rng::RngKey;
use crate::samples::Samples;
use crate::{Error, Result};

/// File name of the prior figure
pub const PRIOR_FIGURE: &str = "linReg_figure2.png";
/// File name of the posterior figure
pub const POSTERIOR_FIGURE: &str = "linReg_figure3.png";

/// Which regression is fitted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// `beta ~ Normal(0, 1)`, ignoring the prior widths
    Plain,
    /// Vector `beta` over the configured design columns
    Matrix,
    /// `beta ~ Normal(0, sigma_b)`
    SigmaB,
    /// Student's t response truncated at zero yield
    Trunc,
}

impl ModelKind {
    /// Whether the model's `beta` prior follows the prior width
    pub fn uses_prior_width(self) -> bool {
        matches!(self, ModelKind::SigmaB | ModelKind::Trunc)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelKind::Plain => "plain",
            ModelKind::Matrix => "matrix",
            ModelKind::SigmaB => "sigma_b",
            ModelKind::Trunc => "trunc",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plain" | "model" => Ok(ModelKind::Plain),
            "matrix" | "model_matrix" => Ok(ModelKind::Matrix),
            "sigma_b" | "model_sigma_b" => Ok(ModelKind::SigmaB),
            "trunc" | "model_trunc" => Ok(ModelKind::Trunc),
            _ => Err(Error::Config(format!(
                "unknown model '{s}', expected one of plain, matrix, \
                 sigma_b or trunc"
            ))),
        }
    }
}

/// Settings of one analysis run
///
/// # Example
///
/// ```
/// use yieldreg::experiment::{ExperimentConfig, ModelKind};
///
/// let yaml = "model: trunc\nprior_widths: [1, 2.5]\nnum_chains: 4\n";
/// let config = ExperimentConfig::from_yaml(yaml.as_bytes()).unwrap();
///
/// assert_eq!(config.model, ModelKind::Trunc);
/// assert_eq!(config.prior_widths, vec![1.0, 2.5]);
/// assert_eq!(config.num_warmup, 1000);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub seed: u64,
    /// Prior predictive draws per prior width
    pub n_prior_samples: usize,
    /// Standard deviations of the `beta` prior to compare
    pub prior_widths: Vec<f64>,
    pub num_warmup: usize,
    pub num_samples: usize,
    pub num_chains: usize,
    pub kernel: Nuts,
    pub model: ModelKind,
    pub crop: String,
    /// Design columns of the matrix model; the first is varied in the
    /// regression-line figures
    pub columns: Vec<String>,
    pub output_dir: PathBuf,
    pub dpi: u32,
    /// Shape of the simulated dataset used without a data directory
    pub synthetic: SyntheticConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            seed: 1,
            n_prior_samples: N_PRIOR_SAMPLES,
            prior_widths: PRIOR_WIDTHS.to_vec(),
            num_warmup: NUM_WARMUP,
            num_samples: NUM_SAMPLES,
            num_chains: NUM_CHAINS,
            kernel: Nuts::default(),
            model: ModelKind::SigmaB,
            crop: String::from(DEFAULT_CROP),
            columns: vec![String::from(SOIL_COLUMN)],
            output_dir: PathBuf::from("figures"),
            dpi: 300,
            synthetic: SyntheticConfig::default(),
        }
    }
}

impl ExperimentConfig {
    /// Read a YAML document; absent fields keep their defaults
    pub fn from_yaml<R: Read>(reader: R) -> Result<Self> {
        let config: ExperimentConfig = serde_yaml::from_reader(reader)
            .map_err(|err| Error::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::Config(msg));
        if self.prior_widths.is_empty() {
            return fail(String::from("no prior widths"));
        }
        if let Some(w) = self
            .prior_widths
            .iter()
            .find(|w| !(w.is_finite() && **w > 0.0))
        {
            return fail(format!("prior width {w} is not a positive number"));
        }
        if self.n_prior_samples == 0 {
            return fail(String::from("n_prior_samples must be positive"));
        }
        if self.num_chains == 0 || self.num_samples == 0 {
            return fail(String::from(
                "num_chains and num_samples must be positive",
            ));
        }
        if self.columns.is_empty() {
            return fail(String::from("no design columns"));
        }
        if self.dpi == 0 {
            return fail(String::from("dpi must be positive"));
        }
        self.kernel.validate()?;
        Ok(())
    }

    fn mcmc(&self) -> Mcmc {
        Mcmc::new(
            self.kernel.clone(),
            self.num_warmup,
            self.num_samples,
            self.num_chains,
        )
    }
}

/// Prior and posterior draws under one prior width
#[derive(Clone, Debug)]
pub struct SensitivityResult {
    pub sigma_b: f64,
    /// Name of the response site in `prior`
    pub response: String,
    /// Prior predictive draws of `beta`, `sigma` and the response
    pub prior: Samples,
    /// The MCMC run conditioned on the observed yields
    pub mcmc: McmcRun,
    /// Posterior draws with chains concatenated
    pub posterior: Samples,
}

impl SensitivityResult {
    pub fn summary(&self) -> Summary {
        self.mcmc.summary()
    }
}

/// Everything the figures need: the fitted results and the statistics that
/// map them back to natural units
#[derive(Clone, Debug)]
pub struct Experiment {
    pub config: ExperimentConfig,
    /// Standardized soil ratings of the training rows
    pub soil: Vec<f64>,
    /// Column means of the design, in standard units
    pub design_means: Vec<f64>,
    pub soil_scaler: Scaler,
    pub yield_scaler: Scaler,
    pub results: Vec<SensitivityResult>,
}

/// The model of one prior width
enum Regression {
    Linear(LinearModel),
    Matrix(MatrixModel),
    Truncated(TruncatedModel),
}

/// Soil rating and yield statistics of `crop` in the form the analysis
/// reports them. The default crop is reported under its English name.
///
/// ```
/// use yieldreg::data::Scaler;
/// use yieldreg::experiment::describe_scaling;
///
/// let soil = Scaler::new(48.512, 13.9).unwrap();
/// let yields = Scaler::new(76.0, 11.25).unwrap();
/// let text = describe_scaling(&soil, &yields, "Winterweizen");
///
/// assert_eq!(
///     text,
///     "SoilRating [0-100]: Mean=48.51, Std=13.90\n\
///      WinterWheatYield: Mean=76.00dt, Std=11.25dt"
/// );
/// ```
pub fn describe_scaling(soil: &Scaler, yields: &Scaler, crop: &str) -> String {
    let label = if crop == DEFAULT_CROP { "WinterWheat" } else { crop };
    format!(
        "SoilRating [0-100]: Mean={:.2}, Std={:.2}\n\
         {label}Yield: Mean={:.2}dt, Std={:.2}dt",
        soil.mean(),
        soil.std(),
        yields.mean(),
        yields.std()
    )
}

/// Prior predictive draws and a posterior run of one model
fn fit_width<M: Model>(
    model: &M,
    sigma_b: f64,
    config: &ExperimentConfig,
    observed: &[f64],
    key: RngKey,
) -> Result<(RngKey, SensitivityResult)> {
    let (key, prior_key) = key.split();
    let prior = Predictive::new(model, config.n_prior_samples).run(prior_key);

    println!("Estimate model with sigma_b={sigma_b}");
    let (key, mcmc_key) = key.split();
    let mcmc = config.mcmc().run(mcmc_key, model, observed)?;
    mcmc.print_summary();

    let result = SensitivityResult {
        sigma_b,
        response: model.response_name().to_owned(),
        prior,
        posterior: mcmc.get_samples(),
        mcmc,
    };
    Ok((key, result))
}

/// Run the prior-sensitivity analysis on the training rows of
/// `config.crop`
pub fn run(dataset: &Dataset, config: &ExperimentConfig) -> Result<Experiment> {
    config.validate()?;
    let train = dataset.train_crop(&config.crop)?;
    let soil_scaler = dataset.scaling.soil()?;
    let yield_scaler = dataset.scaling.yield_for(&config.crop)?;
    let soil = train.soil();
    let yields = train.yields();
    info!(
        "fitting the {} model to {} rows of {}",
        config.model,
        train.len(),
        config.crop
    );
    if !config.model.uses_prior_width() && config.prior_widths.len() > 1 {
        warn!(
            "the {} model ignores the prior width; every run uses the same \
             prior",
            config.model
        );
    }

    let columns: Vec<&str> = config.columns.iter().map(String::as_str).collect();
    let design_means = match config.model {
        ModelKind::Matrix => columns
            .iter()
            .map(|name| train.column(name).map(|xs| mean(&xs)))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        _ => vec![mean(&soil)],
    };

    let mut key = RngKey::new(config.seed);
    let mut results = Vec::with_capacity(config.prior_widths.len());
    for &sigma_b in &config.prior_widths {
        let model = match config.model {
            ModelKind::Plain => {
                Regression::Linear(LinearModel::standard(soil.clone())?)
            }
            ModelKind::SigmaB => Regression::Linear(
                LinearModel::with_prior_width(soil.clone(), sigma_b)?,
            ),
            ModelKind::Matrix => Regression::Matrix(MatrixModel::new(
                train.design_matrix(&columns)?,
            )?),
            ModelKind::Trunc => {
                Regression::Truncated(TruncatedModel::with_yield_scaler(
                    soil.clone(),
                    sigma_b,
                    &yield_scaler,
                )?)
            }
        };
        let (next, result) = match &model {
            Regression::Linear(m) => fit_width(m, sigma_b, config, &yields, key),
            Regression::Matrix(m) => fit_width(m, sigma_b, config, &yields, key),
            Regression::Truncated(m) => {
                fit_width(m, sigma_b, config, &yields, key)
            }
        }?;
        key = next;
        results.push(result);
    }

    Ok(Experiment {
        config: config.clone(),
        soil,
        design_means,
        soil_scaler,
        yield_scaler,
        results,
    })
}

impl Experiment {
    /// Render both figures into `config.output_dir`, creating it if needed.
    /// Returns the written paths.
    pub fn write_figures(&self) -> Result<Vec<PathBuf>> {
        self.write_figures_to(&self.config.output_dir)
    }

    pub fn write_figures_to<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|source| RenderError::Io {
            path: dir.to_owned(),
            source,
        })?;
        let figures = [
            (PRIOR_FIGURE, prior_figure(self)?),
            (POSTERIOR_FIGURE, posterior_figure(self)?),
        ];
        figures
            .iter()
            .map(|(name, figure)| {
                let path = dir.join(name);
                render_png(figure, &path, self.config.dpi)?;
                info!("wrote {}", path.display());
                Ok(path)
            })
            .collect()
    }
}

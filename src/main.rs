//! yieldreg CLI: the prior-sensitivity analysis of crop yield on soil quality

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use yieldreg::data::Dataset;
use yieldreg::experiment::{self, describe_scaling, ExperimentConfig, ModelKind};
use yieldreg::rng::RngKey;

#[derive(Parser)]
#[command(name = "yieldreg")]
#[command(about = "Bayesian regression of crop yield on soil quality")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,

    /// Directory holding train.csv, test.csv and scaling.json
    #[arg(short, long, conflicts_with = "synthetic")]
    data: Option<PathBuf>,

    /// Simulate the field trials instead of loading them
    #[arg(long)]
    synthetic: bool,

    /// YAML experiment configuration. Flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Regression to fit (plain, matrix, sigma_b, trunc)
    #[arg(short, long)]
    model: Option<ModelKind>,

    /// Crop whose training rows are fitted
    #[arg(long)]
    crop: Option<String>,

    /// Where the figures are written
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Seed of the random number generator
    #[arg(long)]
    seed: Option<u64>,

    /// Write the simulated dataset to this directory before fitting
    #[arg(long, requires = "synthetic")]
    save_data: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("opening {}", path.display()))?;
                ExperimentConfig::from_yaml(file)
                    .with_context(|| format!("reading {}", path.display()))?
            }
            None => ExperimentConfig::default(),
        };
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(crop) = &self.crop {
            config.crop = crop.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        config.validate()?;
        Ok(config)
    }

    fn dataset(&self, config: &ExperimentConfig) -> Result<Dataset> {
        match &self.data {
            Some(dir) => Dataset::load(dir)
                .with_context(|| format!("loading data from {}", dir.display())),
            None => {
                if !self.synthetic {
                    tracing::warn!("no --data directory; simulating field trials");
                }
                // the data get their own stream so the fit does not depend on it
                let data = Dataset::synthetic(
                    &config.synthetic,
                    RngKey::new(config.seed.wrapping_add(1)),
                )?;
                if let Some(dir) = &self.save_data {
                    data.save(dir).with_context(|| {
                        format!("saving data to {}", dir.display())
                    })?;
                }
                Ok(data)
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .init();

    let config = cli.config()?;
    let dataset = cli.dataset(&config)?;

    let soil = dataset.scaling.soil()?;
    let yields = dataset.scaling.yield_for(&config.crop)?;
    println!("{}", describe_scaling(&soil, &yields, &config.crop));

    let experiment = experiment::run(&dataset, &config)?;
    for path in experiment.write_figures()? {
        tracing::info!("figure saved to {}", path.display());
    }
    Ok(())
}

//! The prior and posterior figures of the prior-sensitivity analysis
use std::ops::Range;

use super::{Figure, Layer, Panel, RenderError, Row, Shade};
use crate::consts::DT_PER_TONNE;
use crate::data::Scaler;
use crate::experiment::{Experiment, SensitivityResult};
use crate::misc::{linspace, Histogram};
use crate::model::BETA;
use crate::samples::{Draws, Samples};

/// Draws shown as regression lines
pub const FAN_DRAWS: Range<usize> = 1..300;
/// Bins of every histogram
pub const HIST_BINS: usize = 100;
/// Points along each regression line
pub const SOIL_GRID_POINTS: usize = 100;

/// Standardized soil range the regression lines span
const SOIL_GRID: (f64, f64) = (-5.0, 5.0);
const FIGURE_SIZE: (f64, f64) = (15.0, 10.0);
const FAN_ALPHA: f64 = 0.2;
/// Soil ratings shown in the regression-line panels
const SOIL_LIMITS: (f64, f64) = (30.0, 70.0);
const BETA_LIMITS: (f64, f64) = (-1.0, 1.0);

const YIELD_LABEL: &str = "Yield [t/ha]";
const DENSITY_LABEL: &str = "Density";
const SOIL_LABEL: &str = "Soil Rating";

fn site<'a>(samples: &'a Samples, name: &str) -> Result<&'a Draws, RenderError> {
    samples.get(name).ok_or_else(|| RenderError::MissingSite {
        name: name.to_owned(),
    })
}

fn panel_title(sigma_b: f64) -> String {
    format!("β~Normal(0,{sigma_b})")
}

/// Regression lines in natural units over a grid of soil ratings
///
/// The first design column sweeps the standardized soil grid while the
/// others stay at `design_means`. Each line is `x · beta` mapped back to
/// decitonnes and converted to tonnes per hectare. Returns the grid in
/// soil-rating units and one line per draw in `draws`.
pub fn fan_lines(
    beta: &Draws,
    draws: Range<usize>,
    design_means: &[f64],
    soil: &Scaler,
    yields: &Scaler,
) -> (Vec<f64>, Vec<Vec<f64>>) {
    let grid = linspace(SOIL_GRID.0, SOIL_GRID.1, SOIL_GRID_POINTS);
    let x: Vec<f64> = grid.iter().map(|&z| soil.destandardize(z)).collect();
    let lines = draws
        .filter_map(|ix| beta.flat(ix))
        .map(|b| {
            // contribution of the columns held at their means
            let offset: f64 = b
                .iter()
                .zip(design_means)
                .skip(1)
                .map(|(bj, xj)| bj * xj)
                .sum();
            grid.iter()
                .map(|&z| {
                    let y_hat = b[0].mul_add(z, offset);
                    yields.destandardize(y_hat) / DT_PER_TONNE
                })
                .collect()
        })
        .collect();
    (x, lines)
}

fn fan_panel(
    experiment: &Experiment,
    result: &SensitivityResult,
    samples: &Samples,
) -> Result<Panel, RenderError> {
    let (x, lines) = fan_lines(
        site(samples, BETA)?,
        FAN_DRAWS,
        &experiment.design_means,
        &experiment.soil_scaler,
        &experiment.yield_scaler,
    );
    let rug = experiment
        .soil
        .iter()
        .map(|&z| experiment.soil_scaler.destandardize(z))
        .collect();
    Ok(Panel::new(panel_title(result.sigma_b), SOIL_LABEL, YIELD_LABEL)
        .with_x_range(SOIL_LIMITS.0, SOIL_LIMITS.1)
        .with_layer(Layer::LineFan {
            x,
            lines,
            shade: Shade::Black,
            alpha: FAN_ALPHA,
        })
        .with_layer(Layer::Rug {
            xs: rug,
            shade: Shade::Grey,
        }))
}

/// Histogram of prior predictive yields in tonnes per hectare
fn prior_yield_panel(
    experiment: &Experiment,
    result: &SensitivityResult,
) -> Result<Panel, RenderError> {
    let yields: Vec<f64> = site(&result.prior, &result.response)?
        .values()
        .iter()
        .filter(|y| y.is_finite())
        .map(|&y| experiment.yield_scaler.destandardize(y) / DT_PER_TONNE)
        .collect();
    Ok(
        Panel::new(panel_title(result.sigma_b), YIELD_LABEL, DENSITY_LABEL)
            .with_layer(Layer::Histogram {
                hist: Histogram::new(&yields, HIST_BINS, None, true),
                shade: Shade::Grey,
                label: None,
            }),
    )
}

/// Prior and posterior densities of the soil coefficient
fn beta_density_panel(result: &SensitivityResult) -> Result<Panel, RenderError> {
    let prior = site(&result.prior, BETA)?.component(0);
    let posterior = site(&result.posterior, BETA)?.component(0);
    Ok(Panel::new(panel_title(result.sigma_b), "β", DENSITY_LABEL)
        .with_x_range(BETA_LIMITS.0, BETA_LIMITS.1)
        .with_layer(Layer::Histogram {
            hist: Histogram::new(&prior, HIST_BINS, None, true),
            shade: Shade::Grey,
            label: Some(String::from("prior")),
        })
        .with_layer(Layer::Histogram {
            hist: Histogram::new(&posterior, HIST_BINS, None, true),
            shade: Shade::Black,
            label: Some(String::from("posterior")),
        })
        .with_legend())
}

/// Prior predictive yields (top) and prior regression lines (bottom), one
/// column per prior width
pub fn prior_figure(experiment: &Experiment) -> Result<Figure, RenderError> {
    let mut yields = Vec::with_capacity(experiment.results.len());
    let mut fans = Vec::with_capacity(experiment.results.len());
    for result in &experiment.results {
        yields.push(prior_yield_panel(experiment, result)?);
        let fan = fan_panel(experiment, result, &result.prior)?;
        // wide priors give far steeper lines
        fans.push(if result.sigma_b == 1.0 {
            fan.with_y_range(0.0, 15.0)
        } else {
            fan.with_y_range(-20.0, 40.0)
        });
    }
    Ok(Figure {
        size: FIGURE_SIZE,
        rows: vec![
            Row {
                title: String::from("Prior samples for yields"),
                panels: yields,
            },
            Row {
                title: String::from("Prior samples of regression lines"),
                panels: fans,
            },
        ],
    })
}

/// Prior against posterior `beta` (top) and posterior regression lines
/// (bottom), one column per prior width
pub fn posterior_figure(experiment: &Experiment) -> Result<Figure, RenderError> {
    let mut densities = Vec::with_capacity(experiment.results.len());
    let mut fans = Vec::with_capacity(experiment.results.len());
    for result in &experiment.results {
        densities.push(beta_density_panel(result)?);
        fans.push(fan_panel(experiment, result, &result.posterior)?);
    }
    Ok(Figure {
        size: FIGURE_SIZE,
        rows: vec![
            Row {
                title: String::from("Posterior and Prior densities"),
                panels: densities,
            },
            Row {
                title: String::from("Posterior regression lines"),
                panels: fans,
            },
        ],
    })
}

//! Posterior summary table
use std::fmt;

use serde::Serialize;

use crate::diagnostics::{
    effective_sample_size, hpdi, mean, quantile, split_rhat, std,
};
use crate::samples::Samples;

/// Mass of the reported credible interval
const HPDI_PROB: f64 = 0.9;

/// Summary statistics of one scalar parameter component
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SummaryRow {
    pub name: String,
    pub mean: f64,
    pub std: f64,
    pub median: f64,
    /// Lower end of the 90% highest posterior density interval
    #[serde(rename = "5.0%")]
    pub hpdi_05: f64,
    /// Upper end of the 90% highest posterior density interval
    #[serde(rename = "95.0%")]
    pub hpdi_95: f64,
    pub n_eff: f64,
    pub r_hat: f64,
}

impl SummaryRow {
    /// Summarize per-chain draws of one component
    pub fn from_chains<S: Into<String>>(name: S, chains: &[Vec<f64>]) -> Self {
        let flat: Vec<f64> = chains.iter().flatten().copied().collect();
        let (hpdi_05, hpdi_95) = hpdi(&flat, HPDI_PROB);
        SummaryRow {
            name: name.into(),
            mean: mean(&flat),
            std: std(&flat),
            median: quantile(&flat, 0.5),
            hpdi_05,
            hpdi_95,
            n_eff: effective_sample_size(chains),
            r_hat: split_rhat(chains),
        }
    }
}

/// Per-parameter summary plus the total number of divergent transitions
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub rows: Vec<SummaryRow>,
    pub divergences: usize,
}

impl Summary {
    /// Summarize every component of every site in `samples`. Vector sites
    /// get one row per component named `site[j]`.
    pub fn new(samples: &Samples, divergences: usize) -> Self {
        let rows = samples
            .iter()
            .flat_map(|(name, draws)| {
                let dim = draws.dim();
                (0..dim).map(move |j| {
                    let label = if dim == 1 {
                        name.to_string()
                    } else {
                        format!("{name}[{j}]")
                    };
                    SummaryRow::from_chains(label, &draws.component_by_chain(j))
                })
            })
            .collect();
        Summary { rows, divergences }
    }

    pub fn get(&self, name: &str) -> Option<&SummaryRow> {
        self.rows.iter().find(|row| row.name == name)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .rows
            .iter()
            .map(|row| row.name.len())
            .max()
            .unwrap_or(0)
            .max(8);
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9}",
            "", "mean", "std", "median", "5.0%", "95.0%", "n_eff", "r_hat"
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9.2} \
                 {:>9.2}",
                row.name,
                row.mean,
                row.std,
                row.median,
                row.hpdi_05,
                row.hpdi_95,
                row.n_eff,
                row.r_hat
            )?;
        }
        writeln!(f)?;
        write!(f, "Number of divergences: {}", self.divergences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::Draws;

    fn samples() -> Samples {
        let mut samples = Samples::new();
        let sigma: Vec<f64> = (0..20).map(|i| 1.0 + 0.01 * f64::from(i)).collect();
        samples.insert("sigma", Draws::new(2, 10, 1, sigma).unwrap());
        let beta: Vec<f64> = (0..40).map(|i| f64::from(i % 7)).collect();
        samples.insert("beta", Draws::new(2, 10, 2, beta).unwrap());
        samples
    }

    #[test]
    fn one_row_per_component() {
        let summary = Summary::new(&samples(), 3);
        let names: Vec<&str> =
            summary.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["beta[0]", "beta[1]", "sigma"]);
        assert_eq!(summary.divergences, 3);
    }

    #[test]
    fn row_statistics() {
        let summary = Summary::new(&samples(), 0);
        let sigma = summary.get("sigma").unwrap();
        assert::close(sigma.mean, 1.095, 1E-12);
        assert::close(sigma.median, 1.095, 1E-12);
        assert::close(sigma.hpdi_95 - sigma.hpdi_05, 0.18, 1E-9);
        assert!(sigma.hpdi_05 >= 1.0 && sigma.hpdi_05 <= 1.0100001);
        // the second chain sits entirely above the first
        assert!(sigma.r_hat > 1.5);
    }

    #[test]
    fn table_layout() {
        let mut samples = Samples::new();
        samples.insert(
            "sigma",
            Draws::new(1, 4, 1, vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
        );
        let text = Summary::new(&samples, 0).to_string();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header.split_whitespace().collect::<Vec<_>>(),
            vec!["mean", "std", "median", "5.0%", "95.0%", "n_eff", "r_hat"]
        );
        assert_eq!(header.len(), 8 + 7 * 10);
        assert!(text.ends_with("\n\nNumber of divergences: 0"));
        assert!(text.lines().nth(1).unwrap().starts_with("   sigma      2.50"));
    }

    #[test]
    fn interval_is_the_highest_density_one() {
        let mut draws: Vec<f64> =
            (0..95).map(|i| (f64::from(i) / 95.0).powi(2)).collect();
        draws.extend((0..5).map(|i| 50.0 + f64::from(i)));
        let row = SummaryRow::from_chains("beta", &[draws]);
        assert_eq!(row.hpdi_05, 0.0);
        assert::close(row.hpdi_95, (90.0_f64 / 95.0).powi(2), 1E-12);
    }
}

//! Equal-width histograms
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Bin edges and heights of an equal-width histogram
///
/// Non-finite values are dropped. With `density` the heights integrate to
/// one over the binned range, otherwise they are counts.
///
/// # Example
///
/// ```
/// use yieldreg::misc::Histogram;
///
/// let xs = [0.0, 0.5, 1.0, 1.5, 2.0, f64::INFINITY];
/// let hist = Histogram::new(&xs, 2, None, true);
///
/// assert_eq!(hist.edges(), &[0.0, 1.0, 2.0]);
/// assert_eq!(hist.heights(), &[0.4, 0.6]);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    edges: Vec<f64>,
    heights: Vec<f64>,
}

impl Histogram {
    /// Bin `xs` into `bins` bins over `range`, or over the data range when
    /// `range` is `None`. The last bin includes its right edge.
    pub fn new(
        xs: &[f64],
        bins: usize,
        range: Option<(f64, f64)>,
        density: bool,
    ) -> Self {
        let finite: Vec<f64> =
            xs.iter().copied().filter(|x| x.is_finite()).collect();
        let bins = bins.max(1);
        let (lo, hi) = match range {
            Some(range) => range,
            None => finite
                .iter()
                .copied()
                .minmax()
                .into_option()
                .unwrap_or((0.0, 1.0)),
        };
        // a degenerate range gets a unit-wide window around it
        let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 0.5, lo + 0.5) };

        let width = (hi - lo) / bins as f64;
        let edges = super::linspace(lo, hi, bins + 1);
        let mut counts = vec![0_usize; bins];
        finite
            .iter()
            .filter(|&&x| x >= lo && x <= hi)
            .for_each(|&x| {
                let ix = (((x - lo) / width) as usize).min(bins - 1);
                counts[ix] += 1;
            });

        let total: usize = counts.iter().sum();
        let heights = counts
            .iter()
            .map(|&c| {
                if !density {
                    c as f64
                } else if total == 0 {
                    0.0
                } else {
                    c as f64 / (total as f64 * width)
                }
            })
            .collect();
        Histogram { edges, heights }
    }

    /// `bins + 1` bin boundaries
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    /// `(left, right, height)` of each bin
    pub fn bars(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.edges
            .windows(2)
            .zip(&self.heights)
            .map(|(edge, &h)| (edge[0], edge[1], h))
    }

    /// The tallest bar
    pub fn max_height(&self) -> f64 {
        self.heights.iter().copied().fold(0.0, f64::max)
    }
}

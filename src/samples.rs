//! Named collections of draws
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Draws of one sample site, shaped `(n_chains, n_draws, dim)`
///
/// Values are stored row-major: all components of a draw are contiguous and
/// the draws of a chain follow each other.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Draws {
    n_chains: usize,
    n_draws: usize,
    dim: usize,
    values: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapeError {
    pub expected: usize,
    pub got: usize,
}

impl std::error::Error for ShapeError {}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {} values, got {}", self.expected, self.got)
    }
}

impl Draws {
    /// Wrap `values` laid out as `(n_chains, n_draws, dim)`
    pub fn new(
        n_chains: usize,
        n_draws: usize,
        dim: usize,
        values: Vec<f64>,
    ) -> Result<Self, ShapeError> {
        let expected = n_chains * n_draws * dim;
        if values.len() != expected {
            Err(ShapeError {
                expected,
                got: values.len(),
            })
        } else {
            Ok(Draws {
                n_chains,
                n_draws,
                dim,
                values,
            })
        }
    }

    /// Wrap `values` without checking that the shape matches
    #[inline]
    pub fn new_unchecked(
        n_chains: usize,
        n_draws: usize,
        dim: usize,
        values: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(values.len(), n_chains * n_draws * dim);
        Draws {
            n_chains,
            n_draws,
            dim,
            values,
        }
    }

    /// Stack per-chain draws. Every chain must hold the same number of draws
    /// and every draw must have length `dim`.
    pub fn from_chains(
        chains: &[Vec<Vec<f64>>],
        dim: usize,
    ) -> Result<Self, ShapeError> {
        let n_chains = chains.len();
        let n_draws = chains.first().map_or(0, Vec::len);
        let values: Vec<f64> = chains
            .iter()
            .flat_map(|chain| chain.iter().flatten().copied())
            .collect();
        Self::new(n_chains, n_draws, dim, values)
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.n_chains, self.n_draws, self.dim)
    }

    #[inline]
    pub fn n_chains(&self) -> usize {
        self.n_chains
    }

    #[inline]
    pub fn n_draws(&self) -> usize {
        self.n_draws
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Total number of draws across chains
    #[inline]
    pub fn n_total(&self) -> usize {
        self.n_chains * self.n_draws
    }

    /// The raw values
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// One draw of one chain
    pub fn get(&self, chain: usize, draw: usize) -> Option<&[f64]> {
        if chain >= self.n_chains || draw >= self.n_draws {
            return None;
        }
        let start = (chain * self.n_draws + draw) * self.dim;
        Some(&self.values[start..start + self.dim])
    }

    /// The `ix`-th draw with chains concatenated
    pub fn flat(&self, ix: usize) -> Option<&[f64]> {
        if ix >= self.n_total() {
            return None;
        }
        let start = ix * self.dim;
        Some(&self.values[start..start + self.dim])
    }

    /// Iterate over all draws with chains concatenated
    pub fn iter(&self) -> impl Iterator<Item = &[f64]> + '_ {
        // dim == 0 would make `chunks` panic
        self.values.chunks(self.dim.max(1)).take(self.n_total())
    }

    /// Component `j` of every draw with chains concatenated
    pub fn component(&self, j: usize) -> Vec<f64> {
        self.iter().filter_map(|draw| draw.get(j).copied()).collect()
    }

    /// Component `j` of every draw, one vector per chain
    pub fn component_by_chain(&self, j: usize) -> Vec<Vec<f64>> {
        (0..self.n_chains)
            .map(|c| {
                (0..self.n_draws)
                    .filter_map(|d| self.get(c, d).and_then(|x| x.get(j)))
                    .copied()
                    .collect()
            })
            .collect()
    }

    /// Merge chains into a single chain of `n_chains * n_draws` draws
    pub fn flatten_chains(&self) -> Draws {
        Draws {
            n_chains: 1,
            n_draws: self.n_total(),
            dim: self.dim,
            values: self.values.clone(),
        }
    }
}

/// Draws keyed by sample-site name (`beta`, `sigma`, `Yield`, ...)
///
/// Prior and posterior collections use the same site names so they can be
/// overlaid.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Samples {
    sites: BTreeMap<String, Draws>,
}

impl Samples {
    pub fn new() -> Self {
        Samples::default()
    }

    pub fn insert<S: Into<String>>(&mut self, name: S, draws: Draws) {
        self.sites.insert(name.into(), draws);
    }

    pub fn get(&self, name: &str) -> Option<&Draws> {
        self.sites.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sites.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.sites.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Draws)> + '_ {
        self.sites.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Every site with its chains merged
    pub fn flatten_chains(&self) -> Samples {
        Samples {
            sites: self
                .sites
                .iter()
                .map(|(k, v)| (k.clone(), v.flatten_chains()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_chain_draws() -> Draws {
        // chain 0: [0, 1], [2, 3]; chain 1: [4, 5], [6, 7]
        Draws::new(2, 2, 2, (0..8).map(f64::from).collect()).unwrap()
    }

    #[test]
    fn new_checks_shape() {
        assert!(Draws::new(2, 3, 1, vec![0.0; 5]).is_err());
        assert!(Draws::new(2, 3, 1, vec![0.0; 6]).is_ok());
    }

    #[test]
    fn get_indexes_chain_then_draw() {
        let draws = two_chain_draws();
        assert_eq!(draws.get(0, 1).unwrap(), &[2.0, 3.0]);
        assert_eq!(draws.get(1, 0).unwrap(), &[4.0, 5.0]);
        assert!(draws.get(2, 0).is_none());
        assert!(draws.get(0, 2).is_none());
    }

    #[test]
    fn component_concatenates_chains() {
        let draws = two_chain_draws();
        assert_eq!(draws.component(1), vec![1.0, 3.0, 5.0, 7.0]);
        assert_eq!(
            draws.component_by_chain(0),
            vec![vec![0.0, 2.0], vec![4.0, 6.0]]
        );
    }

    #[test]
    fn flatten_keeps_all_draws() {
        let flat = two_chain_draws().flatten_chains();
        assert_eq!(flat.shape(), (1, 4, 2));
        assert_eq!(flat.flat(3).unwrap(), &[6.0, 7.0]);
    }

    #[test]
    fn from_chains_stacks() {
        let chains = vec![
            vec![vec![1.0], vec![2.0], vec![3.0]],
            vec![vec![4.0], vec![5.0], vec![6.0]],
        ];
        let draws = Draws::from_chains(&chains, 1).unwrap();
        assert_eq!(draws.shape(), (2, 3, 1));
        assert_eq!(draws.n_total(), 6);
        assert_eq!(draws.component(0), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn from_chains_rejects_ragged() {
        let chains = vec![vec![vec![1.0], vec![2.0]], vec![vec![4.0]]];
        assert!(Draws::from_chains(&chains, 1).is_err());
    }

    #[test]
    fn samples_by_name() {
        let mut samples = Samples::new();
        samples.insert("beta", two_chain_draws());
        assert!(samples.contains("beta"));
        assert!(samples.get("sigma").is_none());
        assert_eq!(samples.names().collect::<Vec<_>>(), vec!["beta"]);
        let flat = samples.flatten_chains();
        assert_eq!(flat.get("beta").unwrap().n_chains(), 1);
    }
}

//! No-U-Turn Sampler with multinomial trajectory sampling
use log::debug;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use super::adapt::{find_reasonable_step_size, WindowedAdaptation};
use super::hmc::{HmcState, Leapfrog};
use super::{ChainStats, LogDensity, SamplerError};
use crate::misc::logsumexp;

/// Energy error beyond which a trajectory is declared divergent
const DIVERGENCE_THRESHOLD: f64 = 1000.0;

/// Number of random starting points tried before giving up
const MAX_INIT_ATTEMPTS: usize = 100;

/// NUTS kernel settings
///
/// # Example
///
/// ```
/// use yieldreg::mcmc::Nuts;
///
/// let nuts = Nuts::default();
/// assert_eq!(nuts.max_tree_depth, 10);
/// assert_eq!(nuts.target_accept, 0.8);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Nuts {
    /// Maximum number of trajectory doublings
    pub max_tree_depth: usize,
    /// Acceptance probability the step size is tuned toward
    pub target_accept: f64,
    /// Initial unconstrained values are drawn from `U(-r, r)`
    pub init_radius: f64,
}

impl Default for Nuts {
    fn default() -> Self {
        Nuts {
            max_tree_depth: 10,
            target_accept: 0.8,
            init_radius: 2.0,
        }
    }
}

impl Nuts {
    /// Check that the settings describe a usable kernel
    ///
    /// ```
    /// use yieldreg::mcmc::Nuts;
    ///
    /// assert!(Nuts::default().validate().is_ok());
    /// let greedy = Nuts { target_accept: 1.5, ..Nuts::default() };
    /// assert!(greedy.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), SamplerError> {
        let invalid = |setting: &'static str, value: f64| {
            Err(SamplerError::InvalidKernel { setting, value })
        };
        if self.max_tree_depth == 0 {
            return invalid("max_tree_depth", 0.0);
        }
        if !(self.target_accept > 0.0 && self.target_accept < 1.0) {
            return invalid("target_accept", self.target_accept);
        }
        if !(self.init_radius.is_finite() && self.init_radius >= 0.0) {
            return invalid("init_radius", self.init_radius);
        }
        Ok(())
    }
}

/// One retained draw in unconstrained space with its diagnostics
pub(crate) struct Transition {
    pub q: Vec<f64>,
    pub potential: f64,
    pub grad_potential: Vec<f64>,
    pub depth: usize,
    pub divergent: bool,
    pub accept_prob: f64,
    pub n_leapfrog: usize,
}

/// Draws of one chain in unconstrained space
pub(crate) struct ChainOutput {
    pub draws: Vec<Vec<f64>>,
    pub stats: ChainStats,
}

struct Tree {
    left: HmcState,
    right: HmcState,
    proposal: HmcState,
    ln_sum_weight: f64,
    n_leapfrog: usize,
    sum_accept_prob: f64,
    divergent: bool,
    turning: bool,
}

impl Tree {
    fn leaf(state: HmcState, ln_weight: f64, accept_prob: f64) -> Self {
        Tree {
            left: state.clone(),
            right: state.clone(),
            proposal: state,
            ln_sum_weight: ln_weight,
            n_leapfrog: 1,
            sum_accept_prob: accept_prob,
            divergent: false,
            turning: false,
        }
    }

    fn edge(&self, direction: i32) -> &HmcState {
        if direction > 0 {
            &self.right
        } else {
            &self.left
        }
    }

    /// The trajectory doubles back on itself
    fn is_turning(&self, inv_mass: &[f64]) -> bool {
        let (dot_left, dot_right) = self
            .right
            .q
            .iter()
            .zip(&self.left.q)
            .zip(self.left.p.iter().zip(&self.right.p))
            .zip(inv_mass)
            .fold((0.0, 0.0), |(l, r), (((qr, ql), (pl, pr)), m)| {
                let dq = qr - ql;
                (l + dq * pl * m, r + dq * pr * m)
            });
        dot_left < 0.0 || dot_right < 0.0
    }
}

#[inline]
fn ln_sum_exp(a: f64, b: f64) -> f64 {
    logsumexp(&[a, b])
}

impl Nuts {
    /// Take one leapfrog step from `state`
    fn build_leaf<D: LogDensity + ?Sized>(
        lf: &Leapfrog<'_, D>,
        state: &HmcState,
        direction: i32,
        h0: f64,
    ) -> Tree {
        let mut next = state.clone();
        lf.step_dir(&mut next, direction);
        let energy_error = next.hamiltonian(lf.inv_mass()) - h0;

        let (ln_weight, accept_prob, divergent) = if energy_error.is_nan() {
            (f64::NEG_INFINITY, 0.0, true)
        } else {
            (
                -energy_error,
                (-energy_error).exp().min(1.0),
                energy_error > DIVERGENCE_THRESHOLD,
            )
        };
        let mut tree = Tree::leaf(next, ln_weight, accept_prob);
        tree.divergent = divergent;
        tree
    }

    /// Build a subtree of `2^depth` leapfrog steps from `state`
    fn build_tree<D, R>(
        lf: &Leapfrog<'_, D>,
        state: &HmcState,
        depth: usize,
        direction: i32,
        h0: f64,
        rng: &mut R,
    ) -> Tree
    where
        D: LogDensity + ?Sized,
        R: Rng,
    {
        if depth == 0 {
            return Self::build_leaf(lf, state, direction, h0);
        }

        let mut inner = Self::build_tree(lf, state, depth - 1, direction, h0, rng);
        if inner.divergent || inner.turning {
            return inner;
        }

        let outer = Self::build_tree(
            lf,
            inner.edge(direction),
            depth - 1,
            direction,
            h0,
            rng,
        );

        let ln_sum_weight = ln_sum_exp(inner.ln_sum_weight, outer.ln_sum_weight);
        let accept_outer = (outer.ln_sum_weight - ln_sum_weight).exp();
        let u: f64 = rng.random();
        if u < accept_outer {
            inner.proposal = outer.proposal;
        }

        inner.ln_sum_weight = ln_sum_weight;
        inner.n_leapfrog += outer.n_leapfrog;
        inner.sum_accept_prob += outer.sum_accept_prob;
        inner.divergent |= outer.divergent;
        inner.turning |= outer.turning;
        if direction > 0 {
            inner.right = outer.right;
        } else {
            inner.left = outer.left;
        }
        inner.turning |= inner.is_turning(lf.inv_mass());
        inner
    }

    /// One NUTS transition from `current`
    pub(crate) fn transition<D, R>(
        &self,
        lf: &Leapfrog<'_, D>,
        current: &HmcState,
        rng: &mut R,
    ) -> Transition
    where
        D: LogDensity + ?Sized,
        R: Rng,
    {
        let mut start = current.clone();
        start.p = lf
            .inv_mass()
            .iter()
            .map(|m| {
                let z: f64 = StandardNormal.sample(rng);
                z / m.sqrt()
            })
            .collect();
        let h0 = start.hamiltonian(lf.inv_mass());

        let mut tree = Tree::leaf(start, 0.0, 0.0);
        tree.n_leapfrog = 0;
        let mut depth = 0;

        while depth < self.max_tree_depth {
            let direction = if rng.random::<bool>() { 1 } else { -1 };
            let subtree = Self::build_tree(
                lf,
                tree.edge(direction),
                depth,
                direction,
                h0,
                rng,
            );

            tree.n_leapfrog += subtree.n_leapfrog;
            tree.sum_accept_prob += subtree.sum_accept_prob;
            tree.divergent |= subtree.divergent;
            if subtree.divergent || subtree.turning {
                // the partial subtree is discarded
                depth += 1;
                break;
            }

            // biased progressive sampling favours the newer subtree
            let accept_subtree =
                (subtree.ln_sum_weight - tree.ln_sum_weight).exp().min(1.0);
            let u: f64 = rng.random();
            if u < accept_subtree {
                tree.proposal = subtree.proposal;
            }
            tree.ln_sum_weight =
                ln_sum_exp(tree.ln_sum_weight, subtree.ln_sum_weight);
            if direction > 0 {
                tree.right = subtree.right;
            } else {
                tree.left = subtree.left;
            }

            depth += 1;
            if tree.is_turning(lf.inv_mass()) {
                break;
            }
        }

        let accept_prob = tree.sum_accept_prob / tree.n_leapfrog.max(1) as f64;
        Transition {
            q: tree.proposal.q,
            potential: tree.proposal.potential,
            grad_potential: tree.proposal.grad_potential,
            depth,
            divergent: tree.divergent,
            accept_prob,
            n_leapfrog: tree.n_leapfrog,
        }
    }

    /// Draw a starting point with finite density from `U(-r, r)`
    fn init_position<D, R>(
        &self,
        target: &D,
        rng: &mut R,
    ) -> Result<Vec<f64>, SamplerError>
    where
        D: LogDensity + ?Sized,
        R: Rng,
    {
        let r = self.init_radius;
        for _ in 0..MAX_INIT_ATTEMPTS {
            let z: Vec<f64> =
                (0..target.dim()).map(|_| rng.random_range(-r..=r)).collect();
            let (lp, grad) = target.ln_density_grad(&z);
            if lp.is_finite() && grad.iter().all(|g| g.is_finite()) {
                return Ok(z);
            }
        }
        Err(SamplerError::InitializationFailed {
            attempts: MAX_INIT_ATTEMPTS,
        })
    }

    /// Run warmup then draw `n_samples` states of one chain
    pub(crate) fn sample_chain<D, R>(
        &self,
        target: &D,
        n_warmup: usize,
        n_samples: usize,
        rng: &mut R,
    ) -> Result<ChainOutput, SamplerError>
    where
        D: LogDensity + ?Sized,
        R: Rng,
    {
        let dim = target.dim();
        let z0 = self.init_position(target, rng)?;

        let inv_mass = vec![1.0; dim];
        let eps = find_reasonable_step_size(target, &z0, &inv_mass, 1.0, rng);
        let mut adaptation =
            WindowedAdaptation::new(dim, n_warmup, self.target_accept, eps);

        let mut state = Leapfrog::new(target, eps, inv_mass).init_state(z0);
        let mut warmup_divergences = 0;

        for i in 0..n_warmup {
            let lf = Leapfrog::new(
                target,
                adaptation.step_size(),
                adaptation.inv_mass_diag().to_vec(),
            );
            let t = self.transition(&lf, &state, rng);
            warmup_divergences += usize::from(t.divergent);
            state.q = t.q;
            state.potential = t.potential;
            state.grad_potential = t.grad_potential;

            if adaptation.update(i, &state.q, t.accept_prob) {
                let eps = find_reasonable_step_size(
                    target,
                    &state.q,
                    adaptation.inv_mass_diag(),
                    adaptation.step_size(),
                    rng,
                );
                adaptation.restart_step_size(eps);
                debug!(
                    "mass matrix updated at warmup iteration {}: {:?}",
                    i + 1,
                    adaptation.inv_mass_diag()
                );
            }
        }

        let step_size = adaptation.adapted_step_size();
        let inv_mass = adaptation.inv_mass_diag().to_vec();
        debug!(
            "warmup done: step size {step_size:.4e}, {warmup_divergences} \
             divergences"
        );
        let lf = Leapfrog::new(target, step_size, inv_mass);

        let mut draws = Vec::with_capacity(n_samples);
        let mut divergences = 0;
        let mut sum_accept = 0.0;
        let mut sum_depth = 0;
        let mut n_leapfrog = 0;

        for _ in 0..n_samples {
            let t = self.transition(&lf, &state, rng);
            divergences += usize::from(t.divergent);
            sum_accept += t.accept_prob;
            sum_depth += t.depth;
            n_leapfrog += t.n_leapfrog;
            state.q = t.q;
            state.potential = t.potential;
            state.grad_potential = t.grad_potential;
            draws.push(state.q.clone());
        }

        let n = n_samples.max(1) as f64;
        let stats = ChainStats {
            step_size: lf.step_size(),
            inv_mass: lf.inv_mass().to_vec(),
            divergences,
            mean_accept_prob: sum_accept / n,
            mean_tree_depth: sum_depth as f64 / n,
            n_leapfrog,
        };
        Ok(ChainOutput { draws, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{mean, std};
    use crate::mcmc::hmc::tests::DiagGaussian;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn ln_sum_exp_handles_infinities() {
        assert_eq!(
            ln_sum_exp(f64::NEG_INFINITY, f64::NEG_INFINITY),
            f64::NEG_INFINITY
        );
        assert::close(ln_sum_exp(0.0, f64::NEG_INFINITY), 0.0, 1E-14);
        assert::close(ln_sum_exp(0.0, 0.0), 2.0_f64.ln(), 1E-14);
    }

    #[test]
    fn transition_respects_max_depth() {
        let target = DiagGaussian(vec![1.0, 1.0]);
        let nuts = Nuts {
            max_tree_depth: 3,
            ..Nuts::default()
        };
        // tiny steps never turn within 2^3 leapfrog steps
        let lf = Leapfrog::new(&target, 1E-4, vec![1.0, 1.0]);
        let state = lf.init_state(vec![0.3, -0.2]);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let t = nuts.transition(&lf, &state, &mut rng);
        assert_eq!(t.depth, 3);
        assert_eq!(t.n_leapfrog, 7);
        assert!(!t.divergent);
    }

    #[test]
    fn huge_steps_diverge() {
        let target = DiagGaussian(vec![0.01]);
        let lf = Leapfrog::new(&target, 100.0, vec![1.0]);
        let state = lf.init_state(vec![0.001]);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);
        let t = Nuts::default().transition(&lf, &state, &mut rng);
        assert!(t.divergent);
        assert_eq!(t.q, state.q);
    }

    #[test]
    fn samples_a_scaled_gaussian() {
        let target = DiagGaussian(vec![1.0, 10.0]);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let out = Nuts::default()
            .sample_chain(&target, 500, 1000, &mut rng)
            .unwrap();
        assert_eq!(out.draws.len(), 1000);

        let x0: Vec<f64> = out.draws.iter().map(|d| d[0]).collect();
        let x1: Vec<f64> = out.draws.iter().map(|d| d[1]).collect();
        assert!(mean(&x0).abs() < 0.2);
        assert!((std(&x0) - 1.0).abs() < 0.2);
        assert!(mean(&x1).abs() < 2.0);
        assert!((std(&x1) - 10.0).abs() < 2.0);
        // the adapted mass matrix picks up the scales
        assert!(out.stats.inv_mass[1] > 10.0 * out.stats.inv_mass[0]);
        assert!(out.stats.mean_accept_prob > 0.6);
    }

    #[test]
    fn same_seed_same_chain() {
        let target = DiagGaussian(vec![1.0]);
        let run = |seed| {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
            Nuts::default()
                .sample_chain(&target, 100, 50, &mut rng)
                .unwrap()
                .draws
        };
        assert_eq!(run(7), run(7));
        assert_ne!(run(7), run(8));
    }

    #[test]
    fn no_finite_start_is_an_error() {
        struct Nowhere;
        impl LogDensity for Nowhere {
            fn dim(&self) -> usize {
                1
            }
            fn ln_density_grad(&self, _z: &[f64]) -> (f64, Vec<f64>) {
                (f64::NEG_INFINITY, vec![0.0])
            }
        }
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let res = Nuts::default().sample_chain(&Nowhere, 10, 10, &mut rng);
        assert!(matches!(
            res,
            Err(SamplerError::InitializationFailed { attempts: 100 })
        ));
    }
}

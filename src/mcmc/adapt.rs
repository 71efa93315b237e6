//! Warmup adaptation of the step size and the diagonal mass matrix
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use super::hmc::Leapfrog;
use super::LogDensity;

/// Nesterov dual averaging of `ln(step_size)` toward a target acceptance
/// probability
#[derive(Clone, Debug)]
pub(crate) struct DualAveraging {
    target: f64,
    mu: f64,
    ln_eps: f64,
    ln_eps_bar: f64,
    h_bar: f64,
    t: f64,
}

impl DualAveraging {
    const GAMMA: f64 = 0.05;
    const T0: f64 = 10.0;
    const KAPPA: f64 = 0.75;

    pub fn new(step_size: f64, target: f64) -> Self {
        let mut da = DualAveraging {
            target,
            mu: 0.0,
            ln_eps: 0.0,
            ln_eps_bar: 0.0,
            h_bar: 0.0,
            t: 0.0,
        };
        da.restart(step_size);
        da
    }

    /// Restart averaging around a new initial step size
    pub fn restart(&mut self, step_size: f64) {
        self.mu = (10.0 * step_size).ln();
        self.ln_eps = step_size.ln();
        self.ln_eps_bar = 0.0;
        self.h_bar = 0.0;
        self.t = 0.0;
    }

    pub fn update(&mut self, accept_prob: f64) {
        let accept_prob = if accept_prob.is_nan() { 0.0 } else { accept_prob };
        self.t += 1.0;
        let eta = 1.0 / (self.t + Self::T0);
        self.h_bar = (1.0 - eta)
            .mul_add(self.h_bar, eta * (self.target - accept_prob));
        self.ln_eps = self.mu - self.t.sqrt() / Self::GAMMA * self.h_bar;
        let w = self.t.powf(-Self::KAPPA);
        self.ln_eps_bar = w.mul_add(self.ln_eps, (1.0 - w) * self.ln_eps_bar);
    }

    /// Step size to use for the next iteration
    pub fn step_size(&self) -> f64 {
        self.ln_eps.exp()
    }

    /// Averaged step size to use after warmup
    pub fn final_step_size(&self) -> f64 {
        if self.t > 0.0 {
            self.ln_eps_bar.exp()
        } else {
            self.step_size()
        }
    }
}

/// Running mean and variance
#[derive(Clone, Debug)]
pub(crate) struct Welford {
    n: usize,
    mean: Vec<f64>,
    m2: Vec<f64>,
}

impl Welford {
    pub fn new(dim: usize) -> Self {
        Welford {
            n: 0,
            mean: vec![0.0; dim],
            m2: vec![0.0; dim],
        }
    }

    pub fn observe(&mut self, x: &[f64]) {
        self.n += 1;
        let n = self.n as f64;
        self.mean
            .iter_mut()
            .zip(self.m2.iter_mut())
            .zip(x)
            .for_each(|((mean, m2), &xi)| {
                let delta = xi - *mean;
                *mean += delta / n;
                *m2 += delta * (xi - *mean);
            });
    }

    /// Sample variance shrunk toward `1e-3`
    pub fn regularized_variance(&self) -> Vec<f64> {
        let n = self.n as f64;
        self.m2
            .iter()
            .map(|m2| {
                let var = if self.n > 1 { m2 / (n - 1.0) } else { 1.0 };
                (n / (n + 5.0)) * var + 1E-3 * (5.0 / (n + 5.0))
            })
            .collect()
    }

    pub fn reset(&mut self) {
        let dim = self.mean.len();
        *self = Welford::new(dim);
    }
}

/// Warmup schedule with a fast initial buffer, doubling slow windows that
/// estimate the mass matrix, and a fast terminal buffer
#[derive(Clone, Debug)]
pub(crate) struct WindowedAdaptation {
    n_warmup: usize,
    init_buffer: usize,
    term_buffer: usize,
    window_size: usize,
    window_end: usize,
    step_size: DualAveraging,
    variance: Welford,
    inv_mass: Vec<f64>,
}

impl WindowedAdaptation {
    const INIT_BUFFER: usize = 75;
    const TERM_BUFFER: usize = 50;
    const BASE_WINDOW: usize = 25;

    pub fn new(
        dim: usize,
        n_warmup: usize,
        target_accept: f64,
        init_step_size: f64,
    ) -> Self {
        let (init_buffer, term_buffer, window_size) = if Self::INIT_BUFFER
            + Self::TERM_BUFFER
            + Self::BASE_WINDOW
            > n_warmup
        {
            // short warmup: 15% / 75% / 10%
            let init = (0.15 * n_warmup as f64) as usize;
            let term = (0.1 * n_warmup as f64) as usize;
            (init, term, n_warmup.saturating_sub(init + term))
        } else {
            (Self::INIT_BUFFER, Self::TERM_BUFFER, Self::BASE_WINDOW)
        };

        let mut adapt = WindowedAdaptation {
            n_warmup,
            init_buffer,
            term_buffer,
            window_size,
            window_end: 0,
            step_size: DualAveraging::new(init_step_size, target_accept),
            variance: Welford::new(dim),
            inv_mass: vec![1.0; dim],
        };
        adapt.window_end = adapt.clamp_window_end(init_buffer + window_size);
        adapt
    }

    /// The last slow window is stretched to reach the terminal buffer
    fn clamp_window_end(&self, end: usize) -> usize {
        let slow_end = self.n_warmup.saturating_sub(self.term_buffer);
        let next_end = end + 2 * self.window_size;
        if next_end > slow_end {
            slow_end
        } else {
            end
        }
    }

    pub fn step_size(&self) -> f64 {
        self.step_size.step_size()
    }

    pub fn adapted_step_size(&self) -> f64 {
        self.step_size.final_step_size()
    }

    pub fn inv_mass_diag(&self) -> &[f64] {
        &self.inv_mass
    }

    /// Restart step-size averaging, e.g. after the mass matrix changed
    pub fn restart_step_size(&mut self, step_size: f64) {
        self.step_size.restart(step_size);
    }

    /// Record iteration `i` of warmup. Returns `true` when a slow window
    /// closed and the mass matrix was updated.
    pub fn update(&mut self, i: usize, q: &[f64], accept_prob: f64) -> bool {
        self.step_size.update(accept_prob);

        let slow_end = self.n_warmup.saturating_sub(self.term_buffer);
        if i < self.init_buffer || i >= slow_end || self.window_size == 0 {
            return false;
        }

        self.variance.observe(q);
        if i + 1 == self.window_end {
            self.inv_mass = self.variance.regularized_variance();
            self.variance.reset();
            self.window_size *= 2;
            self.window_end =
                self.clamp_window_end(self.window_end + self.window_size);
            true
        } else {
            false
        }
    }
}

/// Double or halve the step size until one leapfrog step from `q` has an
/// acceptance probability near 0.8
pub(crate) fn find_reasonable_step_size<D, R>(
    target: &D,
    q: &[f64],
    inv_mass: &[f64],
    init: f64,
    rng: &mut R,
) -> f64
where
    D: LogDensity + ?Sized,
    R: Rng,
{
    const MAX_ITERS: usize = 100;
    let ln_target = 0.8_f64.ln();

    let mut step_size = init;
    let lf = Leapfrog::new(target, step_size, inv_mass.to_vec());
    let mut state = lf.init_state(q.to_vec());
    if !state.potential.is_finite() {
        return step_size;
    }
    state.p = inv_mass
        .iter()
        .map(|m| {
            let z: f64 = StandardNormal.sample(rng);
            z / m.sqrt()
        })
        .collect();
    let h0 = state.hamiltonian(inv_mass);

    let delta_h = |eps: f64| {
        let lf = Leapfrog::new(target, eps, inv_mass.to_vec());
        let mut s = state.clone();
        lf.step_dir(&mut s, 1);
        let dh = h0 - s.hamiltonian(inv_mass);
        if dh.is_nan() {
            f64::NEG_INFINITY
        } else {
            dh
        }
    };

    let direction = if delta_h(step_size) > ln_target {
        1.0
    } else {
        -1.0
    };
    for _ in 0..MAX_ITERS {
        let next = step_size * 2.0_f64.powf(direction);
        let dh = delta_h(next);
        if (direction > 0.0 && dh <= ln_target)
            || (direction < 0.0 && dh >= ln_target)
        {
            // keep the last step size on the good side of the boundary
            if direction < 0.0 {
                step_size = next;
            }
            break;
        }
        step_size = next;
        if !(1E-10..=1E7).contains(&step_size) {
            break;
        }
    }
    step_size.clamp(1E-10, 1E7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcmc::hmc::tests::DiagGaussian;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn dual_averaging_shrinks_step_on_rejection() {
        let mut da = DualAveraging::new(1.0, 0.8);
        for _ in 0..20 {
            da.update(0.1);
        }
        assert!(da.step_size() < 1.0);

        let mut da = DualAveraging::new(1.0, 0.8);
        for _ in 0..20 {
            da.update(1.0);
        }
        assert!(da.step_size() > 1.0);
    }

    #[test]
    fn dual_averaging_treats_nan_as_rejection() {
        let mut a = DualAveraging::new(0.5, 0.8);
        let mut b = DualAveraging::new(0.5, 0.8);
        a.update(f64::NAN);
        b.update(0.0);
        assert::close(a.step_size(), b.step_size(), 1E-14);
    }

    #[test]
    fn welford_matches_two_pass_variance() {
        let xs = [1.0, 4.0, 2.0, 8.0, 5.0, 7.0];
        let mut w = Welford::new(1);
        xs.iter().for_each(|x| w.observe(&[*x]));
        assert_eq!(w.n, 6);

        let var = crate::diagnostics::var_ddof(&xs, 1);
        let n = 6.0;
        let expected = (n / (n + 5.0)) * var + 1E-3 * (5.0 / (n + 5.0));
        assert::close(w.regularized_variance()[0], expected, 1E-12);
    }

    #[test]
    fn standard_windows_for_long_warmup() {
        let adapt = WindowedAdaptation::new(2, 1000, 0.8, 0.1);
        assert_eq!(adapt.init_buffer, 75);
        assert_eq!(adapt.term_buffer, 50);
        assert_eq!(adapt.window_end, 100);
    }

    #[test]
    fn short_warmup_uses_fractional_buffers() {
        let adapt = WindowedAdaptation::new(2, 100, 0.8, 0.1);
        assert_eq!(adapt.init_buffer, 15);
        assert_eq!(adapt.term_buffer, 10);
        // a single slow window fills the middle
        assert_eq!(adapt.window_end, 90);
    }

    #[test]
    fn mass_matrix_updates_at_window_ends() {
        let n_warmup = 1000;
        let mut adapt = WindowedAdaptation::new(1, n_warmup, 0.8, 0.1);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let mut ends = Vec::new();
        for i in 0..n_warmup {
            let x: f64 = StandardNormal.sample(&mut rng);
            if adapt.update(i, &[3.0 * x], 0.8) {
                ends.push(i + 1);
            }
        }
        // windows of 25, 50, 100, 200 and a stretched last window
        assert_eq!(ends, vec![100, 150, 250, 450, 950]);
        let inv_mass = adapt.inv_mass_diag()[0];
        assert!(inv_mass > 6.0 && inv_mass < 12.0, "inv_mass = {inv_mass}");
    }

    #[test]
    fn reasonable_step_size_scales_with_target() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let narrow = DiagGaussian(vec![0.01]);
        let wide = DiagGaussian(vec![100.0]);
        let eps_narrow =
            find_reasonable_step_size(&narrow, &[0.0], &[1.0], 1.0, &mut rng);
        let eps_wide =
            find_reasonable_step_size(&wide, &[0.0], &[1.0], 1.0, &mut rng);
        assert!(eps_narrow < 0.1, "eps = {eps_narrow}");
        assert!(eps_wide > 10.0, "eps = {eps_wide}");
    }
}

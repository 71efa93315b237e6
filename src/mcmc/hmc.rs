//! Hamiltonian dynamics in unconstrained space
use super::LogDensity;

/// Position, momentum and the potential `U(q) = -ln p(q)` at the position
#[derive(Clone, Debug)]
pub(crate) struct HmcState {
    pub q: Vec<f64>,
    pub p: Vec<f64>,
    pub potential: f64,
    pub grad_potential: Vec<f64>,
}

impl HmcState {
    /// Kinetic energy under a diagonal mass matrix with inverse `inv_mass`
    pub fn kinetic(&self, inv_mass: &[f64]) -> f64 {
        0.5 * self
            .p
            .iter()
            .zip(inv_mass)
            .map(|(p, m)| p * p * m)
            .sum::<f64>()
    }

    pub fn hamiltonian(&self, inv_mass: &[f64]) -> f64 {
        self.potential + self.kinetic(inv_mass)
    }
}

/// Leapfrog integrator with a fixed step size and diagonal mass matrix
pub(crate) struct Leapfrog<'a, D: ?Sized> {
    target: &'a D,
    step_size: f64,
    inv_mass: Vec<f64>,
}

impl<'a, D: LogDensity + ?Sized> Leapfrog<'a, D> {
    pub fn new(target: &'a D, step_size: f64, inv_mass: Vec<f64>) -> Self {
        Leapfrog {
            target,
            step_size,
            inv_mass,
        }
    }

    #[inline]
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    #[inline]
    pub fn inv_mass(&self) -> &[f64] {
        &self.inv_mass
    }

    /// Potential and its gradient at `q`. Points outside the support get an
    /// infinite potential and a zero gradient.
    pub fn potential(&self, q: &[f64]) -> (f64, Vec<f64>) {
        let (lp, grad) = self.target.ln_density_grad(q);
        if lp.is_finite() && grad.iter().all(|g| g.is_finite()) {
            (-lp, grad.iter().map(|g| -g).collect())
        } else {
            (f64::INFINITY, vec![0.0; q.len()])
        }
    }

    /// State at `q` with zero momentum
    pub fn init_state(&self, q: Vec<f64>) -> HmcState {
        let (potential, grad_potential) = self.potential(&q);
        HmcState {
            p: vec![0.0; q.len()],
            q,
            potential,
            grad_potential,
        }
    }

    /// One leapfrog step forward (`direction > 0`) or backward in time
    pub fn step_dir(&self, state: &mut HmcState, direction: i32) {
        let eps = f64::from(direction.signum()) * self.step_size;
        state
            .p
            .iter_mut()
            .zip(&state.grad_potential)
            .for_each(|(p, g)| *p -= 0.5 * eps * g);
        state
            .q
            .iter_mut()
            .zip(state.p.iter().zip(&self.inv_mass))
            .for_each(|(q, (p, m))| *q += eps * m * p);

        let (potential, grad) = self.potential(&state.q);
        state.potential = potential;
        state.grad_potential = grad;
        state
            .p
            .iter_mut()
            .zip(&state.grad_potential)
            .for_each(|(p, g)| *p -= 0.5 * eps * g);
    }
}

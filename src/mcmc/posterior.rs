use crate::model::{Model, Params};

/// A differentiable log density over an unconstrained space
pub trait LogDensity: Sync {
    /// Dimension of the unconstrained space
    fn dim(&self) -> usize;

    /// `ln p(z)` and its gradient at `z`
    fn ln_density_grad(&self, z: &[f64]) -> (f64, Vec<f64>);
}

/// A model conditioned on an observed response, seen in unconstrained
/// coordinates `z = [beta.., ln(sigma)]`
///
/// The density includes the log-Jacobian of `sigma = exp(z_sigma)`.
///
/// # Example
///
/// ```
/// use yieldreg::mcmc::{LogDensity, Posterior};
/// use yieldreg::model::LinearModel;
///
/// let model = LinearModel::standard(vec![-1.0, 0.0, 1.0]).unwrap();
/// let y = vec![-0.9, 0.1, 1.2];
/// let posterior = Posterior::new(&model, &y).unwrap();
///
/// assert_eq!(posterior.dim(), 2);
/// let (lp, grad) = posterior.ln_density_grad(&[0.5, 0.0]);
/// assert!(lp.is_finite());
/// assert_eq!(grad.len(), 2);
/// ```
pub struct Posterior<'a, M> {
    model: &'a M,
    observed: &'a [f64],
}

impl<'a, M: Model> Posterior<'a, M> {
    /// Condition `model` on `observed`
    pub fn new(
        model: &'a M,
        observed: &'a [f64],
    ) -> Result<Self, crate::model::ModelError> {
        model.validate_observed(observed)?;
        Ok(Posterior { model, observed })
    }

    pub fn model(&self) -> &M {
        self.model
    }

    /// Map an unconstrained point to model parameters
    pub fn to_params(&self, z: &[f64]) -> Params {
        Params::from_unconstrained(z)
    }
}

impl<'a, M: Model> LogDensity for Posterior<'a, M> {
    fn dim(&self) -> usize {
        self.model.dim()
    }

    fn ln_density_grad(&self, z: &[f64]) -> (f64, Vec<f64>) {
        let params = Params::from_unconstrained(z);
        let (ln_joint, grad) = self.model.ln_joint_grad(&params, self.observed);
        let ln_jac = z.last().copied().unwrap_or(0.0);

        let mut dz = grad.beta;
        dz.push(grad.sigma.mul_add(params.sigma, 1.0));
        (ln_joint + ln_jac, dz)
    }
}

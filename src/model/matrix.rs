use nalgebra::{DMatrix, DVector};
use rand::Rng;

use super::linear::gaussian_likelihood_grad;
use super::{Model, ModelError};
use crate::dist::{Exponential, Gaussian};
use crate::traits::Sampleable;

/// Regression on a design matrix
///
/// ```text
/// beta_j ~ Normal(0, 1)    for each column j of X
/// sigma  ~ Exponential(4)
/// Y      ~ Normal(X beta, sigma)
/// ```
///
/// # Example
///
/// ```
/// use yieldreg::model::{MatrixModel, Model};
///
/// let model = MatrixModel::from_rows(&[
///     vec![1.0, -0.5],
///     vec![1.0, 0.25],
///     vec![1.0, 1.0],
/// ]).unwrap();
///
/// assert_eq!(model.n_coefs(), 2);
/// assert_eq!(model.linear_predictor(&[0.5, 2.0]), vec![-0.5, 1.0, 2.5]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct MatrixModel {
    x: DMatrix<f64>,
    beta_prior: Gaussian,
    sigma_prior: Exponential,
}

impl MatrixModel {
    /// Rate of the exponential prior on `sigma`
    pub const SIGMA_RATE: f64 = 4.0;

    /// Build from an `n x k` design matrix
    pub fn new(x: DMatrix<f64>) -> Result<Self, ModelError> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(ModelError::EmptyData);
        }
        if let Some(ix) = x.iter().position(|v| !v.is_finite()) {
            // nalgebra stores column-major
            return Err(ModelError::NonFiniteCovariate {
                index: ix % x.nrows(),
            });
        }
        let sigma_prior = Exponential::new(Self::SIGMA_RATE)
            .map_err(ModelError::SigmaPrior)?;
        Ok(MatrixModel {
            x,
            beta_prior: Gaussian::standard(),
            sigma_prior,
        })
    }

    /// Build from rows of explanatory values. All rows must have the same
    /// length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, ModelError> {
        let ncols = rows.first().map_or(0, Vec::len);
        if let Some((row, r)) =
            rows.iter().enumerate().find(|(_, r)| r.len() != ncols)
        {
            return Err(ModelError::RaggedDesign {
                row,
                expected: ncols,
                got: r.len(),
            });
        }
        let x = DMatrix::from_row_iterator(
            rows.len(),
            ncols,
            rows.iter().flatten().copied(),
        );
        Self::new(x)
    }

    /// Build from columns of explanatory values
    pub fn from_columns(columns: &[Vec<f64>]) -> Result<Self, ModelError> {
        let nrows = columns.first().map_or(0, Vec::len);
        if let Some((column, c)) =
            columns.iter().enumerate().find(|(_, c)| c.len() != nrows)
        {
            return Err(ModelError::RaggedColumns {
                column,
                expected: nrows,
                got: c.len(),
            });
        }
        let x = DMatrix::from_iterator(
            nrows,
            columns.len(),
            columns.iter().flatten().copied(),
        );
        Self::new(x)
    }

    /// The design matrix
    pub fn design(&self) -> &DMatrix<f64> {
        &self.x
    }
}

impl Model for MatrixModel {
    fn n_coefs(&self) -> usize {
        self.x.ncols()
    }

    fn n_obs(&self) -> usize {
        self.x.nrows()
    }

    fn response_name(&self) -> &'static str {
        "Y"
    }

    fn linear_predictor(&self, beta: &[f64]) -> Vec<f64> {
        let beta = DVector::from_column_slice(beta);
        (&self.x * beta).iter().copied().collect()
    }

    fn beta_prior(&self) -> &Gaussian {
        &self.beta_prior
    }

    fn sigma_prior(&self) -> &Exponential {
        &self.sigma_prior
    }

    fn ln_likelihood_grad(
        &self,
        mu: &[f64],
        sigma: f64,
        y: &[f64],
    ) -> (f64, Vec<f64>, f64) {
        gaussian_likelihood_grad(mu, sigma, y)
    }

    fn draw_likelihood<R: Rng>(
        &self,
        mu: &[f64],
        sigma: f64,
        rng: &mut R,
    ) -> Vec<f64> {
        mu.iter()
            .map(|&m| {
                let y: f64 = Gaussian::new_unchecked(m, sigma).draw(rng);
                y
            })
            .collect()
    }

    fn chain_beta_grad(&self, d_mu: &[f64]) -> Vec<f64> {
        let d_mu = DVector::from_column_slice(d_mu);
        self.x.tr_mul(&d_mu).iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::fd_grad;
    use crate::model::{LinearModel, Params};
    use crate::traits::HasDensity;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn rows() -> Vec<Vec<f64>> {
        vec![
            vec![1.0, -1.2],
            vec![1.0, -0.4],
            vec![1.0, 0.0],
            vec![1.0, 0.5],
            vec![1.0, 1.9],
        ]
    }

    #[test]
    fn rows_and_columns_agree() {
        let a = MatrixModel::from_rows(&rows()).unwrap();
        let b = MatrixModel::from_columns(&[
            vec![1.0; 5],
            vec![-1.2, -0.4, 0.0, 0.5, 1.9],
        ])
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.n_obs(), 5);
        assert_eq!(a.dim(), 3);
        assert_eq!(a.response_name(), "Y");
    }

    #[test]
    fn chain_rule_is_the_transpose_product() {
        let model = MatrixModel::from_rows(&rows()).unwrap();
        let mu = model.linear_predictor(&[0.5, 2.0]);
        approx::assert_relative_eq!(
            DVector::from_vec(mu),
            DVector::from_vec(vec![-1.9, -0.3, 0.5, 1.5, 4.3]),
            epsilon = 1E-12
        );
        let grad = model.chain_beta_grad(&[1.0, 1.0, 1.0, 1.0, 1.0]);
        approx::assert_relative_eq!(grad[0], 5.0, epsilon = 1E-12);
        approx::assert_relative_eq!(grad[1], 0.8, epsilon = 1E-12);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let mut rows = rows();
        rows[3].push(2.0);
        assert_eq!(
            MatrixModel::from_rows(&rows),
            Err(ModelError::RaggedDesign {
                row: 3,
                expected: 2,
                got: 3
            })
        );
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let res = MatrixModel::from_columns(&[vec![1.0; 5], vec![0.0; 4]]);
        assert_eq!(
            res,
            Err(ModelError::RaggedColumns {
                column: 1,
                expected: 5,
                got: 4
            })
        );
    }

    #[test]
    fn empty_and_nan_design_are_rejected() {
        assert_eq!(MatrixModel::from_rows(&[]), Err(ModelError::EmptyData));
        let mut rows = rows();
        rows[2][1] = f64::NAN;
        assert_eq!(
            MatrixModel::from_rows(&rows),
            Err(ModelError::NonFiniteCovariate { index: 2 })
        );
    }

    #[test]
    fn sigma_prior_has_rate_four() {
        let model = MatrixModel::from_rows(&rows()).unwrap();
        assert::close(
            model.sigma_prior().ln_f(&0.5_f64),
            4.0_f64.ln() - 2.0,
            1E-12,
        );
    }

    #[test]
    fn single_column_matches_linear_likelihood() {
        let soil = vec![-1.2, -0.4, 0.0, 0.5, 1.9];
        let matrix = MatrixModel::from_columns(&[soil.clone()]).unwrap();
        let linear = LinearModel::standard(soil).unwrap();
        let params = Params::new(vec![0.4], 0.8);
        let y = vec![-0.3, -0.2, 0.1, 0.3, 0.6];
        assert::close(
            matrix.ln_likelihood(&params, &y),
            linear.ln_likelihood(&params, &y),
            1E-12,
        );
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let model = MatrixModel::from_rows(&rows()).unwrap();
        let params = Params::new(vec![0.1, 0.4], 0.6);
        let y = vec![-0.3, -0.2, 0.1, 0.3, 0.6];

        let (_, grad) = model.ln_joint_grad(&params, &y);
        let fd = fd_grad(&model, &params, &y);
        assert::close(grad.beta[0], fd[0], 1E-5);
        assert::close(grad.beta[1], fd[1], 1E-5);
        assert::close(grad.sigma, fd[2], 1E-5);
    }

    #[test]
    fn prior_draw_has_one_beta_per_column() {
        let model = MatrixModel::from_rows(&rows()).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        let params = model.draw_prior(&mut rng);
        assert_eq!(params.beta.len(), 2);
        assert_eq!(model.draw_response(&params, &mut rng).len(), 5);
    }

    #[test]
    fn ln_joint_is_neg_inf_outside_sigma_support() {
        let model = MatrixModel::from_rows(&rows()).unwrap();
        let y = vec![0.1, -0.3, 0.0, 0.4, 1.2];
        for sigma in [-1.0, 0.0, f64::INFINITY, f64::NAN] {
            let params = Params::new(vec![0.1, 0.2], sigma);
            assert_eq!(model.ln_joint(&params, &y), f64::NEG_INFINITY);
            assert_eq!(model.ln_likelihood(&params, &y), f64::NEG_INFINITY);
        }
        assert!(model.ln_joint(&Params::new(vec![0.1, 0.2], 0.5), &y).is_finite());
    }
}

//! Gaussian/Normal distribution over x in (-∞, ∞)
use rand::Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use special::Error as _;
use std::f64::consts::SQRT_2;
use std::fmt;

use crate::consts::HALF_LN_2PI;
use crate::impl_display;
use crate::traits::{
    Cdf, ContinuousDistr, HasDensity, InverseCdf, Mean, Sampleable, Support,
    Variance,
};

/// Gaussian / [Normal distribution](https://en.wikipedia.org/wiki/Normal_distribution),
/// N(μ, σ) over real values.
///
/// Used as the prior on regression coefficients and as the likelihood of
/// the plain regression models.
///
/// # Examples
///
/// ```
/// use yieldreg::prelude::*;
///
/// let prior = Gaussian::new(0.0, 5.0).unwrap();
/// let (lo, hi): (f64, f64) = prior.interval(0.95);
///
/// assert!((hi + lo).abs() < 1E-12);
/// assert!((hi - 9.799_819_922_700_1).abs() < 1E-8);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[serde(try_from = "GaussianParameters", into = "GaussianParameters")]
pub struct Gaussian {
    /// Mean
    mu: f64,
    /// Standard deviation
    sigma: f64,
    /// Cached log(sigma)
    ln_sigma: f64,
}

impl PartialEq for Gaussian {
    fn eq(&self, other: &Gaussian) -> bool {
        self.mu == other.mu && self.sigma == other.sigma
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GaussianParameters {
    pub mu: f64,
    pub sigma: f64,
}

impl TryFrom<GaussianParameters> for Gaussian {
    type Error = GaussianError;

    fn try_from(params: GaussianParameters) -> Result<Self, Self::Error> {
        Gaussian::new(params.mu, params.sigma)
    }
}

impl From<Gaussian> for GaussianParameters {
    fn from(gauss: Gaussian) -> Self {
        GaussianParameters {
            mu: gauss.mu,
            sigma: gauss.sigma,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GaussianError {
    /// The mu parameter is infinite or NaN
    MuNotFinite { mu: f64 },
    /// The sigma parameter is less than or equal to zero
    SigmaTooLow { sigma: f64 },
    /// The sigma parameter is infinite or NaN
    SigmaNotFinite { sigma: f64 },
}

impl Gaussian {
    /// Create a new Gaussian distribution
    ///
    /// # Arguments
    /// - mu: mean
    /// - sigma: standard deviation
    pub fn new(mu: f64, sigma: f64) -> Result<Self, GaussianError> {
        if !mu.is_finite() {
            Err(GaussianError::MuNotFinite { mu })
        } else if sigma <= 0.0 {
            Err(GaussianError::SigmaTooLow { sigma })
        } else if !sigma.is_finite() {
            Err(GaussianError::SigmaNotFinite { sigma })
        } else {
            Ok(Gaussian {
                mu,
                sigma,
                ln_sigma: sigma.ln(),
            })
        }
    }

    /// Creates a new Gaussian without checking whether the parameters are
    /// valid.
    #[inline]
    #[must_use]
    pub fn new_unchecked(mu: f64, sigma: f64) -> Self {
        Gaussian {
            mu,
            sigma,
            ln_sigma: sigma.ln(),
        }
    }

    /// Standard normal
    ///
    /// # Example
    ///
    /// ```rust
    /// # use yieldreg::dist::Gaussian;
    /// let gauss = Gaussian::standard();
    ///
    /// assert_eq!(gauss, Gaussian::new(0.0, 1.0).unwrap());
    /// ```
    #[inline]
    #[must_use]
    pub fn standard() -> Self {
        Gaussian {
            mu: 0.0,
            sigma: 1.0,
            ln_sigma: 0.0,
        }
    }

    /// Get mu parameter
    #[inline]
    #[must_use]
    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// Get sigma parameter
    #[inline]
    #[must_use]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Derivatives of `ln_f(x)` with respect to `mu` and `sigma`
    ///
    /// The regression models chain these through the linear predictor to get
    /// the gradient the sampler integrates.
    #[inline]
    pub fn ln_f_grad(&self, x: f64) -> (f64, f64) {
        let k = (x - self.mu) / self.sigma;
        let d_mu = k / self.sigma;
        let d_sigma = k.mul_add(k, -1.0) / self.sigma;
        (d_mu, d_sigma)
    }
}

impl Default for Gaussian {
    fn default() -> Self {
        Gaussian::standard()
    }
}

impl From<&Gaussian> for String {
    fn from(gauss: &Gaussian) -> String {
        format!("N(μ: {}, σ: {})", gauss.mu, gauss.sigma)
    }
}

impl_display!(Gaussian);

macro_rules! impl_traits {
    ($kind:ty) => {
        impl HasDensity<$kind> for Gaussian {
            fn ln_f(&self, x: &$kind) -> f64 {
                let k = (f64::from(*x) - self.mu) / self.sigma;
                (0.5 * k).mul_add(-k, -self.ln_sigma) - HALF_LN_2PI
            }
        }

        impl Sampleable<$kind> for Gaussian {
            fn draw<R: Rng>(&self, rng: &mut R) -> $kind {
                let g = Normal::new(self.mu, self.sigma).unwrap();
                rng.sample(g) as $kind
            }

            fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<$kind> {
                let g = Normal::new(self.mu, self.sigma).unwrap();
                (0..n).map(|_| rng.sample(g) as $kind).collect()
            }
        }

        impl ContinuousDistr<$kind> for Gaussian {}

        impl Support<$kind> for Gaussian {
            fn supports(&self, x: &$kind) -> bool {
                x.is_finite()
            }
        }

        impl Cdf<$kind> for Gaussian {
            fn cdf(&self, x: &$kind) -> f64 {
                let errf =
                    ((f64::from(*x) - self.mu) / (self.sigma * SQRT_2)).error();
                0.5 * (1.0 + errf)
            }
        }

        impl InverseCdf<$kind> for Gaussian {
            fn invcdf(&self, p: f64) -> $kind {
                assert!((0.0..=1.0).contains(&p), "P out of range");

                let x = (self.sigma * SQRT_2)
                    .mul_add(2.0_f64.mul_add(p, -1.0).inv_error(), self.mu);
                x as $kind
            }
        }

        impl Mean<$kind> for Gaussian {
            fn mean(&self) -> Option<$kind> {
                Some(self.mu as $kind)
            }
        }
    };
}

impl Variance<f64> for Gaussian {
    fn variance(&self) -> Option<f64> {
        Some(self.sigma * self.sigma)
    }
}

impl_traits!(f32);
impl_traits!(f64);

impl std::error::Error for GaussianError {}

impl fmt::Display for GaussianError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MuNotFinite { mu } => write!(f, "non-finite mu: {mu}"),
            Self::SigmaTooLow { sigma } => {
                write!(f, "sigma ({sigma}) must be greater than zero")
            }
            Self::SigmaNotFinite { sigma } => {
                write!(f, "non-finite sigma: {sigma}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const TOL: f64 = 1E-12;

    use crate::test_basic_impls;
    test_basic_impls!(Gaussian::new(1.2, 0.4).unwrap());

    #[test]
    fn new() {
        let gauss = Gaussian::new(1.2, 3.0).unwrap();
        assert::close(gauss.mu, 1.2, TOL);
        assert::close(gauss.sigma, 3.0, TOL);
    }

    #[test]
    fn new_should_reject_bad_sigma() {
        assert!(Gaussian::new(0.0, 0.0).is_err());
        assert!(Gaussian::new(0.0, -1.0).is_err());
        assert!(Gaussian::new(0.0, f64::INFINITY).is_err());
        assert!(Gaussian::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn draws_should_be_finite() {
        let mut rng = rand::rng();
        let gauss = Gaussian::standard();
        for _ in 0..100 {
            let x: f64 = gauss.draw(&mut rng);
            assert!(x.is_finite());
        }
    }

    #[test]
    fn sample_length() {
        let mut rng = rand::rng();
        let gauss = Gaussian::standard();
        let xs: Vec<f64> = gauss.sample(10, &mut rng);
        assert_eq!(xs.len(), 10);
    }

    #[test]
    fn standard_ln_pdf_at_zero() {
        let gauss = Gaussian::standard();
        assert::close(gauss.ln_pdf(&0.0_f64), -0.918_938_533_204_672_7, TOL);
    }

    #[test]
    fn standard_ln_pdf_off_zero() {
        let gauss = Gaussian::standard();
        assert::close(gauss.ln_pdf(&2.1_f64), -3.123_938_533_204_672_7, TOL);
    }

    #[test]
    fn nonstandard_ln_pdf_off_mean() {
        let gauss = Gaussian::new(-1.2, 0.33).unwrap();
        assert::close(gauss.ln_pdf(&0.0_f32), -6.421_846_156_616_945, TOL);
    }

    #[test]
    fn should_not_contain_nan_or_infinity() {
        let gauss = Gaussian::standard();
        assert!(!gauss.supports(&f64::NAN));
        assert!(!gauss.supports(&f64::INFINITY));
        assert!(!gauss.supports(&f64::NEG_INFINITY));
    }

    #[test]
    fn cdf_value_at_one() {
        let gauss = Gaussian::standard();
        assert::close(gauss.cdf(&1.0_f64), 0.841_344_746_068_542_9, TOL);
    }

    #[test]
    fn quantile_agree_with_cdf() {
        let mut rng = rand::rng();
        let gauss = Gaussian::new(0.3, 2.0).unwrap();
        let xs: Vec<f64> = gauss.sample(100, &mut rng);

        for x in &xs {
            let p = gauss.cdf(x);
            let y: f64 = gauss.quantile(p);
            assert::close(y, *x, 1E-9);
        }
    }

    #[test]
    fn ln_f_grad_matches_finite_difference() {
        let h = 1E-6;
        let x = 0.7;
        let (mu, sigma) = (-0.4, 1.3);
        let gauss = Gaussian::new(mu, sigma).unwrap();
        let (d_mu, d_sigma) = gauss.ln_f_grad(x);

        let fd_mu = (Gaussian::new(mu + h, sigma).unwrap().ln_f(&x)
            - Gaussian::new(mu - h, sigma).unwrap().ln_f(&x))
            / (2.0 * h);
        let fd_sigma = (Gaussian::new(mu, sigma + h).unwrap().ln_f(&x)
            - Gaussian::new(mu, sigma - h).unwrap().ln_f(&x))
            / (2.0 * h);

        assert::close(d_mu, fd_mu, 1E-6);
        assert::close(d_sigma, fd_sigma, 1E-6);
    }

    #[test]
    fn serde_rejects_invalid_sigma() {
        let res: Result<Gaussian, _> =
            serde_json::from_str(r#"{"mu": 0.0, "sigma": -1.0}"#);
        assert!(res.is_err());
    }
}

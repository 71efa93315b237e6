//! Exponential distribution over x in [0, ∞)
use rand::Rng;
use rand_distr::Exp;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::impl_display;
use crate::traits::*;

/// [Exponential distribution](https://en.wikipedia.org/wiki/Exponential_distribution),
/// Exp(λ) over x in [0, ∞).
///
/// The prior on the residual scale, `sigma`, of every regression model.
///
/// # Examples
///
/// Compute 50% confidence interval
///
/// ```rust
/// use yieldreg::prelude::*;
///
/// let expon = Exponential::new(1.5).unwrap();
/// let interval: (f64, f64) = expon.interval(0.5);  // (0.19, 0.92)
/// assert!((interval.0 - 0.191_788_048_3).abs() < 1E-8);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Exponential {
    /// λ > 0, rate or inverse scale
    rate: f64,
}

impl Default for Exponential {
    fn default() -> Self {
        Self::new_unchecked(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExponentialError {
    /// rate parameter is less than or equal to zero
    RateTooLow { rate: f64 },
    /// rate parameter is infinite or zero
    RateNotFinite { rate: f64 },
}

impl Exponential {
    /// Create a new exponential distribution
    ///
    /// # Arguments
    /// - rate: λ > 0, rate or inverse scale
    #[inline]
    pub fn new(rate: f64) -> Result<Self, ExponentialError> {
        if rate <= 0.0 {
            Err(ExponentialError::RateTooLow { rate })
        } else if !rate.is_finite() {
            Err(ExponentialError::RateNotFinite { rate })
        } else {
            Ok(Exponential { rate })
        }
    }

    /// Creates a new Exponential without checking whether the parameter is
    /// valid.
    #[inline]
    pub fn new_unchecked(rate: f64) -> Self {
        Exponential { rate }
    }

    /// Get the rate parameter
    ///
    /// # Example
    ///
    /// ```rust
    /// # use yieldreg::dist::Exponential;
    /// let expon = Exponential::new(1.3).unwrap();
    /// assert_eq!(expon.rate(), 1.3);
    /// ```
    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl From<&Exponential> for String {
    fn from(expon: &Exponential) -> String {
        format!("Expon(λ: {})", expon.rate)
    }
}

impl_display!(Exponential);

macro_rules! impl_traits {
    ($kind:ty) => {
        impl HasDensity<$kind> for Exponential {
            fn ln_f(&self, x: &$kind) -> f64 {
                if x < &0.0 {
                    f64::NEG_INFINITY
                } else {
                    self.rate.mul_add(-f64::from(*x), self.rate.ln())
                }
            }
        }

        impl Sampleable<$kind> for Exponential {
            fn draw<R: Rng>(&self, rng: &mut R) -> $kind {
                let expdist = Exp::new(self.rate).unwrap();
                rng.sample(expdist) as $kind
            }

            fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<$kind> {
                let expdist = Exp::new(self.rate).unwrap();
                (0..n).map(|_| rng.sample(expdist) as $kind).collect()
            }
        }

        impl Support<$kind> for Exponential {
            fn supports(&self, x: &$kind) -> bool {
                *x >= 0.0 && x.is_finite()
            }
        }

        impl ContinuousDistr<$kind> for Exponential {}

        impl Cdf<$kind> for Exponential {
            fn cdf(&self, x: &$kind) -> f64 {
                if *x < 0.0 {
                    0.0
                } else {
                    -(-self.rate * f64::from(*x)).exp_m1()
                }
            }
        }

        impl InverseCdf<$kind> for Exponential {
            fn invcdf(&self, p: f64) -> $kind {
                assert!((0.0..=1.0).contains(&p), "P out of range");
                (-(-p).ln_1p() / self.rate) as $kind
            }
        }

        impl Mean<$kind> for Exponential {
            fn mean(&self) -> Option<$kind> {
                Some(self.rate.recip() as $kind)
            }
        }
    };
}

impl Variance<f64> for Exponential {
    fn variance(&self) -> Option<f64> {
        Some(self.rate.powi(-2))
    }
}

impl_traits!(f32);
impl_traits!(f64);

impl std::error::Error for ExponentialError {}

impl fmt::Display for ExponentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateTooLow { rate } => {
                write!(f, "rate ({rate}) must be greater than zero")
            }
            Self::RateNotFinite { rate } => {
                write!(f, "non-finite rate: {rate}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_basic_impls;

    const TOL: f64 = 1E-12;

    test_basic_impls!(Exponential::new(4.0).unwrap());

    #[test]
    fn new() {
        let expon = Exponential::new(1.5).unwrap();
        assert::close(expon.rate, 1.5, TOL);
    }

    #[test]
    fn new_should_reject_non_positive_rate() {
        assert!(Exponential::new(0.0).is_err());
        assert!(Exponential::new(-1.0).is_err());
        assert!(Exponential::new(f64::INFINITY).is_err());
    }

    #[test]
    fn ln_pdf() {
        let expon = Exponential::new(1.5).unwrap();
        assert::close(expon.ln_pdf(&1.2_f64), -1.394_534_891_891_835_2, TOL);
        assert::close(expon.ln_pdf(&0.2_f64), 0.105_465_108_108_164_38, TOL);
    }

    #[test]
    fn ln_pdf_should_be_neg_infinity_below_zero() {
        let expon = Exponential::new(1.5).unwrap();
        assert_eq!(expon.ln_pdf(&-0.5_f64), f64::NEG_INFINITY);
    }

    #[test]
    fn draws_are_non_negative() {
        let mut rng = rand::rng();
        let expon = Exponential::new(4.0).unwrap();
        let xs: Vec<f64> = expon.sample(200, &mut rng);
        assert!(xs.iter().all(|&x| x >= 0.0));
    }

    #[test]
    fn cdf_and_invcdf_agree() {
        let expon = Exponential::new(1.5).unwrap();
        for p in [0.01, 0.25, 0.5, 0.9, 0.999] {
            let x: f64 = expon.invcdf(p);
            assert::close(expon.cdf(&x), p, 1E-10);
        }
    }

    #[test]
    fn mean_and_variance() {
        let expon = Exponential::new(4.0).unwrap();
        let m: f64 = expon.mean().unwrap();
        assert::close(m, 0.25, TOL);
        assert::close(expon.variance().unwrap(), 0.0625, TOL);
    }
}

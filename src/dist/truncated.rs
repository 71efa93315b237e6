//! Left-truncated distributions over x in [low, ∞)
use rand::Rng;
use std::fmt;

use crate::traits::*;

/// A distribution restricted to `[low, ∞)` with its density renormalized by
/// the mass of the base distribution above `low`.
///
/// Yields are non-negative in natural units, so in standardized space the
/// response must not fall below the standardized zero.
///
/// # Example
///
/// ```
/// use yieldreg::prelude::*;
///
/// let base = StudentsT::new(5.0, 0.0, 1.0).unwrap();
/// let trunc = LeftTruncated::new(base, -1.0).unwrap();
///
/// let mut rng = rand::rng();
/// let xs: Vec<f64> = trunc.sample(100, &mut rng);
/// assert!(xs.iter().all(|&x| x >= -1.0));
/// assert_eq!(trunc.ln_pdf(&-1.5), f64::NEG_INFINITY);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LeftTruncated<D> {
    base: D,
    low: f64,
    /// Cached CDF of the base distribution at `low`
    cdf_low: f64,
    /// Cached ln(1 - CDF(low))
    ln_mass: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LeftTruncatedError {
    /// The truncation point is NaN or +∞ (or -∞ where a bound is required)
    LowNotFinite { low: f64 },
    /// The base distribution has no mass above the truncation point
    NoMassAboveLow { low: f64 },
}

impl<D> LeftTruncated<D>
where
    D: Cdf<f64>,
{
    /// Truncate `base` to `[low, ∞)`
    pub fn new(base: D, low: f64) -> Result<Self, LeftTruncatedError> {
        if low.is_nan() || low == f64::INFINITY {
            return Err(LeftTruncatedError::LowNotFinite { low });
        }
        let cdf_low = base.cdf(&low);
        let mass = 1.0 - cdf_low;
        if mass <= 0.0 {
            Err(LeftTruncatedError::NoMassAboveLow { low })
        } else {
            Ok(LeftTruncated {
                base,
                low,
                cdf_low,
                ln_mass: mass.ln(),
            })
        }
    }

    /// The truncation point
    #[inline]
    pub fn low(&self) -> f64 {
        self.low
    }

    /// The untruncated distribution
    #[inline]
    pub fn base(&self) -> &D {
        &self.base
    }

    /// ln of the probability mass the base puts on `[low, ∞)`
    #[inline]
    pub fn ln_mass(&self) -> f64 {
        self.ln_mass
    }
}

impl<D> HasDensity<f64> for LeftTruncated<D>
where
    D: Cdf<f64>,
{
    fn ln_f(&self, x: &f64) -> f64 {
        if *x < self.low {
            f64::NEG_INFINITY
        } else {
            self.base.ln_f(x) - self.ln_mass
        }
    }
}

impl<D> Support<f64> for LeftTruncated<D>
where
    D: Cdf<f64>,
{
    fn supports(&self, x: &f64) -> bool {
        *x >= self.low && x.is_finite()
    }
}

impl<D> ContinuousDistr<f64> for LeftTruncated<D> where D: Cdf<f64> {}

impl<D> Cdf<f64> for LeftTruncated<D>
where
    D: Cdf<f64>,
{
    fn cdf(&self, x: &f64) -> f64 {
        if *x < self.low {
            0.0
        } else {
            let p = (self.base.cdf(x) - self.cdf_low) / self.ln_mass.exp();
            p.clamp(0.0, 1.0)
        }
    }
}

impl<D> InverseCdf<f64> for LeftTruncated<D>
where
    D: Cdf<f64> + InverseCdf<f64>,
{
    fn invcdf(&self, p: f64) -> f64 {
        assert!((0.0..=1.0).contains(&p), "P out of range");
        let q = p.mul_add(1.0 - self.cdf_low, self.cdf_low);
        // The base quantile can round below `low` deep in the tail
        self.base.invcdf(q).max(self.low)
    }
}

impl<D> Sampleable<f64> for LeftTruncated<D>
where
    D: Cdf<f64> + InverseCdf<f64>,
{
    fn draw<R: Rng>(&self, rng: &mut R) -> f64 {
        let u: f64 = rng.random();
        self.invcdf(u)
    }
}

impl std::error::Error for LeftTruncatedError {}

impl fmt::Display for LeftTruncatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowNotFinite { low } => {
                write!(f, "invalid truncation point {low}")
            }
            Self::NoMassAboveLow { low } => {
                write!(f, "base distribution has no mass above {low}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::{Gaussian, StudentsT};
    use proptest::prelude::*;

    const TOL: f64 = 1E-10;

    #[test]
    fn half_normal_density_doubles() {
        let g = Gaussian::standard();
        let trunc = LeftTruncated::new(g.clone(), 0.0).unwrap();
        assert::close(trunc.ln_f(&0.5), g.ln_f(&0.5_f64) + 2.0_f64.ln(), TOL);
    }

    #[test]
    fn no_density_below_low() {
        let trunc = LeftTruncated::new(Gaussian::standard(), 0.0).unwrap();
        assert_eq!(trunc.ln_f(&-1E-9), f64::NEG_INFINITY);
        assert!(!trunc.supports(&-0.1));
        assert::close(trunc.cdf(&-0.1), 0.0, TOL);
    }

    #[test]
    fn neg_infinity_low_is_the_base() {
        let t = StudentsT::new(5.0, 0.3, 1.2).unwrap();
        let trunc = LeftTruncated::new(t.clone(), f64::NEG_INFINITY).unwrap();
        assert::close(trunc.ln_f(&1.0), t.ln_f(&1.0_f64), TOL);
    }

    #[test]
    fn rejects_bad_low() {
        assert!(LeftTruncated::new(Gaussian::standard(), f64::NAN).is_err());
        assert!(
            LeftTruncated::new(Gaussian::standard(), f64::INFINITY).is_err()
        );
        assert!(LeftTruncated::new(Gaussian::standard(), 100.0).is_err());
    }

    #[test]
    fn invcdf_inverts_cdf() {
        let t = StudentsT::new(5.0, 0.0, 1.0).unwrap();
        let trunc = LeftTruncated::new(t, -0.5).unwrap();
        for p in [0.01, 0.2, 0.5, 0.8, 0.99] {
            let x = trunc.invcdf(p);
            assert::close(trunc.cdf(&x), p, 1E-8);
        }
    }

    #[test]
    fn deep_tail_truncation_still_draws_above_low() {
        // truncation point far into the right tail of the base
        let t = StudentsT::new(5.0, -3.0, 0.1).unwrap();
        let trunc = LeftTruncated::new(t, -1.0).unwrap();
        let mut rng = rand::rng();
        let xs: Vec<f64> = trunc.sample(500, &mut rng);
        assert!(xs.iter().all(|&x| x >= -1.0 && x.is_finite()));
    }

    #[test]
    fn draws_follow_the_truncated_cdf() {
        use crate::misc::ks_test;
        use rand::SeedableRng;
        let mut rng = rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(5);
        let t = StudentsT::new(5.0, 0.3, 1.0).unwrap();
        let trunc = LeftTruncated::new(t, 0.8).unwrap();
        let xs: Vec<f64> = trunc.sample(1000, &mut rng);
        let (_, p) = ks_test(&xs, |x| trunc.cdf(&x));
        assert!(p > 1E-3, "p = {p}");
    }

    #[test]
    fn density_integrates_to_one() {
        let t = StudentsT::new(5.0, 0.0, 0.5).unwrap();
        let trunc = LeftTruncated::new(t, -1.5).unwrap();
        let q = crate::misc::quad(|x: f64| trunc.f(&x), -1.5, 100.0);
        assert::close(q, 1.0, 1E-6);
    }

    proptest! {
        #[test]
        fn draws_respect_truncation(
            loc in -3.0..3.0_f64,
            scale in 0.1..3.0_f64,
            low in -4.0..1.0_f64,
            seed in any::<u64>(),
        ) {
            use rand::SeedableRng;
            let mut rng = rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(seed);
            let t = StudentsT::new(5.0, loc, scale).unwrap();
            let trunc = LeftTruncated::new(t, low).unwrap();
            for _ in 0..20 {
                let x: f64 = trunc.draw(&mut rng);
                prop_assert!(x >= low);
            }
        }
    }
}

use rand::Rng;
use serde::{Deserialize, Serialize};
use special::Beta as _;
use special::Gamma as _;
use std::fmt;

use crate::consts::LN_PI;
use crate::impl_display;
use crate::traits::*;

/// Location-scale [Student's T distribution](https://en.wikipedia.org/wiki/Student%27s_t-distribution)
/// over x in (-∞, ∞).
///
/// `StudentsT(ν, μ, s)` is the distribution of `μ + s·T` where `T` is a
/// standard Student's t with ν degrees of freedom.
///
/// # Example
///
/// ```
/// use yieldreg::prelude::*;
///
/// let t = StudentsT::new(5.0, 0.0, 1.0).unwrap();
/// let p = t.cdf(&2.015_048_373_f64);
/// assert!((p - 0.95).abs() < 1E-8);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[serde(try_from = "StudentsTParameters", into = "StudentsTParameters")]
pub struct StudentsT {
    /// Degrees of freedom, ν, in (0, ∞)
    v: f64,
    /// Location
    loc: f64,
    /// Scale, s > 0
    scale: f64,
    /// Cached ln Γ((ν+1)/2) - ln Γ(ν/2) - ln(νπ)/2 - ln(s)
    ln_z: f64,
    /// Cached ln B(ν/2, 1/2) for the CDF
    ln_beta: f64,
}

impl PartialEq for StudentsT {
    fn eq(&self, other: &StudentsT) -> bool {
        self.v == other.v && self.loc == other.loc && self.scale == other.scale
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StudentsTParameters {
    pub v: f64,
    pub loc: f64,
    pub scale: f64,
}

impl TryFrom<StudentsTParameters> for StudentsT {
    type Error = StudentsTError;

    fn try_from(params: StudentsTParameters) -> Result<Self, Self::Error> {
        StudentsT::new(params.v, params.loc, params.scale)
    }
}

impl From<StudentsT> for StudentsTParameters {
    fn from(t: StudentsT) -> Self {
        StudentsTParameters {
            v: t.v,
            loc: t.loc,
            scale: t.scale,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentsTError {
    /// The v parameter is infinite or NaN
    VNotFinite { v: f64 },
    /// The v parameter is less than or equal to zero
    VTooLow { v: f64 },
    /// The location is infinite or NaN
    LocNotFinite { loc: f64 },
    /// The scale is less than or equal to zero
    ScaleTooLow { scale: f64 },
    /// The scale is infinite or NaN
    ScaleNotFinite { scale: f64 },
}

impl StudentsT {
    /// Create a new Student's T distribution with degrees of freedom `v`,
    /// location `loc` and scale `scale`.
    #[inline]
    pub fn new(v: f64, loc: f64, scale: f64) -> Result<Self, StudentsTError> {
        if v <= 0.0 {
            Err(StudentsTError::VTooLow { v })
        } else if !v.is_finite() {
            Err(StudentsTError::VNotFinite { v })
        } else if !loc.is_finite() {
            Err(StudentsTError::LocNotFinite { loc })
        } else if scale <= 0.0 {
            Err(StudentsTError::ScaleTooLow { scale })
        } else if !scale.is_finite() {
            Err(StudentsTError::ScaleNotFinite { scale })
        } else {
            Ok(Self::new_unchecked(v, loc, scale))
        }
    }

    /// Creates a new StudentsT without checking whether the parameters are
    /// valid.
    #[inline]
    pub fn new_unchecked(v: f64, loc: f64, scale: f64) -> Self {
        let half_v = v / 2.0;
        let ln_z = (half_v + 0.5).ln_gamma().0
            - half_v.ln_gamma().0
            - 0.5 * (v.ln() + LN_PI)
            - scale.ln();
        StudentsT {
            v,
            loc,
            scale,
            ln_z,
            ln_beta: half_v.ln_beta(0.5),
        }
    }

    /// The standard Student's t with `v` degrees of freedom
    #[inline]
    pub fn standard(v: f64) -> Result<Self, StudentsTError> {
        Self::new(v, 0.0, 1.0)
    }

    /// Get the degrees of freedom, v
    #[inline]
    pub fn v(&self) -> f64 {
        self.v
    }

    /// Get the location
    #[inline]
    pub fn loc(&self) -> f64 {
        self.loc
    }

    /// Get the scale
    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Standard density (location 0, scale 1) at `u`, without the `1/s`
    /// factor. Used for the truncation-normalizer gradient.
    #[inline]
    pub(crate) fn standard_pdf(&self, u: f64) -> f64 {
        let ln_f0 = self.ln_z + self.scale.ln()
            - (self.v + 1.0) / 2.0 * (u * u / self.v).ln_1p();
        ln_f0.exp()
    }

    /// Derivatives of `ln_f(x)` with respect to `loc` and `scale`
    #[inline]
    pub fn ln_f_grad(&self, x: f64) -> (f64, f64) {
        let u = (x - self.loc) / self.scale;
        let w = (self.v + 1.0) * u / u.mul_add(u, self.v);
        let d_loc = w / self.scale;
        let d_scale = w.mul_add(u, -1.0) / self.scale;
        (d_loc, d_scale)
    }

    /// CDF of the standard t at `u`
    fn standard_cdf(&self, u: f64) -> f64 {
        if u.is_nan() {
            return f64::NAN;
        } else if u == f64::INFINITY {
            return 1.0;
        } else if u == f64::NEG_INFINITY {
            return 0.0;
        }
        let x = self.v / u.mul_add(u, self.v);
        let tail = 0.5 * x.inc_beta(self.v / 2.0, 0.5, self.ln_beta);
        if u < 0.0 {
            tail
        } else {
            1.0 - tail
        }
    }

    /// Inverse CDF of the standard t
    fn standard_invcdf(&self, p: f64) -> f64 {
        if p <= 0.0 {
            return f64::NEG_INFINITY;
        } else if p >= 1.0 {
            return f64::INFINITY;
        } else if p == 0.5 {
            return 0.0;
        }
        let (tail, sign) = if p < 0.5 {
            (2.0 * p, -1.0)
        } else {
            (2.0 * (1.0 - p), 1.0)
        };
        let x = tail.inv_inc_beta(self.v / 2.0, 0.5, self.ln_beta);
        sign * (self.v * (1.0 - x) / x).sqrt()
    }
}

impl Default for StudentsT {
    fn default() -> Self {
        StudentsT::new_unchecked(2.0, 0.0, 1.0)
    }
}

impl From<&StudentsT> for String {
    fn from(t: &StudentsT) -> String {
        format!("Student's(ν: {}, μ: {}, s: {})", t.v, t.loc, t.scale)
    }
}

impl_display!(StudentsT);

macro_rules! impl_traits {
    ($kind:ty) => {
        impl HasDensity<$kind> for StudentsT {
            fn ln_f(&self, x: &$kind) -> f64 {
                let u = (f64::from(*x) - self.loc) / self.scale;
                let vp1 = (self.v + 1.0) / 2.0;
                self.ln_z - vp1 * (u * u / self.v).ln_1p()
            }
        }

        impl Sampleable<$kind> for StudentsT {
            fn draw<R: Rng>(&self, rng: &mut R) -> $kind {
                let t = rand_distr::StudentT::new(self.v).unwrap();
                let u: f64 = rng.sample(t);
                self.scale.mul_add(u, self.loc) as $kind
            }

            fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<$kind> {
                let t = rand_distr::StudentT::new(self.v).unwrap();
                (0..n)
                    .map(|_| {
                        let u: f64 = rng.sample(t);
                        self.scale.mul_add(u, self.loc) as $kind
                    })
                    .collect()
            }
        }

        impl Support<$kind> for StudentsT {
            fn supports(&self, x: &$kind) -> bool {
                x.is_finite()
            }
        }

        impl ContinuousDistr<$kind> for StudentsT {}

        impl Cdf<$kind> for StudentsT {
            fn cdf(&self, x: &$kind) -> f64 {
                self.standard_cdf((f64::from(*x) - self.loc) / self.scale)
            }
        }

        impl InverseCdf<$kind> for StudentsT {
            fn invcdf(&self, p: f64) -> $kind {
                assert!((0.0..=1.0).contains(&p), "P out of range");
                self.scale.mul_add(self.standard_invcdf(p), self.loc) as $kind
            }
        }

        impl Mean<$kind> for StudentsT {
            fn mean(&self) -> Option<$kind> {
                if self.v > 1.0 {
                    Some(self.loc as $kind)
                } else {
                    None
                }
            }
        }

        impl Variance<$kind> for StudentsT {
            fn variance(&self) -> Option<$kind> {
                if self.v > 2.0 {
                    let s2 = self.scale * self.scale;
                    Some((s2 * self.v / (self.v - 2.0)) as $kind)
                } else {
                    None
                }
            }
        }
    };
}

impl_traits!(f64);
impl_traits!(f32);

impl std::error::Error for StudentsTError {}

impl fmt::Display for StudentsTError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VNotFinite { v } => write!(f, "non-finite v: {v}"),
            Self::VTooLow { v } => {
                write!(f, "v ({v}) must be greater than zero")
            }
            Self::LocNotFinite { loc } => write!(f, "non-finite loc: {loc}"),
            Self::ScaleTooLow { scale } => {
                write!(f, "scale ({scale}) must be greater than zero")
            }
            Self::ScaleNotFinite { scale } => {
                write!(f, "non-finite scale: {scale}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_basic_impls;

    const TOL: f64 = 1E-12;

    test_basic_impls!(StudentsT::default());

    #[test]
    fn new() {
        let t = StudentsT::new(2.3, 0.1, 4.0).unwrap();
        assert::close(t.v, 2.3, TOL);
        assert::close(t.loc, 0.1, TOL);
        assert::close(t.scale, 4.0, TOL);
    }

    #[test]
    fn new_should_reject_v_leq_zero() {
        assert!(StudentsT::standard(f64::MIN_POSITIVE).is_ok());
        assert!(StudentsT::standard(0.0).is_err());
        assert!(StudentsT::standard(-1.0).is_err());
    }

    #[test]
    fn new_should_reject_non_finite_params() {
        assert!(StudentsT::standard(f64::INFINITY).is_err());
        assert!(StudentsT::new(5.0, f64::NAN, 1.0).is_err());
        assert!(StudentsT::new(5.0, 0.0, f64::INFINITY).is_err());
        assert!(StudentsT::new(5.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn ln_pdf_standard() {
        let t = StudentsT::standard(2.3).unwrap();
        assert::close(t.ln_pdf(&0.0_f64), -1.024_744_023_893_756_6, 1E-10);
        assert::close(t.ln_pdf(&1.0_f64), -1.620_416_044_030_352, 1E-10);
        assert::close(t.ln_pdf(&-2.5_f64), -3.191_230_587_916_138, 1E-10);
    }

    #[test]
    fn ln_pdf_location_scale() {
        let t = StudentsT::new(5.0, 0.5, 2.0).unwrap();
        assert::close(t.ln_pdf(&1.3_f64), -1.756_262_770_792_783_4, 1E-10);
    }

    #[test]
    fn cdf_values_five_dof() {
        let t = StudentsT::standard(5.0).unwrap();
        assert::close(t.cdf(&0.0_f64), 0.5, TOL);
        assert::close(t.cdf(&-1.2_f64), 0.141_945_528_353_051_13, 1E-9);
        assert::close(t.cdf(&-8.0_f64), 0.000_246_453_330_286_222_6, 1E-9);
        assert::close(t.cdf(&3.5_f64), 0.991_357_784_107_353_3, 1E-9);
    }

    #[test]
    fn invcdf_inverts_cdf() {
        let t = StudentsT::new(5.0, -0.3, 0.7).unwrap();
        for p in [0.001, 0.05, 0.3, 0.5, 0.72, 0.99] {
            let x: f64 = t.invcdf(p);
            assert::close(t.cdf(&x), p, 1E-9);
        }
    }

    #[test]
    fn ln_f_grad_matches_finite_difference() {
        let h = 1E-6;
        let (v, loc, scale) = (5.0, 0.2, 0.8);
        let x = -1.1;
        let t = StudentsT::new(v, loc, scale).unwrap();
        let (d_loc, d_scale) = t.ln_f_grad(x);

        let at = |l: f64, s: f64| StudentsT::new(v, l, s).unwrap().ln_f(&x);
        let fd_loc = (at(loc + h, scale) - at(loc - h, scale)) / (2.0 * h);
        let fd_scale = (at(loc, scale + h) - at(loc, scale - h)) / (2.0 * h);

        assert::close(d_loc, fd_loc, 1E-6);
        assert::close(d_scale, fd_scale, 1E-6);
    }

    #[test]
    fn variance() {
        let v: f64 = StudentsT::new(2.3, 0.0, 2.0).unwrap().variance().unwrap();
        assert::close(v, 4.0 * 7.666_666_666_666_670_5, 1E-10);
    }

    #[test]
    fn draws_pass_ks_test() {
        use crate::misc::ks_test;
        use rand::SeedableRng;
        let mut rng = rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(11);
        let t = StudentsT::new(5.0, -0.4, 1.7).unwrap();
        let xs: Vec<f64> = t.sample(1000, &mut rng);
        let (_, p) = ks_test(&xs, |x| t.cdf(&x));
        assert!(p > 1E-3, "p = {p}");
    }

    #[test]
    fn mean_undefined_for_small_v() {
        let m: Option<f64> = StudentsT::standard(0.9).unwrap().mean();
        assert!(m.is_none());
    }
}

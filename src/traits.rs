//! Trait definitions
use rand::Rng;

/// Has a (log) density function
pub trait HasDensity<X> {
    /// Probability function
    ///
    /// # Example
    ///
    /// ```
    /// use yieldreg::dist::Gaussian;
    /// use yieldreg::traits::HasDensity;
    ///
    /// let g = Gaussian::standard();
    /// assert!(g.f(&0.0_f64) > g.f(&0.1_f64));
    /// assert!(g.f(&-3.0_f64) < g.f(&-2.99_f64));
    /// ```
    fn f(&self, x: &X) -> f64 {
        self.ln_f(x).exp()
    }

    /// Probability function
    ///
    /// # Example
    ///
    /// ```
    /// use yieldreg::dist::Gaussian;
    /// use yieldreg::traits::HasDensity;
    ///
    /// let g = Gaussian::standard();
    /// assert!(g.ln_f(&0.0_f64) > g.ln_f(&0.1_f64));
    /// ```
    fn ln_f(&self, x: &X) -> f64;
}

/// Can be sampled
pub trait Sampleable<X> {
    /// Single draw from the `Rv`
    ///
    /// # Example
    ///
    /// Draw a positive waiting time
    ///
    /// ```
    /// use yieldreg::dist::Exponential;
    /// use yieldreg::traits::Sampleable;
    ///
    /// let expon = Exponential::new(1.0).unwrap();
    /// let mut rng = rand::rng();
    /// let x: f64 = expon.draw(&mut rng);
    ///
    /// assert!(x >= 0.0);
    /// ```
    fn draw<R: Rng>(&self, rng: &mut R) -> X;

    /// Multiple draws of the `Rv`
    fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<X> {
        (0..n).map(|_| self.draw(rng)).collect()
    }
}

/// Identifies the support of the Rv
pub trait Support<X> {
    /// Returns `true` if `x` is in the support of the `Rv`
    fn supports(&self, x: &X) -> bool;
}

/// Is a continuous probability distributions
///
/// This trait uses the `HasDensity<X>` and `Support<X>` implementations to
/// implement itself.
pub trait ContinuousDistr<X>: HasDensity<X> + Support<X> {
    /// The value of the Probability Density Function (PDF) at `x`
    fn pdf(&self, x: &X) -> f64 {
        self.ln_pdf(x).exp()
    }

    /// The value of the log Probability Density Function (PDF) at `x`
    fn ln_pdf(&self, x: &X) -> f64 {
        if self.supports(x) {
            self.ln_f(x)
        } else {
            f64::NEG_INFINITY
        }
    }
}

/// Has a cumulative distribution function (CDF)
pub trait Cdf<X>: HasDensity<X> {
    /// The value of the Cumulative Density Function at `x`
    fn cdf(&self, x: &X) -> f64;

    /// Survival function, `1 - CDF(x)`
    fn sf(&self, x: &X) -> f64 {
        1.0 - self.cdf(x)
    }
}

/// Has an inverse-CDF / quantile function
pub trait InverseCdf<X>: HasDensity<X> {
    /// The value of the `x` at the given probability in the CDF
    ///
    /// # Example
    ///
    /// The CDF identity: p = CDF(x) => x = CDF<sup>-1</sup>(p)
    ///
    /// ```
    /// use yieldreg::dist::Gaussian;
    /// use yieldreg::traits::{Cdf, InverseCdf};
    ///
    /// let g = Gaussian::standard();
    ///
    /// let x: f64 = 1.2;
    /// let p: f64 = g.cdf(&x);
    /// let y: f64 = g.invcdf(p);
    ///
    /// assert!((x - y).abs() < 1E-12);
    /// ```
    fn invcdf(&self, p: f64) -> X;

    /// Alias for `invcdf`
    fn quantile(&self, p: f64) -> X {
        self.invcdf(p)
    }

    /// Interval containing `p` proportion for the probability
    fn interval(&self, p: f64) -> (X, X) {
        let pt = (1.0 - p) / 2.0;
        (self.quantile(pt), self.quantile(p + pt))
    }
}

/// Defines the distribution mean
pub trait Mean<X> {
    /// Returns `None` if the mean is undefined
    fn mean(&self) -> Option<X>;
}

/// Defines the distribution variance
pub trait Variance<X> {
    /// Returns `None` if the variance is undefined
    fn variance(&self) -> Option<X>;
}

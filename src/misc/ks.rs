/// One-sample Kolmogorov-Smirnov test of `xs` against the CDF `cdf`
///
/// Returns the statistic and the asymptotic p-value.
///
/// # Example
///
/// ```
/// use yieldreg::dist::Gaussian;
/// use yieldreg::misc::ks_test;
/// use yieldreg::traits::{Cdf, Sampleable};
///
/// let g = Gaussian::standard();
/// let mut rng = rand::rng();
/// let xs: Vec<f64> = g.sample(500, &mut rng);
///
/// let (_, p) = ks_test(&xs, |x| g.cdf(&x));
/// assert!(p > 1E-4);
/// ```
pub fn ks_test<F>(xs: &[f64], cdf: F) -> (f64, f64)
where
    F: Fn(f64) -> f64,
{
    let mut sorted = xs.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    let n = sorted.len() as f64;
    let stat = sorted
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            let f = cdf(x);
            let lo = f - i as f64 / n;
            let hi = (i + 1) as f64 / n - f;
            lo.max(hi)
        })
        .fold(0.0, f64::max);
    let sqrt_n = n.sqrt();
    (stat, kolmogorov_sf((sqrt_n + 0.12 + 0.11 / sqrt_n) * stat))
}

/// Survival function of the Kolmogorov distribution
fn kolmogorov_sf(lambda: f64) -> f64 {
    if lambda < 1E-3 {
        return 1.0;
    }
    let mut sum = 0.0;
    let mut sign = 1.0;
    for k in 1..=100 {
        let k = f64::from(k);
        let term = (-2.0 * k * k * lambda * lambda).exp();
        sum += sign * term;
        if term < 1E-12 {
            break;
        }
        sign = -sign;
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

//! Summary statistics and MCMC convergence diagnostics
//!
//! Chains are passed as slices of equally long draws of a single scalar
//! component.

/// Mean of `xs`. NaN if `xs` is empty.
///
/// # Example
///
/// ```
/// use yieldreg::diagnostics::mean;
///
/// assert_eq!(mean(&[1.0, 2.0, 3.0, 6.0]), 3.0);
/// assert!(mean(&[]).is_nan());
/// ```
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        f64::NAN
    } else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}

/// Variance with `ddof` delta degrees of freedom
pub fn var_ddof(xs: &[f64], ddof: usize) -> f64 {
    if xs.len() <= ddof {
        return f64::NAN;
    }
    let m = mean(xs);
    xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>()
        / (xs.len() - ddof) as f64
}

/// Population standard deviation
pub fn std(xs: &[f64]) -> f64 {
    var_ddof(xs, 0).sqrt()
}

/// The `q`-quantile of `xs` by linear interpolation between order
/// statistics
///
/// # Example
///
/// ```
/// use yieldreg::diagnostics::quantile;
///
/// let xs = [4.0, 1.0, 3.0, 2.0, 5.0];
/// assert_eq!(quantile(&xs, 0.5), 3.0);
/// assert_eq!(quantile(&xs, 0.0), 1.0);
/// assert_eq!(quantile(&xs, 0.125), 1.5);
/// ```
pub fn quantile(xs: &[f64], q: f64) -> f64 {
    let mut sorted: Vec<f64> =
        xs.iter().copied().filter(|x| !x.is_nan()).collect();
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return f64::NAN;
    }
    sorted.sort_unstable_by(f64::total_cmp);
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Narrowest interval holding a `prob` share of the sorted draws
/// (highest posterior density interval). NaNs are ignored; an empty input
/// or a `prob` outside `[0, 1]` gives `(NaN, NaN)`.
///
/// # Example
///
/// ```
/// use yieldreg::diagnostics::hpdi;
///
/// // a long right tail pulls equal-tailed quantiles but not the HPDI
/// let xs = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0];
/// assert_eq!(hpdi(&xs, 0.9), (0.0, 9.0));
/// ```
pub fn hpdi(xs: &[f64], prob: f64) -> (f64, f64) {
    let mut sorted: Vec<f64> =
        xs.iter().copied().filter(|x| !x.is_nan()).collect();
    if sorted.is_empty() || !(0.0..=1.0).contains(&prob) {
        return (f64::NAN, f64::NAN);
    }
    sorted.sort_unstable_by(f64::total_cmp);
    let n = sorted.len();
    let span = ((prob * n as f64).floor() as usize).min(n - 1);
    let start = (0..n - span)
        .min_by(|&a, &b| {
            let width = |i: usize| sorted[i + span] - sorted[i];
            width(a).total_cmp(&width(b))
        })
        .unwrap_or(0);
    (sorted[start], sorted[start + span])
}

/// Biased autocovariance of `xs` at lags `0..xs.len()`
pub fn autocovariance(xs: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let m = mean(xs);
    let centered: Vec<f64> = xs.iter().map(|x| x - m).collect();
    (0..n)
        .map(|lag| {
            centered[..n - lag]
                .iter()
                .zip(&centered[lag..])
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / n as f64
        })
        .collect()
}

/// Mean within-chain variance and the pooled variance estimate `var+`
fn chain_variance_stats(chains: &[Vec<f64>]) -> (f64, f64) {
    let n = chains[0].len() as f64;
    let within = mean(
        &chains.iter().map(|c| var_ddof(c, 1)).collect::<Vec<f64>>(),
    );
    let mut var_plus = within * (n - 1.0) / n;
    if chains.len() > 1 {
        let means: Vec<f64> = chains.iter().map(|c| mean(c)).collect();
        var_plus += var_ddof(&means, 1);
    }
    (within, var_plus)
}

fn check_chains(chains: &[Vec<f64>], min_len: usize) -> bool {
    match chains.first() {
        None => false,
        Some(first) => {
            first.len() >= min_len
                && chains.iter().all(|c| c.len() == first.len())
        }
    }
}

/// Effective sample size across chains
///
/// Uses the autocorrelation averaged over chains and truncates the sum of
/// lag pairs with Geyer's initial monotone sequence. Returns NaN when there
/// are fewer than four draws per chain or the chains differ in length.
pub fn effective_sample_size(chains: &[Vec<f64>]) -> f64 {
    if !check_chains(chains, 4) {
        return f64::NAN;
    }
    let n_chains = chains.len();
    let n = chains[0].len();

    let acovs: Vec<Vec<f64>> =
        chains.iter().map(|c| autocovariance(c)).collect();
    let mean_acov: Vec<f64> = (0..n)
        .map(|lag| acovs.iter().map(|a| a[lag]).sum::<f64>() / n_chains as f64)
        .collect();

    let (within, var_plus) = chain_variance_stats(chains);
    if var_plus <= 0.0 {
        // constant chains carry no information about mixing
        return f64::NAN;
    }

    let mut rho = Vec::with_capacity(n);
    rho.push(1.0);
    rho.extend(
        mean_acov
            .iter()
            .skip(1)
            .map(|g| 1.0 - (within - g) / var_plus),
    );

    // sums of adjacent pairs, then forced positive and non-increasing
    let pairs: Vec<f64> = rho.chunks_exact(2).map(|p| p[0] + p[1]).collect();
    let mut tau = pairs[0];
    let mut floor = f64::INFINITY;
    for &p in pairs.iter().skip(1) {
        floor = floor.min(p.max(0.0));
        tau += floor;
    }
    let tau = 2.0f64.mul_add(tau, -1.0);

    (n_chains * n) as f64 / tau
}

/// Split R-hat: each chain is cut in half and the halves are compared as
/// separate chains
///
/// Values near 1 indicate the chains agree. Returns NaN when there are
/// fewer than four draws per chain or the chains differ in length.
pub fn split_rhat(chains: &[Vec<f64>]) -> f64 {
    if !check_chains(chains, 4) {
        return f64::NAN;
    }
    let n = chains[0].len();
    let half = n / 2;
    let halves: Vec<Vec<f64>> = chains
        .iter()
        .flat_map(|c| [c[..half].to_vec(), c[n - half..].to_vec()])
        .collect();

    let (within, var_plus) = chain_variance_stats(&halves);
    if within <= 0.0 {
        return f64::NAN;
    }
    (var_plus / within).sqrt()
}

/// `n` evenly spaced values from `start` to `stop`, both included
///
/// # Example
///
/// ```
/// use yieldreg::misc::linspace;
///
/// assert_eq!(linspace(-5.0, 5.0, 5), vec![-5.0, -2.5, 0.0, 2.5, 5.0]);
/// assert_eq!(linspace(1.0, 2.0, 1), vec![1.0]);
/// assert!(linspace(1.0, 2.0, 0).is_empty());
/// ```
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        stop
                    } else {
                        (i as f64).mul_add(step, start)
                    }
                })
                .collect()
        }
    }
}

/// `ln(sum(exp(xs)))` without overflow. Empty input gives `-inf`.
pub fn logsumexp(xs: &[f64]) -> f64 {
    let maxval = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if maxval.is_infinite() {
        maxval
    } else {
        xs.iter().map(|x| (x - maxval).exp()).sum::<f64>().ln() + maxval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1E-12;

    #[test]
    fn linspace_hits_both_ends() {
        let xs = linspace(-5.0, 5.0, 100);
        assert_eq!(xs.len(), 100);
        assert_eq!(xs[0], -5.0);
        assert_eq!(xs[99], 5.0);
        assert::close(xs[1] - xs[0], 10.0 / 99.0, TOL);
    }

    #[test]
    fn logsumexp_of_equal_terms() {
        assert::close(logsumexp(&[0.0, 0.0]), 2.0_f64.ln(), TOL);
        assert::close(logsumexp(&[1000.0, 1000.0]), 1000.0 + 2.0_f64.ln(), TOL);
    }

    #[test]
    fn logsumexp_edge_cases() {
        assert_eq!(logsumexp(&[]), f64::NEG_INFINITY);
        assert_eq!(logsumexp(&[f64::NEG_INFINITY, 1.0]), 1.0);
        assert_eq!(logsumexp(&[f64::INFINITY, 1.0]), f64::INFINITY);
    }
}

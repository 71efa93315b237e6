/// Default absolute tolerance of [`quad`]
const QUAD_EPS: f64 = 1E-8;

fn simpsons_rule<F>(func: &F, a: f64, b: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    let c = (a + b) / 2.0;
    (b - a).abs() / 6.0 * (func(a) + 4.0 * func(c) + func(b))
}

fn adaptive_simpson<F>(func: &F, a: f64, b: f64, eps: f64, whole: f64, depth: u32) -> f64
where
    F: Fn(f64) -> f64,
{
    let c = (a + b) / 2.0;
    let left = simpsons_rule(func, a, c);
    let right = simpsons_rule(func, c, b);
    let delta = left + right - whole;
    if depth == 0 || delta.abs() <= 15.0 * eps {
        left + right + delta / 15.0
    } else {
        adaptive_simpson(func, a, c, eps / 2.0, left, depth - 1)
            + adaptive_simpson(func, c, b, eps / 2.0, right, depth - 1)
    }
}

/// Adaptive Simpson's quadrature of `func` over `[a, b]`
///
/// # Example
///
/// The truncated Student's t density integrates to one above its bound.
///
/// ```
/// use yieldreg::dist::{LeftTruncated, StudentsT};
/// use yieldreg::misc::quad;
/// use yieldreg::traits::HasDensity;
///
/// let t = StudentsT::new(5.0, 0.2, 1.0).unwrap();
/// let trunc = LeftTruncated::new(t, -0.5).unwrap();
///
/// let q = quad(|x: f64| trunc.f(&x), -0.5, 200.0);
/// assert!((q - 1.0).abs() < 1E-5);
/// ```
pub fn quad<F>(func: F, a: f64, b: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    quad_eps(func, a, b, QUAD_EPS)
}

/// [`quad`] with absolute tolerance `eps`
pub fn quad_eps<F>(func: F, a: f64, b: f64, eps: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    const MAX_DEPTH: u32 = 50;
    adaptive_simpson(&func, a, b, eps, simpsons_rule(&func, a, b), MAX_DEPTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn quad_of_x2() {
        let q = quad(|x: f64| x.powi(2), 0.0, 1.0);
        assert::close(q, 1.0 / 3.0, QUAD_EPS);
    }

    #[test]
    fn quad_of_sin() {
        let q = quad(|x: f64| x.sin(), 0.0, 5.0 * PI);
        assert::close(q, 2.0, QUAD_EPS);
    }

    #[test]
    fn looser_tolerance() {
        let q = quad_eps(|x: f64| (-x).exp(), 0.0, 30.0, 1E-4);
        assert::close(q, 1.0, 1E-4);
    }
}

use std::f64::consts::PI;

/// Relative separation below which the self-influence limit is used
pub const KERNEL_SELF_TOL: f64 = 1e-8;

/// Calculates the normal stress induced by a unit opening of a rectangular element
///
/// The element is a constant displacement discontinuity of half sizes `a` and `b` centred at
/// the origin; `(x, y)` is the collocation point:
///
/// ```text
///          E'   ⎛ ⎷((a-x)²+(b-y)²)   ⎷((a+x)²+(b-y)²)   ⎷((a-x)²+(b+y)²)   ⎷((a+x)²+(b+y)²) ⎞
/// C(x,y) = ——— ⎜ ———————————————— + ———————————————— + ———————————————— + ———————————————— ⎟
///          8π   ⎝   (a-x)(b-y)         (a+x)(b-y)         (a-x)(b+y)         (a+x)(b+y)     ⎠
/// ```
///
/// Near the centre the ratio form loses accuracy, so the analytic limit
/// `E'/(8π) · 4 ⎷(a²+b²)/(ab)` is returned instead.
pub fn influence_coefficient(e_prime: f64, a: f64, b: f64, x: f64, y: f64) -> f64 {
    let f = e_prime / (8.0 * PI);
    let (x, y) = (f64::abs(x), f64::abs(y));
    if f64::sqrt(x * x + y * y) < KERNEL_SELF_TOL * f64::min(a, b) {
        return f * 4.0 * f64::sqrt(a * a + b * b) / (a * b);
    }
    let term = |p: f64, q: f64| f64::sqrt(p * p + q * q) / (p * q);
    f * (term(a - x, b - y) + term(a + x, b - y) + term(a - x, b + y) + term(a + x, b + y))
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::influence_coefficient;
    use russell_lab::approx_eq;
    use std::f64::consts::PI;

    #[test]
    fn self_term_is_the_limit() {
        let (a, b) = (0.5, 0.25);
        let c0 = influence_coefficient(8.0 * PI, a, b, 0.0, 0.0);
        approx_eq(c0, 4.0 * f64::sqrt(a * a + b * b) / (a * b), 1e-14);
        // a tiny separation yields the same value instead of noise
        let c1 = influence_coefficient(8.0 * PI, a, b, 1e-12, -1e-12);
        assert_eq!(c0, c1);
        // close to, but outside, the tolerance the ratio form agrees with the limit
        let c2 = influence_coefficient(8.0 * PI, a, b, 1e-6, 1e-6);
        approx_eq(c2, c0, 1e-8);
    }

    #[test]
    fn far_field_is_negative_and_decays() {
        let (a, b) = (0.5, 0.5);
        let mut previous = f64::NEG_INFINITY;
        for k in 2..8 {
            let r = 10.0 * (k as f64);
            let c = influence_coefficient(8.0 * PI, a, b, r, 0.0);
            assert!(c < 0.0);
            assert!(c > previous);
            // dipole-like decay: C ≈ -4ab/r³ E'/(8π)
            approx_eq(c * r * r * r / (-4.0 * a * b), 1.0, 1e-2);
            previous = c;
        }
    }

    #[test]
    fn kernel_is_even() {
        let (a, b) = (0.5, 0.2);
        let c = influence_coefficient(1.0, a, b, 3.0, 1.2);
        assert_eq!(c, influence_coefficient(1.0, a, b, -3.0, 1.2));
        assert_eq!(c, influence_coefficient(1.0, a, b, 3.0, -1.2));
        assert_eq!(c, influence_coefficient(1.0, a, b, -3.0, -1.2));
    }
}

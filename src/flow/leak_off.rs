/// Calculates the Carter leak-off volume of an element over `[t, t + Δt]`
///
/// ```text
/// ΔV = C' A (⎷(t + Δt - t₀) - ⎷(t - t₀))      with C' = 2 C_L
/// ```
///
/// where `t₀` is the time at which the fluid reached the element. Times before `t₀` do not leak.
pub fn carter_volume(c_prime: f64, area: f64, arrival: f64, t: f64, dt: f64) -> f64 {
    if c_prime <= 0.0 || area <= 0.0 {
        return 0.0;
    }
    let t1 = t + dt;
    if t1 <= arrival {
        return 0.0;
    }
    let before = f64::sqrt(f64::max(t - arrival, 0.0));
    c_prime * area * (f64::sqrt(t1 - arrival) - before)
}

/// Estimates the arrival time of the fluid at an element activated during `[t, t + Δt]`
#[inline]
pub fn arrival_estimate(t: f64, dt: f64) -> f64 {
    t + 0.5 * dt
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{arrival_estimate, carter_volume};
    use russell_lab::approx_eq;

    #[test]
    fn carter_volume_works() {
        // C' = 2 C_L with C_L = 1e-5
        let cp = 2e-5;
        approx_eq(carter_volume(cp, 2.0, 0.0, 0.0, 4.0), cp * 2.0 * 2.0, 1e-18);
        approx_eq(carter_volume(cp, 1.0, 1.0, 5.0, 4.0), cp * (f64::sqrt(8.0) - 2.0), 1e-18);
        assert_eq!(carter_volume(cp, 1.0, 10.0, 5.0, 4.0), 0.0);
        assert_eq!(carter_volume(0.0, 1.0, 0.0, 5.0, 4.0), 0.0);
        // sub-steps add up to the full step
        let full = carter_volume(cp, 1.0, 0.5, 1.0, 3.0);
        let parts = carter_volume(cp, 1.0, 0.5, 1.0, 1.0) + carter_volume(cp, 1.0, 0.5, 2.0, 2.0);
        approx_eq(full, parts, 1e-18);
        assert_eq!(arrival_estimate(1.0, 0.5), 1.25);
    }
}

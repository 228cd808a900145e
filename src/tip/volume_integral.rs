use super::{TipParams, TipRegime};

/// Number of sampling points along each direction used for the blended asymptote
pub const TIP_SAMPLES: usize = 16;

/// Ratio between the normal components below which the front is taken as parallel to a side
const PARALLEL_RATIO: f64 = 1e-4;

/// Holds the cell average of the near-tip asymptote over a partially filled element
#[derive(Clone, Copy, Debug)]
pub struct TipAverage {
    /// Mean opening over the element area
    pub opening: f64,

    /// Fraction of the element area inside the front
    pub filled: f64,
}

/// Averages the tip asymptote over a rectangular element cut by the front
///
/// The level set is approximated linearly inside the element, `φ(x) ≈ φ_c + n·(x - c)`, where `φ_c`
/// is the value at the centroid and `n` the unit outward normal. The distance to the front is
/// `s(x) = max(0, -φ(x))`.
///
/// For the pure regimes `w = A s^α` and the integral over the rectangle `[0, hx] × [0, hy]` of a
/// linear `s = c + a x + b y` has the closed form
///
/// ```text
///          F(c + a hx + b hy) - F(c + a hx) - F(c + b hy) + F(c)
/// ∫∫ sᵅ = ───────────────────────────────────────────────────────     F(u) = max(u, 0)^(α+2) / ((α+1)(α+2))
///                                  a b
/// ```
///
/// which reduces to a single integral when the front is parallel to a side. The blended regime
/// is averaged with the midpoint rule.
pub fn tip_average(
    regime: TipRegime,
    params: &TipParams,
    phi_center: f64,
    normal: [f64; 2],
    hx: f64,
    hy: f64,
    velocity: f64,
) -> TipAverage {
    let area = hx * hy;
    let filled = power_integral(0.0, phi_center, normal, hx, hy) / area;
    let opening = match regime.power_law(params, velocity) {
        Some((coefficient, exponent)) => coefficient * power_integral(exponent, phi_center, normal, hx, hy) / area,
        None => sampled_average(regime, params, phi_center, normal, hx, hy, velocity, TIP_SAMPLES),
    };
    TipAverage { opening, filled }
}

/// Integrates `max(s, 0)^α` over the element with `s = -φ_c - n·(x - c)`
fn power_integral(alpha: f64, phi_center: f64, normal: [f64; 2], hx: f64, hy: f64) -> f64 {
    let a = -normal[0];
    let b = -normal[1];
    let c = -phi_center - 0.5 * a * hx - 0.5 * b * hy; // value at the lower-left corner
    let ff = |u: f64| f64::powf(f64::max(u, 0.0), alpha + 2.0) / ((alpha + 1.0) * (alpha + 2.0));
    let gg = |u: f64| f64::powf(f64::max(u, 0.0), alpha + 1.0) / (alpha + 1.0);
    let ax = f64::abs(a) * hx;
    let by = f64::abs(b) * hy;
    if ax == 0.0 && by == 0.0 {
        hx * hy * f64::powf(f64::max(c, 0.0), alpha)
    } else if by < PARALLEL_RATIO * ax {
        hy * (gg(c + a * hx) - gg(c)) / a
    } else if ax < PARALLEL_RATIO * by {
        hx * (gg(c + b * hy) - gg(c)) / b
    } else {
        (ff(c + a * hx + b * hy) - ff(c + a * hx) - ff(c + b * hy) + ff(c)) / (a * b)
    }
}

/// Averages the asymptote with the midpoint rule on m × m points
fn sampled_average(
    regime: TipRegime,
    params: &TipParams,
    phi_center: f64,
    normal: [f64; 2],
    hx: f64,
    hy: f64,
    velocity: f64,
    m: usize,
) -> f64 {
    let mut sum = 0.0;
    for j in 0..m {
        let dy = -0.5 * hy + (j as f64 + 0.5) * hy / (m as f64);
        for i in 0..m {
            let dx = -0.5 * hx + (i as f64 + 0.5) * hx / (m as f64);
            let s = -(phi_center + normal[0] * dx + normal[1] * dy);
            if s > 0.0 {
                sum += regime.opening(params, s, velocity);
            }
        }
    }
    sum / ((m * m) as f64)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

use crate::StrError;
use russell_lab::RootFinder;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Fraction of w³ that a single mechanism must carry to be selected as the pure regime
pub const REGIME_DOMINANCE: f64 = 0.9;

/// Holds the local properties entering the near-tip asymptotes
#[derive(Clone, Copy, Debug)]
pub struct TipParams {
    /// Plane-strain modulus E'
    pub e_prime: f64,

    /// K' = 4 sqrt(2/π) K_Ic
    pub k_prime: f64,

    /// Generalized viscosity M' (μ' = 12 μ for Newtonian fluids)
    pub m_prime: f64,

    /// Flow behaviour index n
    pub flow_index: f64,

    /// C' = 2 C_L
    pub c_prime: f64,
}

/// Defines the propagation regime of a front element
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TipRegime {
    /// Toughness-dominated `w = K'/E' s^½`
    Toughness,

    /// Viscosity-dominated `w = β_n (M' vⁿ/E')^{1/(n+2)} s^{2/(n+2)}`
    Viscosity,

    /// Leak-off-dominated `w = β_mt (4 M'² v C'²/E'²)^{1/8} s^{5/8}`
    LeakOff,

    /// Blended `w = (w_k³ + w_m³ + w_mt³)^{1/3}`
    Blended,
}

/// Selects the near-tip asymptote used by the simulation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TipAsymptote {
    /// Always toughness-dominated
    Toughness,

    /// Always viscosity-dominated
    Viscosity,

    /// Always leak-off-dominated
    LeakOff,

    /// Regime selected per front element from the relative contributions
    Universal,
}

impl TipParams {
    /// Returns the toughness-dominated opening
    pub fn toughness_opening(&self, s: f64) -> f64 {
        self.k_prime / self.e_prime * f64::sqrt(s)
    }

    /// Returns the viscosity-dominated opening
    pub fn viscosity_opening(&self, s: f64, v: f64) -> f64 {
        let n = self.flow_index;
        let beta = f64::powf(2.0 * (n + 2.0) * (n + 2.0) / n * f64::tan(PI * n / (n + 2.0)), 1.0 / (n + 2.0));
        beta * f64::powf(self.m_prime * f64::powf(v, n) / self.e_prime, 1.0 / (n + 2.0)) * f64::powf(s, 2.0 / (n + 2.0))
    }

    /// Returns the leak-off-dominated opening
    pub fn leak_off_opening(&self, s: f64, v: f64) -> f64 {
        let beta = 4.0 / (f64::powf(15.0, 0.25) * f64::powf(f64::sqrt(2.0) - 1.0, 0.25));
        let c = 4.0 * self.m_prime * self.m_prime * v * self.c_prime * self.c_prime / (self.e_prime * self.e_prime);
        beta * f64::powf(c, 0.125) * f64::powf(s, 0.625)
    }
}

impl TipRegime {
    /// Calculates the opening at distance s from the front moving with velocity v
    pub fn opening(&self, params: &TipParams, s: f64, v: f64) -> f64 {
        if s <= 0.0 {
            return 0.0;
        }
        let v = f64::max(v, 0.0);
        match self {
            TipRegime::Toughness => params.toughness_opening(s),
            TipRegime::Viscosity => params.viscosity_opening(s, v),
            TipRegime::LeakOff => params.leak_off_opening(s, v),
            TipRegime::Blended => {
                let wk = params.toughness_opening(s);
                let wm = params.viscosity_opening(s, v);
                let wl = params.leak_off_opening(s, v);
                f64::cbrt(wk * wk * wk + wm * wm * wm + wl * wl * wl)
            }
        }
    }

    /// Returns `(coefficient, exponent)` such that `w = coefficient · s^exponent`
    ///
    /// Returns None for the blended regime.
    pub fn power_law(&self, params: &TipParams, v: f64) -> Option<(f64, f64)> {
        let exponent = match self {
            TipRegime::Toughness => 0.5,
            TipRegime::Viscosity => 2.0 / (params.flow_index + 2.0),
            TipRegime::LeakOff => 0.625,
            TipRegime::Blended => return None,
        };
        Some((self.opening(params, 1.0, v), exponent))
    }

    /// Inverts the asymptote for the distance to the front
    ///
    /// Solves `w(s, (s - s_old)/Δt) = opening` for `s_old ≤ s ≤ s_max`. The result is clamped to
    /// `s_old` when the opening is already matched with a stationary front and to `s_max` when
    /// even the largest distance cannot open that much.
    pub fn invert(&self, params: &TipParams, opening: f64, s_old: f64, dt: f64, s_max: f64) -> Result<f64, StrError> {
        if !(dt > 0.0) {
            return Err("Δt must be > 0.0 to invert the tip asymptote");
        }
        let s_old = f64::max(s_old, 0.0);
        if opening <= 0.0 {
            return Ok(s_old);
        }
        if let TipRegime::Toughness = self {
            if params.k_prime <= 0.0 {
                return Ok(s_max);
            }
            let s = f64::powi(params.e_prime * opening / params.k_prime, 2);
            return Ok(f64::min(f64::max(s, s_old), s_max));
        }
        let f = |s: f64| self.opening(params, s, (s - s_old) / dt) - opening;
        if f(s_old) >= 0.0 {
            return Ok(s_old);
        }
        if f(s_max) < 0.0 {
            return Ok(s_max);
        }
        let solver = RootFinder::new();
        let (s, _) = solver.brent(s_old, s_max, &mut 0, |s, _| Ok(f(s)))?;
        Ok(s)
    }
}

impl TipAsymptote {
    /// Selects the regime of a front element given the distance and velocity at the start of a step
    pub fn select(&self, params: &TipParams, s: f64, v: f64) -> TipRegime {
        match self {
            TipAsymptote::Toughness => TipRegime::Toughness,
            TipAsymptote::Viscosity => TipRegime::Viscosity,
            TipAsymptote::LeakOff => TipRegime::LeakOff,
            TipAsymptote::Universal => {
                let s = f64::max(s, f64::MIN_POSITIVE);
                let v = f64::max(v, 0.0);
                let wk = f64::powi(params.toughness_opening(s), 3);
                let wm = f64::powi(params.viscosity_opening(s, v), 3);
                let wl = f64::powi(params.leak_off_opening(s, v), 3);
                let total = wk + wm + wl;
                if !(total > 0.0) {
                    TipRegime::Blended
                } else if wk >= REGIME_DOMINANCE * total {
                    TipRegime::Toughness
                } else if wm >= REGIME_DOMINANCE * total {
                    TipRegime::Viscosity
                } else if wl >= REGIME_DOMINANCE * total {
                    TipRegime::LeakOff
                } else {
                    TipRegime::Blended
                }
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{TipAsymptote, TipParams, TipRegime};
    use russell_lab::approx_eq;

    fn params() -> TipParams {
        TipParams {
            e_prime: 3.3e9 / (1.0 - 0.16 * 0.16),
            k_prime: 4.0 * f64::sqrt(2.0 / std::f64::consts::PI) * 0.5e6,
            m_prime: 12.0 * 30.0,
            flow_index: 1.0,
            c_prime: 2.0 * 1e-5,
        }
    }

    #[test]
    fn coefficients_are_correct() {
        let p = TipParams {
            e_prime: 1.0,
            k_prime: 1.0,
            m_prime: 1.0,
            flow_index: 1.0,
            c_prime: 0.5,
        };
        // β_m = 2^(1/3) 3^(5/6) for Newtonian fluids
        approx_eq(p.viscosity_opening(1.0, 1.0), 3.147345190264944, 1e-13);
        // 4 M'² v C'² / E'² = 1
        approx_eq(p.leak_off_opening(1.0, 1.0), 2.53355944082657, 1e-13);
        approx_eq(p.toughness_opening(4.0), 2.0, 1e-15);
        approx_eq(TipRegime::Blended.opening(&p, 1.0, 0.0), 1.0, 1e-15);
        assert_eq!(TipRegime::Viscosity.opening(&p, -1.0, 1.0), 0.0);
    }

    #[test]
    fn invert_toughness_works() {
        let p = params();
        let w = TipRegime::Toughness.opening(&p, 2e-3, 0.0);
        let s = TipRegime::Toughness.invert(&p, w, 1e-3, 0.1, 1.0).unwrap();
        approx_eq(s, 2e-3, 1e-15);
        // the front never recedes
        let s = TipRegime::Toughness.invert(&p, w, 3e-3, 0.1, 1.0).unwrap();
        assert_eq!(s, 3e-3);
        // bounded
        let s = TipRegime::Toughness.invert(&p, w, 1e-4, 0.1, 1e-3).unwrap();
        assert_eq!(s, 1e-3);
    }

    #[test]
    fn invert_works_for_all_regimes() {
        let p = params();
        let (s_old, dt) = (4e-3, 0.5);
        for regime in [TipRegime::Viscosity, TipRegime::LeakOff, TipRegime::Blended] {
            let s_true = 6.5e-3;
            let v = (s_true - s_old) / dt;
            let w = regime.opening(&p, s_true, v);
            let s = regime.invert(&p, w, s_old, dt, 0.05).unwrap();
            approx_eq(s, s_true, 1e-9);
        }
        // stationary front opens more than the given opening
        let w = TipRegime::Blended.opening(&p, s_old, 0.0);
        let s = TipRegime::Blended.invert(&p, 0.5 * w, s_old, dt, 0.05).unwrap();
        assert_eq!(s, s_old);
        assert_eq!(
            TipRegime::Viscosity.invert(&p, 1e-3, s_old, 0.0, 0.05).err(),
            Some("Δt must be > 0.0 to invert the tip asymptote")
        );
    }

    #[test]
    fn select_works() {
        let p = params();
        assert_eq!(TipAsymptote::Toughness.select(&p, 1e-3, 1.0), TipRegime::Toughness);
        // stationary front with toughness
        assert_eq!(TipAsymptote::Universal.select(&p, 1e-3, 0.0), TipRegime::Toughness);
        // fast front with a very viscous fluid
        let mut q = p;
        q.m_prime = 1e6;
        q.c_prime = 0.0;
        assert_eq!(TipAsymptote::Universal.select(&q, 1e-2, 1.0), TipRegime::Viscosity);
        // nothing opens the crack
        q.m_prime = 0.0;
        q.k_prime = 0.0;
        assert_eq!(TipAsymptote::Universal.select(&q, 1e-2, 1.0), TipRegime::Blended);
    }
}

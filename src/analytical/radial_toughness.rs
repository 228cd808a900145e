use crate::StrError;
use std::f64::consts::PI;

/// Solution of the toughness-dominated radial hydraulic fracture (zero viscosity, no leak-off)
///
/// The fracture is a penny-shaped crack loaded by a uniform net pressure, driven by a constant
/// injection rate Q0:
///
/// ```text
/// R(t) = 0.8546 (E' Q0 t / K')^⅖
/// w(r, t) = w0(t) sqrt(1 - ρ²)       ρ = r / R
/// w0(t) = 0.6537 (K'⁴ Q0 t / E'⁴)^⅕
/// p(t) = π E' w0 / (8 R)
/// ```
///
/// # Reference
///
/// 1. Savitski AA, Detournay E (2002) Propagation of a penny-shaped fluid-driven fracture in an
///    impermeable rock: asymptotic solutions, International Journal of Solids and Structures,
///    39(26):6311-6337
pub struct RadialToughness {
    e_prime: f64, // plane-strain modulus
    k_prime: f64, // K' = 4 sqrt(2/π) K_Ic
    q0: f64,      // injection rate
}

impl RadialToughness {
    /// Allocates a new instance
    ///
    /// * `e_prime` -- plane-strain modulus
    /// * `toughness` -- fracture toughness K_Ic
    /// * `q0` -- injection rate
    pub fn new(e_prime: f64, toughness: f64, q0: f64) -> Result<Self, StrError> {
        if !(e_prime > 0.0) {
            return Err("the plane-strain modulus must be > 0.0");
        }
        if !(toughness > 0.0) {
            return Err("the toughness-dominated solution requires K_Ic > 0.0");
        }
        if !(q0 > 0.0) {
            return Err("the injection rate must be > 0.0");
        }
        Ok(RadialToughness {
            e_prime,
            k_prime: 4.0 * f64::sqrt(2.0 / PI) * toughness,
            q0,
        })
    }

    /// Calculates the radius
    pub fn radius(&self, t: f64) -> f64 {
        0.8546 * f64::powf(self.e_prime * self.q0 * t / self.k_prime, 0.4)
    }

    /// Calculates the time at which the fracture reaches the given radius
    pub fn time_at_radius(&self, radius: f64) -> Result<f64, StrError> {
        if !(radius > 0.0) {
            return Err("the radius must be > 0.0");
        }
        Ok(f64::powf(radius / 0.8546, 2.5) * self.k_prime / (self.e_prime * self.q0))
    }

    /// Calculates the opening at the injection point
    pub fn center_opening(&self, t: f64) -> f64 {
        let kp4 = f64::powi(self.k_prime, 4);
        let ep4 = f64::powi(self.e_prime, 4);
        0.6537 * f64::powf(kp4 * self.q0 * t / ep4, 0.2)
    }

    /// Calculates the opening at distance r from the injection point (zero outside)
    pub fn opening(&self, t: f64, r: f64) -> f64 {
        let rho = r / self.radius(t);
        if rho >= 1.0 {
            return 0.0;
        }
        self.center_opening(t) * f64::sqrt(1.0 - rho * rho)
    }

    /// Calculates the (uniform) net pressure
    pub fn net_pressure(&self, t: f64) -> f64 {
        PI * self.e_prime * self.center_opening(t) / (8.0 * self.radius(t))
    }

    /// Calculates the front velocity dR/dt
    pub fn velocity(&self, t: f64) -> f64 {
        0.4 * self.radius(t) / t
    }

    /// Calculates the fracture volume
    pub fn volume(&self, t: f64) -> f64 {
        let r = self.radius(t);
        2.0 * PI * r * r * self.center_opening(t) / 3.0
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::RadialToughness;
    use russell_lab::approx_eq;

    #[test]
    fn new_captures_errors() {
        assert_eq!(
            RadialToughness::new(0.0, 1e6, 1e-3).err(),
            Some("the plane-strain modulus must be > 0.0")
        );
        assert_eq!(
            RadialToughness::new(1e10, 0.0, 1e-3).err(),
            Some("the toughness-dominated solution requires K_Ic > 0.0")
        );
        assert_eq!(
            RadialToughness::new(1e10, 1e6, 0.0).err(),
            Some("the injection rate must be > 0.0")
        );
    }

    #[test]
    fn formulae_are_consistent() {
        let ana = RadialToughness::new(1e10, 2e6, 1e-3).unwrap();
        let t = ana.time_at_radius(0.6).unwrap();
        approx_eq(ana.radius(t), 0.6, 1e-12);

        // mass balance of the self-similar solution
        approx_eq(ana.volume(t) / (1e-3 * t), 1.0, 1e-4);

        // uniformly pressurized penny-shaped crack: w0 = 8 p R / (π E')
        let w0 = 8.0 * ana.net_pressure(t) * ana.radius(t) / (std::f64::consts::PI * 1e10);
        approx_eq(ana.center_opening(t), w0, 1e-15);

        // velocity from finite differences
        let h = 1e-6 * t;
        let v = (ana.radius(t + h) - ana.radius(t - h)) / (2.0 * h);
        approx_eq(ana.velocity(t), v, 1e-8);

        // profile
        assert_eq!(ana.opening(t, 0.6), 0.0);
        approx_eq(ana.opening(t, 0.3), ana.center_opening(t) * f64::sqrt(0.75), 1e-15);
    }
}

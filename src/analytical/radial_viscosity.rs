use crate::StrError;
use std::f64::consts::PI;

/// Solution of the viscosity-dominated radial hydraulic fracture (zero toughness, no leak-off)
///
/// ```text
/// R(t) = 0.6976 (E' Q0³ t⁴ / μ')^{1/9}
/// w(r, t) = 1.1901 (μ'² Q0³ t / E'²)^{1/9} (1 + ρ)^0.487 (1 - ρ)^⅔
/// ```
///
/// The opening profile is the first-order approximation of the zero-toughness similarity
/// solution; its volume exceeds Q0 t by about one percent.
///
/// # Reference
///
/// 1. Savitski AA, Detournay E (2002) Propagation of a penny-shaped fluid-driven fracture in an
///    impermeable rock: asymptotic solutions, International Journal of Solids and Structures,
///    39(26):6311-6337
pub struct RadialViscosity {
    e_prime: f64,  // plane-strain modulus
    mu_prime: f64, // μ' = 12 μ
    q0: f64,       // injection rate
}

impl RadialViscosity {
    /// Allocates a new instance
    ///
    /// * `e_prime` -- plane-strain modulus
    /// * `viscosity` -- dynamic viscosity μ
    /// * `q0` -- injection rate
    pub fn new(e_prime: f64, viscosity: f64, q0: f64) -> Result<Self, StrError> {
        if !(e_prime > 0.0) {
            return Err("the plane-strain modulus must be > 0.0");
        }
        if !(viscosity > 0.0) {
            return Err("the viscosity-dominated solution requires μ > 0.0");
        }
        if !(q0 > 0.0) {
            return Err("the injection rate must be > 0.0");
        }
        Ok(RadialViscosity {
            e_prime,
            mu_prime: 12.0 * viscosity,
            q0,
        })
    }

    /// Calculates the radius
    pub fn radius(&self, t: f64) -> f64 {
        let q3 = self.q0 * self.q0 * self.q0;
        0.6976 * f64::powf(self.e_prime * q3 * f64::powi(t, 4) / self.mu_prime, 1.0 / 9.0)
    }

    /// Calculates the time at which the fracture reaches the given radius
    pub fn time_at_radius(&self, radius: f64) -> Result<f64, StrError> {
        if !(radius > 0.0) {
            return Err("the radius must be > 0.0");
        }
        let q3 = self.q0 * self.q0 * self.q0;
        Ok(f64::powf(f64::powi(radius / 0.6976, 9) * self.mu_prime / (self.e_prime * q3), 0.25))
    }

    /// Returns the opening scale (μ'² Q0³ t / E'²)^{1/9}
    fn opening_scale(&self, t: f64) -> f64 {
        let q3 = self.q0 * self.q0 * self.q0;
        f64::powf(self.mu_prime * self.mu_prime * q3 * t / (self.e_prime * self.e_prime), 1.0 / 9.0)
    }

    /// Calculates the opening at the injection point
    pub fn center_opening(&self, t: f64) -> f64 {
        1.1901 * self.opening_scale(t)
    }

    /// Calculates the opening at distance r from the injection point (zero outside)
    pub fn opening(&self, t: f64, r: f64) -> f64 {
        let rho = r / self.radius(t);
        if rho >= 1.0 {
            return 0.0;
        }
        1.1901 * self.opening_scale(t) * f64::powf(1.0 + rho, 0.487) * f64::powf(1.0 - rho, 2.0 / 3.0)
    }

    /// Calculates the front velocity dR/dt
    pub fn velocity(&self, t: f64) -> f64 {
        4.0 * self.radius(t) / (9.0 * t)
    }

    /// Calculates the fracture volume by midpoint integration of the opening profile
    pub fn volume(&self, t: f64) -> f64 {
        let n = 2000;
        let r = self.radius(t);
        let dr = r / (n as f64);
        let mut sum = 0.0;
        for i in 0..n {
            let ri = (i as f64 + 0.5) * dr;
            sum += self.opening(t, ri) * 2.0 * PI * ri * dr;
        }
        sum
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::RadialViscosity;
    use russell_lab::approx_eq;

    #[test]
    fn new_captures_errors() {
        assert_eq!(
            RadialViscosity::new(1e10, 0.0, 1e-3).err(),
            Some("the viscosity-dominated solution requires μ > 0.0")
        );
        assert_eq!(
            RadialViscosity::new(1e10, 1e-3, -1.0).err(),
            Some("the injection rate must be > 0.0")
        );
    }

    #[test]
    fn formulae_are_consistent() {
        let e_prime = 3.3e9 / (1.0 - 0.16);
        let ana = RadialViscosity::new(e_prime, 30.0, 0.0023e-6).unwrap();
        let t = ana.time_at_radius(0.015).unwrap();
        approx_eq(ana.radius(t), 0.015, 1e-14);

        // the approximate profile carries about 1% more than the injected volume
        let ratio = ana.volume(t) / (0.0023e-6 * t);
        assert!(ratio > 1.0 && ratio < 1.02);

        let h = 1e-6 * t;
        let v = (ana.radius(t + h) - ana.radius(t - h)) / (2.0 * h);
        approx_eq(ana.velocity(t), v, 1e-9);
        assert_eq!(ana.opening(t, 0.015), 0.0);
        approx_eq(ana.opening(t, 0.0), ana.center_opening(t), 1e-15);
    }
}

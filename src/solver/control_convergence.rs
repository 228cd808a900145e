use crate::base::Config;
use crate::StrError;
use russell_lab::{vec_norm, Norm, Vector};

/// Controls the convergence of the Newton iterations and of the front loop
///
/// The Newton iterations converge on either
///
/// 1. the residual norm `‖R‖∞ / w_scale < tol_residual`, or
/// 2. the relative increment `‖δx‖∞ / w_scale < tol_increment`,
///
/// where `w_scale` is the characteristic opening (all unknowns have units of length). The front
/// loop converges when the front and field changes between consecutive outer iterations fall
/// below `tol_front` and `tol_fields`.
pub struct ControlConvergence<'a> {
    config: &'a Config,
    timestep: usize,
    front_iteration: usize,
    iteration: usize,
    norm_rr_prev: f64,
    norm_rr: f64,
    norm_mdu: f64,
    rel_mdu_prev: f64,
    rel_mdu: f64,
    converged_on_norm_rr: bool,
    diverging_on_norm_rr: bool,
    converged_on_rel_mdu: bool,
    diverging_on_rel_mdu: bool,
    front_change: f64,
    field_change: f64,
}

impl<'a> ControlConvergence<'a> {
    /// Allocates a new instance
    pub fn new(config: &'a Config) -> Self {
        ControlConvergence {
            config,
            timestep: 0,
            front_iteration: 0,
            iteration: 0,
            norm_rr_prev: 0.0,
            norm_rr: 0.0,
            norm_mdu: 0.0,
            rel_mdu_prev: 0.0,
            rel_mdu: 0.0,
            converged_on_norm_rr: false,
            diverging_on_norm_rr: false,
            converged_on_rel_mdu: false,
            diverging_on_rel_mdu: false,
            front_change: 0.0,
            field_change: 0.0,
        }
    }

    // setters

    /// Resets the Newton flags before a new flow solve
    pub fn reset(&mut self) {
        self.converged_on_norm_rr = false;
        self.diverging_on_norm_rr = false;
        self.converged_on_rel_mdu = false;
        self.diverging_on_rel_mdu = false;
    }

    /// Records the beginning of a new time step
    pub fn begin_timestep(&mut self, timestep: usize) {
        self.timestep = timestep;
    }

    // getters

    /// Returns true if the Newton iterations have converged
    pub fn converged(&self) -> bool {
        self.converged_on_norm_rr || self.converged_on_rel_mdu
    }

    /// Returns true if both the residual and the increment grew in the last iteration
    pub fn diverging(&self) -> bool {
        self.diverging_on_norm_rr && self.diverging_on_rel_mdu
    }

    /// Returns true if the front loop has converged
    pub fn front_converged(&self) -> bool {
        self.front_iteration > 0
            && self.front_change < self.config.tol_front
            && self.field_change < self.config.tol_fields
    }

    // analysis

    /// Analyzes the residual vector
    pub(crate) fn analyze_rr(&mut self, iteration: usize, rr: &Vector, scale: f64) -> Result<(), StrError> {
        self.iteration = iteration;
        self.norm_rr = vec_norm(rr, Norm::Max) / scale;
        let found_nan_or_inf = !self.norm_rr.is_finite();
        self.converged_on_norm_rr = if found_nan_or_inf {
            false
        } else {
            self.norm_rr < self.config.tol_residual
        };
        self.diverging_on_norm_rr = if found_nan_or_inf || iteration == 0 {
            false
        } else {
            self.norm_rr > self.norm_rr_prev
        };
        self.norm_rr_prev = self.norm_rr;
        if found_nan_or_inf {
            Err("found NaN or Inf in the flow residual")
        } else {
            Ok(())
        }
    }

    /// Analyzes the Newton increment
    pub(crate) fn analyze_mdu(&mut self, iteration: usize, mdu: &Vector, scale: f64) -> Result<(), StrError> {
        self.norm_mdu = vec_norm(mdu, Norm::Max);
        let found_nan_or_inf = !self.norm_mdu.is_finite();
        self.rel_mdu = self.norm_mdu / scale;
        self.converged_on_rel_mdu = if found_nan_or_inf {
            false
        } else {
            self.rel_mdu < self.config.tol_increment
        };
        self.diverging_on_rel_mdu = if found_nan_or_inf || iteration < 2 {
            false
        } else {
            self.rel_mdu > self.rel_mdu_prev
        };
        self.rel_mdu_prev = self.rel_mdu;
        if found_nan_or_inf {
            Err("found NaN or Inf in the Newton increment")
        } else {
            Ok(())
        }
    }

    /// Records the changes between consecutive front iterations
    pub(crate) fn analyze_front(&mut self, front_iteration: usize, front_change: f64, field_change: f64) {
        self.front_iteration = front_iteration;
        self.front_change = front_change;
        self.field_change = field_change;
    }

    // printing

    /// Prints the header before time stepping and convergence statistics
    pub fn print_header(&self) {
        if self.config.verbose_timesteps || self.config.verbose_iterations {
            println!("\nHFSIM === TIME STEPPING AND CONVERGENCE STATISTICS ============================");
            println!("\nLegend:");
            println!("➖ ─ unknown");
            println!("✅ ─ converged");
            println!("🔹 ─ converging");
            println!("🎈 ─ diverging");
            println!("\"front\" means front iteration");
            println!("\"iter\" means Newton iteration\n");
            println!("{}", "─".repeat(79));
            println!(
                "{:8} {:>11} {:>11} {:>5} {:>5} {:>9} {:>9} ➖ {:>9} ➖",
                "timestep", "t", "Δt", "front", "iter", "Δfront", "Δfields", "‖R‖∞"
            );
            println!("{}", "─".repeat(79));
        }
    }

    /// Prints timestep information
    pub(crate) fn print_timestep(&self, t: f64, dt: f64) {
        if self.config.verbose_timesteps {
            println!("{:>8} {:>11.6e} {:>11.6e}", self.timestep + 1, t, dt);
        }
    }

    /// Prints Newton iteration information
    pub(crate) fn print_iteration(&self) {
        if self.config.verbose_iterations {
            let icon_rr = if self.converged_on_norm_rr {
                "✅"
            } else if self.diverging_on_norm_rr {
                "🎈"
            } else {
                "🔹"
            };
            println!(
                "{:>8} {:>11} {:>11} {:>5} {:>5} {:>9} {:>9.2e} ➖ {:>9.2e} {}",
                "·", "·", "·", "·", self.iteration, "·", self.rel_mdu, self.norm_rr, icon_rr
            );
        }
    }

    /// Prints front iteration information
    pub(crate) fn print_front_iteration(&self, n_newton: usize) {
        if self.config.verbose_iterations {
            let icon = if self.front_converged() { "✅" } else { "🔹" };
            println!(
                "{:>8} {:>11} {:>11} {:>5} {:>5} {:>9.2e} {:>9.2e} {} {:>9} ➖",
                "·", "·", "·", self.front_iteration, n_newton, self.front_change, self.field_change, icon, "·"
            );
        }
    }

    /// Prints a message about a rejected trial step
    pub(crate) fn print_rejection(&self, reason: &str, dt_next: f64) {
        if self.config.verbose_timesteps {
            println!("{:>8} {:>11} {:>11.6e} 🎈 {}", "·", "retry", dt_next, reason);
        }
    }

    /// Prints a message about remeshing
    pub(crate) fn print_remesh(&self, lx: f64, ly: f64) {
        if self.config.verbose_timesteps {
            println!("{:>8} remeshing: the domain is now [-{}, {}] × [-{}, {}]", "·", lx, lx, ly, ly);
        }
    }

    /// Prints the horizontal line at the end of the analysis
    pub(crate) fn print_footer(&self) {
        if self.config.verbose_timesteps || self.config.verbose_iterations {
            println!("{}", "─".repeat(79));
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::ControlConvergence;
    use crate::base::Config;
    use russell_lab::Vector;

    #[test]
    fn analyze_rr_and_mdu_work() {
        let mut config = Config::new();
        config.set_verbose(false, false).unwrap();
        config.tol_residual = 1e-8;
        config.tol_increment = 1e-6;
        let mut control = ControlConvergence::new(&config);
        let scale = 1e-3;

        control.reset();
        control.analyze_rr(0, &Vector::from(&[1e-4, -2e-4]), scale).unwrap();
        assert!(!control.converged());
        control.analyze_mdu(0, &Vector::from(&[1e-5, 0.0]), scale).unwrap();
        assert!(!control.converged());

        control.analyze_rr(1, &Vector::from(&[1e-12, 0.0]), scale).unwrap();
        assert!(control.converged());
        assert!(!control.diverging());

        control.reset();
        control.analyze_mdu(1, &Vector::from(&[1e-10, 0.0]), scale).unwrap();
        assert!(control.converged());

        assert_eq!(
            control.analyze_rr(2, &Vector::from(&[f64::NAN]), scale).err(),
            Some("found NaN or Inf in the flow residual")
        );
    }

    #[test]
    fn front_convergence_works() {
        let config = Config::new();
        let mut control = ControlConvergence::new(&config);
        control.analyze_front(0, 0.0, 0.0);
        assert!(!control.front_converged());
        control.analyze_front(1, 0.5 * config.tol_front, 0.5 * config.tol_fields);
        assert!(control.front_converged());
        control.analyze_front(2, 2.0 * config.tol_front, 0.5 * config.tol_fields);
        assert!(!control.front_converged());
    }
}

use crate::tip::TipAsymptote;
use crate::StrError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Defines the smallest allowed dt_min
pub const CONFIG_MIN_DT_MIN: f64 = 1e-12;

/// Defines the smallest allowed tolerance
pub const CONFIG_MIN_TOL: f64 = 1e-15;

/// Holds the parameters controlling time stepping, the front loop and the Newton iterations
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Final time
    pub t_fin: f64,

    /// Initial time increment (if None, it is derived from the initial front velocity)
    pub dt_initial: Option<f64>,

    /// Minimum allowed time increment
    pub dt_min: f64,

    /// Maximum allowed time increment
    pub dt_max: f64,

    /// Multiplier applied to Δt after a fast convergence (≥ 1)
    pub dt_growth_factor: f64,

    /// Multiplier applied to Δt after a failed step (0 < f < 1)
    pub dt_shrink_factor: f64,

    /// A step converging within this number of front iterations counts as fast
    pub fast_convergence_iterations: usize,

    /// Maximum number of consecutive Δt reductions for the same step
    pub max_shrink_attempts: usize,

    /// Prefactor of the front-velocity limit `Δt ≤ prefactor · min(hx, hy) / v_max`
    pub cfl_prefactor: f64,

    /// Maximum number of front (outer) iterations
    pub max_front_iterations: usize,

    /// Maximum number of Newton iterations of the flow solve
    pub max_newton_iterations: usize,

    /// Tolerance on the front change, relative to the element size
    pub tol_front: f64,

    /// Tolerance on the opening and pressure changes between front iterations (relative)
    pub tol_fields: f64,

    /// Tolerance on the flow residual, relative to the largest opening
    pub tol_residual: f64,

    /// Tolerance on the Newton increment, relative to the unknowns
    pub tol_increment: f64,

    /// Initial relaxation of the front update (dynamically adjusted afterwards)
    pub front_relaxation: f64,

    /// Near-tip asymptote used to locate the front
    pub tip_asymptote: TipAsymptote,

    /// Coarsening factor applied when the front reaches the mesh boundary (None means fatal)
    pub remesh_factor: Option<f64>,

    /// Times at which the last sub-step is shortened to land exactly
    pub checkpoint_times: Vec<f64>,

    /// Maximum number of time steps
    pub max_timesteps: usize,

    /// Verbose mode during timesteps
    pub verbose_timesteps: bool,

    /// Verbose mode during iterations
    pub verbose_iterations: bool,
}

impl Config {
    /// Allocates a new instance with default values
    pub fn new() -> Self {
        Config {
            t_fin: 1.0,
            dt_initial: None,
            dt_min: 1e-10,
            dt_max: 1e10,
            dt_growth_factor: 1.25,
            dt_shrink_factor: 0.5,
            fast_convergence_iterations: 6,
            max_shrink_attempts: 8,
            cfl_prefactor: 0.8,
            max_front_iterations: 40,
            max_newton_iterations: 25,
            tol_front: 1e-3,
            tol_fields: 1e-4,
            tol_residual: 1e-10,
            tol_increment: 1e-10,
            front_relaxation: 0.5,
            tip_asymptote: TipAsymptote::Universal,
            remesh_factor: None,
            checkpoint_times: Vec::new(),
            max_timesteps: 10_000,
            verbose_timesteps: true,
            verbose_iterations: false,
        }
    }

    /// Sets the final time
    pub fn set_t_fin(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if !(value > 0.0) {
            return Err("t_fin must be > 0.0");
        }
        self.t_fin = value;
        Ok(self)
    }

    /// Sets the initial time increment
    pub fn set_dt_initial(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if !(value > 0.0) {
            return Err("dt_initial must be > 0.0");
        }
        self.dt_initial = Some(value);
        Ok(self)
    }

    /// Sets the minimum and maximum time increments
    pub fn set_dt_bounds(&mut self, dt_min: f64, dt_max: f64) -> Result<&mut Self, StrError> {
        if !(dt_min >= CONFIG_MIN_DT_MIN) {
            return Err("dt_min must be ≥ CONFIG_MIN_DT_MIN");
        }
        if !(dt_max > dt_min) {
            return Err("dt_max must be > dt_min");
        }
        self.dt_min = dt_min;
        self.dt_max = dt_max;
        Ok(self)
    }

    /// Sets the growth and shrink factors of Δt
    pub fn set_dt_factors(&mut self, growth: f64, shrink: f64) -> Result<&mut Self, StrError> {
        if !(growth >= 1.0) {
            return Err("the growth factor must be ≥ 1.0");
        }
        if !(shrink > 0.0 && shrink < 1.0) {
            return Err("the shrink factor must satisfy 0 < f < 1");
        }
        self.dt_growth_factor = growth;
        self.dt_shrink_factor = shrink;
        Ok(self)
    }

    /// Sets the tolerances of the front loop
    pub fn set_tolerances(&mut self, tol_front: f64, tol_fields: f64) -> Result<&mut Self, StrError> {
        if !(tol_front >= CONFIG_MIN_TOL) || !(tol_fields >= CONFIG_MIN_TOL) {
            return Err("tolerances must be ≥ CONFIG_MIN_TOL");
        }
        self.tol_front = tol_front;
        self.tol_fields = tol_fields;
        Ok(self)
    }

    /// Sets the near-tip asymptote
    pub fn set_tip_asymptote(&mut self, asymptote: TipAsymptote) -> Result<&mut Self, StrError> {
        self.tip_asymptote = asymptote;
        Ok(self)
    }

    /// Sets the remeshing option (only a coarsening factor of 2.0 is supported)
    pub fn set_remesh_factor(&mut self, factor: Option<f64>) -> Result<&mut Self, StrError> {
        if let Some(value) = factor {
            if value != 2.0 {
                return Err("the remesh factor must be 2.0");
            }
        }
        self.remesh_factor = factor;
        Ok(self)
    }

    /// Sets the checkpoint times (they are sorted)
    pub fn set_checkpoint_times(&mut self, times: &[f64]) -> Result<&mut Self, StrError> {
        if times.iter().any(|t| !(*t > 0.0)) {
            return Err("checkpoint times must be > 0.0");
        }
        let mut sorted = times.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        self.checkpoint_times = sorted;
        Ok(self)
    }

    /// Sets the verbose flags
    pub fn set_verbose(&mut self, timesteps: bool, iterations: bool) -> Result<&mut Self, StrError> {
        self.verbose_timesteps = timesteps;
        self.verbose_iterations = iterations;
        Ok(self)
    }

    /// Validates all data
    ///
    /// Returns a message with the inconsistent data, or returns None if everything is all right.
    pub fn validate(&self) -> Option<String> {
        if !(self.t_fin > 0.0) {
            return Some(format!("t_fin = {:?} is incorrect; it must be > 0.0", self.t_fin));
        }
        if let Some(dt) = self.dt_initial {
            if !(dt >= self.dt_min) {
                return Some(format!(
                    "dt_initial = {:?} is incorrect; it must be ≥ dt_min = {:?}",
                    dt, self.dt_min
                ));
            }
        }
        if !(self.dt_min >= CONFIG_MIN_DT_MIN) {
            return Some(format!(
                "dt_min = {:?} is incorrect; it must be ≥ {:e}",
                self.dt_min, CONFIG_MIN_DT_MIN
            ));
        }
        if !(self.dt_max > self.dt_min) {
            return Some(format!(
                "dt_max = {:?} is incorrect; it must be > dt_min = {:?}",
                self.dt_max, self.dt_min
            ));
        }
        if !(self.dt_growth_factor >= 1.0) {
            return Some(format!(
                "dt_growth_factor = {:?} is incorrect; it must be ≥ 1.0",
                self.dt_growth_factor
            ));
        }
        if !(self.dt_shrink_factor > 0.0 && self.dt_shrink_factor < 1.0) {
            return Some(format!(
                "dt_shrink_factor = {:?} is incorrect; it must be 0.0 < f < 1.0",
                self.dt_shrink_factor
            ));
        }
        if !(self.cfl_prefactor > 0.0 && self.cfl_prefactor <= 1.0) {
            return Some(format!(
                "cfl_prefactor = {:?} is incorrect; it must be 0.0 < f ≤ 1.0",
                self.cfl_prefactor
            ));
        }
        if self.max_front_iterations < 1 || self.max_newton_iterations < 1 {
            return Some("the maximum numbers of iterations must be ≥ 1".to_string());
        }
        for (name, tol) in [
            ("tol_front", self.tol_front),
            ("tol_fields", self.tol_fields),
            ("tol_residual", self.tol_residual),
            ("tol_increment", self.tol_increment),
        ] {
            if !(tol >= CONFIG_MIN_TOL) {
                return Some(format!("{} = {:?} is incorrect; it must be ≥ {:e}", name, tol, CONFIG_MIN_TOL));
            }
        }
        if !(self.front_relaxation > 0.0 && self.front_relaxation <= 1.0) {
            return Some(format!(
                "front_relaxation = {:?} is incorrect; it must be 0.0 < ω ≤ 1.0",
                self.front_relaxation
            ));
        }
        if let Some(factor) = self.remesh_factor {
            if factor != 2.0 {
                return Some(format!("remesh_factor = {:?} is incorrect; it must be 2.0", factor));
            }
        }
        None // all good
    }

    /// Returns the first checkpoint time strictly after t (or t_fin)
    pub fn next_target(&self, t: f64) -> f64 {
        for tc in &self.checkpoint_times {
            if *tc > t && *tc < self.t_fin {
                return *tc;
            }
        }
        self.t_fin
    }

    /// Returns true if t coincides with a checkpoint time or t_fin
    pub fn is_checkpoint(&self, t: f64) -> bool {
        let tol = 1e-12 * f64::max(1.0, self.t_fin);
        f64::abs(t - self.t_fin) < tol || self.checkpoint_times.iter().any(|tc| f64::abs(t - tc) < tol)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration data\n")?;
        write!(f, "==================\n")?;
        write!(f, "t_fin = {:?}\n", self.t_fin)?;
        write!(f, "dt_initial = {:?}\n", self.dt_initial)?;
        write!(f, "dt_min = {:?}\n", self.dt_min)?;
        write!(f, "dt_max = {:?}\n", self.dt_max)?;
        write!(f, "dt_growth_factor = {:?}\n", self.dt_growth_factor)?;
        write!(f, "dt_shrink_factor = {:?}\n", self.dt_shrink_factor)?;
        write!(f, "cfl_prefactor = {:?}\n", self.cfl_prefactor)?;
        write!(f, "tol_front = {:?}\n", self.tol_front)?;
        write!(f, "tol_fields = {:?}\n", self.tol_fields)?;
        write!(f, "tip_asymptote = {:?}\n", self.tip_asymptote)?;
        write!(f, "remesh_factor = {:?}\n", self.remesh_factor)?;
        write!(f, "checkpoint_times = {:?}\n", self.checkpoint_times)?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

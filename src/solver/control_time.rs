use super::FractureState;
use crate::base::Config;
use crate::StrError;

/// Assists in the time loop control
///
/// The proposed increment follows
///
/// ```text
/// Δt = min(Δt_prev · growth, Δt_max, prefactor · min(hx, hy) / v_max)
/// ```
///
/// where the growth factor only applies after a fast convergence. The trial increment is the
/// proposal truncated to land on the next checkpoint (or t_fin); the truncation is not
/// remembered by the next proposal. After a failed trial the increment is multiplied by the
/// shrink factor.
pub struct ControlTime<'a> {
    /// Holds configuration parameters
    config: &'a Config,

    /// Next untruncated increment
    dt_proposed: f64,

    /// Number of failed trials in the current step
    n_shrink: usize,
}

impl<'a> ControlTime<'a> {
    /// Allocates a new instance
    pub fn new(config: &'a Config) -> Result<Self, StrError> {
        if config.validate().is_some() {
            return Err("cannot allocate ControlTime because config.validate() failed");
        }
        Ok(ControlTime {
            config,
            dt_proposed: 0.0,
            n_shrink: 0,
        })
    }

    /// Initializes the first increment from dt_initial or from the initial front velocity
    pub fn initialize(&mut self, state: &FractureState) -> Result<(), StrError> {
        self.n_shrink = 0;
        self.dt_proposed = match self.config.dt_initial {
            Some(dt) => dt,
            None => {
                let dt = self.cfl_limit(state);
                if !dt.is_finite() {
                    return Err("an initial Δt is required when the initial front velocity is zero");
                }
                f64::max(f64::min(dt, self.config.dt_max), self.config.dt_min)
            }
        };
        Ok(())
    }

    /// Returns the increment that keeps the front from advancing more than a fraction of an element
    ///
    /// Returns infinity if the front is stationary.
    pub fn cfl_limit(&self, state: &FractureState) -> f64 {
        let v_max = state.max_front_velocity();
        if v_max > 0.0 {
            self.config.cfl_prefactor * state.mesh.min_size() / v_max
        } else {
            f64::INFINITY
        }
    }

    /// Returns the next untruncated increment
    pub fn dt_proposed(&self) -> f64 {
        self.dt_proposed
    }

    /// Returns the trial increment at time t (truncated at the next checkpoint or t_fin)
    pub fn trial_dt(&self, t: f64) -> f64 {
        let target = self.config.next_target(t);
        f64::min(self.dt_proposed, target - t)
    }

    /// Updates the proposal after an accepted step
    ///
    /// `front_iterations` is the number of front iterations of the accepted step and `state` is
    /// the committed state.
    pub fn accept(&mut self, front_iterations: usize, state: &FractureState) {
        let mut dt = self.dt_proposed;
        if front_iterations <= self.config.fast_convergence_iterations {
            dt *= self.config.dt_growth_factor;
        }
        dt = f64::min(dt, self.config.dt_max);
        dt = f64::min(dt, self.cfl_limit(state));
        self.dt_proposed = f64::max(dt, self.config.dt_min);
        self.n_shrink = 0;
    }

    /// Shrinks the increment after a failed trial with increment `dt_tried`
    ///
    /// Returns an error when the number of reductions exceeds the maximum or Δt falls below dt_min.
    pub fn reject(&mut self, dt_tried: f64) -> Result<(), StrError> {
        self.n_shrink += 1;
        self.dt_proposed = dt_tried * self.config.dt_shrink_factor;
        if self.n_shrink > self.config.max_shrink_attempts || self.dt_proposed < self.config.dt_min {
            return Err("time step failed to converge after the maximum number of Δt reductions");
        }
        Ok(())
    }

    /// Keeps the proposal within the CFL limit of a new state (e.g., after remeshing)
    pub fn limit(&mut self, state: &FractureState) {
        self.dt_proposed = f64::max(f64::min(self.dt_proposed, self.cfl_limit(state)), self.config.dt_min);
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::ControlTime;
    use crate::base::{Config, MaterialFields, Samples};
    use crate::elasticity::ElasticityOperator;
    use crate::solver::{FractureState, InitialCondition};
    use crate::StrError;
    use russell_lab::approx_eq;

    fn static_state() -> Result<FractureState, StrError> {
        let sample = Samples::radial_toughness()?;
        let materials = MaterialFields::new(&sample.mesh, &sample.solid)?;
        let mut elasticity = ElasticityOperator::new(&sample.mesh, sample.solid.e_prime)?;
        let initial = InitialCondition::Static {
            radius: 0.5,
            net_pressure: 1e6,
        };
        initial.build(
            &sample.mesh,
            &materials,
            &sample.fluid.rheology,
            &sample.injection,
            &Config::new(),
            &mut elasticity,
        )
    }

    #[test]
    fn initialize_requires_dt_for_stationary_fronts() -> Result<(), StrError> {
        let state = static_state()?;
        let config = Config::new();
        let mut control = ControlTime::new(&config)?;
        assert_eq!(
            control.initialize(&state).err(),
            Some("an initial Δt is required when the initial front velocity is zero")
        );
        let mut config = Config::new();
        config.set_dt_initial(0.1)?;
        let mut control = ControlTime::new(&config)?;
        control.initialize(&state)?;
        assert_eq!(control.dt_proposed(), 0.1);
        Ok(())
    }

    #[test]
    fn cfl_limit_works() -> Result<(), StrError> {
        let mut state = static_state()?;
        let config = Config::new();
        let control = ControlTime::new(&config)?;
        for v in state.velocity.iter_mut() {
            *v = 2.0;
        }
        approx_eq(control.cfl_limit(&state), 0.8 * 0.1 / 2.0, 1e-15);
        Ok(())
    }

    #[test]
    fn dt_adaptation_is_monotonic() -> Result<(), StrError> {
        let state = static_state()?;
        let mut config = Config::new();
        config.set_t_fin(100.0)?.set_dt_initial(1.0)?.set_dt_factors(1.5, 0.5)?;
        config.max_shrink_attempts = 4;
        let mut control = ControlTime::new(&config)?;
        control.initialize(&state)?;

        // consecutive failures strictly decrease Δt
        let mut dt = control.trial_dt(0.0);
        for _ in 0..4 {
            control.reject(dt)?;
            let next = control.trial_dt(0.0);
            assert!(next < dt);
            dt = next;
        }
        approx_eq(dt, 1.0 / 16.0, 1e-15);
        assert_eq!(
            control.reject(dt).err(),
            Some("time step failed to converge after the maximum number of Δt reductions")
        );

        // consecutive fast convergences do not decrease Δt
        let mut control = ControlTime::new(&config)?;
        control.initialize(&state)?;
        let mut dt = control.dt_proposed();
        for _ in 0..5 {
            control.accept(1, &state);
            assert!(control.dt_proposed() >= dt);
            dt = control.dt_proposed();
        }
        approx_eq(dt, f64::powi(1.5, 5), 1e-12);

        // slow convergence keeps Δt
        control.accept(config.fast_convergence_iterations + 1, &state);
        assert_eq!(control.dt_proposed(), dt);
        Ok(())
    }

    #[test]
    fn trial_dt_lands_on_checkpoints() -> Result<(), StrError> {
        let state = static_state()?;
        let mut config = Config::new();
        config.set_t_fin(10.0)?.set_dt_initial(3.0)?.set_checkpoint_times(&[4.0])?;
        let mut control = ControlTime::new(&config)?;
        control.initialize(&state)?;
        assert_eq!(control.trial_dt(0.0), 3.0);
        assert_eq!(control.trial_dt(3.0), 1.0);
        assert_eq!(control.trial_dt(8.0), 2.0);
        // the truncation is not remembered
        control.accept(config.fast_convergence_iterations + 1, &state);
        assert_eq!(control.dt_proposed(), 3.0);
        Ok(())
    }
}

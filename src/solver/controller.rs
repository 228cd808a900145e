use super::{coarsen, ControlConvergence, ControlTime, FractureState, FrontLoop, FrontLoopOutcome};
use super::{SimulationInput, StepRecord, TrialSolution};
use crate::base::MaterialFields;
use crate::elasticity::ElasticityOperator;
use crate::front::FrontTracker;
use crate::StrError;

/// Indicates how far a run went
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// No step was attempted yet
    Ready,

    /// Time stepping is in progress
    Running,

    /// The final time was reached
    Finished,

    /// The output function asked to stop
    Stopped,

    /// The maximum number of time steps was reached before the final time
    MaxTimesteps,

    /// A step failed after the maximum number of Δt reductions
    Diverged,

    /// The front reached the boundary of the mesh and remeshing is disabled
    DomainExhausted,

    /// The run was aborted by an inconsistency in the data
    Failed,
}

/// Drives the time stepping
///
/// The controller owns the committed state. Each call to [Controller::step] tries trial steps
/// until the front loop converges, shrinking Δt after each failure, and commits the converged
/// trial. Errors leave the last committed state untouched (see [Controller::state]).
pub struct Controller<'a> {
    /// Holds the input data
    input: &'a SimulationInput,

    /// Material fields on the current mesh
    materials: MaterialFields,

    /// Elasticity operator of the current mesh
    elasticity: ElasticityOperator,

    /// Last committed state
    state: FractureState,

    /// Time step control
    control_time: ControlTime<'a>,

    /// Convergence control and reporting
    control_conv: ControlConvergence<'a>,

    /// Status of the run
    status: RunStatus,
}

impl<'a> Controller<'a> {
    /// Allocates a new instance and builds the initial state
    pub fn new(input: &'a SimulationInput) -> Result<Self, StrError> {
        if let Some(msg) = input.config.validate() {
            println!("ERROR: {}", msg);
            return Err("cannot allocate controller because config.validate() failed");
        }
        input.solid.validate()?;
        input.fluid.rheology.validate()?;
        input.injection.validate()?;
        let materials = MaterialFields::new(&input.mesh, &input.solid)?;
        let mut elasticity = ElasticityOperator::new(&input.mesh, input.solid.e_prime)?;
        let state = input.initial.build(
            &input.mesh,
            &materials,
            &input.fluid.rheology,
            &input.injection,
            &input.config,
            &mut elasticity,
        )?;
        let mut control_time = ControlTime::new(&input.config)?;
        control_time.initialize(&state)?;
        Ok(Controller {
            input,
            materials,
            elasticity,
            state,
            control_time,
            control_conv: ControlConvergence::new(&input.config),
            status: RunStatus::Ready,
        })
    }

    /// Returns the last committed state
    pub fn state(&self) -> &FractureState {
        &self.state
    }

    /// Returns the status of the run
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Returns the Δt that the next step will try (before truncation at checkpoints)
    pub fn dt_proposed(&self) -> f64 {
        self.control_time.dt_proposed()
    }

    /// Performs one accepted time step
    pub fn step(&mut self) -> Result<(), StrError> {
        let input = self.input;
        let config = &input.config;
        self.status = RunStatus::Running;
        self.control_conv.begin_timestep(self.state.n_timestep);
        loop {
            let t = self.state.t;
            let dt = self.control_time.trial_dt(t);
            if !(dt > 0.0) {
                self.status = RunStatus::Failed;
                return Err("the final time has already been reached");
            }
            self.control_conv.print_timestep(t + dt, dt);
            let front_loop = FrontLoop::new(config, &self.materials, &input.fluid.rheology, &input.injection);
            let outcome = match front_loop.run(&self.state, &mut self.elasticity, dt, &mut self.control_conv) {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.status = RunStatus::Failed;
                    return Err(e);
                }
            };
            match outcome {
                FrontLoopOutcome::Converged(trial) => {
                    let iterations = trial.front_iterations;
                    self.commit(trial, config.next_target(t));
                    self.control_time.accept(iterations, &self.state);
                    return Ok(());
                }
                FrontLoopOutcome::Diverged(reason) => self.retry(reason, dt)?,
                FrontLoopOutcome::NeedsSmallerStep => self.retry("the front advanced more than one element", dt)?,
                FrontLoopOutcome::DomainExhausted => {
                    if config.remesh_factor.is_none() {
                        self.status = RunStatus::DomainExhausted;
                        return Err("fracture front reached the boundary of the mesh");
                    }
                    self.remesh()?;
                }
            }
        }
    }

    /// Runs until the final time without output
    pub fn run(&mut self) -> Result<(), StrError> {
        self.run_with(|_, _| true)
    }

    /// Runs until the final time calling `output(state, at_checkpoint)` after each commit
    ///
    /// The output function is also called once with the initial state. Returning false stops the
    /// run cleanly between steps.
    pub fn run_with<F>(&mut self, mut output: F) -> Result<(), StrError>
    where
        F: FnMut(&FractureState, bool) -> bool,
    {
        let input = self.input;
        let config = &input.config;
        self.control_conv.print_header();
        if !output(&self.state, false) {
            self.status = RunStatus::Stopped;
            self.control_conv.print_footer();
            return Ok(());
        }
        self.status = RunStatus::Running;
        while self.state.t < config.t_fin {
            if self.state.n_timestep >= config.max_timesteps {
                self.status = RunStatus::MaxTimesteps;
                break;
            }
            if let Err(e) = self.step() {
                self.control_conv.print_footer();
                return Err(e);
            }
            if !output(&self.state, config.is_checkpoint(self.state.t)) {
                self.status = RunStatus::Stopped;
                break;
            }
        }
        if self.status == RunStatus::Running {
            self.status = RunStatus::Finished;
        }
        self.control_conv.print_footer();
        Ok(())
    }

    /// Shrinks Δt after a failed trial
    fn retry(&mut self, reason: &str, dt: f64) -> Result<(), StrError> {
        if let Err(e) = self.control_time.reject(dt) {
            self.status = RunStatus::Diverged;
            return Err(e);
        }
        self.control_conv.print_rejection(reason, self.control_time.dt_proposed());
        Ok(())
    }

    /// Coarsens the mesh and rebuilds the operators
    fn remesh(&mut self) -> Result<(), StrError> {
        let input = self.input;
        let remeshed = match coarsen(
            &self.state,
            &input.solid,
            &input.fluid.rheology,
            input.config.tip_asymptote,
        ) {
            Ok(remeshed) => remeshed,
            Err(e) => {
                self.status = RunStatus::Failed;
                return Err(e);
            }
        };
        self.state = remeshed.state;
        self.materials = remeshed.materials;
        self.elasticity = remeshed.elasticity;
        self.control_time.limit(&self.state);
        self.control_conv.print_remesh(self.state.mesh.lx, self.state.mesh.ly);
        Ok(())
    }

    /// Commits a converged trial (the time snaps to `target` if it lands on it)
    fn commit(&mut self, trial: TrialSolution, target: f64) {
        let state = &mut self.state;
        let mut t = state.t + trial.dt;
        if f64::abs(t - target) <= 1e-12 * f64::max(1.0, f64::abs(target)) {
            t = target;
        }
        state.t = t;
        state.dt = trial.dt;
        state.n_timestep += 1;
        for (total, step) in state.leaked.iter_mut().zip(&trial.leaked) {
            *total += step;
        }
        state.leaked_volume += trial.leaked.iter().sum::<f64>();
        state.injected_volume += trial.injected;
        state.opening = trial.opening;
        state.net_pressure = trial.net_pressure;
        state.level_set = trial.level_set;
        state.regions = trial.regions;
        state.velocity = trial.velocity;
        state.regime = trial.regime;
        state.arrival_time = trial.arrival_time;
        state.front = FrontTracker::new(&state.mesh).reconstruct(&state.level_set, &state.velocity, &state.regime);
        let record = StepRecord {
            t,
            dt: trial.dt,
            front_iterations: trial.front_iterations,
            newton_iterations: trial.newton_iterations,
            n_active: state.regions.active.len(),
            volume: state.fracture_volume(),
            max_velocity: state.max_front_velocity(),
        };
        state.history.push(record);
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

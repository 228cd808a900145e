use super::{ControlConvergence, EhlSolver, FractureState};
use crate::base::{CartesianMesh, Config, MaterialFields, ParamInjection, Rheology};
use crate::elasticity::ElasticityOperator;
use crate::flow::{arrival_estimate, carter_volume, FlowInput, FlowSystem};
use crate::front::{max_front_advance, FrontRegions, FrontTracker, LevelSet};
use crate::tip::{tip_average, TipAsymptote, TipRegime};
use crate::StrError;
use std::collections::VecDeque;

/// Smallest Aitken relaxation factor
const RELAXATION_MIN: f64 = 0.05;

/// Number of consecutive growing front changes that flags divergence
const N_GROWING_MAX: usize = 3;

/// Holds the fields of a converged trial step
#[derive(Clone, Debug)]
pub struct TrialSolution {
    /// Time increment
    pub dt: f64,

    /// Opening (per element)
    pub opening: Vec<f64>,

    /// Net pressure (per element)
    pub net_pressure: Vec<f64>,

    /// Level set at the end of the step
    pub level_set: LevelSet,

    /// Regions at the end of the step
    pub regions: FrontRegions,

    /// Front velocity (per element)
    pub velocity: Vec<f64>,

    /// Regime used during the step (per element)
    pub regime: Vec<TipRegime>,

    /// Arrival time of the fluid (per element)
    pub arrival_time: Vec<Option<f64>>,

    /// Leak-off volume over the step (per element)
    pub leaked: Vec<f64>,

    /// Volume injected over the step
    pub injected: f64,

    /// Number of front iterations
    pub front_iterations: usize,

    /// Number of Newton iterations summed over all front iterations
    pub newton_iterations: usize,
}

/// Defines the outcome of the front loop over a trial step
#[derive(Clone, Debug)]
pub enum FrontLoopOutcome {
    /// The front, opening and pressure are consistent
    Converged(TrialSolution),

    /// The iterations failed (the message tells why)
    Diverged(&'static str),

    /// The front would advance more than one element in one step
    NeedsSmallerStep,

    /// The active set reached the boundary of the mesh
    DomainExhausted,
}

/// Selects the regime of every element from the ribbon elements at the start of a step
///
/// Each ribbon element gets the regime selected from its distance to the front and velocity;
/// every other element takes the regime of the closest ribbon element (breadth-first over the
/// lattice).
pub fn select_regimes(
    mesh: &CartesianMesh,
    level_set: &LevelSet,
    regions: &FrontRegions,
    velocity: &[f64],
    materials: &MaterialFields,
    rheology: &Rheology,
    asymptote: TipAsymptote,
) -> Vec<TipRegime> {
    let n = mesh.n_element();
    let fallback = asymptote.select(&materials.tip_params(0, rheology), mesh.min_size(), 0.0);
    let mut regime: Vec<Option<TipRegime>> = vec![None; n];
    let mut queue = VecDeque::new();
    for r in &regions.ribbon {
        let params = materials.tip_params(*r, rheology);
        let s = f64::max(level_set.distance(*r), 0.0);
        regime[*r] = Some(asymptote.select(&params, s, velocity[*r]));
        queue.push_back(*r);
    }
    while let Some(e) = queue.pop_front() {
        for f in mesh.neighbors(e).iter().flatten() {
            if regime[*f].is_none() {
                regime[*f] = regime[e];
                queue.push_back(*f);
            }
        }
    }
    regime.iter().map(|r| r.unwrap_or(fallback)).collect()
}

/// Iterates on the front position, the opening and the pressure over one trial step
///
/// The ribbon distances to the front are the iteration variables:
///
/// 1. TrialStep: extrapolate the distances with the last accepted velocities
/// 2. DomainGuess: rebuild the level set and the regions (fast marching)
/// 3. ElasticitySolve and FlowSolve: Newton iterations on the coupled system
/// 4. ConsistencyCheck: invert the tip asymptote at the ribbon openings and compare
///
/// The distances are updated with Aitken's dynamic relaxation until the changes fall below the
/// tolerances.
pub struct FrontLoop<'a> {
    config: &'a Config,
    materials: &'a MaterialFields,
    rheology: &'a Rheology,
    injection: &'a ParamInjection,
}

impl<'a> FrontLoop<'a> {
    /// Allocates a new instance
    pub fn new(
        config: &'a Config,
        materials: &'a MaterialFields,
        rheology: &'a Rheology,
        injection: &'a ParamInjection,
    ) -> Self {
        FrontLoop {
            config,
            materials,
            rheology,
            injection,
        }
    }

    /// Runs the front loop over [t, t + Δt] starting from the committed state
    ///
    /// Only inconsistent input is returned as an error; failures of the iterations are reported
    /// through the outcome.
    pub fn run(
        &self,
        state: &FractureState,
        elasticity: &mut ElasticityOperator,
        dt: f64,
        control: &mut ControlConvergence,
    ) -> Result<FrontLoopOutcome, StrError> {
        if !(dt > 0.0) {
            return Err("Δt must be > 0.0");
        }
        let mesh = &state.mesh;
        let n = mesh.n_element();
        let area = mesh.area();
        let t = state.t;
        let tracker = FrontTracker::new(mesh);
        let source_element = match mesh.locate(self.injection.source[0], self.injection.source[1]) {
            Some(e) => e,
            None => return Err("the injection point is outside the mesh"),
        };
        let injected = self.injection.volume(t, t + dt);
        let regime = select_regimes(
            mesh,
            &state.level_set,
            &state.regions,
            &state.velocity,
            self.materials,
            self.rheology,
            self.config.tip_asymptote,
        );

        // trial step
        let ribbon = &state.regions.ribbon;
        let s0: Vec<f64> = ribbon.iter().map(|r| f64::max(state.level_set.distance(*r), 0.0)).collect();
        let mut s: Vec<f64> = ribbon
            .iter()
            .zip(&s0)
            .map(|(r, s_old)| s_old + f64::max(state.velocity[*r], 0.0) * dt)
            .collect();
        let s_max: Vec<f64> = s0.iter().map(|s_old| s_old + 4.0 * mesh.diagonal()).collect();

        // iteration data
        let solver = EhlSolver::new(self.config);
        let mut opening_guess = state.opening.clone();
        let mut pressure_guess = state.net_pressure.clone();
        let mut previous_fields: Option<(Vec<f64>, Vec<f64>)> = None;
        let mut previous_increment: Option<Vec<f64>> = None;
        let mut omega = self.config.front_relaxation;
        let mut change_prev = f64::INFINITY;
        let mut n_growing = 0;
        let mut newton_iterations = 0;

        for k in 0..self.config.max_front_iterations {
            // domain guess
            let level_set = tracker.advance_to(&state.level_set, &state.regions, &s)?;
            let regions = FrontRegions::build(mesh, &level_set, Some(&state.regions))?;
            // a front that overshoots by more than one element must first retry with a smaller Δt
            if max_front_advance(&state.level_set, &level_set, ribbon) > mesh.min_size() {
                return Ok(FrontLoopOutcome::NeedsSmallerStep);
            }
            if regions.touches_boundary(mesh) {
                return Ok(FrontLoopOutcome::DomainExhausted);
            }
            if !regions.is_active(source_element) {
                return Err("the injection point must be inside the fracture");
            }
            elasticity.ensure_coverage(&regions.active)?;

            // velocity, tip openings, leak-off and sources
            let velocity: Vec<f64> = (0..n)
                .map(|e| f64::max(state.level_set.values[e] - level_set.values[e], 0.0) / dt)
                .collect();
            let mut tip_opening = vec![0.0; n];
            let mut filled = vec![1.0; n];
            for e in &regions.tip {
                let params = self.materials.tip_params(*e, self.rheology);
                let normal = level_set.normal(mesh, *e);
                let avg = tip_average(
                    regime[*e],
                    &params,
                    level_set.values[*e],
                    normal,
                    mesh.hx,
                    mesh.hy,
                    velocity[*e],
                );
                tip_opening[*e] = avg.opening;
                filled[*e] = avg.filled;
            }
            let mut arrival_time = state.arrival_time.clone();
            let mut leaked = vec![0.0; n];
            let mut source = vec![0.0; n];
            for e in &regions.active {
                let arrival = match arrival_time[*e] {
                    Some(value) => value,
                    None => {
                        let value = arrival_estimate(t, dt);
                        arrival_time[*e] = Some(value);
                        value
                    }
                };
                leaked[*e] = carter_volume(self.materials.c_prime[*e], filled[*e] * area, arrival, t, dt);
                source[*e] = -leaked[*e] / area;
            }
            source[source_element] += injected / area;

            // elasticity and flow
            let input = FlowInput {
                mesh,
                regions: &regions,
                level_set: &level_set,
                materials: self.materials,
                rheology: self.rheology,
                opening_old: &state.opening,
                tip_opening: &tip_opening,
                regime: &regime,
                velocity: &velocity,
                source: &source,
                dt,
            };
            let system = FlowSystem::new(&input, elasticity)?;
            let mut x = system.initial_guess(&opening_guess, &pressure_guess);
            match solver.solve(&system, &mut x, control) {
                Ok(iterations) => newton_iterations += iterations,
                Err(_) => return Ok(FrontLoopOutcome::Diverged("the flow solve did not converge")),
            }
            let (w, p) = system.fields(&x);
            let mut opening = vec![0.0; n];
            let mut net_pressure = vec![0.0; n];
            for (i, e) in system.active.iter().enumerate() {
                opening[*e] = w[i];
                net_pressure[*e] = p[i] - self.materials.sigma0[*e];
            }

            // consistency check
            let mut s_new = vec![0.0; ribbon.len()];
            for (m, r) in ribbon.iter().enumerate() {
                let params = self.materials.tip_params(*r, self.rheology);
                s_new[m] = regime[*r].invert(&params, opening[*r], s0[m], dt, s_max[m])?;
            }
            let increment: Vec<f64> = s_new.iter().zip(&s).map(|(a, b)| a - b).collect();
            let front_change = increment.iter().fold(0.0, |acc: f64, d| f64::max(acc, f64::abs(*d))) / mesh.min_size();
            let field_change = match &previous_fields {
                Some((w_prev, p_prev)) => relative_change(&regions.active, &opening, w_prev, &net_pressure, p_prev),
                None => f64::INFINITY,
            };
            control.analyze_front(k, front_change, field_change);
            control.print_front_iteration(newton_iterations);

            if control.front_converged() {
                if regions.channel.iter().any(|e| opening[*e] < 0.0) {
                    return Ok(FrontLoopOutcome::Diverged("negative opening in the channel"));
                }
                return Ok(FrontLoopOutcome::Converged(TrialSolution {
                    dt,
                    opening,
                    net_pressure,
                    level_set,
                    regions,
                    velocity,
                    regime,
                    arrival_time,
                    leaked,
                    injected,
                    front_iterations: k + 1,
                    newton_iterations,
                }));
            }

            // divergence
            if k > 0 && front_change > change_prev {
                n_growing += 1;
                if n_growing >= N_GROWING_MAX {
                    return Ok(FrontLoopOutcome::Diverged("the front change keeps growing"));
                }
            } else {
                n_growing = 0;
            }
            change_prev = front_change;

            // Aitken relaxation
            if let Some(prev) = &previous_increment {
                let mut num = 0.0;
                let mut den = 0.0;
                for (a, b) in increment.iter().zip(prev) {
                    num += b * (a - b);
                    den += (a - b) * (a - b);
                }
                if den > 0.0 {
                    omega = f64::min(f64::max(-omega * num / den, RELAXATION_MIN), 1.0);
                }
            }
            for (m, value) in s.iter_mut().enumerate() {
                *value = f64::max(*value + omega * increment[m], s0[m]);
            }
            previous_increment = Some(increment);
            opening_guess.copy_from_slice(&opening);
            pressure_guess.copy_from_slice(&net_pressure);
            previous_fields = Some((opening, net_pressure));
        }
        Ok(FrontLoopOutcome::Diverged("the maximum number of front iterations was reached"))
    }
}

/// Returns the largest change of opening and net pressure relative to their magnitudes
fn relative_change(active: &[usize], w: &[f64], w_prev: &[f64], p: &[f64], p_prev: &[f64]) -> f64 {
    let mut w_scale = f64::MIN_POSITIVE;
    let mut p_scale = f64::MIN_POSITIVE;
    let mut dw = 0.0;
    let mut dp = 0.0;
    for e in active {
        w_scale = f64::max(w_scale, f64::abs(w[*e]));
        p_scale = f64::max(p_scale, f64::abs(p[*e]));
        dw = f64::max(dw, f64::abs(w[*e] - w_prev[*e]));
        dp = f64::max(dp, f64::abs(p[*e] - p_prev[*e]));
    }
    f64::max(dw / w_scale, dp / p_scale)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

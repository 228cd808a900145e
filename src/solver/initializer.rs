use super::{select_regimes, FractureState};
use crate::analytical::{RadialToughness, RadialViscosity};
use crate::base::{CartesianMesh, Config, MaterialFields, ParamInjection, Rheology};
use crate::elasticity::ElasticityOperator;
use crate::front::{FrontRegions, FrontTracker, LevelSet};
use crate::tip::tip_average;
use crate::StrError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Selects the self-similar solution used to initialize a radial fracture
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RadialRegime {
    /// Toughness-dominated (zero viscosity)
    Toughness,

    /// Viscosity-dominated (zero toughness)
    Viscosity,
}

/// Defines the initial fracture, centred at the injection point
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum InitialCondition {
    /// Radial fracture following a self-similar solution; the time is the one at which that
    /// solution reaches the given radius
    Radial { radius: f64, regime: RadialRegime },

    /// Stationary penny-shaped crack under uniform net pressure at t = 0
    ///
    /// The opening is `w = 8 p / (π E') sqrt(R² - r²)`.
    Static { radius: f64, net_pressure: f64 },
}

/// Holds the radial solution selected by the initial condition
enum Radial {
    Toughness(RadialToughness),
    Viscosity(RadialViscosity),
}

impl Radial {
    fn time_at_radius(&self, radius: f64) -> Result<f64, StrError> {
        match self {
            Radial::Toughness(ana) => ana.time_at_radius(radius),
            Radial::Viscosity(ana) => ana.time_at_radius(radius),
        }
    }

    fn opening(&self, t: f64, r: f64) -> f64 {
        match self {
            Radial::Toughness(ana) => ana.opening(t, r),
            Radial::Viscosity(ana) => ana.opening(t, r),
        }
    }

    fn velocity(&self, t: f64) -> f64 {
        match self {
            Radial::Toughness(ana) => ana.velocity(t),
            Radial::Viscosity(ana) => ana.velocity(t),
        }
    }
}

impl InitialCondition {
    /// Returns the initial radius
    pub fn radius(&self) -> f64 {
        match self {
            InitialCondition::Radial { radius, .. } => *radius,
            InitialCondition::Static { radius, .. } => *radius,
        }
    }

    /// Builds the initial state
    ///
    /// Channel openings follow the closed-form profile; tip openings are the cell averages of the
    /// tip asymptote. The net pressure follows from elasticity and the initial volume counts as
    /// injected.
    pub fn build(
        &self,
        mesh: &CartesianMesh,
        materials: &MaterialFields,
        rheology: &Rheology,
        injection: &ParamInjection,
        config: &Config,
        elasticity: &mut ElasticityOperator,
    ) -> Result<FractureState, StrError> {
        let radius = self.radius();
        if !(radius > 0.0) {
            return Err("the initial radius must be > 0.0");
        }
        let center = injection.source;
        let margin = radius + 2.0 * mesh.diagonal();
        if center[0] - margin < -mesh.lx
            || center[0] + margin > mesh.lx
            || center[1] - margin < -mesh.ly
            || center[1] + margin > mesh.ly
        {
            return Err("the initial fracture does not fit in the mesh");
        }
        let source_element = match mesh.locate(center[0], center[1]) {
            Some(e) => e,
            None => return Err("the injection point is outside the mesh"),
        };

        // time, velocity and opening profile
        let n = mesh.n_element();
        let (t, velocity, profile) = match self {
            InitialCondition::Radial { regime, .. } => {
                let q0 = injection.rate(0.0);
                let ana = match regime {
                    RadialRegime::Toughness => {
                        let toughness = materials.k_prime[source_element] / (4.0 * f64::sqrt(2.0 / PI));
                        Radial::Toughness(RadialToughness::new(materials.e_prime, toughness, q0)?)
                    }
                    RadialRegime::Viscosity => match rheology {
                        Rheology::Newtonian { viscosity } => {
                            Radial::Viscosity(RadialViscosity::new(materials.e_prime, *viscosity, q0)?)
                        }
                        _ => return Err("the viscosity-dominated initial condition requires a Newtonian fluid"),
                    },
                };
                let t = ana.time_at_radius(radius)?;
                let velocity = ana.velocity(t);
                (t, velocity, Box::new(move |r| ana.opening(t, r)) as Box<dyn Fn(f64) -> f64>)
            }
            InitialCondition::Static { net_pressure, .. } => {
                if !(*net_pressure > 0.0) {
                    return Err("the initial net pressure must be > 0.0");
                }
                let factor = 8.0 * net_pressure / (PI * materials.e_prime);
                let profile = move |r: f64| {
                    if r < radius {
                        factor * f64::sqrt(radius * radius - r * r)
                    } else {
                        0.0
                    }
                };
                (0.0, 0.0, Box::new(profile) as Box<dyn Fn(f64) -> f64>)
            }
        };

        // footprint
        let level_set = LevelSet::new_radial(mesh, center, radius)?;
        let regions = FrontRegions::build(mesh, &level_set, None)?;
        let velocity = vec![velocity; n];
        let regime = select_regimes(
            mesh,
            &level_set,
            &regions,
            &velocity,
            materials,
            rheology,
            config.tip_asymptote,
        );

        // opening
        let mut opening = vec![0.0; n];
        for e in &regions.channel {
            let x = mesh.center(*e);
            opening[*e] = profile(f64::hypot(x[0] - center[0], x[1] - center[1]));
        }
        for e in &regions.tip {
            let params = materials.tip_params(*e, rheology);
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
            opening[*e] = avg.opening;
        }

        // net pressure
        elasticity.ensure_coverage(&regions.active)?;
        let w_active: Vec<f64> = regions.active.iter().map(|e| opening[*e]).collect();
        let stress = elasticity.apply(&regions.active, &w_active)?;
        let mut net_pressure = vec![0.0; n];
        for (i, e) in regions.active.iter().enumerate() {
            net_pressure[*e] = stress[i];
        }

        // bookkeeping
        let mut arrival_time = vec![None; n];
        for e in &regions.active {
            arrival_time[*e] = Some(t);
        }
        let front = FrontTracker::new(mesh).reconstruct(&level_set, &velocity, &regime);
        let volume: f64 = w_active.iter().sum::<f64>() * mesh.area();
        Ok(FractureState {
            t,
            dt: 0.0,
            n_timestep: 0,
            mesh: mesh.clone(),
            opening,
            net_pressure,
            level_set,
            regions,
            front,
            velocity,
            regime,
            arrival_time,
            leaked: vec![0.0; n],
            leaked_volume: 0.0,
            injected_volume: volume,
            history: Vec::new(),
        })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{InitialCondition, RadialRegime};
    use crate::analytical::RadialToughness;
    use crate::base::{Config, MaterialFields, Samples};
    use crate::elasticity::ElasticityOperator;
    use crate::StrError;
    use russell_lab::approx_eq;

    #[test]
    fn build_radial_toughness_works() -> Result<(), StrError> {
        let sample = Samples::radial_toughness()?;
        let materials = MaterialFields::new(&sample.mesh, &sample.solid)?;
        let mut elasticity = ElasticityOperator::new(&sample.mesh, sample.solid.e_prime)?;
        let mut config = Config::new();
        config.set_tip_asymptote(crate::tip::TipAsymptote::Toughness)?;
        let initial = InitialCondition::Radial {
            radius: 0.6,
            regime: RadialRegime::Toughness,
        };
        let state = initial.build(
            &sample.mesh,
            &materials,
            &sample.fluid.rheology,
            &sample.injection,
            &config,
            &mut elasticity,
        )?;
        let ana = RadialToughness::new(1e10, 2e6, 1e-3)?;
        approx_eq(state.t, ana.time_at_radius(0.6)?, 1e-14);
        let center = sample.mesh.locate(0.0, 0.0).unwrap();
        approx_eq(state.opening[center], ana.center_opening(state.t), 1e-15);
        approx_eq(state.velocity[center], ana.velocity(state.t), 1e-14);
        assert_eq!(state.n_timestep, 0);
        assert_eq!(state.regions.n_islands(&sample.mesh), 1);
        approx_eq(state.volume_balance_error(), 0.0, 1e-14);
        // the discrete volume is close to the injected one
        approx_eq(state.fracture_volume() / (1e-3 * state.t), 1.0, 0.05);
        // the net pressure is positive inside the fracture
        assert!(state.net_pressure[center] > 0.0);
        assert!(elasticity.n_covered() >= state.regions.active.len());
        Ok(())
    }

    #[test]
    fn build_captures_errors() -> Result<(), StrError> {
        let sample = Samples::radial_toughness()?;
        let materials = MaterialFields::new(&sample.mesh, &sample.solid)?;
        let mut elasticity = ElasticityOperator::new(&sample.mesh, sample.solid.e_prime)?;
        let config = Config::new();
        let build = |initial: InitialCondition, elasticity: &mut ElasticityOperator| {
            initial.build(
                &sample.mesh,
                &materials,
                &sample.fluid.rheology,
                &sample.injection,
                &config,
                elasticity,
            )
        };
        assert_eq!(
            build(
                InitialCondition::Radial {
                    radius: 1.9,
                    regime: RadialRegime::Toughness
                },
                &mut elasticity
            )
            .err(),
            Some("the initial fracture does not fit in the mesh")
        );
        assert_eq!(
            build(
                InitialCondition::Static {
                    radius: 0.5,
                    net_pressure: 0.0
                },
                &mut elasticity
            )
            .err(),
            Some("the initial net pressure must be > 0.0")
        );
        let state = build(
            InitialCondition::Static {
                radius: 0.5,
                net_pressure: 1e6,
            },
            &mut elasticity,
        )?;
        assert_eq!(state.t, 0.0);
        assert_eq!(state.max_front_velocity(), 0.0);
        Ok(())
    }
}

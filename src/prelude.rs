//! Makes available common structures needed to run a simulation
//!
//! You may write `use hfsim::prelude::*` in your code and obtain
//! access to commonly used functionality.

pub use crate::analytical::{RadialToughness, RadialViscosity};
pub use crate::base::{CartesianMesh, Config, Field, ParamFluid, ParamInjection, ParamSolid, Rheology, Samples};
pub use crate::solver::{Controller, FractureState, InitialCondition, RadialRegime, RunStatus, SimulationInput};
pub use crate::tip::{TipAsymptote, TipRegime};

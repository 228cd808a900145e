//! Implements the coupled front loop, the time-step controller and the simulation state

mod control_convergence;
mod control_time;
mod controller;
mod ehl_solver;
mod fracture_state;
mod front_loop;
mod initializer;
mod remesh;
mod simulation_input;
pub use crate::solver::control_convergence::*;
pub use crate::solver::control_time::*;
pub use crate::solver::controller::*;
pub use crate::solver::ehl_solver::*;
pub use crate::solver::fracture_state::*;
pub use crate::solver::front_loop::*;
pub use crate::solver::initializer::*;
pub use crate::solver::remesh::*;
pub use crate::solver::simulation_input::*;

//! Hydraulic fracture propagation with an implicit level-set front
//!
//! The fracture footprint is tracked on a fixed Cartesian lattice by a level-set field. Every time
//! step couples (1) a displacement-discontinuity elasticity operator, (2) lubrication flow inside
//! the footprint and (3) near-tip asymptotes that locate the front.

/// Defines a type alias for the error type as a static string
pub type StrError = &'static str;

pub mod analytical;
pub mod base;
pub mod elasticity;
pub mod flow;
pub mod front;
pub mod prelude;
pub mod solver;
pub mod tip;

//! This module contains self-similar solutions of radial hydraulic fractures used for initialization and verification

mod radial_toughness;
mod radial_viscosity;

pub use radial_toughness::*;
pub use radial_viscosity::*;

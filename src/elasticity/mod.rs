//! Implements the displacement-discontinuity elasticity operator

mod elasticity_operator;
mod kernel;
pub use crate::elasticity::elasticity_operator::*;
pub use crate::elasticity::kernel::*;

//! Implements the lubrication flow over a trial fracture domain

mod flow_residual;
mod flow_system;
mod leak_off;
pub use crate::flow::flow_residual::*;
pub use crate::flow::flow_system::*;
pub use crate::flow::leak_off::*;

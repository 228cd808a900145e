//! Implements the near-tip asymptotes and their inversion

mod asymptote;
mod volume_integral;
pub use crate::tip::asymptote::*;
pub use crate::tip::volume_integral::*;

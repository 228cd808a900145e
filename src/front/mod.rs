//! Implements the level-set front: fast marching, region classification and reconstruction

mod front_regions;
mod front_tracker;
mod level_set;
pub use crate::front::front_regions::*;
pub use crate::front::front_tracker::*;
pub use crate::front::level_set::*;

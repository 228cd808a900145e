//! Implements the mesh, material properties and configuration

mod config;
mod mesh;
mod properties;
mod samples;
pub use crate::base::config::*;
pub use crate::base::mesh::*;
pub use crate::base::properties::*;
pub use crate::base::samples::*;

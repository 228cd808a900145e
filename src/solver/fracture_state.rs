use crate::base::CartesianMesh;
use crate::front::{FrontRegions, FrontSegment, LevelSet};
use crate::tip::TipRegime;
use crate::StrError;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Holds a summary of an accepted time step
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepRecord {
    /// Time at the end of the step
    pub t: f64,

    /// Accepted time increment
    pub dt: f64,

    /// Number of front iterations
    pub front_iterations: usize,

    /// Number of Newton iterations summed over all front iterations
    pub newton_iterations: usize,

    /// Number of active elements
    pub n_active: usize,

    /// Fracture volume
    pub volume: f64,

    /// Largest front velocity
    pub max_velocity: f64,
}

/// Holds the committed state of the fracture
///
/// Per-element fields have one entry for each element of `mesh`; the opening and net pressure
/// are zero outside the active set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FractureState {
    /// Current time
    pub t: f64,

    /// Last accepted time increment (zero before the first step)
    pub dt: f64,

    /// Number of accepted time steps
    pub n_timestep: usize,

    /// Lattice (replaced when remeshing)
    pub mesh: CartesianMesh,

    /// Opening (width)
    pub opening: Vec<f64>,

    /// Fluid pressure minus confining stress
    pub net_pressure: Vec<f64>,

    /// Signed distance to the front
    pub level_set: LevelSet,

    /// Active set and its partition
    pub regions: FrontRegions,

    /// Reconstructed front
    pub front: Vec<FrontSegment>,

    /// Front velocity
    pub velocity: Vec<f64>,

    /// Propagation regime
    pub regime: Vec<TipRegime>,

    /// Time at which the fluid reached each element
    pub arrival_time: Vec<Option<f64>>,

    /// Cumulative leak-off volume of each element
    pub leaked: Vec<f64>,

    /// Total leak-off volume
    pub leaked_volume: f64,

    /// Total volume in the fracture at initialization plus the injected volume since then
    pub injected_volume: f64,

    /// Accepted steps
    pub history: Vec<StepRecord>,
}

impl FractureState {
    /// Returns the volume of fluid inside the fracture
    pub fn fracture_volume(&self) -> f64 {
        let area = self.mesh.area();
        self.regions.active.iter().map(|e| self.opening[*e] * area).sum()
    }

    /// Returns the fluid efficiency (volume stored over volume injected)
    pub fn efficiency(&self) -> f64 {
        if self.injected_volume > 0.0 {
            (self.injected_volume - self.leaked_volume) / self.injected_volume
        } else {
            1.0
        }
    }

    /// Returns the relative mismatch between the stored and the injected-minus-leaked volumes
    pub fn volume_balance_error(&self) -> f64 {
        let expected = self.injected_volume - self.leaked_volume;
        if expected > 0.0 {
            f64::abs(self.fracture_volume() - expected) / expected
        } else {
            f64::abs(self.fracture_volume())
        }
    }

    /// Returns the mean distance between the front segments and a point
    pub fn mean_radius(&self, center: [f64; 2]) -> f64 {
        if self.front.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .front
            .iter()
            .map(|s| f64::hypot(s.position[0] - center[0], s.position[1] - center[1]))
            .sum();
        sum / (self.front.len() as f64)
    }

    /// Returns the largest opening
    pub fn max_opening(&self) -> f64 {
        self.regions.active.iter().map(|e| self.opening[*e]).fold(0.0, f64::max)
    }

    /// Reads a JSON file containing the state data
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn read_json<P>(full_path: &P) -> Result<Self, StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        let input = File::open(path).map_err(|_| "cannot open file")?;
        let buffered = BufReader::new(input);
        let state = serde_json::from_reader(buffered).map_err(|_| "cannot parse JSON file")?;
        Ok(state)
    }

    /// Writes a JSON file with the state data
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn write_json<P>(&self, full_path: &P) -> Result<(), StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        if let Some(p) = path.parent() {
            fs::create_dir_all(p).map_err(|_| "cannot create directory")?;
        }
        let mut file = File::create(&path).map_err(|_| "cannot create file")?;
        serde_json::to_writer(&mut file, &self).map_err(|_| "cannot write file")?;
        Ok(())
    }

    /// Returns the largest front velocity over the tip and ribbon elements
    pub fn max_front_velocity(&self) -> f64 {
        self.regions
            .tip
            .iter()
            .chain(self.regions.ribbon.iter())
            .map(|e| self.velocity[*e])
            .fold(0.0, f64::max)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::FractureState;
    use crate::base::CartesianMesh;
    use crate::front::{FrontRegions, FrontTracker, LevelSet};
    use crate::tip::TipRegime;
    use crate::StrError;
    use russell_lab::approx_eq;

    #[test]
    fn derived_quantities_work() -> Result<(), StrError> {
        let mesh = CartesianMesh::new(1.0, 1.0, 21, 21)?;
        let n = mesh.n_element();
        let level_set = LevelSet::new_radial(&mesh, [0.0, 0.0], 0.5)?;
        let regions = FrontRegions::build(&mesh, &level_set, None)?;
        let mut opening = vec![0.0; n];
        for e in &regions.active {
            opening[*e] = 1e-3;
        }
        let velocity = vec![0.0; n];
        let regime = vec![TipRegime::Toughness; n];
        let front = FrontTracker::new(&mesh).reconstruct(&level_set, &velocity, &regime);
        let volume = regions.active.len() as f64 * mesh.area() * 1e-3;
        let state = FractureState {
            t: 0.0,
            dt: 0.0,
            n_timestep: 0,
            mesh,
            opening,
            net_pressure: vec![0.0; n],
            level_set,
            regions,
            front,
            velocity,
            regime,
            arrival_time: vec![None; n],
            leaked: vec![0.0; n],
            leaked_volume: 0.1 * volume,
            injected_volume: volume,
            history: Vec::new(),
        };
        approx_eq(state.fracture_volume(), volume, 1e-15);
        approx_eq(state.efficiency(), 0.9, 1e-15);
        approx_eq(state.volume_balance_error(), 1.0 / 9.0, 1e-14);
        approx_eq(state.mean_radius([0.0, 0.0]), 0.5, 0.02);
        assert_eq!(state.max_opening(), 1e-3);
        assert_eq!(state.max_front_velocity(), 0.0);
        Ok(())
    }
}

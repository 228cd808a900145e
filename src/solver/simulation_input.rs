use super::InitialCondition;
use crate::base::{CartesianMesh, Config, ParamFluid, ParamInjection, ParamSolid, SampleProblem};
use crate::StrError;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Holds all data required to run a simulation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationInput {
    /// Lattice over the fracture plane
    pub mesh: CartesianMesh,

    /// Solid properties
    pub solid: ParamSolid,

    /// Fluid properties
    pub fluid: ParamFluid,

    /// Injection schedule and point
    pub injection: ParamInjection,

    /// Initial fracture
    pub initial: InitialCondition,

    /// Control parameters
    #[serde(default)]
    pub config: Config,
}

impl SimulationInput {
    /// Allocates a new instance from a sample problem
    pub fn from_sample(sample: SampleProblem, initial: InitialCondition, config: Config) -> Self {
        SimulationInput {
            mesh: sample.mesh,
            solid: sample.solid,
            fluid: sample.fluid,
            injection: sample.injection,
            initial,
            config,
        }
    }

    /// Parses a JSON string
    pub fn from_json(json: &str) -> Result<Self, StrError> {
        let input: SimulationInput = serde_json::from_str(json).map_err(|_| "cannot parse the simulation input")?;
        input.validate_mesh()?;
        Ok(input)
    }

    /// Reads a JSON file
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn read_json<P>(full_path: &P) -> Result<Self, StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        let file = File::open(path).map_err(|_| "cannot open file")?;
        let buffered = BufReader::new(file);
        let input: SimulationInput =
            serde_json::from_reader(buffered).map_err(|_| "cannot parse the simulation input")?;
        input.validate_mesh()?;
        Ok(input)
    }

    /// Writes a JSON file
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
        serde_json::to_writer_pretty(&mut file, &self).map_err(|_| "cannot write file")?;
        Ok(())
    }

    /// Returns the JSON representation
    pub fn to_json(&self) -> Result<String, StrError> {
        serde_json::to_string_pretty(&self).map_err(|_| "cannot serialize the simulation input")
    }

    /// Checks that the deserialized mesh is consistent (the element sizes are derived data)
    fn validate_mesh(&self) -> Result<(), StrError> {
        let mesh = CartesianMesh::new(self.mesh.lx, self.mesh.ly, self.mesh.nx, self.mesh.ny)?;
        if f64::abs(mesh.hx - self.mesh.hx) > 1e-12 * mesh.hx || f64::abs(mesh.hy - self.mesh.hy) > 1e-12 * mesh.hy {
            return Err("the mesh element sizes are inconsistent with the half-lengths");
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::SimulationInput;
    use crate::base::{Config, Samples};
    use crate::solver::{InitialCondition, RadialRegime};
    use crate::StrError;

    #[test]
    fn json_works() -> Result<(), StrError> {
        let mut config = Config::new();
        config.set_t_fin(2.5)?.set_checkpoint_times(&[1.0])?;
        let initial = InitialCondition::Radial {
            radius: 0.5,
            regime: RadialRegime::Toughness,
        };
        let input = SimulationInput::from_sample(Samples::radial_toughness()?, initial, config);
        let json = input.to_json()?;
        let read = SimulationInput::from_json(&json)?;
        assert_eq!(read.mesh, input.mesh);
        assert_eq!(read.config.t_fin, 2.5);
        assert_eq!(read.config.checkpoint_times, &[1.0]);
        assert_eq!(read.initial.radius(), 0.5);
        assert_eq!(read.injection.source, [0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn from_json_captures_errors() {
        assert_eq!(
            SimulationInput::from_json("{").err(),
            Some("cannot parse the simulation input")
        );
        let json = r#"{
            "mesh": {"nx": 5, "ny": 5, "lx": 1.0, "ly": 1.0, "hx": 0.1, "hy": 0.5},
            "solid": {"e_prime": 1e10, "toughness": {"Uniform": 1e6},
                      "confining_stress": {"Uniform": 0.0}, "leak_off": {"Uniform": 0.0}},
            "fluid": {"rheology": {"Newtonian": {"viscosity": 1e-3}}},
            "injection": {"schedule": [[0.0, 1e-3]], "source": [0.0, 0.0]},
            "initial": {"Static": {"radius": 0.5, "net_pressure": 1e6}}
        }"#;
        assert_eq!(
            SimulationInput::from_json(json).err(),
            Some("the mesh element sizes are inconsistent with the half-lengths")
        );
        let fixed = json.replace("\"hx\": 0.1", "\"hx\": 0.5");
        let input = SimulationInput::from_json(&fixed).unwrap();
        assert_eq!(input.config.t_fin, Config::new().t_fin);
    }
}

use super::CartesianMesh;
use crate::tip::TipParams;
use crate::StrError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Defines a scalar field over the fracture plane
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Field {
    /// The same value everywhere
    Uniform(f64),

    /// A horizontal layer around y = 0 bounded by two outer layers
    ///
    /// Elements with `|y| > half_thickness` take the `outer` value.
    Layered {
        /// Value inside the layer
        inner: f64,

        /// Value in the bounding layers
        outer: f64,

        /// Half-thickness of the inner layer
        half_thickness: f64,
    },

    /// One value per element (tied to a particular mesh)
    Elements(Vec<f64>),
}

impl Field {
    /// Evaluates the field at all elements of a mesh
    pub fn evaluate(&self, mesh: &CartesianMesh) -> Result<Vec<f64>, StrError> {
        let n = mesh.n_element();
        match self {
            Field::Uniform(value) => Ok(vec![*value; n]),
            Field::Layered {
                inner,
                outer,
                half_thickness,
            } => Ok((0..n)
                .map(|e| {
                    let y = mesh.center(e)[1];
                    if f64::abs(y) > *half_thickness {
                        *outer
                    } else {
                        *inner
                    }
                })
                .collect()),
            Field::Elements(values) => {
                if values.len() != n {
                    return Err("the number of field values must equal the number of elements");
                }
                Ok(values.clone())
            }
        }
    }

    /// Returns true if the field can be evaluated on any mesh
    pub fn mesh_independent(&self) -> bool {
        !matches!(self, Field::Elements(..))
    }

    /// Returns the smallest value of the field
    fn min_value(&self) -> f64 {
        match self {
            Field::Uniform(value) => *value,
            Field::Layered { inner, outer, .. } => f64::min(*inner, *outer),
            Field::Elements(values) => values.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }
}

/// Holds the properties of the solid
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParamSolid {
    /// Plane-strain modulus E' = E / (1 - ν²)
    pub e_prime: f64,

    /// Fracture toughness K_Ic
    pub toughness: Field,

    /// Far-field confining stress σ0 (compression positive)
    pub confining_stress: Field,

    /// Carter leak-off coefficient C_L
    pub leak_off: Field,
}

impl ParamSolid {
    /// Allocates a new instance with uniform properties and no leak-off
    pub fn uniform(e_prime: f64, toughness: f64, confining_stress: f64) -> Self {
        ParamSolid {
            e_prime,
            toughness: Field::Uniform(toughness),
            confining_stress: Field::Uniform(confining_stress),
            leak_off: Field::Uniform(0.0),
        }
    }

    /// Calculates the plane-strain modulus from Young's modulus and Poisson's coefficient
    pub fn plane_strain_modulus(young: f64, poisson: f64) -> f64 {
        young / (1.0 - poisson * poisson)
    }

    /// Checks the parameters
    pub fn validate(&self) -> Result<(), StrError> {
        if !(self.e_prime > 0.0) {
            return Err("the plane-strain modulus must be > 0.0");
        }
        if !(self.toughness.min_value() >= 0.0) {
            return Err("the fracture toughness must be ≥ 0.0");
        }
        if !(self.leak_off.min_value() >= 0.0) {
            return Err("the leak-off coefficient must be ≥ 0.0");
        }
        if !self.confining_stress.min_value().is_finite() {
            return Err("the confining stress must be finite");
        }
        Ok(())
    }
}

/// Defines the relation between fluid flux and pressure gradient in a slot of width w
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum Rheology {
    /// Newtonian fluid (Poiseuille law) `q = -w³/(12 μ) ∇p`
    Newtonian {
        /// Dynamic viscosity μ
        viscosity: f64,
    },

    /// Power-law fluid with `τ = K |γ̇|ⁿ`
    PowerLaw {
        /// Consistency index K
        consistency: f64,

        /// Flow behaviour index n
        flow_index: f64,
    },
}

impl Rheology {
    /// Returns the flow behaviour index (1 for Newtonian fluids)
    pub fn flow_index(&self) -> f64 {
        match self {
            Rheology::Newtonian { .. } => 1.0,
            Rheology::PowerLaw { flow_index, .. } => *flow_index,
        }
    }

    /// Returns the generalized viscosity M' (equal to μ' = 12 μ for Newtonian fluids)
    ///
    /// ```text
    /// M' = 2ⁿ⁺¹ (2n+1)ⁿ / nⁿ K
    /// ```
    pub fn m_prime(&self) -> f64 {
        match self {
            Rheology::Newtonian { viscosity } => 12.0 * viscosity,
            Rheology::PowerLaw {
                consistency,
                flow_index,
            } => {
                let n = *flow_index;
                f64::powf(2.0, n + 1.0) * f64::powf(2.0 * n + 1.0, n) / f64::powf(n, n) * consistency
            }
        }
    }

    /// Returns the conductivity k such that `q = -k ∇p`
    ///
    /// The gradient magnitude is only used by the power-law model and is floored at `grad_min`.
    pub fn conductivity(&self, width: f64, grad: f64, grad_min: f64) -> f64 {
        if width <= 0.0 {
            return 0.0;
        }
        match self {
            Rheology::Newtonian { viscosity } => width * width * width / (12.0 * viscosity),
            Rheology::PowerLaw {
                consistency,
                flow_index,
            } => {
                let n = *flow_index;
                let g = f64::max(f64::abs(grad), grad_min);
                (2.0 * n / (2.0 * n + 1.0))
                    * f64::powf(1.0 / consistency, 1.0 / n)
                    * f64::powf(width / 2.0, (2.0 * n + 1.0) / n)
                    * f64::powf(g, 1.0 / n - 1.0)
            }
        }
    }

    /// Returns the derivative of the conductivity with respect to the width (gradient frozen)
    pub fn conductivity_deriv(&self, width: f64, grad: f64, grad_min: f64) -> f64 {
        if width <= 0.0 {
            return 0.0;
        }
        let n = self.flow_index();
        (2.0 * n + 1.0) / n * self.conductivity(width, grad, grad_min) / width
    }

    /// Checks the parameters
    pub fn validate(&self) -> Result<(), StrError> {
        match self {
            Rheology::Newtonian { viscosity } => {
                if !(*viscosity > 0.0) {
                    return Err("the viscosity must be > 0.0");
                }
            }
            Rheology::PowerLaw {
                consistency,
                flow_index,
            } => {
                if !(*consistency > 0.0) {
                    return Err("the consistency index must be > 0.0");
                }
                if !(*flow_index > 0.0 && *flow_index <= 2.0) {
                    return Err("the flow behaviour index must satisfy 0 < n ≤ 2");
                }
            }
        }
        Ok(())
    }
}

/// Holds the properties of the injected fluid
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParamFluid {
    /// Rheological model
    pub rheology: Rheology,
}

impl ParamFluid {
    /// Allocates a Newtonian fluid
    pub fn newtonian(viscosity: f64) -> Self {
        ParamFluid {
            rheology: Rheology::Newtonian { viscosity },
        }
    }
}

/// Holds the injection schedule
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParamInjection {
    /// Pairs (start time, rate) sorted by time; each rate holds until the next start time
    pub schedule: Vec<(f64, f64)>,

    /// Coordinates of the injection point
    pub source: [f64; 2],
}

impl ParamInjection {
    /// Allocates a constant-rate injection
    pub fn constant(rate: f64, source: [f64; 2]) -> Self {
        ParamInjection {
            schedule: vec![(0.0, rate)],
            source,
        }
    }

    /// Returns the injection rate at time t
    pub fn rate(&self, t: f64) -> f64 {
        let mut rate = 0.0;
        for (start, q) in &self.schedule {
            if t >= *start {
                rate = *q;
            } else {
                break;
            }
        }
        rate
    }

    /// Returns the volume injected between t0 and t1
    pub fn volume(&self, t0: f64, t1: f64) -> f64 {
        let mut volume = 0.0;
        for (k, (start, q)) in self.schedule.iter().enumerate() {
            let end = match self.schedule.get(k + 1) {
                Some((next, _)) => *next,
                None => f64::INFINITY,
            };
            let a = f64::max(t0, *start);
            let b = f64::min(t1, end);
            if b > a {
                volume += q * (b - a);
            }
        }
        volume
    }

    /// Checks the parameters
    pub fn validate(&self) -> Result<(), StrError> {
        if self.schedule.is_empty() {
            return Err("the injection schedule must not be empty");
        }
        for k in 0..self.schedule.len() {
            let (t, q) = self.schedule[k];
            if !(q >= 0.0) {
                return Err("the injection rate must be ≥ 0.0");
            }
            if k > 0 && !(t > self.schedule[k - 1].0) {
                return Err("the injection schedule must be sorted by time");
            }
        }
        Ok(())
    }
}

/// Holds the material properties evaluated at every element of a mesh
#[derive(Clone, Debug)]
pub struct MaterialFields {
    /// Plane-strain modulus
    pub e_prime: f64,

    /// K' = 4 sqrt(2/π) K_Ic (one per element)
    pub k_prime: Vec<f64>,

    /// Confining stress (one per element)
    pub sigma0: Vec<f64>,

    /// C' = 2 C_L (one per element)
    pub c_prime: Vec<f64>,
}

impl MaterialFields {
    /// Evaluates all fields on the given mesh
    pub fn new(mesh: &CartesianMesh, solid: &ParamSolid) -> Result<Self, StrError> {
        solid.validate()?;
        let factor = 4.0 * f64::sqrt(2.0 / PI);
        Ok(MaterialFields {
            e_prime: solid.e_prime,
            k_prime: solid.toughness.evaluate(mesh)?.iter().map(|k| factor * k).collect(),
            sigma0: solid.confining_stress.evaluate(mesh)?,
            c_prime: solid.leak_off.evaluate(mesh)?.iter().map(|c| 2.0 * c).collect(),
        })
    }

    /// Returns the near-tip parameters at an element
    pub fn tip_params(&self, e: usize, rheology: &Rheology) -> TipParams {
        TipParams {
            e_prime: self.e_prime,
            k_prime: self.k_prime[e],
            m_prime: rheology.m_prime(),
            flow_index: rheology.flow_index(),
            c_prime: self.c_prime[e],
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{Field, MaterialFields, ParamInjection, ParamSolid, Rheology};
    use crate::base::CartesianMesh;
    use russell_lab::approx_eq;

    #[test]
    fn fields_work() {
        let mesh = CartesianMesh::new(1.0, 1.0, 5, 5).unwrap();
        let layered = Field::Layered {
            inner: 1.0,
            outer: 5.0,
            half_thickness: 0.6,
        };
        let values = layered.evaluate(&mesh).unwrap();
        assert_eq!(values[mesh.index(2, 2)], 1.0);
        assert_eq!(values[mesh.index(2, 1)], 1.0);
        assert_eq!(values[mesh.index(2, 0)], 5.0);
        assert_eq!(values[mesh.index(0, 4)], 5.0);
        assert_eq!(
            Field::Elements(vec![1.0; 3]).evaluate(&mesh).err(),
            Some("the number of field values must equal the number of elements")
        );
        assert!(layered.mesh_independent());
        assert!(!Field::Elements(vec![]).mesh_independent());
    }

    #[test]
    fn material_fields_work() {
        let mesh = CartesianMesh::new(1.0, 1.0, 3, 3).unwrap();
        let solid = ParamSolid::uniform(1e10, 1e6, 2e6);
        let fields = MaterialFields::new(&mesh, &solid).unwrap();
        approx_eq(fields.k_prime[4], 3.191538243211461e6, 1e-6);
        assert_eq!(fields.sigma0[0], 2e6);
        assert_eq!(fields.c_prime[8], 0.0);
        let params = fields.tip_params(4, &Rheology::Newtonian { viscosity: 0.5 });
        assert_eq!(params.m_prime, 6.0);
        assert_eq!(params.flow_index, 1.0);
        assert_eq!(params.k_prime, fields.k_prime[4]);
        let mut wrong = solid.clone();
        wrong.e_prime = -1.0;
        assert_eq!(
            MaterialFields::new(&mesh, &wrong).err(),
            Some("the plane-strain modulus must be > 0.0")
        );
    }

    #[test]
    fn rheology_works() {
        let newtonian = Rheology::Newtonian { viscosity: 0.1 };
        approx_eq(newtonian.m_prime(), 1.2, 1e-15);
        approx_eq(newtonian.conductivity(2.0, 123.0, 1e-10), 8.0 / 1.2, 1e-14);
        approx_eq(newtonian.conductivity_deriv(2.0, 123.0, 1e-10), 3.0 * 4.0 / 1.2, 1e-14);

        // a power-law fluid with n = 1 is Newtonian
        let power = Rheology::PowerLaw {
            consistency: 0.1,
            flow_index: 1.0,
        };
        approx_eq(power.m_prime(), 1.2, 1e-14);
        approx_eq(power.conductivity(2.0, 55.0, 1e-10), 8.0 / 1.2, 1e-14);
        assert_eq!(power.conductivity(0.0, 55.0, 1e-10), 0.0);

        let wrong = Rheology::PowerLaw {
            consistency: 0.1,
            flow_index: 3.0,
        };
        assert_eq!(
            wrong.validate().err(),
            Some("the flow behaviour index must satisfy 0 < n ≤ 2")
        );
    }

    #[test]
    fn injection_works() {
        let injection = ParamInjection {
            schedule: vec![(0.0, 1.0), (10.0, 3.0), (20.0, 0.0)],
            source: [0.0, 0.0],
        };
        injection.validate().unwrap();
        assert_eq!(injection.rate(5.0), 1.0);
        assert_eq!(injection.rate(10.0), 3.0);
        assert_eq!(injection.rate(25.0), 0.0);
        approx_eq(injection.volume(5.0, 15.0), 5.0 + 15.0, 1e-14);
        approx_eq(injection.volume(0.0, 100.0), 10.0 + 30.0, 1e-14);
        let wrong = ParamInjection {
            schedule: vec![(1.0, 1.0), (1.0, 3.0)],
            source: [0.0, 0.0],
        };
        assert_eq!(
            wrong.validate().err(),
            Some("the injection schedule must be sorted by time")
        );
    }
}

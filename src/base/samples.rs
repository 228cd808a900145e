use super::{CartesianMesh, Field, ParamFluid, ParamInjection, ParamSolid};
use crate::StrError;

/// Holds the mesh and the physical parameters of a sample problem
#[derive(Clone, Debug)]
pub struct SampleProblem {
    pub mesh: CartesianMesh,
    pub solid: ParamSolid,
    pub fluid: ParamFluid,
    pub injection: ParamInjection,
}

/// Holds some sample problems (SI units)
pub struct Samples;

impl Samples {
    /// Returns a radial fracture propagating in the toughness-dominated regime
    ///
    /// 41 × 41 elements with h = 0.1 m; E' = 10 GPa, K_Ic = 2 MPa √m, μ = 1 mPa s, Q0 = 1 L/s.
    pub fn radial_toughness() -> Result<SampleProblem, StrError> {
        Ok(SampleProblem {
            mesh: CartesianMesh::new(2.0, 2.0, 41, 41)?,
            solid: ParamSolid::uniform(1e10, 2e6, 0.0),
            fluid: ParamFluid::newtonian(1e-3),
            injection: ParamInjection::constant(1e-3, [0.0, 0.0]),
        })
    }

    /// Returns a viscous fluid injected into a thin layer
    ///
    /// 81 × 35 elements over 0.4 m × 0.08 m; E = 3.3 GPa, ν = 0.4, μ = 30 Pa s, Q0 = 2.3e-9 m³/s.
    /// If `layered` is true, the layer `|y| ≤ 0.025` (minus half an element) is bounded by
    /// stiffer rock with larger toughness and confining stress; otherwise the properties are
    /// uniform and equal to those of the inner layer.
    pub fn confined(layered: bool) -> Result<SampleProblem, StrError> {
        let mesh = CartesianMesh::new(0.2, 0.04, 81, 35)?;
        let e_prime = ParamSolid::plane_strain_modulus(3.3e9, 0.4);
        let half_thickness = 0.025 - 0.5 * mesh.hx;
        let (toughness, confining_stress) = if layered {
            (
                Field::Layered {
                    inner: 0.5e6,
                    outer: 1.1e6,
                    half_thickness,
                },
                Field::Layered {
                    inner: 1e6,
                    outer: 5e6,
                    half_thickness,
                },
            )
        } else {
            (Field::Uniform(0.5e6), Field::Uniform(1e6))
        };
        Ok(SampleProblem {
            mesh,
            solid: ParamSolid {
                e_prime,
                toughness,
                confining_stress,
                leak_off: Field::Uniform(0.0),
            },
            fluid: ParamFluid::newtonian(30.0),
            injection: ParamInjection::constant(0.0023e-6, [0.0, 0.0]),
        })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

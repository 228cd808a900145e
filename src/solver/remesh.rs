use super::{select_regimes, FractureState};
use crate::base::{CartesianMesh, MaterialFields, ParamSolid, Rheology};
use crate::elasticity::ElasticityOperator;
use crate::front::{fast_marching, FrontRegions, FrontTracker, LevelSet};
use crate::tip::TipAsymptote;
use crate::StrError;

/// Holds the data rebuilt by remeshing
pub struct Remeshed {
    /// State transferred to the coarse mesh
    pub state: FractureState,

    /// Material fields evaluated on the coarse mesh
    pub materials: MaterialFields,

    /// Elasticity operator of the coarse mesh
    pub elasticity: ElasticityOperator,
}

/// Doubles the domain keeping the number of elements (coarsening by a factor of 2)
///
/// The coarse centroids coincide with every other fine centroid, hence `nx` and `ny` must be
/// odd. Each coarse element covers its fine twin, half of the four edge neighbours and a quarter
/// of the four corner neighbours; these weights transfer the opening (averaged) and the leaked
/// volume (summed). The openings are finally rescaled so that the fracture volume is unchanged.
pub fn coarsen(
    state: &FractureState,
    solid: &ParamSolid,
    rheology: &Rheology,
    asymptote: TipAsymptote,
) -> Result<Remeshed, StrError> {
    let fine = &state.mesh;
    if fine.nx % 2 == 0 || fine.ny % 2 == 0 {
        return Err("remeshing requires an odd number of elements along each direction");
    }
    if !solid.toughness.mesh_independent()
        || !solid.confining_stress.mesh_independent()
        || !solid.leak_off.mesh_independent()
    {
        return Err("remeshing requires mesh-independent material fields");
    }
    let mesh = CartesianMesh::new(2.0 * fine.lx, 2.0 * fine.ly, fine.nx, fine.ny)?;
    let n = mesh.n_element();
    let shift_x = ((fine.nx - 1) / 2) as isize;
    let shift_y = ((fine.ny - 1) / 2) as isize;

    // fine element at lattice offset (di, dj) from the twin of a coarse element
    let fine_at = |e: usize, di: isize, dj: isize| -> Option<usize> {
        let (ii, jj) = mesh.ij(e);
        let i = 2 * ii as isize - shift_x + di;
        let j = 2 * jj as isize - shift_y + dj;
        if i < 0 || j < 0 || i >= fine.nx as isize || j >= fine.ny as isize {
            None
        } else {
            Some(fine.index(i as usize, j as usize))
        }
    };

    // level set
    let mut values = vec![0.0; n];
    let mut known = vec![false; n];
    for e in 0..n {
        if let Some(f) = fine_at(e, 0, 0) {
            values[e] = state.level_set.values[f];
            known[e] = true;
        }
    }
    fast_marching(&mesh, &mut values, &known)?;
    let level_set = LevelSet::from_values(&mesh, values)?;
    let regions = FrontRegions::build(&mesh, &level_set, None)?;

    // weighted transfer
    let mut opening = vec![0.0; n];
    let mut leaked = vec![0.0; n];
    let mut velocity = vec![0.0; n];
    let mut arrival_time = vec![None; n];
    for e in 0..n {
        for dj in -1..=1_isize {
            for di in -1..=1_isize {
                let f = match fine_at(e, di, dj) {
                    Some(f) => f,
                    None => continue,
                };
                let weight = match (di, dj) {
                    (0, 0) => 1.0,
                    (0, _) | (_, 0) => 0.5,
                    _ => 0.25,
                };
                opening[e] += 0.25 * weight * state.opening[f];
                leaked[e] += weight * state.leaked[f];
                if let Some(ta) = state.arrival_time[f] {
                    arrival_time[e] = Some(match arrival_time[e] {
                        Some(tb) => f64::min(ta, tb),
                        None => ta,
                    });
                }
            }
        }
        if let Some(f) = fine_at(e, 0, 0) {
            velocity[e] = state.velocity[f];
        }
        if !regions.is_active(e) {
            opening[e] = 0.0;
        } else if arrival_time[e].is_none() {
            arrival_time[e] = Some(state.t);
        }
    }

    // volume
    let volume_old = state.fracture_volume();
    let volume_new: f64 = regions.active.iter().map(|e| opening[*e]).sum::<f64>() * mesh.area();
    if volume_new > 0.0 {
        let factor = volume_old / volume_new;
        for e in &regions.active {
            opening[*e] *= factor;
        }
    }

    // operators and derived fields
    let materials = MaterialFields::new(&mesh, solid)?;
    let mut elasticity = ElasticityOperator::new(&mesh, solid.e_prime)?;
    elasticity.ensure_coverage(&regions.active)?;
    let w_active: Vec<f64> = regions.active.iter().map(|e| opening[*e]).collect();
    let stress = elasticity.apply(&regions.active, &w_active)?;
    let mut net_pressure = vec![0.0; n];
    for (i, e) in regions.active.iter().enumerate() {
        net_pressure[*e] = stress[i];
    }
    let regime = select_regimes(&mesh, &level_set, &regions, &velocity, &materials, rheology, asymptote);
    let front = FrontTracker::new(&mesh).reconstruct(&level_set, &velocity, &regime);

    Ok(Remeshed {
        state: FractureState {
            t: state.t,
            dt: state.dt,
            n_timestep: state.n_timestep,
            mesh,
            opening,
            net_pressure,
            level_set,
            regions,
            front,
            velocity,
            regime,
            arrival_time,
            leaked,
            leaked_volume: state.leaked_volume,
            injected_volume: state.injected_volume,
            history: state.history.clone(),
        },
        materials,
        elasticity,
    })
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::coarsen;
    use crate::base::{CartesianMesh, Config, Field, MaterialFields, ParamInjection, ParamSolid, Rheology};
    use crate::elasticity::ElasticityOperator;
    use crate::solver::{FractureState, InitialCondition};
    use crate::tip::TipAsymptote;
    use crate::StrError;
    use russell_lab::approx_eq;

    fn static_state(nx: usize, solid: &ParamSolid, rheology: &Rheology) -> Result<FractureState, StrError> {
        let mesh = CartesianMesh::new(2.0, 2.0, nx, nx)?;
        let materials = MaterialFields::new(&mesh, solid)?;
        let mut elasticity = ElasticityOperator::new(&mesh, solid.e_prime)?;
        let injection = ParamInjection::constant(1e-3, [0.0, 0.0]);
        let initial = InitialCondition::Static {
            radius: 0.7,
            net_pressure: 1e6,
        };
        initial.build(&mesh, &materials, rheology, &injection, &Config::new(), &mut elasticity)
    }

    #[test]
    fn coarsen_conserves_volume() -> Result<(), StrError> {
        let solid = ParamSolid::uniform(1e10, 1e6, 0.0);
        let rheology = Rheology::Newtonian { viscosity: 1e-3 };
        let mut state = static_state(21, &solid, &rheology)?;
        state.leaked[220] = 1e-6;
        state.leaked_volume = 1e-6;
        let remeshed = coarsen(&state, &solid, &rheology, TipAsymptote::Universal)?;
        let coarse = &remeshed.state;
        assert_eq!(coarse.mesh.nx, 21);
        approx_eq(coarse.mesh.lx, 4.0, 1e-15);
        approx_eq(coarse.mesh.hx, 0.4, 1e-15);
        approx_eq(coarse.fracture_volume(), state.fracture_volume(), 1e-12 * state.fracture_volume());
        approx_eq(coarse.leaked.iter().sum::<f64>(), 1e-6, 1e-20);
        assert_eq!(coarse.leaked_volume, state.leaked_volume);
        assert_eq!(coarse.injected_volume, state.injected_volume);

        // the centre keeps its level-set value and the footprint stays connected
        let center_fine = state.mesh.locate(0.0, 0.0).unwrap();
        let center_coarse = coarse.mesh.locate(0.0, 0.0).unwrap();
        assert_eq!(coarse.level_set.values[center_coarse], state.level_set.values[center_fine]);
        assert!(coarse.regions.is_active(center_coarse));
        assert_eq!(coarse.regions.n_islands(&coarse.mesh), 1);
        assert!(coarse.regions.active.len() < state.regions.active.len());
        assert!(!coarse.regions.touches_boundary(&coarse.mesh));
        for e in &coarse.regions.active {
            assert!(coarse.arrival_time[*e].is_some());
            assert!(coarse.opening[*e] >= 0.0);
        }
        assert!(coarse.net_pressure[center_coarse] > 0.0);
        assert_eq!(remeshed.materials.k_prime.len(), coarse.mesh.n_element());
        Ok(())
    }

    #[test]
    fn coarsen_captures_errors() -> Result<(), StrError> {
        let solid = ParamSolid::uniform(1e10, 1e6, 0.0);
        let rheology = Rheology::Newtonian { viscosity: 1e-3 };
        let state = static_state(20, &solid, &rheology)?;
        assert_eq!(
            coarsen(&state, &solid, &rheology, TipAsymptote::Universal).err(),
            Some("remeshing requires an odd number of elements along each direction")
        );
        let state = static_state(21, &solid, &rheology)?;
        let mut solid_elements = solid.clone();
        solid_elements.confining_stress = Field::Elements(vec![0.0; 21 * 21]);
        assert_eq!(
            coarsen(&state, &solid_elements, &rheology, TipAsymptote::Universal).err(),
            Some("remeshing requires mesh-independent material fields")
        );
        Ok(())
    }
}

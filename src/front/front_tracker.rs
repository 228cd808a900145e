use super::{fast_marching, FrontRegions, LevelSet};
use crate::base::CartesianMesh;
use crate::tip::TipRegime;
use crate::StrError;
use serde::{Deserialize, Serialize};

/// Holds a piece of the reconstructed front (one per level-set sign change along a lattice edge)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrontSegment {
    /// Active element on the inner side of the crossing
    pub element: usize,

    /// Position of the crossing
    pub position: [f64; 2],

    /// Unit outward normal
    pub normal: [f64; 2],

    /// Propagation regime of the inner element
    pub regime: TipRegime,

    /// Normal velocity of the front at the crossing
    pub velocity: f64,
}

/// Moves and reconstructs the level-set front
pub struct FrontTracker<'a> {
    mesh: &'a CartesianMesh,
}

impl<'a> FrontTracker<'a> {
    /// Allocates a new instance
    pub fn new(mesh: &'a CartesianMesh) -> Self {
        FrontTracker { mesh }
    }

    /// Advances the front by moving the ribbon values with the given velocities
    ///
    /// The ribbon distances grow by `v Δt`; channel values are frozen and all other values are
    /// recomputed by fast marching.
    pub fn advance(
        &self,
        level_set: &LevelSet,
        regions: &FrontRegions,
        velocity: &[f64],
        dt: f64,
    ) -> Result<LevelSet, StrError> {
        if velocity.len() != self.mesh.n_element() {
            return Err("the velocity field does not match the mesh");
        }
        let distance: Vec<_> = regions
            .ribbon
            .iter()
            .map(|r| level_set.distance(*r) + f64::max(velocity[*r], 0.0) * dt)
            .collect();
        self.advance_to(level_set, regions, &distance)
    }

    /// Sets the ribbon distances to the front and rebuilds the level set outside the channel
    ///
    /// `distance` is aligned with `regions.ribbon`.
    pub fn advance_to(&self, level_set: &LevelSet, regions: &FrontRegions, distance: &[f64]) -> Result<LevelSet, StrError> {
        if distance.len() != regions.ribbon.len() {
            return Err("the ribbon distances must be aligned with the ribbon elements");
        }
        if regions.ribbon.is_empty() {
            return Err("the front requires at least one ribbon element");
        }
        let mut values = level_set.values.clone();
        for (r, s) in regions.ribbon.iter().zip(distance) {
            values[*r] = -s;
        }
        let known: Vec<_> = (0..self.mesh.n_element()).map(|e| regions.is_channel(e)).collect();
        fast_marching(self.mesh, &mut values, &known)?;
        LevelSet::from_values(self.mesh, values)
    }

    /// Extracts the front segments by linear interpolation between neighbouring centroids
    ///
    /// `velocity` and `regime` hold one value per element.
    pub fn reconstruct(&self, level_set: &LevelSet, velocity: &[f64], regime: &[TipRegime]) -> Vec<FrontSegment> {
        let phi = &level_set.values;
        let mut segments = Vec::new();
        for a in 0..self.mesh.n_element() {
            let [_, right, _, top] = self.mesh.neighbors(a);
            for b in [right, top].iter().flatten() {
                let b = *b;
                if (phi[a] < 0.0) == (phi[b] < 0.0) {
                    continue;
                }
                let (inner, outer) = if phi[a] < 0.0 { (a, b) } else { (b, a) };
                let theta = phi[inner] / (phi[inner] - phi[outer]);
                let xi = self.mesh.center(inner);
                let xo = self.mesh.center(outer);
                let v_in = velocity.get(inner).copied().unwrap_or(0.0);
                let v_out = velocity.get(outer).copied().unwrap_or(0.0);
                segments.push(FrontSegment {
                    element: inner,
                    position: [xi[0] + theta * (xo[0] - xi[0]), xi[1] + theta * (xo[1] - xi[1])],
                    normal: level_set.normal(self.mesh, inner),
                    regime: regime.get(inner).copied().unwrap_or(TipRegime::Blended),
                    velocity: (1.0 - theta) * v_in + theta * v_out,
                });
            }
        }
        segments
    }
}

/// Returns the largest increase of the distance to the front among the given elements
pub fn max_front_advance(before: &LevelSet, after: &LevelSet, elements: &[usize]) -> f64 {
    elements
        .iter()
        .map(|e| after.distance(*e) - before.distance(*e))
        .fold(0.0, f64::max)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{max_front_advance, FrontTracker};
    use crate::base::CartesianMesh;
    use crate::front::{FrontRegions, LevelSet};
    use crate::tip::TipRegime;
    use crate::StrError;
    use russell_lab::approx_eq;

    #[test]
    fn zero_velocity_keeps_the_active_set() -> Result<(), StrError> {
        let mesh = CartesianMesh::new(1.0, 1.0, 21, 21)?;
        let ls = LevelSet::new_radial(&mesh, [0.0, 0.0], 0.43)?;
        let regions = FrontRegions::build(&mesh, &ls, None)?;
        let tracker = FrontTracker::new(&mesh);
        let zero = vec![0.0; mesh.n_element()];
        let ls1 = tracker.advance(&ls, &regions, &zero, 1.0)?;
        let regions1 = FrontRegions::build(&mesh, &ls1, Some(&regions))?;
        assert_eq!(regions1.active, regions.active);
        let ls2 = tracker.advance(&ls1, &regions1, &zero, 1.0)?;
        let regions2 = FrontRegions::build(&mesh, &ls2, Some(&regions1))?;
        assert_eq!(regions2, regions1);
        for r in &regions.ribbon {
            assert_eq!(ls1.values[*r], ls.values[*r]);
        }
        Ok(())
    }

    #[test]
    fn advance_moves_the_front() -> Result<(), StrError> {
        let mesh = CartesianMesh::new(1.0, 1.0, 21, 21)?;
        let ls = LevelSet::new_radial(&mesh, [0.0, 0.0], 0.43)?;
        let regions = FrontRegions::build(&mesh, &ls, None)?;
        let tracker = FrontTracker::new(&mesh);
        let velocity = vec![0.08; mesh.n_element()];
        let ls1 = tracker.advance(&ls, &regions, &velocity, 1.0)?;
        approx_eq(max_front_advance(&ls, &ls1, &regions.ribbon), 0.08, 1e-15);
        let regions1 = FrontRegions::build(&mesh, &ls1, Some(&regions))?;
        assert!(regions1.active.len() > regions.active.len());
        assert_eq!(regions1.n_islands(&mesh), 1);
        // every element outside the channel moved at least a little toward the inside
        for e in 0..mesh.n_element() {
            if !regions.is_channel(e) {
                assert!(ls1.values[e] < ls.values[e] + 0.5 * mesh.hx);
            }
        }
        assert_eq!(
            tracker.advance_to(&ls, &regions, &[0.0]).err(),
            Some("the ribbon distances must be aligned with the ribbon elements")
        );
        Ok(())
    }

    #[test]
    fn reconstruct_works() -> Result<(), StrError> {
        let mesh = CartesianMesh::new(1.0, 1.0, 41, 41)?;
        let radius = 0.52;
        let ls = LevelSet::new_radial(&mesh, [0.0, 0.0], radius)?;
        let velocity = vec![1.0; mesh.n_element()];
        let regime = vec![TipRegime::Toughness; mesh.n_element()];
        let segments = FrontTracker::new(&mesh).reconstruct(&ls, &velocity, &regime);
        assert!(segments.len() > 40);
        for s in &segments {
            let r = f64::hypot(s.position[0], s.position[1]);
            // linear interpolation of the exact distance is accurate to O(h²/R)
            assert!(f64::abs(r - radius) < 0.1 * mesh.hx);
            // the outward normal points away from the centre
            assert!(s.normal[0] * s.position[0] + s.normal[1] * s.position[1] > 0.0);
            approx_eq(s.velocity, 1.0, 1e-15);
            assert_eq!(s.regime, TipRegime::Toughness);
        }
        Ok(())
    }
}

use super::LevelSet;
use crate::base::CartesianMesh;
use crate::StrError;
use serde::{Deserialize, Serialize};

/// Defines the role of an element with respect to the fracture
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementStatus {
    /// Outside the fracture
    Inactive,

    /// Active element away from the front
    Channel,

    /// Channel element adjacent to a tip element
    Ribbon,

    /// Active element with an inactive neighbour
    Tip,
}

/// Holds the active set and its partition into channel, tip and ribbon elements
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrontRegions {
    /// Status of every element
    pub status: Vec<ElementStatus>,

    /// All active elements (sorted)
    pub active: Vec<usize>,

    /// Channel elements, ribbon included (sorted)
    pub channel: Vec<usize>,

    /// Tip elements (sorted)
    pub tip: Vec<usize>,

    /// Ribbon elements (sorted)
    pub ribbon: Vec<usize>,
}

impl FrontRegions {
    /// Classifies the elements given the level set
    ///
    /// An element is active if its value is ≤ 0 or if the front crossing coming from a 4-neighbour
    /// with a negative value lies at least half way toward it (`φ_e ≤ -φ_f`; exactly half way counts
    /// as active). Previously active elements remain active.
    pub fn build(mesh: &CartesianMesh, level_set: &LevelSet, previous: Option<&FrontRegions>) -> Result<Self, StrError> {
        let n = mesh.n_element();
        if level_set.values.len() != n {
            return Err("the level set does not match the mesh");
        }
        if let Some(prev) = previous {
            if prev.status.len() != n {
                return Err("the previous regions do not match the mesh");
            }
        }
        let phi = &level_set.values;
        let is_active: Vec<bool> = (0..n)
            .map(|e| {
                if let Some(prev) = previous {
                    if prev.is_active(e) {
                        return true;
                    }
                }
                if phi[e] <= 0.0 {
                    return true;
                }
                mesh.neighbors(e)
                    .iter()
                    .flatten()
                    .any(|f| phi[*f] < 0.0 && phi[e] <= -phi[*f])
            })
            .collect();

        let mut status = vec![ElementStatus::Inactive; n];
        for e in 0..n {
            if is_active[e] {
                let at_front = mesh.neighbors(e).iter().any(|f| match f {
                    Some(f) => !is_active[*f],
                    None => true,
                });
                status[e] = if at_front {
                    ElementStatus::Tip
                } else {
                    ElementStatus::Channel
                };
            }
        }
        for e in 0..n {
            if status[e] == ElementStatus::Channel
                && mesh
                    .neighbors(e)
                    .iter()
                    .flatten()
                    .any(|f| status[*f] == ElementStatus::Tip)
            {
                status[e] = ElementStatus::Ribbon;
            }
        }

        let select = |pred: &dyn Fn(ElementStatus) -> bool| (0..n).filter(|e| pred(status[*e])).collect::<Vec<_>>();
        let active = select(&|s| s != ElementStatus::Inactive);
        let channel = select(&|s| s == ElementStatus::Channel || s == ElementStatus::Ribbon);
        let tip = select(&|s| s == ElementStatus::Tip);
        let ribbon = select(&|s| s == ElementStatus::Ribbon);
        Ok(FrontRegions {
            status,
            active,
            channel,
            tip,
            ribbon,
        })
    }

    /// Returns true if the element is inside the fracture or on its front
    #[inline]
    pub fn is_active(&self, e: usize) -> bool {
        self.status[e] != ElementStatus::Inactive
    }

    /// Returns true if the element is a channel element (ribbon included)
    #[inline]
    pub fn is_channel(&self, e: usize) -> bool {
        matches!(self.status[e], ElementStatus::Channel | ElementStatus::Ribbon)
    }

    /// Returns true if the element is a tip element
    #[inline]
    pub fn is_tip(&self, e: usize) -> bool {
        self.status[e] == ElementStatus::Tip
    }

    /// Returns true if any active element lies on the outer row/column of the mesh
    pub fn touches_boundary(&self, mesh: &CartesianMesh) -> bool {
        self.active.iter().any(|e| mesh.is_boundary(*e))
    }

    /// Returns the number of 4-connected components of the active set
    pub fn n_islands(&self, mesh: &CartesianMesh) -> usize {
        let mut visited = vec![false; self.status.len()];
        let mut count = 0;
        let mut stack = Vec::new();
        for &start in &self.active {
            if visited[start] {
                continue;
            }
            count += 1;
            visited[start] = true;
            stack.push(start);
            while let Some(e) = stack.pop() {
                for f in mesh.neighbors(e).iter().flatten() {
                    if self.is_active(*f) && !visited[*f] {
                        visited[*f] = true;
                        stack.push(*f);
                    }
                }
            }
        }
        count
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{ElementStatus, FrontRegions};
    use crate::base::CartesianMesh;
    use crate::front::LevelSet;
    use crate::StrError;

    #[test]
    fn build_works() -> Result<(), StrError> {
        let mesh = CartesianMesh::new(1.0, 1.0, 11, 11)?;
        let ls = LevelSet::new_radial(&mesh, [0.0, 0.0], 0.45)?;
        let regions = FrontRegions::build(&mesh, &ls, None)?;
        let c = mesh.index(5, 5);
        assert_eq!(regions.status[c], ElementStatus::Channel);
        // φ = 0.4 - 0.45 < 0 at (7, 5); φ = 0.6 - 0.45 = 0.15 ≤ 0.05? no; so (8, 5) is inactive
        assert_eq!(regions.status[mesh.index(7, 5)], ElementStatus::Tip);
        assert_eq!(regions.status[mesh.index(8, 5)], ElementStatus::Inactive);
        assert_eq!(regions.status[mesh.index(6, 5)], ElementStatus::Ribbon);
        assert_eq!(regions.n_islands(&mesh), 1);
        assert!(!regions.touches_boundary(&mesh));
        for e in &regions.active {
            assert!(regions.is_channel(*e) || regions.is_tip(*e));
        }
        assert_eq!(regions.active.len(), regions.channel.len() + regions.tip.len());
        Ok(())
    }

    #[test]
    fn half_crossing_is_active() -> Result<(), StrError> {
        // two elements along x: φ = -0.1 and φ = +0.1 (crossing exactly half way)
        let mesh = CartesianMesh::new(1.0, 1.0, 5, 5)?;
        let mut values = vec![1.0; mesh.n_element()];
        values[mesh.index(2, 2)] = -0.1;
        values[mesh.index(3, 2)] = 0.1;
        values[mesh.index(1, 2)] = 0.1000001;
        let ls = LevelSet::from_values(&mesh, values)?;
        let regions = FrontRegions::build(&mesh, &ls, None)?;
        assert!(regions.is_active(mesh.index(3, 2)));
        assert!(!regions.is_active(mesh.index(1, 2)));
        assert_eq!(regions.active, &[mesh.index(2, 2), mesh.index(3, 2)]);
        Ok(())
    }

    #[test]
    fn active_set_never_shrinks() -> Result<(), StrError> {
        let mesh = CartesianMesh::new(1.0, 1.0, 11, 11)?;
        let large = LevelSet::new_radial(&mesh, [0.0, 0.0], 0.45)?;
        let small = LevelSet::new_radial(&mesh, [0.0, 0.0], 0.25)?;
        let before = FrontRegions::build(&mesh, &large, None)?;
        let after = FrontRegions::build(&mesh, &small, Some(&before))?;
        assert_eq!(before.active, after.active);
        Ok(())
    }

    #[test]
    fn islands_and_boundary_work() -> Result<(), StrError> {
        let mesh = CartesianMesh::new(1.0, 1.0, 7, 7)?;
        let mut values = vec![1.0; mesh.n_element()];
        values[mesh.index(1, 1)] = -1.0;
        values[mesh.index(4, 4)] = -1.0;
        values[mesh.index(6, 3)] = -1.0;
        let ls = LevelSet::from_values(&mesh, values)?;
        let regions = FrontRegions::build(&mesh, &ls, None)?;
        assert_eq!(regions.n_islands(&mesh), 3);
        assert!(regions.touches_boundary(&mesh));
        Ok(())
    }
}

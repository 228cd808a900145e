use crate::base::CartesianMesh;
use crate::StrError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Holds the signed distance to the front at every element (negative inside)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelSet {
    /// One value per element
    pub values: Vec<f64>,
}

impl LevelSet {
    /// Allocates the exact signed distance to a circle
    pub fn new_radial(mesh: &CartesianMesh, center: [f64; 2], radius: f64) -> Result<Self, StrError> {
        if !(radius > 0.0) {
            return Err("the radius must be > 0.0");
        }
        let values = (0..mesh.n_element())
            .map(|e| {
                let x = mesh.center(e);
                f64::hypot(x[0] - center[0], x[1] - center[1]) - radius
            })
            .collect();
        Ok(LevelSet { values })
    }

    /// Allocates a level set from given values
    pub fn from_values(mesh: &CartesianMesh, values: Vec<f64>) -> Result<Self, StrError> {
        if values.len() != mesh.n_element() {
            return Err("the number of level-set values must equal the number of elements");
        }
        Ok(LevelSet { values })
    }

    /// Returns the distance from the centroid of an element to the front (positive inside)
    #[inline]
    pub fn distance(&self, e: usize) -> f64 {
        -self.values[e]
    }

    /// Returns the unit outward normal at an element (gradient of the level set)
    pub fn normal(&self, mesh: &CartesianMesh, e: usize) -> [f64; 2] {
        let [left, right, bottom, top] = mesh.neighbors(e);
        let diff = |minus: Option<usize>, plus: Option<usize>, h: f64| match (minus, plus) {
            (Some(m), Some(p)) => (self.values[p] - self.values[m]) / (2.0 * h),
            (None, Some(p)) => (self.values[p] - self.values[e]) / h,
            (Some(m), None) => (self.values[e] - self.values[m]) / h,
            (None, None) => 0.0,
        };
        let gx = diff(left, right, mesh.hx);
        let gy = diff(bottom, top, mesh.hy);
        let norm = f64::hypot(gx, gy);
        if norm > 0.0 {
            [gx / norm, gy / norm]
        } else {
            [1.0, 0.0]
        }
    }
}

/// Holds a trial value in the narrow band
#[derive(Clone, Copy, Debug)]
struct Candidate {
    value: f64,
    element: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    // reversed to make BinaryHeap a min-heap; ties broken by element index
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .value
            .total_cmp(&self.value)
            .then_with(|| other.element.cmp(&self.element))
    }
}

/// Solves the eikonal equation |∇φ| = 1 outward from the known values (fast marching)
///
/// Unknown values are overwritten with the first-order upwind solution of
///
/// ```text
/// (φ - a)²/hx² + (φ - b)²/hy² = 1
/// ```
///
/// where `a` and `b` are the smallest accepted neighbours along x and y. Known values are not modified.
pub fn fast_marching(mesh: &CartesianMesh, values: &mut [f64], known: &[bool]) -> Result<(), StrError> {
    let n = mesh.n_element();
    if values.len() != n || known.len() != n {
        return Err("fast marching requires one value and one flag per element");
    }
    if !known.iter().any(|k| *k) {
        return Err("fast marching requires at least one known value");
    }
    let mut accepted = known.to_vec();
    let mut tentative = vec![f64::INFINITY; n];
    let mut heap = BinaryHeap::new();

    // narrow band around the known region
    for e in 0..n {
        if accepted[e] {
            continue;
        }
        if mesh.neighbors(e).iter().flatten().any(|f| accepted[*f]) {
            tentative[e] = upwind(mesh, values, &accepted, e);
            heap.push(Candidate {
                value: tentative[e],
                element: e,
            });
        }
    }

    // march
    while let Some(Candidate { value, element }) = heap.pop() {
        if accepted[element] || value > tentative[element] {
            continue; // stale
        }
        accepted[element] = true;
        values[element] = value;
        for f in mesh.neighbors(element).iter().flatten() {
            if accepted[*f] {
                continue;
            }
            let trial = upwind(mesh, values, &accepted, *f);
            if trial < tentative[*f] {
                tentative[*f] = trial;
                heap.push(Candidate {
                    value: trial,
                    element: *f,
                });
            }
        }
    }
    Ok(())
}

/// Computes the upwind update of an element from its accepted neighbours
fn upwind(mesh: &CartesianMesh, values: &[f64], accepted: &[bool], e: usize) -> f64 {
    let [left, right, bottom, top] = mesh.neighbors(e);
    let pick = |x: Option<usize>, y: Option<usize>| {
        [x, y]
            .iter()
            .flatten()
            .filter(|f| accepted[**f])
            .map(|f| values[*f])
            .fold(f64::INFINITY, f64::min)
    };
    let a = pick(left, right);
    let b = pick(bottom, top);
    let (hx, hy) = (mesh.hx, mesh.hy);
    let simple = f64::min(a + hx, b + hy);
    if !a.is_finite() || !b.is_finite() {
        return simple;
    }
    let (alpha, beta) = (1.0 / (hx * hx), 1.0 / (hy * hy));
    let sum = alpha + beta;
    let mean = alpha * a + beta * b;
    let disc = mean * mean - sum * (alpha * a * a + beta * b * b - 1.0);
    if disc < 0.0 {
        return simple;
    }
    let phi = (mean + f64::sqrt(disc)) / sum;
    if phi < f64::max(a, b) {
        simple
    } else {
        phi
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{fast_marching, LevelSet};
    use crate::base::CartesianMesh;
    use crate::StrError;
    use russell_lab::approx_eq;

    #[test]
    fn new_radial_works() -> Result<(), StrError> {
        let mesh = CartesianMesh::new(1.0, 1.0, 11, 11)?;
        let ls = LevelSet::new_radial(&mesh, [0.0, 0.0], 0.35)?;
        approx_eq(ls.values[mesh.index(5, 5)], -0.35, 1e-15);
        approx_eq(ls.distance(mesh.index(7, 5)), -0.05, 1e-15);
        let n = ls.normal(&mesh, mesh.index(8, 5));
        approx_eq(n[0], 1.0, 1e-15);
        approx_eq(n[1], 0.0, 1e-15);
        assert_eq!(
            LevelSet::from_values(&mesh, vec![0.0; 3]).err(),
            Some("the number of level-set values must equal the number of elements")
        );
        Ok(())
    }

    #[test]
    fn fast_marching_recovers_planar_distance() -> Result<(), StrError> {
        // planar front near the left boundary with known values on the first two columns
        let mesh = CartesianMesh::new(1.0, 0.5, 21, 11)?;
        let exact: Vec<_> = (0..mesh.n_element()).map(|e| mesh.center(e)[0] - 0.05 + 1.0).collect();
        let known: Vec<_> = (0..mesh.n_element()).map(|e| mesh.ij(e).0 < 2).collect();
        let mut values: Vec<_> = exact.iter().zip(&known).map(|(v, k)| if *k { *v } else { 0.0 }).collect();
        fast_marching(&mesh, &mut values, &known)?;
        for e in 0..mesh.n_element() {
            approx_eq(values[e], exact[e], 1e-13);
        }
        Ok(())
    }

    #[test]
    fn fast_marching_approximates_radial_distance() -> Result<(), StrError> {
        let mesh = CartesianMesh::new(1.0, 1.0, 41, 41)?;
        let exact = LevelSet::new_radial(&mesh, [0.0, 0.0], 0.3)?;
        let known: Vec<_> = exact.values.iter().map(|v| *v < 0.0).collect();
        let mut values = exact.values.clone();
        fast_marching(&mesh, &mut values, &known)?;
        for e in 0..mesh.n_element() {
            if known[e] {
                assert_eq!(values[e], exact.values[e]);
            } else {
                // first-order scheme overestimates the distance along the diagonals
                assert!(f64::abs(values[e] - exact.values[e]) < 0.1 * exact.values[e] + 2.0 * mesh.hx);
            }
        }
        Ok(())
    }

    #[test]
    fn fast_marching_captures_errors() {
        let mesh = CartesianMesh::new(1.0, 1.0, 3, 3).unwrap();
        let mut values = vec![0.0; 9];
        assert_eq!(
            fast_marching(&mesh, &mut values, &[false; 9]).err(),
            Some("fast marching requires at least one known value")
        );
        assert_eq!(
            fast_marching(&mesh, &mut values, &[true; 3]).err(),
            Some("fast marching requires one value and one flag per element")
        );
    }
}

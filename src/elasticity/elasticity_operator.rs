use super::influence_coefficient;
use crate::base::CartesianMesh;
use crate::StrError;
use rayon::prelude::*;
use russell_lab::Matrix;

/// Holds the lazily extended influence matrix of the fracture plane
///
/// Elements receive a slot on first reference and keep it for the lifetime of the operator
/// (slots are never reused). Coefficients are stored packed by slot as a lower triangle:
///
/// ```text
/// C[p][q] → coefficients[p (p + 1) / 2 + q]   with q ≤ p
/// ```
///
/// so each newly covered element appends one row and existing coefficients are never recomputed.
/// A geometry change (remeshing) requires a new operator.
pub struct ElasticityOperator {
    /// Lattice geometry
    mesh: CartesianMesh,

    /// Plane-strain modulus
    e_prime: f64,

    /// Maps element index to slot
    slot_of: Vec<Option<usize>>,

    /// Maps slot to element index
    elements: Vec<usize>,

    /// Packed lower-triangular coefficients
    coefficients: Vec<f64>,
}

impl ElasticityOperator {
    /// Allocates a new instance without any covered element
    pub fn new(mesh: &CartesianMesh, e_prime: f64) -> Result<Self, StrError> {
        if !(e_prime > 0.0) {
            return Err("the plane-strain modulus must be > 0.0");
        }
        Ok(ElasticityOperator {
            mesh: mesh.clone(),
            e_prime,
            slot_of: vec![None; mesh.n_element()],
            elements: Vec::new(),
            coefficients: Vec::new(),
        })
    }

    /// Returns the number of covered elements
    pub fn n_covered(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if the element has been covered
    pub fn is_covered(&self, e: usize) -> bool {
        matches!(self.slot_of.get(e), Some(Some(_)))
    }

    /// Returns the self-influence coefficient (the same for all elements)
    pub fn self_coefficient(&self) -> f64 {
        influence_coefficient(self.e_prime, 0.5 * self.mesh.hx, 0.5 * self.mesh.hy, 0.0, 0.0)
    }

    /// Computes the coefficient between two elements from their lattice offset
    fn kernel(&self, a: usize, b: usize) -> f64 {
        let (di, dj) = self.mesh.offset(a, b);
        let x = (di as f64) * self.mesh.hx;
        let y = (dj as f64) * self.mesh.hy;
        influence_coefficient(self.e_prime, 0.5 * self.mesh.hx, 0.5 * self.mesh.hy, x, y)
    }

    /// Guarantees that the coefficients between all pairs of the given elements exist
    ///
    /// Returns the number of newly covered elements.
    pub fn ensure_coverage(&mut self, set: &[usize]) -> Result<usize, StrError> {
        let n0 = self.elements.len();
        for &e in set {
            if e >= self.slot_of.len() {
                return Err("element index is out of bounds");
            }
            if self.slot_of[e].is_none() {
                self.slot_of[e] = Some(self.elements.len());
                self.elements.push(e);
            }
        }
        let n1 = self.elements.len();
        if n1 == n0 {
            return Ok(0);
        }
        let this = &*self;
        let rows: Vec<Vec<f64>> = (n0..n1)
            .into_par_iter()
            .map(|p| {
                let a = this.elements[p];
                (0..=p).map(|q| this.kernel(a, this.elements[q])).collect()
            })
            .collect();
        self.coefficients.reserve(rows.iter().map(|r| r.len()).sum());
        for row in rows {
            self.coefficients.extend(row);
        }
        Ok(n1 - n0)
    }

    /// Returns the slots of a set of elements
    fn slots(&self, set: &[usize]) -> Result<Vec<usize>, StrError> {
        set.iter()
            .map(|&e| match self.slot_of.get(e) {
                Some(Some(p)) => Ok(*p),
                _ => Err("all elements must be covered by the elasticity operator"),
            })
            .collect()
    }

    /// Returns the coefficient between two slots
    #[inline]
    fn packed(&self, p: usize, q: usize) -> f64 {
        if q <= p {
            self.coefficients[p * (p + 1) / 2 + q]
        } else {
            self.coefficients[q * (q + 1) / 2 + p]
        }
    }

    /// Returns the coefficient C(i, j) if both elements are covered
    pub fn coefficient(&self, i: usize, j: usize) -> Option<f64> {
        match (self.slot_of.get(i), self.slot_of.get(j)) {
            (Some(Some(p)), Some(Some(q))) => Some(self.packed(*p, *q)),
            _ => None,
        }
    }

    /// Calculates the stress induced at each element of `set` by the openings of `set`
    ///
    /// `opening` is aligned with `set`.
    pub fn apply(&self, set: &[usize], opening: &[f64]) -> Result<Vec<f64>, StrError> {
        if opening.len() != set.len() {
            return Err("the opening vector must be aligned with the element set");
        }
        let slots = self.slots(set)?;
        Ok(slots
            .par_iter()
            .map(|&p| slots.iter().zip(opening).map(|(&q, w)| self.packed(p, q) * w).sum())
            .collect())
    }

    /// Returns the dense influence matrix restricted to a set of elements
    pub fn submatrix(&self, set: &[usize]) -> Result<Matrix, StrError> {
        let slots = self.slots(set)?;
        let n = slots.len();
        let mut cc = Matrix::new(n, n);
        for i in 0..n {
            for j in 0..n {
                cc.set(i, j, self.packed(slots[i], slots[j]));
            }
        }
        Ok(cc)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

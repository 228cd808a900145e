use super::FlowSystem;
use crate::StrError;
use rayon::prelude::*;
use russell_lab::{Matrix, Vector};

/// Defines a non-linear system R(x) = 0 solved by Newton's method
pub trait FlowResidual {
    /// Returns the number of unknowns
    fn n_unknown(&self) -> usize;

    /// Returns the characteristic magnitude of the unknowns
    fn scale(&self) -> f64;

    /// Calculates the residual vector
    fn residual(&self, x: &Vector) -> Result<Vector, StrError>;

    /// Calculates the Jacobian matrix ∂R/∂x
    fn jacobian(&self, x: &Vector) -> Result<Matrix, StrError>;
}

impl FlowSystem {
    /// Returns true if the tip element (local index) exchanges no fluid with its neighbours
    fn is_isolated_tip(&self, a: usize, k: &[f64]) -> bool {
        a >= self.n_channel && self.adjacency[a].iter().all(|ei| k[*ei] <= 0.0)
    }

    /// Returns the local index of the element across an edge
    #[inline]
    fn other(&self, ei: usize, a: usize) -> usize {
        let edge = &self.edges[ei];
        if edge.a == a {
            edge.b
        } else {
            edge.a
        }
    }

    /// Calculates the edge conductivities
    fn conductivities(&self, w: &[f64], p: &[f64]) -> Vec<f64> {
        self.edges.iter().map(|edge| self.edge_conductivity(edge, w, p)).collect()
    }
}

impl FlowResidual for FlowSystem {
    fn n_unknown(&self) -> usize {
        self.active.len()
    }

    fn scale(&self) -> f64 {
        self.opening_scale
    }

    /// Calculates the mass balance of every active element
    ///
    /// ```text
    /// R_a = w_a - w_a⁰ + Δt Σ_b k_ab (p_a - p_b) / h_ab² - S_a
    /// ```
    ///
    /// A tip element without conductive edges is replaced by `p_a = σ0_a`.
    fn residual(&self, x: &Vector) -> Result<Vector, StrError> {
        let n = self.active.len();
        if x.dim() != n {
            return Err("x has an incorrect dimension");
        }
        let (w, p) = self.fields(x);
        let k = self.conductivities(&w, &p);
        let values: Vec<f64> = (0..n)
            .into_par_iter()
            .map(|a| {
                if self.is_isolated_tip(a, &k) {
                    return x[a] - self.sigma0[a] / self.p_scale;
                }
                let mut flux = 0.0;
                for &ei in &self.adjacency[a] {
                    let b = self.other(ei, a);
                    flux += k[ei] * (p[a] - p[b]) / self.edges[ei].h2;
                }
                w[a] - self.opening_old[a] + self.dt * flux - self.source[a]
            })
            .collect();
        Ok(Vector::from(&values))
    }

    /// Calculates the Jacobian with frozen pressure gradients in the power-law conductivity
    fn jacobian(&self, x: &Vector) -> Result<Matrix, StrError> {
        let n = self.active.len();
        let nc = self.n_channel;
        if x.dim() != n {
            return Err("x has an incorrect dimension");
        }
        let (w, p) = self.fields(x);
        let k = self.conductivities(&w, &p);
        let rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|a| {
                let mut row = vec![0.0; n];
                if self.is_isolated_tip(a, &k) {
                    row[a] = 1.0;
                    return row;
                }
                if a < nc {
                    row[a] = 1.0;
                }
                for &ei in &self.adjacency[a] {
                    let edge = &self.edges[ei];
                    let b = self.other(ei, a);
                    let coef = self.dt * k[ei] / edge.h2;

                    // pressure dependence on the channel openings
                    if coef != 0.0 {
                        for j in 0..nc {
                            let dpa = if a < nc { self.cc.get(a, j) } else { 0.0 };
                            let dpb = if b < nc { self.cc.get(b, j) } else { 0.0 };
                            row[j] += coef * (dpa - dpb);
                        }
                        if a >= nc {
                            row[a] += coef * self.p_scale;
                        }
                        if b >= nc {
                            row[b] -= coef * self.p_scale;
                        }
                    }

                    // conductivity dependence on the openings
                    if edge.fixed_width.is_none() {
                        let width = self.edge_width(edge, &w);
                        let grad = (p[edge.a] - p[edge.b]) / f64::sqrt(edge.h2);
                        let dk = 0.5 * self.rheology.conductivity_deriv(width, grad, self.grad_min);
                        let term = self.dt * dk * (p[a] - p[b]) / edge.h2;
                        if a < nc {
                            row[a] += term;
                        }
                        if b < nc {
                            row[b] += term;
                        }
                    }
                }
                row
            })
            .collect();
        let mut jj = Matrix::new(n, n);
        for (i, row) in rows.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                jj.set(i, j, *value);
            }
        }
        Ok(jj)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

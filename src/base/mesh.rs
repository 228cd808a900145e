use crate::StrError;
use serde::{Deserialize, Serialize};

/// Holds a regular Cartesian lattice over the fracture plane
///
/// The element centroids span `[-lx, lx] × [-ly, ly]`; hence, the element sizes are
/// `hx = 2 lx / (nx - 1)` and `hy = 2 ly / (ny - 1)`. Elements are numbered row by row:
///
/// ```text
/// e = j * nx + i
/// ```
///
/// Neighbours are obtained by index arithmetic and are never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartesianMesh {
    /// Number of elements along x
    pub nx: usize,

    /// Number of elements along y
    pub ny: usize,

    /// Half-length of the domain (between outermost centroids) along x
    pub lx: f64,

    /// Half-length of the domain (between outermost centroids) along y
    pub ly: f64,

    /// Element size along x
    pub hx: f64,

    /// Element size along y
    pub hy: f64,
}

impl CartesianMesh {
    /// Allocates a new instance
    pub fn new(lx: f64, ly: f64, nx: usize, ny: usize) -> Result<Self, StrError> {
        if nx < 3 || ny < 3 {
            return Err("the mesh requires at least 3 elements along each direction");
        }
        if !(lx > 0.0) || !(ly > 0.0) {
            return Err("the mesh half-lengths must be > 0.0");
        }
        Ok(CartesianMesh {
            nx,
            ny,
            lx,
            ly,
            hx: 2.0 * lx / ((nx - 1) as f64),
            hy: 2.0 * ly / ((ny - 1) as f64),
        })
    }

    /// Returns the number of elements
    #[inline]
    pub fn n_element(&self) -> usize {
        self.nx * self.ny
    }

    /// Returns the area of one element
    #[inline]
    pub fn area(&self) -> f64 {
        self.hx * self.hy
    }

    /// Returns the smallest element size
    #[inline]
    pub fn min_size(&self) -> f64 {
        f64::min(self.hx, self.hy)
    }

    /// Returns the length of the element diagonal
    #[inline]
    pub fn diagonal(&self) -> f64 {
        f64::sqrt(self.hx * self.hx + self.hy * self.hy)
    }

    /// Returns the element index given the lattice indices
    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        j * self.nx + i
    }

    /// Returns the lattice indices (i, j) of an element
    #[inline]
    pub fn ij(&self, e: usize) -> (usize, usize) {
        (e % self.nx, e / self.nx)
    }

    /// Returns the centroid of an element
    #[inline]
    pub fn center(&self, e: usize) -> [f64; 2] {
        let (i, j) = self.ij(e);
        [-self.lx + (i as f64) * self.hx, -self.ly + (j as f64) * self.hy]
    }

    /// Returns the left, right, bottom and top neighbours (in this order)
    pub fn neighbors(&self, e: usize) -> [Option<usize>; 4] {
        let (i, j) = self.ij(e);
        [
            if i > 0 { Some(e - 1) } else { None },
            if i + 1 < self.nx { Some(e + 1) } else { None },
            if j > 0 { Some(e - self.nx) } else { None },
            if j + 1 < self.ny { Some(e + self.nx) } else { None },
        ]
    }

    /// Returns the eight surrounding elements
    ///
    /// The order is: left, right, bottom, top, bottom-left, bottom-right, top-left, top-right
    pub fn neighbors8(&self, e: usize) -> [Option<usize>; 8] {
        let (i, j) = self.ij(e);
        let at = |di: isize, dj: isize| {
            let ii = i as isize + di;
            let jj = j as isize + dj;
            if ii < 0 || jj < 0 || ii >= self.nx as isize || jj >= self.ny as isize {
                None
            } else {
                Some(self.index(ii as usize, jj as usize))
            }
        };
        [
            at(-1, 0),
            at(1, 0),
            at(0, -1),
            at(0, 1),
            at(-1, -1),
            at(1, -1),
            at(-1, 1),
            at(1, 1),
        ]
    }

    /// Returns the spacing between centroids across the k-th neighbour edge (k as in `neighbors`)
    #[inline]
    pub fn spacing(&self, k: usize) -> f64 {
        if k < 2 {
            self.hx
        } else {
            self.hy
        }
    }

    /// Returns true if the element lies on the outer row/column of the lattice
    #[inline]
    pub fn is_boundary(&self, e: usize) -> bool {
        let (i, j) = self.ij(e);
        i == 0 || j == 0 || i + 1 == self.nx || j + 1 == self.ny
    }

    /// Finds the element containing the point (x, y)
    pub fn locate(&self, x: f64, y: f64) -> Option<usize> {
        let fi = ((x + self.lx) / self.hx + 0.5).floor();
        let fj = ((y + self.ly) / self.hy + 0.5).floor();
        if fi < 0.0 || fj < 0.0 || fi >= self.nx as f64 || fj >= self.ny as f64 {
            return None;
        }
        Some(self.index(fi as usize, fj as usize))
    }

    /// Returns the offset in lattice units between two elements
    #[inline]
    pub fn offset(&self, a: usize, b: usize) -> (isize, isize) {
        let (ia, ja) = self.ij(a);
        let (ib, jb) = self.ij(b);
        (ia as isize - ib as isize, ja as isize - jb as isize)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

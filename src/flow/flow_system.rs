use crate::base::{CartesianMesh, MaterialFields, Rheology};
use crate::elasticity::ElasticityOperator;
use crate::front::{FrontRegions, LevelSet};
use crate::tip::TipRegime;
use crate::StrError;
use russell_lab::{Matrix, Vector};

/// Holds an edge between two active elements
#[derive(Clone, Debug)]
pub struct FlowEdge {
    /// Local index of the first element
    pub a: usize,

    /// Local index of the second element
    pub b: usize,

    /// Squared distance between the centroids
    pub h2: f64,

    /// Opening given by the tip closure (None means the mean of both openings)
    pub fixed_width: Option<f64>,
}

/// Holds the data required to assemble the trial-domain flow problem
pub struct FlowInput<'a> {
    /// Lattice
    pub mesh: &'a CartesianMesh,

    /// Trial regions
    pub regions: &'a FrontRegions,

    /// Trial level set
    pub level_set: &'a LevelSet,

    /// Material properties per element
    pub materials: &'a MaterialFields,

    /// Fluid rheology
    pub rheology: &'a Rheology,

    /// Opening at the beginning of the step (per element)
    pub opening_old: &'a [f64],

    /// Opening imposed by the tip closure (per element; only tip elements are read)
    pub tip_opening: &'a [f64],

    /// Regime of every element
    pub regime: &'a [TipRegime],

    /// Trial front velocity (per element)
    pub velocity: &'a [f64],

    /// Net volume source over the step divided by the element area (per element)
    pub source: &'a [f64],

    /// Time increment
    pub dt: f64,
}

/// Holds the flow problem over a fixed trial domain
///
/// The active elements are numbered locally with the channel elements first and then the tip
/// elements. The unknowns are the channel openings and the tip pressures divided by `p_scale`:
///
/// ```text
/// x = [ w_channel | p_tip / p_scale ]
/// ```
///
/// The channel pressure follows from elasticity, `p = σ0 + C w`, and the tip openings are imposed.
pub struct FlowSystem {
    /// Active elements (channel first)
    pub active: Vec<usize>,

    /// Number of channel elements
    pub n_channel: usize,

    /// Influence matrix among the active elements
    pub(crate) cc: Matrix,

    /// Confining stress (local)
    pub(crate) sigma0: Vec<f64>,

    /// Opening at the beginning of the step (local)
    pub(crate) opening_old: Vec<f64>,

    /// Opening of the tip elements (local; zero for channel elements)
    pub(crate) opening_tip: Vec<f64>,

    /// Volume source divided by area (local)
    pub(crate) source: Vec<f64>,

    /// Edges between active elements
    pub(crate) edges: Vec<FlowEdge>,

    /// Edges of each element (local)
    pub(crate) adjacency: Vec<Vec<usize>>,

    /// Fluid rheology
    pub(crate) rheology: Rheology,

    /// Time increment
    pub(crate) dt: f64,

    /// Scaling factor of the tip pressures
    pub(crate) p_scale: f64,

    /// Smallest pressure gradient used by the power-law conductivity
    pub(crate) grad_min: f64,

    /// Characteristic opening
    pub(crate) opening_scale: f64,
}

impl FlowSystem {
    /// Assembles the flow problem (the active elements must be covered by the elasticity operator)
    pub fn new(input: &FlowInput, elasticity: &ElasticityOperator) -> Result<Self, StrError> {
        let mesh = input.mesh;
        let n_element = mesh.n_element();
        if input.opening_old.len() != n_element
            || input.tip_opening.len() != n_element
            || input.regime.len() != n_element
            || input.velocity.len() != n_element
            || input.source.len() != n_element
        {
            return Err("flow input fields must have one value per element");
        }
        if !(input.dt > 0.0) {
            return Err("Δt must be > 0.0");
        }
        let regions = input.regions;
        let active: Vec<usize> = regions.channel.iter().chain(regions.tip.iter()).copied().collect();
        let n_channel = regions.channel.len();
        let n = active.len();
        if n == 0 {
            return Err("the flow problem requires at least one active element");
        }
        let mut local = vec![None; n_element];
        for (i, e) in active.iter().enumerate() {
            local[*e] = Some(i);
        }

        // element data
        let cc = elasticity.submatrix(&active)?;
        let sigma0 = active.iter().map(|e| input.materials.sigma0[*e]).collect();
        let opening_old = active.iter().map(|e| input.opening_old[*e]).collect();
        let opening_tip = active
            .iter()
            .enumerate()
            .map(|(i, e)| if i < n_channel { 0.0 } else { input.tip_opening[*e] })
            .collect();
        let source = active.iter().map(|e| input.source[*e]).collect();

        // edges
        let phi = &input.level_set.values;
        let mut edges = Vec::new();
        let mut adjacency = vec![Vec::new(); n];
        for (ia, ea) in active.iter().enumerate() {
            let neighbors = mesh.neighbors(*ea);
            for k in [1, 3] {
                let eb = match neighbors[k] {
                    Some(eb) => eb,
                    None => continue,
                };
                let ib = match local[eb] {
                    Some(ib) => ib,
                    None => continue,
                };
                let h = mesh.spacing(k);
                let fixed_width = if regions.is_tip(*ea) || regions.is_tip(eb) {
                    let tip = if regions.is_tip(*ea) { *ea } else { eb };
                    let s = -0.5 * (phi[*ea] + phi[eb]);
                    if s > 0.0 {
                        let params = input.materials.tip_params(tip, input.rheology);
                        Some(input.regime[tip].opening(&params, s, input.velocity[tip]))
                    } else {
                        None
                    }
                } else {
                    None
                };
                adjacency[ia].push(edges.len());
                adjacency[ib].push(edges.len());
                edges.push(FlowEdge {
                    a: ia,
                    b: ib,
                    h2: h * h,
                    fixed_width,
                });
            }
        }

        // scales
        let p_scale = elasticity.self_coefficient();
        let opening_scale = active
            .iter()
            .map(|e| f64::max(input.opening_old[*e], input.tip_opening[*e]))
            .fold(f64::MIN_POSITIVE, f64::max);
        let grad_min = 1e-9 * p_scale * opening_scale / mesh.min_size();
        Ok(FlowSystem {
            active,
            n_channel,
            cc,
            sigma0,
            opening_old,
            opening_tip,
            source,
            edges,
            adjacency,
            rheology: *input.rheology,
            dt: input.dt,
            p_scale,
            grad_min,
            opening_scale,
        })
    }

    /// Returns the number of unknowns
    pub fn n_unknown(&self) -> usize {
        self.active.len()
    }

    /// Returns the initial guess from openings and net pressures given per element
    pub fn initial_guess(&self, opening: &[f64], net_pressure: &[f64]) -> Vector {
        let mut x = Vector::new(self.active.len());
        for (i, e) in self.active.iter().enumerate() {
            if i < self.n_channel {
                x[i] = opening[*e];
            } else {
                x[i] = (self.sigma0[i] + net_pressure[*e]) / self.p_scale;
            }
        }
        x
    }

    /// Calculates the opening and fluid pressure of all active elements (local numbering)
    pub fn fields(&self, x: &Vector) -> (Vec<f64>, Vec<f64>) {
        let n = self.active.len();
        let nc = self.n_channel;
        let w: Vec<f64> = (0..n).map(|i| if i < nc { x[i] } else { self.opening_tip[i] }).collect();
        let p = (0..n)
            .map(|i| {
                if i < nc {
                    let mut sum = self.sigma0[i];
                    for j in 0..n {
                        sum += self.cc.get(i, j) * w[j];
                    }
                    sum
                } else {
                    self.p_scale * x[i]
                }
            })
            .collect();
        (w, p)
    }

    /// Returns the opening at the edge between two elements
    pub(crate) fn edge_width(&self, edge: &FlowEdge, w: &[f64]) -> f64 {
        match edge.fixed_width {
            Some(width) => width,
            None => 0.5 * (w[edge.a] + w[edge.b]),
        }
    }

    /// Returns the conductivity of an edge
    pub(crate) fn edge_conductivity(&self, edge: &FlowEdge, w: &[f64], p: &[f64]) -> f64 {
        let grad = (p[edge.a] - p[edge.b]) / f64::sqrt(edge.h2);
        self.rheology.conductivity(self.edge_width(edge, w), grad, self.grad_min)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

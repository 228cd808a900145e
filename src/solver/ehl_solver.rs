use super::ControlConvergence;
use crate::base::Config;
use crate::flow::FlowResidual;
use crate::StrError;
use russell_lab::{solve_lin_sys, Vector};

/// Solves the elastohydrodynamic system of a trial domain with Newton's method
///
/// The elasticity operator is embedded in the residual (channel pressures follow from the
/// openings), so each Newton iteration solves elasticity and flow together.
pub struct EhlSolver<'a> {
    config: &'a Config,
}

impl<'a> EhlSolver<'a> {
    /// Allocates a new instance
    pub fn new(config: &'a Config) -> Self {
        EhlSolver { config }
    }

    /// Runs the Newton iterations starting from (and updating) x
    ///
    /// Returns the number of iterations. Stops early if the residual and the increment grow together.
    pub fn solve<R: FlowResidual>(
        &self,
        system: &R,
        x: &mut Vector,
        control: &mut ControlConvergence,
    ) -> Result<usize, StrError> {
        if x.dim() != system.n_unknown() {
            return Err("x has an incorrect dimension");
        }
        let scale = system.scale();
        control.reset();
        for iteration in 0..self.config.max_newton_iterations {
            // residual
            let rr = system.residual(x)?;
            control.analyze_rr(iteration, &rr, scale)?;
            if control.converged() {
                control.print_iteration();
                return Ok(iteration);
            }

            // increment
            let mut jj = system.jacobian(x)?;
            let mut mdu = rr;
            solve_lin_sys(&mut mdu, &mut jj)?;
            for i in 0..x.dim() {
                x[i] -= mdu[i];
            }
            control.analyze_mdu(iteration, &mdu, scale)?;
            control.print_iteration();
            if control.converged() {
                return Ok(iteration + 1);
            }
            if control.diverging() {
                return Err("Newton iterations are diverging");
            }
        }
        Err("Newton iterations did not converge")
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

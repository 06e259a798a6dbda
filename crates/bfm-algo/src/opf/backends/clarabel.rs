//! Clarabel interior-point backend.

use super::{ConicBackend, ConicSolution, SolverSettings};
use crate::opf::conic::{ConeBlock, ConicProblem};
use crate::opf::types::SolveStatus;
use bfm_core::{BfmError, BfmResult};
use clarabel::{
    algebra::CscMatrix,
    solver::{DefaultSettingsBuilder, IPSolver, SolverStatus, SupportedConeT},
};
use tracing::debug;
use web_time::Instant;

/// Clarabel is pure Rust and always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClarabelBackend;

impl ClarabelBackend {
    fn map_status(status: SolverStatus) -> SolveStatus {
        match status {
            SolverStatus::Solved => SolveStatus::Optimal,
            SolverStatus::AlmostSolved => SolveStatus::AlmostOptimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                SolveStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                SolveStatus::Unbounded
            }
            SolverStatus::MaxIterations => SolveStatus::IterationLimit,
            SolverStatus::MaxTime => SolveStatus::TimeLimit,
            _ => SolveStatus::NumericalError,
        }
    }
}

impl ConicBackend for ClarabelBackend {
    fn id(&self) -> &str {
        "clarabel"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn solve(&self, problem: &ConicProblem, settings: &SolverSettings) -> BfmResult<ConicSolution> {
        let start = Instant::now();
        let n = problem.n_var;

        // Linear objective only: P is the empty n×n matrix.
        let p_mat = CscMatrix::new(n, n, vec![0; n + 1], Vec::new(), Vec::new());
        let a_mat = CscMatrix::new(
            problem.n_row,
            n,
            problem.col_ptr.clone(),
            problem.row_idx.clone(),
            problem.values.clone(),
        );
        let cones: Vec<SupportedConeT<f64>> = problem
            .cones
            .iter()
            .map(|block| match *block {
                ConeBlock::Zero(k) => SupportedConeT::ZeroConeT(k),
                ConeBlock::Nonnegative(k) => SupportedConeT::NonnegativeConeT(k),
                ConeBlock::SecondOrder(k) => SupportedConeT::SecondOrderConeT(k),
            })
            .collect();

        let engine_settings = DefaultSettingsBuilder::default()
            .verbose(settings.verbose)
            .max_iter(settings.max_iter)
            .tol_feas(settings.tol_feas)
            .tol_gap_abs(settings.tol_gap)
            .tol_gap_rel(settings.tol_gap)
            .equilibrate_enable(settings.equilibrate)
            .time_limit(settings.time_limit_s.unwrap_or(f64::INFINITY))
            .build()
            .map_err(|e| BfmError::Config(format!("Clarabel settings error: {:?}", e)))?;

        debug!(
            variables = n,
            rows = problem.n_row,
            nnz = problem.nnz(),
            "invoking clarabel"
        );

        let mut solver = clarabel::solver::DefaultSolver::new(
            &p_mat,
            &problem.q,
            &a_mat,
            &problem.b,
            &cones,
            engine_settings,
        )
        .map_err(|e| BfmError::Solve(format!("Clarabel initialization failed: {:?}", e)))?;

        solver.solve();

        let sol = &solver.solution;
        Ok(ConicSolution {
            status: Self::map_status(sol.status),
            x: sol.x.clone(),
            iterations: sol.iterations,
            objective_value: sol.obj_val + problem.objective_offset,
            solve_time_ms: start.elapsed().as_millis(),
        })
    }
}

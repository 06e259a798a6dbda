//! Branch-flow optimal power flow on radial feeders.
//!
//! Pipeline: [`BranchFlowModel`] (variables, constraints, objective) →
//! [`ConicProblem`] (standard form) → [`ConicBackend`] → [`ResultProjector`].

pub mod backends;
mod conic;
mod constraints;
mod model;
mod projector;
mod registry;
mod types;
mod variables;

pub use backends::{ClarabelBackend, ConicBackend, ConicSolution, SolverSettings};
pub use conic::{ConeBlock, ConicProblem};
pub use constraints::{ConstraintSet, LinearConstraint, LinearExpr, RotatedCone};
pub use model::{BranchFlowModel, ModelResiduals, MODEL_NAME};
pub use projector::{BranchFlowSolution, PeriodResult, ResultProjector};
pub use registry::{SolverKind, SolverRegistry};
pub use types::{ConicForm, ModelOptions, SolveStatus};
pub use variables::{DecisionVariables, VarId, VarKind, Variable};

use bfm_core::{BfmResult, LoadProfile, Network};
use tracing::{info, warn};

/// Builds, solves and projects a branch-flow model.
#[derive(Debug, Clone, Default)]
pub struct BranchFlowSolver {
    solver: SolverKind,
    settings: SolverSettings,
    options: ModelOptions,
}

impl BranchFlowSolver {
    /// Clarabel, one period, branch-flow form
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_solver(mut self, solver: SolverKind) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_settings(mut self, settings: SolverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_periods(mut self, periods: usize) -> Self {
        self.options.periods = periods;
        self
    }

    pub fn with_conic_form(mut self, form: ConicForm) -> Self {
        self.options.conic_form = form;
        self
    }

    pub fn with_objective_weight(mut self, weight: f64) -> Self {
        self.options.objective_weight = weight;
        self
    }

    pub fn solver(&self) -> SolverKind {
        self.solver
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    pub fn build_model(
        &self,
        network: &Network,
        profile: Option<&LoadProfile>,
    ) -> BfmResult<BranchFlowModel> {
        BranchFlowModel::build(network, profile, &self.options)
    }

    /// Solve an already built model.
    ///
    /// Non-convergence is reported through `converged = false` on the
    /// returned solution; errors are reserved for engine setup failures.
    pub fn solve_model(
        &self,
        network: &Network,
        model: &BranchFlowModel,
    ) -> BfmResult<BranchFlowSolution> {
        let backend = SolverRegistry::with_defaults().resolve(self.solver)?;

        let raw = if model.variables().is_empty() {
            ConicSolution::trivial()
        } else {
            let problem = ConicProblem::from_model(model);
            backend.solve(&problem, &self.settings)?
        };

        let solution = ResultProjector::new(network.base()).project(model, backend.id(), &raw);
        if solution.converged {
            info!(
                status = %solution.status,
                iterations = solution.iterations,
                objective = solution.objective_value,
                solve_time_ms = solution.solve_time_ms as u64,
                "converged!"
            );
        } else {
            warn!(
                status = %solution.status,
                iterations = solution.iterations,
                "did not converge"
            );
        }
        Ok(solution)
    }

    pub fn solve(
        &self,
        network: &Network,
        profile: Option<&LoadProfile>,
    ) -> BfmResult<BranchFlowSolution> {
        let model = self.build_model(network, profile)?;
        self.solve_model(network, &model)
    }
}

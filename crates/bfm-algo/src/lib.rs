//! # bfm-algo: Branch-Flow SOCP for Radial Feeders
//!
//! Builds the second-order cone relaxation of the Farivar-Low branch-flow
//! model over a validated [`bfm_core::Network`], solves it with a conic
//! engine and projects the result back to physical units.
//!
//! ## Pipeline
//!
//! | Stage | Type | Output |
//! |-------|------|--------|
//! | Model | [`BranchFlowModel`] | variables, constraint families, objective |
//! | Assembly | [`ConicProblem`] | `min qᵀx s.t. Ax + s = b, s ∈ K` |
//! | Engine | [`ConicBackend`] | status and raw values |
//! | Projection | [`ResultProjector`] | [`BranchFlowSolution`] in W, var and p.u. |
//!
//! [`BranchFlowSolver`] runs the whole pipeline:
//!
//! ```no_run
//! use bfm_algo::{BranchFlowSolver, ConicForm};
//! # fn demo(network: &bfm_core::Network) -> bfm_core::BfmResult<()> {
//! let solution = BranchFlowSolver::new()
//!     .with_periods(1)
//!     .with_conic_form(ConicForm::BranchFlow)
//!     .solve(network, None)?;
//! println!("converged: {}", solution.converged);
//! # Ok(())
//! # }
//! ```
//!
//! ## Conic forms
//!
//! - [`ConicForm::BranchFlow`]: voltage-drop equality with `V_i·I_ij ≥ P_ij² + Q_ij²`,
//!   minimizing weighted generation.
//! - [`ConicForm::LossRatio`]: `X·P − R·Q = 0` with an auxiliary loss proxy
//!   `P̃`, minimizing `Σ P̃`.

pub mod opf;

pub use opf::{
    BranchFlowModel, BranchFlowSolution, BranchFlowSolver, ClarabelBackend, ConeBlock,
    ConicBackend, ConicForm, ConicProblem, ConicSolution, ModelOptions, ModelResiduals,
    PeriodResult, ResultProjector, SolveStatus, SolverKind, SolverRegistry, SolverSettings,
    MODEL_NAME,
};

//! Conic engine boundary.
//!
//! The model is assembled once into a [`ConicProblem`]; a [`ConicBackend`]
//! only sees that standard form and reports a [`ConicSolution`].

mod clarabel;

pub use self::clarabel::ClarabelBackend;

use super::conic::ConicProblem;
use super::types::SolveStatus;
use bfm_core::BfmResult;
use serde::{Deserialize, Serialize};

/// Engine settings exposed through the run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Maximum interior point iterations (default: 200)
    pub max_iter: u32,
    /// Primal/dual feasibility tolerance (default: 1e-8)
    pub tol_feas: f64,
    /// Absolute and relative duality gap tolerance (default: 1e-8)
    pub tol_gap: f64,
    /// Wall-clock limit in seconds; unlimited when absent
    pub time_limit_s: Option<f64>,
    /// Enable matrix equilibration (default: true)
    pub equilibrate: bool,
    pub verbose: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iter: 200,
            tol_feas: 1e-8,
            tol_gap: 1e-8,
            time_limit_s: None,
            equilibrate: true,
            verbose: false,
        }
    }
}

/// Raw engine result in model variable order.
#[derive(Debug, Clone)]
pub struct ConicSolution {
    pub status: SolveStatus,
    pub x: Vec<f64>,
    pub iterations: u32,
    pub objective_value: f64,
    pub solve_time_ms: u128,
}

impl ConicSolution {
    /// Result for a problem with no variables: nothing to optimize.
    pub fn trivial() -> Self {
        Self {
            status: SolveStatus::Optimal,
            x: Vec::new(),
            iterations: 0,
            objective_value: 0.0,
            solve_time_ms: 0,
        }
    }
}

/// A numerical engine for conic standard form problems.
pub trait ConicBackend: Send + Sync {
    /// Unique identifier (e.g., "clarabel")
    fn id(&self) -> &str;

    /// Check if this backend is available at runtime
    fn is_available(&self) -> bool;

    /// Solve the problem. A non-optimal terminal status is reported in the
    /// solution, not as an error; errors are reserved for setup failures.
    fn solve(&self, problem: &ConicProblem, settings: &SolverSettings) -> BfmResult<ConicSolution>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_is_object_safe() {
        fn _accepts_backend(_b: &dyn ConicBackend) {}
    }

    #[test]
    fn test_default_settings() {
        let settings = SolverSettings::default();
        assert_eq!(settings.max_iter, 200);
        assert_eq!(settings.time_limit_s, None);
        assert!(!settings.verbose);
    }
}

use bfm_core::BfmError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which conic reformulation of the branch equations to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConicForm {
    /// Voltage-drop equality plus `V_i·I_ij ≥ P_ij² + Q_ij²`
    #[default]
    BranchFlow,
    /// `X·P − R·Q = 0`, `R·I = 2R·P̃` and `2·P̃_j·V_i ≥ P_ij² + Q_ij²`
    LossRatio,
}

impl fmt::Display for ConicForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConicForm::BranchFlow => write!(f, "branch-flow"),
            ConicForm::LossRatio => write!(f, "loss-ratio"),
        }
    }
}

impl std::str::FromStr for ConicForm {
    type Err = BfmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "branch-flow" | "branchflow" | "socp" => Ok(ConicForm::BranchFlow),
            "loss-ratio" | "ptilde" => Ok(ConicForm::LossRatio),
            _ => Err(BfmError::Config(format!(
                "unknown conic form '{s}'; expected branch-flow or loss-ratio"
            ))),
        }
    }
}

/// Terminal state reported by the conic engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolveStatus {
    Optimal,
    AlmostOptimal,
    Infeasible,
    Unbounded,
    IterationLimit,
    TimeLimit,
    NumericalError,
}

impl SolveStatus {
    pub fn is_converged(&self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::AlmostOptimal)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::AlmostOptimal => "almost optimal",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unbounded => "unbounded",
            SolveStatus::IterationLimit => "iteration limit",
            SolveStatus::TimeLimit => "time limit",
            SolveStatus::NumericalError => "numerical error",
        };
        f.write_str(label)
    }
}

/// Model construction options. Limits are magnitudes; the model squares them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    /// Number of independent periods, 0-based
    pub periods: usize,
    pub conic_form: ConicForm,
    /// Scaling applied to generation in the branch-flow objective
    pub objective_weight: f64,
    pub v_min: f64,
    pub v_max: f64,
    pub i_max: f64,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            periods: 1,
            conic_form: ConicForm::BranchFlow,
            objective_weight: 10.0,
            v_min: 0.95,
            v_max: 1.05,
            i_max: 500.0,
        }
    }
}

impl ModelOptions {
    pub fn validate(&self) -> Result<(), BfmError> {
        if !self.objective_weight.is_finite() || self.objective_weight <= 0.0 {
            return Err(BfmError::Config(format!(
                "objective weight must be positive, got {}",
                self.objective_weight
            )));
        }
        if !(self.v_min > 0.0 && self.v_min < self.v_max && self.v_max.is_finite()) {
            return Err(BfmError::Config(format!(
                "voltage limits must satisfy 0 < v_min < v_max, got [{}, {}]",
                self.v_min, self.v_max
            )));
        }
        if !self.i_max.is_finite() || self.i_max <= 0.0 {
            return Err(BfmError::Config(format!(
                "current limit must be positive, got {}",
                self.i_max
            )));
        }
        Ok(())
    }
}

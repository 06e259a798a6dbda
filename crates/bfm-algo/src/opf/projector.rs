//! Projection of solved per-unit values back to physical quantities.
//!
//! Voltages and currents come out as magnitudes (`√V`, `√I`, per-unit);
//! every power quantity is multiplied by `S_base`.

use super::backends::ConicSolution;
use super::model::{BranchFlowModel, ModelResiduals};
use super::types::{ConicForm, SolveStatus};
use super::variables::VarId;
use bfm_core::{BfmError, BfmResult, BranchKey, BusId, Period, PerUnit, UnitConverter};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Physical results of one period.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PeriodResult {
    pub period: Period,
    /// Voltage magnitude per bus (per-unit)
    pub voltage: BTreeMap<BusId, f64>,
    /// Current magnitude per branch (per-unit)
    pub current: BTreeMap<BranchKey, f64>,
    /// W
    pub p_flow: BTreeMap<BranchKey, f64>,
    /// var
    pub q_flow: BTreeMap<BranchKey, f64>,
    /// W
    pub p_gen: BTreeMap<BusId, f64>,
    /// var
    pub q_gen: BTreeMap<BusId, f64>,
    /// Per-bus loss attribution (W)
    pub losses: BTreeMap<BusId, f64>,
    /// `Σ P_ij` over every branch (W)
    pub total_flow: f64,
    /// `Σ Loss_i` over every bus (W)
    pub total_losses: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchFlowSolution {
    pub model_name: String,
    pub conic_form: ConicForm,
    pub solver: String,
    pub status: SolveStatus,
    pub converged: bool,
    pub iterations: u32,
    pub solve_time_ms: u128,
    pub objective_value: f64,
    pub periods: Vec<PeriodResult>,
    pub residuals: ModelResiduals,
}

impl BranchFlowSolution {
    /// Fail with [`BfmError::Solve`] unless the engine converged.
    pub fn into_converged(self) -> BfmResult<Self> {
        if self.converged {
            Ok(self)
        } else {
            Err(BfmError::Solve(format!(
                "{} did not converge: {}",
                self.solver, self.status
            )))
        }
    }

    pub fn period(&self, period: Period) -> Option<&PeriodResult> {
        self.periods.iter().find(|p| p.period == period)
    }
}

/// Reads engine values through the model's variable maps.
#[derive(Debug, Clone, Copy)]
pub struct ResultProjector<'a> {
    base: &'a UnitConverter,
}

impl<'a> ResultProjector<'a> {
    pub fn new(base: &'a UnitConverter) -> Self {
        Self { base }
    }

    /// Project `solution` onto physical units.
    ///
    /// A non-converged solution is not read: the zero-initialized defaults
    /// are projected instead and `converged` is false.
    pub fn project(
        &self,
        model: &BranchFlowModel,
        solver: &str,
        solution: &ConicSolution,
    ) -> BranchFlowSolution {
        let converged =
            solution.status.is_converged() && solution.x.len() == model.variables().len();
        let values = if converged {
            solution.x.clone()
        } else {
            model.initial_values()
        };

        let periods = model
            .periods()
            .iter()
            .map(|&t| self.project_period(model, &values, t))
            .collect();

        BranchFlowSolution {
            model_name: model.name().to_string(),
            conic_form: model.options().conic_form,
            solver: solver.to_string(),
            status: solution.status,
            converged,
            iterations: solution.iterations,
            solve_time_ms: solution.solve_time_ms,
            objective_value: if converged {
                model.objective_value(&values)
            } else {
                0.0
            },
            periods,
            residuals: model.residuals(&values),
        }
    }

    fn project_period(&self, model: &BranchFlowModel, values: &[f64], t: Period) -> PeriodResult {
        let vars = model.variables();
        let get = |id: VarId| values.get(id.0).copied().unwrap_or(0.0);
        let watts = |v: f64| self.base.to_watts(PerUnit(v)).0;
        let vars_q = |v: f64| self.base.to_vars(PerUnit(v)).0;

        let mut result = PeriodResult {
            period: t,
            ..PeriodResult::default()
        };

        for (&(bus, period), &id) in &vars.v_sq {
            if period == t {
                result.voltage.insert(bus, get(id).max(0.0).sqrt());
            }
        }
        for (&(bus, period), &id) in &vars.p_gen {
            if period == t {
                result.p_gen.insert(bus, watts(get(id)));
            }
        }
        for (&(bus, period), &id) in &vars.q_gen {
            if period == t {
                result.q_gen.insert(bus, vars_q(get(id)));
            }
        }
        for (&(bus, period), &id) in &vars.losses {
            if period == t {
                result.losses.insert(bus, watts(get(id)));
            }
        }

        for &key in model.branches() {
            let index = (key.from, key.to, t);
            if let Some(&id) = vars.i_sq.get(&index) {
                result.current.insert(key, get(id).max(0.0).sqrt());
            }
            if let Some(&id) = vars.p_flow.get(&index) {
                result.p_flow.insert(key, watts(get(id)));
            }
            if let Some(&id) = vars.q_flow.get(&index) {
                result.q_flow.insert(key, vars_q(get(id)));
            }
        }

        result.total_flow = result.p_flow.values().sum();
        result.total_losses = result.losses.values().sum();
        result
    }
}

impl fmt::Display for BranchFlowSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.model_name)?;
        writeln!(
            f,
            "status: {} (converged: {}, iterations: {}, {} ms)",
            self.status, self.converged, self.iterations, self.solve_time_ms
        )?;
        writeln!(f, "objective: {:.6}", self.objective_value)?;

        for period in &self.periods {
            writeln!(f)?;
            writeln!(f, "period {}", period.period)?;
            writeln!(f, "  {:>6} {:>10} {:>14} {:>14} {:>14}", "bus", "V [pu]", "Pgen [W]", "Qgen [var]", "Loss [W]")?;
            for (bus, v) in &period.voltage {
                writeln!(
                    f,
                    "  {:>6} {:>10.5} {:>14.3} {:>14.3} {:>14.3}",
                    bus.to_string(),
                    v,
                    period.p_gen.get(bus).copied().unwrap_or(0.0),
                    period.q_gen.get(bus).copied().unwrap_or(0.0),
                    period.losses.get(bus).copied().unwrap_or(0.0)
                )?;
            }
            writeln!(f, "  {:>6} {:>10} {:>14} {:>14}", "branch", "I [pu]", "P [W]", "Q [var]")?;
            for (key, i) in &period.current {
                writeln!(
                    f,
                    "  {:>6} {:>10.5} {:>14.3} {:>14.3}",
                    key.to_string(),
                    i,
                    period.p_flow.get(key).copied().unwrap_or(0.0),
                    period.q_flow.get(key).copied().unwrap_or(0.0)
                )?;
            }
            writeln!(
                f,
                "  total flow: {:.3} W, total losses: {:.3} W",
                period.total_flow, period.total_losses
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opf::types::ModelOptions;
    use bfm_core::{BranchRecord, ConnectivityRule, Network, Node};

    fn two_bus() -> (Network, BranchFlowModel) {
        let nodes = vec![
            Node::new(BusId::new(1)).with_gen_limits(1.0, 1.0),
            Node::new(BusId::new(2)).with_load(-0.4, 0.0),
        ];
        let records = vec![BranchRecord::new(BusId::new(1), BusId::new(2), 0.01, 0.02)];
        let base = UnitConverter::new(100e3, 13.8).unwrap();
        let network = Network::build(base, nodes, records, ConnectivityRule::BranchList)
            .unwrap()
            .0;
        let model = BranchFlowModel::build(&network, None, &ModelOptions::default()).unwrap();
        (network, model)
    }

    fn solution(status: SolveStatus, x: Vec<f64>) -> ConicSolution {
        ConicSolution {
            status,
            x,
            iterations: 7,
            objective_value: 0.0,
            solve_time_ms: 1,
        }
    }

    #[test]
    fn test_projects_square_roots_and_watts() {
        let (network, model) = two_bus();
        let vars = model.variables();
        let (one, two) = (BusId::new(1), BusId::new(2));
        let mut x = model.initial_values();
        x[vars.v_sq[&(one, 0)].0] = 1.0;
        x[vars.v_sq[&(two, 0)].0] = 0.9801;
        x[vars.i_sq[&(one, two, 0)].0] = 0.16;
        x[vars.p_flow[&(one, two, 0)].0] = -0.4;
        x[vars.p_gen[&(one, 0)].0] = 0.4016;
        x[vars.losses[&(one, 0)].0] = 0.4016;
        x[vars.losses[&(two, 0)].0] = -0.4;

        let result = ResultProjector::new(network.base()).project(
            &model,
            "clarabel",
            &solution(SolveStatus::Optimal, x),
        );
        assert!(result.converged);
        let period = result.period(0).unwrap();
        assert!((period.voltage[&two] - 0.99).abs() < 1e-12);
        let key = BranchKey::new(one, two);
        assert!((period.current[&key] - 0.4).abs() < 1e-12);
        assert!((period.p_flow[&key] + 40e3).abs() < 1e-6);
        assert!((period.p_gen[&one] - 40_160.0).abs() < 1e-6);
        assert!((period.total_flow + 40e3).abs() < 1e-6);
        assert!((period.total_losses - 160.0).abs() < 1e-6);
        assert!((result.objective_value - 4.016).abs() < 1e-12);
    }

    #[test]
    fn test_non_converged_projects_defaults() {
        let (network, model) = two_bus();
        let x = vec![1.0; model.variables().len()];
        let result = ResultProjector::new(network.base()).project(
            &model,
            "clarabel",
            &solution(SolveStatus::Infeasible, x),
        );
        assert!(!result.converged);
        assert_eq!(result.iterations, 7);
        let period = result.period(0).unwrap();
        assert!(period.voltage.values().all(|&v| v == 0.0));
        assert_eq!(period.total_flow, 0.0);
        assert!(matches!(result.into_converged(), Err(BfmError::Solve(_))));
    }

    #[test]
    fn test_report_table() {
        let (network, model) = two_bus();
        let result = ResultProjector::new(network.base()).project(
            &model,
            "clarabel",
            &solution(SolveStatus::IterationLimit, Vec::new()),
        );
        let report = result.to_string();
        assert!(report.contains("status: iteration limit"));
        assert!(report.contains("period 0"));
        assert!(report.contains("1-2"));
    }
}

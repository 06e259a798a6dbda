//! Branch-flow SOCP model of a radial feeder.
//!
//! For every period `t`, bus `i` with parent `p(i)` and children `C(i)`:
//!
//! ```text
//! active:   Pgen_i − Pd_i − Σ_{j∈C(i)} R_ij·I_ij + Σ_{j∈C(i)} P_ij − P_{p(i),i} = 0
//! reactive: Qgen_i − Qd_i − Σ_{j∈C(i)} X_ij·I_ij + Σ_{j∈C(i)} Q_ij − Q_{p(i),i} = 0
//! losses:   Loss_i − Pgen_i + Pd_i = 0
//! ```
//!
//! where `Pd = −P_load` is the demand (the bus table stores signed injection).
//! For every oriented branch `(i, j)`:
//!
//! ```text
//! voltage drop: V_i − V_j + 2·(R·P_ij + X·Q_ij) − (R² + X²)·I_ij = 0
//! relaxation:   V_i · I_ij ≥ P_ij² + Q_ij²
//! ```
//!
//! With [`ConicForm::LossRatio`] the last two are replaced by
//! `X·P_ij − R·Q_ij = 0`, `R·I_ij − 2R·P̃_j = 0` and `2·P̃_j·V_i ≥ P_ij² + Q_ij²`,
//! and the objective becomes `Σ P̃` instead of `Σ w·Pgen`.
//!
//! Branch variables exist only for the tree orientation, so a leaf's
//! downstream sums and the root's upstream term are empty by construction.

use super::constraints::{ConstraintSet, LinearConstraint, LinearExpr, Named, RotatedCone};
use super::types::{ConicForm, ModelOptions};
use super::variables::{DecisionVariables, VarId, VarKind};
use bfm_core::{BfmResult, BranchKey, BusLoad, LoadProfile, Network, Period};
use serde::Serialize;
use std::fmt;
use tracing::debug;

pub const MODEL_NAME: &str = "*** Branch Flow SOCP ***";

/// Worst-case constraint residuals at a point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ModelResiduals {
    pub active_power: f64,
    pub reactive_power: f64,
    pub losses: f64,
    pub voltage_drop: f64,
    /// `max |V_i·I_ij − (P_ij² + Q_ij²)|` over branches and periods
    pub relaxation_gap: f64,
    /// Largest amount by which any cone is violated (0 when all hold)
    pub cone_violation: f64,
}

/// Owns every variable, constraint and the objective of one solve.
#[derive(Debug, Clone)]
pub struct BranchFlowModel {
    name: String,
    options: ModelOptions,
    periods: Vec<Period>,
    branches: Vec<BranchKey>,
    variables: DecisionVariables,
    constraints: ConstraintSet,
    objective: LinearExpr,
}

impl BranchFlowModel {
    /// Build the model for `options.periods` independent periods.
    ///
    /// Loads come from `profile` when it has an entry for a bus and period,
    /// otherwise from the network's static bus table.
    pub fn build(
        network: &Network,
        profile: Option<&LoadProfile>,
        options: &ModelOptions,
    ) -> BfmResult<Self> {
        options.validate()?;
        if let Some(profile) = profile {
            profile.validate(network)?;
        }
        let periods: Vec<Period> = (0..options.periods).collect();
        let tree = network.tree();
        let mut vars = DecisionVariables::new();
        let mut cons = ConstraintSet::default();
        let mut objective = LinearExpr::new();

        let v_bounds = (Some(options.v_min.powi(2)), Some(options.v_max.powi(2)));
        let i_bounds = (Some(0.0), Some(options.i_max.powi(2)));

        for &t in &periods {
            for node in network.nodes() {
                let i = node.id;
                vars.add_bus(VarKind::VoltageSq, i, t, v_bounds.0, v_bounds.1);
                vars.add_bus(VarKind::ActiveGen, i, t, Some(0.0), Some(node.p_gen_max));
                vars.add_bus(VarKind::ReactiveGen, i, t, Some(0.0), Some(node.q_gen_max));
                vars.add_bus(VarKind::Losses, i, t, None, None);
            }
            for branch in network.branches() {
                let (i, j) = (branch.from, branch.to);
                vars.add_branch(VarKind::ActiveFlow, i, j, t, None, None);
                vars.add_branch(VarKind::ReactiveFlow, i, j, t, None, None);
                vars.add_branch(VarKind::CurrentSq, i, j, t, i_bounds.0, i_bounds.1);
                if options.conic_form == ConicForm::LossRatio {
                    vars.add_bus(VarKind::LossProxy, j, t, None, None);
                }
            }
        }

        for &t in &periods {
            for node in network.nodes() {
                let i = node.id;
                let load = match profile {
                    Some(p) => p.load_at(network, t, i),
                    None => BusLoad {
                        p: node.p_load,
                        q: node.q_load,
                    },
                };

                let mut active = LinearExpr::new()
                    .term(vars.p_gen[&(i, t)], 1.0)
                    .constant(load.p);
                let mut reactive = LinearExpr::new()
                    .term(vars.q_gen[&(i, t)], 1.0)
                    .constant(load.q);
                for &j in tree.children(i) {
                    let key = (i, j, t);
                    active = active
                        .term(vars.i_sq[&key], -network.r(i, j))
                        .term(vars.p_flow[&key], 1.0);
                    reactive = reactive
                        .term(vars.i_sq[&key], -network.x(i, j))
                        .term(vars.q_flow[&key], 1.0);
                }
                if let Some(k) = tree.parent(i) {
                    active = active.term(vars.p_flow[&(k, i, t)], -1.0);
                    reactive = reactive.term(vars.q_flow[&(k, i, t)], -1.0);
                }
                cons.active_power
                    .push(LinearConstraint::new(format!("active_power[{i},{t}]"), active));
                cons.reactive_power
                    .push(LinearConstraint::new(format!("reactive_power[{i},{t}]"), reactive));

                let losses = LinearExpr::new()
                    .term(vars.losses[&(i, t)], 1.0)
                    .term(vars.p_gen[&(i, t)], -1.0)
                    .constant(-load.p);
                cons.losses
                    .push(LinearConstraint::new(format!("losses[{i},{t}]"), losses));
            }

            for branch in network.branches() {
                let (i, j) = (branch.from, branch.to);
                let key = (i, j, t);
                let (p, q, l) = (vars.p_flow[&key], vars.q_flow[&key], vars.i_sq[&key]);
                let (r, x) = (branch.r, branch.x);

                match options.conic_form {
                    ConicForm::BranchFlow => {
                        let drop = LinearExpr::new()
                            .term(vars.v_sq[&(i, t)], 1.0)
                            .term(vars.v_sq[&(j, t)], -1.0)
                            .term(p, 2.0 * r)
                            .term(q, 2.0 * x)
                            .term(l, -branch.z_squared());
                        cons.voltage_drop
                            .push(LinearConstraint::new(format!("voltage_drop[{i},{j},{t}]"), drop));
                        cons.branch_flow.push(RotatedCone {
                            name: format!("branch_flow[{i},{j},{t}]"),
                            scale: 1.0,
                            a: vars.v_sq[&(i, t)],
                            b: l,
                            terms: vec![p, q],
                        });
                    }
                    ConicForm::LossRatio => {
                        let tilde = vars.p_tilde[&(j, t)];
                        let ratio = LinearExpr::new().term(p, x).term(q, -r);
                        cons.loss_ratio
                            .push(LinearConstraint::new(format!("loss_ratio[{i},{j},{t}]"), ratio));
                        let proxy = LinearExpr::new().term(l, r).term(tilde, -2.0 * r);
                        cons.loss_proxy
                            .push(LinearConstraint::new(format!("loss_proxy[{i},{j},{t}]"), proxy));
                        cons.branch_flow.push(RotatedCone {
                            name: format!("branch_flow[{i},{j},{t}]"),
                            scale: 2.0,
                            a: tilde,
                            b: vars.v_sq[&(i, t)],
                            terms: vec![p, q],
                        });
                    }
                }
            }
        }

        match options.conic_form {
            ConicForm::BranchFlow => {
                for &var in vars.p_gen.values() {
                    objective = objective.term(var, options.objective_weight);
                }
            }
            ConicForm::LossRatio => {
                for &var in vars.p_tilde.values() {
                    objective = objective.term(var, 1.0);
                }
            }
        }

        debug!(
            periods = periods.len(),
            variables = vars.len(),
            constraints = cons.len(),
            form = %options.conic_form,
            "built branch-flow model"
        );

        Ok(Self {
            name: MODEL_NAME.to_string(),
            options: options.clone(),
            periods,
            branches: network.branches().iter().map(|b| b.key()).collect(),
            variables: vars,
            constraints: cons,
            objective,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// Oriented branch keys, root-first.
    pub fn branches(&self) -> &[BranchKey] {
        &self.branches
    }

    pub fn variables(&self) -> &DecisionVariables {
        &self.variables
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.eval(values)
    }

    /// Zero-initialized starting point.
    pub fn initial_values(&self) -> Vec<f64> {
        self.variables.initial_values()
    }

    pub fn residuals(&self, values: &[f64]) -> ModelResiduals {
        let worst = |family: &[LinearConstraint]| {
            family
                .iter()
                .map(|c| c.residual(values).abs())
                .fold(0.0_f64, f64::max)
        };
        let get = |id: VarId| values.get(id.0).copied().unwrap_or(0.0);

        let mut relaxation_gap = 0.0_f64;
        for (&(i, j, t), &l) in &self.variables.i_sq {
            let v = self.variables.v_sq[&(i, t)];
            let (p, q) = (self.variables.p_flow[&(i, j, t)], self.variables.q_flow[&(i, j, t)]);
            let gap = get(v) * get(l) - (get(p).powi(2) + get(q).powi(2));
            relaxation_gap = relaxation_gap.max(gap.abs());
        }
        let cone_violation = self
            .constraints
            .branch_flow
            .iter()
            .map(|c| (-c.gap(values)).max(0.0))
            .fold(0.0_f64, f64::max);

        ModelResiduals {
            active_power: worst(&self.constraints.active_power),
            reactive_power: worst(&self.constraints.reactive_power),
            losses: worst(&self.constraints.losses),
            voltage_drop: worst(&self.constraints.voltage_drop),
            relaxation_gap,
            cone_violation,
        }
    }
}

impl fmt::Display for BranchFlowModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(
            f,
            "  form={} periods={} objective_weight={}",
            self.options.conic_form,
            self.periods.len(),
            self.options.objective_weight
        )?;
        writeln!(f)?;
        writeln!(f, "  {} Var Declarations", self.variables.len())?;
        for (_, var) in self.variables.iter() {
            writeln!(f, "    {var}")?;
        }
        writeln!(f)?;
        write!(f, "  1 Objective Declarations\n    minimize: ")?;
        self.objective.render_into(&self.variables, f)?;
        writeln!(f)?;
        writeln!(f)?;
        writeln!(f, "  {} Constraint Declarations", self.constraints.len())?;
        for (family, items) in self.constraints.linear_families() {
            if items.is_empty() {
                continue;
            }
            writeln!(f, "    {family} : Size={}", items.len())?;
            for item in items {
                writeln!(f, "      {}", Named { item, vars: &self.variables })?;
            }
        }
        if !self.constraints.branch_flow.is_empty() {
            writeln!(f, "    branch_flow : Size={}", self.constraints.branch_flow.len())?;
            for item in &self.constraints.branch_flow {
                writeln!(f, "      {}", Named { item, vars: &self.variables })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bfm_core::{BfmError, BranchRecord, BusId, ConnectivityRule, Node, UnitConverter};

    fn feeder() -> Network {
        let nodes = vec![
            Node::new(BusId::new(1)).with_gen_limits(100.0, 100.0),
            Node::new(BusId::new(2)).with_load(-0.4, -0.1),
            Node::new(BusId::new(3)).with_load(-0.2, 0.0),
        ];
        let records = vec![
            BranchRecord::new(BusId::new(1), BusId::new(2), 0.01, 0.02),
            BranchRecord::new(BusId::new(2), BusId::new(3), 0.01, 0.02),
        ];
        let base = UnitConverter::new(100e3, 13.8).unwrap();
        Network::build(base, nodes, records, ConnectivityRule::BranchList)
            .unwrap()
            .0
    }

    #[test]
    fn test_variable_and_constraint_counts() {
        let model = BranchFlowModel::build(&feeder(), None, &ModelOptions::default()).unwrap();
        // 3 buses × 4 + 2 branches × 3
        assert_eq!(model.variables().len(), 18);
        let cons = model.constraints();
        assert_eq!(cons.active_power.len(), 3);
        assert_eq!(cons.voltage_drop.len(), 2);
        assert_eq!(cons.branch_flow.len(), 2);
        assert!(cons.loss_ratio.is_empty());
        assert_eq!(model.objective().terms.len(), 3);
        assert_eq!(model.name(), MODEL_NAME);
    }

    #[test]
    fn test_bounds_are_squared() {
        let model = BranchFlowModel::build(&feeder(), None, &ModelOptions::default()).unwrap();
        let vars = model.variables();
        let v = vars.get(vars.v_sq[&(BusId::new(2), 0)]);
        assert!((v.lower.unwrap() - 0.9025).abs() < 1e-12);
        assert!((v.upper.unwrap() - 1.1025).abs() < 1e-12);
        let i = vars.get(vars.i_sq[&(BusId::new(1), BusId::new(2), 0)]);
        assert_eq!(i.upper, Some(250_000.0));
        let pg = vars.get(vars.p_gen[&(BusId::new(3), 0)]);
        assert_eq!((pg.lower, pg.upper), (Some(0.0), Some(0.0)));
    }

    #[test]
    fn test_leaf_has_no_downstream_terms() {
        let model = BranchFlowModel::build(&feeder(), None, &ModelOptions::default()).unwrap();
        let leaf = &model.constraints().active_power[2];
        assert_eq!(leaf.name, "active_power[3,0]");
        // Pgen_3 and the upstream P_23 only
        assert_eq!(leaf.expr.terms.len(), 2);
        assert!((leaf.expr.constant + 0.2).abs() < 1e-12);

        let root = &model.constraints().active_power[0];
        // Pgen_1, R·I_12, P_12; no upstream term
        assert_eq!(root.expr.terms.len(), 3);
    }

    #[test]
    fn test_hand_built_point_has_zero_balance_residual() {
        // Single branch, lossless point: I = 0, P_12 = −0.4, Pgen_1 = 0.4.
        let network = {
            let nodes = vec![
                Node::new(BusId::new(1)).with_gen_limits(1.0, 1.0),
                Node::new(BusId::new(2)).with_load(-0.4, 0.0),
            ];
            let records = vec![BranchRecord::new(BusId::new(1), BusId::new(2), 0.01, 0.02)];
            let base = UnitConverter::new(100e3, 13.8).unwrap();
            Network::build(base, nodes, records, ConnectivityRule::BranchList)
                .unwrap()
                .0
        };
        let model = BranchFlowModel::build(&network, None, &ModelOptions::default()).unwrap();
        let vars = model.variables();
        let mut x = model.initial_values();
        let (one, two) = (BusId::new(1), BusId::new(2));
        x[vars.p_gen[&(one, 0)].0] = 0.4;
        x[vars.p_flow[&(one, two, 0)].0] = -0.4;
        x[vars.losses[&(one, 0)].0] = 0.4;
        x[vars.losses[&(two, 0)].0] = -0.4;

        let res = model.residuals(&x);
        assert!(res.active_power < 1e-12);
        assert!(res.reactive_power < 1e-12);
        assert!(res.losses < 1e-12);
        assert!(res.cone_violation > 0.0);
    }

    #[test]
    fn test_multi_period_profile_loads() {
        let network = feeder();
        let mut profile = LoadProfile::new();
        profile.insert(1, BusId::new(3), -0.5, 0.0);
        let options = ModelOptions {
            periods: 2,
            ..ModelOptions::default()
        };
        let model = BranchFlowModel::build(&network, Some(&profile), &options).unwrap();
        let balance = |name: &str| {
            model
                .constraints()
                .active_power
                .iter()
                .find(|c| c.name == name)
                .map(|c| c.expr.constant)
                .unwrap()
        };
        assert!((balance("active_power[3,0]") + 0.2).abs() < 1e-12);
        assert!((balance("active_power[3,1]") + 0.5).abs() < 1e-12);
        assert_eq!(model.variables().len(), 36);
    }

    #[test]
    fn test_profile_with_unknown_bus_rejected() {
        let mut profile = LoadProfile::new();
        profile.insert(0, BusId::new(99), -0.5, 0.0);
        let result = BranchFlowModel::build(&feeder(), Some(&profile), &ModelOptions::default());
        assert!(matches!(result, Err(BfmError::Data(_))));
    }

    #[test]
    fn test_loss_ratio_form_replaces_drop_equations() {
        let options = ModelOptions {
            conic_form: ConicForm::LossRatio,
            ..ModelOptions::default()
        };
        let model = BranchFlowModel::build(&feeder(), None, &options).unwrap();
        let cons = model.constraints();
        assert!(cons.voltage_drop.is_empty());
        assert_eq!(cons.loss_ratio.len(), 2);
        assert_eq!(cons.loss_proxy.len(), 2);
        assert_eq!(model.variables().p_tilde.len(), 2);
        assert!(cons.branch_flow.iter().all(|c| c.scale == 2.0));
        assert_eq!(model.objective().terms.len(), 2);
    }

    #[test]
    fn test_zero_periods_is_empty() {
        let options = ModelOptions {
            periods: 0,
            ..ModelOptions::default()
        };
        let model = BranchFlowModel::build(&feeder(), None, &options).unwrap();
        assert!(model.variables().is_empty());
        assert!(model.constraints().is_empty());
        assert_eq!(model.objective_value(&[]), 0.0);
    }

    #[test]
    fn test_dump_lists_every_family() {
        let model = BranchFlowModel::build(&feeder(), None, &ModelOptions::default()).unwrap();
        let dump = model.to_string();
        assert!(dump.starts_with(MODEL_NAME));
        assert!(dump.contains("18 Var Declarations"));
        assert!(dump.contains("V[2,0]"));
        assert!(dump.contains("voltage_drop : Size=2"));
        assert!(dump.contains("branch_flow[1,2,0]: 1 V[1,0] * I[1,2,0] >= P[1,2,0]^2 + Q[1,2,0]^2"));
    }
}

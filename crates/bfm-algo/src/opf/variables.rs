//! Decision variables of the branch-flow model.
//!
//! Every variable lives in one flat arena addressed by [`VarId`]; typed maps
//! index it by `(head, tail, period)` for branch quantities and by
//! `(bus, period)` for bus quantities.

use bfm_core::{BusId, Period};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Position of a variable in the flat arena (and in the solver's `x`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct VarId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VarKind {
    /// `P_ij`
    ActiveFlow,
    /// `Q_ij`
    ReactiveFlow,
    /// `I_ij`, squared current magnitude
    CurrentSq,
    /// `V_i`, squared voltage magnitude
    VoltageSq,
    ActiveGen,
    ReactiveGen,
    /// Per-bus loss attribution
    Losses,
    /// `P̃_j` of the loss-ratio form
    LossProxy,
}

impl VarKind {
    fn symbol(&self) -> &'static str {
        match self {
            VarKind::ActiveFlow => "P",
            VarKind::ReactiveFlow => "Q",
            VarKind::CurrentSq => "I",
            VarKind::VoltageSq => "V",
            VarKind::ActiveGen => "Pgen",
            VarKind::ReactiveGen => "Qgen",
            VarKind::Losses => "Loss",
            VarKind::LossProxy => "Ptilde",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub initial: f64,
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |b: Option<f64>| b.map(|v| format!("{v}")).unwrap_or_else(|| "None".into());
        write!(
            f,
            "{:<16} lower={:<10} upper={:<10} initial={}",
            self.name,
            bound(self.lower),
            bound(self.upper),
            self.initial
        )
    }
}

pub type BranchIndex = (BusId, BusId, Period);
pub type BusIndex = (BusId, Period);

#[derive(Debug, Clone, Default)]
pub struct DecisionVariables {
    vars: Vec<Variable>,
    pub p_flow: BTreeMap<BranchIndex, VarId>,
    pub q_flow: BTreeMap<BranchIndex, VarId>,
    pub i_sq: BTreeMap<BranchIndex, VarId>,
    pub v_sq: BTreeMap<BusIndex, VarId>,
    pub p_gen: BTreeMap<BusIndex, VarId>,
    pub q_gen: BTreeMap<BusIndex, VarId>,
    pub losses: BTreeMap<BusIndex, VarId>,
    /// Keyed by the tail bus of the branch feeding it; absent for the root
    pub p_tilde: BTreeMap<BusIndex, VarId>,
}

impl DecisionVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a zero-initialized bus variable.
    pub fn add_bus(
        &mut self,
        kind: VarKind,
        bus: BusId,
        period: Period,
        lower: Option<f64>,
        upper: Option<f64>,
    ) -> VarId {
        let id = self.push(format!("{}[{bus},{period}]", kind.symbol()), kind, lower, upper);
        let map = match kind {
            VarKind::VoltageSq => &mut self.v_sq,
            VarKind::ActiveGen => &mut self.p_gen,
            VarKind::ReactiveGen => &mut self.q_gen,
            VarKind::Losses => &mut self.losses,
            _ => &mut self.p_tilde,
        };
        map.insert((bus, period), id);
        id
    }

    /// Add a zero-initialized branch variable.
    pub fn add_branch(
        &mut self,
        kind: VarKind,
        from: BusId,
        to: BusId,
        period: Period,
        lower: Option<f64>,
        upper: Option<f64>,
    ) -> VarId {
        let id = self.push(
            format!("{}[{from},{to},{period}]", kind.symbol()),
            kind,
            lower,
            upper,
        );
        let map = match kind {
            VarKind::ActiveFlow => &mut self.p_flow,
            VarKind::ReactiveFlow => &mut self.q_flow,
            _ => &mut self.i_sq,
        };
        map.insert((from, to, period), id);
        id
    }

    fn push(
        &mut self,
        name: String,
        kind: VarKind,
        lower: Option<f64>,
        upper: Option<f64>,
    ) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(Variable {
            name,
            kind,
            lower,
            upper,
            initial: 0.0,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn get(&self, id: VarId) -> &Variable {
        &self.vars[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, &Variable)> {
        self.vars.iter().enumerate().map(|(i, v)| (VarId(i), v))
    }

    pub fn initial_values(&self) -> Vec<f64> {
        self.vars.iter().map(|v| v.initial).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_indices_share_one_arena() {
        let mut vars = DecisionVariables::new();
        let (one, two) = (BusId::new(1), BusId::new(2));
        let v = vars.add_bus(VarKind::VoltageSq, one, 0, Some(0.9025), Some(1.1025));
        let i = vars.add_branch(VarKind::CurrentSq, one, two, 0, Some(0.0), Some(250_000.0));
        let t = vars.add_bus(VarKind::LossProxy, two, 0, None, None);

        assert_eq!(vars.len(), 3);
        assert_eq!(vars.v_sq[&(one, 0)], v);
        assert_eq!(vars.i_sq[&(one, two, 0)], i);
        assert_eq!(vars.p_tilde[&(two, 0)], t);
        assert_eq!(vars.get(i).name, "I[1,2,0]");
        assert_eq!(vars.initial_values(), vec![0.0; 3]);
    }
}

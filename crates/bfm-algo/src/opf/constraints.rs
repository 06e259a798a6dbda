//! Linear equalities and rotated second-order cones, grouped by family.

use super::variables::{DecisionVariables, VarId};
use std::fmt;

/// `Σ cᵢ·xᵢ + constant`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `coeff·var`; zero coefficients are dropped.
    pub fn term(mut self, var: VarId, coeff: f64) -> Self {
        if coeff != 0.0 {
            self.terms.push((var, coeff));
        }
        self
    }

    pub fn constant(mut self, value: f64) -> Self {
        self.constant += value;
        self
    }

    pub fn eval(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(var, coeff)| coeff * values.get(var.0).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.constant == 0.0
    }

    pub(crate) fn render_into(
        &self,
        vars: &DecisionVariables,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "0");
        }
        for (idx, &(var, coeff)) in self.terms.iter().enumerate() {
            let sign = if coeff < 0.0 { "-" } else { "+" };
            if idx == 0 && coeff >= 0.0 {
                write!(f, "{} {}", coeff, vars.get(var).name)?;
            } else if idx == 0 {
                write!(f, "-{} {}", -coeff, vars.get(var).name)?;
            } else {
                write!(f, " {sign} {} {}", coeff.abs(), vars.get(var).name)?;
            }
        }
        if self.constant != 0.0 {
            let sign = if self.constant < 0.0 { "-" } else { "+" };
            write!(f, " {sign} {}", self.constant.abs())?;
        }
        Ok(())
    }
}

/// `expr == 0`
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub name: String,
    pub expr: LinearExpr,
}

impl LinearConstraint {
    pub fn new(name: impl Into<String>, expr: LinearExpr) -> Self {
        Self {
            name: name.into(),
            expr,
        }
    }

    pub fn residual(&self, values: &[f64]) -> f64 {
        self.expr.eval(values)
    }
}

/// `scale·a·b ≥ Σ terms²` with `a, b ≥ 0`
#[derive(Debug, Clone)]
pub struct RotatedCone {
    pub name: String,
    pub scale: f64,
    pub a: VarId,
    pub b: VarId,
    pub terms: Vec<VarId>,
}

impl RotatedCone {
    /// `scale·a·b − Σ terms²`; nonnegative when satisfied.
    pub fn gap(&self, values: &[f64]) -> f64 {
        let get = |v: VarId| values.get(v.0).copied().unwrap_or(0.0);
        self.scale * get(self.a) * get(self.b)
            - self.terms.iter().map(|&t| get(t).powi(2)).sum::<f64>()
    }
}

/// Named constraint families of one model. Families not used by the selected
/// conic form stay empty.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    pub active_power: Vec<LinearConstraint>,
    pub reactive_power: Vec<LinearConstraint>,
    pub losses: Vec<LinearConstraint>,
    pub voltage_drop: Vec<LinearConstraint>,
    pub loss_ratio: Vec<LinearConstraint>,
    pub loss_proxy: Vec<LinearConstraint>,
    pub branch_flow: Vec<RotatedCone>,
}

impl ConstraintSet {
    /// Linear families in a fixed order, with their names.
    pub fn linear_families(&self) -> [(&'static str, &[LinearConstraint]); 6] {
        [
            ("active_power", self.active_power.as_slice()),
            ("reactive_power", self.reactive_power.as_slice()),
            ("losses", self.losses.as_slice()),
            ("voltage_drop", self.voltage_drop.as_slice()),
            ("loss_ratio", self.loss_ratio.as_slice()),
            ("loss_proxy", self.loss_proxy.as_slice()),
        ]
    }

    pub fn linear(&self) -> impl Iterator<Item = &LinearConstraint> {
        self.active_power
            .iter()
            .chain(&self.reactive_power)
            .chain(&self.losses)
            .chain(&self.voltage_drop)
            .chain(&self.loss_ratio)
            .chain(&self.loss_proxy)
    }

    pub fn len(&self) -> usize {
        self.linear().count() + self.branch_flow.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Borrowing adapter so expressions can be printed with variable names.
pub(crate) struct Named<'a, T> {
    pub item: &'a T,
    pub vars: &'a DecisionVariables,
}

impl fmt::Display for Named<'_, LinearConstraint> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.item.name)?;
        self.item.expr.render_into(self.vars, f)?;
        write!(f, " == 0")
    }
}

impl fmt::Display for Named<'_, RotatedCone> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cone = self.item;
        let squares: Vec<String> = cone
            .terms
            .iter()
            .map(|&t| format!("{}^2", self.vars.get(t).name))
            .collect();
        write!(
            f,
            "{}: {} {} * {} >= {}",
            cone.name,
            cone.scale,
            self.vars.get(cone.a).name,
            self.vars.get(cone.b).name,
            squares.join(" + ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_evaluation() {
        let expr = LinearExpr::new()
            .term(VarId(0), 2.0)
            .term(VarId(1), -1.0)
            .term(VarId(2), 0.0)
            .constant(0.5);
        assert_eq!(expr.terms.len(), 2);
        assert!((expr.eval(&[1.0, 3.0, 9.0]) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_cone_gap() {
        let cone = RotatedCone {
            name: "branch_flow[1,2,0]".into(),
            scale: 1.0,
            a: VarId(0),
            b: VarId(1),
            terms: vec![VarId(2), VarId(3)],
        };
        // V=1, I=0.25, P=0.3, Q=0.4 → 0.25 − 0.25 = 0 (tight)
        assert!(cone.gap(&[1.0, 0.25, 0.3, 0.4]).abs() < 1e-12);
        assert!(cone.gap(&[1.0, 0.1, 0.3, 0.4]) < 0.0);
    }

    #[test]
    fn test_family_counts() {
        let mut set = ConstraintSet::default();
        assert!(set.is_empty());
        set.losses
            .push(LinearConstraint::new("losses[1,0]", LinearExpr::new()));
        set.branch_flow.push(RotatedCone {
            name: "c".into(),
            scale: 1.0,
            a: VarId(0),
            b: VarId(1),
            terms: vec![],
        });
        assert_eq!(set.len(), 2);
        assert_eq!(set.linear_families()[2].1.len(), 1);
    }
}

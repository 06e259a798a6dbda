//! Assembly of a [`BranchFlowModel`] into conic standard form.
//!
//! ```text
//! minimize    qᵀx
//! subject to  Ax + s = b,   s ∈ K = {0}ᵐ¹ × ℝ₊ᵐ² × SOC(n₁) × …
//! ```
//!
//! Row order: all linear equalities (zero cone), then variable bounds
//! (nonnegative cone), then one second-order cone per rotated cone.
//!
//! A rotated cone `k·a·b ≥ Σ xₘ²` with `a, b ≥ 0` is the standard cone
//!
//! ```text
//! ‖(2x₁, …, 2xₙ, k·a − b)‖ ≤ k·a + b
//! ```
//!
//! since `(k·a + b)² − (k·a − b)² = 4·k·a·b`. With `b = 0` the slack rows
//! equal `−A·x`, so every coefficient is entered negated.

use super::model::BranchFlowModel;
use serde::Serialize;

/// Cone block of consecutive rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConeBlock {
    Zero(usize),
    Nonnegative(usize),
    SecondOrder(usize),
}

impl ConeBlock {
    pub fn dim(&self) -> usize {
        match *self {
            ConeBlock::Zero(n) | ConeBlock::Nonnegative(n) | ConeBlock::SecondOrder(n) => n,
        }
    }
}

/// Linear objective, CSC constraint matrix, right-hand side and cones.
#[derive(Debug, Clone, Default)]
pub struct ConicProblem {
    pub n_var: usize,
    pub n_row: usize,
    pub q: Vec<f64>,
    /// Constant part of the objective, not seen by the engine
    pub objective_offset: f64,
    pub col_ptr: Vec<usize>,
    pub row_idx: Vec<usize>,
    pub values: Vec<f64>,
    pub b: Vec<f64>,
    pub cones: Vec<ConeBlock>,
}

impl ConicProblem {
    pub fn from_model(model: &BranchFlowModel) -> Self {
        let vars = model.variables();
        let n_var = vars.len();

        let mut q = vec![0.0; n_var];
        for &(var, coeff) in &model.objective().terms {
            q[var.0] += coeff;
        }

        // Column-wise accumulation: rows[col] = [(row, value)]
        let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n_var];
        let mut rhs: Vec<f64> = Vec::new();
        let mut cones: Vec<ConeBlock> = Vec::new();

        // Σ cᵢ·xᵢ = b
        let push_eq = |coeffs: &[(usize, f64)],
                       b: f64,
                       rows: &mut Vec<Vec<(usize, f64)>>,
                       rhs: &mut Vec<f64>,
                       cones: &mut Vec<ConeBlock>| {
            let row = rhs.len();
            for &(col, val) in coeffs {
                rows[col].push((row, val));
            }
            rhs.push(b);
            match cones.last_mut() {
                Some(ConeBlock::Zero(n)) => *n += 1,
                _ => cones.push(ConeBlock::Zero(1)),
            }
        };

        // Σ cᵢ·xᵢ ≤ b
        let push_leq = |coeffs: &[(usize, f64)],
                        b: f64,
                        rows: &mut Vec<Vec<(usize, f64)>>,
                        rhs: &mut Vec<f64>,
                        cones: &mut Vec<ConeBlock>| {
            let row = rhs.len();
            for &(col, val) in coeffs {
                rows[col].push((row, val));
            }
            rhs.push(b);
            match cones.last_mut() {
                Some(ConeBlock::Nonnegative(n)) => *n += 1,
                _ => cones.push(ConeBlock::Nonnegative(1)),
            }
        };

        for constraint in model.constraints().linear() {
            let coeffs: Vec<(usize, f64)> = constraint
                .expr
                .terms
                .iter()
                .map(|&(var, c)| (var.0, c))
                .collect();
            push_eq(&coeffs, -constraint.expr.constant, &mut rows, &mut rhs, &mut cones);
        }

        for (id, var) in vars.iter() {
            if let Some(upper) = var.upper {
                push_leq(&[(id.0, 1.0)], upper, &mut rows, &mut rhs, &mut cones);
            }
            if let Some(lower) = var.lower {
                push_leq(&[(id.0, -1.0)], -lower, &mut rows, &mut rhs, &mut cones);
            }
        }

        for cone in &model.constraints().branch_flow {
            let base = rhs.len();
            let dim = cone.terms.len() + 2;
            rhs.extend(std::iter::repeat(0.0).take(dim));

            // s₀ = k·a + b
            rows[cone.a.0].push((base, -cone.scale));
            rows[cone.b.0].push((base, -1.0));
            // s₁..sₙ = 2xₘ
            for (m, &term) in cone.terms.iter().enumerate() {
                rows[term.0].push((base + 1 + m, -2.0));
            }
            // sₙ₊₁ = k·a − b
            rows[cone.a.0].push((base + dim - 1, -cone.scale));
            rows[cone.b.0].push((base + dim - 1, 1.0));

            cones.push(ConeBlock::SecondOrder(dim));
        }

        let n_row = rhs.len();
        let mut col_ptr = Vec::with_capacity(n_var + 1);
        let mut row_idx = Vec::new();
        let mut values = Vec::new();
        for column in rows.iter_mut() {
            col_ptr.push(row_idx.len());
            column.sort_by_key(|(r, _)| *r);
            for &(r, v) in column.iter() {
                row_idx.push(r);
                values.push(v);
            }
        }
        col_ptr.push(row_idx.len());

        Self {
            n_var,
            n_row,
            q,
            objective_offset: model.objective().constant,
            col_ptr,
            row_idx,
            values,
            b: rhs,
            cones,
        }
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// `b − A·x`, the slack each row needs at `x`.
    pub fn slack(&self, x: &[f64]) -> Vec<f64> {
        let mut s = self.b.clone();
        for col in 0..self.n_var {
            let xv = x.get(col).copied().unwrap_or(0.0);
            for k in self.col_ptr[col]..self.col_ptr[col + 1] {
                s[self.row_idx[k]] -= self.values[k] * xv;
            }
        }
        s
    }
}

//! # bfm-core: Radial Distribution Network Core
//!
//! Data structures shared by the branch-flow workspace: bus and branch
//! records, the validated radial [`Network`], per-unit conversion and the
//! error taxonomy.
//!
//! ## Design
//!
//! A [`Network`] is immutable once built. Construction validates the tree
//! invariant (bus count = branch count + 1, connected, acyclic) and derives
//! an explicit parent/children orientation rooted at the lowest-numbered
//! bus, so the optimization model never relies on `from < to` numbering.
//!
//! ```
//! use bfm_core::*;
//!
//! let base = UnitConverter::new(100e3, 13.8).unwrap();
//! let nodes = vec![
//!     Node::new(BusId::new(1)).with_gen_limits(100.0, 100.0),
//!     Node::new(BusId::new(2)).with_load(-0.4, 0.0),
//! ];
//! let branches = vec![BranchRecord::new(BusId::new(1), BusId::new(2), 0.2, 1.0)];
//! let (network, diag) =
//!     Network::build(base, nodes, branches, ConnectivityRule::BranchList).unwrap();
//!
//! assert!(network.cx(BusId::new(1), BusId::new(2)));
//! assert_eq!(network.tree().parent(BusId::new(2)), Some(BusId::new(1)));
//! assert!(diag.is_empty());
//! ```
//!
//! ## Modules
//!
//! - [`units`] - per-unit conversion and typed quantities
//! - [`topology`] - radial tree validation and orientation
//! - [`matrix`] - symmetric sparse R / X storage
//! - [`profile`] - period-indexed loads
//! - [`diagnostics`] - defaulted-cell and topology warnings

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

pub mod diagnostics;
pub mod error;
pub mod matrix;
pub mod profile;
pub mod topology;
pub mod units;

pub use diagnostics::{DiagnosticIssue, Diagnostics};
pub use error::{BfmError, BfmResult};
pub use matrix::SymmetricMatrix;
pub use profile::{BusLoad, LoadProfile, Period};
pub use topology::{ConnectivityRule, RadialTree};
pub use units::{Ohms, PerUnit, UnitConverter, Vars, Watts};

/// Bus identifier as it appears in the input tables (1-based).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BusId(usize);

impl BusId {
    #[inline]
    pub fn new(value: usize) -> Self {
        BusId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Oriented `(head, tail)` bus pair naming a branch; serializes as `"1-2"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BranchKey {
    pub from: BusId,
    pub to: BusId,
}

impl BranchKey {
    pub fn new(from: BusId, to: BusId) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for BranchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

impl Serialize for BranchKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A bus with per-unit signed load injection and generation ceilings.
///
/// Loads follow the injection convention of the bus table: consumption is
/// negative, so a 40 kW demand is stored as `p_load = -0.4` on a 100 kVA base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: BusId,
    pub p_load: f64,
    pub q_load: f64,
    pub p_gen_max: f64,
    pub q_gen_max: f64,
}

impl Node {
    pub fn new(id: BusId) -> Self {
        Self {
            id,
            p_load: 0.0,
            q_load: 0.0,
            p_gen_max: 0.0,
            q_gen_max: 0.0,
        }
    }

    pub fn with_load(mut self, p: f64, q: f64) -> Self {
        self.p_load = p;
        self.q_load = q;
        self
    }

    pub fn with_gen_limits(mut self, p_max: f64, q_max: f64) -> Self {
        self.p_gen_max = p_max;
        self.q_gen_max = q_max;
        self
    }
}

/// A branch exactly as stated in the input table (per-unit impedance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchRecord {
    pub from: BusId,
    pub to: BusId,
    pub r: f64,
    pub x: f64,
    /// Shunt susceptance; carried through but not part of the model
    #[serde(default)]
    pub b_shunt: f64,
}

impl BranchRecord {
    pub fn new(from: BusId, to: BusId, r: f64, x: f64) -> Self {
        Self {
            from,
            to,
            r,
            x,
            b_shunt: 0.0,
        }
    }

    pub fn with_shunt(mut self, b: f64) -> Self {
        self.b_shunt = b;
        self
    }
}

/// A branch oriented from its upstream (head) to its downstream (tail) bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Branch {
    pub from: BusId,
    pub to: BusId,
    pub r: f64,
    pub x: f64,
    pub b_shunt: f64,
    /// The input record listed this branch tail-to-head
    pub reversed: bool,
}

impl Branch {
    pub fn key(&self) -> BranchKey {
        BranchKey::new(self.from, self.to)
    }

    /// `R² + X²`
    pub fn z_squared(&self) -> f64 {
        self.r * self.r + self.x * self.x
    }
}

/// Validated, per-unit radial network.
#[derive(Debug, Clone)]
pub struct Network {
    base: UnitConverter,
    nodes: Vec<Node>,
    position: BTreeMap<BusId, usize>,
    branches: Vec<Branch>,
    resistance: SymmetricMatrix,
    reactance: SymmetricMatrix,
    tree: RadialTree,
    rule: ConnectivityRule,
}

impl Network {
    /// Validate and orient a radial network.
    ///
    /// Under [`ConnectivityRule::NonZeroResistance`] records with `r == 0`
    /// do not connect their endpoints; the tree check then decides whether
    /// the remaining branches still span the network.
    pub fn build(
        base: UnitConverter,
        mut nodes: Vec<Node>,
        records: Vec<BranchRecord>,
        rule: ConnectivityRule,
    ) -> BfmResult<(Self, Diagnostics)> {
        let mut diag = Diagnostics::new();
        if nodes.is_empty() {
            return Err(BfmError::Data("network has no buses".to_string()));
        }
        nodes.sort_by_key(|n| n.id);

        let mut position = BTreeMap::new();
        for (idx, node) in nodes.iter().enumerate() {
            if position.insert(node.id, idx).is_some() {
                return Err(BfmError::Data(format!("bus {} is listed twice", node.id)));
            }
            for (name, value) in [("p_gen_max", node.p_gen_max), ("q_gen_max", node.q_gen_max)] {
                if !value.is_finite() || value < 0.0 {
                    return Err(BfmError::Data(format!(
                        "bus {}: {name} must be a non-negative number, got {value}",
                        node.id
                    )));
                }
            }
        }

        let mut edges = Vec::with_capacity(records.len());
        for record in &records {
            match rule {
                ConnectivityRule::NonZeroResistance if record.r == 0.0 => {
                    diag.add_warning_with_entity(
                        diagnostics::TOPOLOGY,
                        "zero resistance; treated as disconnected",
                        &format!("Branch {}-{}", record.from, record.to),
                    );
                }
                _ => edges.push((record.from, record.to)),
            }
        }

        let buses: Vec<BusId> = nodes.iter().map(|n| n.id).collect();
        let root = buses[0];
        let tree = RadialTree::build(&buses, root, &edges, &mut diag)?;

        let mut pairs_r = Vec::with_capacity(records.len());
        let mut pairs_x = Vec::with_capacity(records.len());
        let mut by_tail: BTreeMap<BusId, Branch> = BTreeMap::new();
        for record in &records {
            let (Some(&a), Some(&b)) = (position.get(&record.from), position.get(&record.to))
            else {
                continue;
            };
            pairs_r.push((a, b, record.r));
            pairs_x.push((a, b, record.x));

            let reversed = tree.parent(record.from) == Some(record.to);
            let (from, to) = if reversed {
                (record.to, record.from)
            } else {
                (record.from, record.to)
            };
            if tree.parent(to) == Some(from) {
                by_tail.insert(
                    to,
                    Branch {
                        from,
                        to,
                        r: record.r,
                        x: record.x,
                        b_shunt: record.b_shunt,
                        reversed,
                    },
                );
            }
        }
        let branches = tree
            .order()
            .iter()
            .filter_map(|bus| by_tail.remove(bus))
            .collect();

        let dim = nodes.len();
        tracing::debug!(
            buses = dim,
            branches = records.len(),
            rule = %rule,
            "built radial network"
        );
        let network = Self {
            base,
            nodes,
            position,
            branches,
            resistance: SymmetricMatrix::from_pairs(dim, &pairs_r),
            reactance: SymmetricMatrix::from_pairs(dim, &pairs_x),
            tree,
            rule,
        };
        Ok((network, diag))
    }

    pub fn base(&self) -> &UnitConverter {
        &self.base
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: BusId) -> Option<&Node> {
        self.position.get(&id).map(|&idx| &self.nodes[idx])
    }

    pub fn node_ids(&self) -> impl Iterator<Item = BusId> + '_ {
        self.nodes.iter().map(|n| n.id)
    }

    /// Oriented branches, root-first.
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn tree(&self) -> &RadialTree {
        &self.tree
    }

    pub fn connectivity_rule(&self) -> ConnectivityRule {
        self.rule
    }

    pub fn r(&self, i: BusId, j: BusId) -> f64 {
        self.pair(i, j)
            .map(|(a, b)| self.resistance.get(a, b))
            .unwrap_or(0.0)
    }

    pub fn x(&self, i: BusId, j: BusId) -> f64 {
        self.pair(i, j)
            .map(|(a, b)| self.reactance.get(a, b))
            .unwrap_or(0.0)
    }

    /// `Cx[i][j]`: a branch joins `i` and `j`. Always false for `i == j`.
    pub fn cx(&self, i: BusId, j: BusId) -> bool {
        i != j && self.tree.adjacent(i, j)
    }

    /// Dense 0/1 connectivity matrix in bus order, for reporting.
    pub fn connectivity_matrix(&self) -> Vec<Vec<u8>> {
        let ids: Vec<BusId> = self.node_ids().collect();
        ids.iter()
            .map(|&i| ids.iter().map(|&j| u8::from(self.cx(i, j))).collect())
            .collect()
    }

    /// Per-unit `R`, indexed like [`Network::connectivity_matrix`].
    pub fn resistance_matrix(&self) -> &SymmetricMatrix {
        &self.resistance
    }

    pub fn reactance_matrix(&self) -> &SymmetricMatrix {
        &self.reactance
    }

    fn pair(&self, i: BusId, j: BusId) -> Option<(usize, usize)> {
        Some((*self.position.get(&i)?, *self.position.get(&j)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> UnitConverter {
        UnitConverter::new(100e3, 13.8).unwrap()
    }

    fn feeder(records: Vec<BranchRecord>, n: usize) -> BfmResult<(Network, Diagnostics)> {
        let nodes = (1..=n).map(|i| Node::new(BusId::new(i))).collect();
        Network::build(base(), nodes, records, ConnectivityRule::BranchList)
    }

    #[test]
    fn test_symmetric_impedance_lookup() {
        let (net, _) = feeder(
            vec![
                BranchRecord::new(BusId::new(1), BusId::new(2), 0.2, 1.0),
                BranchRecord::new(BusId::new(2), BusId::new(3), 0.1, 0.3),
            ],
            3,
        )
        .unwrap();

        assert_eq!(net.r(BusId::new(2), BusId::new(1)), 0.2);
        assert_eq!(net.x(BusId::new(3), BusId::new(2)), 0.3);
        assert_eq!(net.r(BusId::new(1), BusId::new(3)), 0.0);
        assert!(net.cx(BusId::new(3), BusId::new(2)));
        assert!(!net.cx(BusId::new(2), BusId::new(2)));
        assert_eq!(
            net.connectivity_matrix(),
            vec![vec![0, 1, 0], vec![1, 0, 1], vec![0, 1, 0]]
        );
        assert_eq!(net.reactance_matrix().to_dense()[2][1], 0.3);
        assert_eq!(net.resistance_matrix().nnz(), 4);
    }

    #[test]
    fn test_branches_are_oriented_root_first() {
        let (net, diag) = feeder(
            vec![
                BranchRecord::new(BusId::new(3), BusId::new(2), 0.1, 0.3),
                BranchRecord::new(BusId::new(1), BusId::new(2), 0.2, 1.0),
            ],
            3,
        )
        .unwrap();

        let keys: Vec<String> = net.branches().iter().map(|b| b.key().to_string()).collect();
        assert_eq!(keys, vec!["1-2", "2-3"]);
        assert!(net.branches()[1].reversed);
        assert_eq!(diag.warning_count(), 1);
    }

    #[test]
    fn test_zero_resistance_branch_kept_under_branch_list() {
        let (net, _) = feeder(
            vec![BranchRecord::new(BusId::new(1), BusId::new(2), 0.0, 0.5)],
            2,
        )
        .unwrap();
        assert!(net.cx(BusId::new(1), BusId::new(2)));
        assert_eq!(net.x(BusId::new(1), BusId::new(2)), 0.5);
    }

    #[test]
    fn test_zero_resistance_disconnects_under_legacy_rule() {
        let nodes = vec![Node::new(BusId::new(1)), Node::new(BusId::new(2))];
        let records = vec![BranchRecord::new(BusId::new(1), BusId::new(2), 0.0, 0.5)];
        let result = Network::build(base(), nodes, records, ConnectivityRule::NonZeroResistance);
        assert!(matches!(result, Err(BfmError::Data(_))));
    }

    #[test]
    fn test_negative_generation_limit_rejected() {
        let nodes = vec![
            Node::new(BusId::new(1)).with_gen_limits(-1.0, 0.0),
            Node::new(BusId::new(2)),
        ];
        let records = vec![BranchRecord::new(BusId::new(1), BusId::new(2), 0.1, 0.1)];
        let result = Network::build(base(), nodes, records, ConnectivityRule::BranchList);
        assert!(matches!(result, Err(BfmError::Data(_))));
    }

    #[test]
    fn test_branch_key_serializes_as_string() {
        let mut map = BTreeMap::new();
        map.insert(BranchKey::new(BusId::new(1), BusId::new(2)), 0.5);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, "{\"1-2\":0.5}");
    }
}

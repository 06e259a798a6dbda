//! Radial topology: validation and explicit parent/children orientation.
//!
//! The branch-flow balance equations sum "downstream" terms over a bus's
//! children and "upstream" terms over its single parent. Instead of relying
//! on `from < to` numbering, the orientation is derived once by a
//! breadth-first search from the root bus and stored explicitly.

use crate::diagnostics::{Diagnostics, TOPOLOGY};
use crate::error::{BfmError, BfmResult};
use crate::BusId;
use petgraph::algo::{connected_components, is_cyclic_undirected};
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;

/// How the connectivity matrix `Cx` is derived from branch records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectivityRule {
    /// Every branch record connects its endpoints regardless of impedance.
    #[default]
    BranchList,
    /// Legacy rule: a pair is connected iff its resistance is nonzero.
    #[serde(rename = "nonzero-resistance")]
    NonZeroResistance,
}

impl ConnectivityRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectivityRule::BranchList => "branch-list",
            ConnectivityRule::NonZeroResistance => "nonzero-resistance",
        }
    }
}

impl fmt::Display for ConnectivityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectivityRule {
    type Err = BfmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "branch-list" | "branches" => Ok(ConnectivityRule::BranchList),
            "nonzero-resistance" | "resistance" => Ok(ConnectivityRule::NonZeroResistance),
            other => Err(BfmError::Config(format!(
                "unknown connectivity rule '{other}'; expected branch-list or nonzero-resistance"
            ))),
        }
    }
}

/// A validated tree over the bus set, rooted at the source bus.
#[derive(Debug, Clone)]
pub struct RadialTree {
    root: BusId,
    parent: BTreeMap<BusId, BusId>,
    children: BTreeMap<BusId, Vec<BusId>>,
    /// Buses in breadth-first order from the root
    order: Vec<BusId>,
}

impl RadialTree {
    /// Validate `edges` as a spanning tree of `buses` rooted at `root`.
    ///
    /// Records whose stated direction disagrees with the derived orientation
    /// are accepted and reported as topology warnings in `diag`.
    pub fn build(
        buses: &[BusId],
        root: BusId,
        edges: &[(BusId, BusId)],
        diag: &mut Diagnostics,
    ) -> BfmResult<Self> {
        if edges.len() + 1 != buses.len() {
            return Err(BfmError::Data(format!(
                "radial network needs {} branches for {} buses, found {}",
                buses.len().saturating_sub(1),
                buses.len(),
                edges.len()
            )));
        }

        let mut graph = UnGraph::<BusId, ()>::with_capacity(buses.len(), edges.len());
        let mut index: HashMap<BusId, NodeIndex> = HashMap::with_capacity(buses.len());
        for &bus in buses {
            if index.insert(bus, graph.add_node(bus)).is_some() {
                return Err(BfmError::Data(format!("bus {bus} is listed twice")));
            }
        }
        let root_idx = *index
            .get(&root)
            .ok_or_else(|| BfmError::Data(format!("root bus {root} is not in the network")))?;

        let mut seen = BTreeSet::new();
        for &(from, to) in edges {
            if from == to {
                return Err(BfmError::Data(format!("branch {from}-{to} joins a bus to itself")));
            }
            let a = *index
                .get(&from)
                .ok_or_else(|| BfmError::Data(format!("branch {from}-{to} references unknown bus {from}")))?;
            let b = *index
                .get(&to)
                .ok_or_else(|| BfmError::Data(format!("branch {from}-{to} references unknown bus {to}")))?;
            if !seen.insert((from.min(to), from.max(to))) {
                return Err(BfmError::Data(format!("branch {from}-{to} is listed more than once")));
            }
            graph.add_edge(a, b, ());
        }

        if is_cyclic_undirected(&graph) {
            return Err(BfmError::Data("branch list contains a cycle".to_string()));
        }
        let components = connected_components(&graph);
        if components != 1 {
            return Err(BfmError::Data(format!(
                "network is split into {components} islands"
            )));
        }

        let mut parent = BTreeMap::new();
        let mut children: BTreeMap<BusId, Vec<BusId>> =
            buses.iter().map(|&b| (b, Vec::new())).collect();
        let mut order = Vec::with_capacity(buses.len());
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(root_idx);
        visited.insert(root);
        while let Some(node) = queue.pop_front() {
            let bus = graph[node];
            order.push(bus);
            let mut next: Vec<NodeIndex> = graph.neighbors(node).collect();
            next.sort_by_key(|n| graph[*n]);
            for neighbor in next {
                let child = graph[neighbor];
                if visited.insert(child) {
                    parent.insert(child, bus);
                    if let Some(list) = children.get_mut(&bus) {
                        list.push(child);
                    }
                    queue.push_back(neighbor);
                }
            }
        }

        for &(from, to) in edges {
            if parent.get(&from) == Some(&to) {
                diag.add_warning_with_entity(
                    TOPOLOGY,
                    "branch listed downstream-to-upstream; re-oriented",
                    &format!("Branch {from}-{to}"),
                );
            }
        }

        Ok(Self {
            root,
            parent,
            children,
            order,
        })
    }

    pub fn root(&self) -> BusId {
        self.root
    }

    /// Upstream neighbour; `None` for the root.
    pub fn parent(&self, bus: BusId) -> Option<BusId> {
        self.parent.get(&bus).copied()
    }

    /// Downstream neighbours; empty for leaves.
    pub fn children(&self, bus: BusId) -> &[BusId] {
        self.children.get(&bus).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Buses root-first.
    pub fn order(&self) -> &[BusId] {
        &self.order
    }

    pub fn is_leaf(&self, bus: BusId) -> bool {
        self.children(bus).is_empty()
    }

    /// True iff a branch joins `a` and `b` in either direction.
    pub fn adjacent(&self, a: BusId, b: BusId) -> bool {
        self.parent(a) == Some(b) || self.parent(b) == Some(a)
    }

    pub fn depth(&self, bus: BusId) -> usize {
        let mut depth = 0;
        let mut current = bus;
        while let Some(p) = self.parent(current) {
            depth += 1;
            current = p;
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[usize]) -> Vec<BusId> {
        values.iter().map(|&v| BusId::new(v)).collect()
    }

    fn edge(a: usize, b: usize) -> (BusId, BusId) {
        (BusId::new(a), BusId::new(b))
    }

    #[test]
    fn test_parent_children_orientation() {
        let buses = ids(&[1, 2, 3, 4]);
        let mut diag = Diagnostics::new();
        let tree = RadialTree::build(
            &buses,
            BusId::new(1),
            &[edge(1, 2), edge(2, 3), edge(2, 4)],
            &mut diag,
        )
        .unwrap();

        assert_eq!(tree.parent(BusId::new(1)), None);
        assert_eq!(tree.parent(BusId::new(3)), Some(BusId::new(2)));
        assert_eq!(tree.children(BusId::new(2)), ids(&[3, 4]).as_slice());
        assert!(tree.is_leaf(BusId::new(4)));
        assert_eq!(tree.depth(BusId::new(4)), 2);
        assert_eq!(tree.order(), ids(&[1, 2, 3, 4]).as_slice());
        assert!(diag.is_empty());
    }

    #[test]
    fn test_reversed_record_is_reoriented() {
        let buses = ids(&[1, 2, 3]);
        let mut diag = Diagnostics::new();
        let tree = RadialTree::build(&buses, BusId::new(1), &[edge(2, 1), edge(2, 3)], &mut diag)
            .unwrap();
        assert_eq!(tree.parent(BusId::new(2)), Some(BusId::new(1)));
        assert_eq!(diag.count_in(TOPOLOGY), 1);
    }

    #[test]
    fn test_non_sequential_numbering() {
        // Bus 5 feeds bus 2: numeric order does not decide orientation.
        let buses = ids(&[1, 2, 5]);
        let mut diag = Diagnostics::new();
        let tree = RadialTree::build(&buses, BusId::new(1), &[edge(1, 5), edge(5, 2)], &mut diag)
            .unwrap();
        assert_eq!(tree.parent(BusId::new(2)), Some(BusId::new(5)));
        assert!(tree.adjacent(BusId::new(2), BusId::new(5)));
        assert!(!tree.adjacent(BusId::new(1), BusId::new(2)));
    }

    #[test]
    fn test_invalid_topologies() {
        let mut diag = Diagnostics::new();
        let root = BusId::new(1);

        let count = RadialTree::build(&ids(&[1, 2, 3]), root, &[edge(1, 2)], &mut diag);
        assert!(matches!(count, Err(BfmError::Data(_))));

        let self_loop = RadialTree::build(&ids(&[1, 2]), root, &[edge(2, 2)], &mut diag);
        assert!(matches!(self_loop, Err(BfmError::Data(_))));

        let unknown = RadialTree::build(&ids(&[1, 2]), root, &[edge(1, 9)], &mut diag);
        assert!(matches!(unknown, Err(BfmError::Data(_))));

        let duplicate =
            RadialTree::build(&ids(&[1, 2, 3]), root, &[edge(1, 2), edge(2, 1)], &mut diag);
        assert!(matches!(duplicate, Err(BfmError::Data(_))));

        let cycle = RadialTree::build(
            &ids(&[1, 2, 3, 4]),
            root,
            &[edge(1, 2), edge(2, 3), edge(3, 1)],
            &mut diag,
        );
        assert!(matches!(cycle, Err(BfmError::Data(msg)) if msg.contains("cycle")));
    }

    #[test]
    fn test_single_bus_tree() {
        let mut diag = Diagnostics::new();
        let tree = RadialTree::build(&ids(&[1]), BusId::new(1), &[], &mut diag).unwrap();
        assert_eq!(tree.order(), ids(&[1]).as_slice());
        assert!(tree.is_leaf(BusId::new(1)));
    }

    #[test]
    fn test_connectivity_rule_parsing() {
        assert_eq!(
            "branch-list".parse::<ConnectivityRule>().unwrap(),
            ConnectivityRule::BranchList
        );
        assert_eq!(
            "NonZero-Resistance".parse::<ConnectivityRule>().unwrap(),
            ConnectivityRule::NonZeroResistance
        );
        assert!("graph".parse::<ConnectivityRule>().is_err());
        assert_eq!(ConnectivityRule::default().to_string(), "branch-list");
    }
}

//! Period-indexed bus loads.
//!
//! Periods without an entry for a bus fall back to the static bus table
//! value held by the [`Network`](crate::Network).

use crate::{BfmError, BfmResult, BusId, Network};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Time period index, 0-based.
pub type Period = usize;

/// Per-unit signed injection `(p, q)` for one bus in one period.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BusLoad {
    pub p: f64,
    pub q: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadProfile {
    entries: BTreeMap<Period, BTreeMap<BusId, BusLoad>>,
}

impl LoadProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, period: Period, bus: BusId, p: f64, q: f64) {
        self.entries
            .entry(period)
            .or_default()
            .insert(bus, BusLoad { p, q });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Periods that carry at least one entry.
    pub fn periods(&self) -> impl Iterator<Item = Period> + '_ {
        self.entries.keys().copied()
    }

    /// Every profiled bus must exist in `network`.
    pub fn validate(&self, network: &Network) -> BfmResult<()> {
        for (period, loads) in &self.entries {
            if let Some(bus) = loads.keys().find(|&&bus| network.node(bus).is_none()) {
                return Err(BfmError::Data(format!(
                    "load profile period {period} references unknown bus {bus}"
                )));
            }
        }
        Ok(())
    }

    pub fn get(&self, period: Period, bus: BusId) -> Option<BusLoad> {
        self.entries.get(&period)?.get(&bus).copied()
    }

    /// Load for `bus` in `period`, falling back to the network's static load.
    pub fn load_at(&self, network: &Network, period: Period, bus: BusId) -> BusLoad {
        self.get(period, bus).unwrap_or_else(|| {
            network
                .node(bus)
                .map(|n| BusLoad {
                    p: n.p_load,
                    q: n.q_load,
                })
                .unwrap_or_default()
        })
    }
}

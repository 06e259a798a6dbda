//! Normalize raw branch and bus tables into a per-unit [`Network`].
//!
//! Branch table columns (by position): `from, to, r [Ω], x [Ω], [b]`.
//! Bus table columns (by position): `bus, p [W], q [var], pgen_max [W], qgen_max [var]`.
//!
//! The bus set is `1..=branches + 1`. Buses absent from the bus table carry
//! zero load and zero generation capacity; NaN cells default to zero. Both
//! cases are recorded as warnings.

use crate::tables::RawTable;
use bfm_core::diagnostics::{DEFAULTED_CELL, MISSING_BUS};
use bfm_core::units::{impedance_map_to_per_unit, power_map_to_per_unit};
use bfm_core::{
    BfmError, BfmResult, BranchRecord, BusId, ConnectivityRule, Diagnostics, Network, Node,
    UnitConverter,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

const BRANCH_COLUMNS: usize = 4;
const BUS_COLUMNS: usize = 5;

/// Sign convention of the load columns in the bus table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadConvention {
    /// Signed injection: consumption is negative (`-40000` for a 40 kW load).
    #[default]
    Injection,
    /// Positive consumption; negated on load.
    Demand,
}

impl LoadConvention {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadConvention::Injection => "injection",
            LoadConvention::Demand => "demand",
        }
    }

    pub(crate) fn sign(&self) -> f64 {
        match self {
            LoadConvention::Injection => 1.0,
            LoadConvention::Demand => -1.0,
        }
    }
}

impl fmt::Display for LoadConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoadConvention {
    type Err = BfmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "injection" => Ok(LoadConvention::Injection),
            "demand" | "consumption" => Ok(LoadConvention::Demand),
            other => Err(BfmError::Config(format!(
                "unknown load convention '{other}'; expected injection or demand"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub s_base: f64,
    pub v_base: f64,
    pub connectivity: ConnectivityRule,
    pub load_convention: LoadConvention,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            s_base: 100e3,
            v_base: 13.8,
            connectivity: ConnectivityRule::BranchList,
            load_convention: LoadConvention::Injection,
        }
    }
}

/// A validated per-unit network plus the audit trail of its construction.
#[derive(Debug, Clone)]
pub struct NetworkData {
    network: Network,
    diagnostics: Diagnostics,
}

impl NetworkData {
    pub fn from_csv(branches: &Path, buses: &Path, options: &LoadOptions) -> BfmResult<Self> {
        let branch_table = RawTable::from_path(branches)?;
        let bus_table = RawTable::from_path(buses)?;
        Self::from_tables(&branch_table, &bus_table, options)
    }

    pub fn from_tables(
        branches: &RawTable,
        buses: &RawTable,
        options: &LoadOptions,
    ) -> BfmResult<Self> {
        let base = UnitConverter::new(options.s_base, options.v_base)?;
        branches.require_columns("branch", BRANCH_COLUMNS)?;
        buses.require_columns("bus", BUS_COLUMNS)?;
        let mut diag = Diagnostics::new();

        let bus_count = branches.len() + 1;
        let bus_ids: Vec<BusId> = (1..=bus_count).map(BusId::new).collect();

        let mut r_ohm = BTreeMap::new();
        let mut x_ohm = BTreeMap::new();
        let mut b_raw = BTreeMap::new();
        let mut order = Vec::with_capacity(branches.len());
        for row in 0..branches.len() {
            let from = BusId::new(branches.id_cell(row, 0)?);
            let to = BusId::new(branches.id_cell(row, 1)?);
            let r = branches.cell(row, 2);
            let x = branches.cell(row, 3);
            if !r.is_finite() || !x.is_finite() {
                return Err(BfmError::Data(format!(
                    "line {}: branch {from}-{to} needs numeric r and x",
                    branches.line(row)
                )));
            }
            let b = branches.cell(row, 4);
            r_ohm.insert((from, to), r);
            x_ohm.insert((from, to), x);
            b_raw.insert((from, to), if b.is_nan() { 0.0 } else { b });
            order.push((from, to));
        }
        if order.len() != r_ohm.len() {
            return Err(BfmError::Data(
                "branch table lists the same bus pair more than once".to_string(),
            ));
        }

        let sign = options.load_convention.sign();
        let mut p_raw = BTreeMap::new();
        let mut q_raw = BTreeMap::new();
        let mut pmax_raw = BTreeMap::new();
        let mut qmax_raw = BTreeMap::new();
        for row in 0..buses.len() {
            let id = buses.id_cell(row, 0)?;
            if id > bus_count {
                return Err(BfmError::Data(format!(
                    "line {}: bus {id} is outside 1..={bus_count} implied by {} branches",
                    buses.line(row),
                    branches.len()
                )));
            }
            let bus = BusId::new(id);
            if p_raw.contains_key(&bus) {
                return Err(BfmError::Data(format!(
                    "line {}: bus {bus} appears twice in the bus table",
                    buses.line(row)
                )));
            }
            for (col, name) in [(1, "p"), (2, "q"), (3, "pgen_max"), (4, "qgen_max")] {
                if buses.cell(row, col).is_nan() {
                    diag.add_warning_at_line(
                        DEFAULTED_CELL,
                        &format!("bus {bus}: {name} is missing, using 0"),
                        buses.line(row),
                    );
                }
            }
            p_raw.insert(bus, sign * buses.cell(row, 1));
            q_raw.insert(bus, sign * buses.cell(row, 2));
            pmax_raw.insert(bus, buses.cell(row, 3));
            qmax_raw.insert(bus, buses.cell(row, 4));
        }
        for &bus in &bus_ids {
            if !p_raw.contains_key(&bus) {
                diag.add_warning_with_entity(
                    MISSING_BUS,
                    "no row in bus table; zero load and generation",
                    &format!("Bus {bus}"),
                );
            }
        }

        let s_base = base.s_base();
        let p = power_map_to_per_unit(&p_raw, s_base)?;
        let q = power_map_to_per_unit(&q_raw, s_base)?;
        let pmax = power_map_to_per_unit(&pmax_raw, s_base)?;
        let qmax = power_map_to_per_unit(&qmax_raw, s_base)?;
        let r = impedance_map_to_per_unit(&r_ohm, s_base, base.v_base())?;
        let x = impedance_map_to_per_unit(&x_ohm, s_base, base.v_base())?;
        let z_base = base.z_base().value();

        let nodes = bus_ids
            .iter()
            .map(|&bus| {
                let get = |m: &BTreeMap<BusId, f64>| m.get(&bus).copied().unwrap_or(0.0);
                Node::new(bus)
                    .with_load(get(&p), get(&q))
                    .with_gen_limits(get(&pmax), get(&qmax))
            })
            .collect();
        let records = order
            .iter()
            .map(|key| {
                let get = |m: &BTreeMap<(BusId, BusId), f64>| m.get(key).copied().unwrap_or(0.0);
                BranchRecord::new(key.0, key.1, get(&r), get(&x)).with_shunt(get(&b_raw) * z_base)
            })
            .collect();

        let (network, topo_diag) = Network::build(base, nodes, records, options.connectivity)?;
        diag.merge(topo_diag);

        if diag.count_in(DEFAULTED_CELL) > 0 {
            warn!(
                cells = diag.count_in(DEFAULTED_CELL),
                "missing bus table cells defaulted to zero"
            );
        }
        info!(
            buses = bus_count,
            branches = order.len(),
            s_base,
            v_base = base.v_base(),
            "loaded network data"
        );

        Ok(Self {
            network,
            diagnostics: diag,
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn into_parts(self) -> (Network, Diagnostics) {
        (self.network, self.diagnostics)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Number of NaN / empty bus table cells replaced by zero.
    pub fn defaulted_cells(&self) -> usize {
        self.diagnostics.count_in(DEFAULTED_CELL)
    }

    pub fn p_load(&self) -> BTreeMap<BusId, f64> {
        self.node_map(|n| n.p_load)
    }

    pub fn q_load(&self) -> BTreeMap<BusId, f64> {
        self.node_map(|n| n.q_load)
    }

    pub fn p_gen_max(&self) -> BTreeMap<BusId, f64> {
        self.node_map(|n| n.p_gen_max)
    }

    pub fn q_gen_max(&self) -> BTreeMap<BusId, f64> {
        self.node_map(|n| n.q_gen_max)
    }

    fn node_map(&self, f: impl Fn(&Node) -> f64) -> BTreeMap<BusId, f64> {
        self.network.nodes().iter().map(|n| (n.id, f(n))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> RawTable {
        RawTable::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_two_bus_feeder_per_unit() {
        let branches = table("from,to,r,x\n1,2,0.00038088,0.0019044\n");
        let buses = table("bus,p,q,pgen_max,qgen_max\n1,0,0,10000000,10000000\n2,-40000,0,0,0\n");
        let data = NetworkData::from_tables(&branches, &buses, &LoadOptions::default()).unwrap();
        let net = data.network();

        let (one, two) = (BusId::new(1), BusId::new(2));
        assert!((net.r(one, two) - 0.2).abs() < 1e-2);
        assert!((net.x(one, two) - 1.0).abs() < 1e-2);
        assert!((data.p_load()[&two] + 0.4).abs() < 1e-12);
        assert!((data.p_gen_max()[&one] - 100.0).abs() < 1e-9);
        assert_eq!(data.defaulted_cells(), 0);
        assert!(net.cx(one, two));
    }

    #[test]
    fn test_missing_cells_default_to_zero() {
        let branches = table("from,to,r,x\n1,2,0.1,0.1\n2,3,0.1,0.1\n");
        let buses = table("bus,p,q,pgen_max,qgen_max\n1,,,5000,5000\n3,-1000,NaN,,\n");
        let data = NetworkData::from_tables(&branches, &buses, &LoadOptions::default()).unwrap();

        assert_eq!(data.p_load()[&BusId::new(1)], 0.0);
        assert_eq!(data.q_load()[&BusId::new(3)], 0.0);
        assert_eq!(data.defaulted_cells(), 5);
        assert_eq!(data.diagnostics().count_in(MISSING_BUS), 1);
        assert_eq!(data.network().nodes().len(), 3);
    }

    #[test]
    fn test_demand_convention_flips_sign() {
        let branches = table("from,to,r,x\n1,2,0.1,0.1\n");
        let buses = table("bus,p,q,pgen_max,qgen_max\n2,40000,10000,0,0\n");
        let options = LoadOptions {
            load_convention: LoadConvention::Demand,
            ..LoadOptions::default()
        };
        let data = NetworkData::from_tables(&branches, &buses, &options).unwrap();
        assert!((data.p_load()[&BusId::new(2)] + 0.4).abs() < 1e-12);
        assert!((data.q_load()[&BusId::new(2)] + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_bus_outside_range_rejected() {
        let branches = table("from,to,r,x\n1,2,0.1,0.1\n");
        let buses = table("bus,p,q,pgen_max,qgen_max\n9,0,0,0,0\n");
        let err = NetworkData::from_tables(&branches, &buses, &LoadOptions::default());
        assert!(matches!(err, Err(BfmError::Data(_))));
    }

    #[test]
    fn test_zero_base_rejected() {
        let branches = table("from,to,r,x\n1,2,0.1,0.1\n");
        let buses = table("bus,p,q,pgen_max,qgen_max\n1,0,0,0,0\n");
        let options = LoadOptions {
            s_base: 0.0,
            ..LoadOptions::default()
        };
        let err = NetworkData::from_tables(&branches, &buses, &options);
        assert!(matches!(err, Err(BfmError::Config(_))));
    }

    #[test]
    fn test_non_tree_rejected() {
        let branches = table("from,to,r,x\n1,2,0.1,0.1\n2,1,0.1,0.1\n");
        let buses = table("bus,p,q,pgen_max,qgen_max\n1,0,0,0,0\n");
        let err = NetworkData::from_tables(&branches, &buses, &LoadOptions::default());
        assert!(matches!(err, Err(BfmError::Data(_))));
    }

    #[test]
    fn test_narrow_tables_rejected() {
        let branches = table("from,to,r\n1,2,0.1\n");
        let buses = table("bus,p,q,pgen_max,qgen_max\n1,0,0,0,0\n");
        let err = NetworkData::from_tables(&branches, &buses, &LoadOptions::default());
        assert!(matches!(err, Err(BfmError::Data(_))));
    }
}

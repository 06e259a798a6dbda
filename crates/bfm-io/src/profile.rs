//! Load profile tables: `period, bus, p [W], q [var]` by column position.

use crate::network_data::LoadConvention;
use crate::tables::RawTable;
use bfm_core::diagnostics::DEFAULTED_CELL;
use bfm_core::profile::Period;
use bfm_core::units::power_to_per_unit_periods;
use bfm_core::{BfmError, BfmResult, BusId, Diagnostics, LoadProfile, UnitConverter};
use std::collections::BTreeMap;
use std::path::Path;

pub fn load_profile_csv(
    path: &Path,
    base: &UnitConverter,
    convention: LoadConvention,
    diag: &mut Diagnostics,
) -> BfmResult<LoadProfile> {
    let table = RawTable::from_path(path)?;
    profile_from_table(&table, base, convention, diag)
}

/// Periods are 0-based; bus ids must be positive integers. A `(period, bus)`
/// pair may appear at most once.
pub fn profile_from_table(
    table: &RawTable,
    base: &UnitConverter,
    convention: LoadConvention,
    diag: &mut Diagnostics,
) -> BfmResult<LoadProfile> {
    table.require_columns("profile", 4)?;
    let sign = convention.sign();
    let mut raw_p: BTreeMap<Period, BTreeMap<BusId, f64>> = BTreeMap::new();
    let mut raw_q: BTreeMap<Period, BTreeMap<BusId, f64>> = BTreeMap::new();
    for row in 0..table.len() {
        let line = table.line(row);
        let period = table.cell(row, 0);
        if !period.is_finite() || period < 0.0 || period.fract() != 0.0 {
            return Err(BfmError::Parse(format!(
                "line {line}: period must be a non-negative integer, got {period}"
            )));
        }
        let period = period as Period;
        let bus = BusId::new(table.id_cell(row, 1)?);
        if raw_p.get(&period).is_some_and(|loads| loads.contains_key(&bus)) {
            return Err(BfmError::Data(format!(
                "line {line}: duplicate profile entry for period {period}, bus {bus}"
            )));
        }
        let mut read = |col: usize, name: &str| {
            let value = table.cell(row, col);
            if value.is_nan() {
                diag.add_warning_at_line(
                    DEFAULTED_CELL,
                    &format!("profile bus {bus}: {name} is missing, using 0"),
                    line,
                );
            }
            sign * value
        };
        let p = read(2, "p");
        let q = read(3, "q");
        raw_p.entry(period).or_default().insert(bus, p);
        raw_q.entry(period).or_default().insert(bus, q);
    }

    let p_pu = power_to_per_unit_periods(&raw_p, base.s_base())?;
    let q_pu = power_to_per_unit_periods(&raw_q, base.s_base())?;
    let mut profile = LoadProfile::new();
    for (period, loads) in p_pu {
        for (bus, p) in loads {
            let q = q_pu
                .get(&period)
                .and_then(|row| row.get(&bus))
                .copied()
                .unwrap_or(0.0);
            profile.insert(period, bus, p, q);
        }
    }
    Ok(profile)
}

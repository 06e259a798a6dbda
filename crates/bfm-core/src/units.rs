//! Per-unit normalization and typed quantities for distribution feeders.
//!
//! Raw network tables carry powers in W/var and impedances in Ω. The
//! optimization model works exclusively in per-unit values relative to a
//! base apparent power `S_base` and a base voltage `V_base`, with the base
//! impedance `Z_base = V_base² / S_base`.
//!
//! The newtypes keep raw and normalized values apart at compile time:
//!
//! ```
//! use bfm_core::units::{Ohms, PerUnit, UnitConverter, Watts};
//!
//! let base = UnitConverter::new(100e3, 13.8).unwrap();
//! let load: Watts = base.to_watts(PerUnit(-0.4));
//! assert!((load.value() + 40e3).abs() < 1e-6);
//!
//! let z_base: Ohms = base.z_base();
//! assert!((z_base.value() - 0.0019044).abs() < 1e-9);
//! ```
//!
//! Missing measurements arrive as NaN and are normalized to zero. Zero,
//! negative or non-finite bases are rejected with [`BfmError::Config`].

use crate::error::{BfmError, BfmResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Macro to implement common arithmetic operations for unit types
macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4} {}", self.0, $unit_name)
            }
        }

        impl $type {
            /// Get the raw numeric value
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Check if value is NaN
            #[inline]
            pub fn is_nan(self) -> bool {
                self.0.is_nan()
            }
        }

        impl std::iter::Sum for $type {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

/// Active power in watts (W)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Watts(pub f64);

impl_unit_ops!(Watts, "W");

/// Reactive power in volt-amperes reactive (var)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Vars(pub f64);

impl_unit_ops!(Vars, "var");

/// Series impedance component in ohms (Ω)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Ohms(pub f64);

impl_unit_ops!(Ohms, "Ω");

/// Dimensionless value normalized to the system base
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PerUnit(pub f64);

impl_unit_ops!(PerUnit, "pu");

fn check_base(name: &str, value: f64) -> BfmResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(BfmError::Config(format!(
            "{name} must be positive and finite, got {value}"
        )));
    }
    Ok(())
}

/// Base impedance `Z_base = V_base² / S_base`.
pub fn base_impedance(s_base: f64, v_base: f64) -> BfmResult<f64> {
    check_base("S_base", s_base)?;
    check_base("V_base", v_base)?;
    Ok(v_base * v_base / s_base)
}

/// Normalize a power value. NaN (an unmetered bus) maps to zero.
pub fn power_to_per_unit(value: f64, s_base: f64) -> BfmResult<f64> {
    check_base("S_base", s_base)?;
    if value.is_nan() {
        return Ok(0.0);
    }
    Ok(value / s_base)
}

/// Inverse of [`power_to_per_unit`].
pub fn per_unit_to_power(value: f64, s_base: f64) -> f64 {
    value * s_base
}

/// Normalize an ohmic impedance by `Z_base`.
pub fn impedance_to_per_unit(z_ohm: f64, s_base: f64, v_base: f64) -> BfmResult<f64> {
    let z_base = base_impedance(s_base, v_base)?;
    Ok(z_ohm / z_base)
}

/// Element-wise [`power_to_per_unit`] over a keyed mapping.
pub fn power_map_to_per_unit<K: Ord + Clone>(
    values: &BTreeMap<K, f64>,
    s_base: f64,
) -> BfmResult<BTreeMap<K, f64>> {
    values
        .iter()
        .map(|(k, v)| Ok((k.clone(), power_to_per_unit(*v, s_base)?)))
        .collect()
}

/// Element-wise [`power_to_per_unit`] over a `period -> key -> value` mapping.
pub fn power_to_per_unit_periods<P: Ord + Clone, K: Ord + Clone>(
    values: &BTreeMap<P, BTreeMap<K, f64>>,
    s_base: f64,
) -> BfmResult<BTreeMap<P, BTreeMap<K, f64>>> {
    values
        .iter()
        .map(|(p, inner)| Ok((p.clone(), power_map_to_per_unit(inner, s_base)?)))
        .collect()
}

/// Element-wise [`impedance_to_per_unit`] over a keyed mapping.
pub fn impedance_map_to_per_unit<K: Ord + Clone>(
    values: &BTreeMap<K, f64>,
    s_base: f64,
    v_base: f64,
) -> BfmResult<BTreeMap<K, f64>> {
    let z_base = base_impedance(s_base, v_base)?;
    Ok(values.iter().map(|(k, v)| (k.clone(), v / z_base)).collect())
}

/// Validated system base used to normalize a whole network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitConverter {
    s_base: f64,
    v_base: f64,
}

impl UnitConverter {
    /// `s_base` in VA, `v_base` in kV.
    pub fn new(s_base: f64, v_base: f64) -> BfmResult<Self> {
        check_base("S_base", s_base)?;
        check_base("V_base", v_base)?;
        Ok(Self { s_base, v_base })
    }

    pub fn s_base(&self) -> f64 {
        self.s_base
    }

    pub fn v_base(&self) -> f64 {
        self.v_base
    }

    pub fn z_base(&self) -> Ohms {
        Ohms(self.v_base * self.v_base / self.s_base)
    }

    pub fn to_watts(&self, p: PerUnit) -> Watts {
        Watts(per_unit_to_power(p.0, self.s_base))
    }

    pub fn to_vars(&self, q: PerUnit) -> Vars {
        Vars(per_unit_to_power(q.0, self.s_base))
    }
}

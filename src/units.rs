//! Rescales quantity and currency columns to canonical units.
//!
//! Canonical quantity is metric tons; canonical currency is ten-thousand
//! units (万元). The caller states which unit the sheet actually uses; an
//! absent hint means the column is already canonical.

use std::fmt;

use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    dataset::RawTable,
    fields::{FieldMapping, Role},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum QuantityUnit {
    #[serde(rename = "kg")]
    #[value(name = "kg")]
    Kilogram,
    #[serde(rename = "t")]
    #[value(name = "t", alias = "ton")]
    Ton,
}

impl QuantityUnit {
    /// Number of this unit in one ton.
    pub fn per_canonical(self) -> f64 {
        match self {
            QuantityUnit::Kilogram => 1000.0,
            QuantityUnit::Ton => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AmountUnit {
    Yuan,
    WanYuan,
}

impl AmountUnit {
    /// Number of this unit in one ten-thousand unit.
    pub fn per_canonical(self) -> f64 {
        match self {
            AmountUnit::Yuan => 10_000.0,
            AmountUnit::WanYuan => 1.0,
        }
    }
}

impl fmt::Display for QuantityUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QuantityUnit::Kilogram => "kg",
            QuantityUnit::Ton => "t",
        })
    }
}

impl fmt::Display for AmountUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AmountUnit::Yuan => "yuan",
            AmountUnit::WanYuan => "wan_yuan",
        })
    }
}

/// Units the source sheet is expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitConfirmation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<QuantityUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<AmountUnit>,
}

/// Roles rescaled together with the currency hint.
const CURRENCY_ROLES: [Role; 6] = [
    Role::Profit,
    Role::Amount,
    Role::Cost,
    Role::SeaFreight,
    Role::LandFreight,
    Role::AgencyFee,
];

/// Returns a copy of `table` with mapped quantity and currency columns in
/// canonical units. Empty and text cells are left as they are.
pub fn normalize(table: &RawTable, mapping: &FieldMapping, units: &UnitConfirmation) -> RawTable {
    let mut normalized = table.clone();
    if let Some(unit) = units.quantity {
        rescale(&mut normalized, mapping, Role::Quantity, unit.per_canonical());
    }
    if let Some(unit) = units.amount {
        for role in CURRENCY_ROLES {
            rescale(&mut normalized, mapping, role, unit.per_canonical());
        }
    }
    normalized
}

fn rescale(table: &mut RawTable, mapping: &FieldMapping, role: Role, divisor: f64) {
    if divisor == 1.0 {
        return;
    }
    if let Some(column) = mapping.column(table, role) {
        debug!("Dividing {role} column by {divisor}");
        table.map_numeric_column(column, |value| value / divisor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Cell;

    fn sample() -> (RawTable, FieldMapping) {
        let table = RawTable::from_records(
            &["产品", "数量", "毛利", "金额", "海运费"],
            &[
                vec!["A", "2000", "30000", "150000", "5000"],
                vec!["B", "", "n/a", "", ""],
            ],
        );
        let mapping = [
            (Role::Product, "产品"),
            (Role::Quantity, "数量"),
            (Role::Profit, "毛利"),
            (Role::Amount, "金额"),
            (Role::SeaFreight, "海运费"),
        ]
        .into_iter()
        .map(|(role, header)| (role, header.to_string()))
        .collect();
        (table, mapping)
    }

    #[test]
    fn kilograms_and_yuan_become_tons_and_wan_yuan() {
        let (table, mapping) = sample();
        let units = UnitConfirmation {
            quantity: Some(QuantityUnit::Kilogram),
            amount: Some(AmountUnit::Yuan),
        };
        let normalized = normalize(&table, &mapping, &units);
        assert_eq!(normalized.cell(0, 1), &Cell::Number(2.0));
        assert_eq!(normalized.cell(0, 2), &Cell::Number(3.0));
        assert_eq!(normalized.cell(0, 3), &Cell::Number(15.0));
        assert_eq!(normalized.cell(0, 4), &Cell::Number(0.5));
    }

    #[test]
    fn empty_cells_stay_empty() {
        let (table, mapping) = sample();
        let units = UnitConfirmation {
            quantity: Some(QuantityUnit::Kilogram),
            amount: Some(AmountUnit::Yuan),
        };
        let normalized = normalize(&table, &mapping, &units);
        for column in 1..5 {
            assert_eq!(normalized.cell(1, column), &Cell::Empty);
        }
    }

    #[test]
    fn canonical_or_absent_hints_are_no_ops() {
        let (table, mapping) = sample();
        let units = UnitConfirmation {
            quantity: Some(QuantityUnit::Ton),
            amount: None,
        };
        assert_eq!(normalize(&table, &mapping, &units), table);
        assert_eq!(normalize(&table, &mapping, &UnitConfirmation::default()), table);
    }
}

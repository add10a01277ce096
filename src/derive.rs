//! Per-row derived metrics.
//!
//! The same formulas are reused by the aggregator on summed totals, so an
//! aggregated entity never averages per-row ratios.

use log::debug;
use serde::Serialize;

use crate::{
    dataset::RawTable,
    fields::{FieldMapping, Role},
};

/// Profit (10k currency units) per ton, expressed in currency units per ton.
pub const UNIT_MARGIN_SCALE: f64 = 10_000.0;

/// Upper bound for cost rate (1000 %). Lower bound is zero.
pub const COST_RATE_CAP: f64 = 10.0;

/// `profit / quantity × 10 000`; zero whenever that is undefined.
pub fn unit_margin(profit: Option<f64>, quantity: Option<f64>) -> f64 {
    match (profit, quantity) {
        (Some(profit), Some(quantity)) if quantity != 0.0 => {
            let margin = profit / quantity * UNIT_MARGIN_SCALE;
            if margin.is_finite() { margin } else { 0.0 }
        }
        _ => 0.0,
    }
}

/// `total_cost / amount` clamped to `[0, COST_RATE_CAP]`; zero when the
/// amount is missing or zero.
pub fn cost_rate(total_cost: f64, amount: Option<f64>) -> f64 {
    match amount {
        Some(amount) if amount != 0.0 => {
            let rate = total_cost / amount;
            if rate.is_nan() {
                0.0
            } else {
                rate.clamp(0.0, COST_RATE_CAP)
            }
        }
        _ => 0.0,
    }
}

/// Sum of the present cost components; missing components count as zero.
pub fn total_cost<I>(components: I) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    components.into_iter().flatten().filter(|v| v.is_finite()).sum()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DerivedMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_margin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_rate: Option<f64>,
}

/// A normalized table with one [`DerivedMetrics`] per row.
#[derive(Debug, Clone)]
pub struct DerivedTable {
    table: RawTable,
    metrics: Vec<DerivedMetrics>,
}

impl DerivedTable {
    pub fn table(&self) -> &RawTable {
        &self.table
    }

    pub fn metrics(&self) -> &[DerivedMetrics] {
        &self.metrics
    }

    pub fn row_metrics(&self, row: usize) -> Option<&DerivedMetrics> {
        self.metrics.get(row)
    }
}

/// Numeric cell of `role` in `row`, or `None` when unmapped, empty or text.
pub fn role_value(table: &RawTable, mapping: &FieldMapping, row: usize, role: Role) -> Option<f64> {
    mapping
        .column(table, role)
        .and_then(|column| table.cell(row, column).as_number())
}

/// Computes derived metrics for every row whose prerequisite roles exist.
pub fn derive(table: RawTable, mapping: &FieldMapping) -> DerivedTable {
    let has_margin = mapping.contains(Role::Quantity) && mapping.contains(Role::Profit);
    let components = mapping.cost_components();
    let has_cost = !components.is_empty();
    let has_rate = has_cost && mapping.contains(Role::Amount);

    let metrics = (0..table.row_count())
        .map(|row| {
            let value = |role| role_value(&table, mapping, row, role);
            let total = has_cost.then(|| total_cost(components.iter().map(|role| value(*role))));
            DerivedMetrics {
                unit_margin: has_margin
                    .then(|| unit_margin(value(Role::Profit), value(Role::Quantity))),
                total_cost: total,
                cost_rate: total
                    .filter(|_| has_rate)
                    .map(|total| cost_rate(total, value(Role::Amount))),
            }
        })
        .collect::<Vec<_>>();
    debug!(
        "Derived metrics for {} row(s): unit margin {has_margin}, total cost {has_cost}, cost rate {has_rate}",
        metrics.len()
    );

    DerivedTable { table, metrics }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_margin_bridges_units() {
        assert_eq!(unit_margin(Some(2.0), Some(10.0)), 2000.0);
        assert_eq!(unit_margin(Some(-1.0), Some(5.0)), -2000.0);
    }

    #[test]
    fn unit_margin_is_zero_when_undefined() {
        assert_eq!(unit_margin(Some(5.0), Some(0.0)), 0.0);
        assert_eq!(unit_margin(None, Some(3.0)), 0.0);
        assert_eq!(unit_margin(Some(5.0), None), 0.0);
        assert_eq!(unit_margin(Some(f64::MAX), Some(f64::MIN_POSITIVE)), 0.0);
    }

    #[test]
    fn cost_rate_is_clamped() {
        assert_eq!(cost_rate(30.0, Some(100.0)), 0.3);
        assert_eq!(cost_rate(5.0, Some(0.0)), 0.0);
        assert_eq!(cost_rate(5.0, None), 0.0);
        assert_eq!(cost_rate(500.0, Some(0.01)), COST_RATE_CAP);
        assert_eq!(cost_rate(10.0, Some(-5.0)), 0.0);
    }

    #[test]
    fn total_cost_treats_missing_components_as_zero() {
        assert_eq!(total_cost([Some(1.5), None, Some(2.5)]), 4.0);
        assert_eq!(total_cost(Vec::<Option<f64>>::new()), 0.0);
    }

    #[test]
    fn derive_fills_metrics_only_for_mapped_roles() {
        let table = RawTable::from_records(
            &["产品", "数量", "毛利", "金额", "成本", "海运费"],
            &[
                vec!["A", "10", "2", "40", "20", "4"],
                vec!["B", "0", "1", "", "3", ""],
            ],
        );
        let mapping: FieldMapping = [
            (Role::Product, "产品"),
            (Role::Quantity, "数量"),
            (Role::Profit, "毛利"),
            (Role::Amount, "金额"),
            (Role::Cost, "成本"),
            (Role::SeaFreight, "海运费"),
        ]
        .into_iter()
        .map(|(role, header)| (role, header.to_string()))
        .collect();

        let derived = derive(table, &mapping);
        let first = derived.row_metrics(0).expect("row 0");
        assert_eq!(first.unit_margin, Some(2000.0));
        assert_eq!(first.total_cost, Some(24.0));
        assert_eq!(first.cost_rate, Some(0.6));

        let second = derived.row_metrics(1).expect("row 1");
        assert_eq!(second.unit_margin, Some(0.0));
        assert_eq!(second.total_cost, Some(3.0));
        assert_eq!(second.cost_rate, Some(0.0));
    }

    #[test]
    fn derive_without_cost_roles_leaves_cost_metrics_empty() {
        let table = RawTable::from_records(&["客户", "金额"], &[vec!["X", "10"]]);
        let mapping: FieldMapping = [(Role::Customer, "客户".to_string()), (Role::Amount, "金额".to_string())]
            .into_iter()
            .collect();
        let derived = derive(table, &mapping);
        assert_eq!(derived.metrics(), &[DerivedMetrics::default()]);
    }
}

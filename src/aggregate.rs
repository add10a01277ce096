//! Groups derived rows by the analysis dimension.
//!
//! Additive roles are summed per group; unit margin, total cost and cost
//! rate are then recomputed from those sums with the per-row formulas.

use std::{collections::BTreeMap, fmt};

use log::{debug, info};
use serde::Serialize;

use crate::{
    derive::{self, DerivedTable},
    dimension::Dimension,
    error::AnalysisError,
    fields::{FieldMapping, Role},
};

/// Any numeric attribute of an [`AggregatedEntity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Quantity,
    Profit,
    Amount,
    Cost,
    SeaFreight,
    LandFreight,
    AgencyFee,
    TotalCost,
    UnitMargin,
    CostRate,
}

impl Metric {
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Quantity => "quantity",
            Metric::Profit => "profit",
            Metric::Amount => "amount",
            Metric::Cost => "cost",
            Metric::SeaFreight => "sea_freight",
            Metric::LandFreight => "land_freight",
            Metric::AgencyFee => "agency_fee",
            Metric::TotalCost => "total_cost",
            Metric::UnitMargin => "unit_margin",
            Metric::CostRate => "cost_rate",
        }
    }

    /// Roles that must all be mapped for this metric to exist.
    pub fn required_roles(self) -> &'static [Role] {
        match self {
            Metric::Quantity => &[Role::Quantity],
            Metric::Profit => &[Role::Profit],
            Metric::Amount => &[Role::Amount],
            Metric::Cost => &[Role::Cost],
            Metric::SeaFreight => &[Role::SeaFreight],
            Metric::LandFreight => &[Role::LandFreight],
            Metric::AgencyFee => &[Role::AgencyFee],
            Metric::UnitMargin => &[Role::Profit, Role::Quantity],
            Metric::CostRate => &[Role::Amount],
            Metric::TotalCost => &[],
        }
    }

    /// Roles among `required_roles` (plus a cost component for the cost
    /// metrics) that `mapping` lacks.
    pub fn missing_roles(self, mapping: &FieldMapping) -> Vec<Role> {
        let mut missing = self
            .required_roles()
            .iter()
            .copied()
            .filter(|role| !mapping.contains(*role))
            .collect::<Vec<_>>();
        if matches!(self, Metric::TotalCost | Metric::CostRate)
            && mapping.cost_components().is_empty()
        {
            missing.push(Role::Cost);
        }
        missing
    }

    pub fn is_available(self, mapping: &FieldMapping) -> bool {
        self.missing_roles(mapping).is_empty()
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row per distinct grouping value. Sums are `None` when their role is
/// unmapped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedEntity {
    pub key: String,
    pub row_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sea_freight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub land_freight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency_fee: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_margin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_rate: Option<f64>,
}

impl AggregatedEntity {
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Quantity => self.quantity,
            Metric::Profit => self.profit,
            Metric::Amount => self.amount,
            Metric::Cost => self.cost,
            Metric::SeaFreight => self.sea_freight,
            Metric::LandFreight => self.land_freight,
            Metric::AgencyFee => self.agency_fee,
            Metric::TotalCost => self.total_cost,
            Metric::UnitMargin => self.unit_margin,
            Metric::CostRate => self.cost_rate,
        }
    }

    /// Metric value with unmapped metrics reading as zero.
    pub fn metric_or_zero(&self, metric: Metric) -> f64 {
        self.metric(metric).unwrap_or(0.0)
    }
}

const SUMMED_ROLES: [Role; 7] = [
    Role::Quantity,
    Role::Profit,
    Role::Amount,
    Role::Cost,
    Role::SeaFreight,
    Role::LandFreight,
    Role::AgencyFee,
];

#[derive(Debug, Default)]
struct GroupTotals {
    rows: usize,
    sums: BTreeMap<Role, f64>,
}

/// Groups `derived` by the dimension's grouping column. Rows with an empty
/// grouping cell are dropped; entities come back ordered by key.
pub fn aggregate(
    derived: &DerivedTable,
    mapping: &FieldMapping,
    dimension: Dimension,
) -> Result<Vec<AggregatedEntity>, AnalysisError> {
    let table = derived.table();
    let group_role = dimension.group_role();
    let group_column = mapping
        .column(table, group_role)
        .ok_or(AnalysisError::MissingGroupField(group_role))?;

    let summed = SUMMED_ROLES
        .into_iter()
        .filter_map(|role| mapping.column(table, role).map(|column| (role, column)))
        .collect::<Vec<_>>();

    let mut groups: BTreeMap<String, GroupTotals> = BTreeMap::new();
    let mut dropped = 0usize;
    for (row_idx, row) in table.rows().iter().enumerate() {
        if table.cell(row_idx, group_column).is_empty() {
            dropped += 1;
            continue;
        }
        let key = table.text(row_idx, group_column);
        let totals = groups.entry(key.to_string()).or_default();
        totals.rows += 1;
        for (role, column) in &summed {
            let value = row
                .get(*column)
                .and_then(|cell| cell.as_number())
                .unwrap_or(0.0);
            *totals.sums.entry(*role).or_insert(0.0) += value;
        }
    }
    if dropped > 0 {
        debug!("Dropped {dropped} row(s) with an empty {group_role} value");
    }

    let components = mapping.cost_components();
    let entities = groups
        .into_iter()
        .map(|(key, totals)| build_entity(key, &totals, &components, mapping))
        .collect::<Vec<_>>();
    info!(
        "Aggregated {} row(s) into {} {} group(s)",
        table.row_count() - dropped,
        entities.len(),
        dimension
    );
    Ok(entities)
}

fn build_entity(
    key: String,
    totals: &GroupTotals,
    components: &[Role],
    mapping: &FieldMapping,
) -> AggregatedEntity {
    let sum = |role: Role| totals.sums.get(&role).copied();
    let total_cost =
        (!components.is_empty()).then(|| derive::total_cost(components.iter().map(|role| sum(*role))));
    let unit_margin = (mapping.contains(Role::Quantity) && mapping.contains(Role::Profit))
        .then(|| derive::unit_margin(sum(Role::Profit), sum(Role::Quantity)));
    let cost_rate = total_cost
        .filter(|_| mapping.contains(Role::Amount))
        .map(|total| derive::cost_rate(total, sum(Role::Amount)));

    AggregatedEntity {
        key,
        row_count: totals.rows,
        quantity: sum(Role::Quantity),
        profit: sum(Role::Profit),
        amount: sum(Role::Amount),
        cost: sum(Role::Cost),
        sea_freight: sum(Role::SeaFreight),
        land_freight: sum(Role::LandFreight),
        agency_fee: sum(Role::AgencyFee),
        total_cost,
        unit_margin,
        cost_rate,
    }
}

//! Cost structure: composition by component, cost-rate distribution and the
//! cost/efficiency classification.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    aggregate::{AggregatedEntity, Metric},
    context::AnalysisContext,
    dimension::Measure,
    distribution::{self, RateDistribution},
    fields::Role,
    stats,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostComponent {
    pub name: &'static str,
    pub field: Role,
    pub value: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostComposition {
    pub composition_data: Vec<CostComponent>,
    pub total_cost: f64,
}

/// Cost-efficiency class from a mean split on cost rate and volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EfficiencyClass {
    /// Below-average cost rate, above-average volume.
    Efficient,
    /// Below-average cost rate, volume at or below average.
    LowVolume,
    /// Cost rate at or above average, above-average volume.
    HighCost,
    Inefficient,
}

pub fn classify_efficiency(
    cost_rate: f64,
    efficiency: f64,
    avg_cost_rate: f64,
    avg_efficiency: f64,
) -> EfficiencyClass {
    match (cost_rate < avg_cost_rate, efficiency > avg_efficiency) {
        (true, true) => EfficiencyClass::Efficient,
        (true, false) => EfficiencyClass::LowVolume,
        (false, true) => EfficiencyClass::HighCost,
        (false, false) => EfficiencyClass::Inefficient,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EfficiencyPoint {
    pub key: String,
    pub cost_rate: f64,
    pub efficiency_value: f64,
    pub class: EfficiencyClass,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEfficiency {
    pub efficiency_measure: Measure,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub avg_cost_rate: f64,
    pub avg_efficiency: f64,
    pub scatter_data: Vec<EfficiencyPoint>,
    pub class_counts: BTreeMap<EfficiencyClass, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostAnalysis {
    pub composition: CostComposition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_distribution: Option<RateDistribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub efficiency: Option<CostEfficiency>,
}

fn component_name(role: Role) -> &'static str {
    match role {
        Role::Cost => "Base cost",
        Role::SeaFreight => "Sea freight",
        Role::LandFreight => "Land freight",
        Role::AgencyFee => "Agency fee",
        other => other.as_str(),
    }
}

fn component_metric(role: Role) -> Option<Metric> {
    match role {
        Role::Cost => Some(Metric::Cost),
        Role::SeaFreight => Some(Metric::SeaFreight),
        Role::LandFreight => Some(Metric::LandFreight),
        Role::AgencyFee => Some(Metric::AgencyFee),
        _ => None,
    }
}

pub fn composition(entities: &[AggregatedEntity], ctx: &AnalysisContext) -> CostComposition {
    let sums = ctx
        .mapping
        .cost_components()
        .into_iter()
        .filter_map(|role| {
            let metric = component_metric(role)?;
            let value: f64 = entities.iter().map(|e| e.metric_or_zero(metric)).sum();
            Some((role, value))
        })
        .collect::<Vec<_>>();
    let total_cost: f64 = sums.iter().map(|(_, value)| value).sum();
    CostComposition {
        composition_data: sums
            .into_iter()
            .map(|(role, value)| CostComponent {
                name: component_name(role),
                field: role,
                value,
                percentage: stats::share(value, total_cost),
            })
            .collect(),
        total_cost,
    }
}

/// `None` when cost rate or the dimension's efficiency measure is missing.
pub fn efficiency(entities: &[AggregatedEntity], ctx: &AnalysisContext) -> Option<CostEfficiency> {
    let measure = ctx.dimension.efficiency_measure();
    if !Metric::CostRate.is_available(&ctx.mapping) || !ctx.mapping.contains(measure.role()) {
        return None;
    }
    let pairs = entities
        .iter()
        .filter_map(|e| {
            let rate = e.cost_rate.filter(|v| v.is_finite())?;
            let volume = e.metric(measure.metric()).filter(|v| v.is_finite())?;
            Some((e, rate, volume))
        })
        .collect::<Vec<_>>();
    let rates = pairs.iter().map(|(_, rate, _)| *rate).collect::<Vec<_>>();
    let volumes = pairs.iter().map(|(_, _, volume)| *volume).collect::<Vec<_>>();
    let avg_cost_rate = stats::mean(&rates).unwrap_or(0.0);
    let avg_efficiency = stats::mean(&volumes).unwrap_or(0.0);

    let mut class_counts = BTreeMap::new();
    let scatter_data = pairs
        .into_iter()
        .map(|(entity, rate, volume)| {
            let class = classify_efficiency(rate, volume, avg_cost_rate, avg_efficiency);
            *class_counts.entry(class).or_insert(0) += 1;
            EfficiencyPoint {
                key: entity.key.clone(),
                cost_rate: rate,
                efficiency_value: volume,
                class,
            }
        })
        .collect();

    Some(CostEfficiency {
        efficiency_measure: measure,
        x_label: "Cost rate",
        y_label: ctx.dimension.efficiency_label(),
        avg_cost_rate,
        avg_efficiency,
        scatter_data,
        class_counts,
    })
}

/// Full cost view; `None` when no cost component is mapped.
pub fn analyze(entities: &[AggregatedEntity], ctx: &AnalysisContext) -> Option<CostAnalysis> {
    if ctx.mapping.cost_components().is_empty() {
        return None;
    }
    Some(CostAnalysis {
        composition: composition(entities, ctx),
        rate_distribution: distribution::rate_distribution(entities, ctx),
        efficiency: efficiency(entities, ctx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dimension::Dimension, fields::FieldMapping};

    fn entity(key: &str, amount: f64, cost: f64, freight: f64) -> AggregatedEntity {
        let total = cost + freight;
        AggregatedEntity {
            key: key.to_string(),
            row_count: 1,
            quantity: None,
            profit: None,
            amount: Some(amount),
            cost: Some(cost),
            sea_freight: Some(freight),
            land_freight: None,
            agency_fee: None,
            total_cost: Some(total),
            unit_margin: None,
            cost_rate: Some(crate::derive::cost_rate(total, Some(amount))),
        }
    }

    fn context(roles: &[Role]) -> AnalysisContext {
        let mapping: FieldMapping = roles
            .iter()
            .map(|role| (*role, role.as_str().to_string()))
            .collect();
        AnalysisContext::with_defaults(Dimension::Customer, mapping)
    }

    #[test]
    fn composition_shares_sum_to_hundred() {
        let entities = vec![entity("a", 10.0, 6.0, 2.0), entity("b", 10.0, 9.0, 3.0)];
        let ctx = context(&[Role::Customer, Role::Amount, Role::Cost, Role::SeaFreight]);
        let result = composition(&entities, &ctx);
        assert_eq!(result.total_cost, 20.0);
        assert_eq!(result.composition_data[0].name, "Base cost");
        assert_eq!(result.composition_data[0].percentage, 75.0);
        assert_eq!(result.composition_data[1].field, Role::SeaFreight);
        assert_eq!(result.composition_data[1].percentage, 25.0);
    }

    #[test]
    fn efficiency_classes_follow_mean_split() {
        assert_eq!(classify_efficiency(0.1, 10.0, 0.5, 5.0), EfficiencyClass::Efficient);
        assert_eq!(classify_efficiency(0.1, 5.0, 0.5, 5.0), EfficiencyClass::LowVolume);
        assert_eq!(classify_efficiency(0.5, 10.0, 0.5, 5.0), EfficiencyClass::HighCost);
        assert_eq!(classify_efficiency(0.9, 1.0, 0.5, 5.0), EfficiencyClass::Inefficient);
    }

    #[test]
    fn efficiency_counts_every_point() {
        let entities = vec![
            entity("a", 100.0, 10.0, 0.0),
            entity("b", 10.0, 9.0, 0.0),
            entity("c", 50.0, 40.0, 0.0),
        ];
        let ctx = context(&[Role::Customer, Role::Amount, Role::Cost]);
        let result = efficiency(&entities, &ctx).expect("efficiency");
        let counted: usize = result.class_counts.values().sum();
        assert_eq!(counted, 3);
        assert_eq!(result.scatter_data[0].class, EfficiencyClass::Efficient);
        assert_eq!(result.y_label, "Purchase amount (10k yuan)");
    }

    #[test]
    fn cost_view_requires_a_cost_component() {
        let ctx = context(&[Role::Customer, Role::Amount]);
        assert!(analyze(&[], &ctx).is_none());
        let ctx = context(&[Role::Customer, Role::LandFreight]);
        let result = analyze(&[], &ctx).expect("cost view");
        assert!(result.rate_distribution.is_none());
        assert!(result.efficiency.is_none());
    }
}

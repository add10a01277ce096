use log::debug;
use serde::Serialize;

use crate::{
    aggregate::{AggregatedEntity, Metric},
    context::AnalysisContext,
    dimension::ProfitCriterion,
    fields::Role,
    stats::round_to,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitLossSummary {
    pub criterion: ProfitCriterion,
    pub total_count: usize,
    pub profitable_count: usize,
    pub loss_count: usize,
    pub profitable_percentage: f64,
    pub loss_percentage: f64,
    /// Profit of the profitable set.
    pub total_profit: f64,
    /// Absolute profit of the non-profitable set.
    pub total_loss: f64,
    pub net_profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitLossItem {
    pub key: String,
    pub profit: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_margin: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitLossAnalysis {
    pub summary: ProfitLossSummary,
    pub profitable_items: Vec<ProfitLossItem>,
    pub loss_making_items: Vec<ProfitLossItem>,
}

/// Splitting criterion for `ctx`: the dimension's preference when it can be
/// computed, total profit otherwise.
pub fn criterion(ctx: &AnalysisContext) -> ProfitCriterion {
    match ctx.dimension.profit_criterion() {
        ProfitCriterion::UnitMargin if Metric::UnitMargin.is_available(&ctx.mapping) => {
            ProfitCriterion::UnitMargin
        }
        _ => ProfitCriterion::Profit,
    }
}

/// Partitions entities into profitable (criterion > 0) and the rest.
/// `None` when profit is unmapped.
pub fn analyze(entities: &[AggregatedEntity], ctx: &AnalysisContext) -> Option<ProfitLossAnalysis> {
    if !ctx.mapping.contains(Role::Profit) {
        return None;
    }
    let criterion = criterion(ctx);
    let deciding = match criterion {
        ProfitCriterion::UnitMargin => Metric::UnitMargin,
        ProfitCriterion::Profit => Metric::Profit,
    };

    let (profitable, loss_making): (Vec<&AggregatedEntity>, Vec<&AggregatedEntity>) = entities
        .iter()
        .partition(|entity| entity.metric_or_zero(deciding) > 0.0);

    let profit_of = |group: &[&AggregatedEntity]| -> f64 {
        group.iter().map(|e| e.metric_or_zero(Metric::Profit)).sum()
    };
    let total_profit = profit_of(&profitable);
    let total_loss = profit_of(&loss_making).abs();
    let total_count = entities.len();
    let pct = |count: usize| {
        if total_count > 0 {
            round_to(count as f64 * 100.0 / total_count as f64, 2)
        } else {
            0.0
        }
    };
    debug!(
        "Profit/loss by {criterion:?}: {} profitable, {} not",
        profitable.len(),
        loss_making.len()
    );

    let to_items = |group: &[&AggregatedEntity]| {
        group
            .iter()
            .map(|e| ProfitLossItem {
                key: e.key.clone(),
                profit: e.metric_or_zero(Metric::Profit),
                unit_margin: e.unit_margin,
            })
            .collect::<Vec<_>>()
    };

    Some(ProfitLossAnalysis {
        summary: ProfitLossSummary {
            criterion,
            total_count,
            profitable_count: profitable.len(),
            loss_count: loss_making.len(),
            profitable_percentage: pct(profitable.len()),
            loss_percentage: pct(loss_making.len()),
            total_profit,
            total_loss,
            net_profit: total_profit - total_loss,
        },
        profitable_items: to_items(&profitable),
        loss_making_items: to_items(&loss_making),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dimension::Dimension, fields::FieldMapping};

    fn entity(key: &str, quantity: Option<f64>, profit: f64) -> AggregatedEntity {
        AggregatedEntity {
            key: key.to_string(),
            row_count: 1,
            quantity,
            profit: Some(profit),
            amount: None,
            cost: None,
            sea_freight: None,
            land_freight: None,
            agency_fee: None,
            total_cost: None,
            unit_margin: quantity.map(|q| crate::derive::unit_margin(Some(profit), Some(q))),
            cost_rate: None,
        }
    }

    fn context(dimension: Dimension, roles: &[Role]) -> AnalysisContext {
        let mapping: FieldMapping = roles
            .iter()
            .map(|role| (*role, role.as_str().to_string()))
            .collect();
        AnalysisContext::with_defaults(dimension, mapping)
    }

    #[test]
    fn product_split_uses_unit_margin_but_totals_use_profit() {
        let entities = vec![
            entity("a", Some(10.0), 2.0),
            // Positive profit but zero quantity gives a zero margin.
            entity("b", Some(0.0), 1.0),
            entity("c", Some(5.0), -1.5),
        ];
        let ctx = context(Dimension::Product, &[Role::Product, Role::Quantity, Role::Profit]);
        let result = analyze(&entities, &ctx).expect("profit/loss");
        assert_eq!(result.summary.criterion, ProfitCriterion::UnitMargin);
        assert_eq!(result.summary.profitable_count, 1);
        assert_eq!(result.summary.loss_count, 2);
        assert_eq!(result.summary.total_profit, 2.0);
        assert_eq!(result.summary.total_loss, 0.5);
        assert_eq!(result.summary.net_profit, 1.5);
        assert_eq!(result.summary.profitable_percentage, 33.33);
    }

    #[test]
    fn product_without_quantity_falls_back_to_profit() {
        let entities = vec![entity("a", None, 2.0), entity("b", None, 0.0)];
        let ctx = context(Dimension::Product, &[Role::Product, Role::Profit]);
        let result = analyze(&entities, &ctx).expect("profit/loss");
        assert_eq!(result.summary.criterion, ProfitCriterion::Profit);
        assert_eq!(result.loss_making_items[0].key, "b");
    }

    #[test]
    fn customers_split_on_profit() {
        let entities = vec![entity("x", None, -4.0), entity("y", None, 6.0)];
        let ctx = context(Dimension::Customer, &[Role::Customer, Role::Profit]);
        let result = analyze(&entities, &ctx).expect("profit/loss");
        assert_eq!(result.summary.total_loss, 4.0);
        assert_eq!(result.summary.net_profit, 2.0);
        assert_eq!(result.profitable_items[0].key, "y");
    }

    #[test]
    fn unmapped_profit_skips_the_view() {
        let ctx = context(Dimension::Customer, &[Role::Customer, Role::Amount]);
        assert!(analyze(&[], &ctx).is_none());
    }
}

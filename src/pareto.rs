//! Cumulative-contribution ranking (80/20 analysis).
//!
//! Entities are ranked by one [`Measure`] in descending order. The core set
//! is the prefix up to the last entity whose cumulative share (rounded to two
//! decimals) is still within the threshold, or just the first entity when
//! none is. Negative values rank normally but add nothing to the cumulative
//! share, which keeps the share sequence non-decreasing and ending at 100.

use log::{debug, warn};
use serde::Serialize;

use crate::{
    aggregate::AggregatedEntity,
    context::AnalysisContext,
    dimension::{Measure, MeasureInfo},
    fields::FieldMapping,
    stats::round_to,
};

/// Cumulative share above which an entity falls out of class B.
pub const CLASS_B_LIMIT: f64 = 95.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AbcClass {
    A,
    B,
    C,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoEntry {
    pub rank: usize,
    pub key: String,
    pub value: f64,
    pub cumulative_value: f64,
    pub cumulative_percentage: f64,
    pub class: AbcClass,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoAnalysis {
    pub dimension: Measure,
    pub dimension_info: MeasureInfo,
    pub available_dimensions: Vec<Measure>,
    pub threshold: f64,
    pub total_value: f64,
    pub total_items: usize,
    pub pareto_data: Vec<ParetoEntry>,
    pub core_items: Vec<ParetoEntry>,
    pub core_items_count: usize,
    pub core_items_percentage: f64,
}

/// Measures offered for switching, falling back to any mapped value role
/// when none of the dimension's candidates is mapped.
pub fn available_measures(ctx: &AnalysisContext) -> Vec<Measure> {
    let available = ctx.dimension.available_pareto_measures(&ctx.mapping);
    if !available.is_empty() {
        return available;
    }
    mapped_fallbacks(&ctx.mapping)
}

fn mapped_fallbacks(mapping: &FieldMapping) -> Vec<Measure> {
    [Measure::Profit, Measure::Amount, Measure::Quantity]
        .into_iter()
        .filter(|measure| mapping.contains(measure.role()))
        .collect()
}

/// Requested measure when usable, else the dimension default, else the
/// first available one.
pub fn resolve_measure(ctx: &AnalysisContext) -> Option<Measure> {
    let available = available_measures(ctx);
    let default = ctx.dimension.default_pareto_measure();
    let requested = ctx.pareto_measure.unwrap_or(default);
    if available.contains(&requested) {
        return Some(requested);
    }
    if let Some(measure) = ctx.pareto_measure {
        warn!("Pareto measure '{measure}' is not available; falling back");
    }
    if available.contains(&default) {
        Some(default)
    } else {
        available.first().copied()
    }
}

/// Index of the last entry inside the core set.
fn core_end(percentages: &[f64], threshold: f64) -> Option<usize> {
    if percentages.is_empty() {
        return None;
    }
    Some(
        percentages
            .iter()
            .rposition(|pct| *pct <= threshold)
            .unwrap_or(0),
    )
}

/// Ranks `entities` by `measure`.
pub fn rank(entities: &[AggregatedEntity], measure: Measure, threshold: f64) -> Vec<ParetoEntry> {
    let metric = measure.metric();
    let mut ranked = entities
        .iter()
        .map(|e| (e.key.clone(), e.metric_or_zero(metric)))
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut running = 0.0;
    let cumulative = ranked
        .iter()
        .map(|(_, value)| {
            running += value.max(0.0);
            running
        })
        .collect::<Vec<_>>();
    let total = running;
    let percentages = cumulative
        .iter()
        .map(|cum| {
            if total > 0.0 && total.is_finite() {
                round_to(cum * 100.0 / total, 2)
            } else {
                100.0
            }
        })
        .collect::<Vec<_>>();
    let core = core_end(&percentages, threshold);

    ranked
        .into_iter()
        .zip(cumulative)
        .zip(percentages)
        .enumerate()
        .map(|(idx, (((key, value), cumulative_value), cumulative_percentage))| {
            let class = if core.is_some_and(|end| idx <= end) {
                AbcClass::A
            } else if cumulative_percentage <= CLASS_B_LIMIT {
                AbcClass::B
            } else {
                AbcClass::C
            };
            ParetoEntry {
                rank: idx + 1,
                key,
                value,
                cumulative_value,
                cumulative_percentage,
                class,
            }
        })
        .collect()
}

pub fn analyze(entities: &[AggregatedEntity], ctx: &AnalysisContext) -> Option<ParetoAnalysis> {
    let measure = resolve_measure(ctx)?;
    let pareto_data = rank(entities, measure, ctx.pareto_threshold);
    let core_items = pareto_data
        .iter()
        .filter(|entry| entry.class == AbcClass::A)
        .cloned()
        .collect::<Vec<_>>();
    let total_items = pareto_data.len();
    let core_items_count = core_items.len();
    debug!(
        "Pareto by {measure}: {core_items_count} of {total_items} item(s) in the core set"
    );
    Some(ParetoAnalysis {
        dimension: measure,
        dimension_info: ctx.dimension.measure_info(measure),
        available_dimensions: available_measures(ctx),
        threshold: ctx.pareto_threshold,
        total_value: pareto_data.iter().map(|entry| entry.value).sum(),
        total_items,
        core_items_percentage: if total_items > 0 {
            round_to(core_items_count as f64 * 100.0 / total_items as f64, 2)
        } else {
            0.0
        },
        core_items,
        core_items_count,
        pareto_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dimension::Dimension, fields::Role};

    fn customer(key: &str, amount: f64) -> AggregatedEntity {
        AggregatedEntity {
            key: key.to_string(),
            row_count: 1,
            quantity: None,
            profit: None,
            amount: Some(amount),
            cost: None,
            sea_freight: None,
            land_freight: None,
            agency_fee: None,
            total_cost: None,
            unit_margin: None,
            cost_rate: None,
        }
    }

    fn context(roles: &[Role], dimension: Dimension, requested: Option<Measure>) -> AnalysisContext {
        let mapping = roles
            .iter()
            .map(|role| (*role, role.as_str().to_string()))
            .collect();
        let mut ctx = AnalysisContext::with_defaults(dimension, mapping);
        ctx.pareto_measure = requested;
        ctx
    }

    #[test]
    fn exact_threshold_hit_is_inside_core() {
        let entities = ["c1", "c2", "c3", "c4", "c5"]
            .iter()
            .zip([20.0, 100.0, 60.0, 40.0, 80.0])
            .map(|(key, amount)| customer(key, amount))
            .collect::<Vec<_>>();
        let ctx = context(&[Role::Customer, Role::Amount], Dimension::Customer, None);
        let result = analyze(&entities, &ctx).expect("pareto");

        let keys = result
            .pareto_data
            .iter()
            .map(|e| e.key.as_str())
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["c2", "c5", "c3", "c4", "c1"]);
        let pcts = result
            .pareto_data
            .iter()
            .map(|e| e.cumulative_percentage)
            .collect::<Vec<_>>();
        assert_eq!(pcts, vec![33.33, 60.0, 80.0, 93.33, 100.0]);
        assert_eq!(result.core_items_count, 3);
        assert_eq!(result.core_items_percentage, 60.0);
        assert_eq!(result.pareto_data[3].class, AbcClass::B);
        assert_eq!(result.pareto_data[4].class, AbcClass::C);
        assert_eq!(result.total_value, 300.0);
    }

    #[test]
    fn dominant_first_item_is_the_whole_core() {
        let entities = vec![customer("big", 95.0), customer("small", 5.0)];
        let ctx = context(&[Role::Customer, Role::Amount], Dimension::Customer, None);
        let result = analyze(&entities, &ctx).expect("pareto");
        assert_eq!(result.core_items_count, 1);
        assert_eq!(result.core_items[0].key, "big");
    }

    #[test]
    fn zero_total_reads_as_complete() {
        let entities = vec![customer("a", 0.0), customer("b", 0.0)];
        let entries = rank(&entities, Measure::Amount, 80.0);
        assert!(entries.iter().all(|e| e.cumulative_percentage == 100.0));
        assert_eq!(entries[0].class, AbcClass::A);
        assert_eq!(entries[1].class, AbcClass::C);
    }

    #[test]
    fn negative_values_do_not_reduce_cumulative_share() {
        let entities = vec![customer("gain", 10.0), customer("loss", -5.0)];
        let entries = rank(&entities, Measure::Amount, 80.0);
        assert_eq!(entries[0].cumulative_percentage, 100.0);
        assert_eq!(entries[1].cumulative_percentage, 100.0);
        assert_eq!(entries[1].value, -5.0);
    }

    #[test]
    fn measure_resolution_falls_back() {
        let ctx = context(
            &[Role::Product, Role::Quantity],
            Dimension::Product,
            Some(Measure::Amount),
        );
        assert_eq!(resolve_measure(&ctx), Some(Measure::Quantity));

        let ctx = context(&[Role::Product, Role::Amount], Dimension::Product, None);
        assert_eq!(resolve_measure(&ctx), Some(Measure::Amount));
        assert_eq!(available_measures(&ctx), vec![Measure::Amount]);

        let ctx = context(
            &[Role::Region, Role::Amount, Role::Profit],
            Dimension::Region,
            Some(Measure::Profit),
        );
        assert_eq!(resolve_measure(&ctx), Some(Measure::Profit));

        let ctx = context(&[Role::Region], Dimension::Region, None);
        assert_eq!(resolve_measure(&ctx), None);
    }

    #[test]
    fn empty_input_has_no_core() {
        let ctx = context(&[Role::Customer, Role::Amount], Dimension::Customer, None);
        let result = analyze(&[], &ctx).expect("pareto");
        assert_eq!(result.core_items_count, 0);
        assert_eq!(result.core_items_percentage, 0.0);
    }
}

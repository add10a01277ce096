use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    aggregate::AggregatedEntity,
    context::AnalysisContext,
    dimension::Measure,
    stats::{round_to, share},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contributor {
    pub key: String,
    pub value: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureContribution {
    pub total_value: f64,
    pub top_contributors: Vec<Contributor>,
}

/// Top contributors for every mapped measure of the dimension. Ties keep
/// entity (key) order.
pub fn analyze(
    entities: &[AggregatedEntity],
    ctx: &AnalysisContext,
) -> BTreeMap<Measure, MeasureContribution> {
    ctx.dimension
        .contribution_measures()
        .into_iter()
        .filter(|measure| ctx.mapping.contains(measure.role()))
        .map(|measure| {
            let metric = measure.metric();
            let total_value: f64 = entities.iter().map(|e| e.metric_or_zero(metric)).sum();
            let mut ranked = entities
                .iter()
                .map(|e| (e, e.metric_or_zero(metric)))
                .collect::<Vec<_>>();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
            let top_contributors = ranked
                .into_iter()
                .take(ctx.top_contributors)
                .map(|(entity, value)| Contributor {
                    key: entity.key.clone(),
                    value,
                    contribution: round_to(share(value, total_value), 2),
                })
                .collect();
            (
                measure,
                MeasureContribution {
                    total_value,
                    top_contributors,
                },
            )
        })
        .collect()
}

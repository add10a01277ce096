//! Interval distributions over aggregated entities.
//!
//! Two schemes are provided:
//!
//! - **Fixed**: hand-authored bands per [`Dimension`] over one measure, with
//!   a parallel tally of a secondary value measure.
//! - **Dynamic**: competing interval strategies built from the observed
//!   distribution of a ratio (cost rate). Each candidate is checked with
//!   [`validate`]; the chain falls back to a midpoint split and finally to a
//!   hard-coded `[0, 0.5, 1.0]` split, so a result is always produced.
//!
//! Intervals are half-open `[lower, upper)`. In the dynamic scheme the last
//! interval is closed so the observed maximum is counted.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::Serialize;

use crate::{
    aggregate::{AggregatedEntity, Metric},
    context::AnalysisContext,
    data::format_number,
    dimension::{Dimension, Measure},
    stats::{self, SummaryStats, round_to},
};

const EQUAL_WIDTH_BANDS: usize = 5;
const QUARTILE_PADDING: f64 = 0.01;
const STANDARD_EDGES: [f64; 6] = [0.0, 0.3, 0.5, 0.7, 0.8, 1.0];
const EXTENDED_EDGES: [f64; 6] = [0.0, 0.5, 0.8, 1.0, 1.5, 2.0];
const LAST_RESORT_EDGES: [f64; 3] = [0.0, 0.5, 1.0];

/// Values a dynamic distribution is tallied against, besides the count.
pub const RATE_VALUE_FIELDS: [Metric; 3] = [Metric::Amount, Metric::Profit, Metric::TotalCost];

/// Boundaries are usable when there are at least three, all finite and
/// strictly increasing.
pub fn validate(edges: &[f64]) -> bool {
    edges.len() >= 3
        && edges.iter().all(|edge| edge.is_finite())
        && edges.windows(2).all(|pair| pair[0] < pair[1])
}

/// Index of the interval holding `value`, if any.
fn locate(edges: &[f64], value: f64, close_last: bool) -> Option<usize> {
    let bands = edges.len().checked_sub(1)?;
    if !value.is_finite() {
        return None;
    }
    (0..bands).find(|idx| {
        let (lower, upper) = (edges[*idx], edges[*idx + 1]);
        value >= lower && (value < upper || (close_last && *idx == bands - 1 && value == upper))
    })
}

fn finite_upper(edge: f64) -> Option<f64> {
    edge.is_finite().then_some(edge)
}

fn percentage(part: f64, total: f64) -> f64 {
    round_to(stats::share(part, total), 2)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalDetail {
    pub label: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueTally {
    pub sum: f64,
    /// Average value per item in the interval.
    pub mean: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixedInterval {
    pub label: &'static str,
    pub lower: f64,
    /// `None` for an open-ended top band.
    pub upper: Option<f64>,
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ValueTally>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSummary {
    pub total_items: usize,
    pub total_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_interval: Option<&'static str>,
    pub dominant_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixedDistribution {
    pub title: &'static str,
    pub unit: &'static str,
    pub field: Measure,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_field: Option<Measure>,
    pub interval_data: Vec<FixedInterval>,
    pub interval_details: Vec<IntervalDetail>,
    /// Entities outside every band (e.g. negative amounts).
    pub excluded_count: usize,
    pub analysis_summary: DistributionSummary,
}

/// Fixed bands for `dimension`; `None` when its primary measure is unmapped.
pub fn fixed_distribution(
    entities: &[AggregatedEntity],
    ctx: &AnalysisContext,
) -> Option<FixedDistribution> {
    let dimension: Dimension = ctx.dimension;
    let bins = dimension.fixed_bins();
    if !ctx.mapping.contains(bins.field.role()) {
        return None;
    }
    let value_field = (bins.value_field != bins.field
        && ctx.mapping.contains(bins.value_field.role()))
    .then_some(bins.value_field);

    let bands = bins.labels.len();
    let mut members: Vec<Vec<&AggregatedEntity>> = vec![Vec::new(); bands];
    let mut excluded_count = 0;
    for entity in entities {
        let value = entity.metric_or_zero(bins.field.metric());
        match locate(bins.edges, value, false) {
            Some(idx) => members[idx].push(entity),
            None => excluded_count += 1,
        }
    }
    if excluded_count > 0 {
        debug!("{excluded_count} entity(ies) fall outside the {} bands", bins.field);
    }

    let considered: usize = members.iter().map(Vec::len).sum();
    let total_value: f64 = members
        .iter()
        .flatten()
        .map(|e| e.metric_or_zero(bins.field.metric()))
        .sum();
    let value_total = value_field.map(|measure| {
        members
            .iter()
            .flatten()
            .map(|e| e.metric_or_zero(measure.metric()))
            .sum::<f64>()
    });

    let interval_data = members
        .iter()
        .enumerate()
        .map(|(idx, group)| {
            let count = group.len();
            let sum: f64 = group.iter().map(|e| e.metric_or_zero(bins.field.metric())).sum();
            let value = value_field.zip(value_total).map(|(measure, grand)| {
                let sum: f64 = group.iter().map(|e| e.metric_or_zero(measure.metric())).sum();
                ValueTally {
                    sum,
                    mean: if count > 0 { sum / count as f64 } else { 0.0 },
                    percentage: percentage(sum, grand),
                }
            });
            FixedInterval {
                label: bins.labels[idx],
                lower: bins.edges[idx],
                upper: finite_upper(bins.edges[idx + 1]),
                count,
                sum,
                mean: if count > 0 { sum / count as f64 } else { 0.0 },
                percentage: percentage(count as f64, considered as f64),
                value,
            }
        })
        .collect::<Vec<_>>();

    let interval_details = members
        .iter()
        .zip(bins.labels)
        .map(|(group, label)| IntervalDetail {
            label: label.to_string(),
            items: group.iter().map(|e| e.key.clone()).collect(),
        })
        .collect();

    let dominant = interval_data
        .iter()
        .filter(|interval| interval.count > 0)
        .fold(None::<&FixedInterval>, |best, interval| match best {
            Some(current) if current.count >= interval.count => Some(current),
            _ => Some(interval),
        });

    Some(FixedDistribution {
        title: bins.title,
        unit: bins.unit,
        field: bins.field,
        value_field,
        analysis_summary: DistributionSummary {
            total_items: considered,
            total_value,
            value_total,
            dominant_interval: dominant.map(|interval| interval.label),
            dominant_count: dominant.map(|interval| interval.count).unwrap_or(0),
        },
        interval_data,
        interval_details,
        excluded_count,
    })
}

/// How a set of dynamic interval boundaries was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinStrategy {
    Quartile,
    EqualWidth,
    Standard,
    Extended,
    Midpoint,
    Fixed,
}

impl BinStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            BinStrategy::Quartile => "quartile",
            BinStrategy::EqualWidth => "equal_width",
            BinStrategy::Standard => "standard",
            BinStrategy::Extended => "extended",
            BinStrategy::Midpoint => "midpoint",
            BinStrategy::Fixed => "fixed",
        }
    }
}

/// Candidate boundaries from one strategy, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub strategy: BinStrategy,
    pub edges: Vec<f64>,
}

fn quartile_edges(values: &SummaryStats) -> Option<Vec<f64>> {
    let (min, max) = (values.min?, values.max?);
    let pad = (max - min) * QUARTILE_PADDING;
    Some(vec![
        min - pad,
        values.quantile(0.25)?,
        values.quantile(0.5)?,
        values.quantile(0.75)?,
        max + pad,
    ])
}

fn equal_width_edges(values: &SummaryStats) -> Option<Vec<f64>> {
    let (min, max) = (values.min?, values.max?);
    let width = (max - min) / EQUAL_WIDTH_BANDS as f64;
    let mut edges = (0..EQUAL_WIDTH_BANDS)
        .map(|idx| min + width * idx as f64)
        .collect::<Vec<_>>();
    edges.push(max);
    Some(edges)
}

fn standard_edges(values: &SummaryStats) -> Option<Vec<f64>> {
    let (min, max) = (values.min?, values.max?);
    (min >= 0.0 && max <= 1.0).then(|| STANDARD_EDGES.to_vec())
}

fn extended_edges(values: &SummaryStats) -> Option<Vec<f64>> {
    let (min, max) = (values.min?, values.max?);
    if min < 0.0 || max <= 1.0 {
        return None;
    }
    let mut edges = EXTENDED_EDGES.to_vec();
    if max > 2.0 {
        edges.push(max);
    }
    Some(edges)
}

/// Two bands split at the midpoint of the observed range. A single distinct
/// value is padded on both sides.
fn midpoint_edges(values: &SummaryStats) -> Option<Vec<f64>> {
    let (min, max) = (values.min?, values.max?);
    let (low, high) = if max > min {
        (min, max)
    } else {
        let delta = (min.abs() * 0.1).max(0.01);
        (min - delta, max + delta)
    };
    Some(vec![low, (low + high) / 2.0, high])
}

/// Ordered candidate strategies for `values`. Only produced when there are at
/// least two distinct values.
pub fn candidates(values: &SummaryStats) -> Vec<Candidate> {
    if values.distinct_count() < 2 {
        return Vec::new();
    }
    let generators: [(BinStrategy, fn(&SummaryStats) -> Option<Vec<f64>>); 4] = [
        (BinStrategy::Quartile, quartile_edges),
        (BinStrategy::EqualWidth, equal_width_edges),
        (BinStrategy::Standard, standard_edges),
        (BinStrategy::Extended, extended_edges),
    ];
    generators
        .into_iter()
        .filter_map(|(strategy, generate)| {
            generate(values).map(|edges| Candidate { strategy, edges })
        })
        .collect()
}

/// Outcome of the strategy chain: accepted candidates, the recommended one
/// and the fallback used when no regular strategy validated.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategySelection {
    pub accepted: Vec<Candidate>,
    pub recommended: BinStrategy,
    pub fallback: Option<BinStrategy>,
}

pub fn select_strategies(values: &SummaryStats) -> StrategySelection {
    let accepted = candidates(values)
        .into_iter()
        .filter(|candidate| {
            let valid = validate(&candidate.edges);
            if !valid {
                debug!("Rejected {} intervals {:?}", candidate.strategy.as_str(), candidate.edges);
            }
            valid
        })
        .collect::<Vec<_>>();

    if let Some(first) = accepted.first() {
        let recommended = if accepted.iter().any(|c| c.strategy == BinStrategy::Quartile) {
            BinStrategy::Quartile
        } else {
            first.strategy
        };
        return StrategySelection {
            accepted,
            recommended,
            fallback: None,
        };
    }

    let fallback = midpoint_edges(values)
        .filter(|edges| validate(edges))
        .map(|edges| Candidate {
            strategy: BinStrategy::Midpoint,
            edges,
        })
        .unwrap_or_else(|| Candidate {
            strategy: BinStrategy::Fixed,
            edges: LAST_RESORT_EDGES.to_vec(),
        });
    warn!(
        "No interval strategy fits the observed rates; using {} split",
        fallback.strategy.as_str()
    );
    StrategySelection {
        recommended: fallback.strategy,
        fallback: Some(fallback.strategy),
        accepted: vec![fallback],
    }
}

fn rate_label(lower: f64, upper: f64) -> String {
    let pct = |value: f64| format_number(round_to(value * 100.0, 1));
    format!("{}%-{}%", pct(lower), pct(upper))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateInterval {
    pub label: String,
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueInterval {
    pub label: String,
    pub sum: f64,
    pub percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positive_sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_sum: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyDistribution {
    pub strategy: BinStrategy,
    pub recommended: bool,
    pub edges: Vec<f64>,
    pub distribution_data: Vec<RateInterval>,
    pub value_distributions: BTreeMap<Metric, Vec<ValueInterval>>,
    pub interval_details: Vec<IntervalDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateDistribution {
    pub total_items: usize,
    pub avg_rate: f64,
    pub median_rate: f64,
    pub recommended: BinStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<BinStrategy>,
    pub value_fields: Vec<Metric>,
    pub strategies: Vec<StrategyDistribution>,
}

fn tally_strategy(
    candidate: &Candidate,
    recommended: BinStrategy,
    points: &[(&AggregatedEntity, f64)],
    value_fields: &[Metric],
) -> StrategyDistribution {
    let edges = &candidate.edges;
    let bands = edges.len().saturating_sub(1);
    let mut members: Vec<Vec<&AggregatedEntity>> = vec![Vec::new(); bands];
    for (entity, rate) in points {
        if let Some(idx) = locate(edges, *rate, true) {
            members[idx].push(*entity);
        }
    }
    let considered: usize = members.iter().map(Vec::len).sum();
    let labels = edges
        .windows(2)
        .map(|pair| rate_label(pair[0], pair[1]))
        .collect::<Vec<_>>();

    let distribution_data = members
        .iter()
        .enumerate()
        .map(|(idx, group)| RateInterval {
            label: labels[idx].clone(),
            lower: edges[idx],
            upper: edges[idx + 1],
            count: group.len(),
            percentage: percentage(group.len() as f64, considered as f64),
        })
        .collect();

    let value_distributions = value_fields
        .iter()
        .map(|metric| {
            let grand: f64 = members
                .iter()
                .flatten()
                .map(|e| e.metric_or_zero(*metric))
                .sum();
            let intervals = members
                .iter()
                .zip(&labels)
                .map(|(group, label)| {
                    let values = group.iter().map(|e| e.metric_or_zero(*metric));
                    let sum: f64 = values.clone().sum();
                    let (positive_sum, negative_sum) = if *metric == Metric::Profit {
                        (
                            Some(values.clone().filter(|v| *v > 0.0).sum()),
                            Some(values.filter(|v| *v < 0.0).sum()),
                        )
                    } else {
                        (None, None)
                    };
                    ValueInterval {
                        label: label.clone(),
                        sum,
                        percentage: percentage(sum, grand),
                        positive_sum,
                        negative_sum,
                    }
                })
                .collect();
            (*metric, intervals)
        })
        .collect();

    let interval_details = members
        .iter()
        .zip(&labels)
        .map(|(group, label)| IntervalDetail {
            label: label.clone(),
            items: group.iter().map(|e| e.key.clone()).collect(),
        })
        .collect();

    StrategyDistribution {
        strategy: candidate.strategy,
        recommended: candidate.strategy == recommended,
        edges: edges.clone(),
        distribution_data,
        value_distributions,
        interval_details,
    }
}

/// Dynamic distribution of cost rate; `None` when cost rate is unavailable.
pub fn rate_distribution(
    entities: &[AggregatedEntity],
    ctx: &AnalysisContext,
) -> Option<RateDistribution> {
    if !Metric::CostRate.is_available(&ctx.mapping) {
        return None;
    }
    let points = entities
        .iter()
        .filter_map(|e| {
            e.cost_rate
                .filter(|rate| rate.is_finite())
                .map(|rate| (e, rate))
        })
        .collect::<Vec<_>>();
    let rates = SummaryStats::from_values(points.iter().map(|(_, rate)| *rate));
    let selection = select_strategies(&rates);
    let value_fields = RATE_VALUE_FIELDS
        .into_iter()
        .filter(|metric| metric.is_available(&ctx.mapping))
        .collect::<Vec<_>>();
    debug!(
        "Cost-rate intervals: {} strateg(ies), recommended {}",
        selection.accepted.len(),
        selection.recommended.as_str()
    );

    let strategies = selection
        .accepted
        .iter()
        .map(|candidate| tally_strategy(candidate, selection.recommended, &points, &value_fields))
        .collect();

    Some(RateDistribution {
        total_items: points.len(),
        avg_rate: rates.mean().unwrap_or(0.0),
        median_rate: rates.median().unwrap_or(0.0),
        recommended: selection.recommended,
        fallback: selection.fallback,
        value_fields,
        strategies,
    })
}

//! Mean-split 2x2 classification of aggregated entities.
//!
//! Quadrants are numbered counter-clockwise from the upper right: 1 is high
//! X and high Y, 2 low X and high Y, 3 low X and low Y, 4 high X and low Y.
//! A value equal to its split counts as high.

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use crate::{
    aggregate::{AggregatedEntity, Metric},
    context::AnalysisContext,
    derive::UNIT_MARGIN_SCALE,
    dimension::Dimension,
    fields::Role,
    stats,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub key: String,
    pub x: f64,
    pub y: f64,
    pub quadrant: u8,
    pub quadrant_name: &'static str,
    pub strategy: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuadrantStats {
    pub name: &'static str,
    pub description: &'static str,
    pub strategy: &'static str,
    pub count: usize,
    pub count_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_percentage: Option<f64>,
    /// Aggregate unit margin of the quadrant (product analysis only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_margin: Option<f64>,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuadrantAnalysis {
    pub x_metric: Metric,
    pub y_metric: Metric,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub x_avg: f64,
    pub y_avg: f64,
    pub scatter_data: Vec<ScatterPoint>,
    pub quadrant_stats: BTreeMap<u8, QuadrantStats>,
}

/// Quadrant id for a point given both split values.
pub fn classify(x: f64, y: f64, x_split: f64, y_split: f64) -> u8 {
    match (x >= x_split, y >= y_split) {
        (true, true) => 1,
        (false, true) => 2,
        (false, false) => 3,
        (true, false) => 4,
    }
}

/// Roles the quadrant axes need for `dimension`.
pub fn missing_roles(ctx: &AnalysisContext) -> Vec<Role> {
    let axes = ctx.dimension.axes();
    let mut missing = axes.x.missing_roles(&ctx.mapping);
    for role in axes.y.missing_roles(&ctx.mapping) {
        if !missing.contains(&role) {
            missing.push(role);
        }
    }
    missing
}

/// Split value of the Y axis. Product unit margin uses the volume-weighted
/// margin of the whole set, falling back to the plain mean of the margins when
/// the summed quantity is zero or negative.
fn y_split(entities: &[AggregatedEntity], dimension: Dimension, y: Metric, ys: &[f64]) -> f64 {
    let plain_mean = stats::mean(ys).unwrap_or(0.0);
    if dimension != Dimension::Product || y != Metric::UnitMargin {
        return plain_mean;
    }
    let total_profit: f64 = entities.iter().map(|e| e.metric_or_zero(Metric::Profit)).sum();
    let total_quantity: f64 = entities
        .iter()
        .map(|e| e.metric_or_zero(Metric::Quantity))
        .sum();
    if total_quantity > 0.0 {
        total_profit / total_quantity * UNIT_MARGIN_SCALE
    } else {
        plain_mean
    }
}

pub fn analyze(entities: &[AggregatedEntity], ctx: &AnalysisContext) -> QuadrantAnalysis {
    let dimension = ctx.dimension;
    let axes = dimension.axes();
    let xs = entities
        .iter()
        .map(|e| e.metric_or_zero(axes.x))
        .collect::<Vec<_>>();
    let ys = entities
        .iter()
        .map(|e| e.metric_or_zero(axes.y))
        .collect::<Vec<_>>();

    let x_avg = stats::mean(&xs).unwrap_or(0.0);
    let y_avg = y_split(entities, dimension, axes.y, &ys);
    debug!("Quadrant splits for {dimension}: x={x_avg}, y={y_avg}");

    let mut members: BTreeMap<u8, Vec<&AggregatedEntity>> =
        (1..=4).map(|id| (id, Vec::new())).collect();
    let mut scatter_data = Vec::with_capacity(entities.len());
    for ((entity, x), y) in entities.iter().zip(&xs).zip(&ys) {
        let quadrant = classify(*x, *y, x_avg, y_avg);
        let (quadrant_name, strategy) = dimension
            .quadrant_profile(quadrant)
            .map(|profile| (profile.name, profile.strategy))
            .unwrap_or_default();
        scatter_data.push(ScatterPoint {
            key: entity.key.clone(),
            x: *x,
            y: *y,
            quadrant,
            quadrant_name,
            strategy,
        });
        members.entry(quadrant).or_default().push(entity);
    }

    let has = |role: Role| ctx.mapping.contains(role);
    let total = |metric: Metric| -> f64 { entities.iter().map(|e| e.metric_or_zero(metric)).sum() };
    let totals = [
        (Metric::Profit, has(Role::Profit).then(|| total(Metric::Profit))),
        (Metric::Amount, has(Role::Amount).then(|| total(Metric::Amount))),
        (Metric::Quantity, has(Role::Quantity).then(|| total(Metric::Quantity))),
    ];
    let total_count = entities.len();

    let quadrant_stats = members
        .into_iter()
        .map(|(id, group)| {
            let sums = totals.map(|(metric, grand)| {
                grand.map(|grand| {
                    let part: f64 = group.iter().map(|e| e.metric_or_zero(metric)).sum();
                    (part, stats::share(part, grand))
                })
            });
            let [profit, amount, quantity] = sums;
            let unit_margin = (dimension == Dimension::Product)
                .then(|| profit.zip(quantity))
                .flatten()
                .map(|((profit, _), (quantity, _))| {
                    crate::derive::unit_margin(Some(profit), Some(quantity))
                });
            let profile = dimension.quadrant_profile(id);
            let stat = QuadrantStats {
                name: profile.map(|p| p.name).unwrap_or_default(),
                description: profile.map(|p| p.description).unwrap_or_default(),
                strategy: profile.map(|p| p.strategy).unwrap_or_default(),
                count: group.len(),
                count_percentage: if total_count > 0 {
                    group.len() as f64 / total_count as f64 * 100.0
                } else {
                    0.0
                },
                profit_sum: profit.map(|(sum, _)| sum),
                profit_percentage: profit.map(|(_, pct)| pct),
                amount_sum: amount.map(|(sum, _)| sum),
                amount_percentage: amount.map(|(_, pct)| pct),
                quantity_sum: quantity.map(|(sum, _)| sum),
                quantity_percentage: quantity.map(|(_, pct)| pct),
                unit_margin,
                items: group.iter().map(|e| e.key.clone()).collect(),
            };
            (id, stat)
        })
        .collect();

    QuadrantAnalysis {
        x_metric: axes.x,
        y_metric: axes.y,
        x_label: axes.x_label,
        y_label: axes.y_label,
        x_avg,
        y_avg,
        scatter_data,
        quadrant_stats,
    }
}

//! The analysis pipeline.
//!
//! `resolve fields → validate → normalize units → derive → aggregate →
//! views`. Every stage borrows one immutable [`AnalysisContext`]; the only
//! aborting failures are validation and a missing grouping field. Views whose
//! roles are unmapped are left out of the report and listed in `warnings`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use log::{info, warn};
use serde::Serialize;

use crate::{
    aggregate::{self, AggregatedEntity},
    config::EngineSettings,
    context::AnalysisContext,
    contribution::{self, MeasureContribution},
    cost::{self, CostAnalysis},
    dataset::RawTable,
    derive,
    dimension::{Dimension, Measure},
    distribution::{self, FixedDistribution},
    error::AnalysisError,
    fields::{self, FieldDetection, FieldValidation, Role},
    pareto::{self, ParetoAnalysis},
    profit_loss::{self, ProfitLossAnalysis},
    quadrant::{self, QuadrantAnalysis},
    units::{self, UnitConfirmation},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub dimension: Dimension,
    pub units: UnitConfirmation,
    pub pareto_measure: Option<Measure>,
}

impl AnalysisRequest {
    pub fn new(dimension: Dimension) -> Self {
        Self {
            dimension,
            units: UnitConfirmation::default(),
            pareto_measure: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RawDataInfo {
    pub total_rows: usize,
    pub total_columns: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdditionalAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pareto_analysis: Option<ParetoAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution_analysis: Option<FixedDistribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_loss_analysis: Option<ProfitLossAnalysis>,
    pub contribution_analysis: BTreeMap<Measure, MeasureContribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_analysis: Option<CostAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub dimension: Dimension,
    pub units: UnitConfirmation,
    pub raw_data_info: RawDataInfo,
    pub field_detection: FieldDetection,
    pub field_validation: FieldValidation,
    pub aggregated_data: Vec<AggregatedEntity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quadrant_analysis: Option<QuadrantAnalysis>,
    pub additional_analysis: AdditionalAnalysis,
    pub warnings: Vec<String>,
}

/// Field detection alone, as used by the `detect` command.
pub fn detect(table: &RawTable, settings: &EngineSettings) -> FieldDetection {
    fields::resolve_fields(table, &settings.alias_table(), settings.sample_values)
}

fn skipped(warnings: &mut Vec<String>, view: &str, missing: &[Role]) {
    let message = format!("{view} skipped: missing {}", missing.iter().join(", "));
    warn!("{message}");
    warnings.push(message);
}

/// Runs every view over already aggregated entities.
pub fn run_views(
    entities: &[AggregatedEntity],
    ctx: &AnalysisContext,
) -> (Option<QuadrantAnalysis>, AdditionalAnalysis, Vec<String>) {
    let mut warnings = Vec::new();

    let missing = quadrant::missing_roles(ctx);
    let quadrant_analysis = if missing.is_empty() {
        Some(quadrant::analyze(entities, ctx))
    } else {
        skipped(&mut warnings, "quadrant analysis", &missing);
        None
    };

    let pareto_analysis = pareto::analyze(entities, ctx);
    if pareto_analysis.is_none() {
        skipped(&mut warnings, "pareto analysis", &Role::VALUE_ROLES);
    }

    let distribution_analysis = distribution::fixed_distribution(entities, ctx);
    if distribution_analysis.is_none() {
        let field = ctx.dimension.fixed_bins().field.role();
        skipped(&mut warnings, "distribution analysis", &[field]);
    }

    let profit_loss_analysis = profit_loss::analyze(entities, ctx);
    if profit_loss_analysis.is_none() {
        skipped(&mut warnings, "profit/loss analysis", &[Role::Profit]);
    }

    let cost_analysis = cost::analyze(entities, ctx);
    if cost_analysis.is_none() {
        skipped(&mut warnings, "cost analysis", &Role::COST_COMPONENTS);
    }

    let additional = AdditionalAnalysis {
        pareto_analysis,
        distribution_analysis,
        profit_loss_analysis,
        contribution_analysis: contribution::analyze(entities, ctx),
        cost_analysis,
    };
    (quadrant_analysis, additional, warnings)
}

pub fn analyze(
    table: &RawTable,
    request: &AnalysisRequest,
    settings: &EngineSettings,
) -> Result<AnalysisReport, AnalysisError> {
    let field_detection = detect(table, settings);
    let field_validation =
        fields::validate_fields(&field_detection.detected_fields, request.dimension);
    if !field_validation.is_valid {
        return Err(AnalysisError::Validation {
            missing: field_validation.missing_fields,
        });
    }

    let ctx = AnalysisContext::new(
        request.dimension,
        field_detection.detected_fields.clone(),
        request.units,
        request.pareto_measure,
        settings,
    );
    let normalized = units::normalize(table, &ctx.mapping, &ctx.units);
    let derived = derive::derive(normalized, &ctx.mapping);
    let aggregated_data = aggregate::aggregate(&derived, &ctx.mapping, ctx.dimension)?;
    let (quadrant_analysis, additional_analysis, warnings) = run_views(&aggregated_data, &ctx);

    info!(
        "Analysis by {} complete: {} entity(ies), {} warning(s)",
        ctx.dimension,
        aggregated_data.len(),
        warnings.len()
    );

    Ok(AnalysisReport {
        generated_at: Utc::now(),
        dimension: ctx.dimension,
        units: ctx.units,
        raw_data_info: RawDataInfo {
            total_rows: table.row_count(),
            total_columns: table.column_count(),
        },
        field_detection,
        field_validation,
        aggregated_data,
        quadrant_analysis,
        additional_analysis,
        warnings,
    })
}

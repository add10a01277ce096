mod common;

use common::{
    CUSTOMER_SHEET, FLAT_COST_SHEET, NUMERIC_CODE_SHEET, PRODUCT_SHEET, PRODUCT_SHEET_RAW_UNITS,
    table_from_csv,
};
use sales_lens::{
    config::EngineSettings,
    dimension::{Dimension, Measure},
    distribution::BinStrategy,
    engine::{self, AnalysisRequest},
    error::AnalysisError,
    fields::Role,
    pareto::AbcClass,
    units::{AmountUnit, QuantityUnit, UnitConfirmation},
};

fn run(sheet: &str, request: AnalysisRequest) -> engine::AnalysisReport {
    engine::analyze(&table_from_csv(sheet), &request, &EngineSettings::default())
        .expect("analysis succeeds")
}

#[test]
fn product_report_aggregates_and_places_quadrants() {
    let report = run(PRODUCT_SHEET, AnalysisRequest::new(Dimension::Product));

    let keys = report
        .aggregated_data
        .iter()
        .map(|e| e.key.as_str())
        .collect::<Vec<_>>();
    assert_eq!(keys, vec!["P1", "P2", "P3"]);
    let p1 = &report.aggregated_data[0];
    assert_eq!(p1.row_count, 2);
    assert_eq!(p1.quantity, Some(10.0));
    assert_eq!(p1.profit, Some(2.0));
    assert_eq!(p1.total_cost, Some(15.0));
    assert_eq!(p1.unit_margin, Some(2000.0));

    let quadrants = report.quadrant_analysis.as_ref().expect("quadrants");
    let placed = quadrants
        .scatter_data
        .iter()
        .map(|p| (p.key.as_str(), p.quadrant))
        .collect::<Vec<_>>();
    assert_eq!(placed, vec![("P1", 3), ("P2", 1), ("P3", 3)]);
    assert!((quadrants.y_avg - 9.0 / 35.0 * 10_000.0).abs() < 1e-9);
    assert!(report.warnings.is_empty());
}

#[test]
fn numeric_looking_codes_stay_distinct() {
    let report = run(NUMERIC_CODE_SHEET, AnalysisRequest::new(Dimension::Product));
    let keys = report
        .aggregated_data
        .iter()
        .map(|e| (e.key.as_str(), e.row_count, e.quantity))
        .collect::<Vec<_>>();
    assert_eq!(
        keys,
        vec![
            ("$12", 1, Some(5.0)),
            ("007", 2, Some(2.0)),
            ("1.23456", 1, Some(3.0)),
            ("1.23459", 1, Some(4.0)),
            ("12", 1, Some(6.0)),
            ("7", 1, Some(2.0)),
        ]
    );
    let quadrants = report.quadrant_analysis.as_ref().expect("quadrants");
    assert_eq!(quadrants.scatter_data.len(), 6);
}

#[test]
fn product_profit_split_uses_unit_margin() {
    let report = run(PRODUCT_SHEET, AnalysisRequest::new(Dimension::Product));
    let split = report
        .additional_analysis
        .profit_loss_analysis
        .as_ref()
        .expect("profit/loss");
    assert_eq!(split.summary.profitable_count, 2);
    assert_eq!(split.summary.loss_count, 1);
    assert_eq!(split.loss_making_items[0].key, "P3");
    assert_eq!(split.summary.net_profit, 9.0);
}

#[test]
fn unit_hints_make_raw_sheets_match_canonical_ones() {
    let canonical = run(PRODUCT_SHEET, AnalysisRequest::new(Dimension::Product));
    let request = AnalysisRequest {
        dimension: Dimension::Product,
        units: UnitConfirmation {
            quantity: Some(QuantityUnit::Kilogram),
            amount: Some(AmountUnit::Yuan),
        },
        pareto_measure: None,
    };
    let rescaled = run(PRODUCT_SHEET_RAW_UNITS, request);
    assert_eq!(rescaled.aggregated_data, canonical.aggregated_data);
    assert_eq!(rescaled.quadrant_analysis, canonical.quadrant_analysis);
}

#[test]
fn customer_pareto_core_includes_exact_threshold_hit() {
    let report = run(CUSTOMER_SHEET, AnalysisRequest::new(Dimension::Customer));
    let pareto = report
        .additional_analysis
        .pareto_analysis
        .as_ref()
        .expect("pareto");
    assert_eq!(pareto.dimension, Measure::Amount);
    let pcts = pareto
        .pareto_data
        .iter()
        .map(|e| e.cumulative_percentage)
        .collect::<Vec<_>>();
    assert_eq!(pcts, vec![33.33, 60.0, 80.0, 93.33, 100.0]);
    let core = pareto
        .core_items
        .iter()
        .map(|e| e.key.as_str())
        .collect::<Vec<_>>();
    assert_eq!(core, vec!["c2", "c5", "c3"]);
    assert_eq!(pareto.pareto_data[4].class, AbcClass::C);
}

#[test]
fn requested_pareto_measure_is_honoured_when_mapped() {
    let mut request = AnalysisRequest::new(Dimension::Customer);
    request.pareto_measure = Some(Measure::Profit);
    let report = run(CUSTOMER_SHEET, request);
    let pareto = report.additional_analysis.pareto_analysis.expect("pareto");
    assert_eq!(pareto.dimension, Measure::Profit);
    assert_eq!(pareto.pareto_data[0].key, "c2");

    // Quantity is not mapped, so the request falls back to the default.
    let mut request = AnalysisRequest::new(Dimension::Customer);
    request.pareto_measure = Some(Measure::Quantity);
    let report = run(CUSTOMER_SHEET, request);
    let pareto = report.additional_analysis.pareto_analysis.expect("pareto");
    assert_eq!(pareto.dimension, Measure::Amount);
}

#[test]
fn identical_cost_rates_fall_back_to_midpoint_bins() {
    let report = run(FLAT_COST_SHEET, AnalysisRequest::new(Dimension::Customer));
    let cost = report
        .additional_analysis
        .cost_analysis
        .as_ref()
        .expect("cost view");
    let rates = cost.rate_distribution.as_ref().expect("rate distribution");
    assert_eq!(rates.recommended, BinStrategy::Midpoint);
    assert_eq!(rates.fallback, Some(BinStrategy::Midpoint));
    assert_eq!(rates.avg_rate, 0.5);
    let counted: usize = rates.strategies[0]
        .distribution_data
        .iter()
        .map(|interval| interval.count)
        .sum();
    assert_eq!(counted, 3);
}

#[test]
fn missing_grouping_field_is_a_validation_error() {
    let err = engine::analyze(
        &table_from_csv(CUSTOMER_SHEET),
        &AnalysisRequest::new(Dimension::Region),
        &EngineSettings::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        AnalysisError::Validation {
            missing: vec![Role::Region]
        }
    );
    assert!(err.to_string().contains("region"));
}

#[test]
fn repeated_runs_produce_identical_views() {
    let first = run(PRODUCT_SHEET, AnalysisRequest::new(Dimension::Product));
    let second = run(PRODUCT_SHEET, AnalysisRequest::new(Dimension::Product));
    assert_eq!(first.aggregated_data, second.aggregated_data);
    assert_eq!(first.quadrant_analysis, second.quadrant_analysis);
    assert_eq!(first.additional_analysis, second.additional_analysis);
    assert_eq!(first.field_detection, second.field_detection);
}

#[test]
fn configured_threshold_changes_core_size() {
    let settings = EngineSettings {
        pareto_threshold: 60.0,
        ..EngineSettings::default()
    };
    let report = engine::analyze(
        &table_from_csv(CUSTOMER_SHEET),
        &AnalysisRequest::new(Dimension::Customer),
        &settings,
    )
    .expect("analysis");
    let pareto = report.additional_analysis.pareto_analysis.expect("pareto");
    assert_eq!(pareto.core_items_count, 2);
}

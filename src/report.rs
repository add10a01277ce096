use std::io::Write;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    aggregate::Metric,
    cli::{AnalyzeArgs, DetectArgs, InputArgs},
    config::EngineSettings,
    data::format_number,
    dataset::RawTable,
    dimension::Dimension,
    engine::{self, AnalysisReport, AnalysisRequest},
    fields::{self, FieldDetection},
    io_utils::{self, SheetSource},
    stats::round_to,
    table,
    units::UnitConfirmation,
};

fn load_input(input: &InputArgs) -> Result<(RawTable, EngineSettings)> {
    let settings = EngineSettings::load_or_default(input.config.as_deref())?;
    let table = RawTable::load(&SheetSource::from_args(input)?)?;
    Ok((table, settings))
}

pub fn execute(args: &AnalyzeArgs) -> Result<()> {
    let (table, settings) = load_input(&args.input)?;
    let request = AnalysisRequest {
        dimension: args.dimension,
        units: UnitConfirmation {
            quantity: args.quantity_unit,
            amount: args.amount_unit,
        },
        pareto_measure: args.pareto_dimension,
    };
    let report = engine::analyze(&table, &request, &settings)?;

    if args.summary {
        print_summary(&report);
        return Ok(());
    }

    let mut writer = io_utils::open_output(args.output.as_deref())?;
    if args.pretty {
        serde_json::to_writer_pretty(&mut writer, &report)
    } else {
        serde_json::to_writer(&mut writer, &report)
    }
    .context("Serializing analysis report")?;
    writeln!(writer)?;
    writer.flush().context("Flushing analysis report")?;
    if let Some(path) = &args.output {
        info!("Report written to {path:?}");
    }
    Ok(())
}

pub fn execute_detect(args: &DetectArgs) -> Result<()> {
    let (table, settings) = load_input(&args.input)?;
    let detection = engine::detect(&table, &settings);
    if args.json {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        serde_json::to_writer_pretty(&mut handle, &detection)
            .context("Serializing field detection")?;
        writeln!(handle)?;
        return Ok(());
    }
    print_detection(&detection);
    Ok(())
}

fn print_detection(detection: &FieldDetection) {
    let headers = ["column", "role", "matched_by", "type", "non_null", "samples"]
        .map(String::from)
        .to_vec();
    let rows = detection
        .column_info
        .iter()
        .map(|column| {
            vec![
                column.header.clone(),
                column.role.map(|r| r.to_string()).unwrap_or_else(|| "-".into()),
                column
                    .matched_by
                    .map(|m| format!("{m:?}"))
                    .unwrap_or_else(|| "-".into()),
                column.data_type.to_string(),
                column.non_null_count.to_string(),
                column
                    .sample_values
                    .iter()
                    .map(|cell| cell.as_display())
                    .collect::<Vec<_>>()
                    .join(", "),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    println!();

    let verdicts = Dimension::ALL
        .iter()
        .map(|dimension| {
            let validation = fields::validate_fields(&detection.detected_fields, *dimension);
            let verdict = if validation.is_valid {
                "ok".to_string()
            } else {
                let missing = validation
                    .missing_fields
                    .iter()
                    .map(|r| r.to_string())
                    .collect::<Vec<_>>();
                format!("missing {}", missing.join(", "))
            };
            vec![dimension.to_string(), verdict]
        })
        .collect::<Vec<_>>();
    table::print_table(&["dimension", "status"].map(String::from), &verdicts);
    info!(
        "Detected {} role(s) across {} column(s)",
        detection.detected_fields.len(),
        detection.total_columns
    );
}

fn cell(value: Option<f64>) -> String {
    value
        .map(|v| format_number(round_to(v, 2)))
        .unwrap_or_default()
}

fn print_summary(report: &AnalysisReport) {
    println!(
        "Analysis by {} over {} row(s), {} entity(ies)",
        report.dimension,
        report.raw_data_info.total_rows,
        report.aggregated_data.len()
    );
    println!();

    let metrics = [
        Metric::Quantity,
        Metric::Profit,
        Metric::Amount,
        Metric::TotalCost,
        Metric::UnitMargin,
        Metric::CostRate,
    ]
    .into_iter()
    .filter(|metric| {
        report
            .aggregated_data
            .iter()
            .any(|entity| entity.metric(*metric).is_some())
    })
    .collect::<Vec<_>>();
    let mut headers = vec![report.dimension.to_string()];
    headers.extend(metrics.iter().map(|m| m.to_string()));
    let rows = report
        .aggregated_data
        .iter()
        .map(|entity| {
            let mut row = vec![entity.key.clone()];
            row.extend(metrics.iter().map(|m| cell(entity.metric(*m))));
            row
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);

    if let Some(quadrants) = &report.quadrant_analysis {
        println!();
        println!(
            "Quadrants ({} split {}, {} split {})",
            quadrants.x_label,
            format_number(round_to(quadrants.x_avg, 2)),
            quadrants.y_label,
            format_number(round_to(quadrants.y_avg, 2))
        );
        let rows = quadrants
            .quadrant_stats
            .iter()
            .map(|(id, stats)| {
                vec![
                    id.to_string(),
                    stats.name.to_string(),
                    stats.count.to_string(),
                    format_number(stats.count_percentage),
                    stats.items.join(", "),
                ]
            })
            .collect::<Vec<_>>();
        table::print_table(
            &["id", "quadrant", "count", "count_%", "items"].map(String::from),
            &rows,
        );
    }

    if let Some(pareto) = &report.additional_analysis.pareto_analysis {
        println!();
        println!(
            "Pareto by {}: {} of {} item(s) reach {}%",
            pareto.dimension,
            pareto.core_items_count,
            pareto.total_items,
            format_number(pareto.threshold)
        );
        let rows = pareto
            .core_items
            .iter()
            .map(|entry| {
                vec![
                    entry.rank.to_string(),
                    entry.key.clone(),
                    cell(Some(entry.value)),
                    format_number(entry.cumulative_percentage),
                ]
            })
            .collect::<Vec<_>>();
        table::print_table(&["rank", "key", "value", "cumulative_%"].map(String::from), &rows);
    }

    if let Some(split) = &report.additional_analysis.profit_loss_analysis {
        let summary = &split.summary;
        println!();
        println!(
            "Profitable {} / loss-making {} (net profit {})",
            summary.profitable_count,
            summary.loss_count,
            format_number(round_to(summary.net_profit, 2))
        );
    }

    for message in &report.warnings {
        warn!("{message}");
    }
}

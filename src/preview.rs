use anyhow::Result;
use log::info;

use crate::{
    cli::PreviewArgs, config::EngineSettings, dataset::RawTable, engine, fields::FieldDetection,
    io_utils::SheetSource, table,
};

/// Header labels with the resolved role appended, e.g. `销量 [quantity]`.
pub fn annotated_headers(detection: &FieldDetection) -> Vec<String> {
    detection
        .column_info
        .iter()
        .map(|column| match column.role {
            Some(role) => format!("{} [{role}]", column.header),
            None => column.header.clone(),
        })
        .collect()
}

pub fn preview_rows(table: &RawTable, limit: usize) -> Vec<Vec<String>> {
    table
        .text_rows()
        .iter()
        .take(limit)
        .cloned()
        .collect()
}

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let input = &args.input;
    let settings = EngineSettings::load_or_default(input.config.as_deref())?;
    let table = RawTable::load(&SheetSource::from_args(input)?)?;
    let detection = engine::detect(&table, &settings);

    let rows = preview_rows(&table, args.rows);
    table::print_table(&annotated_headers(&detection), &rows);
    info!("Displayed {} row(s) from {:?}", rows.len(), input.input);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_carry_their_role() {
        let table = RawTable::from_records(
            &["产品名称", "销量", "备注"],
            &[vec!["A", "10", "x"], vec!["B", "5", "y"]],
        );
        let detection = engine::detect(&table, &EngineSettings::default());
        assert_eq!(
            annotated_headers(&detection),
            vec!["产品名称 [product]", "销量 [quantity]", "备注"]
        );
        assert_eq!(preview_rows(&table, 1), vec![vec!["A", "10", "x"]]);
    }

    #[test]
    fn numeric_codes_keep_leading_zeros() {
        let table = RawTable::from_records(&["产品名称", "数量"], &[vec!["007", "1.50"]]);
        assert_eq!(preview_rows(&table, 5), vec![vec!["007", "1.50"]]);
    }
}

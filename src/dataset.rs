//! In-memory representation of one loaded sheet.
//!
//! A [`RawTable`] is built once per analysis from an external tabular source
//! (CSV/TSV export of a spreadsheet here) and is read-only afterwards. Headers
//! are trimmed and whitespace-collapsed; empty or duplicate headers are replaced
//! with a synthetic `field_{idx}` placeholder so every header is unique.

use std::{collections::HashSet, sync::OnceLock};

use anyhow::{Context, Result, bail};
use log::{debug, info};
use regex::Regex;

use crate::{
    data::{Cell, ScalarKind, parse_cell},
    io_utils::SheetSource,
};

#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
    /// Trimmed source text of every cell, kept so codes such as `007` survive
    /// numeric parsing.
    text: Vec<Vec<String>>,
}

impl RawTable {
    /// Builds a table from raw header text and raw records. Short rows are
    /// padded with empty cells and long rows truncated to the header width.
    pub fn new(raw_headers: &[String], records: Vec<Vec<String>>) -> Self {
        let headers = clean_headers(raw_headers);
        let width = headers.len();
        let text = records
            .into_iter()
            .map(|record| {
                let mut record = record
                    .into_iter()
                    .map(|value| value.trim().to_string())
                    .collect::<Vec<_>>();
                record.resize(width, String::new());
                record
            })
            .collect::<Vec<_>>();
        let rows = text
            .iter()
            .map(|record| record.iter().map(|value| parse_cell(value)).collect())
            .collect();
        Self { headers, rows, text }
    }

    /// Builds a table from string records, parsing each cell.
    pub fn from_records<S, R>(raw_headers: &[S], records: &[R]) -> Self
    where
        S: AsRef<str>,
        R: AsRef<[S]>,
    {
        let headers = raw_headers
            .iter()
            .map(|h| h.as_ref().to_string())
            .collect::<Vec<_>>();
        let records = records
            .iter()
            .map(|record| {
                record
                    .as_ref()
                    .iter()
                    .map(|value| value.as_ref().to_string())
                    .collect()
            })
            .collect();
        Self::new(&headers, records)
    }

    /// Reads a whole sheet. Fully blank rows are skipped; a sheet without a
    /// header or without data rows is an error.
    pub fn load(source: &SheetSource) -> Result<Self> {
        let path = &source.path;
        let mut reader = source.open()?;
        let headers = source
            .headers(&mut reader)
            .with_context(|| format!("Reading headers from {path:?}"))?;
        if headers.iter().all(|h| h.trim().is_empty()) {
            bail!("Input {path:?} has no header row");
        }
        let mut rows = Vec::new();
        for (row_idx, record) in reader.byte_records().enumerate() {
            let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
            let decoded = source
                .decode(&record)
                .with_context(|| format!("Decoding row {}", row_idx + 2))?;
            if decoded.iter().all(|value| value.trim().is_empty()) {
                continue;
            }
            rows.push(decoded);
        }
        if rows.is_empty() {
            bail!("Input {path:?} contains no data rows");
        }
        let table = Self::new(&headers, rows);
        info!(
            "Loaded {} row(s) across {} column(s) from {:?}",
            table.row_count(),
            table.column_count(),
            path
        );
        Ok(table)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&Cell::Empty)
    }

    /// Trimmed source text of a cell, `""` when out of range. Unit rescaling
    /// does not touch it.
    pub fn text(&self, row: usize, column: usize) -> &str {
        self.text
            .get(row)
            .and_then(|r| r.get(column))
            .map_or("", String::as_str)
    }

    pub fn text_rows(&self) -> &[Vec<String>] {
        &self.text
    }

    pub fn column(&self, column: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(column).unwrap_or(&Cell::Empty))
    }

    /// Dominant scalar kind of a column, ignoring empty cells.
    pub fn column_kind(&self, column: usize) -> ScalarKind {
        self.column(column)
            .fold(ScalarKind::Empty, |kind, cell| kind.merge(cell.kind()))
    }

    pub fn non_empty_count(&self, column: usize) -> usize {
        self.column(column).filter(|cell| !cell.is_empty()).count()
    }

    /// Applies `f` to every numeric cell of `column`, leaving empty and text
    /// cells untouched.
    pub fn map_numeric_column<F>(&mut self, column: usize, f: F)
    where
        F: Fn(f64) -> f64,
    {
        for row in &mut self.rows {
            if let Some(Cell::Number(value)) = row.get_mut(column) {
                *value = f(*value);
            }
        }
    }
}

fn whitespace_run() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("static whitespace pattern"))
}

/// Trims a header and collapses internal whitespace runs to one space.
pub fn clean_header(raw: &str) -> String {
    whitespace_run()
        .replace_all(raw.trim(), " ")
        .into_owned()
}

fn clean_headers(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let cleaned = raw.iter().map(|h| clean_header(h)).collect::<Vec<_>>();
    let reserved = cleaned.iter().cloned().collect::<HashSet<_>>();
    cleaned
        .into_iter()
        .enumerate()
        .map(|(idx, header)| {
            if header.is_empty() || !seen.insert(header.clone()) {
                let mut placeholder = format!("field_{idx}");
                let mut suffix = 1;
                while reserved.contains(&placeholder) || seen.contains(&placeholder) {
                    placeholder = format!("field_{idx}_{suffix}");
                    suffix += 1;
                }
                debug!("Header at position {idx} replaced with '{placeholder}'");
                seen.insert(placeholder.clone());
                placeholder
            } else {
                header
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_header_collapses_whitespace() {
        assert_eq!(clean_header("  Sales \t Amount "), "Sales Amount");
    }

    #[test]
    fn empty_and_duplicate_headers_get_placeholders() {
        let table = RawTable::from_records(
            &["Product", "", "Product", " Amount "],
            &[vec!["A", "x", "y", "1"]],
        );
        assert_eq!(
            table.headers(),
            &["Product", "field_1", "field_2", "Amount"]
        );
    }

    #[test]
    fn placeholder_avoids_existing_header_names() {
        let table = RawTable::from_records(&["field_1", ""], &[vec!["1", "2"]]);
        assert_eq!(table.headers(), &["field_1", "field_1_1"]);
    }

    #[test]
    fn rows_are_padded_to_header_width() {
        let table = RawTable::from_records(&["a", "b", "c"], &[vec!["1"]]);
        assert_eq!(table.cell(0, 0), &Cell::Number(1.0));
        assert_eq!(table.cell(0, 2), &Cell::Empty);
    }

    #[test]
    fn source_text_survives_numeric_parsing() {
        let table = RawTable::from_records(&["code", "qty"], &[vec![" 007 ", "$12"], vec!["7", "1.23456"]]);
        assert_eq!(table.cell(0, 0), &Cell::Number(7.0));
        assert_eq!(table.text(0, 0), "007");
        assert_eq!(table.text(0, 1), "$12");
        assert_eq!(table.text(1, 1), "1.23456");
        assert_eq!(table.text(5, 0), "");
    }

    #[test]
    fn map_numeric_column_preserves_empty_cells() {
        let mut table = RawTable::from_records(&["qty"], &[vec!["1000"], vec![""], vec!["n/a"]]);
        table.map_numeric_column(0, |v| v / 1000.0);
        assert_eq!(table.cell(0, 0), &Cell::Number(1.0));
        assert_eq!(table.cell(1, 0), &Cell::Empty);
        assert_eq!(table.cell(2, 0), &Cell::Empty);
    }

    #[test]
    fn column_kind_reports_dominant_type() {
        let table = RawTable::from_records(
            &["name", "qty", "mixed"],
            &[vec!["A", "1", "x"], vec!["B", "2.5", "3"]],
        );
        assert_eq!(table.column_kind(0), ScalarKind::Text);
        assert_eq!(table.column_kind(1), ScalarKind::Float);
        assert_eq!(table.column_kind(2), ScalarKind::Mixed);
    }
}

use std::fmt;

use serde::{Serialize, Serializer};

const PLACEHOLDER_TOKENS: &[&str] = &["na", "n/a", "#n/a", "null", "none", "nan", "-", "--"];

/// A single spreadsheet cell after parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn kind(&self) -> ScalarKind {
        match self {
            Cell::Empty => ScalarKind::Empty,
            Cell::Number(value) if value.fract() == 0.0 => ScalarKind::Integer,
            Cell::Number(_) => ScalarKind::Float,
            Cell::Text(_) => ScalarKind::Text,
        }
    }

    /// Text used for grouping keys and diagnostics. Empty cells render as `""`.
    pub fn as_display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(value) => format_number(*value),
            Cell::Text(text) => text.clone(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl Serialize for Cell {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Cell::Empty => serializer.serialize_none(),
            Cell::Number(value) => serializer.serialize_f64(*value),
            Cell::Text(text) => serializer.serialize_str(text),
        }
    }
}

/// Detected scalar type of a cell or a whole column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Empty,
    Integer,
    Float,
    Text,
    Mixed,
}

impl ScalarKind {
    /// Folds the kind of another cell of the same column into this one.
    pub fn merge(self, other: ScalarKind) -> ScalarKind {
        match (self, other) {
            (current, ScalarKind::Empty) => current,
            (ScalarKind::Empty, next) => next,
            (a, b) if a == b => a,
            (ScalarKind::Integer, ScalarKind::Float) | (ScalarKind::Float, ScalarKind::Integer) => {
                ScalarKind::Float
            }
            _ => ScalarKind::Mixed,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ScalarKind::Integer | ScalarKind::Float)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScalarKind::Empty => "empty",
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "float",
            ScalarKind::Text => "text",
            ScalarKind::Mixed => "mixed",
        };
        f.write_str(label)
    }
}

pub fn is_placeholder_token(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    PLACEHOLDER_TOKENS.contains(&lowered.as_str())
}

/// Parses a raw cell. Numbers may carry thousands separators or a leading
/// currency sign; placeholder tokens such as `N/A` read as empty.
pub fn parse_cell(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_placeholder_token(trimmed) {
        return Cell::Empty;
    }
    match parse_number(trimmed) {
        Some(value) => Cell::Number(value),
        None => Cell::Text(trimmed.to_string()),
    }
}

fn parse_number(value: &str) -> Option<f64> {
    let unsigned = value
        .trim_start_matches(['$', '¥', '￥', '€', '£'])
        .trim();
    if unsigned.is_empty() {
        return None;
    }
    let cleaned: String = unsigned.chars().filter(|c| *c != ',' && *c != '_').collect();
    let first = cleaned.chars().next()?;
    if !(first.is_ascii_digit() || matches!(first, '-' | '+' | '.')) {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|parsed| parsed.is_finite())
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

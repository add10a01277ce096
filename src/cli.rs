use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    dimension::{Dimension, Measure},
    units::{AmountUnit, QuantityUnit},
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Quadrant, Pareto, distribution and cost analysis for sales sheets",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve column headers to semantic field roles
    Detect(DetectArgs),
    /// Run the full analysis and write the report as JSON
    Analyze(AnalyzeArgs),
    /// Preview the first rows with role-annotated headers
    Preview(PreviewArgs),
}

/// Options shared by every command that reads a sheet export.
#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input CSV/TSV file (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Optional YAML settings file (threshold, top-N, extra aliases)
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Emit the detection result as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Grouping dimension for the analysis
    #[arg(short = 'd', long = "dimension", default_value = "product")]
    pub dimension: Dimension,
    /// Unit the quantity column is expressed in (defaults to tons)
    #[arg(long = "quantity-unit")]
    pub quantity_unit: Option<QuantityUnit>,
    /// Unit the currency columns are expressed in (defaults to 10k yuan)
    #[arg(long = "amount-unit")]
    pub amount_unit: Option<AmountUnit>,
    /// Measure to rank by in the Pareto analysis
    #[arg(long = "pareto-dimension")]
    pub pareto_dimension: Option<Measure>,
    /// Output JSON file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Pretty-print the JSON report
    #[arg(long)]
    pub pretty: bool,
    /// Print summary tables instead of the JSON report
    #[arg(long, conflicts_with = "output")]
    pub summary: bool,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

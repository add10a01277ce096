pub mod aggregate;
pub mod cli;
pub mod config;
pub mod context;
pub mod contribution;
pub mod cost;
pub mod data;
pub mod dataset;
pub mod derive;
pub mod dimension;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod fields;
pub mod io_utils;
pub mod pareto;
pub mod preview;
pub mod profit_loss;
pub mod quadrant;
pub mod report;
pub mod stats;
pub mod table;
pub mod units;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::cli::{AnalyzeArgs, Cli, Commands, InputArgs};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sales_lens", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Detect(args) => {
            log_input("Detecting fields in", &args.input);
            report::execute_detect(&args)
        }
        Commands::Analyze(args) => handle_analyze(&args),
        Commands::Preview(args) => {
            log_input("Previewing", &args.input);
            preview::execute(&args)
        }
    }
}

fn handle_analyze(args: &AnalyzeArgs) -> Result<()> {
    log_input("Analyzing", &args.input);
    debug!(
        "Dimension {}, quantity unit {:?}, amount unit {:?}, pareto measure {:?}",
        args.dimension, args.quantity_unit, args.amount_unit, args.pareto_dimension
    );
    report::execute(args)
}

fn log_input(action: &str, input: &InputArgs) {
    let delimiter = io_utils::resolve_input_delimiter(&input.input, input.delimiter);
    info!(
        "{action} '{}' with delimiter '{}'",
        input.input.display(),
        printable_delimiter(delimiter)
    );
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}

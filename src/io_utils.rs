//! I/O helpers for reading sheet exports and writing reports.
//!
//! A [`SheetSource`] fixes the path, delimiter and text encoding of one input
//! before anything is read. `.tsv` files default to tab, everything else to
//! comma. Spreadsheet exports often start with a UTF-8 byte-order mark, which
//! is dropped from the first header. The `-` path reads stdin; an absent or
//! `-` output path writes stdout.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

use crate::cli::InputArgs;

const UTF8_BOM: &str = "\u{feff}";

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label.map(str::trim) {
        Some(value) => Encoding::for_label(value.as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(UTF_8),
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    let is_tsv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tsv"));
    provided.unwrap_or(if is_tsv { b'\t' } else { b',' })
}

/// A resolved sheet input.
#[derive(Debug, Clone)]
pub struct SheetSource {
    pub path: PathBuf,
    pub delimiter: u8,
    pub encoding: &'static Encoding,
}

impl SheetSource {
    pub fn new(path: impl Into<PathBuf>, delimiter: Option<u8>, encoding: Option<&str>) -> Result<Self> {
        let path = path.into();
        Ok(Self {
            delimiter: resolve_input_delimiter(&path, delimiter),
            encoding: resolve_encoding(encoding)?,
            path,
        })
    }

    pub fn from_args(args: &InputArgs) -> Result<Self> {
        Self::new(&args.input, args.delimiter, args.input_encoding.as_deref())
    }

    /// CSV reader over the file, or stdin for `-`. Rows may vary in width.
    pub fn open(&self) -> Result<csv::Reader<Box<dyn Read>>> {
        let reader: Box<dyn Read> = if is_dash(&self.path) {
            Box::new(std::io::stdin().lock())
        } else {
            let file = File::open(&self.path)
                .with_context(|| format!("Opening input file {:?}", self.path))?;
            Box::new(BufReader::new(file))
        };
        Ok(csv_reader(reader, self.delimiter))
    }

    /// Decoded header row with any byte-order mark removed.
    pub fn headers<R: Read>(&self, reader: &mut csv::Reader<R>) -> Result<Vec<String>> {
        let raw = reader.byte_headers()?.clone();
        let mut headers = self.decode(&raw)?;
        if let Some(first) = headers.first_mut()
            && let Some(stripped) = first.strip_prefix(UTF8_BOM)
        {
            *first = stripped.to_string();
        }
        Ok(headers)
    }

    pub fn decode(&self, record: &csv::ByteRecord) -> Result<Vec<String>> {
        record
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                let (text, _, had_errors) = self.encoding.decode(field);
                if had_errors {
                    Err(anyhow!(
                        "Field {} is not valid {} text",
                        idx + 1,
                        self.encoding.name()
                    ))
                } else {
                    Ok(text.into_owned())
                }
            })
            .collect()
    }
}

pub fn csv_reader<R: Read>(reader: R, delimiter: u8) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader)
}

/// Opens the report destination; `None` or `-` writes to stdout.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    })
}

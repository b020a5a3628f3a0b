//! Page Loader Module
//! Reads the commented CSV page format: optional `&key:,value,` metadata rows
//! followed by a date-indexed table with locations as columns.

use crate::data::page::{DataPage, PageOptions};
use chrono::NaiveDate;
use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Comment prefix marking metadata rows at the top of a page file.
const META_PREFIX: char = '&';

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] PolarsError),
    #[error("Table has no data rows")]
    EmptyTable,
    #[error("Table has no date column")]
    MissingDateColumn,
    #[error("Unparseable date cell: {0:?}")]
    BadDate(String),
    #[error("Dates are not strictly ascending")]
    UnsortedDates,
}

/// Load one page from a commented CSV file.
/// The page title is the file stem with underscores replaced by spaces.
pub fn load_page(path: &Path) -> Result<DataPage, LoaderError> {
    let raw = std::fs::read_to_string(path)?;

    let mut meta_lines = Vec::new();
    let mut body = String::with_capacity(raw.len());
    let mut in_header = true;
    for line in raw.lines() {
        if in_header && line.starts_with(META_PREFIX) {
            meta_lines.push(line);
            continue;
        }
        in_header = false;
        body.push_str(line);
        body.push('\n');
    }

    let options = parse_options(&meta_lines);

    if body.trim().is_empty() {
        return Err(LoaderError::EmptyTable);
    }

    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(10_000))
        .with_ignore_errors(true)
        .into_reader_with_file_handle(Cursor::new(body))
        .finish()?;

    if df.height() == 0 {
        return Err(LoaderError::EmptyTable);
    }
    if df.width() < 2 {
        return Err(LoaderError::MissingDateColumn);
    }

    let date_name = df.get_column_names()[0].clone();
    let date_col = df.column(&date_name)?;
    let dates = date_col
        .as_materialized_series()
        .str()
        .map_err(|_| LoaderError::MissingDateColumn)?
        .into_iter()
        .map(|cell| match cell {
            Some(s) => parse_date(s),
            None => Err(LoaderError::BadDate(String::new())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if dates.windows(2).any(|w| w[0] >= w[1]) {
        return Err(LoaderError::UnsortedDates);
    }

    let frame = df.drop(&date_name)?;
    let title = title_from_path(path);

    Ok(DataPage::new(title, dates, frame, options))
}

/// Load every `*.csv` page under a directory. Per-file failures are
/// reported alongside the successes so one bad table never hides the rest.
pub fn load_table_dir(dir: &Path) -> Vec<(PathBuf, Result<DataPage, LoaderError>)> {
    let pattern = dir.join("*.csv");
    let Ok(entries) = glob::glob(&pattern.to_string_lossy()) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for entry in entries.flatten() {
        let result = load_page(&entry);
        out.push((entry, result));
    }
    out
}

/// Parse metadata rows into page options. Unknown keys are ignored
/// with a warning; missing keys keep their defaults.
pub fn parse_options(lines: &[&str]) -> PageOptions {
    let mut options = PageOptions::default();
    for line in lines {
        let stripped = line.trim_start_matches(META_PREFIX);
        let mut cells = stripped.split(',');
        let key = cells
            .next()
            .unwrap_or_default()
            .trim()
            .trim_end_matches(':');
        let val = cells.next().unwrap_or_default().trim();
        match key {
            "ylabel" => options.ylabel = val.to_string(),
            "log_allowed" => options.log_allowed = parse_bool(val),
            "delta_allowed" => options.delta_allowed = parse_bool(val),
            "per_capita_allowed" => options.per_capita_allowed = parse_bool(val),
            "suggested_scaling" | "scaling" => {
                options.suggested_scaling = val.parse::<u64>().ok();
            }
            other => log::warn!("ignoring unknown page option {other:?}"),
        }
    }
    options
}

fn parse_bool(val: &str) -> bool {
    matches!(val.to_ascii_lowercase().as_str(), "true" | "1")
}

fn parse_date(s: &str) -> Result<NaiveDate, LoaderError> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%y"))
        .map_err(|_| LoaderError::BadDate(s.to_string()))
}

fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().replace('_', " "))
        .unwrap_or_else(|| "Untitled".to_string())
}

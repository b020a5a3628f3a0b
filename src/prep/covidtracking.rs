//! Testing-data source: per-state daily JSON records from the COVID
//! Tracking Project, combined into two wide date-by-state tables
//! (total tests and test positivity).

use super::{write_commented_csv, PrepError, Progress, STATES, TABLES_DIR};
use crate::data::PageOptions;
use chrono::NaiveDate;
use polars::prelude::*;
use rayon::prelude::*;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

const DAILY_URL: &str = "https://api.covidtracking.com/v1/states";

/// One day of a state's testing history, as served by the API.
/// Dates come as yyyymmdd integers; counts can be absent early on.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailyRecord {
    date: u32,
    #[serde(default)]
    positive: Option<f64>,
    #[serde(default)]
    total_test_results: Option<f64>,
}

/// Per-state series extracted from the daily records.
struct StateSeries {
    name: &'static str,
    tests: BTreeMap<NaiveDate, f64>,
    positivity: BTreeMap<NaiveDate, f64>,
}

pub(crate) fn prepare(client: &Client, progress: Progress<'_>) -> Result<(), PrepError> {
    let done = AtomicUsize::new(0);
    let total = STATES.len();

    let states = STATES
        .par_iter()
        .map(|(name, abbr)| {
            let series = fetch_state(client, name, abbr)?;
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            progress(
                0.45 * n as f32 / total as f32,
                &format!("Fetched testing data for {name}"),
            );
            Ok(series)
        })
        .collect::<Result<Vec<_>, PrepError>>()?;

    let mut tests = wide_frame(&states, |s| &s.tests);
    write_commented_csv(
        &Path::new(TABLES_DIR).join("Tests_US.csv"),
        &mut tests,
        &PageOptions {
            ylabel: "Tests".into(),
            log_allowed: false,
            per_capita_allowed: true,
            delta_allowed: true,
            suggested_scaling: None,
        },
    )?;

    let mut ratios = wide_frame(&states, |s| &s.positivity);
    write_commented_csv(
        &Path::new(TABLES_DIR).join("Positivity_Ratio_US.csv"),
        &mut ratios,
        &PageOptions {
            ylabel: "Fraction of total tests 'positive'".into(),
            ..PageOptions::default()
        },
    )?;

    Ok(())
}

fn fetch_state(client: &Client, name: &'static str, abbr: &str) -> Result<StateSeries, PrepError> {
    let url = format!("{DAILY_URL}/{}/daily.json", abbr.to_ascii_lowercase());
    let bytes = client.get(&url).send()?.error_for_status()?.bytes()?;
    let records: Vec<DailyRecord> = serde_json::from_slice(&bytes)
        .map_err(|err| PrepError::BadPayload(format!("{name}: {err}")))?;
    if records.is_empty() {
        return Err(PrepError::BadPayload(name.to_string()));
    }

    let mut tests = BTreeMap::new();
    let mut ratios = BTreeMap::new();
    for record in records {
        let Some(date) = parse_day(record.date) else {
            log::warn!("{name}: skipping record with bad date {}", record.date);
            continue;
        };
        if let Some(total) = record.total_test_results {
            tests.insert(date, total);
        }
        if let Some(ratio) = positivity(record.positive, record.total_test_results) {
            ratios.insert(date, ratio);
        }
    }

    Ok(StateSeries {
        name,
        tests,
        positivity: ratios,
    })
}

/// Test positivity: positive results over total tests. `None` when the
/// denominator is missing or zero.
pub(crate) fn positivity(positive: Option<f64>, total: Option<f64>) -> Option<f64> {
    match (positive, total) {
        (Some(p), Some(t)) if t > 0.0 => Some(p / t),
        _ => None,
    }
}

fn parse_day(yyyymmdd: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        (yyyymmdd / 10_000) as i32,
        yyyymmdd / 100 % 100,
        yyyymmdd % 100,
    )
}

/// Assemble per-state series into one date-indexed frame. Rows are the
/// sorted union of all dates; states without a value on a date get a
/// null cell.
fn wide_frame<F>(states: &[StateSeries], select: F) -> DataFrame
where
    F: Fn(&StateSeries) -> &BTreeMap<NaiveDate, f64>,
{
    let dates: BTreeSet<NaiveDate> = states
        .iter()
        .flat_map(|s| select(s).keys().copied())
        .collect();
    let dates: Vec<NaiveDate> = dates.into_iter().collect();

    let mut columns = vec![Column::new(
        "Date".into(),
        dates
            .iter()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect::<Vec<_>>(),
    )];
    for state in states {
        let series = select(state);
        let values: Vec<Option<f64>> = dates.iter().map(|d| series.get(d).copied()).collect();
        columns.push(Column::new(state.name.into(), values));
    }

    // Column lengths all equal dates.len(), so construction cannot fail.
    DataFrame::new(columns).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 5, d).unwrap()
    }

    #[test]
    fn positivity_handles_missing_denominator() {
        assert_eq!(positivity(Some(5.0), Some(20.0)), Some(0.25));
        assert_eq!(positivity(Some(5.0), Some(0.0)), None);
        assert_eq!(positivity(Some(5.0), None), None);
        assert_eq!(positivity(None, Some(20.0)), None);
    }

    #[test]
    fn day_parsing() {
        assert_eq!(parse_day(20200513), Some(date(13)));
        assert_eq!(parse_day(20200000), None);
    }

    #[test]
    fn wide_frame_aligns_unequal_series() {
        let a = StateSeries {
            name: "Ohio",
            tests: [(date(1), 10.0), (date(2), 20.0)].into(),
            positivity: BTreeMap::new(),
        };
        let b = StateSeries {
            name: "Texas",
            tests: [(date(2), 5.0), (date(3), 6.0)].into(),
            positivity: BTreeMap::new(),
        };

        let df = wide_frame(&[a, b], |s| &s.tests);
        assert_eq!(df.height(), 3);
        assert_eq!(
            df.get_column_names()
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>(),
            vec!["Date", "Ohio", "Texas"]
        );

        let ohio = df.column("Ohio").unwrap().f64().unwrap();
        assert_eq!(ohio.get(0), Some(10.0));
        assert_eq!(ohio.get(2), None);
        let texas = df.column("Texas").unwrap().f64().unwrap();
        assert_eq!(texas.get(0), None);
        assert_eq!(texas.get(2), Some(6.0));
    }
}

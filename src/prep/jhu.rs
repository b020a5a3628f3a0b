//! Case/death source: the JHU CSSE time-series CSVs. One row per
//! locale with one column per date; reshaped here into state-level,
//! date-indexed tables plus the summed population table.

use super::{population_path, write_commented_csv, PrepError, Progress, TABLES_DIR};
use crate::data::PageOptions;
use chrono::NaiveDate;
use polars::prelude::*;
use reqwest::blocking::Client;
use std::io::Cursor;
use std::path::Path;

const CONFIRMED_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_confirmed_US.csv";
const DEATHS_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_deaths_US.csv";

const STATE_COL: &str = "Province_State";
const POPULATION_COL: &str = "Population";

/// Locale metadata columns that carry no time-series data.
const DROP_COLUMNS: &[&str] = &[
    "UID",
    "iso2",
    "iso3",
    "code3",
    "FIPS",
    "Admin2",
    "Country_Region",
    "Lat",
    "Long_",
    "Combined_Key",
];

/// Cruise-ship rows have no resident population and are excluded.
const EXCLUDED_ROWS: &[&str] = &["Diamond Princess", "Grand Princess"];

pub(crate) fn prepare(client: &Client, progress: Progress<'_>) -> Result<(), PrepError> {
    progress(0.55, "Downloading confirmed cases...");
    let confirmed = aggregate_states(read_remote_csv(client, CONFIRMED_URL)?)?;
    let mut confirmed = transpose_to_dates(&confirmed)?;
    write_commented_csv(
        &Path::new(TABLES_DIR).join("Confirmed_US.csv"),
        &mut confirmed,
        &case_options("Cases"),
    )?;

    progress(0.75, "Downloading deaths...");
    let deaths = aggregate_states(read_remote_csv(client, DEATHS_URL)?)?;
    let (mut population, deaths) = split_population(deaths)?;

    let pop_path = population_path();
    let mut pop_file = std::fs::File::create(&pop_path)?;
    CsvWriter::new(&mut pop_file)
        .include_header(true)
        .finish(&mut population)?;
    log::info!("wrote {} ({} states)", pop_path.display(), population.height());

    progress(0.9, "Reshaping deaths table...");
    let mut deaths = transpose_to_dates(&deaths)?;
    write_commented_csv(
        &Path::new(TABLES_DIR).join("Deaths_US.csv"),
        &mut deaths,
        &case_options("Deaths"),
    )?;

    Ok(())
}

fn case_options(ylabel: &str) -> PageOptions {
    PageOptions {
        ylabel: ylabel.to_string(),
        log_allowed: true,
        per_capita_allowed: true,
        delta_allowed: true,
        suggested_scaling: Some(1_000_000),
    }
}

fn read_remote_csv(client: &Client, url: &str) -> Result<DataFrame, PrepError> {
    let bytes = client.get(url).send()?.error_for_status()?.bytes()?;
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(10_000))
        .with_ignore_errors(true)
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;
    Ok(df)
}

/// Collapse locale rows into one row per state: drop metadata columns
/// and cruise ships, then sum every remaining column per state.
fn aggregate_states(df: DataFrame) -> Result<DataFrame, PrepError> {
    let present: Vec<&str> = DROP_COLUMNS
        .iter()
        .copied()
        .filter(|name| df.get_column_names().iter().any(|c| c.as_str() == *name))
        .collect();
    let df = df.drop_many(present);

    let mut filter = lit(true);
    for excluded in EXCLUDED_ROWS {
        filter = filter.and(col(STATE_COL).neq(lit(*excluded)));
    }

    let df = df
        .lazy()
        .filter(filter)
        .group_by([col(STATE_COL)])
        .agg([all().sum()])
        .sort([STATE_COL], Default::default())
        .collect()?;
    Ok(df)
}

/// Pull the summed Population column out of the deaths table, leaving
/// only date columns behind.
fn split_population(df: DataFrame) -> Result<(DataFrame, DataFrame), PrepError> {
    let population = df.select([STATE_COL, POPULATION_COL])?;
    let remainder = df.drop(POPULATION_COL)?;
    Ok((population, remainder))
}

/// Turn a one-row-per-state frame with `%m/%d/%y` date columns into a
/// date-indexed frame with one column per state.
fn transpose_to_dates(df: &DataFrame) -> Result<DataFrame, PrepError> {
    let states: Vec<String> = df
        .column(STATE_COL)?
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|s| s.unwrap_or_default().to_string())
        .collect();

    let mut date_cols: Vec<(NaiveDate, String)> = Vec::new();
    for name in df.get_column_names() {
        if name.as_str() == STATE_COL {
            continue;
        }
        let date = NaiveDate::parse_from_str(name.as_str(), "%m/%d/%y")
            .map_err(|_| PrepError::BadPayload(format!("unrecognized column {name}")))?;
        date_cols.push((date, name.to_string()));
    }
    date_cols.sort_by_key(|(d, _)| *d);

    // Cast each date column once, then read it row by row.
    let mut casted: Vec<Vec<Option<f64>>> = Vec::with_capacity(date_cols.len());
    for (_, name) in &date_cols {
        let ca = df.column(name)?.cast(&DataType::Float64)?;
        casted.push(ca.f64()?.into_iter().collect());
    }

    let mut columns = vec![Column::new(
        "Date".into(),
        date_cols
            .iter()
            .map(|(d, _)| d.format("%Y-%m-%d").to_string())
            .collect::<Vec<_>>(),
    )];
    for (row, state) in states.iter().enumerate() {
        let values: Vec<Option<f64>> = casted.iter().map(|col| col[row]).collect();
        columns.push(Column::new(state.as_str().into(), values));
    }

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two locales in Ohio, one in Texas, one cruise ship.
    fn locale_frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new("UID".into(), vec![1i64, 2, 3, 4]),
            Column::new(
                "Admin2".into(),
                vec!["Franklin", "Summit", "Travis", ""],
            ),
            Column::new(
                STATE_COL.into(),
                vec!["Ohio", "Ohio", "Texas", "Diamond Princess"],
            ),
            Column::new(POPULATION_COL.into(), vec![100.0, 50.0, 200.0, 0.0]),
            Column::new("3/1/20".into(), vec![1.0, 2.0, 5.0, 9.0]),
            Column::new("3/2/20".into(), vec![3.0, 4.0, 6.0, 9.0]),
        ])
        .unwrap()
    }

    #[test]
    fn aggregation_sums_locales_and_drops_ships() {
        let df = aggregate_states(locale_frame()).unwrap();
        assert_eq!(df.height(), 2);
        assert!(!df
            .get_column_names()
            .iter()
            .any(|c| c.as_str() == "Admin2"));

        let states = df.column(STATE_COL).unwrap().as_materialized_series();
        let states = states.str().unwrap();
        assert_eq!(states.get(0), Some("Ohio"));
        let day1 = df.column("3/1/20").unwrap().f64().unwrap();
        assert_eq!(day1.get(0), Some(3.0));
        assert_eq!(day1.get(1), Some(5.0));
    }

    #[test]
    fn population_split_sums_per_state() {
        let df = aggregate_states(locale_frame()).unwrap();
        let (population, remainder) = split_population(df).unwrap();
        let counts = population.column(POPULATION_COL).unwrap().f64().unwrap();
        assert_eq!(counts.get(0), Some(150.0));
        assert_eq!(counts.get(1), Some(200.0));
        assert!(!remainder
            .get_column_names()
            .iter()
            .any(|c| c.as_str() == POPULATION_COL));
    }

    #[test]
    fn transpose_produces_date_index() {
        let df = aggregate_states(locale_frame()).unwrap();
        let (_, remainder) = split_population(df).unwrap();
        let table = transpose_to_dates(&remainder).unwrap();

        assert_eq!(
            table
                .get_column_names()
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>(),
            vec!["Date", "Ohio", "Texas"]
        );
        let dates = table.column("Date").unwrap().as_materialized_series();
        let dates = dates.str().unwrap();
        assert_eq!(dates.get(0), Some("2020-03-01"));
        let ohio = table.column("Ohio").unwrap().f64().unwrap();
        assert_eq!(ohio.get(1), Some(7.0));
    }

    #[test]
    fn unknown_column_is_an_error() {
        let df = DataFrame::new(vec![
            Column::new(STATE_COL.into(), vec!["Ohio"]),
            Column::new("NotADate".into(), vec![1.0]),
        ])
        .unwrap();
        assert!(matches!(
            transpose_to_dates(&df),
            Err(PrepError::BadPayload(_))
        ));
    }
}

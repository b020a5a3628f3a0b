//! Data Preparation Module
//! Downloads, reshapes, and saves the upstream datasets as commented CSV
//! pages under `./tables`, plus the population table under `./state_info`.
//!
//! Sources:
//! - Confirmed cases and deaths: https://github.com/CSSEGISandData/COVID-19
//! - Testing and populations: https://covidtracking.com/

mod covidtracking;
mod jhu;

use crate::data::PageOptions;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Directory the application reads page tables from.
pub const TABLES_DIR: &str = "tables";
/// Directory holding the population table.
pub const STATE_INFO_DIR: &str = "state_info";

/// Where the summed state populations land.
pub fn population_path() -> PathBuf {
    Path::new(STATE_INFO_DIR).join("Population_US.csv")
}

#[derive(Error, Debug)]
pub enum PrepError {
    #[error("Download failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to reshape table: {0}")]
    Csv(#[from] PolarsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unusable payload for {0}")]
    BadPayload(String),
}

/// Progress callback: fraction in [0, 1] plus a status message.
/// Must be `Sync` because state downloads run on the rayon pool.
pub type Progress<'a> = &'a (dyn Fn(f32, &str) + Sync);

/// Download and rebuild every table. Progress runs 0..0.5 for the
/// testing data and 0.5..1.0 for the JHU case/death data.
pub fn prepare(progress: Progress<'_>) -> Result<(), PrepError> {
    std::fs::create_dir_all(TABLES_DIR)?;
    std::fs::create_dir_all(STATE_INFO_DIR)?;

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()?;

    progress(0.0, "Downloading per-state testing data...");
    covidtracking::prepare(&client, progress)?;

    progress(0.5, "Downloading case and death time series...");
    jhu::prepare(&client, progress)?;

    progress(1.0, "Data preparation complete");
    Ok(())
}

/// Write a frame as a commented CSV page: `&key:,value,` metadata rows
/// first, then the table itself. Round-trips through `data::load_page`.
pub(crate) fn write_commented_csv(
    path: &Path,
    df: &mut DataFrame,
    options: &PageOptions,
) -> Result<(), PrepError> {
    use std::io::Write;

    let mut buf = Vec::new();
    if !options.ylabel.is_empty() {
        writeln!(buf, "&ylabel:,{},", options.ylabel)?;
    }
    writeln!(buf, "&log_allowed:,{},", py_bool(options.log_allowed))?;
    writeln!(buf, "&delta_allowed:,{},", py_bool(options.delta_allowed))?;
    writeln!(
        buf,
        "&per_capita_allowed:,{},",
        py_bool(options.per_capita_allowed)
    )?;
    if let Some(scaling) = options.suggested_scaling {
        writeln!(buf, "&suggested_scaling:,{scaling},")?;
    }

    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(df)?;

    std::fs::write(path, buf)?;
    log::info!("wrote {} ({} rows)", path.display(), df.height());
    Ok(())
}

/// Hand-written tables use Python-style booleans, so keep that casing.
fn py_bool(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

/// States and territories served by the testing API, with the
/// two-letter abbreviations its URLs are keyed by.
pub(crate) const STATES: &[(&str, &str)] = &[
    ("Alabama", "AL"),
    ("Alaska", "AK"),
    ("American Samoa", "AS"),
    ("Arizona", "AZ"),
    ("Arkansas", "AR"),
    ("California", "CA"),
    ("Colorado", "CO"),
    ("Connecticut", "CT"),
    ("Delaware", "DE"),
    ("District of Columbia", "DC"),
    ("Florida", "FL"),
    ("Georgia", "GA"),
    ("Guam", "GU"),
    ("Hawaii", "HI"),
    ("Idaho", "ID"),
    ("Illinois", "IL"),
    ("Indiana", "IN"),
    ("Iowa", "IA"),
    ("Kansas", "KS"),
    ("Kentucky", "KY"),
    ("Louisiana", "LA"),
    ("Maine", "ME"),
    ("Maryland", "MD"),
    ("Massachusetts", "MA"),
    ("Michigan", "MI"),
    ("Minnesota", "MN"),
    ("Mississippi", "MS"),
    ("Missouri", "MO"),
    ("Montana", "MT"),
    ("Nebraska", "NE"),
    ("Nevada", "NV"),
    ("New Hampshire", "NH"),
    ("New Jersey", "NJ"),
    ("New Mexico", "NM"),
    ("New York", "NY"),
    ("North Carolina", "NC"),
    ("North Dakota", "ND"),
    ("Northern Mariana Islands", "MP"),
    ("Ohio", "OH"),
    ("Oklahoma", "OK"),
    ("Oregon", "OR"),
    ("Pennsylvania", "PA"),
    ("Puerto Rico", "PR"),
    ("Rhode Island", "RI"),
    ("South Carolina", "SC"),
    ("South Dakota", "SD"),
    ("Tennessee", "TN"),
    ("Texas", "TX"),
    ("Utah", "UT"),
    ("Vermont", "VT"),
    ("Virgin Islands", "VI"),
    ("Virginia", "VA"),
    ("Washington", "WA"),
    ("West Virginia", "WV"),
    ("Wisconsin", "WI"),
    ("Wyoming", "WY"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::load_page;

    #[test]
    fn commented_csv_round_trips_through_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Tests_US.csv");

        let mut df = DataFrame::new(vec![
            Column::new("Date".into(), vec!["2020-03-01", "2020-03-02"]),
            Column::new("Ohio".into(), vec![Some(100.0), Some(250.0)]),
            Column::new("Texas".into(), vec![None, Some(400.0)]),
        ])
        .unwrap();

        let options = PageOptions {
            ylabel: "Tests".into(),
            log_allowed: false,
            per_capita_allowed: true,
            delta_allowed: true,
            suggested_scaling: Some(1_000_000),
        };
        write_commented_csv(&path, &mut df, &options).unwrap();

        let page = load_page(&path).unwrap();
        assert_eq!(page.title, "Tests US");
        assert_eq!(page.options, options);
        assert_eq!(page.locations(), vec!["Ohio", "Texas"]);
        assert_eq!(
            page.column_values("Texas").unwrap(),
            vec![None, Some(400.0)]
        );
    }

    #[test]
    fn state_table_is_complete_and_unique() {
        assert_eq!(STATES.len(), 56);
        let mut abbrs: Vec<&str> = STATES.iter().map(|(_, a)| *a).collect();
        abbrs.sort_unstable();
        abbrs.dedup();
        assert_eq!(abbrs.len(), 56);
    }
}

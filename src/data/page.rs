//! Data Page Module
//! One date-indexed wide table of location time series plus its plot options.

use chrono::NaiveDate;
use polars::prelude::*;

/// Per-page plot options, carried in the commented CSV header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageOptions {
    pub ylabel: String,
    pub log_allowed: bool,
    pub per_capita_allowed: bool,
    pub delta_allowed: bool,
    pub suggested_scaling: Option<u64>,
}

/// One table of data: rows are dates, columns are locations.
/// The date index is kept separately from the polars frame so the
/// frame only ever holds location columns.
#[derive(Debug, Clone)]
pub struct DataPage {
    pub title: String,
    pub dates: Vec<NaiveDate>,
    frame: DataFrame,
    pub options: PageOptions,
}

impl DataPage {
    pub fn new(title: String, dates: Vec<NaiveDate>, frame: DataFrame, options: PageOptions) -> Self {
        Self {
            title,
            dates,
            frame,
            options,
        }
    }

    /// Location column names, in table order.
    pub fn locations(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Number of rows (dates).
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Values of one location column as Float64, `None` for nulls and NaN.
    /// Returns `None` when the page has no such column.
    pub fn column_values(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let col = self.frame.column(name).ok()?;
        let cast = col.cast(&DataType::Float64).ok()?;
        let ca = cast.f64().ok()?;
        Some(
            ca.into_iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_page() -> DataPage {
        let frame = DataFrame::new(vec![
            Column::new("Alabama".into(), vec![Some(1.0), None, Some(3.0)]),
            Column::new("Alaska".into(), vec![Some(10.0), Some(20.0), Some(30.0)]),
        ])
        .unwrap();
        let dates = (1..=3)
            .map(|d| NaiveDate::from_ymd_opt(2020, 3, d).unwrap())
            .collect();
        DataPage::new("Confirmed US".into(), dates, frame, PageOptions::default())
    }

    #[test]
    fn locations_exclude_date_index() {
        let page = sample_page();
        assert_eq!(page.locations(), vec!["Alabama", "Alaska"]);
        assert_eq!(page.len(), 3);
    }

    #[test]
    fn column_values_preserve_nulls() {
        let page = sample_page();
        let vals = page.column_values("Alabama").unwrap();
        assert_eq!(vals, vec![Some(1.0), None, Some(3.0)]);
        assert!(page.column_values("Wyoming").is_none());
    }

    #[test]
    fn date_bounds() {
        let page = sample_page();
        assert_eq!(page.first_date(), NaiveDate::from_ymd_opt(2020, 3, 1));
        assert_eq!(page.last_date(), NaiveDate::from_ymd_opt(2020, 3, 3));
    }
}

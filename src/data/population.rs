//! Population Table Module
//! State and territory populations, summed from locale counts by the
//! data prep step and stored as a two-column CSV.

use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PopulationError {
    #[error("Failed to read population CSV: {0}")]
    Csv(#[from] PolarsError),
    #[error("Population table needs a name and a count column")]
    MissingColumns,
}

/// Lookup of state/territory name to population count.
#[derive(Debug, Clone, Default)]
pub struct PopulationTable {
    by_state: HashMap<String, f64>,
}

impl PopulationTable {
    /// Load from a `Province_State,Population` CSV.
    pub fn load(path: &Path) -> Result<Self, PopulationError> {
        let df = CsvReadOptions::default()
            .with_infer_schema_length(Some(100))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        if df.width() < 2 {
            return Err(PopulationError::MissingColumns);
        }

        let names = df.get_columns()[0]
            .as_materialized_series()
            .str()
            .map_err(|_| PopulationError::MissingColumns)?;
        let counts = df.get_columns()[1].cast(&DataType::Float64)?;
        let counts = counts.f64()?;

        let mut by_state = HashMap::new();
        for (name, count) in names.into_iter().zip(counts.into_iter()) {
            if let (Some(name), Some(count)) = (name, count) {
                by_state.insert(name.to_string(), count);
            }
        }

        Ok(Self { by_state })
    }

    pub fn get(&self, state: &str) -> Option<f64> {
        self.by_state.get(state).copied()
    }

    pub fn len(&self) -> usize {
        self.by_state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_state.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_and_looks_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Population_US.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"Province_State,Population\nAlabama,4903185\nAlaska,731545\n")
            .unwrap();

        let table = PopulationTable::load(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("Alaska"), Some(731_545.0));
        assert_eq!(table.get("Atlantis"), None);
    }

    #[test]
    fn one_column_table_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("narrow.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"Province_State\nAlabama\n").unwrap();
        assert!(matches!(
            PopulationTable::load(&path),
            Err(PopulationError::MissingColumns)
        ));
    }
}

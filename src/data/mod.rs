//! Data module - page tables, loading, transforms, and selection state

mod loader;
mod page;
mod population;
mod store;
mod transform;

pub use loader::{load_page, load_table_dir, LoaderError};
pub use page::{DataPage, PageOptions};
pub use population::{PopulationError, PopulationTable};
pub use store::PageStore;
pub use transform::{
    daily_delta, derive_series, per_capita, triangular_mean, LocationSeries, SMOOTHING_WINDOW,
};

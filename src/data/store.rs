//! Page Store Module
//! Holds every loaded page plus the cross-page state the GUI binds to:
//! the union of locations, the current selection, and the date range.

use crate::data::page::DataPage;
use chrono::NaiveDate;

/// All loaded pages and the selection/date state shared between them.
#[derive(Debug, Default)]
pub struct PageStore {
    pub pages: Vec<DataPage>,
    /// Sorted union of every page's locations.
    pub locations: Vec<String>,
    /// Locations currently shown in plots.
    pub active: Vec<String>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
}

impl PageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pages(pages: Vec<DataPage>) -> Self {
        let mut store = Self::new();
        for page in pages {
            store.add_page(page);
        }
        store
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page(&self, index: usize) -> Option<&DataPage> {
        self.pages.get(index)
    }

    /// Add a page, widening the date range and the location union.
    /// Loading data re-selects everything.
    pub fn add_page(&mut self, page: DataPage) {
        for name in page.locations() {
            if !self.locations.contains(&name) {
                self.locations.push(name);
            }
        }
        self.locations.sort();

        if let Some(first) = page.first_date() {
            self.min_date = Some(self.min_date.map_or(first, |d| d.min(first)));
        }
        if let Some(last) = page.last_date() {
            self.max_date = Some(self.max_date.map_or(last, |d| d.max(last)));
        }
        self.start_date = self.min_date;

        self.pages.push(page);
        self.active = self.locations.clone();
    }

    pub fn select_all(&mut self) {
        self.active = self.locations.clone();
    }

    pub fn clear_selection(&mut self) {
        self.active.clear();
    }

    /// Add one location to the selection. When everything is already
    /// selected, picking a single location collapses the selection to
    /// just that one.
    pub fn add_location(&mut self, name: &str) {
        if !self.locations.iter().any(|l| l == name) {
            return;
        }
        if !self.active.iter().any(|l| l == name) {
            self.active.push(name.to_string());
        } else if self.active.len() == self.locations.len() {
            self.active = vec![name.to_string()];
        }
    }

    pub fn remove_location(&mut self, name: &str) {
        self.active.retain(|l| l != name);
    }

    /// Move the plot's start date, clamped so it never precedes the
    /// first date any page has data for.
    pub fn set_start_date(&mut self, date: NaiveDate) {
        if let Some(min) = self.min_date {
            self.start_date = Some(date.max(min));
        }
    }
}

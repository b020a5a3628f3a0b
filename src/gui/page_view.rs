//! Page View Widget
//! Tabbed central area: one tab per loaded page, with the interactive
//! chart for the visible one. Derived series are cached between frames
//! and rebuilt only when the view changes.

use crate::charts::ChartPlotter;
use crate::data::{derive_series, LocationSeries, PageStore, PopulationTable};
use crate::gui::control_panel::ViewSettings;
use egui::RichText;

/// The chart as derived for one page under one view configuration.
pub struct DerivedChart {
    pub title: String,
    pub ylabel: String,
    pub series: Vec<LocationSeries>,
    pub log_scale: bool,
}

pub struct PageView {
    pub current: usize,
    cache: Option<DerivedChart>,
}

impl Default for PageView {
    fn default() -> Self {
        Self {
            current: 0,
            cache: None,
        }
    }
}

impl PageView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the cached series; the next frame rebuilds them.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Derive the chart for the currently visible page. The page's
    /// options gate each toggle, so a forbidden toggle is simply
    /// inert rather than an error.
    pub fn derive_current(
        &self,
        store: &PageStore,
        settings: &ViewSettings,
        population: Option<&PopulationTable>,
    ) -> Option<DerivedChart> {
        let page = store.page(self.current)?;
        let delta = settings.delta && page.options.delta_allowed;
        let per_capita =
            settings.per_capita && page.options.per_capita_allowed && population.is_some();
        let log_scale = settings.log_scale && page.options.log_allowed;

        let series = derive_series(page, &store.active, delta, per_capita, population);
        Some(DerivedChart {
            title: page.title.clone(),
            ylabel: ChartPlotter::compose_ylabel(&page.options, delta, per_capita),
            series,
            log_scale,
        })
    }

    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        store: &PageStore,
        settings: &ViewSettings,
        population: Option<&PopulationTable>,
    ) {
        if store.is_empty() {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No data").size(20.0));
            });
            return;
        }

        if self.current >= store.pages.len() {
            self.current = 0;
            self.cache = None;
        }

        // Tab bar
        ui.horizontal_wrapped(|ui| {
            for (i, page) in store.pages.iter().enumerate() {
                if ui.selectable_label(self.current == i, &page.title).clicked() && self.current != i
                {
                    self.current = i;
                    self.cache = None;
                }
            }
        });
        ui.separator();

        if self.cache.is_none() {
            self.cache = self.derive_current(store, settings, population);
        }

        if let Some(chart) = &self.cache {
            ChartPlotter::draw_time_series(
                ui,
                &chart.title,
                &chart.series,
                &chart.ylabel,
                chart.log_scale,
                store.start_date,
            );
        }
    }
}

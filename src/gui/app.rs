//! Main Application Window
//! Chart tabs on the left, controls on the right. CSV loading and data
//! refresh run on background threads and report back over channels.

use crate::charts::StaticChartRenderer;
use crate::data::{load_page, load_table_dir, DataPage, PageStore, PopulationTable};
use crate::gui::control_panel::{ControlPanel, ControlPanelAction};
use crate::gui::page_view::PageView;
use crate::prep;
use egui::SidePanel;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Mutex;
use std::thread;

/// CSV loading result from a background thread.
enum LoadResult {
    Progress(String),
    Complete(Vec<DataPage>),
    Error(String),
}

/// Data refresh result from a background thread.
enum FetchResult {
    Progress(f32, String),
    Complete,
    Error(String),
}

/// Main application window.
pub struct CovidApp {
    store: PageStore,
    population: Option<PopulationTable>,
    control_panel: ControlPanel,
    page_view: PageView,

    load_rx: Option<Receiver<LoadResult>>,
    is_loading: bool,
    fetch_rx: Option<Receiver<FetchResult>>,
    is_fetching: bool,
}

impl CovidApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let (store, population) = Self::load_from_disk();
        let mut app = Self {
            store,
            population,
            control_panel: ControlPanel::new(),
            page_view: PageView::new(),
            load_rx: None,
            is_loading: false,
            fetch_rx: None,
            is_fetching: false,
        };
        let loaded = app.store.pages.len();
        if loaded > 0 {
            app.control_panel
                .set_progress(0.0, &format!("Loaded {loaded} tables"));
        } else {
            app.control_panel
                .set_progress(0.0, "No tables found; use Refresh data to download");
        }
        app
    }

    /// Read every page under the tables directory plus the population
    /// table. Per-file failures are logged and skipped.
    fn load_from_disk() -> (PageStore, Option<PopulationTable>) {
        let mut store = PageStore::new();
        for (path, result) in load_table_dir(Path::new(prep::TABLES_DIR)) {
            match result {
                Ok(page) => store.add_page(page),
                Err(err) => log::error!("skipping {}: {err}", path.display()),
            }
        }

        let population = match PopulationTable::load(&prep::population_path()) {
            Ok(table) => Some(table),
            Err(err) => {
                log::warn!("population table unavailable, per-capita scaling disabled: {err}");
                None
            }
        };
        (store, population)
    }

    /// Handle the "Load data" button: pick files, parse them off the
    /// GUI thread.
    fn handle_load_csv(&mut self) {
        if self.is_loading {
            return;
        }
        let Some(paths) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv", "CSV"])
            .pick_files()
        else {
            return;
        };
        if paths.is_empty() {
            return;
        }

        self.control_panel.set_progress(0.0, "Loading CSV files...");
        self.is_loading = true;

        let (tx, rx) = channel();
        self.load_rx = Some(rx);

        thread::spawn(move || {
            let mut pages = Vec::new();
            let mut failures = Vec::new();
            for path in &paths {
                let _ = tx.send(LoadResult::Progress(format!(
                    "Reading {}...",
                    path.display()
                )));
                match load_page(path) {
                    Ok(page) => pages.push(page),
                    Err(err) => failures.push(format!("{}: {err}", path.display())),
                }
            }
            if pages.is_empty() {
                let _ = tx.send(LoadResult::Error(
                    failures.join("; ").trim().to_string(),
                ));
            } else {
                for failure in failures {
                    let _ = tx.send(LoadResult::Progress(format!("Skipped {failure}")));
                }
                let _ = tx.send(LoadResult::Complete(pages));
            }
        });
    }

    fn check_load_results(&mut self) {
        let Some(rx) = self.load_rx.take() else {
            return;
        };
        let mut keep_receiver = true;

        while let Ok(result) = rx.try_recv() {
            match result {
                LoadResult::Progress(status) => {
                    self.control_panel.set_progress(0.0, &status);
                }
                LoadResult::Complete(pages) => {
                    let count = pages.len();
                    for page in pages {
                        self.store.add_page(page);
                    }
                    self.page_view.invalidate();
                    self.control_panel
                        .set_progress(1.0, &format!("Loaded {count} tables"));
                    self.is_loading = false;
                    keep_receiver = false;
                }
                LoadResult::Error(error) => {
                    self.control_panel
                        .set_progress(0.0, &format!("Error: {error}"));
                    self.is_loading = false;
                    keep_receiver = false;
                }
            }
        }

        if keep_receiver {
            self.load_rx = Some(rx);
        }
    }

    /// Handle the "Refresh data" button: re-download everything on a
    /// background thread, then reload the tables directory.
    fn handle_refresh(&mut self) {
        if self.is_fetching {
            return;
        }
        self.is_fetching = true;
        self.control_panel.set_progress(0.0, "Refreshing data...");

        let (tx, rx) = channel();
        self.fetch_rx = Some(rx);

        thread::spawn(move || {
            // prep reports progress from the rayon pool, so the sender
            // has to sit behind a lock.
            let tx = Mutex::new(tx);
            let report = |frac: f32, msg: &str| {
                if let Ok(tx) = tx.lock() {
                    let _ = tx.send(FetchResult::Progress(frac, msg.to_string()));
                }
            };
            let outcome = prep::prepare(&report);
            if let Ok(tx) = tx.lock() {
                let _ = tx.send(match outcome {
                    Ok(()) => FetchResult::Complete,
                    Err(err) => FetchResult::Error(err.to_string()),
                });
            };
        });
    }

    fn check_fetch_results(&mut self) {
        let Some(rx) = self.fetch_rx.take() else {
            return;
        };
        let mut keep_receiver = true;

        while let Ok(result) = rx.try_recv() {
            match result {
                FetchResult::Progress(frac, status) => {
                    self.control_panel.set_progress(frac, &status);
                }
                FetchResult::Complete => {
                    let (store, population) = Self::load_from_disk();
                    self.store = store;
                    self.population = population;
                    self.page_view.invalidate();
                    self.control_panel.set_progress(1.0, "Data refreshed");
                    self.is_fetching = false;
                    keep_receiver = false;
                }
                FetchResult::Error(error) => {
                    self.control_panel
                        .set_progress(0.0, &format!("Error: {error}"));
                    self.is_fetching = false;
                    keep_receiver = false;
                }
            }
        }

        if keep_receiver {
            self.fetch_rx = Some(rx);
        }
    }

    /// Handle the "Save" button: render the visible chart to a PNG.
    fn handle_save_image(&mut self) {
        let Some(chart) = self.page_view.derive_current(
            &self.store,
            &self.control_panel.settings,
            self.population.as_ref(),
        ) else {
            self.control_panel.set_progress(0.0, "No data to save");
            return;
        };

        let default_name: PathBuf = format!("{}.png", chart.title.replace(' ', "_")).into();
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG Image", &["png"])
            .set_file_name(default_name.to_string_lossy())
            .save_file()
        else {
            return;
        };

        match StaticChartRenderer::render_to_file(
            &path,
            &chart.title,
            &chart.ylabel,
            &chart.series,
            chart.log_scale,
            self.store.start_date,
        ) {
            Ok(()) => {
                self.control_panel
                    .set_progress(1.0, &format!("Saved {}", path.display()));
            }
            Err(err) => {
                self.control_panel
                    .set_progress(0.0, &format!("Error: {err}"));
            }
        }
    }
}

impl eframe::App for CovidApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_load_results();
        self.check_fetch_results();

        if self.is_loading || self.is_fetching {
            ctx.request_repaint();
        }

        let page_options = self
            .store
            .page(self.page_view.current)
            .map(|p| p.options.clone());

        SidePanel::right("control_panel")
            .min_width(280.0)
            .max_width(340.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(
                        ui,
                        &mut self.store,
                        page_options.as_ref(),
                        self.population.is_some(),
                    );

                    match action {
                        ControlPanelAction::ViewChanged => self.page_view.invalidate(),
                        ControlPanelAction::LoadCsv => self.handle_load_csv(),
                        ControlPanelAction::SaveImage => self.handle_save_image(),
                        ControlPanelAction::RefreshData => self.handle_refresh(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.page_view.show(
                ui,
                &self.store,
                &self.control_panel.settings,
                self.population.as_ref(),
            );
        });
    }
}

//! Control Panel Widget
//! Right side panel with the plot toggles, date range, location
//! selection, and the load/save/refresh buttons.

use crate::data::{PageOptions, PageStore};
use chrono::Duration;
use egui::{Color32, ComboBox, RichText, ScrollArea, Slider};

/// Sentinel entries at the top of the location dropdown.
const SELECT_ALL: &str = "[All]";
const SELECT_NONE: &str = "[None]";

/// Plot view toggles shared by every page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewSettings {
    pub log_scale: bool,
    pub per_capita: bool,
    pub delta: bool,
}

/// Actions triggered by the control panel, handled by the app.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    /// Any toggle/selection/date change: derived series must be rebuilt.
    ViewChanged,
    LoadCsv,
    SaveImage,
    RefreshData,
}

/// Right side control panel.
pub struct ControlPanel {
    pub settings: ViewSettings,
    pub progress: f32,
    pub status: String,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            settings: ViewSettings::default(),
            progress: 0.0,
            status: "Ready".to_string(),
        }
    }
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set progress (0..1) and status text.
    pub fn set_progress(&mut self, progress: f32, status: &str) {
        self.progress = progress;
        self.status = status.to_string();
    }

    /// Draw the panel. `page_options` belongs to the currently visible
    /// page and decides which toggles are available.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        store: &mut PageStore,
        page_options: Option<&PageOptions>,
        has_population: bool,
    ) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("COVID-19 Data")
                    .size(20.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
        });
        ui.add_space(8.0);
        ui.separator();

        if self.show_toggles(ui, page_options, has_population) {
            action = ControlPanelAction::ViewChanged;
        }

        ui.add_space(10.0);
        ui.separator();

        if self.show_start_date(ui, store) {
            action = ControlPanelAction::ViewChanged;
        }

        ui.add_space(10.0);
        ui.separator();

        if self.show_locations(ui, store) {
            action = ControlPanelAction::ViewChanged;
        }

        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        ui.horizontal(|ui| {
            if ui.button("Load data").clicked() {
                action = ControlPanelAction::LoadCsv;
            }
            if ui.button("Save").clicked() {
                action = ControlPanelAction::SaveImage;
            }
            if ui.button("Refresh data").clicked() {
                action = ControlPanelAction::RefreshData;
            }
        });

        ui.add_space(10.0);
        ui.add(
            egui::ProgressBar::new(self.progress)
                .show_percentage()
                .animate(self.progress > 0.0 && self.progress < 1.0),
        );
        let status_color = if self.status.contains("Error") {
            Color32::from_rgb(220, 53, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        ui.add_space(10.0);
        ui.separator();
        self.show_about(ui);

        action
    }

    /// The three view toggles. Log scale and daily change are mutually
    /// exclusive; pages can forbid each toggle individually.
    fn show_toggles(
        &mut self,
        ui: &mut egui::Ui,
        page_options: Option<&PageOptions>,
        has_population: bool,
    ) -> bool {
        let log_allowed = page_options.is_some_and(|o| o.log_allowed);
        let delta_allowed = page_options.is_some_and(|o| o.delta_allowed);
        let per_capita_allowed = page_options.is_some_and(|o| o.per_capita_allowed) && has_population;

        let mut changed = false;

        let log_label = if !log_allowed {
            "Scale: Linear (logarithmic disabled)"
        } else if self.settings.log_scale {
            "Scale: Logarithmic"
        } else {
            "Scale: Linear"
        };
        ui.label(log_label);
        ui.add_enabled_ui(log_allowed, |ui| {
            if ui
                .checkbox(&mut self.settings.log_scale, "Use log scale")
                .changed()
            {
                if self.settings.log_scale {
                    self.settings.delta = false;
                }
                changed = true;
            }
        });

        ui.add_space(6.0);

        let scaling_label = if !per_capita_allowed {
            "Not scaled by population (scaling disabled)"
        } else if self.settings.per_capita {
            "Scaled by population"
        } else {
            "Not scaled by population"
        };
        ui.label(scaling_label);
        ui.add_enabled_ui(per_capita_allowed, |ui| {
            if ui
                .checkbox(&mut self.settings.per_capita, "Scale by population")
                .changed()
            {
                changed = true;
            }
        });

        ui.add_space(6.0);

        let delta_label = if !delta_allowed {
            "Showing cumulative totals (daily change disabled)"
        } else if self.settings.delta {
            "Showing daily change (7-day rolling average)"
        } else {
            "Showing cumulative totals"
        };
        ui.label(delta_label);
        ui.add_enabled_ui(delta_allowed, |ui| {
            if ui
                .checkbox(&mut self.settings.delta, "Show daily change")
                .changed()
            {
                if self.settings.delta {
                    self.settings.log_scale = false;
                }
                changed = true;
            }
        });

        changed
    }

    fn show_start_date(&mut self, ui: &mut egui::Ui, store: &mut PageStore) -> bool {
        let (Some(min), Some(max)) = (store.min_date, store.max_date) else {
            ui.label("Start Date: no data loaded");
            return false;
        };

        let total_days = (max - min).num_days().max(0);
        let mut offset = store
            .start_date
            .map(|start| (start - min).num_days())
            .unwrap_or(0)
            .clamp(0, total_days);

        ui.label("Start Date:");
        let response = ui.add(
            Slider::new(&mut offset, 0..=total_days).custom_formatter(move |v, _| {
                (min + Duration::days(v as i64))
                    .format("%b %d, %Y")
                    .to_string()
            }),
        );
        if response.changed() {
            store.set_start_date(min + Duration::days(offset));
            return true;
        }
        false
    }

    fn show_locations(&mut self, ui: &mut egui::Ui, store: &mut PageStore) -> bool {
        let mut changed = false;

        ui.horizontal(|ui| {
            ui.label("Location:");
            ComboBox::from_id_salt("location_picker")
                .width(170.0)
                .selected_text("Add location...")
                .show_ui(ui, |ui| {
                    if ui.selectable_label(false, SELECT_ALL).clicked() {
                        store.select_all();
                        changed = true;
                    }
                    if ui.selectable_label(false, SELECT_NONE).clicked() {
                        store.clear_selection();
                        changed = true;
                    }
                    for name in store.locations.clone() {
                        let selected = store.active.iter().any(|a| *a == name);
                        if ui.selectable_label(selected, &name).clicked() {
                            store.add_location(&name);
                            changed = true;
                        }
                    }
                });
        });

        ui.label(RichText::new("Click items to remove.").size(11.0));
        ScrollArea::vertical()
            .id_salt("active_locations")
            .max_height(220.0)
            .show(ui, |ui| {
                for name in store.active.clone() {
                    if ui.selectable_label(false, &name).clicked() {
                        store.remove_location(&name);
                        changed = true;
                    }
                }
            });

        changed
    }

    fn show_about(&self, ui: &mut egui::Ui) {
        ui.label(RichText::new("Data sources").strong());
        ui.label(RichText::new("Confirmed cases and deaths:").italics().size(11.0));
        ui.hyperlink_to(
            "github.com/CSSEGISandData/COVID-19",
            "https://github.com/CSSEGISandData/COVID-19",
        );
        ui.label(RichText::new("Testing and populations:").italics().size(11.0));
        ui.hyperlink_to("covidtracking.com", "https://covidtracking.com/");
        ui.label(
            RichText::new(
                "Population is the sum of populations for all locales within a \
                 state or territory. Test positivity is the ratio of reported \
                 positive tests to reported tests.",
            )
            .size(11.0),
        );
    }
}

//! Chart Plotter Module
//! Interactive time-series plots using egui_plot: date axis, compact
//! count labels, optional log-scale rendering.

use crate::data::{LocationSeries, PageOptions};
use chrono::{Duration, NaiveDate};
use egui::Color32;
use egui_plot::{Legend, Line, Plot, PlotPoints};

/// Legends get unreadable past this many series.
pub const LEGEND_LIMIT: usize = 20;

/// Color palette for location lines.
pub const PALETTE: [Color32; 10] = [
    Color32::from_rgb(52, 152, 219),  // Blue
    Color32::from_rgb(231, 76, 60),   // Red
    Color32::from_rgb(46, 204, 113),  // Green
    Color32::from_rgb(155, 89, 182),  // Purple
    Color32::from_rgb(243, 156, 18),  // Orange
    Color32::from_rgb(26, 188, 156),  // Teal
    Color32::from_rgb(233, 30, 99),   // Pink
    Color32::from_rgb(0, 188, 212),   // Cyan
    Color32::from_rgb(255, 87, 34),   // Deep Orange
    Color32::from_rgb(121, 85, 72),   // Brown
];

/// Creates the interactive time-series chart using egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    pub fn series_color(index: usize) -> Color32 {
        PALETTE[index % PALETTE.len()]
    }

    /// Plot x values are days since the Unix epoch.
    pub fn day_offset(date: NaiveDate) -> f64 {
        (date - NaiveDate::default()).num_days() as f64
    }

    pub fn offset_date(offset: f64) -> Option<NaiveDate> {
        NaiveDate::default().checked_add_signed(Duration::days(offset.round() as i64))
    }

    /// X tick label, e.g. "Mar 01".
    pub fn format_date_tick(offset: f64) -> String {
        Self::offset_date(offset)
            .map(|d| d.format("%b %d").to_string())
            .unwrap_or_default()
    }

    /// Compact count label: millions as "1.2M", ten-thousands as "12K",
    /// small integers plain, fractions with two decimals.
    pub fn format_count(value: f64) -> String {
        let magnitude = value.abs();
        if magnitude >= 1e6 {
            format!("{:.1}M", value / 1e6)
        } else if magnitude >= 1e4 {
            format!("{:.0}K", value / 1e3)
        } else if value == value.round() {
            format!("{value:.0}")
        } else {
            format!("{value:.2}")
        }
    }

    /// Y tick label under log scale: the tick value is log10 of the
    /// real count, so de-transform before formatting.
    pub fn format_log_tick(value: f64) -> String {
        Self::format_count(10f64.powf(value))
    }

    /// Y-axis label for the current view, e.g.
    /// "Daily New Cases per 1,000,000 People".
    pub fn compose_ylabel(options: &PageOptions, delta: bool, per_capita: bool) -> String {
        let mut label = options.ylabel.clone();
        if delta {
            label = format!("Daily New {label}");
        }
        if per_capita {
            match options.suggested_scaling {
                Some(scaling) => {
                    label = format!("{label} per {} People", group_thousands(scaling));
                }
                None => label = format!("{label} per Capita"),
            }
        }
        label
    }

    /// Draw the chart for one page's derived series. Points before
    /// `start_date` are clipped; under log scale non-positive samples
    /// are dropped and y values are plotted as log10.
    pub fn draw_time_series(
        ui: &mut egui::Ui,
        plot_id: &str,
        series: &[LocationSeries],
        ylabel: &str,
        log_scale: bool,
        start_date: Option<NaiveDate>,
    ) {
        let mut plot = Plot::new(format!("page_{plot_id}"))
            .x_axis_label("Date")
            .y_axis_label(ylabel.to_string())
            .allow_scroll(false)
            .x_axis_formatter(|mark, _range| Self::format_date_tick(mark.value))
            .y_axis_formatter(move |mark, _range| {
                if log_scale {
                    Self::format_log_tick(mark.value)
                } else {
                    Self::format_count(mark.value)
                }
            });

        if series.len() < LEGEND_LIMIT {
            plot = plot.legend(Legend::default());
        }

        plot.show(ui, |plot_ui| {
            for (i, location) in series.iter().enumerate() {
                let points: PlotPoints = location
                    .points
                    .iter()
                    .filter(|(date, _)| start_date.map_or(true, |start| *date >= start))
                    .filter_map(|(date, value)| {
                        let y = if log_scale {
                            if *value > 0.0 {
                                value.log10()
                            } else {
                                return None;
                            }
                        } else {
                            *value
                        };
                        Some([Self::day_offset(*date), y])
                    })
                    .collect();

                plot_ui.line(
                    Line::new(points)
                        .color(Self::series_color(i))
                        .width(1.5)
                        .name(&location.name),
                );
            }
        });
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_offsets_round_trip() {
        let date = NaiveDate::from_ymd_opt(2020, 3, 15).unwrap();
        let offset = ChartPlotter::day_offset(date);
        assert_eq!(ChartPlotter::offset_date(offset), Some(date));
        assert_eq!(ChartPlotter::format_date_tick(offset), "Mar 15");
    }

    #[test]
    fn count_labels_compact() {
        assert_eq!(ChartPlotter::format_count(2_500_000.0), "2.5M");
        assert_eq!(ChartPlotter::format_count(12_000.0), "12K");
        assert_eq!(ChartPlotter::format_count(950.0), "950");
        assert_eq!(ChartPlotter::format_count(0.25), "0.25");
    }

    #[test]
    fn log_ticks_show_real_magnitudes() {
        assert_eq!(ChartPlotter::format_log_tick(3.0), "1000");
        assert_eq!(ChartPlotter::format_log_tick(6.0), "1.0M");
    }

    #[test]
    fn ylabel_composition() {
        let options = PageOptions {
            ylabel: "Cases".into(),
            suggested_scaling: Some(1_000_000),
            ..PageOptions::default()
        };
        assert_eq!(ChartPlotter::compose_ylabel(&options, false, false), "Cases");
        assert_eq!(
            ChartPlotter::compose_ylabel(&options, true, false),
            "Daily New Cases"
        );
        assert_eq!(
            ChartPlotter::compose_ylabel(&options, true, true),
            "Daily New Cases per 1,000,000 People"
        );

        let unscaled = PageOptions {
            ylabel: "Tests".into(),
            ..PageOptions::default()
        };
        assert_eq!(
            ChartPlotter::compose_ylabel(&unscaled, false, true),
            "Tests per Capita"
        );
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(1_000_000), "1,000,000");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(120), "120");
    }
}

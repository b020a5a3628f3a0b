//! Static Chart Renderer
//! Renders the currently derived series to a PNG file with plotters,
//! matching the interactive chart's palette and axis labels.

use crate::charts::plotter::{ChartPlotter, LEGEND_LIMIT, PALETTE};
use crate::data::LocationSeries;
use chrono::NaiveDate;
use plotters::prelude::*;
use std::path::Path;
use thiserror::Error;

const IMAGE_SIZE: (u32, u32) = (1200, 800);

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("No data selected to render")]
    EmptySelection,
    #[error("Failed to render chart: {0}")]
    Backend(String),
}

/// Generates static chart images for the Save button.
pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render the given series to `path` as a PNG. Applies the same
    /// start-date clipping and log transform as the on-screen chart.
    pub fn render_to_file(
        path: &Path,
        title: &str,
        ylabel: &str,
        series: &[LocationSeries],
        log_scale: bool,
        start_date: Option<NaiveDate>,
    ) -> Result<(), RenderError> {
        let screen_series = Self::to_screen_series(series, log_scale, start_date);
        let (x_range, y_range) =
            Self::ranges(&screen_series).ok_or(RenderError::EmptySelection)?;

        let root = BitMapBackend::new(path, IMAGE_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(stringify)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(48)
            .y_label_area_size(80)
            .build_cartesian_2d(x_range, y_range)
            .map_err(stringify)?;

        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc(ylabel)
            .x_label_formatter(&|v| ChartPlotter::format_date_tick(*v))
            .y_label_formatter(&|v| {
                if log_scale {
                    ChartPlotter::format_log_tick(*v)
                } else {
                    ChartPlotter::format_count(*v)
                }
            })
            .light_line_style(RGBColor(211, 211, 211))
            .draw()
            .map_err(stringify)?;

        for (i, (name, points)) in screen_series.iter().enumerate() {
            let color = Self::palette_rgb(i);
            chart
                .draw_series(LineSeries::new(
                    points.iter().copied(),
                    color.stroke_width(2),
                ))
                .map_err(stringify)?
                .label(name)
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2))
                });
        }

        if screen_series.len() < LEGEND_LIMIT {
            chart
                .configure_series_labels()
                .border_style(BLACK)
                .background_style(WHITE.mix(0.85))
                .draw()
                .map_err(stringify)?;
        }

        root.present().map_err(stringify)?;
        log::info!("saved chart image to {}", path.display());
        Ok(())
    }

    fn palette_rgb(index: usize) -> RGBColor {
        let c = PALETTE[index % PALETTE.len()];
        RGBColor(c.r(), c.g(), c.b())
    }

    /// Same point mapping as the interactive chart: x is the day
    /// offset, y is log10 under log scale (non-positive dropped).
    fn to_screen_series(
        series: &[LocationSeries],
        log_scale: bool,
        start_date: Option<NaiveDate>,
    ) -> Vec<(String, Vec<(f64, f64)>)> {
        series
            .iter()
            .map(|location| {
                let points = location
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
                        Some((ChartPlotter::day_offset(*date), y))
                    })
                    .collect();
                (location.name.clone(), points)
            })
            .collect()
    }

    fn ranges(
        series: &[(String, Vec<(f64, f64)>)],
    ) -> Option<(std::ops::Range<f64>, std::ops::Range<f64>)> {
        let mut x_min = f64::INFINITY;
        let mut x_max = f64::NEG_INFINITY;
        let mut y_min = f64::INFINITY;
        let mut y_max = f64::NEG_INFINITY;
        for (_, points) in series {
            for &(x, y) in points {
                x_min = x_min.min(x);
                x_max = x_max.max(x);
                y_min = y_min.min(y);
                y_max = y_max.max(y);
            }
        }
        if !x_min.is_finite() || x_min >= x_max {
            return None;
        }
        let pad = ((y_max - y_min) * 0.05).max(1e-9);
        Some((x_min..x_max, (y_min - pad)..(y_max + pad)))
    }
}

fn stringify<E: std::fmt::Display>(err: E) -> RenderError {
    RenderError::Backend(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(points: Vec<(NaiveDate, f64)>) -> LocationSeries {
        LocationSeries {
            name: "Ohio".into(),
            points,
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, d).unwrap()
    }

    #[test]
    fn screen_mapping_clips_and_transforms() {
        let input = vec![series(vec![
            (date(1), 10.0),
            (date(2), 0.0),
            (date(3), 1000.0),
        ])];
        let mapped = StaticChartRenderer::to_screen_series(&input, true, Some(date(2)));
        // date(1) clipped by start date, 0.0 dropped by log transform
        assert_eq!(mapped[0].1.len(), 1);
        assert_eq!(mapped[0].1[0].1, 3.0);
    }

    #[test]
    fn empty_selection_has_no_ranges() {
        let mapped = StaticChartRenderer::to_screen_series(&[], false, None);
        assert!(StaticChartRenderer::ranges(&mapped).is_none());
    }

    #[test]
    fn ranges_padded() {
        let input = vec![series(vec![(date(1), 0.0), (date(5), 100.0)])];
        let mapped = StaticChartRenderer::to_screen_series(&input, false, None);
        let (x, y) = StaticChartRenderer::ranges(&mapped).unwrap();
        assert_eq!(x.end - x.start, 4.0);
        assert!(y.start < 0.0 && y.end > 100.0);
    }
}

//! Series Transform Module
//! Derived metrics applied per location column before plotting: daily
//! differences, triangular-weighted smoothing, population scaling.

use crate::data::page::DataPage;
use crate::data::population::PopulationTable;
use chrono::NaiveDate;

/// Window used when smoothing daily changes, matching the upstream
/// 7-day rolling average.
pub const SMOOTHING_WINDOW: usize = 7;

/// One plottable series for a single location.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSeries {
    pub name: String,
    pub points: Vec<(NaiveDate, f64)>,
}

/// First difference of a series. The first element is always `None`,
/// as is any element adjacent to a gap.
pub fn daily_delta(values: &[Option<f64>]) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            if i == 0 {
                None
            } else {
                match (values[i - 1], v) {
                    (Some(prev), Some(cur)) => Some(cur - prev),
                    _ => None,
                }
            }
        })
        .collect()
}

/// Trailing weighted mean with triangular weights (1, 2, ..., peak, ..., 2, 1).
/// Emits `None` until a full window of values exists and whenever the
/// window contains a gap.
pub fn triangular_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 || window > values.len() {
        return vec![None; values.len()];
    }

    let weights: Vec<f64> = (0..window)
        .map(|k| (k + 1).min(window - k) as f64)
        .collect();
    let weight_sum: f64 = weights.iter().sum();

    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if i + 1 < window {
                return None;
            }
            let start = i + 1 - window;
            let mut acc = 0.0;
            for (j, w) in weights.iter().enumerate() {
                match values[start + j] {
                    Some(v) => acc += v * w,
                    None => return None,
                }
            }
            Some(acc / weight_sum)
        })
        .collect()
}

/// Divide a series by a population count, optionally rescaled so values
/// read as "per N people".
pub fn per_capita(values: &[Option<f64>], population: f64, scaling: Option<u64>) -> Vec<Option<f64>> {
    if population <= 0.0 {
        return vec![None; values.len()];
    }
    let factor = scaling.unwrap_or(1) as f64 / population;
    values.iter().map(|v| v.map(|x| x * factor)).collect()
}

/// Derive the plottable series for the active locations of a page.
///
/// `delta` and `scale_by_population` are the user's toggles; each only
/// takes effect where the page allows it. Locations absent from the
/// page, and locations without a known population when scaling, are
/// skipped. Gaps (`None`) are dropped from the output points.
pub fn derive_series(
    page: &DataPage,
    active: &[String],
    delta: bool,
    scale_by_population: bool,
    population: Option<&PopulationTable>,
) -> Vec<LocationSeries> {
    let mut out = Vec::new();
    for name in active {
        let Some(mut values) = page.column_values(name) else {
            continue;
        };

        if delta && page.options.delta_allowed {
            values = triangular_mean(&daily_delta(&values), SMOOTHING_WINDOW);
        }

        if scale_by_population && page.options.per_capita_allowed {
            let Some(pop) = population.and_then(|p| p.get(name)) else {
                log::warn!("no population known for {name}, skipping");
                continue;
            };
            values = per_capita(&values, pop, page.options.suggested_scaling);
        }

        let points = page
            .dates
            .iter()
            .zip(values)
            .filter_map(|(d, v)| v.map(|v| (*d, v)))
            .collect();
        out.push(LocationSeries {
            name: name.clone(),
            points,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::page::PageOptions;
    use polars::prelude::*;

    #[test]
    fn delta_of_ramp() {
        let values: Vec<Option<f64>> = (0..5).map(|i| Some((i * i) as f64)).collect();
        assert_eq!(
            daily_delta(&values),
            vec![None, Some(1.0), Some(3.0), Some(5.0), Some(7.0)]
        );
    }

    #[test]
    fn delta_propagates_gaps() {
        let values = vec![Some(1.0), None, Some(4.0)];
        assert_eq!(daily_delta(&values), vec![None, None, None]);
    }

    #[test]
    fn triangular_weights_hand_computed() {
        // window 3 weights are 1,2,1; mean of [1,2,3] = (1 + 4 + 3)/4
        let values = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        let smoothed = triangular_mean(&values, 3);
        assert_eq!(smoothed[0], None);
        assert_eq!(smoothed[1], None);
        assert_eq!(smoothed[2], Some(2.0));
        assert_eq!(smoothed[3], Some(3.0));
    }

    #[test]
    fn triangular_constant_series_is_identity() {
        let values = vec![Some(5.0); 10];
        let smoothed = triangular_mean(&values, SMOOTHING_WINDOW);
        assert!(smoothed[..6].iter().all(|v| v.is_none()));
        for v in &smoothed[6..] {
            assert!((v.unwrap() - 5.0).abs() < 1e-12);
        }
    }

    #[test]
    fn triangular_gap_blanks_window() {
        let mut values = vec![Some(1.0); 10];
        values[4] = None;
        let smoothed = triangular_mean(&values, 3);
        assert_eq!(smoothed[3], Some(1.0));
        assert_eq!(smoothed[4], None);
        assert_eq!(smoothed[5], None);
        assert_eq!(smoothed[6], None);
        assert_eq!(smoothed[7], Some(1.0));
    }

    #[test]
    fn per_capita_scaling() {
        let values = vec![Some(50.0), None];
        assert_eq!(
            per_capita(&values, 1000.0, None),
            vec![Some(0.05), None]
        );
        assert_eq!(
            per_capita(&values, 1000.0, Some(1_000_000)),
            vec![Some(50_000.0), None]
        );
        assert_eq!(per_capita(&values, 0.0, None), vec![None, None]);
    }

    fn test_page(delta_allowed: bool, per_capita_allowed: bool) -> DataPage {
        let frame = DataFrame::new(vec![Column::new(
            "Ohio".into(),
            vec![Some(10.0), Some(20.0), Some(40.0)],
        )])
        .unwrap();
        let dates = (1..=3)
            .map(|d| NaiveDate::from_ymd_opt(2020, 4, d).unwrap())
            .collect();
        DataPage::new(
            "Cases".into(),
            dates,
            frame,
            PageOptions {
                ylabel: "Cases".into(),
                log_allowed: true,
                per_capita_allowed,
                delta_allowed,
                suggested_scaling: None,
            },
        )
    }

    #[test]
    fn derive_plain_series_drops_gaps() {
        let page = test_page(true, true);
        let series = derive_series(&page, &["Ohio".into()], false, false, None);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].name, "Ohio");
        assert_eq!(series[0].points.len(), 3);
        assert_eq!(series[0].points[2].1, 40.0);
    }

    #[test]
    fn derive_skips_unknown_locations() {
        let page = test_page(true, true);
        let series = derive_series(&page, &["Narnia".into()], false, false, None);
        assert!(series.is_empty());
    }

    #[test]
    fn delta_toggle_respects_page_options() {
        let page = test_page(false, false);
        // delta requested but not allowed: raw values come through
        let series = derive_series(&page, &["Ohio".into()], true, false, None);
        assert_eq!(series[0].points[0].1, 10.0);
    }
}

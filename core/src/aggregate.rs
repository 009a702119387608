//! Rolling statistics and chart-ready series for the dashboard.
//!
//! Input is always the cached collection, newest date first.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::HealthRecord;

/// Number of most recent records shown on the dashboard.
pub const DEFAULT_WINDOW: usize = 7;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WindowSummary {
    pub avg_morning: f64,
    pub avg_evening: f64,
    pub evening_minus_morning_avg: f64,
    /// Share of days with a bowel movement, as an integer percentage.
    pub bm_rate: u32,
    pub bm_days: usize,
    pub total_days: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BmSplit {
    pub with_bm: usize,
    pub without_bm: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightPoint {
    pub date: NaiveDate,
    pub morning: f64,
    pub evening: f64,
}

/// Everything the dashboard view needs, computed in one pass over the cache.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub window_days: usize,
    pub summary: WindowSummary,
    pub series: Vec<WeightPoint>,
    pub bm_split: BmSplit,
    pub total_records: usize,
}

impl Dashboard {
    #[must_use]
    pub fn build(records: &[HealthRecord], window_days: usize) -> Self {
        let window = recent_window(records, window_days);
        Self {
            window_days,
            summary: summary(&window),
            series: weight_series(&window),
            bm_split: bm_split(records),
            total_records: records.len(),
        }
    }
}

/// The `n` most recent records, oldest first for charting.
#[must_use]
pub fn recent_window(records: &[HealthRecord], n: usize) -> Vec<HealthRecord> {
    records.iter().take(n).rev().cloned().collect()
}

/// Averages and bowel-movement rate over a window. An empty window is all zeros.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summary(window: &[HealthRecord]) -> WindowSummary {
    if window.is_empty() {
        return WindowSummary::default();
    }

    let days = window.len() as f64;
    let sum_morning: f64 = window.iter().map(|r| r.morning_weight).sum();
    let sum_evening: f64 = window.iter().map(|r| r.evening_weight).sum();
    let bm_days = window.iter().filter(|r| r.has_bm).count();

    WindowSummary {
        avg_morning: round1(sum_morning / days),
        avg_evening: round1(sum_evening / days),
        evening_minus_morning_avg: round1((sum_evening - sum_morning) / days),
        bm_rate: percentage(bm_days, window.len()),
        bm_days,
        total_days: window.len(),
    }
}

/// Days with and without a bowel movement across the whole collection.
#[must_use]
pub fn bm_split(records: &[HealthRecord]) -> BmSplit {
    let with_bm = records.iter().filter(|r| r.has_bm).count();
    BmSplit {
        with_bm,
        without_bm: records.len() - with_bm,
    }
}

#[must_use]
pub fn weight_series(window: &[HealthRecord]) -> Vec<WeightPoint> {
    window
        .iter()
        .map(|r| WeightPoint {
            date: r.date,
            morning: r.morning_weight,
            evening: r.evening_weight,
        })
        .collect()
}

/// Round half away from zero to one decimal place, without negative zero.
#[must_use]
pub fn round1(v: f64) -> f64 {
    let r = (v * 10.0).round() / 10.0;
    if r == 0.0 { 0.0 } else { r }
}

#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 * 100.0 / whole as f64).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(day: u32, morning: f64, evening: f64, has_bm: bool) -> HealthRecord {
        HealthRecord {
            id: format!("id-{day}"),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            morning_weight: morning,
            evening_weight: evening,
            has_bm,
            bm_count: u32::from(has_bm),
            notes: None,
        }
    }

    /// Ten days, newest first.
    fn history() -> Vec<HealthRecord> {
        (1..=10)
            .rev()
            .map(|d| rec(d, 130.0 + f64::from(d) / 10.0, 131.0 + f64::from(d) / 10.0, d % 3 == 0))
            .collect()
    }

    #[test]
    fn test_recent_window_oldest_first() {
        let window = recent_window(&history(), 7);
        assert_eq!(window.len(), 7);
        assert_eq!(window[0].date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
        assert_eq!(window[6].date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    }

    #[test]
    fn test_recent_window_shorter_than_n() {
        let records = vec![rec(2, 130.0, 131.0, false), rec(1, 129.0, 130.0, true)];
        let window = recent_window(&records, 7);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].id, "id-1");
        assert_eq!(window[1].id, "id-2");
    }

    #[test]
    fn test_summary_empty_is_zero() {
        let s = summary(&[]);
        assert_eq!(s, WindowSummary::default());
        assert_eq!(s.bm_rate, 0);
        assert!(!s.avg_morning.is_nan());
    }

    #[test]
    fn test_summary_averages() {
        let window = vec![
            rec(1, 130.0, 132.0, true),
            rec(2, 131.0, 132.5, false),
            rec(3, 129.5, 131.0, true),
        ];
        let s = summary(&window);
        // (130 + 131 + 129.5) / 3 = 130.1666..
        assert!((s.avg_morning - 130.2).abs() < 1e-9);
        // (132 + 132.5 + 131) / 3 = 131.8333..
        assert!((s.avg_evening - 131.8).abs() < 1e-9);
        // (2 + 1.5 + 1.5) / 3 = 1.666..
        assert!((s.evening_minus_morning_avg - 1.7).abs() < 1e-9);
        assert_eq!(s.bm_days, 2);
        assert_eq!(s.total_days, 3);
        // 2/3 = 66.67% -> 67
        assert_eq!(s.bm_rate, 67);
    }

    #[test]
    fn test_bm_rate_matches_rounded_ratio() {
        for n in 1..=9 {
            let window: Vec<_> = (1..=n).map(|d| rec(d, 130.0, 131.0, d % 2 == 0)).collect();
            let s = summary(&window);
            let expected = (100.0 * s.bm_days as f64 / s.total_days as f64).round() as u32;
            assert_eq!(s.bm_rate, expected);
            assert!(s.bm_rate <= 100);
        }
    }

    #[test]
    fn test_evening_below_morning_is_negative() {
        let s = summary(&[rec(1, 132.0, 131.0, false)]);
        assert!((s.evening_minus_morning_avg + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_bm_split_covers_whole_collection() {
        let records = history();
        let split = bm_split(&records);
        // days 3, 6, 9
        assert_eq!(split.with_bm, 3);
        assert_eq!(split.without_bm, 7);
        assert_eq!(bm_split(&[]), BmSplit::default());
    }

    #[test]
    fn test_dashboard_build() {
        let records = history();
        let dash = Dashboard::build(&records, DEFAULT_WINDOW);
        assert_eq!(dash.total_records, 10);
        assert_eq!(dash.series.len(), 7);
        assert_eq!(dash.summary.total_days, 7);
        assert_eq!(dash.bm_split.with_bm + dash.bm_split.without_bm, 10);
        assert_eq!(dash.series.last().unwrap().date, records[0].date);
    }

    #[test]
    fn test_round1() {
        assert!((round1(130.16) - 130.2).abs() < 1e-9);
        assert!((round1(130.14) - 130.1).abs() < 1e-9);
        assert_eq!(round1(-0.04).to_bits(), 0.0_f64.to_bits());
    }
}

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::HealthRecord;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Inclusive date bounds for the history view. Either end may be open.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl HistoryFilter {
    #[must_use]
    pub fn matches(&self, record: &HealthRecord) -> bool {
        self.start.is_none_or(|s| record.date >= s) && self.end.is_none_or(|e| record.date <= e)
    }

    #[must_use]
    pub fn apply<'a>(&self, records: &'a [HealthRecord]) -> Vec<&'a HealthRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage<'a> {
    pub page: usize,
    pub total_pages: usize,
    pub total_records: usize,
    pub records: Vec<&'a HealthRecord>,
}

/// Slice a filtered list into 1-based pages. Out-of-range pages clamp to the
/// nearest valid one, so page 0 and page 99 are never empty when data exists.
#[must_use]
pub fn paginate<'a>(
    records: Vec<&'a HealthRecord>,
    page: usize,
    per_page: usize,
) -> HistoryPage<'a> {
    let per_page = per_page.max(1);
    let total_records = records.len();
    let total_pages = total_records.div_ceil(per_page);
    let page = page.clamp(1, total_pages.max(1));
    let records = records
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();
    HistoryPage {
        page,
        total_pages,
        total_records,
        records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn records(n: u32) -> Vec<HealthRecord> {
        (1..=n)
            .rev()
            .map(|d| HealthRecord {
                id: d.to_string(),
                date: date(d),
                morning_weight: 130.0,
                evening_weight: 131.0,
                has_bm: false,
                bm_count: 0,
                notes: None,
            })
            .collect()
    }

    #[test]
    fn test_filter_inclusive_bounds() {
        let all = records(10);
        let filter = HistoryFilter {
            start: Some(date(3)),
            end: Some(date(5)),
        };
        let hits = filter.apply(&all);
        let days: Vec<_> = hits.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(days, ["5", "4", "3"]);
    }

    #[test]
    fn test_filter_open_ends() {
        let all = records(10);
        let from = HistoryFilter {
            start: Some(date(8)),
            end: None,
        };
        assert_eq!(from.apply(&all).len(), 3);

        let until = HistoryFilter {
            start: None,
            end: Some(date(2)),
        };
        assert_eq!(until.apply(&all).len(), 2);

        assert_eq!(HistoryFilter::default().apply(&all).len(), 10);
    }

    #[test]
    fn test_paginate() {
        let all = records(23);
        let page = paginate(all.iter().collect(), 3, DEFAULT_PAGE_SIZE);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_records, 23);
        assert_eq!(page.records.len(), 3);
        assert_eq!(page.records[0].id, "3");
    }

    #[test]
    fn test_paginate_clamps() {
        let all = records(12);
        let page = paginate(all.iter().collect(), 99, DEFAULT_PAGE_SIZE);
        assert_eq!(page.page, 2);
        assert_eq!(page.records.len(), 2);

        let page = paginate(all.iter().collect(), 0, DEFAULT_PAGE_SIZE);
        assert_eq!(page.page, 1);
        assert_eq!(page.records.len(), 10);
    }

    #[test]
    fn test_paginate_empty() {
        let page = paginate(Vec::new(), 1, DEFAULT_PAGE_SIZE);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 0);
        assert!(page.records.is_empty());
    }
}

//! Record-level filter applied before any aggregation.

use adboard_core::source::FetchQuery;
use adboard_core::AdRecord;
use serde::{Deserialize, Serialize};

use crate::period::DateRange;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub franchise: Option<String>,
    pub account_id: Option<String>,
    pub objective: Option<String>,
    pub range: Option<DateRange>,
}

impl RecordFilter {
    /// The same filter over a different date window.
    pub fn with_range(&self, range: Option<DateRange>) -> Self {
        Self {
            range,
            ..self.clone()
        }
    }

    pub fn matches(&self, record: &AdRecord) -> bool {
        if !matches_text(self.franchise.as_deref(), &record.franchise)
            || !matches_text(self.account_id.as_deref(), &record.account_id)
            || !matches_text(self.objective.as_deref(), &record.objective)
        {
            return false;
        }
        match (self.range, record.date) {
            (None, _) => true,
            (Some(range), Some(date)) => range.contains(date),
            (Some(_), None) => false,
        }
    }

    pub fn apply(&self, records: &[AdRecord]) -> Vec<AdRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }

    /// Backend query covering this filter. The objective is applied
    /// locally only.
    pub fn fetch_query(&self) -> FetchQuery {
        FetchQuery {
            franchise: self.franchise.clone(),
            account_id: self.account_id.clone(),
            start: self.range.map(|r| r.start),
            end: self.range.map(|r| r.end),
        }
    }
}

fn matches_text(expected: Option<&str>, actual: &str) -> bool {
    match expected.map(str::trim) {
        None | Some("") => true,
        Some(expected) => expected.to_lowercase() == actual.trim().to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;
    use chrono::NaiveDate;

    #[test]
    fn test_filters_compose() {
        let mut other_franchise = record("B", 5.0, 0.0);
        other_franchise.franchise = "Loja Norte".into();
        let mut undated = record("C", 5.0, 0.0);
        undated.date = None;
        let records = vec![record("A", 10.0, 1.0), other_franchise, undated];

        let by_franchise = RecordFilter {
            franchise: Some(" loja centro ".into()),
            ..Default::default()
        };
        assert_eq!(by_franchise.apply(&records).len(), 2);

        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        )
        .unwrap();
        let dated = by_franchise.with_range(Some(range));
        let kept = dated.apply(&records);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].ad_id, "A");

        let query = dated.fetch_query();
        assert_eq!(query.start, Some(range.start));
        assert_eq!(query.franchise.as_deref(), Some(" loja centro "));
    }

    #[test]
    fn test_empty_filter_values_match_everything() {
        let filter = RecordFilter {
            objective: Some("".into()),
            ..Default::default()
        };
        assert!(filter.matches(&record("A", 1.0, 0.0)));
    }
}

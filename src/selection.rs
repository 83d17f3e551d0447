use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::loader::WorkEntry;

/// Distinct production dates present in the entries, ascending
pub fn available_dates(entries: &[WorkEntry]) -> Vec<NaiveDate> {
    entries
        .iter()
        .filter_map(|entry| entry.production_date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The set of production dates a report covers
///
/// An empty selection means "every entry", which is what a workbook without
/// a date column always gets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateSelection {
    dates: BTreeSet<NaiveDate>,
}

impl DateSelection {
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }

    /// Resolve the dates a user asked for against the dates the workbook has
    ///
    /// Requested dates missing from the workbook are dropped. When nothing
    /// is left the selection falls back to the latest available date.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use workorder_report::selection::DateSelection;
    ///
    /// let d = |day| NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
    /// let available = vec![d(1), d(2), d(3)];
    ///
    /// let picked = DateSelection::resolve(&[d(1), d(3), d(9)], &available);
    /// assert_eq!(picked.dates().collect::<Vec<_>>(), vec![d(1), d(3)]);
    ///
    /// let fallback = DateSelection::resolve(&[], &available);
    /// assert_eq!(fallback.dates().collect::<Vec<_>>(), vec![d(3)]);
    /// ```
    pub fn resolve(requested: &[NaiveDate], available: &[NaiveDate]) -> Self {
        let mut dates: BTreeSet<NaiveDate> = requested
            .iter()
            .filter(|date| available.contains(date))
            .copied()
            .collect();

        if dates.is_empty() {
            if let Some(latest) = available.iter().max() {
                dates.insert(*latest);
            }
        }

        Self { dates }
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.dates.contains(date)
    }

    /// Selected dates in ascending order
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates.iter().copied()
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Keep the entries that fall on a selected date
    ///
    /// Undated entries only survive an empty selection.
    pub fn filter(&self, entries: &[WorkEntry]) -> Vec<WorkEntry> {
        if self.dates.is_empty() {
            return entries.to_vec();
        }

        entries
            .iter()
            .filter(|entry| {
                entry
                    .production_date
                    .is_some_and(|date| self.dates.contains(&date))
            })
            .cloned()
            .collect()
    }

    /// Human-readable summary shown above the report
    pub fn label(&self) -> String {
        if self.dates.is_empty() {
            return "All dates".to_string();
        }

        self.dates
            .iter()
            .map(|date| date.format("%Y-%m-%d").to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn entry(kind: &str, hours: f64, date: Option<NaiveDate>) -> WorkEntry {
        WorkEntry {
            kind: kind.to_string(),
            hours,
            production_date: date,
        }
    }

    #[test]
    fn available_dates_are_distinct_and_sorted() {
        let entries = vec![
            entry("a", 1.0, Some(d(3))),
            entry("b", 1.0, None),
            entry("c", 1.0, Some(d(1))),
            entry("d", 1.0, Some(d(3))),
        ];
        assert_eq!(available_dates(&entries), vec![d(1), d(3)]);
    }

    #[test]
    fn undated_workbook_selects_everything() {
        let entries = vec![entry("a", 1.0, None), entry("b", 2.0, None)];
        let selection = DateSelection::resolve(&[d(1)], &available_dates(&entries));

        assert!(selection.is_empty());
        assert_eq!(selection.filter(&entries), entries);
        assert_eq!(selection.label(), "All dates");
    }

    #[test]
    fn multiple_dates_filter_together() {
        let entries = vec![
            entry("a", 1.0, Some(d(1))),
            entry("b", 2.0, Some(d(2))),
            entry("c", 3.0, Some(d(3))),
            entry("d", 4.0, None),
        ];
        let selection = DateSelection::resolve(&[d(3), d(1)], &available_dates(&entries));

        let kinds: Vec<_> = selection
            .filter(&entries)
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds, vec!["a", "c"]);
        assert_eq!(selection.label(), "2025-03-01, 2025-03-03");
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.first(), Some(d(1)));
        assert_eq!(selection.last(), Some(d(3)));
    }

    #[test]
    fn unknown_dates_fall_back_to_latest() {
        let available = vec![d(1), d(2)];
        let selection = DateSelection::resolve(&[d(20)], &available);
        assert!(selection.contains(&d(2)));
        assert_eq!(selection.len(), 1);
    }
}

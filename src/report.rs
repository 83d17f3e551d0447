use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::loader::{WorkEntry, WorkbookError, load_entries};
use crate::selection::{DateSelection, available_dates};

/// Labor rate applied when none is given ($/hr)
pub const DEFAULT_LABOR_RATE: f64 = 75.0;

/// Round to cents / hundredths of an hour, ties to even (2.125 -> 2.12)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Use `rate` if it is a usable labor rate, `default` otherwise
///
/// The result is rounded to cents, the precision rates travel with in URLs.
pub fn sanitize_rate(rate: Option<f64>, default: f64) -> f64 {
    round2(rate.filter(|r| r.is_finite() && *r >= 0.0).unwrap_or(default))
}

/// Total hours for one Type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeHours {
    pub kind: String,
    pub hours: f64,
}

/// Group entries by Type and sum their hours
///
/// Types come out in ascending order and each sum is rounded to two
/// decimals.
pub fn aggregate_by_type(entries: &[WorkEntry]) -> Vec<TypeHours> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for entry in entries {
        *totals.entry(entry.kind.as_str()).or_insert(0.0) += entry.hours;
    }

    totals
        .into_iter()
        .map(|(kind, hours)| TypeHours {
            kind: kind.to_string(),
            hours: round2(hours),
        })
        .collect()
}

/// Hours per production date, ascending; undated entries are left out
pub fn daily_hours(entries: &[WorkEntry]) -> Vec<(NaiveDate, f64)> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for entry in entries {
        if let Some(date) = entry.production_date {
            *totals.entry(date).or_insert(0.0) += entry.hours;
        }
    }

    totals
        .into_iter()
        .map(|(date, hours)| (date, round2(hours)))
        .collect()
}

/// One line of the breakdown table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub kind: String,
    pub hours: f64,
    pub cost: f64,
}

/// Hours and cost per Type at a given labor rate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub rate: f64,
    pub rows: Vec<BreakdownRow>,
    pub total_hours: f64,
    pub total_cost: f64,
}

impl Breakdown {
    /// Build the breakdown table
    ///
    /// Row costs are rounded to cents. The total cost is the unrounded sum of
    /// `hours * rate` over the (already rounded) per-type hours.
    ///
    /// # Examples
    /// ```
    /// use workorder_report::loader::WorkEntry;
    /// use workorder_report::report::Breakdown;
    ///
    /// let entries = vec![
    ///     WorkEntry { kind: "Weld".into(), hours: 1.5, production_date: None },
    ///     WorkEntry { kind: "Weld".into(), hours: 2.0, production_date: None },
    ///     WorkEntry { kind: "Paint".into(), hours: 0.5, production_date: None },
    /// ];
    /// let breakdown = Breakdown::build(&entries, 10.0);
    /// assert_eq!(breakdown.rows[0].kind, "Paint");
    /// assert_eq!(breakdown.rows[1].cost, 35.0);
    /// assert_eq!(breakdown.total_hours, 4.0);
    /// ```
    pub fn build(entries: &[WorkEntry], rate: f64) -> Self {
        let rows: Vec<BreakdownRow> = aggregate_by_type(entries)
            .into_iter()
            .map(|t| BreakdownRow {
                cost: round2(t.hours * rate),
                kind: t.kind,
                hours: t.hours,
            })
            .collect();

        let total_hours: f64 = rows.iter().map(|row| row.hours).sum();
        let total_cost: f64 = rows.iter().map(|row| row.hours * rate).sum();

        Self {
            rate,
            rows,
            total_hours,
            total_cost,
        }
    }
}

/// A headline figure shown above the charts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpi {
    pub label: &'static str,
    pub value: String,
}

/// Everything the dashboard and the exports derive from one workbook
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub available_dates: Vec<NaiveDate>,
    pub selection: DateSelection,
    pub entry_count: usize,
    pub breakdown: Breakdown,
    pub daily: Vec<(NaiveDate, f64)>,
}

impl Report {
    /// Read the workbook at `path` and build the report for the requested dates
    pub fn load(
        path: impl AsRef<Path>,
        requested_dates: &[NaiveDate],
        rate: f64,
    ) -> Result<Self, WorkbookError> {
        let entries = load_entries(path)?;
        Ok(Self::from_entries(&entries, requested_dates, rate))
    }

    pub fn from_entries(entries: &[WorkEntry], requested_dates: &[NaiveDate], rate: f64) -> Self {
        let available_dates = available_dates(entries);
        let selection = DateSelection::resolve(requested_dates, &available_dates);
        let selected = selection.filter(entries);

        Self {
            entry_count: selected.len(),
            breakdown: Breakdown::build(&selected, rate),
            daily: daily_hours(&selected),
            available_dates,
            selection,
        }
    }

    pub fn kpis(&self) -> Vec<Kpi> {
        let days = if self.selection.is_empty() {
            "All".to_string()
        } else {
            self.selection.len().to_string()
        };

        vec![
            Kpi {
                label: "Total Hours",
                value: format_hours(self.breakdown.total_hours),
            },
            Kpi {
                label: "Total Cost",
                value: format_currency(self.breakdown.total_cost),
            },
            Kpi {
                label: "Entries",
                value: self.entry_count.to_string(),
            },
            Kpi {
                label: "Days Selected",
                value: days,
            },
        ]
    }

    /// File name stem for exports, e.g. `workorder-report-2025-03-01_to_2025-03-03`
    pub fn file_stem(&self) -> String {
        match (self.selection.first(), self.selection.last()) {
            (Some(first), Some(last)) if first == last => {
                format!("workorder-report-{}", first.format("%Y-%m-%d"))
            }
            (Some(first), Some(last)) => format!(
                "workorder-report-{}_to_{}",
                first.format("%Y-%m-%d"),
                last.format("%Y-%m-%d")
            ),
            _ => "workorder-report".to_string(),
        }
    }
}

/// Format a number with two decimals and thousands separators
///
/// # Examples
/// ```
/// use workorder_report::report::format_hours;
///
/// assert_eq!(format_hours(1234.5), "1,234.50");
/// assert_eq!(format_hours(-0.001), "0.00");
/// ```
pub fn format_hours(value: f64) -> String {
    let (negative, digits) = split_amount(value);
    if negative { format!("-{digits}") } else { digits }
}

/// Format a dollar amount, e.g. `$1,234.50` or `-$12.00`
pub fn format_currency(value: f64) -> String {
    let (negative, digits) = split_amount(value);
    if negative {
        format!("-${digits}")
    } else {
        format!("${digits}")
    }
}

fn split_amount(value: f64) -> (bool, String) {
    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let digits = format!("{grouped}.{fraction}");
    let negative = value < 0.0 && digits != "0.00";
    (negative, digits)
}

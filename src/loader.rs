use calamine::{Data, Range, Reader, Xlsx, open_workbook};
use chrono::{Days, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// Label used for rows whose Type cell is blank
pub const UNSPECIFIED_TYPE: &str = "Unspecified";

/// Column names accepted in place of `hours`, in order of preference
const HOURS_ALIASES: [&str; 4] = ["hrs", "time_hours", "time", "duration_hours"];

/// Column names holding the production date, in order of preference
const DATE_COLUMNS: [&str; 3] = ["production_date", "date", "work_date"];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

lazy_static! {
    static ref HEADER_SEPARATORS: Regex = Regex::new(r"[\s_\-]+").unwrap();
}

/// One row of the "Time on Work Order" sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkEntry {
    /// Value of the Type column (trimmed)
    pub kind: String,

    /// Hours booked on this row
    pub hours: f64,

    /// Production date, when the sheet carries one
    pub production_date: Option<NaiveDate>,
}

/// Errors raised while reading an uploaded workbook
#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("{0}")]
    Open(#[from] calamine::XlsxError),

    #[error("No sheets found in Excel file")]
    NoSheets,

    #[error("Excel sheet is empty")]
    EmptySheet,

    #[error("Input must contain columns 'Type' and 'Hours' (case-insensitive).")]
    MissingColumns,

    #[error("Row {row}: hours value {value:?} is not a number")]
    InvalidHours { row: usize, value: String },
}

/// Normalize a header cell for matching
///
/// Headers are trimmed and lowercased, and runs of whitespace, `-` and `_`
/// collapse into a single `_`, so `" Production Date "` becomes
/// `production_date`.
///
/// # Examples
/// ```
/// use workorder_report::loader::normalize_header;
///
/// assert_eq!(normalize_header(" Hours "), "hours");
/// assert_eq!(normalize_header("Production  Date"), "production_date");
/// assert_eq!(normalize_header("Duration-Hours"), "duration_hours");
/// ```
pub fn normalize_header(raw: &str) -> String {
    HEADER_SEPARATORS
        .replace_all(raw.trim(), "_")
        .to_lowercase()
}

/// Positions of the columns the report needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    kind: usize,
    hours: usize,
    date: Option<usize>,
}

impl Columns {
    fn locate(headers: &[String]) -> Result<Self, WorkbookError> {
        let find = |name: &str| headers.iter().position(|header| header == name);

        let kind = find("type").ok_or(WorkbookError::MissingColumns)?;
        let hours = find("hours")
            .or_else(|| HOURS_ALIASES.iter().find_map(|alias| find(*alias)))
            .ok_or(WorkbookError::MissingColumns)?;
        let date = DATE_COLUMNS.iter().find_map(|name| find(*name));

        Ok(Self { kind, hours, date })
    }
}

/// Load the work entries from the first sheet of an Excel file
///
/// The first row is the header row. The sheet must contain a `Type` column
/// and an `Hours` column (or one of its aliases); a production date column
/// is optional.
///
/// # Arguments
/// * `filepath` - Path to the `.xlsx` file to read
///
/// # Returns
/// * `Result<Vec<WorkEntry>, WorkbookError>` - The entries in sheet order
///
/// # Examples
/// ```no_run
/// use workorder_report::loader::load_entries;
///
/// match load_entries("uploads/time.xlsx") {
///     Ok(entries) => println!("Loaded {} entries", entries.len()),
///     Err(e) => eprintln!("Error reading file: {}", e),
/// }
/// ```
pub fn load_entries(filepath: impl AsRef<Path>) -> Result<Vec<WorkEntry>, WorkbookError> {
    let mut workbook: Xlsx<_> = open_workbook(filepath)?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(WorkbookError::NoSheets)?;

    let range = workbook.worksheet_range(&sheet_name)?;
    entries_from_range(&range)
}

/// Convert a worksheet range into work entries
pub fn entries_from_range(range: &Range<Data>) -> Result<Vec<WorkEntry>, WorkbookError> {
    let mut rows = range.rows();
    let header_row = rows.next().ok_or(WorkbookError::EmptySheet)?;

    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| normalize_header(&cell.to_string()))
        .collect();
    let columns = Columns::locate(&headers)?;

    // 1-based sheet row of the header
    let header_line = range.start().map(|(row, _)| row as usize).unwrap_or(0) + 1;

    let mut entries = Vec::new();
    for (offset, row) in rows.enumerate() {
        if row.iter().all(is_blank) {
            continue;
        }

        let kind = row
            .get(columns.kind)
            .map(|cell| cell.to_string().trim().to_string())
            .filter(|kind| !kind.is_empty())
            .unwrap_or_else(|| UNSPECIFIED_TYPE.to_string());

        let hours_cell = row.get(columns.hours).unwrap_or(&Data::Empty);
        let hours = parse_hours(hours_cell).ok_or_else(|| WorkbookError::InvalidHours {
            row: header_line + offset + 1,
            value: hours_cell.to_string(),
        })?;

        let production_date = columns
            .date
            .and_then(|index| row.get(index))
            .and_then(parse_date);

        entries.push(WorkEntry {
            kind,
            hours,
            production_date,
        });
    }

    Ok(entries)
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

// Blank cells count as zero hours
fn parse_hours(cell: &Data) -> Option<f64> {
    match cell {
        Data::Empty => Some(0.0),
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) if f.is_finite() => Some(*f),
        Data::String(s) if s.trim().is_empty() => Some(0.0),
        Data::String(s) => s
            .trim()
            .replace(',', "")
            .parse::<f64>()
            .ok()
            .filter(|hours| hours.is_finite()),
        _ => None,
    }
}

fn parse_date(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::DateTime(value) => serial_to_date(value.as_f64()),
        Data::Float(serial) => serial_to_date(*serial),
        Data::Int(serial) => serial_to_date(*serial as f64),
        Data::String(text) | Data::DateTimeIso(text) => parse_date_text(text),
        _ => None,
    }
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let date_part = text.split(['T', ' ']).next().unwrap_or(text);

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
}

/// Convert an Excel (1900 system) serial day number to a date
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    // Upper bound is 9999-12-31
    if !serial.is_finite() || !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let days = serial.trunc() as u64;

    // Serial 60 is the nonexistent 1900-02-29
    let epoch = if days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    epoch.checked_add_days(Days::new(days))
}

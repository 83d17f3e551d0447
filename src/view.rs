#![cfg(feature = "web")]

use chrono::NaiveDate;
use handlebars::{Handlebars, RenderError, TemplateError};
use log::warn;
use serde::Serialize;

use crate::graph::{self, GraphOptions};
use crate::report::{Kpi, Report, format_currency, format_hours, round2, sanitize_rate};
use crate::saving::{UploadId, UploadStore};

/// Narrowest layout the printable view accepts (px)
pub const MIN_WIDTH: u32 = 480;

/// Widest layout the printable view accepts (px)
pub const MAX_WIDTH: u32 = 4096;

const REPORT_TITLE: &str = "Work Order Cost Breakdown";

/// Query parameters shared by the dashboard, its printable variant and the
/// export endpoints
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewParams {
    /// Raw upload identifier as sent by the client
    pub upload: Option<String>,

    /// Hide the interactive chrome
    pub print: bool,

    /// Fixed layout width in CSS pixels
    pub width: Option<u32>,

    /// Labor rate ($/hr)
    pub rate: Option<f64>,

    /// Selected production dates, ascending and distinct
    pub dates: Vec<NaiveDate>,
}

impl ViewParams {
    /// Parse a raw query string such as `upload=..&print=1&date=2025-03-01&date=2025-03-02`
    ///
    /// Unknown keys and malformed values are ignored; `date` may repeat.
    ///
    /// # Examples
    /// ```
    /// use workorder_report::view::ViewParams;
    ///
    /// let params = ViewParams::parse(Some("print=1&width=900&rate=60&date=2025-03-02&date=2025-03-01"));
    /// assert!(params.print);
    /// assert_eq!(params.width, Some(900));
    /// assert_eq!(params.rate, Some(60.0));
    /// assert_eq!(params.dates.len(), 2);
    /// ```
    pub fn parse(query: Option<&str>) -> Self {
        let mut params = Self::default();

        for pair in query.unwrap_or_default().split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode_component(value);

            match decode_component(key).as_str() {
                "upload" => params.upload = Some(value.trim().to_string()).filter(|v| !v.is_empty()),
                "print" => params.print = matches!(value.as_str(), "1" | "true" | "yes"),
                "width" => params.width = value.parse::<u32>().ok().map(clamp_width),
                "rate" => {
                    params.rate = value
                        .parse::<f64>()
                        .ok()
                        .filter(|r| r.is_finite() && *r >= 0.0)
                        .map(round2)
                }
                "date" => {
                    if let Ok(date) = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
                        params.dates.push(date);
                    }
                }
                _ => {}
            }
        }

        params.dates.sort();
        params.dates.dedup();
        params
    }

    /// Serialize back to a query string
    ///
    /// Keys always come out in the same order (`upload, print, width, rate,
    /// date...`) so equal views produce equal URLs.
    pub fn to_query(&self) -> String {
        let mut pairs = Vec::new();

        if let Some(upload) = &self.upload {
            pairs.push(format!("upload={}", urlencoding::encode(upload)));
        }
        if self.print {
            pairs.push("print=1".to_string());
        }
        if let Some(width) = self.width {
            pairs.push(format!("width={width}"));
        }
        if let Some(rate) = self.rate {
            pairs.push(format!("rate={rate:.2}"));
        }
        for date in &self.dates {
            pairs.push(format!("date={}", date.format("%Y-%m-%d")));
        }

        pairs.join("&")
    }

    /// The printable variant of this view at a fixed width
    pub fn printable(&self, width: u32) -> Self {
        Self {
            print: true,
            width: Some(clamp_width(width)),
            ..self.clone()
        }
    }
}

pub fn clamp_width(width: u32) -> u32 {
    width.clamp(MIN_WIDTH, MAX_WIDTH)
}

// Query components use `+` for spaces
fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

#[derive(Serialize)]
struct DateOption {
    value: String,
    label: String,
    selected: bool,
}

#[derive(Serialize)]
struct RowContext {
    kind: String,
    hours: String,
    cost: String,
}

#[derive(Serialize)]
struct ChartContext {
    title: &'static str,
    svg: Option<String>,
}

#[derive(Serialize)]
struct ReportContext {
    selection: String,
    kpis: Vec<Kpi>,
    rows: Vec<RowContext>,
    total_hours: String,
    total_cost: String,
    charts: Vec<ChartContext>,
}

#[derive(Serialize)]
struct DashboardContext {
    title: &'static str,
    print: bool,
    width: u32,
    upload: Option<String>,
    rate: String,
    query: String,
    dates: Vec<DateOption>,
    report: Option<ReportContext>,
    error: Option<String>,
}

/// Renders the dashboard page in its interactive and printable variants
pub struct Dashboard {
    templates: Handlebars<'static>,
    default_rate: f64,
    layout_width: u32,
}

impl Dashboard {
    /// # Arguments
    /// * `default_rate` - Labor rate used when the query carries none
    /// * `layout_width` - Report width when the query carries none
    pub fn new(default_rate: f64, layout_width: u32) -> Result<Self, TemplateError> {
        let mut templates = Handlebars::new();
        templates.register_template_string("dashboard", include_str!("./static/dashboard.hbs"))?;
        templates.register_partial("styles", include_str!("./static/styles.css"))?;

        Ok(Self {
            templates,
            default_rate,
            layout_width: clamp_width(layout_width),
        })
    }

    /// Render the page for `params`
    ///
    /// Problems reading the upload are shown inside the page rather than
    /// failing the request.
    pub fn render(&self, params: &ViewParams, store: &UploadStore) -> Result<String, RenderError> {
        let width = params.width.unwrap_or(self.layout_width);
        let rate = sanitize_rate(params.rate, self.default_rate);

        let mut context = DashboardContext {
            title: REPORT_TITLE,
            print: params.print,
            width,
            upload: params.upload.clone(),
            rate: format!("{rate:.2}"),
            query: String::new(),
            dates: Vec::new(),
            report: None,
            error: None,
        };

        if let Some(upload) = &params.upload {
            match load_report(upload, &params.dates, rate, store) {
                Ok(report) => {
                    let resolved = ViewParams {
                        upload: params.upload.clone(),
                        print: false,
                        width: params.width,
                        rate: Some(rate),
                        dates: report.selection.dates().collect(),
                    };
                    context.query = resolved.to_query();
                    context.dates = report
                        .available_dates
                        .iter()
                        .map(|date| DateOption {
                            value: date.format("%Y-%m-%d").to_string(),
                            label: date.format("%a %d %b %Y").to_string(),
                            selected: report.selection.contains(date),
                        })
                        .collect();
                    context.report = Some(report_context(&report, width));
                }
                Err(e) => {
                    warn!("Could not build report for upload {}: {}", upload, e);
                    context.error = Some(format!("Error reading file: {e}"));
                }
            }
        }

        self.templates.render("dashboard", &context)
    }
}

fn load_report(
    upload: &str,
    dates: &[NaiveDate],
    rate: f64,
    store: &UploadStore,
) -> Result<Report, Box<dyn std::error::Error>> {
    let id = UploadId::parse(upload)?;
    let path = store.locate(&id)?;
    Ok(Report::load(path, dates, rate)?)
}

fn report_context(report: &Report, width: u32) -> ReportContext {
    let breakdown = &report.breakdown;

    let mut charts = Vec::new();
    if !breakdown.rows.is_empty() {
        let options = GraphOptions::for_layout("Hours by Type", "Hours", width);
        charts.push(ChartContext {
            title: "Hours by Type",
            svg: graph::hours_by_type_svg(&breakdown.rows, &options)
                .map_err(|e| warn!("Hours by Type chart unavailable: {}", e))
                .ok(),
        });
    }
    if !report.daily.is_empty() {
        let options = GraphOptions::for_layout("Hours by Production Date", "Hours", width);
        charts.push(ChartContext {
            title: "Hours by Production Date",
            svg: graph::hours_by_date_svg(&report.daily, &options)
                .map_err(|e| warn!("Hours by Production Date chart unavailable: {}", e))
                .ok(),
        });
    }

    ReportContext {
        selection: report.selection.label(),
        kpis: report.kpis(),
        rows: breakdown
            .rows
            .iter()
            .map(|row| RowContext {
                kind: row.kind.clone(),
                hours: format_hours(row.hours),
                cost: format_currency(row.cost),
            })
            .collect(),
        total_hours: format_hours(breakdown.total_hours),
        total_cost: format_currency(breakdown.total_cost),
        charts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn store_with_sample(dir: &std::path::Path) -> (UploadStore, UploadId) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Type").unwrap();
        sheet.write_string(0, 1, "Hours").unwrap();
        sheet.write_string(0, 2, "Production Date").unwrap();
        let rows = [
            ("Welding", 2.0, "2025-03-01"),
            ("Assembly", 3.5, "2025-03-02"),
            ("Welding", 1.5, "2025-03-02"),
        ];
        for (i, (kind, hours, date)) in rows.iter().enumerate() {
            let line = (i + 1) as u32;
            sheet.write_string(line, 0, *kind).unwrap();
            sheet.write_number(line, 1, *hours).unwrap();
            sheet.write_string(line, 2, *date).unwrap();
        }
        let bytes = workbook.save_to_buffer().unwrap();

        let store = UploadStore::new(dir);
        let id = store.save(&bytes).unwrap();
        (store, id)
    }

    #[test]
    fn parse_decodes_and_sorts() {
        let params = ViewParams::parse(Some(
            "upload=abc%2Ddef&print=true&width=10&rate=-3&date=2025-03-02&date=bogus&date=2025-03-01&date=2025-03-02",
        ));
        assert_eq!(params.upload.as_deref(), Some("abc-def"));
        assert!(params.print);
        assert_eq!(params.width, Some(MIN_WIDTH));
        assert_eq!(params.rate, None);
        assert_eq!(params.dates, vec![d(1), d(2)]);
    }

    #[test]
    fn query_order_is_stable() {
        let params = ViewParams {
            upload: Some("u".to_string()),
            print: false,
            width: None,
            rate: Some(75.0),
            dates: vec![d(1), d(3)],
        };
        assert_eq!(params.to_query(), "upload=u&rate=75.00&date=2025-03-01&date=2025-03-03");
        assert_eq!(
            params.printable(1400).to_query(),
            "upload=u&print=1&width=1400&rate=75.00&date=2025-03-01&date=2025-03-03"
        );
        assert_eq!(ViewParams::parse(Some(params.to_query().as_str())), params);
    }

    #[test]
    fn empty_state_has_instructions_and_marker_script() {
        let dir = tempfile::tempdir().unwrap();
        let dashboard = Dashboard::new(75.0, 1400).unwrap();
        let html = dashboard
            .render(&ViewParams::default(), &UploadStore::new(dir.path()))
            .unwrap();

        assert!(html.contains("Upload a .xlsx file to get started."));
        assert!(html.contains("report-ready"));
        assert!(html.contains("id=\"sidebar\""));
    }

    #[test]
    fn interactive_view_has_chrome_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let (store, id) = store_with_sample(dir.path());
        let dashboard = Dashboard::new(75.0, 1400).unwrap();

        let params = ViewParams::parse(Some(format!("upload={id}&date=2025-03-01&date=2025-03-02").as_str()));
        let html = dashboard.render(&params, &store).unwrap();

        assert!(html.contains("id=\"sidebar\""));
        assert!(html.contains("id=\"toolbar\""));
        assert!(html.contains("Breakdown (Hours &amp; Cost)"));
        assert!(html.contains("$525.00"));
        assert!(html.contains("7.00"));
        assert!(html.contains("value=\"2025-03-01\" selected"));
    }

    #[test]
    fn printable_view_hides_chrome() {
        let dir = tempfile::tempdir().unwrap();
        let (store, id) = store_with_sample(dir.path());
        let dashboard = Dashboard::new(75.0, 1400).unwrap();

        let params = ViewParams::parse(Some(format!("upload={id}").as_str())).printable(1200);
        let html = dashboard.render(&params, &store).unwrap();

        assert!(!html.contains("id=\"sidebar\""));
        assert!(!html.contains("id=\"toolbar\""));
        assert!(html.contains("class=\"print\""));
        assert!(html.contains("width: 1200px"));
        // defaults to the latest production date
        assert!(html.contains("2025-03-02"));
        assert!(html.contains("$375.00"));
        assert!(html.contains("report-ready"));
    }

    #[test]
    fn unknown_upload_renders_inline_error() {
        let dir = tempfile::tempdir().unwrap();
        let dashboard = Dashboard::new(75.0, 1400).unwrap();
        let params = ViewParams::parse(Some("upload=not-a-uuid"));
        let html = dashboard.render(&params, &UploadStore::new(dir.path())).unwrap();
        assert!(html.contains("Error reading file: Invalid upload id"));
    }

    #[test]
    fn rate_input_accepts_cents() {
        let dir = tempfile::tempdir().unwrap();
        let dashboard = Dashboard::new(75.0, 1400).unwrap();
        let html = dashboard
            .render(&ViewParams::default(), &UploadStore::new(dir.path()))
            .unwrap();
        assert!(html.contains(r#"name="rate" min="0" step="0.01""#));
        assert!(!html.contains(r#"step="1.00""#));
    }

    #[test]
    fn charts_sit_side_by_side_without_figure_margins() {
        let dir = tempfile::tempdir().unwrap();
        let dashboard = Dashboard::new(75.0, 1400).unwrap();
        let html = dashboard
            .render(&ViewParams::default(), &UploadStore::new(dir.path()))
            .unwrap();
        assert!(html.contains("figure.chart { margin: 0; }"));
    }

    #[test]
    fn rate_is_rounded_once_when_parsed() {
        let params = ViewParams::parse(Some("rate=62.555"));
        let rate = params.rate.unwrap();
        assert_eq!(rate, round2(rate));
        assert_eq!(ViewParams::parse(Some(params.to_query().as_str())).rate, Some(rate));
    }
}

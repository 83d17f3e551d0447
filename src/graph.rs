use chrono::NaiveDate;
use plotters::prelude::*;

use crate::report::BreakdownRow;

/// Height of every report chart in pixels
pub const CHART_HEIGHT: u32 = 360;

const MIN_CHART_WIDTH: u32 = 320;

// Printable page padding (24px each side) plus the 32px gap between columns
const CHART_GUTTER: u32 = 80;

/// Configuration options for chart generation
///
/// Charts are rendered at a fixed pixel size so the printable view lays out
/// identically on every capture.
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,

    /// Bar fill color
    pub color: RGBColor,
}

impl GraphOptions {
    /// Options for a chart placed in one of the two columns of a report
    /// that is `layout_width` pixels wide
    pub fn for_layout(title: &str, y_label: &str, layout_width: u32) -> Self {
        Self {
            title: title.to_string(),
            y_label: y_label.to_string(),
            width: (layout_width.saturating_sub(CHART_GUTTER) / 2).max(MIN_CHART_WIDTH),
            height: CHART_HEIGHT,
            color: RGBColor(31, 119, 180),
        }
    }
}

/// Bar chart of hours per Type as an SVG document
///
/// # Examples
/// ```no_run
/// use workorder_report::graph::{GraphOptions, hours_by_type_svg};
/// use workorder_report::report::BreakdownRow;
///
/// let rows = vec![BreakdownRow { kind: "Weld".into(), hours: 4.0, cost: 300.0 }];
/// let options = GraphOptions::for_layout("Hours by Type", "Hours", 1400);
/// match hours_by_type_svg(&rows, &options) {
///     Ok(svg) => println!("Chart rendered: {} bytes", svg.len()),
///     Err(e) => eprintln!("Failed to render chart: {}", e),
/// }
/// ```
pub fn hours_by_type_svg(
    rows: &[BreakdownRow],
    options: &GraphOptions,
) -> Result<String, Box<dyn std::error::Error>> {
    let labels: Vec<String> = rows.iter().map(|row| row.kind.clone()).collect();
    let values: Vec<f64> = rows.iter().map(|row| row.hours).collect();
    bar_chart_svg(&labels, &values, options)
}

/// Bar chart of hours per production date as an SVG document
pub fn hours_by_date_svg(
    days: &[(NaiveDate, f64)],
    options: &GraphOptions,
) -> Result<String, Box<dyn std::error::Error>> {
    let labels: Vec<String> = days
        .iter()
        .map(|(date, _)| date.format("%m/%d").to_string())
        .collect();
    let values: Vec<f64> = days.iter().map(|(_, hours)| *hours).collect();
    bar_chart_svg(&labels, &values, options)
}

/// Draws one bar per label into an in-memory SVG
///
/// # Errors
/// * Returns an error if there is nothing to draw
/// * Returns an error if the backend cannot lay out text (no usable font)
fn bar_chart_svg(
    labels: &[String],
    values: &[f64],
    options: &GraphOptions,
) -> Result<String, Box<dyn std::error::Error>> {
    if values.is_empty() {
        return Err("No data to chart".into());
    }

    let max_y = values.iter().copied().fold(0.0_f64, f64::max);
    let min_y = values.iter().copied().fold(0.0_f64, f64::min);
    let top = if max_y > 0.0 { max_y * 1.15 } else { 1.0 };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 22).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d((0..values.len()).into_segmented(), min_y..top)?;

        let label_for = |value: &SegmentValue<usize>| match value {
            SegmentValue::CenterOf(index) => labels.get(*index).cloned().unwrap_or_default(),
            _ => String::new(),
        };

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(values.len())
            .x_label_formatter(&label_for)
            .y_desc(&options.y_label)
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(options.color.filled())
                .margin(8)
                .data(values.iter().enumerate().map(|(index, value)| (index, *value))),
        )?;

        root.present()?;
    }

    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_width_splits_layout_in_two_columns() {
        let options = GraphOptions::for_layout("Hours by Type", "Hours", 1400);
        assert_eq!(options.width, 660);
        // both columns and the gap fit inside the padded print page
        assert!(2 * options.width + 32 <= 1400 - 2 * 24);
        assert_eq!(options.height, CHART_HEIGHT);

        let narrow = GraphOptions::for_layout("Hours by Type", "Hours", 480);
        assert_eq!(narrow.width, MIN_CHART_WIDTH);
    }

    #[test]
    fn empty_data_is_rejected() {
        let options = GraphOptions::for_layout("Hours by Type", "Hours", 1400);
        assert!(hours_by_type_svg(&[], &options).is_err());
        assert!(hours_by_date_svg(&[], &options).is_err());
    }
}

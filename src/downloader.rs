use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::report::Breakdown;

const HEADERS: [&str; 3] = ["Type", "Hours", "Cost"];

/// Convert a breakdown to XLSX format
///
/// Writes a single `Breakdown` sheet with a `Type | Hours | Cost` header,
/// one row per Type and a bold totals row. Cells stay numeric so the
/// workbook can be recalculated in Excel.
///
/// # Arguments
/// * `breakdown` - The breakdown table to export
///
/// # Returns
/// * `Result<Vec<u8>, XlsxError>` - XLSX file content as bytes or an error
///
/// # Examples
/// ```
/// use workorder_report::downloader::to_xlsx;
/// use workorder_report::report::Breakdown;
///
/// let breakdown = Breakdown::build(&[], 75.0);
/// match to_xlsx(&breakdown) {
///     Ok(xlsx_data) => println!("XLSX generated: {} bytes", xlsx_data.len()),
///     Err(e) => eprintln!("Failed to generate XLSX: {}", e),
/// }
/// ```
pub fn to_xlsx(breakdown: &Breakdown) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();

    let bold = Format::new().set_bold();
    let hours_format = Format::new().set_num_format("#,##0.00");
    let cost_format = Format::new().set_num_format("$#,##0.00");
    let total_hours_format = Format::new().set_bold().set_num_format("#,##0.00");
    let total_cost_format = Format::new().set_bold().set_num_format("$#,##0.00");

    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Breakdown")?;
    worksheet.set_column_width(0, 28.0)?;
    worksheet.set_column_width(1, 12.0)?;
    worksheet.set_column_width(2, 14.0)?;

    for (col, title) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &bold)?;
    }

    for (index, row) in breakdown.rows.iter().enumerate() {
        let line = (index + 1) as u32;
        worksheet.write_string(line, 0, &row.kind)?;
        worksheet.write_number_with_format(line, 1, row.hours, &hours_format)?;
        worksheet.write_number_with_format(line, 2, row.cost, &cost_format)?;
    }

    let total_line = (breakdown.rows.len() + 1) as u32;
    worksheet.write_string_with_format(total_line, 0, "Total", &bold)?;
    worksheet.write_number_with_format(total_line, 1, breakdown.total_hours, &total_hours_format)?;
    worksheet.write_number_with_format(
        total_line,
        2,
        crate::report::round2(breakdown.total_cost),
        &total_cost_format,
    )?;

    workbook.save_to_buffer()
}

/// Convert a breakdown to CSV format
///
/// Same columns as [`to_xlsx`], numbers with two decimals, fields quoted
/// when they contain commas, quotes or newlines.
pub fn to_csv(breakdown: &Breakdown) -> String {
    let mut csv_content = HEADERS.join(",");
    csv_content.push('\n');

    for row in &breakdown.rows {
        csv_content.push_str(&format!(
            "{},{:.2},{:.2}\n",
            escape_field(&row.kind),
            row.hours,
            row.cost
        ));
    }

    csv_content.push_str(&format!(
        "Total,{:.2},{:.2}\n",
        breakdown.total_hours, breakdown.total_cost
    ));

    csv_content
}

fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

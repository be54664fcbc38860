use docket_core::{Result, SheetConfig};
use rust_xlsxwriter::{Color, Format, Workbook};
use tracing::debug;

use crate::extract::Extraction;

/// Light blue header fill.
const HEADER_FILL: u32 = 0xADD8E6;

/// Write `extraction` to a single-sheet workbook and return the xlsx bytes.
///
/// Row 1 holds the field names (bold, light-blue fill); each following row
/// holds one record. With no rows the sheet only carries the configured
/// empty-state message in A1.
pub fn assemble_workbook(extraction: &Extraction, options: &SheetConfig) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&options.sheet_name)?;

    if extraction.is_empty() {
        worksheet.write_string(0, 0, &options.empty_message)?;
        debug!(sheet = %options.sheet_name, "wrote empty workbook");
        return Ok(workbook.save_to_buffer()?);
    }

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(HEADER_FILL));

    for (col, name) in extraction.fields.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, name, &header_format)?;
    }

    for (row_idx, row) in extraction
        .display_rows(&options.missing_placeholder)
        .iter()
        .enumerate()
    {
        let excel_row = (row_idx + 1) as u32;
        for (col_idx, cell) in row.iter().enumerate() {
            let col = col_idx as u16;
            if cell.is_empty() {
                continue;
            }
            match parse_number(cell, options) {
                Some(num) => worksheet.write_number(excel_row, col, num)?,
                None => worksheet.write_string(excel_row, col, cell)?,
            };
        }
    }

    worksheet.autofit();

    debug!(
        sheet = %options.sheet_name,
        columns = extraction.fields.len(),
        rows = extraction.rows.len(),
        "assembled workbook"
    );

    Ok(workbook.save_to_buffer()?)
}

fn parse_number(cell: &str, options: &SheetConfig) -> Option<f64> {
    if !options.numeric_cells {
        return None;
    }
    cell.parse::<f64>().ok().filter(|num| num.is_finite())
}

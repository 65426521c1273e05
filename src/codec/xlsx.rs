//! Spreadsheet workbooks: `calamine` for reading, `rust_xlsxwriter` for writing.

use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use rust_xlsxwriter::Workbook;

use crate::error::{SheetError, SheetResult};

use super::{MAX_COLUMNS, MAX_ROWS, RawSheet, WorkbookCodec};

/// Codec for `.xlsx` (read and write) and `.xlsm/.xlsb/.xls/.ods` (read).
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxCodec;

impl WorkbookCodec for XlsxCodec {
    fn open(&self, path: &Path) -> SheetResult<Vec<RawSheet>> {
        let mut workbook = open_workbook_auto(path)?;
        let names = workbook.sheet_names().to_vec();

        let mut sheets = Vec::with_capacity(names.len());
        for name in names {
            let range = workbook.worksheet_range(&name)?;
            sheets.push(RawSheet::new(name, range_to_rows(&range)));
        }
        Ok(sheets)
    }

    fn write(&self, path: &Path, sheets: &[RawSheet]) -> SheetResult<()> {
        let mut workbook = Workbook::new();
        for sheet in sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;

            if sheet.rows.len() > MAX_ROWS {
                return Err(SheetError::Format {
                    message: format!("sheet '{}' has more than {MAX_ROWS} rows", sheet.name),
                });
            }
            for (r, row) in sheet.rows.iter().enumerate() {
                if row.len() > MAX_COLUMNS {
                    return Err(SheetError::Format {
                        message: format!("sheet '{}' has more than {MAX_COLUMNS} columns", sheet.name),
                    });
                }
                for (c, value) in row.iter().enumerate() {
                    // Excel has no empty string cells; leave them blank.
                    if value.is_empty() {
                        continue;
                    }
                    worksheet.write_string(r as u32, c as u16, value)?;
                }
            }
        }
        workbook.save(path)?;
        Ok(())
    }
}

/// Rows of the used range, padded so that row 1/column A of the sheet is index 0.
fn range_to_rows(range: &Range<Data>) -> Vec<Vec<String>> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };
    let lead_cols = start_col as usize;

    let mut rows: Vec<Vec<String>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut out = vec![String::new(); lead_cols];
        out.extend(row.iter().map(cell_to_string));
        // Trailing blanks carry no information; indexing treats missing cells as empty.
        while out.last().is_some_and(|s| s.is_empty()) {
            out.pop();
        }
        rows.push(out);
    }
    rows
}

fn cell_to_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

//! CSV files as single-sheet workbooks.

use std::path::Path;

use crate::error::{SheetError, SheetResult};

use super::{RawSheet, WorkbookCodec};

/// Codec for `.csv` files. The only sheet is named after the file stem.
#[derive(Debug, Clone, Copy)]
pub struct CsvCodec {
    /// Field delimiter. Use `b'\t'` for TSV.
    pub delimiter: u8,
}

impl Default for CsvCodec {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// Sheet name used for a CSV file: its file stem.
pub fn sheet_name_for(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Sheet1")
        .to_string()
}

impl WorkbookCodec for CsvCodec {
    fn open(&self, path: &Path) -> SheetResult<Vec<RawSheet>> {
        let mut rdr = ::csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_path(path)?;

        // The reader drops blank lines; pad them back so row indices stay physical lines.
        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in rdr.records() {
            let record = record?;
            if let Some(line) = record.position().and_then(|p| usize::try_from(p.line()).ok()) {
                while rows.len() + 1 < line {
                    rows.push(Vec::new());
                }
            }
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(vec![RawSheet::new(sheet_name_for(path), rows)])
    }

    fn write(&self, path: &Path, sheets: &[RawSheet]) -> SheetResult<()> {
        let [sheet] = sheets else {
            return Err(SheetError::Format {
                message: format!(
                    "csv file {} holds exactly one sheet, got {}",
                    path.display(),
                    sheets.len()
                ),
            });
        };

        let mut wtr = ::csv::WriterBuilder::new()
            .flexible(true)
            .delimiter(self.delimiter)
            .from_path(path)?;
        for row in &sheet.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

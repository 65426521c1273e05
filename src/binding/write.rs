//! Records -> raw sheet rows.

use crate::aggregate::AggregatedError;
use crate::codec::{RawSheet, WorkbookCodec};
use crate::coercion::Coercer;
use crate::error::{Location, SheetResult};
use crate::schema::{Record, Schema};
use crate::sheet::IndexOptions;

use super::BindOptions;

/// Outcome of writing one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub sheet_name: String,
    /// Records that made it into the sheet.
    pub rows_written: usize,
    /// Offset to read the sheet back with: the header row, plus one when a comment row
    /// was written.
    pub data_row_offset: usize,
}

pub(crate) struct Encoded {
    pub raw: RawSheet,
    pub summary: WriteSummary,
    pub failed_rows: usize,
}

/// Lay out `records` as a raw sheet: header, optional comment row, one row per record.
///
/// Records that fail to encode are skipped and their error appended to `errors`.
pub(crate) fn encode_sheet<R: Record>(
    file_name: &str,
    sheet_name: &str,
    records: &[R],
    schema: &Schema<R>,
    options: &BindOptions,
    codec: &dyn WorkbookCodec,
    errors: &mut AggregatedError,
) -> Encoded {
    let header_row_index = options.index.header_row_index.max(1);
    let data_row_offset = header_row_index + usize::from(schema.has_comments());

    let mut rows: Vec<Vec<String>> = vec![Vec::new(); header_row_index - 1];
    rows.push(schema.headers());
    if schema.has_comments() {
        rows.push(schema.comments());
    }

    let coercer = Coercer::new(&options.coercion);
    let location = Location::new(file_name, sheet_name, "");
    let mut failed_rows = 0;
    for record in records {
        let row_index = rows.len() + 1;
        match encode_row(record, row_index, schema, &coercer, &location, &options.index, codec) {
            Ok(row) => rows.push(row),
            Err(e) => {
                failed_rows += 1;
                errors.append(e);
            }
        }
    }

    Encoded {
        summary: WriteSummary {
            sheet_name: sheet_name.to_string(),
            rows_written: rows.len() - data_row_offset,
            data_row_offset,
        },
        raw: RawSheet::new(sheet_name, rows),
        failed_rows,
    }
}

fn encode_row<R: Record>(
    record: &R,
    row_index: usize,
    schema: &Schema<R>,
    coercer: &Coercer<'_>,
    location: &Location,
    index: &IndexOptions,
    codec: &dyn WorkbookCodec,
) -> SheetResult<Vec<String>> {
    schema
        .bound()
        .enumerate()
        .map(|(col, field)| {
            let address = codec
                .coordinates_to_address(col + 1, row_index, index.absolute_addressing)
                .unwrap_or_else(|_| format!("row {row_index}, column {}", col + 1));
            field.encode_from(record, coercer, &location.at(address))
        })
        .collect()
}

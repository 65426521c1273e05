//! Sheet model -> records.

use crate::aggregate::AggregatedError;
use crate::coercion::{Coercer, CoercionOptions};
use crate::error::{Location, SheetResult};
use crate::schema::{Record, Schema};
use crate::types::SheetModel;

pub(crate) struct Decoded<R> {
    pub records: Vec<R>,
    pub failed_rows: usize,
}

/// Decode every data row of `sheet`, in row order.
///
/// A row whose fields fail is skipped and its first error appended to `errors`.
pub(crate) fn decode_sheet<R: Record>(
    sheet: &SheetModel,
    schema: &Schema<R>,
    coercion: &CoercionOptions,
    errors: &mut AggregatedError,
) -> Decoded<R> {
    let coercer = Coercer::new(coercion);
    let location = sheet.location("");
    let mut decoded = Decoded {
        records: Vec::with_capacity(sheet.data_total),
        failed_rows: 0,
    };

    for row_index in sheet.row_indices() {
        match decode_row(sheet, row_index, schema, &coercer, &location) {
            Ok(record) => decoded.records.push(record),
            Err(e) => {
                decoded.failed_rows += 1;
                errors.append(e);
            }
        }
    }
    decoded
}

fn decode_row<R: Record>(
    sheet: &SheetModel,
    row_index: usize,
    schema: &Schema<R>,
    coercer: &Coercer<'_>,
    location: &Location,
) -> SheetResult<R> {
    let mut record = R::default();
    for field in schema.bound() {
        let cell = sheet.get_cell(row_index, &field.schema().column, false)?;
        field.decode_into(&mut record, cell, coercer, location)?;
    }
    Ok(record)
}

//! Indexing raw sheets into [`SheetModel`]s.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::codec::{RawSheet, WorkbookCodec};
use crate::error::{Location, SheetError, SheetResult};
use crate::types::{Cell, Dataset, SheetModel};

/// Decides whether a raw cell string counts as empty.
pub type EmptinessPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Options controlling how raw rows are indexed.
#[derive(Clone)]
pub struct IndexOptions {
    /// 1-based row holding the header keys.
    pub header_row_index: usize,
    /// Rows at or before this 1-based index are excluded from data.
    pub data_row_offset: usize,
    /// Accept identical header cells instead of failing.
    pub allow_duplicate_headers: bool,
    /// Render addresses as `$B$3` instead of `B3`.
    pub absolute_addressing: bool,
    /// Emptiness predicate applied to every cell value.
    pub is_empty: EmptinessPredicate,
}

impl fmt::Debug for IndexOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexOptions")
            .field("header_row_index", &self.header_row_index)
            .field("data_row_offset", &self.data_row_offset)
            .field("allow_duplicate_headers", &self.allow_duplicate_headers)
            .field("absolute_addressing", &self.absolute_addressing)
            .finish_non_exhaustive()
    }
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            header_row_index: 1,
            data_row_offset: 1,
            allow_duplicate_headers: false,
            absolute_addressing: false,
            is_empty: Arc::new(|v: &str| v.is_empty()),
        }
    }
}

impl IndexOptions {
    /// Header row and data offset, clamped to 1 and checked for consistency.
    pub fn effective_rows(&self) -> SheetResult<(usize, usize)> {
        let header = self.header_row_index.max(1);
        let offset = self.data_row_offset.max(1);
        if offset < header {
            return Err(SheetError::Config {
                message: format!("data row offset {offset} is before header row {header}"),
            });
        }
        Ok((header, offset))
    }
}

/// Index one raw sheet.
///
/// Fails with [`SheetError::DuplicateHeader`] when two header cells are identical and
/// duplicates are not allowed.
pub fn index_sheet(
    file_name: &str,
    raw: &RawSheet,
    options: &IndexOptions,
    codec: &dyn WorkbookCodec,
) -> SheetResult<SheetModel> {
    let (header_row_index, data_row_offset) = options.effective_rows()?;
    let location = Location::new(file_name, raw.name.clone(), "");

    let row_total = raw.rows.len();
    let mut model = SheetModel {
        sheet_name: raw.name.clone(),
        file_name: file_name.to_string(),
        row_total,
        data_total: row_total.saturating_sub(data_row_offset),
        data_row_offset,
        header_row_index,
        header_keys: Vec::new(),
        rows: BTreeMap::new(),
        key_index: HashMap::new(),
    };

    let Some(header) = raw.rows.get(header_row_index - 1) else {
        // Not even a header row: an empty sheet.
        model.data_total = 0;
        return Ok(model);
    };

    let mut seen = HashSet::with_capacity(header.len());
    for (col, key) in header.iter().enumerate() {
        if !seen.insert(key.as_str()) && !options.allow_duplicate_headers {
            let address = codec
                .coordinates_to_address(col + 1, header_row_index, options.absolute_addressing)
                .unwrap_or_default();
            return Err(SheetError::DuplicateHeader {
                location: location.at(address),
                header: key.clone(),
            });
        }
        model.key_index.entry(key.clone()).or_insert(col);
    }
    model.header_keys = header.clone();

    for (idx0, row) in raw.rows.iter().enumerate().skip(data_row_offset) {
        let row_index = idx0 + 1;
        let cells = header
            .iter()
            .enumerate()
            .map(|(col, key)| build_cell(row_index, col, key, row, options, codec))
            .collect();
        model.rows.insert(row_index, cells);
    }

    Ok(model)
}

fn build_cell(
    row_index: usize,
    col: usize,
    key: &str,
    row: &[String],
    options: &IndexOptions,
    codec: &dyn WorkbookCodec,
) -> Cell {
    let (address, err_msg) =
        match codec.coordinates_to_address(col + 1, row_index, options.absolute_addressing) {
            Ok(a) => (a, None),
            Err(e) => (String::new(), Some(e.to_string())),
        };

    // Ragged rows: a column past the end of the physical row is an empty cell.
    let (value, is_empty) = match row.get(col) {
        Some(v) => (v.clone(), (options.is_empty)(v)),
        None => (String::new(), true),
    };

    Cell {
        row_index,
        col_index: col + 1,
        key: key.to_string(),
        value,
        address,
        is_empty,
        err_msg,
    }
}

/// Index every sheet of a file.
pub fn index_dataset(
    file_name: &str,
    raw_sheets: &[RawSheet],
    options: &IndexOptions,
    codec: &dyn WorkbookCodec,
) -> SheetResult<Dataset> {
    if raw_sheets.is_empty() {
        return Err(SheetError::NoSheet {
            file: file_name.to_string(),
        });
    }
    let sheets = raw_sheets
        .iter()
        .map(|raw| index_sheet(file_name, raw, options, codec))
        .collect::<SheetResult<Vec<_>>>()?;
    Ok(Dataset::new(file_name, sheets))
}

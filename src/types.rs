//! Core data model: cells, indexed sheets and whole-file datasets.
//!
//! A [`Dataset`] is produced by one parse call and holds one [`SheetModel`] per sheet. Each
//! sheet model owns its [`Cell`]s, addressable by (row, header key) or (row, column).

use std::collections::{BTreeMap, HashMap};

use crate::aggregate::AggregatedError;
use crate::error::{Location, SheetError, SheetResult};

/// One indexed cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// 1-based row number, as shown by spreadsheet applications.
    pub row_index: usize,
    /// 1-based column number.
    pub col_index: usize,
    /// Header key of the column.
    pub key: String,
    /// Raw string value (empty for missing trailing cells).
    pub value: String,
    /// Cell address such as `B3` (or `$B$3` with absolute addressing).
    pub address: String,
    /// Result of the emptiness predicate.
    pub is_empty: bool,
    /// Set when the address could not be computed.
    pub err_msg: Option<String>,
}

/// A sheet indexed into an addressable cell grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetModel {
    pub sheet_name: String,
    pub file_name: String,
    /// Physical rows in the sheet, header rows included.
    pub row_total: usize,
    /// Rows after the data row offset.
    pub data_total: usize,
    /// Rows at or before this 1-based index are not data.
    pub data_row_offset: usize,
    /// 1-based index of the header row.
    pub header_row_index: usize,
    /// Header keys in column order.
    pub header_keys: Vec<String>,
    /// Data rows by 1-based row index; one cell per header column, in column order.
    pub(crate) rows: BTreeMap<usize, Vec<Cell>>,
    /// Header key -> first column position carrying it.
    pub(crate) key_index: HashMap<String, usize>,
}

impl SheetModel {
    /// Location of this sheet with the given coordinates.
    pub fn location(&self, coordinates: impl Into<String>) -> Location {
        Location::new(self.file_name.clone(), self.sheet_name.clone(), coordinates)
    }

    /// Iterate data rows in row order as `(row_index, cells)`.
    pub fn rows(&self) -> impl Iterator<Item = (usize, &[Cell])> {
        self.rows.iter().map(|(idx, cells)| (*idx, cells.as_slice()))
    }

    /// 1-based indices of the data rows, in order.
    pub fn row_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.rows.keys().copied()
    }

    /// True when the header contains `key`.
    pub fn has_key(&self, key: &str) -> bool {
        self.key_index.contains_key(key)
    }

    fn check_row(&self, row_index: usize) -> SheetResult<&[Cell]> {
        if row_index <= self.data_row_offset {
            return Err(SheetError::RowRange {
                location: self.location(format!("row {row_index}")),
                row: row_index,
                message: format!(
                    "rows up to {} are header rows, data starts at row {}",
                    self.data_row_offset,
                    self.data_row_offset + 1
                ),
            });
        }
        if row_index > self.data_total + self.data_row_offset {
            return Err(SheetError::RowRange {
                location: self.location(format!("row {row_index}")),
                row: row_index,
                message: format!("sheet has {} data rows", self.data_total),
            });
        }
        self.rows
            .get(&row_index)
            .map(|cells| cells.as_slice())
            .ok_or_else(|| SheetError::RowRange {
                location: self.location(format!("row {row_index}")),
                row: row_index,
                message: "row was not indexed".to_string(),
            })
    }

    /// Cell at `row_index` under header `key`.
    ///
    /// With `check_empty`, an empty cell fails with [`SheetError::EmptyValue`].
    pub fn get_cell(&self, row_index: usize, key: &str, check_empty: bool) -> SheetResult<&Cell> {
        let cells = self.check_row(row_index)?;
        let col = self.key_index.get(key).copied().ok_or_else(|| SheetError::FieldNotFound {
            location: self.location(format!("key {key}")),
            key: key.to_string(),
        })?;
        let cell = cells.get(col).ok_or_else(|| SheetError::FieldNotFound {
            location: self.location(format!("row {row_index}, key {key}")),
            key: key.to_string(),
        })?;
        if check_empty && cell.is_empty {
            return Err(SheetError::EmptyValue {
                location: self.location(cell.address.clone()),
                key: key.to_string(),
            });
        }
        Ok(cell)
    }

    /// Cell at `row_index` in 1-based column `col_index`, regardless of header text.
    pub fn cell_at(&self, row_index: usize, col_index: usize) -> SheetResult<&Cell> {
        let cells = self.check_row(row_index)?;
        col_index
            .checked_sub(1)
            .and_then(|c| cells.get(c))
            .ok_or_else(|| SheetError::FieldNotFound {
                location: self.location(format!("row {row_index}, column {col_index}")),
                key: format!("#{col_index}"),
            })
    }

    /// Raw string value of a cell.
    pub fn get_string(&self, row_index: usize, key: &str, check_empty: bool) -> SheetResult<String> {
        self.get_cell(row_index, key, check_empty).map(|c| c.value.clone())
    }

    /// Integer value of a cell; an empty cell reads as `0`.
    pub fn get_int(&self, row_index: usize, key: &str, check_empty: bool) -> SheetResult<i64> {
        let cell = self.get_cell(row_index, key, check_empty)?;
        if cell.value.is_empty() {
            return Ok(0);
        }
        cell.value.trim().parse::<i64>().map_err(|e| SheetError::TypeMismatch {
            location: self.location(cell.address.clone()),
            key: key.to_string(),
            raw: cell.value.clone(),
            message: e.to_string(),
        })
    }

    /// Like [`Self::get_string`], collecting the error and returning `""` on failure.
    pub fn get_string_or_collect(
        &self,
        row_index: usize,
        key: &str,
        check_empty: bool,
        errors: &mut AggregatedError,
    ) -> String {
        errors
            .collect(self.get_string(row_index, key, check_empty))
            .unwrap_or_default()
    }

    /// Like [`Self::get_int`], collecting the error and returning `0` on failure.
    pub fn get_int_or_collect(
        &self,
        row_index: usize,
        key: &str,
        check_empty: bool,
        errors: &mut AggregatedError,
    ) -> i64 {
        errors
            .collect(self.get_int(row_index, key, check_empty))
            .unwrap_or_default()
    }
}

/// All sheets of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub file_name: String,
    sheets: Vec<SheetModel>,
    by_name: HashMap<String, usize>,
}

impl Dataset {
    /// Build a dataset from sheets in workbook order.
    pub fn new(file_name: impl Into<String>, sheets: Vec<SheetModel>) -> Self {
        let mut by_name = HashMap::with_capacity(sheets.len());
        for (idx, sheet) in sheets.iter().enumerate() {
            by_name.entry(sheet.sheet_name.clone()).or_insert(idx);
        }
        Self {
            file_name: file_name.into(),
            sheets,
            by_name,
        }
    }

    /// Number of sheets.
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.sheet_name.as_str()).collect()
    }

    /// Sheet by 1-based index.
    pub fn sheet(&self, index: usize) -> Option<&SheetModel> {
        index.checked_sub(1).and_then(|i| self.sheets.get(i))
    }

    /// Sheet by name.
    pub fn sheet_by_name(&self, name: &str) -> Option<&SheetModel> {
        self.by_name.get(name).map(|&i| &self.sheets[i])
    }

    /// Iterate sheets in workbook order.
    pub fn sheets(&self) -> impl Iterator<Item = &SheetModel> {
        self.sheets.iter()
    }
}

//! Workbook codecs: the physical file boundary.
//!
//! The binding core only needs three things from a codec: open a file as ordered sheets of
//! string rows, persist sheets of string rows, and turn 1-based (column, row) coordinates
//! into an address string. [`WorkbookCodec`] captures exactly that.
//!
//! Implementations:
//! - [`xlsx::XlsxCodec`]: `calamine` for reading, `rust_xlsxwriter` for writing
//! - [`csv::CsvCodec`]: single-sheet CSV files
//! - [`memory::MemoryCodec`]: in-process store, handy for tests

pub mod csv;
pub mod memory;
pub mod xlsx;

use std::path::Path;

use rust_xlsxwriter::utility::{row_col_to_cell, row_col_to_cell_absolute};

use crate::error::{SheetError, SheetResult};

pub use self::csv::CsvCodec;
pub use self::memory::MemoryCodec;
pub use self::xlsx::XlsxCodec;

/// Largest 1-based row number an address can refer to.
pub const MAX_ROWS: usize = 1_048_576;
/// Largest 1-based column number an address can refer to.
pub const MAX_COLUMNS: usize = 16_384;

/// A sheet as the codec sees it: a name and rows of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

/// Physical file access used by the binder.
pub trait WorkbookCodec: Send + Sync {
    /// Read every sheet of `path`, in workbook order.
    fn open(&self, path: &Path) -> SheetResult<Vec<RawSheet>>;

    /// Persist `sheets` to `path`, replacing any existing file.
    fn write(&self, path: &Path, sheets: &[RawSheet]) -> SheetResult<()>;

    /// Address of the 1-based (`col`, `row`) cell, e.g. `(2, 3)` -> `B3`.
    fn coordinates_to_address(&self, col: usize, row: usize, absolute: bool) -> SheetResult<String> {
        coordinates_to_address(col, row, absolute)
    }
}

/// Spreadsheet-style address of a 1-based (`col`, `row`) cell.
///
/// `absolute` renders `$B$3` instead of `B3`.
pub fn coordinates_to_address(col: usize, row: usize, absolute: bool) -> SheetResult<String> {
    if !(1..=MAX_COLUMNS).contains(&col) || !(1..=MAX_ROWS).contains(&row) {
        return Err(SheetError::Format {
            message: format!("coordinates ({col}, {row}) are outside the sheet bounds"),
        });
    }
    // Both bounds fit: MAX_ROWS - 1 < u32::MAX, MAX_COLUMNS - 1 < u16::MAX.
    let (r, c) = ((row - 1) as u32, (col - 1) as u16);
    Ok(if absolute {
        row_col_to_cell_absolute(r, c)
    } else {
        row_col_to_cell(r, c)
    })
}

/// File formats with a built-in codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookFormat {
    /// Spreadsheet workbooks (read: xlsx/xlsm/xlsb/xls/ods, write: xlsx).
    Xlsx,
    /// Comma-separated values, one sheet per file.
    Csv,
}

impl WorkbookFormat {
    /// Parse a format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(Self::Xlsx),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    /// Infer the format of `path` from its extension.
    pub fn from_path(path: &Path) -> SheetResult<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| SheetError::Format {
                message: format!("cannot infer format: path has no extension ({})", path.display()),
            })?;

        Self::from_extension(ext).ok_or_else(|| SheetError::Format {
            message: format!(
                "cannot infer format from extension '{ext}' for path ({})",
                path.display()
            ),
        })
    }

    /// The built-in codec for this format.
    pub fn codec(self) -> Box<dyn WorkbookCodec> {
        match self {
            WorkbookFormat::Xlsx => Box::new(XlsxCodec),
            WorkbookFormat::Csv => Box::new(CsvCodec::default()),
        }
    }
}

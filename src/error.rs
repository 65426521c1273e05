use std::fmt;

use thiserror::Error;

use crate::aggregate::AggregatedError;

/// Convenience result type for binding operations.
pub type SheetResult<T> = Result<T, SheetError>;

/// Where an error happened: file, sheet and cell coordinates (or a row/key description).
///
/// Any of the parts may be empty when not applicable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// File name as given to the binder.
    pub file: String,
    /// Sheet name.
    pub sheet: String,
    /// Cell address (e.g. `B3`) or a free-form position such as `row 3`.
    pub coordinates: String,
}

impl Location {
    /// Create a location.
    pub fn new(file: impl Into<String>, sheet: impl Into<String>, coordinates: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            sheet: sheet.into(),
            coordinates: coordinates.into(),
        }
    }

    /// Same file and sheet, different coordinates.
    pub fn at(&self, coordinates: impl Into<String>) -> Self {
        Self {
            file: self.file.clone(),
            sheet: self.sheet.clone(),
            coordinates: coordinates.into(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "file '{}', sheet '{}', at {}",
            self.file,
            self.sheet,
            if self.coordinates.is_empty() { "-" } else { &self.coordinates }
        )
    }
}

/// Error type returned by binding functions.
///
/// A single enum shared by the codecs, the sheet model, the coercion engine, the serializer
/// registry and the orchestrators.
#[derive(Debug, Error)]
pub enum SheetError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Workbook reading error.
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// Workbook writing error.
    #[error("xlsx write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    /// CSV reading/writing error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON conversion of a composite field value failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid binder configuration (e.g. data row offset before the header row).
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// The file format cannot be inferred or the codec cannot represent the request.
    #[error("format error: {message}")]
    Format { message: String },

    /// The workbook holds no sheet at all.
    #[error("file '{file}' has no sheet")]
    NoSheet { file: String },

    /// The selected sheet does not exist.
    #[error("{location}: sheet {selector} not found")]
    SheetNotFound { location: Location, selector: String },

    /// The record type cannot be bound (no bindable field, bad descriptor table).
    #[error("schema error: {message}")]
    Schema { message: String },

    /// Two header cells carry the same text and duplicates are not allowed.
    #[error("{location}: duplicate header '{header}'")]
    DuplicateHeader { location: Location, header: String },

    /// The requested row is not a data row.
    #[error("{location}: row {row} out of range: {message}")]
    RowRange {
        location: Location,
        row: usize,
        message: String,
    },

    /// The header key is not present in the sheet header.
    #[error("{location}: field '{key}' not found in header")]
    FieldNotFound { location: Location, key: String },

    /// A cell is empty while non-empty values are required.
    #[error("{location}: field '{key}' value is empty")]
    EmptyValue { location: Location, key: String },

    /// A cell value (or a configured default) could not be coerced into the field type.
    #[error("{location}: field '{key}' value '{raw}' does not match the field type: {message}")]
    TypeMismatch {
        location: Location,
        key: String,
        raw: String,
        message: String,
    },

    /// The field value type cannot hold the coerced scalar.
    #[error("{location}: field '{key}' type {kind} is not supported")]
    UnsupportedType {
        location: Location,
        key: String,
        kind: String,
    },

    /// A serializer with this name is already registered (or the name is reserved).
    #[error("serializer '{name}' already registered")]
    SerializerConflict { name: String },

    /// A serializer was registered without its marshal or unmarshal handler.
    #[error("serializer '{name}' is missing its {handler} handler")]
    SerializerMissingHandler { name: String, handler: &'static str },

    /// No serializer is registered under this name.
    #[error("serializer '{name}' not found")]
    SerializerNotFound { name: String },

    /// A serializer handler failed on a concrete cell.
    #[error("{location}: serializer '{serializer}' failed on field '{key}': {message}")]
    Serialization {
        location: Location,
        key: String,
        serializer: String,
        message: String,
    },

    /// Independent row/field failures collected during one pass.
    #[error("{0}")]
    Aggregated(AggregatedError),
}

impl SheetError {
    /// The location attached to this error, if any.
    pub fn location(&self) -> Option<&Location> {
        match self {
            SheetError::SheetNotFound { location, .. }
            | SheetError::DuplicateHeader { location, .. }
            | SheetError::RowRange { location, .. }
            | SheetError::FieldNotFound { location, .. }
            | SheetError::EmptyValue { location, .. }
            | SheetError::TypeMismatch { location, .. }
            | SheetError::UnsupportedType { location, .. }
            | SheetError::Serialization { location, .. } => Some(location),
            _ => None,
        }
    }

    /// The individual errors behind this one: the aggregated list, or `self` alone.
    pub fn errors(&self) -> Vec<&SheetError> {
        match self {
            SheetError::Aggregated(agg) => agg.iter().collect(),
            other => vec![other],
        }
    }
}

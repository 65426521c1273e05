//! `sheet-records` binds typed record collections to spreadsheet-like files and back, driven
//! by per-field metadata tags.
//!
//! The primary entrypoints are [`SheetBinder::unmarshal`] (rows -> records) and
//! [`SheetBinder::marshal`] (records -> rows). The file format is inferred from the extension
//! (or forced via [`BindOptions::format`]).
//!
//! ## What you can bind
//!
//! **File formats (auto-detected by extension):**
//!
//! - **Workbooks**: read `.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`; write `.xlsx`
//! - **CSV**: `.csv`, one sheet named after the file stem
//!
//! **Field types:**
//!
//! - scalars: `i8..i64`, `u8..u64`, `f32`, `f64`, `bool`, `String`, and `Option` of those
//! - composites: anything `Serialize + DeserializeOwned`, stored as one cell through a named
//!   serializer (JSON by default)
//!
//! ## Field tags
//!
//! `column:<header>;default:<value>;comment:<text>;skip;serializer:<name>`
//!
//! - `column` is the header key (defaults to the field name); `column:-` skips the field
//! - `default` fills empty cells on read and zero values on write
//! - `comment` adds a comment row under the header on write
//! - `serializer` picks a registered serializer for a composite field
//!
//! ## Quick example
//!
//! ```no_run
//! use serde::{Deserialize, Serialize};
//! use sheet_records::{record, BindOptions, SheetBinder, SheetSelector};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct Detail {
//!     height: u32,
//! }
//!
//! #[derive(Debug, Default)]
//! struct Info {
//!     name: String,
//!     age: i32,
//!     detail: Detail,
//! }
//!
//! record!(Info {
//!     name: "column:user_name",
//!     age: "column:age;default:0",
//!     #[composite]
//!     detail: "column:details",
//! });
//!
//! # fn main() -> Result<(), sheet_records::SheetError> {
//! let binder = SheetBinder::new(BindOptions::default());
//! let mut infos: Vec<Info> = Vec::new();
//! binder.unmarshal("people.xlsx", SheetSelector::First, &mut infos)?;
//! binder.marshal("copy.xlsx", "Infos", &infos)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`binding`]: the binder, its options and observer hooks
//! - [`schema`]: record descriptors and tag parsing
//! - [`coercion`]: cell string <-> typed value conversion
//! - [`serializer`]: named serializers for composite fields
//! - [`types`] / [`sheet`]: indexed sheets and cells
//! - [`codec`]: physical file access
//! - [`aggregate`] / [`error`]: error types

pub mod aggregate;
pub mod binding;
pub mod codec;
pub mod coercion;
pub mod error;
pub mod schema;
pub mod serializer;
pub mod sheet;
pub mod types;

pub use aggregate::AggregatedError;
pub use binding::observability::{
    BindContext, BindObserver, BindOperation, BindSeverity, BindStats, CompositeObserver, FileObserver,
    StdErrObserver,
};
pub use binding::{BindOptions, SheetBinder, SheetSelector, WriteSummary};
pub use codec::{RawSheet, WorkbookCodec, WorkbookFormat};
pub use error::{Location, SheetError, SheetResult};
pub use schema::{FieldDescriptor, FieldValue, Record};
pub use serializer::{Serializer, SerializerRegistry};
pub use types::{Cell, Dataset, SheetModel};

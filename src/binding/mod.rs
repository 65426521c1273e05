//! Record binding entry points.
//!
//! Most callers build a [`SheetBinder`] and use [`SheetBinder::unmarshal`] /
//! [`SheetBinder::marshal`]:
//!
//! - If [`BindOptions::format`] is `None`, the file format is inferred from the extension.
//! - If a [`observability::BindObserver`] is configured, every path-based call reports
//!   success, failure and alerts to it.
//!
//! Schema problems (unknown serializer, nothing to bind) abort a call before any row is
//! touched. Row and record problems are collected into one
//! [`AggregatedError`](crate::aggregate::AggregatedError) and returned after the pass.

pub mod observability;
mod read;
mod write;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::aggregate::AggregatedError;
use crate::codec::{RawSheet, WorkbookCodec, WorkbookFormat};
use crate::coercion::CoercionOptions;
use crate::error::{Location, SheetError, SheetResult};
use crate::schema::{Record, Schema};
use crate::serializer::{MarshalFn, SerializerRegistry, UnmarshalFn};
use crate::sheet::{IndexOptions, index_dataset, index_sheet};
use crate::types::{Dataset, SheetModel};

use observability::{BindContext, BindObserver, BindOperation, BindSeverity, BindStats, severity_for_error};

pub use write::WriteSummary;

/// Which sheet of a workbook to read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SheetSelector {
    /// The first sheet (default).
    #[default]
    First,
    /// Sheet by 1-based position.
    Index(usize),
    /// Sheet by name.
    Name(String),
}

impl From<usize> for SheetSelector {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for SheetSelector {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for SheetSelector {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::First => f.write_str("#1"),
            SheetSelector::Index(i) => write!(f, "#{i}"),
            SheetSelector::Name(n) => write!(f, "'{n}'"),
        }
    }
}

/// Options controlling a [`SheetBinder`].
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct BindOptions {
    /// If `None`, auto-detect format from file extension.
    pub format: Option<WorkbookFormat>,
    /// Header/data row layout and cell indexing.
    pub index: IndexOptions,
    /// Cell <-> value coercion.
    pub coercion: CoercionOptions,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn BindObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: BindSeverity,
}

impl fmt::Debug for BindOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindOptions")
            .field("format", &self.format)
            .field("index", &self.index)
            .field("coercion", &self.coercion)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            format: None,
            index: IndexOptions::default(),
            coercion: CoercionOptions::default(),
            observer: None,
            alert_at_or_above: BindSeverity::Critical,
        }
    }
}

/// Binds record types to workbook files.
///
/// Owns its options and serializer registry; calls never mutate the binder, so one binder
/// can be shared across threads once configured.
///
/// # Examples
///
/// ```no_run
/// use sheet_records::{record, BindOptions, SheetBinder, SheetSelector};
///
/// #[derive(Debug, Default)]
/// struct Info {
///     name: String,
///     age: i32,
/// }
///
/// record!(Info {
///     name: "column:user_name;comment:person name",
///     age: "column:age;default:0",
/// });
///
/// # fn main() -> Result<(), sheet_records::SheetError> {
/// let binder = SheetBinder::new(BindOptions::default());
/// let rows = vec![Info { name: "a".into(), age: 18 }];
/// let summary = binder.marshal("infos.xlsx", "Infos", &rows)?;
///
/// // The comment row moved data down by one.
/// let mut options = BindOptions::default();
/// options.index.data_row_offset = summary.data_row_offset;
/// let reader = SheetBinder::new(options);
/// let mut back: Vec<Info> = Vec::new();
/// reader.unmarshal("infos.xlsx", SheetSelector::from("Infos"), &mut back)?;
/// # Ok(())
/// # }
/// ```
pub struct SheetBinder {
    options: BindOptions,
    registry: SerializerRegistry,
    codec: Option<Arc<dyn WorkbookCodec>>,
}

impl fmt::Debug for SheetBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetBinder")
            .field("options", &self.options)
            .field("serializers", &self.registry.names())
            .field("custom_codec", &self.codec.is_some())
            .finish()
    }
}

impl Default for SheetBinder {
    fn default() -> Self {
        Self::new(BindOptions::default())
    }
}

impl SheetBinder {
    /// A binder using the built-in codec of each file's format.
    pub fn new(options: BindOptions) -> Self {
        Self {
            options,
            registry: SerializerRegistry::new(),
            codec: None,
        }
    }

    /// A binder reading and writing every file through `codec`.
    pub fn with_codec(options: BindOptions, codec: Arc<dyn WorkbookCodec>) -> Self {
        Self {
            options,
            registry: SerializerRegistry::new(),
            codec: Some(codec),
        }
    }

    pub fn options(&self) -> &BindOptions {
        &self.options
    }

    pub fn registry(&self) -> &SerializerRegistry {
        &self.registry
    }

    /// Register a named serializer for composite fields.
    ///
    /// See [`SerializerRegistry::register`] for the failure cases.
    pub fn register_serializer(
        &mut self,
        name: &str,
        marshal: Option<MarshalFn>,
        unmarshal: Option<UnmarshalFn>,
    ) -> SheetResult<()> {
        self.registry.register(name, marshal, unmarshal)
    }

    /// Open `path` and index every sheet.
    pub fn parse(&self, path: impl AsRef<Path>) -> SheetResult<Dataset> {
        let path = path.as_ref();
        let (format, codec) = self.codec_for(path)?;
        let ctx = BindContext::new(path, format, BindOperation::Parse);

        let result = codec
            .open(path)
            .and_then(|raws| index_dataset(&file_name_of(path), &raws, &self.options.index, codec.as_ref()));

        let stats = match &result {
            Ok(ds) => BindStats {
                rows: ds.sheets().map(|s| s.data_total).sum(),
                failed_rows: 0,
            },
            Err(_) => BindStats::default(),
        };
        self.report(&ctx, stats, &result);
        result
    }

    /// Read the selected sheet of `path` into `out`.
    ///
    /// `out` is replaced with every record that decoded cleanly, in row order. Rows that
    /// failed are skipped and returned together as [`SheetError::Aggregated`]. On a schema,
    /// file or sheet error `out` is left untouched.
    pub fn unmarshal<R: Record>(
        &self,
        path: impl AsRef<Path>,
        selector: impl Into<SheetSelector>,
        out: &mut Vec<R>,
    ) -> SheetResult<()> {
        let path = path.as_ref();
        let selector = selector.into();
        let (format, codec) = self.codec_for(path)?;
        let mut ctx = BindContext::new(path, format, BindOperation::Unmarshal);
        let mut stats = BindStats::default();

        let result = self.read_selected(path, &selector, codec.as_ref(), &mut ctx, &mut stats, out);
        self.report(&ctx, stats, &result);
        result
    }

    fn read_selected<R: Record>(
        &self,
        path: &Path,
        selector: &SheetSelector,
        codec: &dyn WorkbookCodec,
        ctx: &mut BindContext,
        stats: &mut BindStats,
        out: &mut Vec<R>,
    ) -> SheetResult<()> {
        let schema = Schema::<R>::resolve(&self.registry)?;
        let file_name = file_name_of(path);
        let raws = codec.open(path)?;
        let raw = select_raw(&file_name, &raws, selector)?;
        ctx.sheet = Some(raw.name.clone());

        let sheet = index_sheet(&file_name, raw, &self.options.index, codec)?;
        let mut errors = AggregatedError::new();
        let decoded = read::decode_sheet(&sheet, &schema, &self.options.coercion, &mut errors);
        *stats = BindStats {
            rows: decoded.records.len(),
            failed_rows: decoded.failed_rows,
        };
        *out = decoded.records;
        errors.into_result()
    }

    /// Read an already parsed sheet into `out`, with the same rules as [`Self::unmarshal`].
    pub fn unmarshal_sheet<R: Record>(&self, sheet: &SheetModel, out: &mut Vec<R>) -> SheetResult<()> {
        let schema = Schema::<R>::resolve(&self.registry)?;
        let mut errors = AggregatedError::new();
        *out = read::decode_sheet(sheet, &schema, &self.options.coercion, &mut errors).records;
        errors.into_result()
    }

    /// Read several named sheets of `path` in one open of the file.
    ///
    /// `out` is replaced with one `(sheet name, records)` entry per requested sheet, in the
    /// requested order. Row errors from every sheet end up in one aggregated error.
    pub fn unmarshal_sheets<R: Record, S: AsRef<str>>(
        &self,
        path: impl AsRef<Path>,
        names: &[S],
        out: &mut Vec<(String, Vec<R>)>,
    ) -> SheetResult<()> {
        let path = path.as_ref();
        let (format, codec) = self.codec_for(path)?;
        let mut ctx = BindContext::new(path, format, BindOperation::Unmarshal);
        ctx.sheet = Some(names.iter().map(|n| n.as_ref()).collect::<Vec<&str>>().join(","));
        let mut stats = BindStats::default();

        let result = self.read_named(path, names, codec.as_ref(), &mut stats, out);
        self.report(&ctx, stats, &result);
        result
    }

    fn read_named<R: Record, S: AsRef<str>>(
        &self,
        path: &Path,
        names: &[S],
        codec: &dyn WorkbookCodec,
        stats: &mut BindStats,
        out: &mut Vec<(String, Vec<R>)>,
    ) -> SheetResult<()> {
        let schema = Schema::<R>::resolve(&self.registry)?;
        let file_name = file_name_of(path);
        let raws = codec.open(path)?;

        let mut models = Vec::with_capacity(names.len());
        for name in names {
            let name: &str = name.as_ref();
            let raw = select_raw(&file_name, &raws, &SheetSelector::from(name))?;
            models.push(index_sheet(&file_name, raw, &self.options.index, codec)?);
        }

        let mut errors = AggregatedError::new();
        let mut results = Vec::with_capacity(models.len());
        for sheet in &models {
            let decoded = read::decode_sheet(sheet, &schema, &self.options.coercion, &mut errors);
            stats.rows += decoded.records.len();
            stats.failed_rows += decoded.failed_rows;
            results.push((sheet.sheet_name.clone(), decoded.records));
        }
        *out = results;
        errors.into_result()
    }

    /// Write `records` to `path` as a single sheet called `sheet_name`.
    ///
    /// Records that fail to encode are skipped; the file is still written and the collected
    /// errors are returned as [`SheetError::Aggregated`].
    ///
    /// In xlsx files a row of empty cells stores nothing. When the last records encode to
    /// nothing but empty cells, those rows are absent on read and fewer records come back
    /// than `rows_written` counts.
    pub fn marshal<R: Record>(
        &self,
        path: impl AsRef<Path>,
        sheet_name: &str,
        records: &[R],
    ) -> SheetResult<WriteSummary> {
        let mut summaries = self.marshal_sheets(path, [(sheet_name, records)])?;
        summaries.pop().ok_or_else(|| SheetError::Config {
            message: "no sheet was written".to_string(),
        })
    }

    /// Write one sheet per `(name, records)` entry to `path`, in the given order.
    pub fn marshal_sheets<'a, R, N, I>(&self, path: impl AsRef<Path>, sheets: I) -> SheetResult<Vec<WriteSummary>>
    where
        R: Record,
        N: AsRef<str>,
        I: IntoIterator<Item = (N, &'a [R])>,
    {
        let path = path.as_ref();
        let (format, codec) = self.codec_for(path)?;
        let mut ctx = BindContext::new(path, format, BindOperation::Marshal);
        let mut stats = BindStats::default();

        let sheets: Vec<(N, &[R])> = sheets.into_iter().collect();
        ctx.sheet = Some(sheets.iter().map(|(n, _)| n.as_ref()).collect::<Vec<&str>>().join(","));

        let result = self.write_all(path, &sheets, codec.as_ref(), &mut stats);
        self.report(&ctx, stats, &result);
        result
    }

    fn write_all<R: Record, N: AsRef<str>>(
        &self,
        path: &Path,
        sheets: &[(N, &[R])],
        codec: &dyn WorkbookCodec,
        stats: &mut BindStats,
    ) -> SheetResult<Vec<WriteSummary>> {
        if sheets.is_empty() {
            return Err(SheetError::Config {
                message: format!("no sheet to write to {}", path.display()),
            });
        }
        let schema = Schema::<R>::resolve(&self.registry)?;
        let file_name = file_name_of(path);

        let mut errors = AggregatedError::new();
        let mut raws: Vec<RawSheet> = Vec::with_capacity(sheets.len());
        let mut summaries = Vec::with_capacity(sheets.len());
        for (name, records) in sheets {
            let encoded =
                write::encode_sheet(&file_name, name.as_ref(), records, &schema, &self.options, codec, &mut errors);
            stats.rows += encoded.summary.rows_written;
            stats.failed_rows += encoded.failed_rows;
            raws.push(encoded.raw);
            summaries.push(encoded.summary);
        }

        codec.write(path, &raws)?;
        errors.into_result()?;
        Ok(summaries)
    }

    fn codec_for(&self, path: &Path) -> SheetResult<(Option<WorkbookFormat>, Arc<dyn WorkbookCodec>)> {
        if let Some(codec) = &self.codec {
            let format = self.options.format.or_else(|| WorkbookFormat::from_path(path).ok());
            return Ok((format, Arc::clone(codec)));
        }
        let format = match self.options.format {
            Some(f) => f,
            None => WorkbookFormat::from_path(path)?,
        };
        Ok((Some(format), Arc::from(format.codec())))
    }

    fn report<T>(&self, ctx: &BindContext, stats: BindStats, result: &SheetResult<T>) {
        let Some(obs) = self.options.observer.as_ref() else {
            return;
        };
        match result {
            Ok(_) => obs.on_success(ctx, stats),
            Err(e) => {
                if matches!(e, SheetError::Aggregated(_)) {
                    obs.on_success(ctx, stats);
                }
                let sev = severity_for_error(e);
                obs.on_failure(ctx, sev, e);
                if sev >= self.options.alert_at_or_above {
                    obs.on_alert(ctx, sev, e);
                }
            }
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.display().to_string()
}

fn select_raw<'a>(file_name: &str, raws: &'a [RawSheet], selector: &SheetSelector) -> SheetResult<&'a RawSheet> {
    if raws.is_empty() {
        return Err(SheetError::NoSheet {
            file: file_name.to_string(),
        });
    }
    let found = match selector {
        SheetSelector::First => raws.first(),
        SheetSelector::Index(i) => i.checked_sub(1).and_then(|i| raws.get(i)),
        SheetSelector::Name(n) => raws.iter().find(|r| &r.name == n),
    };
    found.ok_or_else(|| SheetError::SheetNotFound {
        location: Location::new(file_name, "", ""),
        selector: selector.to_string(),
    })
}

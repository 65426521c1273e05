use std::error::Error as StdError;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::codec::WorkbookFormat;
use crate::error::SheetError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BindSeverity {
    /// Informational event.
    Info,
    /// Some rows or records failed, the rest went through.
    Warning,
    /// The operation failed.
    Error,
    /// I/O or other infrastructure failure.
    Critical,
}

/// Which binder operation an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOperation {
    Parse,
    Unmarshal,
    Marshal,
}

impl fmt::Display for BindOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BindOperation::Parse => "parse",
            BindOperation::Unmarshal => "unmarshal",
            BindOperation::Marshal => "marshal",
        })
    }
}

/// Context about one binder call.
#[derive(Debug, Clone)]
pub struct BindContext {
    /// File the call reads or writes.
    pub path: PathBuf,
    /// Format of the file, `None` when a custom codec is installed and nothing was inferred.
    pub format: Option<WorkbookFormat>,
    pub operation: BindOperation,
    /// Sheet(s) involved, once known.
    pub sheet: Option<String>,
}

impl BindContext {
    pub fn new(path: &Path, format: Option<WorkbookFormat>, operation: BindOperation) -> Self {
        Self {
            path: path.to_path_buf(),
            format,
            operation,
            sheet: None,
        }
    }
}

/// Row counts reported to observers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindStats {
    /// Rows read into records, or records written as rows.
    pub rows: usize,
    /// Rows or records skipped because of an error.
    pub failed_rows: usize,
}

/// Observer interface for binder outcomes.
///
/// A call that processed rows but collected row errors reports both: `on_success` with
/// the partial stats, then `on_failure` with [`BindSeverity::Warning`].
pub trait BindObserver: Send + Sync {
    /// Called when a call completes.
    fn on_success(&self, _ctx: &BindContext, _stats: BindStats) {}

    /// Called when a call fails.
    fn on_failure(&self, _ctx: &BindContext, _severity: BindSeverity, _error: &SheetError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &BindContext, severity: BindSeverity, error: &SheetError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Severity of a failed call.
pub fn severity_for_error(e: &SheetError) -> BindSeverity {
    match e {
        SheetError::Io(_) => BindSeverity::Critical,
        SheetError::Aggregated(_) => BindSeverity::Warning,
        SheetError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => BindSeverity::Critical,
            _ => BindSeverity::Error,
        },
        SheetError::Excel(err) if error_chain_contains_io(err) => BindSeverity::Critical,
        SheetError::XlsxWrite(err) if error_chain_contains_io(err) => BindSeverity::Critical,
        _ => BindSeverity::Error,
    }
}

fn error_chain_contains_io(e: &(dyn StdError + 'static)) -> bool {
    let mut cur: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = cur {
        if err.is::<std::io::Error>() {
            return true;
        }
        cur = err.source();
    }
    false
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn BindObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn BindObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl BindObserver for CompositeObserver {
    fn on_success(&self, ctx: &BindContext, stats: BindStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &BindContext, severity: BindSeverity, error: &SheetError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &BindContext, severity: BindSeverity, error: &SheetError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

fn describe(ctx: &BindContext) -> String {
    let format = ctx
        .format
        .map(|f| format!("{f:?}"))
        .unwrap_or_else(|| "custom".to_string());
    format!(
        "op={} format={} path={} sheet={}",
        ctx.operation,
        format,
        ctx.path.display(),
        ctx.sheet.as_deref().unwrap_or("-")
    )
}

/// Logs binder events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl BindObserver for StdErrObserver {
    fn on_success(&self, ctx: &BindContext, stats: BindStats) {
        eprintln!(
            "[bind][ok] {} rows={} failed_rows={}",
            describe(ctx),
            stats.rows,
            stats.failed_rows
        );
    }

    fn on_failure(&self, ctx: &BindContext, severity: BindSeverity, error: &SheetError) {
        eprintln!("[bind][{:?}] {} err={}", severity, describe(ctx), error);
    }

    fn on_alert(&self, ctx: &BindContext, severity: BindSeverity, error: &SheetError) {
        eprintln!("[ALERT][bind][{:?}] {} err={}", severity, describe(ctx), error);
    }
}

/// Appends binder events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open or write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl BindObserver for FileObserver {
    fn on_success(&self, ctx: &BindContext, stats: BindStats) {
        self.append_line(&format!(
            "{} ok {} rows={} failed_rows={}",
            unix_ts(),
            describe(ctx),
            stats.rows,
            stats.failed_rows
        ));
    }

    fn on_failure(&self, ctx: &BindContext, severity: BindSeverity, error: &SheetError) {
        self.append_line(&format!(
            "{} fail severity={:?} {} err={}",
            unix_ts(),
            severity,
            describe(ctx),
            error
        ));
    }

    fn on_alert(&self, ctx: &BindContext, severity: BindSeverity, error: &SheetError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} {} err={}",
            unix_ts(),
            severity,
            describe(ctx),
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

//! In-process workbook store keyed by path.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::SheetResult;

use super::{RawSheet, WorkbookCodec};

/// Keeps "files" in memory. Clones of the sheets go in and out, nothing touches disk.
#[derive(Debug, Default)]
pub struct MemoryCodec {
    files: Mutex<HashMap<PathBuf, Vec<RawSheet>>>,
}

impl MemoryCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `sheets` under `path`, as if a file had been written.
    pub fn insert(&self, path: impl AsRef<Path>, sheets: Vec<RawSheet>) {
        self.files().insert(path.as_ref().to_path_buf(), sheets);
    }

    /// The sheets stored under `path`.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Vec<RawSheet>> {
        self.files().get(path.as_ref()).cloned()
    }

    fn files(&self) -> MutexGuard<'_, HashMap<PathBuf, Vec<RawSheet>>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl WorkbookCodec for MemoryCodec {
    fn open(&self, path: &Path) -> SheetResult<Vec<RawSheet>> {
        self.get(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no in-memory workbook at {}", path.display()),
            )
            .into()
        })
    }

    fn write(&self, path: &Path, sheets: &[RawSheet]) -> SheetResult<()> {
        self.insert(path, sheets.to_vec());
        Ok(())
    }
}

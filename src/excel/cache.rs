//! Read-through cache in front of a [`SheetSource`]
//!
//! Entries are keyed by workbook path (sheet names) and by (path, sheet name)
//! (sheet contents) and live until [`SheetCache::clear`] or process exit. Reads
//! happen outside the locks, so concurrent misses on the same key may both read
//! the file; the last one to finish is stored. Both results are identical.

use super::reader::{SheetSource, SheetTable};
use crate::error::StatementResult;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

type NameMap = HashMap<PathBuf, Vec<String>>;
type SheetMap = HashMap<(PathBuf, String), Arc<SheetTable>>;

pub struct SheetCache<S> {
    inner: S,
    names: Mutex<NameMap>,
    sheets: Mutex<SheetMap>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // Entries are inserted whole, so a poisoned map is still consistent
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: SheetSource> SheetCache<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            names: Mutex::new(HashMap::new()),
            sheets: Mutex::new(HashMap::new()),
        }
    }

    /// Number of cached sheets
    pub fn len(&self) -> usize {
        lock(&self.sheets).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        lock(&self.names).clear();
        lock(&self.sheets).clear();
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: SheetSource> SheetSource for SheetCache<S> {
    fn sheet_names(&self, path: &Path) -> StatementResult<Vec<String>> {
        if let Some(hit) = lock(&self.names).get(path) {
            debug!(path = %path.display(), "Sheet name cache hit");
            return Ok(hit.clone());
        }

        debug!(path = %path.display(), "Sheet name cache miss");
        let names = self.inner.sheet_names(path)?;
        lock(&self.names).insert(path.to_path_buf(), names.clone());
        Ok(names)
    }

    fn read_sheet(&self, path: &Path, sheet: &str) -> StatementResult<Arc<SheetTable>> {
        let key = (path.to_path_buf(), sheet.to_string());
        if let Some(hit) = lock(&self.sheets).get(&key) {
            debug!(path = %path.display(), sheet, "Sheet cache hit");
            return Ok(Arc::clone(hit));
        }

        debug!(path = %path.display(), sheet, "Sheet cache miss");
        let table = self.inner.read_sheet(path, sheet)?;
        lock(&self.sheets).insert(key, Arc::clone(&table));
        Ok(table)
    }
}

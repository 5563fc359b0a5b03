//! Resource Handle
//!
//! One backing-store binding plus the reader/writer lock guarding it.

use std::time::Instant;

use parking_lot::RwLock;

use crate::backend::{BackingStore, Document, Selector};
use crate::error::{GridError, Result};
use crate::model::{MergeSpan, ResourceKey, Row, TableSnapshot};

/// Owned binding + lock for one `ResourceKey`
///
/// ## Concurrency Model: fair Multiple-Reader / Single-Writer
///
/// - **Reads** (`get_table`, `get_merges`, `get_all`): shared lock, any
///   number at once
/// - **Writes** (`save_table`, `save_merges`, `save_all`, `append_table`):
///   exclusive lock, one at a time, no readers admitted
///
/// `parking_lot::RwLock` is task-fair: a waiting writer blocks new readers,
/// so a steady stream of reads cannot starve writes.
///
/// The store is only reachable through the guard, so every store call
/// happens under the lock, and the guard's drop releases it on every exit
/// path including `?` returns.
pub struct ResourceHandle {
    key: ResourceKey,

    /// Backing store, touched only while this lock is held
    store: RwLock<Box<dyn BackingStore>>,
}

impl ResourceHandle {
    pub(crate) fn new(key: ResourceKey, store: Box<dyn BackingStore>) -> Self {
        Self {
            key,
            store: RwLock::new(store),
        }
    }

    /// The key this handle serves
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    // =========================================================================
    // Write operations (exclusive)
    // =========================================================================

    /// Replace all rows. Merge spans are left as they are.
    pub fn save_table(&self, rows: Vec<Row>) -> Result<()> {
        let started = Instant::now();
        let mut store = self.store.write();
        tracing::trace!("[{}] save_table: write lock acquired in {:?}", self.key, started.elapsed());

        store.replace_table(rows, None)
    }

    /// Append rows after the existing ones
    pub fn append_table(&self, rows: Vec<Row>) -> Result<()> {
        let mut store = self.store.write();
        store.insert_many(into_documents(rows))
    }

    /// Upsert the merge-span record
    pub fn save_merges(&self, spans: Vec<MergeSpan>) -> Result<()> {
        let mut store = self.store.write();
        store.upsert(Selector::MergedCells, Document::MergedCells(spans))
    }

    /// Replace rows and merge spans in one lock hold and one store write
    pub fn save_all(&self, snapshot: TableSnapshot) -> Result<()> {
        let started = Instant::now();
        let mut store = self.store.write();
        tracing::trace!("[{}] save_all: write lock acquired in {:?}", self.key, started.elapsed());

        store.replace_table(snapshot.rows, Some(snapshot.merges))
    }

    // =========================================================================
    // Read operations (shared)
    // =========================================================================

    /// Current rows, in stored order
    pub fn get_table(&self) -> Result<Vec<Row>> {
        let store = self.store.read();
        read_rows(&**store)
    }

    /// Current merge spans; empty if none were ever saved
    pub fn get_merges(&self) -> Result<Vec<MergeSpan>> {
        let store = self.store.read();
        read_merges(&**store)
    }

    /// Rows and merge spans from one lock hold
    pub fn get_all(&self) -> Result<TableSnapshot> {
        let store = self.store.read();
        let rows = read_rows(&**store)?;
        let merges = read_merges(&**store)?;
        Ok(TableSnapshot { rows, merges })
    }
}

impl std::fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHandle").field("key", &self.key).finish_non_exhaustive()
    }
}

// =============================================================================
// Private Helpers (caller holds the appropriate lock)
// =============================================================================

fn into_documents(rows: Vec<Row>) -> Vec<Document> {
    rows.into_iter().map(Document::Row).collect()
}

fn read_rows<S: BackingStore + ?Sized>(store: &S) -> Result<Vec<Row>> {
    store
        .find_all(Selector::Rows)?
        .into_iter()
        .map(|doc| match doc {
            Document::Row(row) => Ok(row),
            other => Err(unexpected(Selector::Rows, &other)),
        })
        .collect()
}

fn read_merges<S: BackingStore + ?Sized>(store: &S) -> Result<Vec<MergeSpan>> {
    match store.find_one(Selector::MergedCells)? {
        Some(Document::MergedCells(spans)) => Ok(spans),
        Some(other) => Err(unexpected(Selector::MergedCells, &other)),
        None => Ok(Vec::new()),
    }
}

/// A store returned a document its selector should have excluded
fn unexpected(selector: Selector, doc: &Document) -> GridError {
    GridError::Corruption(format!(
        "store returned {:?} document for selector {:?}",
        doc.type_name().unwrap_or("row"),
        selector
    ))
}

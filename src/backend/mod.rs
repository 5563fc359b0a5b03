//! Backend Module
//!
//! The document-store seam the table store is built on.
//!
//! ## Responsibilities
//! - Define the minimal contract needed from a document database
//! - Bind a `ResourceKey` to a concrete store (`StoreConnector`)
//! - Provide process-local (`mem://`) and file-backed (`file://`) stores
//!
//! ## Collection Layout
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Row document        (one per table row)      │
//! │ Row document                                 │
//! │ ...                                          │
//! │ MergedCells document (at most one, "type":   │
//! │                       "merged_cells")        │
//! └──────────────────────────────────────────────┘
//! ```
//! Row documents and the merge-span record share a collection; the document
//! kind is the sentinel that keeps them apart.

mod file;
mod memory;

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::model::{MergeSpan, ResourceKey, Row};

pub use file::{FileStore, COLLECTION_EXTENSION};
pub use memory::MemoryStore;

/// Type name of the merge-span record inside a collection
pub const MERGED_CELLS_TYPE: &str = "merged_cells";

/// URL scheme for in-memory targets
pub const MEMORY_SCHEME: &str = "mem://";

/// URL scheme for file-backed targets
pub const FILE_SCHEME: &str = "file://";

// =============================================================================
// Documents
// =============================================================================

/// A document stored in a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Document {
    /// One table row
    Row(Row),

    /// The merge-span record of the table
    MergedCells(Vec<MergeSpan>),
}

impl Document {
    /// The `type` sentinel of this document, if it carries one
    pub fn type_name(&self) -> Option<&'static str> {
        match self {
            Document::Row(_) => None,
            Document::MergedCells(_) => Some(MERGED_CELLS_TYPE),
        }
    }
}

/// Picks out a class of documents in a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Everything without a `type` sentinel
    Rows,

    /// The `type: merged_cells` record
    MergedCells,
}

impl Selector {
    pub fn matches(&self, doc: &Document) -> bool {
        matches!(
            (self, doc),
            (Selector::Rows, Document::Row(_)) | (Selector::MergedCells, Document::MergedCells(_))
        )
    }
}

// =============================================================================
// Store Contract
// =============================================================================

/// Minimal document-database contract used by the table store.
///
/// Implementations are not required to be internally synchronized beyond
/// `Send + Sync`: each store is owned by exactly one resource handle, which
/// takes `&mut self` only under its write lock.
pub trait BackingStore: Send + Sync {
    /// Remove every document matching `selector`; returns how many went
    fn delete_all(&mut self, selector: Selector) -> Result<u64>;

    /// Append documents in order. An empty batch is a no-op.
    fn insert_many(&mut self, docs: Vec<Document>) -> Result<()>;

    /// All matching documents, in insertion order
    fn find_all(&self, selector: Selector) -> Result<Vec<Document>>;

    /// First matching document
    fn find_one(&self, selector: Selector) -> Result<Option<Document>>;

    /// Replace the first matching document, or insert `doc` if none matches
    fn upsert(&mut self, selector: Selector, doc: Document) -> Result<()>;

    /// Replace every row document with `rows`, and the merge-span record with
    /// `merges` when given.
    ///
    /// The default chains the calls above, so a failure part-way leaves the
    /// earlier steps applied. Stores whose calls can fail independently
    /// override it with a single all-or-nothing write.
    fn replace_table(&mut self, rows: Vec<Row>, merges: Option<Vec<MergeSpan>>) -> Result<()> {
        self.delete_all(Selector::Rows)?;
        self.insert_many(rows.into_iter().map(Document::Row).collect())?;
        if let Some(spans) = merges {
            self.upsert(Selector::MergedCells, Document::MergedCells(spans))?;
        }
        Ok(())
    }
}

/// Binds a resource key to a backing store.
///
/// Runs inside the registry's critical section, so `connect` must not do
/// I/O; stores open their underlying resources lazily.
pub trait StoreConnector: Send + Sync {
    /// The key `key`'s store is registered under.
    ///
    /// Keys that spell the same store differently must map to one identity,
    /// otherwise they get separate handles and separate locks. No I/O.
    fn identity(&self, key: &ResourceKey) -> ResourceKey {
        key.clone()
    }

    fn connect(&self, key: &ResourceKey) -> Result<Box<dyn BackingStore>>;
}

/// Resolves targets by scheme: `mem://...` and `file://<root>`
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultConnector;

impl StoreConnector for DefaultConnector {
    /// File roots are normalized lexically: `file://R`, `file://R/` and
    /// `file://./R` name the same collection files.
    fn identity(&self, key: &ResourceKey) -> ResourceKey {
        match key.target.strip_prefix(FILE_SCHEME) {
            Some(root) if !root.is_empty() => ResourceKey {
                target: format!("{}{}", FILE_SCHEME, normalize_root(root).to_string_lossy()),
                ..key.clone()
            },
            _ => key.clone(),
        }
    }

    fn connect(&self, key: &ResourceKey) -> Result<Box<dyn BackingStore>> {
        if key.target.starts_with(MEMORY_SCHEME) {
            return Ok(Box::new(MemoryStore::new()));
        }

        if let Some(root) = key.target.strip_prefix(FILE_SCHEME) {
            if root.is_empty() {
                return Err(GridError::Connectivity(format!(
                    "file target {:?} has no root directory",
                    key.target
                )));
            }
            return Ok(Box::new(FileStore::new(root, &key.database, &key.collection)));
        }

        Err(GridError::Connectivity(format!(
            "unsupported target {:?} (expected {}... or {}...)",
            key.target, MEMORY_SCHEME, FILE_SCHEME
        )))
    }
}

/// Drop `.` components, repeated and trailing separators. `..` is kept.
fn normalize_root(root: &str) -> PathBuf {
    let normalized: PathBuf = Path::new(root)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

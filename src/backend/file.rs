//! File-backed store
//!
//! Persists one collection as a single checksummed file.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                       │
//! │   Magic: "GRDS" (4) | Version: u16 (2) | Count: u64 (8) │
//! ├─────────────────────────────────────────────────────────┤
//! │ Body (variable)                                         │
//! │   bincode-encoded Vec<Document>                         │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (4 bytes)                                        │
//! │   BodyCRC: u32                                          │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation rewrites the file: encode to `<name>.grid.tmp`, fsync,
//! rename over the old file. A reader therefore sees either the old or the
//! new file, never a torn one.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{GridError, Result};
use crate::model::{MergeSpan, Row};

use super::{BackingStore, Document, Selector};

/// Magic bytes identifying a gridstore collection file
const MAGIC: &[u8; 4] = b"GRDS";

/// Current collection file format version
const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + DocCount (8) = 14 bytes
const HEADER_SIZE: usize = 14;

/// Footer size: BodyCRC (4)
const FOOTER_SIZE: usize = 4;

/// Extension of collection files
pub const COLLECTION_EXTENSION: &str = "grid";

/// Collection stored at `<root>/<database>/<collection>.grid`
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Bind to a collection file. Touches nothing on disk.
    pub fn new(root: impl AsRef<Path>, database: &str, collection: &str) -> Self {
        let path = root
            .as_ref()
            .join(database)
            .join(format!("{}.{}", collection, COLLECTION_EXTENSION));
        Self { path }
    }

    /// Path of the collection file
    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Read every document; a missing file is an empty collection
    fn load(&self) -> Result<Vec<Document>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.unavailable("read", e)),
        };
        decode_collection(&bytes).map_err(|e| match e {
            GridError::Corruption(msg) => {
                GridError::Corruption(format!("{}: {}", self.path.display(), msg))
            }
            other => other,
        })
    }

    /// Atomically replace the collection file with `docs`
    fn store(&self, docs: &[Document]) -> Result<()> {
        let bytes = encode_collection(docs)?;

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| self.unavailable("create directory for", e))?;
        }

        let tmp_path = self.path.with_extension(format!("{}.tmp", COLLECTION_EXTENSION));
        {
            let mut file = File::create(&tmp_path).map_err(|e| self.unavailable("create", e))?;
            file.write_all(&bytes).map_err(|e| self.unavailable("write", e))?;
            file.sync_all().map_err(|e| self.unavailable("sync", e))?;
        }
        fs::rename(&tmp_path, &self.path).map_err(|e| self.unavailable("replace", e))?;

        tracing::trace!(
            "Wrote {} documents ({} bytes) to {}",
            docs.len(),
            bytes.len(),
            self.path.display()
        );
        Ok(())
    }

    fn unavailable(&self, action: &str, err: std::io::Error) -> GridError {
        GridError::Connectivity(format!("failed to {} {}: {}", action, self.path.display(), err))
    }
}

impl BackingStore for FileStore {
    fn delete_all(&mut self, selector: Selector) -> Result<u64> {
        let mut docs = self.load()?;
        let before = docs.len();
        docs.retain(|doc| !selector.matches(doc));
        let removed = (before - docs.len()) as u64;

        if removed > 0 {
            self.store(&docs)?;
        }
        Ok(removed)
    }

    fn insert_many(&mut self, new_docs: Vec<Document>) -> Result<()> {
        if new_docs.is_empty() {
            return Ok(());
        }
        let mut docs = self.load()?;
        docs.extend(new_docs);
        self.store(&docs)
    }

    fn find_all(&self, selector: Selector) -> Result<Vec<Document>> {
        let mut docs = self.load()?;
        docs.retain(|doc| selector.matches(doc));
        Ok(docs)
    }

    fn find_one(&self, selector: Selector) -> Result<Option<Document>> {
        Ok(self.load()?.into_iter().find(|doc| selector.matches(doc)))
    }

    fn upsert(&mut self, selector: Selector, doc: Document) -> Result<()> {
        let mut docs = self.load()?;
        upsert_in(&mut docs, selector, doc);
        self.store(&docs)
    }

    /// One load, one rewrite: the file holds either the old table or the
    /// new one
    fn replace_table(&mut self, rows: Vec<Row>, merges: Option<Vec<MergeSpan>>) -> Result<()> {
        let mut docs = self.load()?;
        docs.retain(|doc| !Selector::Rows.matches(doc));
        if let Some(spans) = merges {
            upsert_in(&mut docs, Selector::MergedCells, Document::MergedCells(spans));
        }
        docs.extend(rows.into_iter().map(Document::Row));
        self.store(&docs)
    }
}

fn upsert_in(docs: &mut Vec<Document>, selector: Selector, doc: Document) {
    match docs.iter_mut().find(|existing| selector.matches(existing)) {
        Some(existing) => *existing = doc,
        None => docs.push(doc),
    }
}

// =============================================================================
// Encoding
// =============================================================================

fn encode_collection(docs: &[Document]) -> Result<Vec<u8>> {
    let body = bincode::serialize(docs).map_err(|e| GridError::Serialization(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_SIZE + body.len() + FOOTER_SIZE);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.extend_from_slice(&(docs.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&body);
    bytes.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());

    Ok(bytes)
}

fn decode_collection(bytes: &[u8]) -> Result<Vec<Document>> {
    if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(GridError::Corruption(format!(
            "file truncated: {} bytes, need at least {}",
            bytes.len(),
            HEADER_SIZE + FOOTER_SIZE
        )));
    }

    if &bytes[0..4] != MAGIC {
        return Err(GridError::Corruption(format!(
            "invalid magic: expected GRDS, got {:?}",
            &bytes[0..4]
        )));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(GridError::Corruption(format!("unsupported version: {}", version)));
    }

    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&bytes[6..HEADER_SIZE]);
    let doc_count = u64::from_le_bytes(count_bytes);

    let footer_start = bytes.len() - FOOTER_SIZE;
    let body = &bytes[HEADER_SIZE..footer_start];
    let mut crc_bytes = [0u8; 4];
    crc_bytes.copy_from_slice(&bytes[footer_start..]);
    let stored_crc = u32::from_le_bytes(crc_bytes);

    let actual_crc = crc32fast::hash(body);
    if stored_crc != actual_crc {
        return Err(GridError::Corruption(format!(
            "checksum mismatch: stored {:08x}, computed {:08x}",
            stored_crc, actual_crc
        )));
    }

    let docs: Vec<Document> =
        bincode::deserialize(body).map_err(|e| GridError::Corruption(e.to_string()))?;

    if docs.len() as u64 != doc_count {
        return Err(GridError::Corruption(format!(
            "document count mismatch: header says {}, body has {}",
            doc_count,
            docs.len()
        )));
    }

    Ok(docs)
}

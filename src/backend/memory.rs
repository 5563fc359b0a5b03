//! In-memory backing store
//!
//! A `Vec<Document>` in insertion order. Lives as long as its handle,
//! which is the process lifetime.

use crate::error::Result;

use super::{BackingStore, Document, Selector};

/// Process-local collection
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Vec<Document>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total documents of every kind
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl BackingStore for MemoryStore {
    fn delete_all(&mut self, selector: Selector) -> Result<u64> {
        let before = self.docs.len();
        self.docs.retain(|doc| !selector.matches(doc));
        Ok((before - self.docs.len()) as u64)
    }

    fn insert_many(&mut self, docs: Vec<Document>) -> Result<()> {
        self.docs.extend(docs);
        Ok(())
    }

    fn find_all(&self, selector: Selector) -> Result<Vec<Document>> {
        Ok(self
            .docs
            .iter()
            .filter(|doc| selector.matches(doc))
            .cloned()
            .collect())
    }

    fn find_one(&self, selector: Selector) -> Result<Option<Document>> {
        Ok(self.docs.iter().find(|doc| selector.matches(doc)).cloned())
    }

    fn upsert(&mut self, selector: Selector, doc: Document) -> Result<()> {
        match self.docs.iter_mut().find(|existing| selector.matches(existing)) {
            Some(existing) => *existing = doc,
            None => self.docs.push(doc),
        }
        Ok(())
    }
}

//! Model Module
//!
//! Typed representation of the data a table store holds.
//!
//! ## Shapes
//! - `ResourceKey`: (target, database, collection) naming one logical table
//! - `Row`: ordered map column index → `Cell`; rows may differ in length
//! - `MergeSpan`: rectangle of cells collapsed into one, anchored top-left
//! - `TableSnapshot`: rows + merge spans observed at one instant
//!
//! The store does not check merge spans for overlap; that is left to the
//! editing surface that produces them.

mod cell;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

pub use cell::{Alignment, Cell, Color, Font, HAlign, VAlign, DEFAULT_FONT_SIZE};

// =============================================================================
// ResourceKey
// =============================================================================

/// Identifies one logical table
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    /// Connection target, e.g. `mem://shared` or `file:///var/lib/grids`
    pub target: String,
    pub database: String,
    pub collection: String,
}

impl ResourceKey {
    pub fn new(
        target: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            database: database.into(),
            collection: collection.into(),
        }
    }

    /// Check the key is usable as a store address.
    ///
    /// `database` and `collection` become path components for file targets,
    /// so separators and dot-names are refused for every target.
    pub fn validate(&self) -> Result<()> {
        if self.target.is_empty() {
            return Err(GridError::MalformedPayload("target must not be empty".to_string()));
        }
        for (field, name) in [("database", &self.database), ("collection", &self.collection)] {
            if name.is_empty() {
                return Err(GridError::MalformedPayload(format!("{} must not be empty", field)));
            }
            if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
                return Err(GridError::MalformedPayload(format!(
                    "{} name {:?} is not allowed",
                    field, name
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}.{}", self.target, self.database, self.collection)
    }
}

// =============================================================================
// Row
// =============================================================================

/// One table row: column index → cell
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<u32, Cell>);

impl Row {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert
    pub fn with_cell(mut self, col: u32, cell: Cell) -> Self {
        self.0.insert(col, cell);
        self
    }

    /// Insert a cell, returning the one it replaced
    pub fn insert(&mut self, col: u32, cell: Cell) -> Option<Cell> {
        self.0.insert(col, cell)
    }

    pub fn get(&self, col: u32) -> Option<&Cell> {
        self.0.get(&col)
    }

    /// Number of populated columns
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Cells in column order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Cell)> {
        self.0.iter().map(|(col, cell)| (*col, cell))
    }
}

impl FromIterator<(u32, Cell)> for Row {
    fn from_iter<I: IntoIterator<Item = (u32, Cell)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// =============================================================================
// MergeSpan
// =============================================================================

/// Cells `[row, row + row_span) x [col, col + col_span)` shown as one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergeSpan {
    pub row: u32,
    pub col: u32,
    pub row_span: u32,
    pub col_span: u32,
}

impl MergeSpan {
    pub fn new(row: u32, col: u32, row_span: u32, col_span: u32) -> Self {
        Self { row, col, row_span, col_span }
    }

    /// Spans must cover at least one cell in each direction
    pub fn validate(&self) -> Result<()> {
        if self.row_span == 0 || self.col_span == 0 {
            return Err(GridError::MalformedPayload(format!(
                "merge span at ({}, {}) has zero extent ({}x{})",
                self.row, self.col, self.row_span, self.col_span
            )));
        }
        Ok(())
    }
}

// =============================================================================
// TableSnapshot
// =============================================================================

/// Rows and merge spans of one table, read or written as a unit
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableSnapshot {
    pub rows: Vec<Row>,
    pub merges: Vec<MergeSpan>,
}

impl TableSnapshot {
    pub fn new(rows: Vec<Row>, merges: Vec<MergeSpan>) -> Self {
        Self { rows, merges }
    }
}

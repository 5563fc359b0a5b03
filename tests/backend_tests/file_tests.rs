//! Tests for the file-backed store
//!
//! These tests verify:
//! - Collection file layout under the root directory
//! - Documents persist across store instances
//! - A missing file reads as an empty collection
//! - Damaged files are reported as corruption, never as data
//! - An unusable root is reported as a connectivity failure
//! - Replacing a table is one rewrite: it lands whole or not at all

use std::fs;

use gridstore::backend::{BackingStore, Document, FileStore, Selector, COLLECTION_EXTENSION};
use gridstore::model::{Cell, Color, MergeSpan, Row};
use gridstore::GridError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn styled_row(text: &str) -> Document {
    Document::Row(
        Row::new()
            .with_cell(0, Cell::from_text(text).with_background(Color::rgb(0xee, 0xee, 0)))
            .with_cell(3, Cell::from_text("tail")),
    )
}

fn row_texts(store: &FileStore) -> Vec<String> {
    store
        .find_all(Selector::Rows)
        .unwrap()
        .into_iter()
        .map(|doc| match doc {
            Document::Row(row) => row.get(0).unwrap().text_or_default().to_string(),
            other => panic!("unexpected document {:?}", other),
        })
        .collect()
}

fn merges(store: &FileStore) -> Option<Document> {
    store.find_one(Selector::MergedCells).unwrap()
}

fn plain_row(text: &str) -> Row {
    Row::new().with_cell(0, Cell::from_text(text))
}

fn setup_store() -> (TempDir, FileStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::new(temp_dir.path(), "finance", "budget");
    (temp_dir, store)
}

// =============================================================================
// Layout and Persistence Tests
// =============================================================================

#[test]
fn test_path_layout() {
    let (temp_dir, store) = setup_store();
    let expected = temp_dir
        .path()
        .join("finance")
        .join(format!("budget.{}", COLLECTION_EXTENSION));
    assert_eq!(store.path(), expected);
}

#[test]
fn test_missing_file_reads_empty() {
    let (_temp_dir, store) = setup_store();

    assert!(store.find_all(Selector::Rows).unwrap().is_empty());
    assert_eq!(store.find_one(Selector::MergedCells).unwrap(), None);
    assert!(!store.path().exists());
}

#[test]
fn test_documents_persist_across_instances() {
    let (temp_dir, mut store) = setup_store();

    store.insert_many(vec![styled_row("a"), styled_row("b")]).unwrap();
    store
        .upsert(Selector::MergedCells, Document::MergedCells(vec![MergeSpan::new(0, 0, 2, 1)]))
        .unwrap();
    assert!(store.path().exists());

    let reopened = FileStore::new(temp_dir.path(), "finance", "budget");
    assert_eq!(
        reopened.find_all(Selector::Rows).unwrap(),
        vec![styled_row("a"), styled_row("b")]
    );
    assert_eq!(
        reopened.find_one(Selector::MergedCells).unwrap(),
        Some(Document::MergedCells(vec![MergeSpan::new(0, 0, 2, 1)]))
    );
}

#[test]
fn test_delete_rows_then_reinsert() {
    let (_temp_dir, mut store) = setup_store();

    store.insert_many(vec![styled_row("old")]).unwrap();
    store
        .upsert(Selector::MergedCells, Document::MergedCells(vec![MergeSpan::new(1, 1, 1, 1)]))
        .unwrap();

    assert_eq!(store.delete_all(Selector::Rows).unwrap(), 1);
    store.insert_many(vec![styled_row("new")]).unwrap();

    assert_eq!(store.find_all(Selector::Rows).unwrap(), vec![styled_row("new")]);
    assert!(store.find_one(Selector::MergedCells).unwrap().is_some());
}

#[test]
fn test_no_temp_file_left_behind() {
    let (temp_dir, mut store) = setup_store();
    store.insert_many(vec![styled_row("a")]).unwrap();

    let names: Vec<String> = fs::read_dir(temp_dir.path().join("finance"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![format!("budget.{}", COLLECTION_EXTENSION)]);
}

#[test]
fn test_empty_insert_creates_nothing() {
    let (_temp_dir, mut store) = setup_store();
    store.insert_many(Vec::new()).unwrap();
    assert!(!store.path().exists());
}

// =============================================================================
// Replace Tests
// =============================================================================

#[test]
fn test_replace_table_swaps_rows_and_merges() {
    let (_temp_dir, mut store) = setup_store();
    store.insert_many(vec![styled_row("a"), styled_row("b")]).unwrap();
    store
        .upsert(Selector::MergedCells, Document::MergedCells(vec![MergeSpan::new(0, 0, 1, 2)]))
        .unwrap();

    store
        .replace_table(vec![plain_row("c")], Some(vec![MergeSpan::new(4, 4, 2, 2)]))
        .unwrap();

    assert_eq!(row_texts(&store), vec!["c"]);
    assert_eq!(
        merges(&store),
        Some(Document::MergedCells(vec![MergeSpan::new(4, 4, 2, 2)]))
    );
}

#[test]
fn test_replace_table_without_merges_keeps_them() {
    let (_temp_dir, mut store) = setup_store();
    let spans = Document::MergedCells(vec![MergeSpan::new(1, 1, 3, 1)]);
    store.upsert(Selector::MergedCells, spans.clone()).unwrap();
    store.insert_many(vec![styled_row("a")]).unwrap();

    store.replace_table(vec![plain_row("b"), plain_row("c")], None).unwrap();

    assert_eq!(row_texts(&store), vec!["b", "c"]);
    assert_eq!(merges(&store), Some(spans));
}

#[test]
fn test_replace_table_with_no_rows_clears_them() {
    let (_temp_dir, mut store) = setup_store();
    store.insert_many(vec![styled_row("a")]).unwrap();

    store.replace_table(Vec::new(), Some(Vec::new())).unwrap();

    assert!(row_texts(&store).is_empty());
    assert_eq!(merges(&store), Some(Document::MergedCells(Vec::new())));
}

#[test]
fn test_failed_replace_keeps_previous_table() {
    let (_temp_dir, mut store) = setup_store();
    let spans = Document::MergedCells(vec![MergeSpan::new(0, 0, 1, 2)]);
    store.insert_many(vec![styled_row("a"), styled_row("b")]).unwrap();
    store.upsert(Selector::MergedCells, spans.clone()).unwrap();
    let before = fs::read(store.path()).unwrap();

    // A directory squatting on the temp path makes the rewrite fail
    let tmp_path = store.path().with_extension(format!("{}.tmp", COLLECTION_EXTENSION));
    fs::create_dir(&tmp_path).unwrap();

    let result = store.replace_table(vec![plain_row("new")], Some(Vec::new()));
    assert!(matches!(result, Err(GridError::Connectivity(_))));

    // Neither the row delete nor the merge change landed
    assert_eq!(fs::read(store.path()).unwrap(), before);
    assert_eq!(row_texts(&store), vec!["a", "b"]);
    assert_eq!(merges(&store), Some(spans));

    fs::remove_dir(&tmp_path).unwrap();
    store.replace_table(vec![plain_row("new")], Some(Vec::new())).unwrap();
    assert_eq!(row_texts(&store), vec!["new"]);
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_flipped_body_byte_is_corruption() {
    let (_temp_dir, mut store) = setup_store();
    store.insert_many(vec![styled_row("a")]).unwrap();

    let mut bytes = fs::read(store.path()).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xFF;
    fs::write(store.path(), &bytes).unwrap();

    assert!(matches!(store.find_all(Selector::Rows), Err(GridError::Corruption(_))));
}

#[test]
fn test_bad_magic_is_corruption() {
    let (_temp_dir, mut store) = setup_store();
    store.insert_many(vec![styled_row("a")]).unwrap();

    let mut bytes = fs::read(store.path()).unwrap();
    bytes[0..4].copy_from_slice(b"NOPE");
    fs::write(store.path(), &bytes).unwrap();

    assert!(matches!(store.find_all(Selector::Rows), Err(GridError::Corruption(_))));
}

#[test]
fn test_truncated_file_is_corruption() {
    let (_temp_dir, mut store) = setup_store();
    store.insert_many(vec![styled_row("a")]).unwrap();

    let bytes = fs::read(store.path()).unwrap();
    fs::write(store.path(), &bytes[..8]).unwrap();

    assert!(matches!(store.find_one(Selector::MergedCells), Err(GridError::Corruption(_))));
}

#[test]
fn test_corrupt_file_is_not_overwritten_by_writes() {
    let (_temp_dir, mut store) = setup_store();
    fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    fs::write(store.path(), b"garbage that is long enough").unwrap();

    let result = store.insert_many(vec![styled_row("a")]);
    assert!(matches!(result, Err(GridError::Corruption(_))));
    assert_eq!(fs::read(store.path()).unwrap(), b"garbage that is long enough");
}

// =============================================================================
// Connectivity Tests
// =============================================================================

#[test]
fn test_root_that_is_a_file_is_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("root-file");
    fs::write(&root, b"not a directory").unwrap();

    let mut store = FileStore::new(&root, "finance", "budget");
    assert!(matches!(store.find_all(Selector::Rows), Err(GridError::Connectivity(_))));
    assert!(matches!(
        store.insert_many(vec![styled_row("a")]),
        Err(GridError::Connectivity(_))
    ));
}

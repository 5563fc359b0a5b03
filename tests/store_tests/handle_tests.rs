//! Tests for ResourceHandle
//!
//! These tests verify:
//! - Each operation's effect on rows and merge spans
//! - Writers exclude everyone; readers share
//! - A failed operation releases the lock
//! - Concurrent writers never interleave their store calls
//! - A steady stream of readers does not starve a writer

#[path = "../common/mod.rs"]
mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use common::{first_text, mem_key, text_row, Event, Recorder, RecordingConnector};
use gridstore::model::{MergeSpan, TableSnapshot};
use gridstore::store::{HandleRegistry, ResourceHandle};
use gridstore::GridError;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_handle() -> (Arc<Recorder>, Arc<ResourceHandle>) {
    let recorder = Recorder::new();
    let registry = HandleRegistry::new(RecordingConnector::new(Arc::clone(&recorder)));
    let handle = registry.get_or_create(&mem_key("budget")).unwrap();
    (recorder, handle)
}

fn texts(rows: &[gridstore::Row]) -> Vec<&str> {
    rows.iter().map(first_text).collect()
}

// =============================================================================
// Operation Semantics Tests
// =============================================================================

#[test]
fn test_fresh_handle_is_empty() {
    let (_recorder, handle) = setup_handle();

    assert!(handle.get_table().unwrap().is_empty());
    assert!(handle.get_merges().unwrap().is_empty());
    assert_eq!(handle.get_all().unwrap(), TableSnapshot::default());
}

#[test]
fn test_save_table_replaces_rows() {
    let (_recorder, handle) = setup_handle();

    handle.save_table(vec![text_row(&["a"]), text_row(&["b"])]).unwrap();
    handle.save_table(vec![text_row(&["c"])]).unwrap();

    assert_eq!(texts(&handle.get_table().unwrap()), vec!["c"]);
}

#[test]
fn test_save_table_empty_clears_rows() {
    let (recorder, handle) = setup_handle();

    handle.save_table(vec![text_row(&["a"])]).unwrap();
    handle.save_table(Vec::new()).unwrap();
    assert_eq!(recorder.events().last(), Some(&Event::Insert(String::new())));

    assert!(handle.get_table().unwrap().is_empty());
}

#[test]
fn test_save_table_keeps_merge_spans() {
    let (_recorder, handle) = setup_handle();

    handle.save_merges(vec![MergeSpan::new(0, 0, 1, 2)]).unwrap();
    handle.save_table(vec![text_row(&["a"])]).unwrap();

    assert_eq!(handle.get_merges().unwrap(), vec![MergeSpan::new(0, 0, 1, 2)]);
}

#[test]
fn test_save_merges_is_idempotent() {
    let (_recorder, handle) = setup_handle();
    let spans = vec![MergeSpan::new(1, 1, 2, 2), MergeSpan::new(5, 0, 1, 3)];

    handle.save_merges(spans.clone()).unwrap();
    handle.save_merges(spans.clone()).unwrap();

    assert_eq!(handle.get_merges().unwrap(), spans);
}

#[test]
fn test_save_merges_does_not_touch_rows() {
    let (_recorder, handle) = setup_handle();

    handle.save_table(vec![text_row(&["a"]), text_row(&["b"])]).unwrap();
    handle.save_merges(vec![MergeSpan::new(0, 0, 2, 1)]).unwrap();

    assert_eq!(texts(&handle.get_table().unwrap()), vec!["a", "b"]);
}

#[test]
fn test_append_table_adds_after_existing_rows() {
    let (_recorder, handle) = setup_handle();

    handle.save_table(vec![text_row(&["a"])]).unwrap();
    handle.save_merges(vec![MergeSpan::new(0, 0, 1, 2)]).unwrap();
    handle.append_table(vec![text_row(&["b"]), text_row(&["c"])]).unwrap();

    assert_eq!(texts(&handle.get_table().unwrap()), vec!["a", "b", "c"]);
    assert_eq!(handle.get_merges().unwrap(), vec![MergeSpan::new(0, 0, 1, 2)]);
}

#[test]
fn test_append_empty_changes_nothing() {
    let (_recorder, handle) = setup_handle();

    handle.save_table(vec![text_row(&["a"])]).unwrap();
    handle.append_table(Vec::new()).unwrap();

    assert_eq!(texts(&handle.get_table().unwrap()), vec!["a"]);
}

#[test]
fn test_save_all_replaces_both() {
    let (_recorder, handle) = setup_handle();

    handle
        .save_all(TableSnapshot::new(
            vec![text_row(&["a"]), text_row(&["b"])],
            vec![MergeSpan::new(0, 0, 1, 2)],
        ))
        .unwrap();
    handle
        .save_all(TableSnapshot::new(vec![text_row(&["c"])], Vec::new()))
        .unwrap();

    let snapshot = handle.get_all().unwrap();
    assert_eq!(texts(&snapshot.rows), vec!["c"]);
    assert!(snapshot.merges.is_empty());
}

#[test]
fn test_save_all_store_call_sequence() {
    let (recorder, handle) = setup_handle();

    handle
        .save_all(TableSnapshot::new(vec![text_row(&["a"])], vec![MergeSpan::new(0, 0, 1, 1)]))
        .unwrap();

    assert_eq!(
        recorder.events(),
        vec![Event::DeleteRows, Event::Insert("a".to_string()), Event::Upsert]
    );
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_failure_releases_lock() {
    let (recorder, handle) = setup_handle();

    recorder.set_failing(true);
    assert!(matches!(
        handle.save_table(vec![text_row(&["a"])]),
        Err(GridError::Connectivity(_))
    ));
    assert!(matches!(handle.get_all(), Err(GridError::Connectivity(_))));

    recorder.set_failing(false);

    // Both lock modes are available again
    handle.save_table(vec![text_row(&["b"])]).unwrap();
    assert_eq!(texts(&handle.get_table().unwrap()), vec!["b"]);
}

#[test]
fn test_failure_from_another_thread_releases_lock() {
    let (recorder, handle) = setup_handle();
    recorder.set_failing(true);

    let failing = Arc::clone(&handle);
    let result = thread::spawn(move || failing.save_all(TableSnapshot::default()))
        .join()
        .unwrap();
    assert!(result.is_err());

    recorder.set_failing(false);
    handle.save_table(vec![text_row(&["ok"])]).unwrap();
    assert_eq!(texts(&handle.get_table().unwrap()), vec!["ok"]);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_never_interleave() {
    let (recorder, handle) = setup_handle();
    recorder.set_delay(Duration::from_millis(2));

    let num_threads = 8;
    let writes_per_thread = 5;
    let barrier = Arc::new(Barrier::new(num_threads));

    let threads: Vec<_> = (0..num_threads)
        .map(|t| {
            let handle = Arc::clone(&handle);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..writes_per_thread {
                    let label = format!("w{}-{}", t, i);
                    handle.save_table(vec![text_row(&[label.as_str()])]).unwrap();
                }
            })
        })
        .collect();

    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(recorder.violations(), 0);

    // Every delete is immediately followed by its own insert
    let events = recorder.events();
    assert_eq!(events.len(), num_threads * writes_per_thread * 2);
    for pair in events.chunks(2) {
        assert_eq!(pair[0], Event::DeleteRows);
        assert!(matches!(pair[1], Event::Insert(_)));
    }

    // The final table is exactly the last write
    let Event::Insert(last) = events.last().unwrap().clone() else {
        panic!("last event should be an insert");
    };
    assert_eq!(texts(&handle.get_table().unwrap()), vec![last.as_str()]);
}

#[test]
fn test_readers_run_concurrently() {
    let (recorder, handle) = setup_handle();
    handle.save_table(vec![text_row(&["a"])]).unwrap();
    recorder.set_delay(Duration::from_millis(100));

    let num_threads = 6;
    let barrier = Arc::new(Barrier::new(num_threads));
    let threads: Vec<_> = (0..num_threads)
        .map(|_| {
            let handle = Arc::clone(&handle);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                handle.get_table().unwrap()
            })
        })
        .collect();

    for t in threads {
        assert_eq!(t.join().unwrap().len(), 1);
    }

    assert!(recorder.max_readers() > 1, "reads were serialized");
    assert_eq!(recorder.violations(), 0);
}

#[test]
fn test_mixed_readers_and_writers_exclude() {
    let (recorder, handle) = setup_handle();
    recorder.set_delay(Duration::from_millis(1));

    let barrier = Arc::new(Barrier::new(8));
    let threads: Vec<_> = (0..8)
        .map(|t| {
            let handle = Arc::clone(&handle);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..10 {
                    if t % 2 == 0 {
                        handle
                            .save_all(TableSnapshot::new(
                                vec![text_row(&[format!("{}-{}", t, i).as_str()])],
                                vec![MergeSpan::new(t, i, 1, 1)],
                            ))
                            .unwrap();
                    } else {
                        handle.get_all().unwrap();
                    }
                }
            })
        })
        .collect();

    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(recorder.violations(), 0);
}

#[test]
fn test_writer_not_starved_by_reader_stream() {
    let (recorder, handle) = setup_handle();
    handle.save_table(vec![text_row(&["old"])]).unwrap();
    recorder.set_delay(Duration::from_millis(20));

    let num_readers = 4;
    let stop = Arc::new(AtomicBool::new(false));
    let written = Arc::new(AtomicBool::new(false));

    // Each reader reports (reads after the write, stale reads after the write)
    let readers: Vec<_> = (0..num_readers)
        .map(|_| {
            let handle = Arc::clone(&handle);
            let stop = Arc::clone(&stop);
            let written = Arc::clone(&written);
            thread::spawn(move || {
                let (mut after, mut stale) = (0, 0);
                while !stop.load(Ordering::SeqCst) {
                    let write_done = written.load(Ordering::SeqCst);
                    let rows = handle.get_table().unwrap();
                    if write_done {
                        after += 1;
                        if texts(&rows) != vec!["new"] {
                            stale += 1;
                        }
                    }
                }
                (after, stale)
            })
        })
        .collect();

    // Let the reads overlap before the writer arrives
    thread::sleep(Duration::from_millis(150));
    assert!(recorder.max_readers() > 1, "readers never overlapped");

    let started = Instant::now();
    handle.save_table(vec![text_row(&["new"])]).unwrap();
    let waited = started.elapsed();
    written.store(true, Ordering::SeqCst);

    thread::sleep(Duration::from_millis(150));
    stop.store(true, Ordering::SeqCst);

    let (mut after, mut stale) = (0, 0);
    for r in readers {
        let (a, s) = r.join().unwrap();
        after += a;
        stale += s;
    }

    assert!(waited < Duration::from_secs(2), "writer waited {:?}", waited);
    assert!(after > 0, "no reads after the write");
    assert_eq!(stale, 0);
    assert_eq!(recorder.violations(), 0);
}

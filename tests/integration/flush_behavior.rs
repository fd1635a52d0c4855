//! Write-back sweeps: timer behavior, on-disk format, fault recovery.

use crate::common::*;
use serde_json::json;
use std::time::{Duration, Instant};

#[test]
fn test_manual_flush_writes_one_file_per_dirty_collection() {
    let ts = TestStore::new();

    ts.store.save("people", "ada", json!({"age": 36})).unwrap();
    ts.store.save("jobs", "j1", json!({"state": "queued"})).unwrap();
    ts.store.find_by_id("readonly", "nothing").unwrap();

    let stats = ts.store.flush().unwrap();
    assert_eq!(stats.flushed, 2);
    assert!(ts.collection_path("people").exists());
    assert!(ts.collection_path("jobs").exists());
    // Collections only ever read produce no file
    assert!(!ts.collection_path("readonly").exists());
}

#[test]
fn test_files_hold_pretty_printed_collection_objects() {
    let ts = TestStore::new();
    ts.store.save("people", "ada", json!({"age": 36})).unwrap();
    ts.store.flush().unwrap();

    let text = std::fs::read_to_string(ts.collection_path("people")).unwrap();
    assert!(text.starts_with("{\n"));

    let on_disk: Collection = serde_json::from_str(&text).unwrap();
    assert_eq!(on_disk.get("ada"), Some(&json!({"age": 36})));
}

#[test]
fn test_collection_ids_are_percent_encoded_on_disk() {
    let ts = TestStore::new();
    ts.store.save("jobs/queued", "j", json!(1)).unwrap();
    ts.store.flush().unwrap();

    assert!(ts.dir.path().join("jobs%2Fqueued.json").exists());
}

#[test]
fn test_flush_clears_the_dirty_set() {
    let ts = TestStore::new();
    ts.store.save("a", "k", json!(1)).unwrap();
    assert_eq!(ts.store.stats().dirty_collections, 1);

    ts.store.flush().unwrap();
    assert_eq!(ts.store.stats().dirty_collections, 0);

    // And the value is served identically warm or reloaded
    assert_eq!(ts.store.find_by_id("a", "k").unwrap(), Some(json!(1)));
}

#[test]
fn test_clean_collections_are_not_rewritten() {
    let ts = TestStore::new();
    ts.store.save("a", "k", json!(1)).unwrap();
    ts.store.flush().unwrap();
    let writes = ts.store.stats().disk_writes;

    let stats = ts.store.flush().unwrap();
    assert_eq!(stats.flushed, 0);
    assert_eq!(ts.store.stats().disk_writes, writes);
}

#[test]
fn test_remutation_re_dirties_a_flushed_collection() {
    let ts = TestStore::new();
    ts.store.save("a", "k", json!(1)).unwrap();
    ts.store.flush().unwrap();

    ts.store.save("a", "k", json!(2)).unwrap();
    assert_eq!(ts.store.stats().dirty_collections, 1);
    assert_eq!(ts.store.flush().unwrap().flushed, 1);

    let text = std::fs::read_to_string(ts.collection_path("a")).unwrap();
    let on_disk: Collection = serde_json::from_str(&text).unwrap();
    assert_eq!(on_disk.get("k"), Some(&json!(2)));
}

#[test]
fn test_timer_sweeps_without_manual_flush() {
    let ts = TestStore::new_with(FolioConfig {
        flush_interval_ms: 25,
        ..FolioConfig::default()
    });
    ts.store.save("timed", "k", json!("v")).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while !ts.collection_path("timed").exists() {
        assert!(Instant::now() < deadline, "timer never persisted the save");
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(ts.store.stats().dirty_collections, 0);
}

#[test]
fn test_close_runs_a_final_sweep() {
    let ts = TestStore::new();
    ts.store.save("last", "k", json!("words")).unwrap();

    let stats = ts.store.close().unwrap();
    assert_eq!(stats.flushed, 1);
    assert!(ts.collection_path("last").exists());
}

#[test]
fn test_close_stops_the_timer() {
    let ts = TestStore::new_with(FolioConfig {
        flush_interval_ms: 20,
        ..FolioConfig::default()
    });
    ts.store.close().unwrap();
    let sweeps = ts.store.stats().sweeps;

    // With the timer gone, a dirty save sits unflushed
    ts.store.save("after", "k", json!(1)).unwrap();
    std::thread::sleep(Duration::from_millis(120));
    assert_eq!(ts.store.stats().sweeps, sweeps);
    assert_eq!(ts.store.stats().dirty_collections, 1);
}

#[test]
fn test_malformed_file_degrades_to_empty_collection() {
    let ts = TestStore::new();
    std::fs::write(ts.collection_path("corrupt"), b"{\"half\": ").unwrap();

    assert_eq!(ts.store.find_by_id("corrupt", "half").unwrap(), None);
    assert_eq!(ts.store.find("corrupt", None).unwrap().len(), 0);

    // Saving repairs the file on the next sweep
    ts.store.save("corrupt", "fresh", json!(1)).unwrap();
    ts.store.flush().unwrap();
    let text = std::fs::read_to_string(ts.collection_path("corrupt")).unwrap();
    let on_disk: Collection = serde_json::from_str(&text).unwrap();
    assert_eq!(on_disk.len(), 1);
}

#[test]
fn test_missing_file_degrades_to_empty_collection() {
    let ts = TestStore::new();
    assert_eq!(ts.store.find_by_id("void", "k").unwrap(), None);
    assert_eq!(ts.store.find("void", None).unwrap(), Vec::<Value>::new());
}

#[test]
fn test_sweep_counts_accumulate_in_stats() {
    let ts = TestStore::new();
    ts.store.save("a", "k", json!(1)).unwrap();
    ts.store.flush().unwrap();
    ts.store.save("b", "k", json!(2)).unwrap();
    ts.store.flush().unwrap();

    let stats = ts.store.stats();
    assert!(stats.sweeps >= 2);
    assert_eq!(stats.disk_writes, 2);
    assert_eq!(stats.write_errors, 0);
}

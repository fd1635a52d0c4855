//! Multi-threaded operation mixes against one store.

use crate::common::*;
use serde_json::json;
use std::sync::Arc;

#[test]
fn test_parallel_writers_to_distinct_collections() {
    let ts = TestStore::new();
    let store = Arc::new(ts.store);

    let mut handles = Vec::new();
    for w in 0..8 {
        let store = Arc::clone(&store);
        handles.push(std::thread::spawn(move || {
            for i in 0..20 {
                store
                    .save(&format!("writer-{}", w), &format!("k{}", i), json!(i))
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    for w in 0..8 {
        let all = store.find(&format!("writer-{}", w), None).unwrap();
        assert_eq!(all.len(), 20);
    }
}

#[test]
fn test_parallel_writers_to_one_collection() {
    let ts = TestStore::new();
    let store = Arc::new(ts.store);

    let mut handles = Vec::new();
    for w in 0..8 {
        let store = Arc::clone(&store);
        handles.push(std::thread::spawn(move || {
            for i in 0..25 {
                store
                    .save("shared", &format!("w{}-k{}", w, i), json!({"w": w, "i": i}))
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // Distinct keys never collide, so every record lands
    assert_eq!(store.find("shared", None).unwrap().len(), 8 * 25);
}

#[test]
fn test_readers_run_against_a_live_writer() {
    let ts = TestStore::new();
    let store = Arc::new(ts.store);
    store.save("live", "counter", json!(0)).unwrap();

    let writer = {
        let store = Arc::clone(&store);
        std::thread::spawn(move || {
            for i in 1..=100 {
                store.save("live", "counter", json!(i)).unwrap();
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..4 {
        let store = Arc::clone(&store);
        readers.push(std::thread::spawn(move || {
            for _ in 0..50 {
                // Every observed value is one the writer actually stored
                let seen = store.find_by_id("live", "counter").unwrap().unwrap();
                let n = seen.as_i64().unwrap();
                assert!((0..=100).contains(&n));
            }
        }));
    }

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(
        store.find_by_id("live", "counter").unwrap(),
        Some(json!(100))
    );
}

#[test]
fn test_flushes_interleave_with_writers() {
    let ts = TestStore::new_with(FolioConfig {
        cache_capacity: 4,
        ..manual_config()
    });
    let store = Arc::new(ts.store);

    let flusher = {
        let store = Arc::clone(&store);
        std::thread::spawn(move || {
            for _ in 0..10 {
                store.flush().unwrap();
                std::thread::sleep(std::time::Duration::from_millis(5));
            }
        })
    };

    let mut writers = Vec::new();
    for w in 0..4 {
        let store = Arc::clone(&store);
        writers.push(std::thread::spawn(move || {
            for i in 0..30 {
                store
                    .save(&format!("flux-{}", w), &format!("k{}", i), json!(i))
                    .unwrap();
            }
        }));
    }

    flusher.join().unwrap();
    for writer in writers {
        writer.join().unwrap();
    }

    // Nothing lost across the interleaved sweeps, including any reloads
    store.flush().unwrap();
    for w in 0..4 {
        assert_eq!(store.find(&format!("flux-{}", w), None).unwrap().len(), 30);
    }
}

#[test]
fn test_removes_and_saves_on_disjoint_keys() {
    let ts = TestStore::new();
    let store = Arc::new(ts.store);
    for i in 0..50 {
        store.save("mixed", &format!("old{}", i), json!(i)).unwrap();
    }

    let remover = {
        let store = Arc::clone(&store);
        std::thread::spawn(move || {
            for i in 0..50 {
                assert_eq!(
                    store.remove("mixed", &format!("old{}", i)).unwrap(),
                    Some(json!(i))
                );
            }
        })
    };
    let adder = {
        let store = Arc::clone(&store);
        std::thread::spawn(move || {
            for i in 0..50 {
                store.save("mixed", &format!("new{}", i), json!(i)).unwrap();
            }
        })
    };

    remover.join().unwrap();
    adder.join().unwrap();

    let remaining = store.find("mixed", None).unwrap();
    assert_eq!(remaining.len(), 50);
    assert_eq!(store.find_by_id("mixed", "old0").unwrap(), None);
    assert_eq!(store.find_by_id("mixed", "new49").unwrap(), Some(json!(49)));
}

#[test]
fn test_state_survives_restart_after_concurrent_writes() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store =
            Arc::new(Store::open_with_config(dir.path(), manual_config()).unwrap());
        let mut handles = Vec::new();
        for w in 0..4 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                for i in 0..10 {
                    store
                        .save("persist", &format!("w{}-k{}", w, i), json!(i))
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        store.close().unwrap();
    }

    let store = Store::open_with_config(dir.path(), manual_config()).unwrap();
    assert_eq!(store.find("persist", None).unwrap().len(), 40);
}

//! Load coalescing: one disk read per cold collection under concurrency.

use crate::common::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn slow_store(delay_ms: u64) -> (Arc<Store>, Arc<std::sync::atomic::AtomicUsize>) {
    let (io, reads) = DelayedIo::new(Duration::from_millis(delay_ms));
    let store = Store::open_with_io(io, manual_config()).unwrap();
    (Arc::new(store), reads)
}

#[test]
fn test_two_cold_readers_share_one_disk_read() {
    let (store, reads) = slow_store(200);

    let leader = {
        let store = Arc::clone(&store);
        std::thread::spawn(move || store.find_by_id("cold", "k").unwrap())
    };
    // Let the leader enter its read before the second caller arrives
    std::thread::sleep(Duration::from_millis(50));
    let follower = {
        let store = Arc::clone(&store);
        std::thread::spawn(move || store.find_by_id("cold", "k").unwrap())
    };

    assert_eq!(leader.join().unwrap(), None);
    assert_eq!(follower.join().unwrap(), None);
    assert_eq!(reads.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(store.stats().coalesced_waits, 1);
}

#[test]
fn test_many_waiters_all_resolve() {
    let (store, reads) = slow_store(200);

    let leader = {
        let store = Arc::clone(&store);
        std::thread::spawn(move || store.save("cold", "seed", json!("v")).unwrap())
    };
    std::thread::sleep(Duration::from_millis(50));

    let mut waiters = Vec::new();
    for _ in 0..10 {
        let store = Arc::clone(&store);
        waiters.push(std::thread::spawn(move || {
            store.find_by_id("cold", "seed").unwrap()
        }));
    }

    leader.join().unwrap();
    // The leader arrived first, so every waiter observes its save
    for waiter in waiters {
        assert_eq!(waiter.join().unwrap(), Some(json!("v")));
    }
    assert_eq!(reads.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(store.stats().disk_reads, 1);
}

#[test]
fn test_distinct_collections_load_independently() {
    let (store, reads) = slow_store(100);

    let mut handles = Vec::new();
    for name in ["alpha", "beta", "gamma"] {
        let store = Arc::clone(&store);
        handles.push(std::thread::spawn(move || {
            store.find_by_id(name, "k").unwrap()
        }));
    }
    for handle in handles {
        assert_eq!(handle.join().unwrap(), None);
    }

    // One read per collection, nothing coalesced across ids
    assert_eq!(reads.load(std::sync::atomic::Ordering::SeqCst), 3);
    assert_eq!(store.stats().coalesced_waits, 0);
}

#[test]
fn test_warm_access_after_load_is_a_hit() {
    let (store, reads) = slow_store(50);

    store.find_by_id("warm", "k").unwrap();
    assert_eq!(reads.load(std::sync::atomic::Ordering::SeqCst), 1);

    for _ in 0..5 {
        store.find_by_id("warm", "k").unwrap();
    }
    let stats = store.stats();
    assert_eq!(reads.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(stats.cache_misses, 1);
    assert_eq!(stats.cache_hits, 5);
}

#[test]
fn test_sequential_cold_reads_are_not_coalesced() {
    // Back-to-back (not overlapping) touches of an evicted collection each
    // pay their own read; coalescing only spans an in-flight load.
    let mut ts = TestStore::new_with(FolioConfig {
        cache_capacity: 1,
        ..manual_config()
    });
    ts.store.save("a", "k", json!(1)).unwrap();
    ts.store.save("b", "k", json!(2)).unwrap();
    ts.reopen();

    ts.store.find_by_id("a", "k").unwrap();
    ts.store.flush().unwrap();
    ts.store.find_by_id("b", "k").unwrap();
    ts.store.flush().unwrap();
    ts.store.find_by_id("a", "k").unwrap();

    let stats = ts.store.stats();
    assert_eq!(stats.disk_reads, 3);
    assert_eq!(stats.coalesced_waits, 0);
}

#[test]
fn test_coalesced_mutations_apply_in_arrival_order() {
    let (store, _reads) = slow_store(200);

    let leader = {
        let store = Arc::clone(&store);
        std::thread::spawn(move || store.save("cold", "k", json!("leader")).unwrap())
    };
    std::thread::sleep(Duration::from_millis(50));
    let follower = {
        let store = Arc::clone(&store);
        std::thread::spawn(move || store.save("cold", "k", json!("follower")).unwrap())
    };

    leader.join().unwrap();
    follower.join().unwrap();

    // Arrival order: leader first, then follower overwrites
    assert_eq!(
        store.find_by_id("cold", "k").unwrap(),
        Some(json!("follower"))
    );
}

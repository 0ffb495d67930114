use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use concurrency_test_support::MockProvider;
use concurrency_time::Time;
use loading_cache::{Cache, CacheError, FnLoader, Loader};

struct CountingLoader {
    calls: Arc<AtomicUsize>,
}

impl Loader for CountingLoader {
    type Key = String;
    type Value = u32;
    type Error = std::convert::Infallible;

    fn load(&self, key: &String) -> Result<u32, Self::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(key.len() as u32)
    }
}

#[test]
fn get_loads_once_and_reuses_the_cached_value() {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = Cache::builder(CountingLoader {
        calls: Arc::clone(&calls),
    })
    .build();

    assert_eq!(cache.get(&"hello".to_string()).unwrap(), 5);
    assert_eq!(cache.get(&"hello".to_string()).unwrap(), 5);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn put_then_get_if_present_skips_the_loader() {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = Cache::builder(CountingLoader {
        calls: Arc::clone(&calls),
    })
    .build();

    cache.put("k".to_string(), 100);
    assert_eq!(cache.get_if_present(&"k".to_string()), Some(100));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn get_if_present_on_an_absent_key_never_calls_the_loader() {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = Cache::builder(CountingLoader {
        calls: Arc::clone(&calls),
    })
    .build();

    assert_eq!(cache.get_if_present(&"missing".to_string()), None);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn delete_makes_the_key_absent_again() {
    let cache = Cache::builder(FnLoader::new(|k: &String| {
        Ok::<_, std::convert::Infallible>(k.len() as u32)
    }))
    .build();

    cache.put("abc".to_string(), 3);
    assert_eq!(cache.get_if_present(&"abc".to_string()), Some(3));
    cache.delete(&"abc".to_string());
    assert_eq!(cache.get_if_present(&"abc".to_string()), None);

    // Deleting an already-absent key is a no-op, not an error.
    cache.delete(&"abc".to_string());
}

#[derive(Debug, PartialEq, Eq)]
struct BoomError;

impl std::fmt::Display for BoomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "boom")
    }
}

impl std::error::Error for BoomError {}

#[test]
fn loader_error_propagates_and_leaves_nothing_cached() {
    let cache = Cache::builder(FnLoader::new(|_k: &String| Err::<u32, _>(BoomError))).build();

    match cache.get(&"x".to_string()) {
        Err(CacheError::Loader(BoomError)) => {}
        other => panic!("expected a loader error, got {other:?}"),
    }
    assert_eq!(cache.get_if_present(&"x".to_string()), None);
}

#[test]
fn write_ttl_expires_a_value_even_if_it_keeps_being_read() {
    let clock = Arc::new(MockProvider::new(Time::from_nanos(0)));
    let cache = Cache::builder(FnLoader::new(|_k: &String| {
        Ok::<_, std::convert::Infallible>(1u32)
    }))
    .write_ttl(Duration::from_secs(10))
    .clock(Arc::clone(&clock) as _)
    .build();

    cache.put("k".to_string(), 1);
    assert_eq!(cache.get_if_present(&"k".to_string()), Some(1));

    clock.advance(Duration::from_secs(5));
    assert_eq!(cache.get_if_present(&"k".to_string()), Some(1));

    clock.advance(Duration::from_secs(6));
    assert_eq!(cache.get_if_present(&"k".to_string()), None);
}

#[test]
fn access_ttl_is_extended_by_reads_but_write_ttl_is_not() {
    let clock = Arc::new(MockProvider::new(Time::from_nanos(0)));
    let cache = Cache::builder(FnLoader::new(|_k: &String| {
        Ok::<_, std::convert::Infallible>(1u32)
    }))
    .access_ttl(Duration::from_secs(10))
    .clock(Arc::clone(&clock) as _)
    .build();

    cache.put("k".to_string(), 1);

    // Touch the entry every 6 seconds: each access resets the access-TTL
    // clock, so the entry should survive well past 10 seconds of wall time.
    for _ in 0..4 {
        clock.advance(Duration::from_secs(6));
        assert_eq!(cache.get_if_present(&"k".to_string()), Some(1));
    }

    // Now stop touching it; it must expire once the access TTL elapses.
    clock.advance(Duration::from_secs(11));
    assert_eq!(cache.get_if_present(&"k".to_string()), None);
}

#[test]
fn range_visits_every_live_entry_and_skips_deleted_ones() {
    let cache = Cache::builder(FnLoader::new(|_k: &String| {
        Ok::<_, std::convert::Infallible>(0u32)
    }))
    .build();

    for (k, v) in [("a", 1), ("b", 2), ("c", 3)] {
        cache.put(k.to_string(), v);
    }
    cache.delete(&"b".to_string());

    let mut seen = Vec::new();
    cache.range(|k, v| {
        seen.push((k.clone(), *v));
        true
    });
    seen.sort();
    assert_eq!(seen, vec![("a".to_string(), 1), ("c".to_string(), 3)]);
}

#[test]
fn range_stops_early_when_the_visitor_returns_false() {
    let cache = Cache::builder(FnLoader::new(|_k: &String| {
        Ok::<_, std::convert::Infallible>(0u32)
    }))
    .build();
    for (k, v) in [("a", 1), ("b", 2), ("c", 3)] {
        cache.put(k.to_string(), v);
    }

    let mut visited = 0;
    cache.range(|_k, _v| {
        visited += 1;
        false
    });
    assert_eq!(visited, 1);
}

#[test]
fn concurrent_puts_and_gets_are_consistent() {
    let cache = Arc::new(
        Cache::builder(FnLoader::new(|k: &u64| {
            Ok::<_, std::convert::Infallible>(*k * 2)
        }))
        .build(),
    );

    let mut handles = Vec::new();
    for t in 0..8u64 {
        let cache = Arc::clone(&cache);
        handles.push(std::thread::spawn(move || {
            for i in 0..200u64 {
                let key = t * 1000 + i;
                cache.put(key, key * 2);
                assert_eq!(cache.get(&key).unwrap(), key * 2);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let mut count = 0;
    cache.range(|_, _| {
        count += 1;
        true
    });
    assert_eq!(count, 8 * 200);
}

#[test]
fn repeated_misses_eventually_promote_the_dirty_side() {
    let cache = Arc::new(
        Cache::builder(FnLoader::new(|k: &u32| Ok::<_, std::convert::Infallible>(*k)))
            .build(),
    );

    // Establish amended=true by inserting through the dirty side first.
    for k in 0..4u32 {
        cache.put(k, k);
    }

    // Enough misses on an unrelated key should force a promotion; after
    // that, every previously-put key is still reachable lock-free.
    for _ in 0..8 {
        cache.get_if_present(&999_999);
    }
    for k in 0..4u32 {
        assert_eq!(cache.get_if_present(&k), Some(k));
    }
}

use shardcache::{Cache, CacheBuilder};
use std::thread;
use std::time::Duration;

#[test]
fn test_ttl_expiry() {
    let cache = Cache::new(Duration::from_millis(100)).unwrap();

    cache.set("k", "v");
    assert_eq!(cache.get(&"k"), Some("v"));

    thread::sleep(Duration::from_millis(150));
    assert_eq!(cache.get(&"k"), None);
}

#[test]
fn test_per_call_ttl_overrides_default() {
    let cache = Cache::new(Duration::from_secs(300)).unwrap();

    cache.set_with_ttl("short", "value", Some(Duration::from_millis(50)));
    cache.set_with_ttl("long", "value", Some(Duration::from_secs(300)));

    thread::sleep(Duration::from_millis(100));

    assert_eq!(cache.get(&"short"), None);
    assert_eq!(cache.get(&"long"), Some("value"));
}

#[test]
fn test_zero_ttl_override_uses_default() {
    let cache = Cache::new(Duration::from_secs(300)).unwrap();

    cache.set_with_ttl("k", 1, Some(Duration::ZERO));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(cache.get(&"k"), Some(1));
}

#[test]
fn test_expired_read_counts_as_miss_and_frees_slot() {
    let cache = Cache::new(Duration::from_millis(20)).unwrap();

    cache.set("k", 1);
    thread::sleep(Duration::from_millis(50));

    assert_eq!(cache.size(), 1);
    assert_eq!(cache.get(&"k"), None);
    assert_eq!(cache.size(), 0);

    let stats = cache.stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.expirations, 1);
}

#[test]
fn test_set_refreshes_deadline() {
    let cache = Cache::new(Duration::from_millis(80)).unwrap();

    cache.set("k", 1);
    thread::sleep(Duration::from_millis(50));
    cache.set("k", 2);
    thread::sleep(Duration::from_millis(50));

    assert_eq!(cache.get(&"k"), Some(2));
}

#[test]
fn test_purge_expired() {
    let cache = Cache::new(Duration::from_secs(300)).unwrap();

    for i in 0..100 {
        cache.set_with_ttl(i, i, Some(Duration::from_millis(10)));
    }
    cache.set(1000, 1000);

    thread::sleep(Duration::from_millis(50));
    assert_eq!(cache.purge_expired(), 100);
    assert_eq!(cache.size(), 1);
    assert_eq!(cache.get(&1000), Some(1000));
    assert_eq!(cache.stats().expirations, 100);

    // Nothing left to reap
    assert_eq!(cache.purge_expired(), 0);
}

#[test]
fn test_reaper_removes_untouched_entries() {
    let cache = CacheBuilder::new()
        .default_ttl(Duration::from_millis(20))
        .shard_count(16)
        .unwrap()
        .cleanup_interval(Duration::from_millis(10))
        .unwrap()
        .build::<String, i32>()
        .unwrap();

    for i in 0..200 {
        cache.set(format!("key_{}", i), i);
    }
    cache.set_with_ttl("persistent".to_string(), 1, Some(Duration::from_secs(300)));
    assert_eq!(cache.size(), 201);

    // Never read the short-lived keys; only the reaper can remove them.
    thread::sleep(Duration::from_millis(300));

    assert_eq!(cache.size(), 1);
    assert_eq!(cache.get("persistent"), Some(1));
    assert_eq!(cache.stats().misses, 0);
}

#[test]
fn test_closed_cache_stops_reaping() {
    let cache = CacheBuilder::new()
        .default_ttl(Duration::from_millis(10))
        .cleanup_interval(Duration::from_millis(5))
        .unwrap()
        .build::<u32, u32>()
        .unwrap();

    cache.close();
    cache.set(1, 1);
    thread::sleep(Duration::from_millis(100));

    // Still physically present: nobody swept it.
    assert_eq!(cache.size(), 1);
    assert_eq!(cache.get(&1), None);
    assert_eq!(cache.size(), 0);
}

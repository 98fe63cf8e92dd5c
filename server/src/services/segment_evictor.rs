use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::eviction_interval;
use crate::services::segment_loader::evict_oldest_segment;
use crate::state::AppState;

/// Periodically drops segments older than the cache TTL.
pub async fn run(state: AppState) {
    let mut interval = tokio::time::interval(eviction_interval());

    loop {
        interval.tick().await;

        let evicted = evict_stale(&state, Utc::now());
        if evicted > 0 {
            info!(
                "evicted {evicted} stale map segments ({} remaining)",
                state.segments.len()
            );
        }
    }
}

/// Removes expired entries, then trims the cache down to its size limit.
pub(crate) fn evict_stale(state: &AppState, now: DateTime<Utc>) -> usize {
    let ttl_secs = state.cache.ttl_secs;

    // Handlers insert while this runs, so count removals rather than diff lengths.
    let mut expired = 0usize;
    state.segments.retain(|_, segment| {
        let fresh = now.signed_duration_since(segment.loaded_at).num_seconds() < ttl_secs;
        if !fresh {
            expired += 1;
        }
        fresh
    });
    state.observability.record_segments_evicted(expired as u64);

    let mut trimmed = 0;
    while state.segments.len() > state.cache.max_segments && evict_oldest_segment(state) {
        trimmed += 1;
    }

    expired + trimmed
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use chrono::{Duration, Utc};
    use odyssey_shared::SegmentKey;

    use super::evict_stale;
    use crate::services::segment_loader::get_or_load;
    use crate::services::segment_loader::tests::{temp_maps_dir, test_state};
    use crate::state::{AppState, CachedSegment};

    fn insert_empty(state: &AppState, key: SegmentKey, age_secs: i64) {
        let mut segment = CachedSegment::new(key, None, b"null").expect("segment");
        segment.loaded_at = Utc::now() - Duration::seconds(age_secs);
        state.segments.insert(key, Arc::new(segment));
    }

    #[tokio::test]
    async fn fresh_segments_survive_and_stale_ones_go() {
        let state = test_state(temp_maps_dir(), 8);
        let key = SegmentKey { x: 0, y: 0, z: 0 };
        get_or_load(&state, key).await.expect("load empty segment");

        assert_eq!(evict_stale(&state, Utc::now()), 0);
        assert_eq!(state.segments.len(), 1);

        let later = Utc::now() + Duration::seconds(state.cache.ttl_secs + 1);
        assert_eq!(evict_stale(&state, later), 1);
        assert!(state.segments.is_empty());
        assert_eq!(state.observability.snapshot().segments_evicted_total, 1);
    }

    #[test]
    fn trims_fresh_segments_down_to_the_size_cap() {
        let state = test_state(temp_maps_dir(), 3);
        for i in 0..5 {
            // Older keys get larger ages.
            insert_empty(&state, SegmentKey { x: i * 256, y: 0, z: 0 }, 10 - i as i64);
        }

        assert_eq!(evict_stale(&state, Utc::now()), 2);
        assert_eq!(state.segments.len(), 3);
        assert!(!state.segments.contains_key(&SegmentKey { x: 0, y: 0, z: 0 }));
        assert!(!state.segments.contains_key(&SegmentKey { x: 256, y: 0, z: 0 }));
        for i in 2..5 {
            assert!(state.segments.contains_key(&SegmentKey { x: i * 256, y: 0, z: 0 }));
        }
        assert_eq!(state.observability.snapshot().segments_evicted_total, 2);
    }

    #[test]
    fn expiry_and_trim_counts_add_up() {
        let state = test_state(temp_maps_dir(), 2);
        let ttl = state.cache.ttl_secs;
        insert_empty(&state, SegmentKey { x: 0, y: 0, z: 1 }, ttl + 5);
        for i in 0..4 {
            insert_empty(&state, SegmentKey { x: i * 256, y: 0, z: 0 }, 10 - i as i64);
        }

        assert_eq!(evict_stale(&state, Utc::now()), 3);
        assert_eq!(state.segments.len(), 2);
        assert_eq!(state.observability.snapshot().segments_evicted_total, 3);
    }

    #[test]
    fn concurrent_inserts_do_not_break_eviction() {
        let state = test_state(temp_maps_dir(), usize::MAX);
        let done = Arc::new(AtomicBool::new(false));
        let inserted = 2_000;

        let writer = {
            let state = state.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                for i in 0..inserted {
                    insert_empty(&state, SegmentKey { x: i * 256, y: 0, z: 0 }, 0);
                }
                done.store(true, Ordering::Release);
            })
        };

        let mut evicted = 0;
        while !done.load(Ordering::Acquire) {
            evicted += evict_stale(&state, Utc::now());
        }
        writer.join().expect("writer thread");

        // Every entry is fresh, so nothing may be counted as evicted.
        assert_eq!(evicted, 0);
        assert_eq!(state.observability.snapshot().segments_evicted_total, 0);
        assert_eq!(state.segments.len(), inserted as usize);
    }
}

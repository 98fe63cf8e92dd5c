use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use odyssey_shared::api::SegmentResponse;
use odyssey_shared::{DecodedMap, MapColorTable, SegmentKey, Tile, World, WorldBounds};

/// A decoded segment file plus its pre-serialized API payload.
#[derive(Debug)]
pub struct CachedSegment {
    pub key: SegmentKey,
    /// `None` when the file was missing or held no map data.
    pub map: Option<Arc<DecodedMap<Tile>>>,
    pub etag: String,
    pub json: Bytes,
    pub loaded_at: DateTime<Utc>,
}

impl CachedSegment {
    pub fn new(
        key: SegmentKey,
        map: Option<DecodedMap<Tile>>,
        raw: &[u8],
    ) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_vec(&SegmentResponse::new(key, map.as_ref()))?;
        Ok(Self {
            key,
            map: map.map(Arc::new),
            etag: segment_etag(raw),
            json: Bytes::from(json),
            loaded_at: Utc::now(),
        })
    }

    /// Adds this segment to a request-scoped world without copying its tiles.
    pub fn add_to(&self, world: &mut World) {
        world.insert_shared(self.key, self.map.clone());
    }
}

fn segment_etag(raw: &[u8]) -> String {
    format!("\"segment-{:08x}\"", crc32fast::hash(raw))
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl_secs: i64,
    pub max_segments: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub maps_dir: Arc<PathBuf>,
    pub bounds: WorldBounds,
    /// Item id -> minimap colour, loaded once at startup.
    pub colors: Arc<MapColorTable>,
    pub segments: Arc<DashMap<SegmentKey, Arc<CachedSegment>>>,
    pub cache: CacheSettings,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    segment_loads_total: AtomicU64,
    segment_cache_hits_total: AtomicU64,
    segment_failures_total: AtomicU64,
    segments_evicted_total: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct ObservabilitySnapshot {
    pub segment_loads_total: u64,
    pub segment_cache_hits_total: u64,
    pub segment_failures_total: u64,
    pub segments_evicted_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            segment_loads_total: self.segment_loads_total.load(Ordering::Relaxed),
            segment_cache_hits_total: self.segment_cache_hits_total.load(Ordering::Relaxed),
            segment_failures_total: self.segment_failures_total.load(Ordering::Relaxed),
            segments_evicted_total: self.segments_evicted_total.load(Ordering::Relaxed),
        }
    }

    pub fn record_segment_load(&self) {
        self.segment_loads_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_segment_cache_hit(&self) {
        self.segment_cache_hits_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_segment_failure(&self) {
        self.segment_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_segments_evicted(&self, count: u64) {
        self.segments_evicted_total
            .fetch_add(count, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn new(maps_dir: PathBuf, colors: MapColorTable, cache: CacheSettings) -> Self {
        Self {
            maps_dir: Arc::new(maps_dir),
            bounds: WorldBounds::ODYSSEY,
            colors: Arc::new(colors),
            segments: Arc::new(DashMap::new()),
            cache,
            observability: Arc::new(ObservabilityCounters::default()),
        }
    }
}

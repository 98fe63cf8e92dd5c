use std::io;
use std::path::Path;
use std::sync::Arc;

use odyssey_shared::{MapFileError, SegmentKey, Tile, decode_slice_as};
use tracing::{debug, warn};

use crate::state::{AppState, CachedSegment};

#[derive(Debug, thiserror::Error)]
pub enum SegmentLoadError {
    #[error("failed to read map file {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode map file {file}: {source}")]
    Decode {
        file: String,
        #[source]
        source: MapFileError,
    },

    #[error("failed to serialize map file {file}: {source}")]
    Serialize {
        file: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Returns the cached segment for `key`, reading it from disk on a miss.
/// Failures are not cached so a fixed file is picked up on the next request.
pub async fn get_or_load(
    state: &AppState,
    key: SegmentKey,
) -> Result<Arc<CachedSegment>, SegmentLoadError> {
    if let Some(entry) = state.segments.get(&key) {
        state.observability.record_segment_cache_hit();
        return Ok(Arc::clone(entry.value()));
    }

    let segment = match load_segment(&state.maps_dir, key).await {
        Ok(segment) => Arc::new(segment),
        Err(e) => {
            state.observability.record_segment_failure();
            warn!(error = %e, segment = %key, "failed to load map segment");
            return Err(e);
        }
    };
    state.observability.record_segment_load();

    cache_segment(state, Arc::clone(&segment));
    Ok(segment)
}

/// Reads and decodes one segment file. A missing file is an empty segment.
pub async fn load_segment(
    maps_dir: &Path,
    key: SegmentKey,
) -> Result<CachedSegment, SegmentLoadError> {
    let file = key.file_name();
    let raw = match tokio::fs::read(maps_dir.join(&file)).await {
        Ok(raw) => Some(raw),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(segment = %key, "map file missing, treating segment as empty");
            None
        }
        Err(source) => return Err(SegmentLoadError::Io { file, source }),
    };

    let map = match raw.as_deref() {
        Some(bytes) => {
            decode_slice_as::<Tile>(bytes).map_err(|source| SegmentLoadError::Decode {
                file: file.clone(),
                source,
            })?
        }
        None => None,
    };

    CachedSegment::new(key, map, raw.as_deref().unwrap_or_default())
        .map_err(|source| SegmentLoadError::Serialize { file, source })
}

fn cache_segment(state: &AppState, segment: Arc<CachedSegment>) {
    if !state.segments.contains_key(&segment.key) {
        while state.segments.len() >= state.cache.max_segments {
            if !evict_oldest_segment(state) {
                break;
            }
        }
    }

    state.segments.insert(segment.key, segment);
}

pub(crate) fn evict_oldest_segment(state: &AppState) -> bool {
    let Some(oldest) = state
        .segments
        .iter()
        .min_by_key(|entry| entry.value().loaded_at)
        .map(|entry| *entry.key())
    else {
        return false;
    };
    let removed = state.segments.remove(&oldest).is_some();
    if removed {
        state.observability.record_segments_evicted(1);
    }
    removed
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    use odyssey_shared::map_file::{EXPLORED_WORDS, tile_index, tile_offset};
    use odyssey_shared::{MapColorTable, Position, TileItem, World};
    use serde_json::json;

    use super::*;
    use crate::state::CacheSettings;

    static NEXT_DIR: AtomicU64 = AtomicU64::new(0);

    /// Fresh directory under the system temp dir for one test.
    pub(crate) fn temp_maps_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "odyssey-maps-{}-{}",
            std::process::id(),
            NEXT_DIR.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&dir).expect("create temp maps dir");
        dir
    }

    /// Segment file text holding `(x, y, item id)` cells.
    pub(crate) fn segment_text(key: SegmentKey, cells: &[(u8, u8, u32)]) -> String {
        let mut cells = cells.to_vec();
        cells.sort_by_key(|&(x, y, _)| (x, y));
        let mut explored = vec![0u32; EXPLORED_WORDS];
        for &(x, y, _) in &cells {
            explored[tile_index(x, y)] |= 1 << tile_offset(y);
        }
        let items: Vec<_> = cells.iter().map(|&(_, _, id)| json!([{"ID": id}])).collect();
        json!({"Explored": explored, "Map": items, "BaseX": key.x, "BaseY": key.y}).to_string()
    }

    pub(crate) fn test_state(maps_dir: PathBuf, max_segments: usize) -> AppState {
        AppState::new(
            maps_dir,
            MapColorTable::new(),
            CacheSettings {
                ttl_secs: 600,
                max_segments,
            },
        )
    }

    #[tokio::test]
    async fn load_segment_decodes_tiles() {
        let dir = temp_maps_dir();
        let key = SegmentKey { x: 32256, y: 32000, z: 7 };
        std::fs::write(dir.join(key.file_name()), segment_text(key, &[(110, 239, 4526)]))
            .expect("write segment");

        let segment = load_segment(&dir, key).await.expect("load segment");
        let mut world = World::new();
        segment.add_to(&mut world);
        assert_eq!(
            world.get_tile(Position::new(32366, 32239, 7)),
            Some(&vec![TileItem::new(4526)])
        );
        assert!(world.get_tile(key.origin()).is_none());
    }

    #[tokio::test]
    async fn missing_and_null_files_are_empty_segments() {
        let dir = temp_maps_dir();
        let missing = SegmentKey { x: 0, y: 0, z: 0 };
        let null = SegmentKey { x: 256, y: 0, z: 0 };
        std::fs::write(dir.join(null.file_name()), "null").expect("write segment");

        assert!(load_segment(&dir, missing).await.expect("missing").map.is_none());
        assert!(load_segment(&dir, null).await.expect("null").map.is_none());
    }

    #[tokio::test]
    async fn malformed_file_is_a_decode_error_and_not_cached() {
        let dir = temp_maps_dir();
        let key = SegmentKey { x: 512, y: 0, z: 1 };
        std::fs::write(dir.join(key.file_name()), "{\"Explored\": [").expect("write segment");
        let state = test_state(dir, 8);

        let err = get_or_load(&state, key).await.expect_err("malformed file");
        assert!(matches!(err, SegmentLoadError::Decode { ref file, .. } if file == "512_0_1.json"));
        assert!(state.segments.is_empty());
        assert_eq!(state.observability.snapshot().segment_failures_total, 1);
    }

    #[tokio::test]
    async fn invalid_utf8_is_a_decode_error() {
        let dir = temp_maps_dir();
        let key = SegmentKey { x: 0, y: 0, z: 0 };
        std::fs::write(dir.join(key.file_name()), b"{\"Explored\": [\xff]}").expect("write segment");
        let state = test_state(dir, 8);

        let err = get_or_load(&state, key).await.expect_err("invalid utf-8");
        assert!(matches!(
            err,
            SegmentLoadError::Decode { ref file, source: MapFileError::Parse(_) } if file == "0_0_0.json"
        ));
        assert!(state.segments.is_empty());
    }

    #[tokio::test]
    async fn second_request_hits_the_cache() {
        let dir = temp_maps_dir();
        let key = SegmentKey { x: 0, y: 0, z: 0 };
        std::fs::write(dir.join(key.file_name()), segment_text(key, &[(1, 1, 5)]))
            .expect("write segment");
        let state = test_state(dir, 8);

        let first = get_or_load(&state, key).await.expect("first load");
        let second = get_or_load(&state, key).await.expect("second load");

        assert!(Arc::ptr_eq(&first, &second));
        let counters = state.observability.snapshot();
        assert_eq!(counters.segment_loads_total, 1);
        assert_eq!(counters.segment_cache_hits_total, 1);
    }

    #[tokio::test]
    async fn full_cache_evicts_the_oldest_segment() {
        let state = test_state(temp_maps_dir(), 2);
        let keys = [
            SegmentKey { x: 0, y: 0, z: 0 },
            SegmentKey { x: 256, y: 0, z: 0 },
            SegmentKey { x: 512, y: 0, z: 0 },
        ];
        for key in keys {
            get_or_load(&state, key).await.expect("load empty segment");
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        assert_eq!(state.segments.len(), 2);
        assert!(!state.segments.contains_key(&keys[0]));
        assert!(state.segments.contains_key(&keys[2]));
        assert_eq!(state.observability.snapshot().segments_evicted_total, 1);
    }
}

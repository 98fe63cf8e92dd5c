use std::collections::HashMap;
use std::sync::Arc;

use crate::map_file::DecodedMap;
use crate::position::{Position, SegmentKey};
use crate::tile::Tile;

/// Decoded map segments addressed by absolute world position.
#[derive(Debug, Clone)]
pub struct World<T = Tile> {
    /// `None` marks a segment whose file held no map data.
    segments: HashMap<SegmentKey, Option<Arc<DecodedMap<T>>>>,
}

impl<T> Default for World<T> {
    fn default() -> Self {
        Self {
            segments: HashMap::new(),
        }
    }
}

impl<T> World<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: SegmentKey, segment: Option<DecodedMap<T>>) {
        self.insert_shared(key, segment.map(Arc::new));
    }

    /// Inserts a segment that is also held elsewhere, such as a server cache.
    pub fn insert_shared(&mut self, key: SegmentKey, segment: Option<Arc<DecodedMap<T>>>) {
        self.segments.insert(key, segment);
    }

    pub fn remove(&mut self, key: SegmentKey) -> bool {
        self.segments.remove(&key).is_some()
    }

    pub fn is_loaded(&self, key: SegmentKey) -> bool {
        self.segments.contains_key(&key)
    }

    pub fn segment(&self, key: SegmentKey) -> Option<&DecodedMap<T>> {
        self.segments.get(&key).and_then(Option::as_deref)
    }

    /// Looks up a tile, translating through the segment's own base offset.
    pub fn get_tile(&self, pos: Position) -> Option<&T> {
        let segment = self.segment(SegmentKey::containing(pos))?;
        let (x, y) = pos.relative_to(segment.base_x(), segment.base_y())?;
        segment.get(x, y)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

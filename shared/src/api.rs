use serde::{Deserialize, Serialize};

use crate::map_file::DecodedMap;
use crate::position::{Position, SegmentKey};
use crate::tile::Tile;

/// Items at one absolute position; `items` is `None` for unexplored cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileResponse {
    pub position: Position,
    pub items: Option<Tile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentTile {
    pub x: u8,
    pub y: u8,
    pub items: Tile,
}

/// A decoded segment file. Files with no map data have no base and no tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentResponse {
    pub key: SegmentKey,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_y: Option<i32>,
    pub tiles: Vec<SegmentTile>,
}

impl SegmentResponse {
    pub fn new(key: SegmentKey, map: Option<&DecodedMap<Tile>>) -> Self {
        let tiles = map
            .map(|map| {
                map.iter()
                    .map(|((x, y), items)| SegmentTile {
                        x,
                        y,
                        items: items.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            key,
            file: key.file_name(),
            base_x: map.map(DecodedMap::base_x),
            base_y: map.map(DecodedMap::base_y),
            tiles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
}

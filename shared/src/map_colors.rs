use std::collections::HashMap;

use serde::Deserialize;

use crate::map_file::MapFileError;
use crate::tile::TileItem;

/// Colour of cells with no known map colour: opaque black.
pub const UNKNOWN_COLOR: u32 = 0x0000_00FF;

#[derive(Debug, Deserialize)]
struct ItemColorEntry {
    #[serde(rename = "ID")]
    id: u32,
    #[serde(rename = "MapColor", default)]
    map_color: Option<u32>,
}

/// Item id to minimap colour, packed as `0xRRGGBBAA`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapColorTable {
    colors: HashMap<u32, u32>,
}

impl MapColorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an item data file: `[{"ID": 100, "MapColor": 4278190335}, ...]`.
    /// Items without a map colour are skipped.
    pub fn from_json(text: &str) -> Result<Self, MapFileError> {
        let entries: Vec<ItemColorEntry> =
            serde_json::from_str(text).map_err(MapFileError::ColorTable)?;
        let colors = entries
            .into_iter()
            .filter_map(|entry| entry.map_color.map(|color| (entry.id, color)))
            .collect();
        Ok(Self { colors })
    }

    pub fn insert(&mut self, id: u32, color: u32) {
        self.colors.insert(id, color);
    }

    pub fn map_color(&self, id: u32) -> Option<u32> {
        self.colors.get(&id).copied()
    }

    /// Colour of the topmost item on the tile that has one.
    pub fn tile_color(&self, tile: &[TileItem]) -> Option<u32> {
        tile.iter().rev().find_map(|item| self.map_color(item.id))
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// Splits `0xRRGGBBAA` into its channels.
pub const fn rgba_channels(rgba: u32) -> (u8, u8, u8, u8) {
    let [r, g, b, a] = rgba.to_be_bytes();
    (r, g, b, a)
}

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Cells per axis of a single map file.
pub const GRID_SIZE: usize = 256;
/// Explored words per x column (256 y-values, 32 bits each).
pub const WORDS_PER_COLUMN: usize = GRID_SIZE / 32;
/// Explored words needed to cover every cell of the grid.
pub const EXPLORED_WORDS: usize = GRID_SIZE * WORDS_PER_COLUMN;

#[derive(Debug, thiserror::Error)]
pub enum MapFileError {
    #[error("malformed map file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("malformed map colour table: {0}")]
    ColorTable(serde_json::Error),
}

/// Raw map file envelope as written by the map exporter.
#[derive(Debug, Clone, Deserialize)]
pub struct MapPayload<T> {
    #[serde(rename = "Explored", deserialize_with = "explored_words")]
    pub explored: Vec<u32>,
    /// Tile records in ascending scan order of the explored cells.
    #[serde(rename = "Map")]
    pub items: Vec<T>,
    #[serde(rename = "BaseX")]
    pub base_x: i32,
    #[serde(rename = "BaseY")]
    pub base_y: i32,
}

/// Exporters write explored words as signed 32-bit integers; read them modulo 2^32.
fn explored_words<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let words = Vec::<i64>::deserialize(deserializer)?;
    Ok(words.into_iter().map(|word| word as u32).collect())
}

/// Sparse 256×256 tile grid rebuilt from a map file.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMap<T = Value> {
    base_x: i32,
    base_y: i32,
    tiles: BTreeMap<u16, T>,
}

impl<T> DecodedMap<T> {
    /// Rebuilds the grid by walking cells in descending scan order and
    /// taking one record from the tail of `items` per explored cell.
    pub fn from_payload(payload: MapPayload<T>) -> Self {
        let MapPayload {
            explored,
            items,
            base_x,
            base_y,
        } = payload;

        let mut tail = items.into_iter().rev();
        let mut tiles = BTreeMap::new();
        for x in (0..=u8::MAX).rev() {
            for y in (0..=u8::MAX).rev() {
                if !is_explored(&explored, x, y) {
                    continue;
                }
                // A file with fewer records than explored bits leaves the rest absent.
                if let Some(record) = tail.next() {
                    tiles.insert(cell_key(x, y), record);
                }
            }
        }

        Self {
            base_x,
            base_y,
            tiles,
        }
    }

    pub fn get(&self, x: u8, y: u8) -> Option<&T> {
        self.tiles.get(&cell_key(x, y))
    }

    pub fn contains(&self, x: u8, y: u8) -> bool {
        self.tiles.contains_key(&cell_key(x, y))
    }

    pub const fn base_x(&self) -> i32 {
        self.base_x
    }

    pub const fn base_y(&self) -> i32 {
        self.base_y
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Populated cells in ascending `(x, y)` order.
    pub fn iter(&self) -> impl Iterator<Item = ((u8, u8), &T)> {
        self.tiles.iter().map(|(key, record)| (split_key(*key), record))
    }
}

/// Decodes a map file whose records are kept as opaque JSON values.
///
/// Returns `Ok(None)` when the file holds a falsy JSON value (`null`,
/// `false`, `0` or `""`): the exporter writes those for regions with no data.
pub fn decode(text: &str) -> Result<Option<DecodedMap>, MapFileError> {
    decode_as(text)
}

/// Decodes a map file into typed tile records.
pub fn decode_as<T: DeserializeOwned>(text: &str) -> Result<Option<DecodedMap<T>>, MapFileError> {
    decode_slice_as(text.as_bytes())
}

/// Decodes raw map file bytes. Bytes that are not valid UTF-8 are a parse error.
pub fn decode_slice_as<T: DeserializeOwned>(
    bytes: &[u8],
) -> Result<Option<DecodedMap<T>>, MapFileError> {
    // Objects go straight to the envelope so shape errors keep their line and column.
    if !starts_with_object(bytes) {
        let value: Value = serde_json::from_slice(bytes)?;
        if is_falsy(&value) {
            return Ok(None);
        }
    }
    let payload: MapPayload<T> = serde_json::from_slice(bytes)?;
    Ok(Some(DecodedMap::from_payload(payload)))
}

/// Index of the explored word holding the bit for `(x, y)`.
pub fn tile_index(x: u8, y: u8) -> usize {
    usize::from(y) / 32 + usize::from(x) * WORDS_PER_COLUMN
}

/// Bit position of `y` inside its explored word.
pub fn tile_offset(y: u8) -> u32 {
    u32::from(y) % 32
}

/// Words missing from a short bitset read as unexplored.
pub fn is_explored(explored: &[u32], x: u8, y: u8) -> bool {
    explored
        .get(tile_index(x, y))
        .is_some_and(|word| (word >> tile_offset(y)) & 1 == 1)
}

/// Number of explored cells inside the grid.
pub fn explored_count(explored: &[u32]) -> usize {
    explored
        .iter()
        .take(EXPLORED_WORDS)
        .map(|word| word.count_ones() as usize)
        .sum()
}

fn cell_key(x: u8, y: u8) -> u16 {
    (u16::from(x) << 8) + u16::from(y)
}

fn split_key(key: u16) -> (u8, u8) {
    ((key >> 8) as u8, (key & 0xFF) as u8)
}

fn starts_with_object(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .find(|byte| !matches!(byte, b' ' | b'\t' | b'\n' | b'\r'))
        == Some(&b'{')
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Items stacked on one cell, bottom first.
pub type Tile = Vec<TileItem>;

/// One item on a tile. Only the item id is interpreted; every other field
/// the exporter writes is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileItem {
    #[serde(rename = "ID")]
    pub id: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TileItem {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            extra: Map::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}

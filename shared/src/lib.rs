pub mod api;
pub mod map_colors;
pub mod map_file;
pub mod minimap;
pub mod position;
pub mod tile;
pub mod world;

pub use map_colors::{MapColorTable, UNKNOWN_COLOR};
pub use map_file::{DecodedMap, MapFileError, decode, decode_as, decode_slice_as};
pub use minimap::MinimapGrid;
pub use position::{Position, SEGMENT_SIZE, SegmentKey, WorldBounds};
pub use tile::{Tile, TileItem};
pub use world::World;

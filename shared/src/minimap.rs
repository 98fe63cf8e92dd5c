use serde::{Deserialize, Serialize};

use crate::map_colors::{MapColorTable, UNKNOWN_COLOR};
use crate::position::Position;
use crate::world::World;

/// Cells per side of the minimap.
pub const MINIMAP_SIZE: usize = 127;
/// Cells between the minimap centre and its edge.
pub const MINIMAP_RADIUS: i32 = 63;

/// Colour grid around a centre position, row-major by y.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimapGrid {
    pub origin: Position,
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl MinimapGrid {
    pub fn pixel(&self, dx: usize, dy: usize) -> Option<u32> {
        if dx >= self.width || dy >= self.height {
            return None;
        }
        self.pixels.get(dy * self.width + dx).copied()
    }
}

/// Samples the minimap around `center`, asking `color_at` for each cell.
/// Cells without a colour, or whose colour is zero, become [`UNKNOWN_COLOR`].
pub fn sample<F>(center: Position, mut color_at: F) -> MinimapGrid
where
    F: FnMut(Position) -> Option<u32>,
{
    let origin = center.offset(-MINIMAP_RADIUS, -MINIMAP_RADIUS);
    let mut pixels = Vec::with_capacity(MINIMAP_SIZE * MINIMAP_SIZE);
    for dy in 0..MINIMAP_SIZE as i32 {
        for dx in 0..MINIMAP_SIZE as i32 {
            let color = color_at(origin.offset(dx, dy))
                .filter(|&color| color != 0)
                .unwrap_or(UNKNOWN_COLOR);
            pixels.push(color);
        }
    }

    MinimapGrid {
        origin,
        width: MINIMAP_SIZE,
        height: MINIMAP_SIZE,
        pixels,
    }
}

pub fn sample_world(world: &World, colors: &MapColorTable, center: Position) -> MinimapGrid {
    sample(center, |pos| {
        world.get_tile(pos).and_then(|tile| colors.tile_color(tile))
    })
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// Width and height of the window covered by one map file.
pub const SEGMENT_SIZE: i32 = 256;

/// Absolute world position. `z` is the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: u8,
}

impl Position {
    pub const fn new(x: i32, y: i32, z: u8) -> Self {
        Self { x, y, z }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z)
    }

    /// Cell of this position inside a 256×256 grid whose origin is
    /// `(base_x, base_y)`, or `None` if it falls outside that grid.
    pub fn relative_to(self, base_x: i32, base_y: i32) -> Option<(u8, u8)> {
        let dx = u8::try_from(self.x.checked_sub(base_x)?).ok()?;
        let dy = u8::try_from(self.y.checked_sub(base_y)?).ok()?;
        Some((dx, dy))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Identifies one map file: the segment-aligned origin and floor it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentKey {
    pub x: i32,
    pub y: i32,
    pub z: u8,
}

impl SegmentKey {
    pub const fn containing(pos: Position) -> Self {
        Self {
            x: pos.x.div_euclid(SEGMENT_SIZE) * SEGMENT_SIZE,
            y: pos.y.div_euclid(SEGMENT_SIZE) * SEGMENT_SIZE,
            z: pos.z,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}_{}_{}.json", self.x, self.y, self.z)
    }

    pub const fn origin(&self) -> Position {
        Position::new(self.x, self.y, self.z)
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.x, self.y, self.z)
    }
}

/// Inclusive box of valid world positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub start: Position,
    pub end: Position,
}

impl WorldBounds {
    /// The explorable area of the Odyssey world.
    pub const ODYSSEY: Self = Self {
        start: Position::new(31744, 30976, 0),
        end: Position::new(33791, 33279, 15),
    };

    pub const fn contains(&self, pos: Position) -> bool {
        pos.x >= self.start.x
            && pos.x <= self.end.x
            && pos.y >= self.start.y
            && pos.y <= self.end.y
            && pos.z >= self.start.z
            && pos.z <= self.end.z
    }

    /// Every segment touching the bounds, ordered by floor, then y, then x.
    pub fn segments(&self) -> Vec<SegmentKey> {
        let first = SegmentKey::containing(self.start);
        let last = SegmentKey::containing(self.end);

        let mut keys = Vec::new();
        for z in self.start.z..=self.end.z {
            for y in (first.y..=last.y).step_by(SEGMENT_SIZE as usize) {
                for x in (first.x..=last.x).step_by(SEGMENT_SIZE as usize) {
                    keys.push(SegmentKey { x, y, z });
                }
            }
        }
        keys
    }
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self::ODYSSEY
    }
}

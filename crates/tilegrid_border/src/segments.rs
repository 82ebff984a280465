//! World-space export of traced lines for collision shapes

use serde::{Deserialize, Serialize};
use tilegrid_core::{GridMap, TileSize};

use crate::tracer::{BorderTracer, Line};

/// A line segment in world units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: (f32, f32),
    pub end: (f32, f32),
}

impl Segment {
    /// Convert a corner-space line. Corner `(x, y)` maps to
    /// `(x * tile_width, y * tile_height)`; with `invert_y` the y axis points
    /// up and is measured from the bottom of a grid `grid_height` cells tall.
    pub fn from_line(line: &Line, tile_size: TileSize, grid_height: u32, invert_y: bool) -> Self {
        let to_world = |x: i32, y: i32| {
            let world_x = x as f32 * tile_size.width as f32;
            let row = if invert_y { grid_height as i32 - y } else { y };
            (world_x, row as f32 * tile_size.height as f32)
        };
        Self {
            start: to_world(line.start.x, line.start.y),
            end: to_world(line.end.x, line.end.y),
        }
    }

    pub fn length(&self) -> f32 {
        let dx = self.end.0 - self.start.0;
        let dy = self.end.1 - self.start.1;
        (dx * dx + dy * dy).sqrt()
    }
}

impl BorderTracer {
    /// All lines as world segments, in [`sorted_lines`](Self::sorted_lines) order
    pub fn segments(&self, tile_size: TileSize, grid_height: u32, invert_y: bool) -> Vec<Segment> {
        self.sorted_lines()
            .iter()
            .map(|line| Segment::from_line(line, tile_size, grid_height, invert_y))
            .collect()
    }

    /// Segments using the map's tile size and height, y pointing up
    pub fn world_segments(&self, map: &GridMap) -> Vec<Segment> {
        self.segments(map.tile_size(), map.grid_size().height, true)
    }
}

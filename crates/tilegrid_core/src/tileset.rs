//! Tileset collaborator interface
//!
//! Slicing an atlas image into per-tile images belongs to the rendering side.
//! The grid only needs to look tiles up by display coordinate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use tilegrid_autotile::AtlasCoord;

use crate::geometry::TileSize;

/// What the grid needs from a tileset
pub trait Tileset {
    /// Opaque per-tile image handle
    type Image;

    fn tile_image(&self, display: AtlasCoord) -> Option<&Self::Image>;

    /// Whether the tile at `display` has any transparent pixels
    fn tile_has_transparency(&self, display: AtlasCoord) -> bool;
}

/// Atlas layout of a tileset image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilesetInfo {
    /// Path to the image file (relative to the assets directory)
    pub path: String,
    pub tile_size: TileSize,
    pub columns: u32,
    pub rows: u32,
}

impl TilesetInfo {
    pub fn new(path: impl Into<String>, tile_size: TileSize, columns: u32, rows: u32) -> Self {
        Self {
            path: path.into(),
            tile_size,
            columns,
            rows,
        }
    }

    /// Total number of tiles in the atlas
    pub fn tile_count(&self) -> u32 {
        self.columns * self.rows
    }

    pub fn contains(&self, display: AtlasCoord) -> bool {
        display.x < self.columns && display.y < self.rows
    }
}

/// A tileset whose tiles were already sliced by the renderer
#[derive(Debug, Clone)]
pub struct SlicedTileset<I> {
    pub info: TilesetInfo,
    tiles: HashMap<AtlasCoord, SlicedTile<I>>,
}

#[derive(Debug, Clone)]
struct SlicedTile<I> {
    image: I,
    transparent: bool,
}

impl<I> SlicedTileset<I> {
    pub fn new(info: TilesetInfo) -> Self {
        Self {
            info,
            tiles: HashMap::new(),
        }
    }

    /// Register the image for one atlas cell
    pub fn insert(&mut self, display: AtlasCoord, image: I, transparent: bool) {
        self.tiles.insert(display, SlicedTile { image, transparent });
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl<I> Tileset for SlicedTileset<I> {
    type Image = I;

    fn tile_image(&self, display: AtlasCoord) -> Option<&I> {
        self.tiles.get(&display).map(|tile| &tile.image)
    }

    fn tile_has_transparency(&self, display: AtlasCoord) -> bool {
        self.tiles
            .get(&display)
            .map(|tile| tile.transparent)
            .unwrap_or(false)
    }
}

//! Core data structures for tilegrid
//!
//! This crate provides layered grid storage and its wiring:
//! - `GridMap` - Ordered layers sharing one bounded grid size
//! - `GridLayer` - A sparse 2-D array of elements (plain or tilemap)
//! - `GridElement` - Markers, tiles and autotile tiles
//! - `NeighborProcessor` - Neighborhood queries for autotiling and border tracing
//! - `Channel` - Typed, ordered event subscriptions
//! - `MapRecord` - Persisted map shape with a type-tag decoder registry

mod config;
mod element;
mod error;
mod events;
mod geometry;
mod layer;
mod map;
mod neighbors;
mod record;
mod tileset;

pub use config::GridMapConfig;
pub use element::{
    AutotileTile, ElementId, ElementKind, GridElement, LayerId, Tile, Variations,
};
pub use error::{ConfigError, GridError, RecordError};
pub use events::{
    Channel, ElementCreated, ElementRemoved, GridResized, RemovalCause, SubscriptionId,
    TileFormatted,
};
pub use geometry::{Direction, Edge, GridSize, Position, TileSize};
pub use layer::{GridLayer, LayerData, LayerEvents, LayerType, TilemapData};
pub use map::{GridMap, LayerPosition};
pub use neighbors::{Adjacency, Neighbor, NeighborGrid, NeighborProcessor};
pub use record::{
    load_map, save_map, ElementDecoder, ElementRecord, LayerDecoder, LayerRecord, MapRecord,
    RecordRegistry,
};
pub use tileset::{SlicedTileset, Tileset, TilesetInfo};

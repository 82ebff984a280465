//! Error types for grid storage, configuration and persistence

use thiserror::Error;

use crate::geometry::{GridSize, Position};

/// Structural precondition violations raised by maps, layers and neighbor queries
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("position {position} is outside the {size} grid")]
    PositionOutOfBounds { position: Position, size: GridSize },

    #[error("layer '{0}' has no grid; add it to a map first")]
    GridNotInitialized(String),

    #[error("element '{0}' is not part of any layer")]
    UnsetLayerReference(String),

    #[error("layer '{0}' not found")]
    LayerNotFound(String),

    #[error("a layer named '{0}' already exists")]
    DuplicateLayer(String),

    #[error("invalid adjacency configuration: {0}")]
    InvalidAdjacencyConfiguration(String),

    #[error("layer '{0}' is not a tilemap layer")]
    NotATilemapLayer(String),

    #[error("element handle no longer refers to a live element")]
    StaleElement,
}

/// Errors raised while reading or writing persisted maps
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to access map file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse map record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no element decoder registered for type '{0}'")]
    UnknownElementType(String),

    #[error("no layer decoder registered for type '{0}'")]
    UnknownLayerType(String),

    #[error("invalid variation key '{0}', expected \"x,y\"")]
    InvalidVariationKey(String),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Rule(#[from] tilegrid_autotile::RuleError),
}

/// Errors raised while loading a [`GridMapConfig`](crate::GridMapConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub use tilegrid_autotile::{AtlasCoord, AutotileRule, RuleError, RuleTable};
pub use tilegrid_core::{
    Adjacency, Channel, Direction, Edge, ElementId, GridElement, GridError, GridLayer, GridMap,
    GridMapConfig, GridSize, LayerPosition, NeighborProcessor, Position, RecordError,
    RecordRegistry, RemovalCause, TileSize, Variations,
};

#[cfg(feature = "border")]
pub use tilegrid_border::{BorderTracer, Line, Orientation, Segment};

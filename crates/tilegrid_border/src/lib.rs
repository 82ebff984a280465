//! Border tracing for tilegrid
//!
//! A [`BorderTracer`] follows one autotile group on one layer and keeps the
//! minimal set of axis-aligned lines separating that group from everything
//! else. The lines are updated per placed or removed tile, which makes them
//! cheap enough to drive static collision bodies in a live editor.
//!
//! ```no_run
//! use tilegrid_autotile::RuleTable;
//! use tilegrid_border::BorderTracer;
//! use tilegrid_core::{GridLayer, GridMap, GridMapConfig, LayerPosition, Position};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut map = GridMap::new(GridMapConfig::default());
//! map.add_layer(
//!     GridLayer::tilemap("walls", "walls.png", RuleTable::default_table()?),
//!     LayerPosition::End,
//! )?;
//! let tracer = BorderTracer::attach(&mut map, "walls", "wall")?;
//! map.create_autotile_tile_at("walls", Position::new(1, 1), "wall")?;
//!
//! for segment in tracer.borrow().world_segments(&map) {
//!     println!("{:?} -> {:?}", segment.start, segment.end);
//! }
//! # Ok(())
//! # }
//! ```

mod segments;
mod tracer;

pub use segments::Segment;
pub use tracer::{BorderTracer, Line, LineId, LinesChanged, Node, Orientation, TileTraced};

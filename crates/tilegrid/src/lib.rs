//! Layered tile grids with rule-based autotiling
//!
//! Re-exports the workspace crates under one name:
//! - [`core`] - maps, layers, elements, events and persistence
//! - [`autotile`] - autotile rules and their JSON configuration
//! - [`border`] - incremental border tracing (feature `border`)
//!
//! Most programs only need the [`prelude`].

pub mod prelude;

pub use tilegrid_autotile as autotile;
pub use tilegrid_core as core;

#[cfg(feature = "border")]
pub use tilegrid_border as border;

//! Geometry shared by every crate in the workspace.
//!
//! Tiles are fixed-size squares on a wraparound (toroidal) map. Everything
//! that addresses tiles, coarse dirty cells or cached blocks goes through
//! [`MapLayout`] and [`GridLayout`] so the wraparound rules live in one place.

mod edge;
mod layout;
mod packed;

pub use edge::{Direction, EdgeMask};
pub use layout::{
    AxisCells, CellSlot, ConfigError, GridConfig, GridLayout, MapLayout, TileRect, axis_cells,
};
pub use packed::{COVER_HIDDEN_RAW, CoverMask, RiverMask, RoadMask};

/// Edge length of one map tile in pixels.
pub const TILE_SIZE: u32 = 32;

/// Edge length of a tileable terrain texture. Tiles sample it at
/// `(tile * TILE_SIZE) mod TEXTURE_SPAN` so neighbouring tiles continue the pattern.
pub const TEXTURE_SPAN: u32 = 256;

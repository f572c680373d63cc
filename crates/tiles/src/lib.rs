//! CPU raster primitives for the tile cache: pixel surfaces, sprite sheets,
//! dirty-cell bitsets and the persistent block pool.

mod atlas;
mod dirty;
mod pool;
pub mod procedural;
mod surface;

pub use atlas::{Atlas, AtlasError, SheetId, SpriteSheet};
pub use dirty::{DirtyBits, DirtyGrid};
pub use pool::BlockPool;
pub use surface::{PixelRect, Rgba8, Surface, composite};

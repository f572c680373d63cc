//! Renderer crate root.
//!
//! This module defines the public API (`TileRenderer`, `RendererConfig`,
//! `RenderError`) and the state compartments used by the frame pipeline.
//!
//! Internal architecture overview:
//! - `renderer_init`: construction, resize and the session attach/detach lifecycle.
//! - `renderer_view_ops`: ingests `MapEvent`s and direct invalidations.
//! - `tile_state`: per-tile render data derived from the world.
//! - `renderer_blocks`: recomposites dirty cells of the persistent blocks.
//! - `renderer_frame`: cache reconciliation, viewport blit and overlays.
//! - `debug`: numeric overlay labels.
//! - `assets`: asset names, their resolution and the placeholder atlas.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use model::{ConfigError, GridConfig};
use render_protocol::{HookId, MapEvent, PlayerId, TerrainSet};
use serde::Deserialize;
use smol_str::SmolStr;
use tiles::{Atlas, AtlasError, BlockPool, DirtyGrid, Rgba8};
use transitions::TransitionTables;

use assets::{AssetResolver, AssetTable};

pub use assets::{
    CITIES, FOG_EDGES, FULL_FOG, GLYPHS, IRRIGATION, RAILS, RESOURCES, RIVER_COAST, RIVER_MOUTHS,
    RIVERS, ROADS, TERRITORY, UNITS, placeholder_atlas,
};
pub use tile_state::{RendererTile, TransitionDraw};

/// Atlas names of the forced layers drawn on coastal ocean tiles.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoastlineAssets {
    pub open_ocean_texture: SmolStr,
    pub open_ocean_mask: SmolStr,
    pub coast_texture: SmolStr,
    pub coast_mask: SmolStr,
}

impl Default for CoastlineAssets {
    fn default() -> Self {
        Self {
            open_ocean_texture: SmolStr::new_static("texture/deep_ocean"),
            open_ocean_mask: SmolStr::new_static("blend/deep_ocean"),
            coast_texture: SmolStr::new_static("texture/coast"),
            coast_mask: SmolStr::new_static("blend/coast"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub grid: GridConfig,
    pub coastline: CoastlineAssets,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("invalid grid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid atlas: {0}")]
    Atlas(#[from] AtlasError),
    #[error(
        "viewport {width}x{height} exceeds target surface {target_width}x{target_height}"
    )]
    ViewportExceedsTarget {
        width: u32,
        height: u32,
        target_width: u32,
        target_height: u32,
    },
    #[error("renderer is already attached to a session")]
    AlreadyAttached,
}

/// Work done by one `synchronize` or `render` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub tiles_recomputed: usize,
    pub cells_recomposited: usize,
    pub cells_blitted: usize,
}

const PLAYER_COLORS: [Rgba8; 8] = [
    Rgba8::opaque(220, 40, 40),
    Rgba8::opaque(240, 220, 60),
    Rgba8::opaque(60, 200, 80),
    Rgba8::opaque(60, 200, 220),
    Rgba8::opaque(70, 90, 230),
    Rgba8::opaque(200, 70, 220),
    Rgba8::opaque(245, 245, 245),
    Rgba8::opaque(240, 140, 40),
];

/// Territory and unit tint. Colours repeat every eight players.
pub fn player_color(player: PlayerId) -> Rgba8 {
    PLAYER_COLORS[player.0 as usize % PLAYER_COLORS.len()]
}

struct InputState {
    events_tx: Sender<MapEvent>,
    events_rx: Receiver<MapEvent>,
    hook: Option<HookId>,
}

struct AssetState {
    atlas: Atlas,
    tables: Arc<TransitionTables>,
    table: AssetTable,
    resolver: AssetResolver,
    // terrain set `table` was resolved against
    resolved_for: Option<TerrainSet>,
}

struct CacheState {
    grid: DirtyGrid,
    pool: BlockPool,
    // tiles.len() == grid.layout().map().tile_count()
    tiles: Vec<RendererTile>,
    fog_player: Option<PlayerId>,
}

/// Incremental renderer for a wrapping tile map.
///
/// Render data and composited pixels are cached per coarse cell; only cells
/// marked dirty by invalidations are rebuilt before a frame is drawn.
pub struct TileRenderer {
    config: RendererConfig,
    input_state: InputState,
    asset_state: AssetState,
    cache_state: CacheState,
}

impl TileRenderer {
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn atlas(&self) -> &Atlas {
        &self.asset_state.atlas
    }

    pub fn tables(&self) -> &TransitionTables {
        &self.asset_state.tables
    }

    pub fn dirty_grid(&self) -> &DirtyGrid {
        &self.cache_state.grid
    }

    pub fn block_pool(&self) -> &BlockPool {
        &self.cache_state.pool
    }

    pub fn is_attached(&self) -> bool {
        self.input_state.hook.is_some()
    }

    /// Cached render data; reflects the world as of the last synchronize.
    pub fn renderer_tile(&self, x: u32, y: u32) -> &RendererTile {
        let index = self.cache_state.grid.layout().map().index(x, y);
        &self.cache_state.tiles[index]
    }
}

mod assets;

mod debug;

mod renderer_blocks;

mod renderer_frame;

mod renderer_init;

mod renderer_view_ops;

mod tile_state;

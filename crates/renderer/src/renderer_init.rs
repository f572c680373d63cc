//! Renderer construction, resize and session lifecycle.

use std::sync::Arc;

use model::{GridLayout, MapLayout};
use render_protocol::{MapEvent, SessionHooks};
use tiles::{Atlas, BlockPool, DirtyGrid};
use transitions::TransitionTables;

use crate::assets::{AssetResolver, AssetTable};
use crate::{
    AssetState, CacheState, InputState, RenderError, RendererConfig, RendererTile, TileRenderer,
};

impl TileRenderer {
    /// Validates `config.grid` against `layout` and allocates the block pool.
    /// Everything starts dirty.
    pub fn new(
        layout: MapLayout,
        config: RendererConfig,
        atlas: Atlas,
        tables: Arc<TransitionTables>,
    ) -> Result<Self, RenderError> {
        let grid_layout = GridLayout::new(layout, config.grid)?;
        let mut pool = BlockPool::new();
        pool.ensure(&grid_layout);
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        tracing::info!(
            width = layout.width(),
            height = layout.height(),
            cell_tiles = grid_layout.cell_tiles(),
            block_tiles = grid_layout.block_tiles(),
            sheets = atlas.len(),
            "tile renderer created"
        );
        Ok(Self {
            config,
            input_state: InputState {
                events_tx,
                events_rx,
                hook: None,
            },
            asset_state: AssetState {
                atlas,
                tables,
                table: AssetTable::default(),
                resolver: AssetResolver::default(),
                resolved_for: None,
            },
            cache_state: CacheState {
                tiles: vec![RendererTile::default(); layout.tile_count()],
                grid: DirtyGrid::new(grid_layout),
                pool,
                fog_player: None,
            },
        })
    }

    /// Subscribes to `session` change events and marks everything dirty.
    ///
    /// Events are queued and applied at the start of the next
    /// `synchronize` or `render`.
    pub fn attach(&mut self, session: &mut dyn SessionHooks) -> Result<(), RenderError> {
        if self.input_state.hook.is_some() {
            return Err(RenderError::AlreadyAttached);
        }
        let sender = self.input_state.events_tx.clone();
        let hook = session.subscribe(Box::new(move |event: &MapEvent| {
            // the receiver lives as long as the renderer
            let _ = sender.send(*event);
        }));
        self.input_state.hook = Some(hook);
        self.invalidate_all();
        tracing::info!("tile renderer attached to session");
        Ok(())
    }

    /// Unsubscribes from `session`. Returns `false` when not attached or when
    /// the session no longer knew the hook.
    pub fn detach(&mut self, session: &mut dyn SessionHooks) -> bool {
        let Some(hook) = self.input_state.hook.take() else {
            return false;
        };
        let removed = session.unsubscribe(hook);
        tracing::info!(removed, "tile renderer detached from session");
        removed
    }

    /// Rebuilds the grid for a new map size. The block pool is reused when its
    /// shape allows; every cell is dirty afterwards.
    pub fn resize(&mut self, layout: MapLayout) -> Result<(), RenderError> {
        let grid_layout = GridLayout::new(layout, self.config.grid)?;
        let cache = &mut self.cache_state;
        let reallocated = cache.pool.ensure(&grid_layout);
        cache.grid.resize(grid_layout);
        cache.tiles.clear();
        cache.tiles.resize(layout.tile_count(), RendererTile::default());
        tracing::debug!(
            width = layout.width(),
            height = layout.height(),
            reallocated,
            "tile renderer resized"
        );
        Ok(())
    }
}

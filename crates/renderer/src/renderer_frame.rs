//! Frame-level orchestration.
//!
//! `synchronize` reconciles the caches with the world; `render` then blits
//! the visible part of the block pool and draws per-frame overlays on top.

use model::{CoverMask, Direction, EdgeMask, MapLayout, TILE_SIZE};
use render_protocol::{DebugLevel, PlayerId, TileModifiers, Viewport, WorldView};
use tiles::{Atlas, PixelRect, Rgba8, SheetId, Surface};

use crate::debug::{self, Label};
use crate::renderer_blocks::recomposite_dirty_blocks;
use crate::tile_state::compute_tile;
use crate::{AssetState, CacheState, FrameStats, RenderError, TileRenderer, player_color};

const ROAD_HUB_COLUMN: u32 = 8;
const GHOST_OFFSET: i64 = 4;
const GHOST_ALPHA: u8 = 128;

impl TileRenderer {
    /// Brings the tile and block caches up to date without drawing.
    ///
    /// Applies queued session events, follows world resizes and terrain set
    /// changes, and invalidates everything when the fog player changes.
    pub fn synchronize(
        &mut self,
        world: &dyn WorldView,
        fog_player: Option<PlayerId>,
    ) -> Result<FrameStats, RenderError> {
        self.drain_events()?;

        let layout = world.layout();
        if layout != self.cache_state.grid.layout().map() {
            self.resize(layout)?;
        }

        let terrain_set = world.terrain_set();
        if self.asset_state.resolved_for.as_ref() != Some(terrain_set) {
            let assets = &mut self.asset_state;
            assets.table = assets.resolver.resolve(&assets.atlas, terrain_set, &self.config);
            assets.resolved_for = Some(terrain_set.clone());
            tracing::debug!(terrains = terrain_set.len(), "resolved terrain assets");
            self.invalidate_all();
        }

        if fog_player != self.cache_state.fog_player {
            tracing::debug!(
                previous = ?self.cache_state.fog_player,
                current = ?fog_player,
                "fog player changed"
            );
            self.cache_state.fog_player = fog_player;
            self.invalidate_all();
        }

        let stats = FrameStats {
            tiles_recomputed: recompute_dirty_tiles(&mut self.cache_state, &self.asset_state, world),
            cells_recomposited: recomposite_dirty_blocks(&mut self.cache_state, &self.asset_state),
            cells_blitted: 0,
        };
        if stats.tiles_recomputed > 0 || stats.cells_recomposited > 0 {
            tracing::debug!(
                tiles = stats.tiles_recomputed,
                cells = stats.cells_recomposited,
                "synchronized tile cache"
            );
        }
        Ok(stats)
    }

    /// Draws `viewport` of the map into the top-left corner of `target`.
    pub fn render(
        &mut self,
        world: &dyn WorldView,
        target: &mut Surface,
        viewport: Viewport,
        fog_player: Option<PlayerId>,
        debug_level: DebugLevel,
    ) -> Result<FrameStats, RenderError> {
        if viewport.width > target.width() || viewport.height > target.height() {
            return Err(RenderError::ViewportExceedsTarget {
                width: viewport.width,
                height: viewport.height,
                target_width: target.width(),
                target_height: target.height(),
            });
        }

        let mut stats = self.synchronize(world, fog_player)?;
        stats.cells_blitted = blit_viewport(&self.cache_state, target, viewport);

        let map = self.cache_state.grid.layout().map();
        let mut painter = Painter {
            target,
            atlas: &self.asset_state.atlas,
        };
        for visible in visible_tiles(map, viewport) {
            draw_tile_overlays(&mut painter, world, &self.cache_state, &self.asset_state, visible);
        }
        if debug_level != DebugLevel::Off {
            let glyphs = self.asset_state.table.glyphs;
            for visible in visible_tiles(map, viewport) {
                debug::draw_tile_debug(&mut painter, glyphs, world, visible, debug_level);
            }
        }
        Ok(stats)
    }
}

fn recompute_dirty_tiles(cache: &mut CacheState, assets: &AssetState, world: &dyn WorldView) -> usize {
    let map = cache.grid.layout().map();
    let mut recomputed = 0;
    for cell in cache.grid.dirty_tile_cells() {
        let rect = cache.grid.layout().cell_rect(cell);
        for (x, y) in rect.tiles() {
            cache.tiles[map.index(x, y)] = compute_tile(
                world,
                &assets.atlas,
                &assets.tables,
                &assets.table,
                cache.fog_player,
                x,
                y,
            );
            recomputed += 1;
        }
        cache.grid.clear_tile_dirty(cell);
    }
    recomputed
}

/// Cell containing `position` and the length of the run from there, which ends
/// at the cell boundary, the map edge or after `remaining` pixels.
fn axis_run(position: u64, cell_pixels: u64, map_pixels: u64, remaining: u64) -> (u64, u64) {
    let cell = position / cell_pixels;
    let cell_end = ((cell + 1) * cell_pixels).min(map_pixels);
    (cell, (cell_end - position).min(remaining))
}

/// Straight copies from the block pool, one per cell-bounded run. Returns the
/// number of copies.
fn blit_viewport(cache: &CacheState, target: &mut Surface, viewport: Viewport) -> usize {
    let layout = cache.grid.layout();
    let map = layout.map();
    let cell_pixels = (layout.cell_tiles() * TILE_SIZE) as u64;
    let map_width = map.pixel_width();
    let map_height = map.pixel_height();

    let mut copies = 0;
    let mut out_y = 0u64;
    while out_y < viewport.height as u64 {
        let map_y = (viewport.offset_y + out_y as i64).rem_euclid(map_height as i64) as u64;
        let (grid_y, run_height) =
            axis_run(map_y, cell_pixels, map_height, viewport.height as u64 - out_y);

        let mut out_x = 0u64;
        while out_x < viewport.width as u64 {
            let map_x = (viewport.offset_x + out_x as i64).rem_euclid(map_width as i64) as u64;
            let (grid_x, run_width) =
                axis_run(map_x, cell_pixels, map_width, viewport.width as u64 - out_x);

            let cell = layout.cell_index(grid_x as u32, grid_y as u32);
            let slot = layout.cell_slot(cell);
            let source = PixelRect::new(
                slot.tile_x * TILE_SIZE + (map_x - grid_x * cell_pixels) as u32,
                slot.tile_y * TILE_SIZE + (map_y - grid_y * cell_pixels) as u32,
                run_width as u32,
                run_height as u32,
            );
            target.copy_from(out_x as i64, out_y as i64, cache.pool.block(slot.block), source);
            copies += 1;
            out_x += run_width;
        }
        out_y += run_height;
    }
    copies
}

/// A tile overlapping the viewport, with its wrapped map coordinates and the
/// target position of its top-left pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct VisibleTile {
    pub(crate) x: u32,
    pub(crate) y: u32,
    pub(crate) screen_x: i64,
    pub(crate) screen_y: i64,
}

fn tile_span(offset: i64, len: u32) -> std::ops::Range<i64> {
    if len == 0 {
        return 0..0;
    }
    let size = TILE_SIZE as i64;
    offset.div_euclid(size)..(offset + len as i64 - 1).div_euclid(size) + 1
}

/// Unwrapped tiles in row-major order; a viewport wider than the map visits
/// the same map tile more than once.
pub(crate) fn visible_tiles(map: MapLayout, viewport: Viewport) -> impl Iterator<Item = VisibleTile> {
    let size = TILE_SIZE as i64;
    let columns = tile_span(viewport.offset_x, viewport.width);
    tile_span(viewport.offset_y, viewport.height).flat_map(move |tile_y| {
        columns.clone().map(move |tile_x| {
            let (x, y) = map.wrap(tile_x, tile_y);
            VisibleTile {
                x,
                y,
                screen_x: tile_x * size - viewport.offset_x,
                screen_y: tile_y * size - viewport.offset_y,
            }
        })
    })
}

/// Sprite drawing into the frame target. Missing sheets and out-of-range
/// cells draw nothing.
pub(crate) struct Painter<'a> {
    pub(crate) target: &'a mut Surface,
    pub(crate) atlas: &'a Atlas,
}

impl Painter<'_> {
    pub(crate) fn columns(&self, sheet: Option<SheetId>) -> Option<u32> {
        sheet.and_then(|id| self.atlas.get(id)).map(|sheet| sheet.columns())
    }

    pub(crate) fn sprite(&mut self, sheet: Option<SheetId>, column: u32, x: i64, y: i64) {
        self.tinted(sheet, column, x, y, Rgba8::WHITE);
    }

    pub(crate) fn tinted(&mut self, sheet: Option<SheetId>, column: u32, x: i64, y: i64, tint: Rgba8) {
        let Some(sheet) = sheet.and_then(|id| self.atlas.get(id)) else {
            return;
        };
        let Some(cell) = sheet.cell_rect(column, 0) else {
            return;
        };
        if tint == Rgba8::WHITE {
            self.target.draw_sprite(x, y, sheet.surface(), cell);
        } else {
            self.target.draw_sprite_tinted(x, y, sheet.surface(), cell, tint);
        }
    }
}

fn draw_links(painter: &mut Painter<'_>, sheet: Option<SheetId>, links: EdgeMask, x: i64, y: i64) {
    let links = links.without_covered_corners();
    if links.is_empty() {
        painter.sprite(sheet, ROAD_HUB_COLUMN, x, y);
        return;
    }
    for direction in Direction::ALL {
        if links.has(direction) {
            painter.sprite(sheet, direction.index() as u32, x, y);
        }
    }
}

fn draw_tile_overlays(
    painter: &mut Painter<'_>,
    world: &dyn WorldView,
    cache: &CacheState,
    assets: &AssetState,
    visible: VisibleTile,
) {
    let map = cache.grid.layout().map();
    let state = &cache.tiles[map.index(visible.x, visible.y)];
    if state.cover.is_hidden() {
        return;
    }
    let table = &assets.table;
    let tile = world.tile(visible.x, visible.y);
    let (x, y) = (visible.screen_x, visible.screen_y);

    if tile.modifiers.contains(TileModifiers::IRRIGATION) {
        painter.sprite(table.irrigation, 0, x, y);
    }
    if tile.modifiers.contains(TileModifiers::ROAD) {
        draw_links(painter, table.roads, state.roads.road(), x, y);
    }
    if tile.modifiers.contains(TileModifiers::RAIL) {
        draw_links(painter, table.rails, state.roads.rail(), x, y);
    }
    if let (Some(resource), Some(columns)) = (tile.resource, painter.columns(table.resources)) {
        painter.sprite(table.resources, resource.0 as u32 % columns, x, y);
    }

    if let Some(city) = world.city_at(visible.x, visible.y) {
        painter.tinted(table.cities, 0, x, y, player_color(city.owner));
        Label::city_size(city.size).draw(painter, table.glyphs, x, y);
    } else if let Some(columns) = painter.columns(table.units) {
        let mut stack = world
            .units_at(visible.x, visible.y)
            .iter()
            .rev()
            .filter_map(|handle| world.unit(*handle));
        let top = stack.next();
        if let Some(ghost) = stack.next() {
            painter.tinted(
                table.units,
                ghost.kind as u32 % columns,
                x + GHOST_OFFSET,
                y - GHOST_OFFSET,
                player_color(ghost.owner).with_alpha(GHOST_ALPHA),
            );
        }
        if let Some(top) = top {
            painter.tinted(table.units, top.kind as u32 % columns, x, y, player_color(top.owner));
        }
    }

    if let CoverMask::Partial(covered) = state.cover {
        let column = assets.tables.terrain.canonical_index(covered) as u32;
        painter.sprite(table.fog_edges, column, x, y);
    }
    if let (Some(edges), Some(owner)) = (state.territory_edges, tile.owner) {
        if edges != EdgeMask::FULL {
            let column = assets.tables.territory.canonical_index(edges) as u32;
            painter.tinted(table.territory, column, x, y, player_color(owner));
        }
    }
}

//! Recompositing of dirty cells into the persistent block surfaces.

use model::{CoverMask, GridLayout, TILE_SIZE};
use tiles::{Atlas, PixelRect, Rgba8, SheetId, Surface};

use crate::{AssetState, CacheState, RendererTile};

// Drawn instead of the full fog sprite when the atlas lacks it.
const FOG_FALLBACK: Rgba8 = Rgba8::opaque(12, 12, 16);

/// Redraws every block-dirty cell and clears its bit. Returns the cell count.
pub(crate) fn recomposite_dirty_blocks(cache: &mut CacheState, assets: &AssetState) -> usize {
    let cells = cache.grid.dirty_block_cells();
    for &cell in &cells {
        composite_cell(
            cache.grid.layout(),
            &cache.tiles,
            cache.pool.block_mut(cache.grid.layout().cell_slot(cell).block),
            assets,
            cell,
        );
        cache.grid.clear_block_dirty(cell);
    }
    cells.len()
}

fn composite_cell(
    layout: &GridLayout,
    tiles: &[RendererTile],
    block: &mut Surface,
    assets: &AssetState,
    cell: usize,
) {
    let map = layout.map();
    let slot = layout.cell_slot(cell);
    let rect = layout.cell_rect(cell);
    for (x, y) in rect.tiles() {
        let dst = PixelRect::new(
            (slot.tile_x + x - rect.x) * TILE_SIZE,
            (slot.tile_y + y - rect.y) * TILE_SIZE,
            TILE_SIZE,
            TILE_SIZE,
        );
        composite_tile(block, dst, &tiles[map.index(x, y)], assets);
    }
}

fn composite_tile(block: &mut Surface, dst: PixelRect, tile: &RendererTile, assets: &AssetState) {
    let atlas = &assets.atlas;
    let table = &assets.table;

    if tile.cover == CoverMask::Hidden {
        block.fill_rect(dst, FOG_FALLBACK);
        draw_cell(block, dst, atlas, table.full_fog, 0);
        return;
    }

    match tile.base_texture.and_then(|id| atlas.get(id)) {
        Some(texture) => block.copy_wrapped(dst, texture.surface(), tile.source_offset),
        None => block.fill_rect(dst, Rgba8::TRANSPARENT),
    }

    for draw in &tile.transitions {
        if draw.bounds.is_empty() {
            continue;
        }
        let (Some(texture), Some(mask)) = (atlas.get(draw.texture), atlas.get(draw.mask)) else {
            continue;
        };
        let Some(mask_cell) = mask.cell_rect(draw.mask_index as u32, 0) else {
            continue;
        };
        let area = dst.sub_rect(draw.bounds);
        block.erase_with_mask(
            area.x as i64,
            area.y as i64,
            mask.surface(),
            mask_cell.sub_rect(draw.bounds),
        );
        block.fill_under_wrapped(
            area,
            texture.surface(),
            (
                draw.source_offset.0 + draw.bounds.x,
                draw.source_offset.1 + draw.bounds.y,
            ),
        );
    }

    if let Some(river) = tile.river {
        if tile.is_ocean {
            draw_cell(block, dst, atlas, table.river_mouths, river.river_index() as u32);
        } else {
            draw_cell(block, dst, atlas, table.rivers, river.river_index() as u32);
            if !river.ocean().is_empty() {
                draw_cell(block, dst, atlas, table.river_coast, river.ocean_index() as u32);
            }
        }
    }
}

fn draw_cell(block: &mut Surface, dst: PixelRect, atlas: &Atlas, sheet: Option<SheetId>, column: u32) {
    let Some(sheet) = sheet.and_then(|id| atlas.get(id)) else {
        return;
    };
    if let Some(cell) = sheet.cell_rect(column, 0) {
        block.draw_sprite(dst.x as i64, dst.y as i64, sheet.surface(), cell);
    }
}

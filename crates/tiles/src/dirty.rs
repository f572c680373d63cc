//! Two-tier dirty tracking over the coarse cell grid.
//!
//! `tile_dirty` marks cells whose per-tile render data must be recomputed,
//! `block_dirty` marks cells whose cached pixels must be recomposited. Both are
//! set together by invalidation and cleared separately by the renderer.

use bitvec::prelude::{BitSlice, BitVec, Lsb0};
use model::GridLayout;

pub type DirtyBits = BitVec<u32, Lsb0>;

#[derive(Debug, Clone)]
pub struct DirtyGrid {
    // tile_dirty.len() == block_dirty.len() == layout.cell_count()
    layout: GridLayout,
    tile_dirty: DirtyBits,
    block_dirty: DirtyBits,
}

impl DirtyGrid {
    /// Everything starts dirty.
    pub fn new(layout: GridLayout) -> Self {
        let cell_count = layout.cell_count();
        Self {
            layout,
            tile_dirty: BitVec::repeat(true, cell_count),
            block_dirty: BitVec::repeat(true, cell_count),
        }
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Replaces the grid after a map size change. The new grid is fully dirty.
    pub fn resize(&mut self, layout: GridLayout) {
        *self = Self::new(layout);
    }

    /// Marks every cell touched by the rectangle grown by one tile on each side.
    ///
    /// The halo covers neighbours whose edge masks depend on the changed tiles.
    /// Coordinates wrap, so a rectangle crossing the map edge dirties cells on
    /// both sides.
    pub fn invalidate_rect(&mut self, x: i64, y: i64, width: u32, height: u32) {
        let span_x = width as u64 + 2;
        let span_y = height as u64 + 2;
        let grid_width = self.layout.grid_width() as usize;
        for grid_y in self.layout.cells_y(y - 1, span_y) {
            let row = grid_y as usize * grid_width;
            for grid_x in self.layout.cells_x(x - 1, span_x) {
                let cell = row + grid_x as usize;
                self.tile_dirty.set(cell, true);
                self.block_dirty.set(cell, true);
            }
        }
    }

    pub fn invalidate_tile(&mut self, x: i64, y: i64) {
        self.invalidate_rect(x, y, 1, 1);
    }

    pub fn invalidate_all(&mut self) {
        let map = self.layout.map();
        self.invalidate_rect(0, 0, map.width(), map.height());
    }

    pub fn is_tile_dirty(&self, cell: usize) -> bool {
        self.tile_dirty[cell]
    }

    pub fn is_block_dirty(&self, cell: usize) -> bool {
        self.block_dirty[cell]
    }

    pub fn clear_tile_dirty(&mut self, cell: usize) {
        self.tile_dirty.set(cell, false);
    }

    pub fn clear_block_dirty(&mut self, cell: usize) {
        self.block_dirty.set(cell, false);
    }

    pub fn dirty_tile_cells(&self) -> Vec<usize> {
        self.tile_dirty.iter_ones().collect()
    }

    pub fn dirty_block_cells(&self) -> Vec<usize> {
        self.block_dirty.iter_ones().collect()
    }

    pub fn tile_dirty_count(&self) -> usize {
        self.tile_dirty.count_ones()
    }

    pub fn block_dirty_count(&self) -> usize {
        self.block_dirty.count_ones()
    }

    pub fn is_clean(&self) -> bool {
        self.tile_dirty.not_any() && self.block_dirty.not_any()
    }

    pub fn tile_bits(&self) -> &BitSlice<u32, Lsb0> {
        &self.tile_dirty
    }

    pub fn block_bits(&self) -> &BitSlice<u32, Lsb0> {
        &self.block_dirty
    }

    /// Backing words per bitset, `ceil(cells / 32)`.
    pub fn word_len(&self) -> usize {
        self.tile_dirty.as_raw_slice().len()
    }

    /// Clears both bitsets without touching any cache.
    pub fn mark_clean(&mut self) {
        self.tile_dirty.fill(false);
        self.block_dirty.fill(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{GridConfig, MapLayout};

    fn grid(width: u32, height: u32, cell_tiles: u32) -> DirtyGrid {
        let layout = GridLayout::new(
            MapLayout::new(width, height).unwrap(),
            GridConfig {
                cell_tiles,
                block_tiles: cell_tiles * 2,
            },
        )
        .unwrap();
        let mut grid = DirtyGrid::new(layout);
        grid.mark_clean();
        grid
    }

    fn dirty_cells(grid: &DirtyGrid) -> Vec<(u32, u32)> {
        grid.dirty_tile_cells()
            .into_iter()
            .map(|cell| grid.layout().cell_position(cell))
            .collect()
    }

    #[test]
    fn new_grid_is_fully_dirty() {
        let layout = GridLayout::new(MapLayout::new(100, 40).unwrap(), GridConfig::default())
            .unwrap();
        let grid = DirtyGrid::new(layout);
        assert_eq!(grid.tile_dirty_count(), 13 * 5);
        assert_eq!(grid.block_dirty_count(), 13 * 5);
        assert_eq!(grid.word_len(), (13 * 5usize).div_ceil(32));
    }

    #[test]
    fn interior_tile_dirties_only_its_cell() {
        let mut grid = grid(32, 32, 8);
        grid.invalidate_tile(12, 12);
        assert_eq!(dirty_cells(&grid), vec![(1, 1)]);
        assert_eq!(grid.tile_bits(), grid.block_bits());
    }

    #[test]
    fn halo_reaches_the_neighbouring_cell() {
        let mut grid = grid(32, 32, 8);
        grid.invalidate_tile(15, 8);
        assert_eq!(dirty_cells(&grid), vec![(1, 0), (2, 0), (1, 1), (2, 1)]);
    }

    #[test]
    fn corner_tile_wraps_to_all_four_corners() {
        let mut grid = grid(32, 32, 8);
        grid.invalidate_tile(0, 0);
        assert_eq!(dirty_cells(&grid), vec![(0, 0), (3, 0), (0, 3), (3, 3)]);
    }

    #[test]
    fn invalidation_is_idempotent() {
        let mut once = grid(64, 48, 8);
        once.invalidate_rect(30, -5, 20, 9);

        let mut many = grid(64, 48, 8);
        for _ in 0..5 {
            many.invalidate_rect(30, -5, 20, 9);
        }
        assert_eq!(once.tile_bits(), many.tile_bits());
        assert_eq!(once.block_bits(), many.block_bits());
    }

    #[test]
    fn straddling_rect_matches_split_rects() {
        let mut straddling = grid(64, 32, 8);
        straddling.invalidate_rect(58, 4, 12, 3);

        let mut split = grid(64, 32, 8);
        split.invalidate_rect(58, 4, 6, 3);
        split.invalidate_rect(0, 4, 6, 3);

        assert_eq!(straddling.tile_bits(), split.tile_bits());
        assert_eq!(straddling.block_bits(), split.block_bits());
    }

    #[test]
    fn oversized_rect_marks_every_cell_once() {
        let mut grid = grid(24, 16, 8);
        grid.invalidate_rect(-100, -100, 1000, 1000);
        assert_eq!(grid.tile_dirty_count(), 3 * 2);

        let mut all = self::grid(24, 16, 8);
        all.invalidate_all();
        assert_eq!(all.tile_bits(), grid.tile_bits());
    }

    #[test]
    fn single_cell_grid_terminates() {
        let mut grid = grid(4, 4, 8);
        grid.invalidate_rect(3, 3, 3, 3);
        assert_eq!(dirty_cells(&grid), vec![(0, 0)]);
    }

    #[test]
    fn clearing_bits_is_independent() {
        let mut grid = grid(16, 16, 8);
        grid.invalidate_tile(3, 3);
        let cell = grid.layout().cell_index(0, 0);
        grid.clear_tile_dirty(cell);
        assert!(!grid.is_tile_dirty(cell));
        assert!(grid.is_block_dirty(cell));
        grid.clear_block_dirty(cell);
        assert!(grid.is_clean());
    }

    #[test]
    fn resize_rebuilds_fully_dirty() {
        let mut grid = grid(16, 16, 8);
        assert!(grid.is_clean());
        let layout = GridLayout::new(
            MapLayout::new(40, 8).unwrap(),
            GridConfig {
                cell_tiles: 8,
                block_tiles: 16,
            },
        )
        .unwrap();
        grid.resize(layout);
        assert_eq!(grid.tile_dirty_count(), 5);
        assert_eq!(grid.block_dirty_count(), 5);
    }
}

use std::iter::Chain;
use std::ops::Range;

use serde::Deserialize;

use crate::{Direction, TILE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("map size {width}x{height} must be at least 1x1")]
    EmptyMap { width: u32, height: u32 },
    #[error("grid cell size {cell_tiles} must be a power of two")]
    CellNotPowerOfTwo { cell_tiles: u32 },
    #[error("block size {block_tiles} must be a nonzero multiple of cell size {cell_tiles}")]
    BlockNotMultipleOfCell { cell_tiles: u32, block_tiles: u32 },
}

/// Tile dimensions of a map that wraps in both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapLayout {
    width: u32,
    height: u32,
}

impl MapLayout {
    pub fn new(width: u32, height: u32) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyMap { width, height });
        }
        Ok(Self { width, height })
    }

    pub const fn width(self) -> u32 {
        self.width
    }

    pub const fn height(self) -> u32 {
        self.height
    }

    pub const fn tile_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    pub const fn pixel_width(self) -> u64 {
        self.width as u64 * TILE_SIZE as u64
    }

    pub const fn pixel_height(self) -> u64 {
        self.height as u64 * TILE_SIZE as u64
    }

    pub fn wrap_x(self, x: i64) -> u32 {
        x.rem_euclid(self.width as i64) as u32
    }

    pub fn wrap_y(self, y: i64) -> u32 {
        y.rem_euclid(self.height as i64) as u32
    }

    pub fn wrap(self, x: i64, y: i64) -> (u32, u32) {
        (self.wrap_x(x), self.wrap_y(y))
    }

    /// Row-major index of an in-bounds tile.
    ///
    /// Out-of-bounds coordinates are a caller bug and panic.
    pub fn index(self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "tile ({x}, {y}) is outside the {}x{} map",
            self.width,
            self.height
        );
        y as usize * self.width as usize + x as usize
    }

    pub fn position(self, index: usize) -> (u32, u32) {
        assert!(
            index < self.tile_count(),
            "tile index {index} is outside the {}x{} map",
            self.width,
            self.height
        );
        let width = self.width as usize;
        ((index % width) as u32, (index / width) as u32)
    }

    pub fn neighbor(self, x: u32, y: u32, direction: Direction) -> (u32, u32) {
        let (dx, dy) = direction.offset();
        self.wrap(x as i64 + dx, y as i64 + dy)
    }
}

/// Coarse dirty-cell and block sizes, in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub cell_tiles: u32,
    pub block_tiles: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_tiles: 8,
            block_tiles: 32,
        }
    }
}

impl GridConfig {
    pub fn validate(self) -> Result<(), ConfigError> {
        if !self.cell_tiles.is_power_of_two() {
            return Err(ConfigError::CellNotPowerOfTwo {
                cell_tiles: self.cell_tiles,
            });
        }
        if self.block_tiles == 0 || self.block_tiles % self.cell_tiles != 0 {
            return Err(ConfigError::BlockNotMultipleOfCell {
                cell_tiles: self.cell_tiles,
                block_tiles: self.block_tiles,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TileRect {
    pub fn tiles(self) -> impl Iterator<Item = (u32, u32)> {
        (self.y..self.y + self.height)
            .flat_map(move |tile_y| (self.x..self.x + self.width).map(move |tile_x| (tile_x, tile_y)))
    }

    pub const fn tile_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Where a coarse cell lives inside the block pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellSlot {
    pub block: usize,
    /// Tile offset of the cell's top-left corner inside its block.
    pub tile_x: u32,
    pub tile_y: u32,
}

/// Coarse cells and cached blocks laid over a [`MapLayout`].
///
/// Cells on the last row/column are clipped to the map when the map size is
/// not a multiple of the cell size; blocks likewise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridLayout {
    map: MapLayout,
    cell_tiles: u32,
    block_tiles: u32,
    grid_width: u32,
    grid_height: u32,
    blocks_x: u32,
    blocks_y: u32,
    // cell_slots.len() == grid_width * grid_height
    cell_slots: Box<[CellSlot]>,
}

impl GridLayout {
    pub fn new(map: MapLayout, config: GridConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let cell_tiles = config.cell_tiles;
        let block_tiles = config.block_tiles;
        let grid_width = map.width().div_ceil(cell_tiles);
        let grid_height = map.height().div_ceil(cell_tiles);
        let blocks_x = map.width().div_ceil(block_tiles);
        let blocks_y = map.height().div_ceil(block_tiles);

        let mut cell_slots = Vec::with_capacity(grid_width as usize * grid_height as usize);
        for grid_y in 0..grid_height {
            for grid_x in 0..grid_width {
                let tile_x = grid_x * cell_tiles;
                let tile_y = grid_y * cell_tiles;
                let block_x = tile_x / block_tiles;
                let block_y = tile_y / block_tiles;
                cell_slots.push(CellSlot {
                    block: (block_y * blocks_x + block_x) as usize,
                    tile_x: tile_x % block_tiles,
                    tile_y: tile_y % block_tiles,
                });
            }
        }

        Ok(Self {
            map,
            cell_tiles,
            block_tiles,
            grid_width,
            grid_height,
            blocks_x,
            blocks_y,
            cell_slots: cell_slots.into_boxed_slice(),
        })
    }

    pub const fn map(&self) -> MapLayout {
        self.map
    }

    pub const fn cell_tiles(&self) -> u32 {
        self.cell_tiles
    }

    pub const fn block_tiles(&self) -> u32 {
        self.block_tiles
    }

    pub const fn grid_width(&self) -> u32 {
        self.grid_width
    }

    pub const fn grid_height(&self) -> u32 {
        self.grid_height
    }

    pub const fn cell_count(&self) -> usize {
        self.grid_width as usize * self.grid_height as usize
    }

    pub const fn blocks_x(&self) -> u32 {
        self.blocks_x
    }

    pub const fn blocks_y(&self) -> u32 {
        self.blocks_y
    }

    pub const fn block_count(&self) -> usize {
        self.blocks_x as usize * self.blocks_y as usize
    }

    /// Every block surface is allocated at full size, even clipped ones.
    pub const fn block_pixel_size(&self) -> u32 {
        self.block_tiles * TILE_SIZE
    }

    pub fn cell_index(&self, grid_x: u32, grid_y: u32) -> usize {
        assert!(
            grid_x < self.grid_width && grid_y < self.grid_height,
            "grid cell ({grid_x}, {grid_y}) is outside the {}x{} grid",
            self.grid_width,
            self.grid_height
        );
        grid_y as usize * self.grid_width as usize + grid_x as usize
    }

    pub fn cell_position(&self, cell: usize) -> (u32, u32) {
        let width = self.grid_width as usize;
        ((cell % width) as u32, (cell / width) as u32)
    }

    pub fn cell_slot(&self, cell: usize) -> CellSlot {
        self.cell_slots[cell]
    }

    /// Tiles covered by a cell, clipped to the map.
    pub fn cell_rect(&self, cell: usize) -> TileRect {
        let (grid_x, grid_y) = self.cell_position(cell);
        let x = grid_x * self.cell_tiles;
        let y = grid_y * self.cell_tiles;
        TileRect {
            x,
            y,
            width: self.cell_tiles.min(self.map.width() - x),
            height: self.cell_tiles.min(self.map.height() - y),
        }
    }

    /// Cells of one axis touched by `len` tiles starting at `start`.
    pub fn cells_x(&self, start: i64, len: u64) -> AxisCells {
        axis_cells(start, len, self.map.width(), self.cell_tiles, self.grid_width)
    }

    pub fn cells_y(&self, start: i64, len: u64) -> AxisCells {
        axis_cells(start, len, self.map.height(), self.cell_tiles, self.grid_height)
    }
}

pub type AxisCells = Chain<Range<u32>, Range<u32>>;

/// Cell indices along one wrapping axis covered by `len` tiles from `start`.
///
/// A span that crosses the map edge becomes a tail run and a head run. When
/// both runs meet in the same cell, or `len` covers the axis, every cell is
/// returned once. The result is always finite, including for `grid_len == 1`.
pub fn axis_cells(start: i64, len: u64, map_len: u32, cell_tiles: u32, grid_len: u32) -> AxisCells {
    let empty = 0..0;
    if len == 0 {
        return (0..0).chain(empty);
    }
    if len >= map_len as u64 {
        return (0..grid_len).chain(empty);
    }

    let first = start.rem_euclid(map_len as i64) as u64;
    let last = first + len - 1;
    if last < map_len as u64 {
        let head = first as u32 / cell_tiles;
        let tail = last as u32 / cell_tiles;
        return (head..tail + 1).chain(empty);
    }

    let head = first as u32 / cell_tiles;
    let tail = (last - map_len as u64) as u32 / cell_tiles;
    if tail >= head {
        (0..grid_len).chain(empty)
    } else {
        (head..grid_len).chain(0..tail + 1)
    }
}

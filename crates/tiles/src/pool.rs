use model::GridLayout;

use crate::Surface;

/// Persistent block surfaces, one per block of the current [`GridLayout`].
///
/// Surfaces survive map resizes whenever the block count and block pixel
/// size stay the same; their contents are stale afterwards and must be
/// recomposited through the dirty grid.
#[derive(Debug, Default)]
pub struct BlockPool {
    block_pixel_size: u32,
    surfaces: Vec<Surface>,
}

impl BlockPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the pool match `layout`. Returns `true` when surfaces were reallocated.
    pub fn ensure(&mut self, layout: &GridLayout) -> bool {
        let size = layout.block_pixel_size();
        let count = layout.block_count();
        if self.block_pixel_size == size && self.surfaces.len() == count {
            tracing::debug!(blocks = count, "reusing block pool");
            return false;
        }
        tracing::info!(
            blocks = count,
            block_pixels = size,
            previous_blocks = self.surfaces.len(),
            "allocating block pool"
        );
        self.block_pixel_size = size;
        self.surfaces = (0..count).map(|_| Surface::new(size, size)).collect();
        true
    }

    pub fn block_pixel_size(&self) -> u32 {
        self.block_pixel_size
    }

    pub fn block(&self, index: usize) -> &Surface {
        &self.surfaces[index]
    }

    pub fn block_mut(&mut self, index: usize) -> &mut Surface {
        &mut self.surfaces[index]
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Rgba8;
    use model::{GridConfig, MapLayout};

    fn layout(width: u32, height: u32) -> GridLayout {
        GridLayout::new(MapLayout::new(width, height).unwrap(), GridConfig::default()).unwrap()
    }

    #[test]
    fn pool_allocates_one_surface_per_block() {
        let mut pool = BlockPool::new();
        assert!(pool.is_empty());
        assert!(pool.ensure(&layout(80, 40)));
        assert_eq!(pool.len(), 3 * 2);
        assert_eq!(pool.block(5).width(), 32 * 32);
    }

    #[test]
    fn pool_is_reused_when_block_shape_is_unchanged() {
        let mut pool = BlockPool::new();
        pool.ensure(&layout(64, 64));
        pool.block_mut(0).set_pixel(0, 0, Rgba8::WHITE);

        // 60x50 still needs 2x2 blocks of the same size
        assert!(!pool.ensure(&layout(60, 50)));
        assert_eq!(pool.block(0).pixel(0, 0), Rgba8::WHITE);

        assert!(pool.ensure(&layout(100, 50)));
        assert_eq!(pool.len(), 4 * 2);
        assert_eq!(pool.block(0).pixel(0, 0), Rgba8::TRANSPARENT);
    }

    #[test]
    fn pool_reallocates_when_block_size_changes() {
        let mut pool = BlockPool::new();
        pool.ensure(&layout(64, 64));
        let smaller = GridLayout::new(
            MapLayout::new(64, 64).unwrap(),
            GridConfig {
                cell_tiles: 8,
                block_tiles: 16,
            },
        )
        .unwrap();
        assert!(pool.ensure(&smaller));
        assert_eq!(pool.len(), 16);
        assert_eq!(pool.block_pixel_size(), 16 * 32);
    }
}

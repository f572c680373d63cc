use std::collections::HashMap;

use model::{TEXTURE_SPAN, TILE_SIZE};
use slotmap::SlotMap;

use crate::{PixelRect, Surface};

slotmap::new_key_type! {
    pub struct SheetId;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AtlasError {
    #[error("sprite cell size must be at least 1x1")]
    ZeroCell,
    #[error("sheet {width}x{height} is not divisible into {cell_width}x{cell_height} cells")]
    NotDivisible {
        width: u32,
        height: u32,
        cell_width: u32,
        cell_height: u32,
    },
    #[error("texture must be {span}x{span}, got {width}x{height}", span = TEXTURE_SPAN)]
    TextureSize { width: u32, height: u32 },
    #[error("atlas already holds a sheet named {0:?}")]
    DuplicateName(String),
}

/// A surface cut into equally sized cells, addressed by column and row.
#[derive(Debug, Clone)]
pub struct SpriteSheet {
    surface: Surface,
    cell_width: u32,
    cell_height: u32,
    columns: u32,
    rows: u32,
    // bounds.len() == columns * rows when present
    bounds: Option<Box<[PixelRect]>>,
}

impl SpriteSheet {
    pub fn new(surface: Surface, cell_width: u32, cell_height: u32) -> Result<Self, AtlasError> {
        if cell_width == 0 || cell_height == 0 {
            return Err(AtlasError::ZeroCell);
        }
        if surface.width() % cell_width != 0 || surface.height() % cell_height != 0 {
            return Err(AtlasError::NotDivisible {
                width: surface.width(),
                height: surface.height(),
                cell_width,
                cell_height,
            });
        }
        Ok(Self {
            columns: surface.width() / cell_width,
            rows: surface.height() / cell_height,
            surface,
            cell_width,
            cell_height,
            bounds: None,
        })
    }

    /// Sheet whose cells are one tile each.
    pub fn tiles(surface: Surface) -> Result<Self, AtlasError> {
        Self::new(surface, TILE_SIZE, TILE_SIZE)
    }

    /// Single-cell tileable texture sampled with wrapping offsets.
    pub fn texture(surface: Surface) -> Result<Self, AtlasError> {
        if surface.width() != TEXTURE_SPAN || surface.height() != TEXTURE_SPAN {
            return Err(AtlasError::TextureSize {
                width: surface.width(),
                height: surface.height(),
            });
        }
        Self::new(surface, TEXTURE_SPAN, TEXTURE_SPAN)
    }

    /// Records the non-transparent extent of every cell so blits can skip
    /// empty margins.
    pub fn with_bounds_index(mut self) -> Self {
        let mut bounds = Vec::with_capacity(self.columns as usize * self.rows as usize);
        for row in 0..self.rows {
            for column in 0..self.columns {
                bounds.push(self.opaque_extent(column, row));
            }
        }
        self.bounds = Some(bounds.into_boxed_slice());
        self
    }

    fn opaque_extent(&self, column: u32, row: u32) -> PixelRect {
        let origin_x = column * self.cell_width;
        let origin_y = row * self.cell_height;
        let mut min = (u32::MAX, u32::MAX);
        let mut max = (0u32, 0u32);
        for y in 0..self.cell_height {
            for x in 0..self.cell_width {
                if self.surface.pixel(origin_x + x, origin_y + y).a == 0 {
                    continue;
                }
                min = (min.0.min(x), min.1.min(y));
                max = (max.0.max(x), max.1.max(y));
            }
        }
        if min.0 == u32::MAX {
            return PixelRect::default();
        }
        PixelRect::new(min.0, min.1, max.0 - min.0 + 1, max.1 - min.1 + 1)
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn cell_width(&self) -> u32 {
        self.cell_width
    }

    pub fn cell_height(&self) -> u32 {
        self.cell_height
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn has_bounds_index(&self) -> bool {
        self.bounds.is_some()
    }

    /// Full cell rectangle in sheet pixels.
    pub fn cell_rect(&self, column: u32, row: u32) -> Option<PixelRect> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        Some(PixelRect::new(
            column * self.cell_width,
            row * self.cell_height,
            self.cell_width,
            self.cell_height,
        ))
    }

    /// Non-transparent extent relative to the cell origin, when indexed.
    pub fn cell_bounds(&self, column: u32, row: u32) -> Option<PixelRect> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        let bounds = self.bounds.as_ref()?;
        Some(bounds[(row * self.columns + column) as usize])
    }
}

/// Name to sheet registry. Names are the symbolic asset keys used by the
/// renderer and the terrain definitions.
#[derive(Debug, Default)]
pub struct Atlas {
    sheets: SlotMap<SheetId, SpriteSheet>,
    names: HashMap<String, SheetId>,
}

impl Atlas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        sheet: SpriteSheet,
    ) -> Result<SheetId, AtlasError> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(AtlasError::DuplicateName(name));
        }
        let id = self.sheets.insert(sheet);
        self.names.insert(name, id);
        Ok(id)
    }

    pub fn id(&self, name: &str) -> Option<SheetId> {
        self.names.get(name).copied()
    }

    pub fn get(&self, id: SheetId) -> Option<&SpriteSheet> {
        self.sheets.get(id)
    }

    pub fn by_name(&self, name: &str) -> Option<&SpriteSheet> {
        self.id(name).and_then(|id| self.sheets.get(id))
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Rgba8;

    #[test]
    fn sheet_must_divide_into_cells() {
        let error = SpriteSheet::new(Surface::new(70, 32), 32, 32).unwrap_err();
        assert_eq!(
            error,
            AtlasError::NotDivisible {
                width: 70,
                height: 32,
                cell_width: 32,
                cell_height: 32
            }
        );
        assert_eq!(
            SpriteSheet::new(Surface::new(4, 4), 0, 4).unwrap_err(),
            AtlasError::ZeroCell
        );

        let sheet = SpriteSheet::tiles(Surface::new(96, 64)).unwrap();
        assert_eq!((sheet.columns(), sheet.rows()), (3, 2));
        assert_eq!(sheet.cell_rect(2, 1), Some(PixelRect::new(64, 32, 32, 32)));
        assert_eq!(sheet.cell_rect(3, 0), None);
    }

    #[test]
    fn textures_must_span_the_wrap_period() {
        assert_eq!(
            SpriteSheet::texture(Surface::new(128, 256)).unwrap_err(),
            AtlasError::TextureSize {
                width: 128,
                height: 256
            }
        );
        assert!(SpriteSheet::texture(Surface::new(256, 256)).is_ok());
    }

    #[test]
    fn bounds_index_tracks_opaque_extent() {
        let mut surface = Surface::new(8, 4);
        surface.set_pixel(1, 2, Rgba8::WHITE);
        surface.set_pixel(2, 3, Rgba8::WHITE);
        surface.set_pixel(7, 0, Rgba8::WHITE);

        let sheet = SpriteSheet::new(surface, 4, 4).unwrap();
        assert_eq!(sheet.cell_bounds(0, 0), None, "no index built yet");

        let sheet = sheet.with_bounds_index();
        assert_eq!(sheet.cell_bounds(0, 0), Some(PixelRect::new(1, 2, 2, 2)));
        assert_eq!(sheet.cell_bounds(1, 0), Some(PixelRect::new(3, 0, 1, 1)));
        assert_eq!(sheet.cell_bounds(2, 0), None);
    }

    #[test]
    fn empty_cell_has_empty_bounds() {
        let sheet = SpriteSheet::new(Surface::new(4, 4), 4, 4)
            .unwrap()
            .with_bounds_index();
        assert!(sheet.cell_bounds(0, 0).unwrap().is_empty());
    }

    #[test]
    fn atlas_rejects_duplicate_names() {
        let mut atlas = Atlas::new();
        let id = atlas
            .insert("fog", SpriteSheet::tiles(Surface::new(32, 32)).unwrap())
            .unwrap();
        assert_eq!(atlas.id("fog"), Some(id));
        assert!(atlas.by_name("fog").is_some());
        assert!(atlas.by_name("road").is_none());

        let error = atlas
            .insert("fog", SpriteSheet::tiles(Surface::new(32, 32)).unwrap())
            .unwrap_err();
        assert_eq!(error, AtlasError::DuplicateName("fog".to_owned()));
        assert_eq!(atlas.len(), 1);
    }
}

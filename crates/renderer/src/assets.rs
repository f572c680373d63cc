//! Symbolic asset names, their resolution against an [`Atlas`], and the
//! procedural placeholder atlas.

use std::collections::HashSet;

use render_protocol::{TerrainId, TerrainSet};
use smol_str::SmolStr;
use tiles::procedural::{self, IconShape};
use tiles::{Atlas, AtlasError, Rgba8, SheetId, SpriteSheet};
use transitions::TransitionTables;

use crate::{CoastlineAssets, RendererConfig};

pub const FULL_FOG: &str = "fog/full";
pub const FOG_EDGES: &str = "fog/edges";
pub const TERRITORY: &str = "territory/edges";
pub const RIVERS: &str = "river/channels";
pub const RIVER_COAST: &str = "river/coast";
pub const RIVER_MOUTHS: &str = "river/mouths";
pub const ROADS: &str = "road/road";
pub const RAILS: &str = "road/rail";
pub const IRRIGATION: &str = "icon/irrigation";
pub const RESOURCES: &str = "icon/resources";
pub const UNITS: &str = "icon/units";
pub const CITIES: &str = "icon/city";
pub const GLYPHS: &str = "font/glyphs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct TexturePair {
    pub(crate) texture: Option<SheetId>,
    pub(crate) mask: Option<SheetId>,
}

impl TexturePair {
    pub(crate) fn both(self) -> Option<(SheetId, SheetId)> {
        Some((self.texture?, self.mask?))
    }
}

/// Sheet ids looked up once per terrain set so per-tile work never touches names.
#[derive(Debug, Clone, Default)]
pub(crate) struct AssetTable {
    // terrains[id.0] for every terrain of the resolved set
    pub(crate) terrains: Vec<TexturePair>,
    pub(crate) open_ocean: TexturePair,
    pub(crate) coast: TexturePair,
    pub(crate) full_fog: Option<SheetId>,
    pub(crate) fog_edges: Option<SheetId>,
    pub(crate) territory: Option<SheetId>,
    pub(crate) rivers: Option<SheetId>,
    pub(crate) river_coast: Option<SheetId>,
    pub(crate) river_mouths: Option<SheetId>,
    pub(crate) roads: Option<SheetId>,
    pub(crate) rails: Option<SheetId>,
    pub(crate) irrigation: Option<SheetId>,
    pub(crate) resources: Option<SheetId>,
    pub(crate) units: Option<SheetId>,
    pub(crate) cities: Option<SheetId>,
    pub(crate) glyphs: Option<SheetId>,
}

/// Resolves names against an atlas, warning once per missing name over the
/// lifetime of the resolver.
#[derive(Debug, Default)]
pub(crate) struct AssetResolver {
    warned: HashSet<SmolStr>,
}

impl AssetResolver {
    fn lookup(&mut self, atlas: &Atlas, name: &str) -> Option<SheetId> {
        let id = atlas.id(name);
        if id.is_none() && self.warned.insert(SmolStr::new(name)) {
            tracing::warn!(asset = name, "missing atlas sheet; layer will be skipped");
        }
        id
    }

    fn pair(&mut self, atlas: &Atlas, texture: &str, mask: &str) -> TexturePair {
        TexturePair {
            texture: self.lookup(atlas, texture),
            mask: self.lookup(atlas, mask),
        }
    }

    pub(crate) fn resolve(
        &mut self,
        atlas: &Atlas,
        terrain_set: &TerrainSet,
        config: &RendererConfig,
    ) -> AssetTable {
        let terrains = terrain_set
            .iter()
            .map(|(_, terrain)| self.pair(atlas, &terrain.texture, &terrain.blend_mask))
            .collect();
        let coastline = &config.coastline;
        AssetTable {
            terrains,
            open_ocean: self.pair(atlas, &coastline.open_ocean_texture, &coastline.open_ocean_mask),
            coast: self.pair(atlas, &coastline.coast_texture, &coastline.coast_mask),
            full_fog: self.lookup(atlas, FULL_FOG),
            fog_edges: self.lookup(atlas, FOG_EDGES),
            territory: self.lookup(atlas, TERRITORY),
            rivers: self.lookup(atlas, RIVERS),
            river_coast: self.lookup(atlas, RIVER_COAST),
            river_mouths: self.lookup(atlas, RIVER_MOUTHS),
            roads: self.lookup(atlas, ROADS),
            rails: self.lookup(atlas, RAILS),
            irrigation: self.lookup(atlas, IRRIGATION),
            resources: self.lookup(atlas, RESOURCES),
            units: self.lookup(atlas, UNITS),
            cities: self.lookup(atlas, CITIES),
            glyphs: self.lookup(atlas, GLYPHS),
        }
    }
}

impl AssetTable {
    pub(crate) fn terrain(&self, id: TerrainId) -> TexturePair {
        self.terrains.get(id.0 as usize).copied().unwrap_or_default()
    }
}

fn insert_once(
    atlas: &mut Atlas,
    name: &str,
    build: impl FnOnce() -> Result<SpriteSheet, AtlasError>,
) -> Result<(), AtlasError> {
    if atlas.id(name).is_none() {
        atlas.insert(name, build()?)?;
    }
    Ok(())
}

fn texture_seed(name: &str) -> u64 {
    // FNV-1a
    name.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x0100_0000_01b3)
    })
}

fn color_of(rgb: [u8; 3]) -> Rgba8 {
    Rgba8::opaque(rgb[0], rgb[1], rgb[2])
}

/// Every sheet the renderer references, generated procedurally.
pub fn placeholder_atlas(
    terrain_set: &TerrainSet,
    tables: &TransitionTables,
    coastline: &CoastlineAssets,
) -> Result<Atlas, AtlasError> {
    let mut atlas = Atlas::new();
    for (_, terrain) in terrain_set.iter() {
        insert_once(&mut atlas, &terrain.texture, || {
            procedural::noise_texture(texture_seed(&terrain.texture), color_of(terrain.color))
        })?;
        insert_once(&mut atlas, &terrain.blend_mask, || {
            procedural::blend_mask_sheet(&tables.terrain)
        })?;
    }

    insert_once(&mut atlas, &coastline.open_ocean_texture, || {
        procedural::noise_texture(texture_seed(&coastline.open_ocean_texture), Rgba8::opaque(22, 52, 110))
    })?;
    insert_once(&mut atlas, &coastline.open_ocean_mask, || {
        procedural::blend_mask_sheet(&tables.terrain)
    })?;
    insert_once(&mut atlas, &coastline.coast_texture, || {
        procedural::noise_texture(texture_seed(&coastline.coast_texture), Rgba8::opaque(226, 210, 160))
    })?;
    insert_once(&mut atlas, &coastline.coast_mask, || {
        procedural::blend_mask_sheet(&tables.terrain)
    })?;

    atlas.insert(FULL_FOG, procedural::full_fog_sheet()?)?;
    atlas.insert(FOG_EDGES, procedural::fog_edge_sheet(&tables.terrain)?)?;
    atlas.insert(TERRITORY, procedural::territory_sheet(&tables.territory)?)?;
    atlas.insert(RIVERS, procedural::river_sheet()?)?;
    atlas.insert(RIVER_COAST, procedural::river_coast_sheet()?)?;
    atlas.insert(RIVER_MOUTHS, procedural::river_mouth_sheet()?)?;
    atlas.insert(ROADS, procedural::road_sheet(Rgba8::opaque(140, 100, 60), 3)?)?;
    atlas.insert(RAILS, procedural::road_sheet(Rgba8::opaque(56, 56, 64), 2)?)?;
    atlas.insert(
        IRRIGATION,
        procedural::icon_sheet(&[Rgba8::opaque(90, 160, 230).with_alpha(160)], IconShape::Stripes)?,
    )?;
    let resource_colors = [
        Rgba8::opaque(240, 200, 40),
        Rgba8::opaque(200, 60, 60),
        Rgba8::opaque(120, 80, 40),
        Rgba8::opaque(240, 240, 240),
        Rgba8::opaque(60, 60, 60),
        Rgba8::opaque(160, 60, 200),
    ];
    atlas.insert(RESOURCES, procedural::icon_sheet(&resource_colors, IconShape::Disc)?)?;
    atlas.insert(UNITS, procedural::icon_sheet(&[Rgba8::WHITE; 4], IconShape::Diamond)?)?;
    atlas.insert(CITIES, procedural::icon_sheet(&[Rgba8::WHITE], IconShape::Square)?)?;
    atlas.insert(GLYPHS, procedural::glyph_sheet()?)?;

    tracing::debug!(sheets = atlas.len(), "built placeholder atlas");
    Ok(atlas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_atlas_resolves_every_name() {
        let set = TerrainSet::standard();
        let tables = TransitionTables::new();
        let config = RendererConfig::default();
        let atlas = placeholder_atlas(&set, &tables, &config.coastline).unwrap();

        let table = AssetResolver::default().resolve(&atlas, &set, &config);
        assert_eq!(table.terrains.len(), set.len());
        assert!(table.terrains.iter().all(|pair| pair.both().is_some()));
        assert!(table.open_ocean.both().is_some());
        assert!(table.coast.both().is_some());
        assert!(table.full_fog.is_some() && table.glyphs.is_some());

        let mask = atlas.by_name(&set.get(TerrainId(0)).blend_mask).unwrap();
        assert_eq!(mask.columns() as usize, tables.terrain.len());
        assert!(mask.has_bounds_index());
    }

    #[test]
    fn missing_assets_resolve_to_none() {
        let set = TerrainSet::standard();
        let table = AssetResolver::default().resolve(&Atlas::new(), &set, &RendererConfig::default());
        assert_eq!(table.terrain(TerrainId(3)), TexturePair::default());
        assert_eq!(table.terrain(TerrainId(200)), TexturePair::default());
        assert!(table.rivers.is_none());
    }
}

//! Per-tile render data derived from the world.
//!
//! [`compute_tile`] is a pure function of the tile, its 8 wrapped neighbours,
//! the fog player and the transition tables. Any change to one of those nine
//! tiles requires recomputation, which is why invalidation grows every
//! rectangle by one tile.

use model::{CoverMask, Direction, EdgeMask, RiverMask, RoadMask, TEXTURE_SPAN, TILE_SIZE};
use render_protocol::{MapTile, PlayerId, TerrainId, TileModifiers, WorldView};
use smallvec::SmallVec;
use tiles::{Atlas, PixelRect, SheetId};
use transitions::TransitionTables;

use crate::assets::AssetTable;

/// One masked texture layer: erase the base with `mask` then draw `texture`
/// underneath, both restricted to `bounds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionDraw {
    pub texture: SheetId,
    pub mask: SheetId,
    /// Column of the blend-mask sheet, a canonical terrain transition index.
    pub mask_index: u8,
    /// Wrap offset into `texture`.
    pub source_offset: (u32, u32),
    /// Non-transparent part of the mask cell, relative to the tile origin.
    pub bounds: PixelRect,
}

pub type Transitions = SmallVec<[TransitionDraw; 4]>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RendererTile {
    pub terrain: TerrainId,
    pub is_ocean: bool,
    pub base_texture: Option<SheetId>,
    pub source_offset: (u32, u32),
    /// Neighbours with the same terrain.
    pub terrain_edges: EdgeMask,
    /// `None` when no river art is drawn on this tile.
    pub river: Option<RiverMask>,
    pub roads: RoadMask,
    /// Neighbours with the same owner; `None` when unowned.
    pub territory_edges: Option<EdgeMask>,
    pub cover: CoverMask,
    /// Dominance-ascending, coastline layers included.
    pub transitions: Transitions,
}

pub fn texture_offset(x: u32, y: u32) -> (u32, u32) {
    (
        (x * TILE_SIZE) % TEXTURE_SPAN,
        (y * TILE_SIZE) % TEXTURE_SPAN,
    )
}

fn full_tile() -> PixelRect {
    PixelRect::new(0, 0, TILE_SIZE, TILE_SIZE)
}

struct Neighborhood<'w> {
    world: &'w dyn WorldView,
    x: u32,
    y: u32,
}

impl Neighborhood<'_> {
    fn tile(&self, direction: Direction) -> &MapTile {
        let (x, y) = self.world.layout().neighbor(self.x, self.y, direction);
        self.world.tile(x, y)
    }

    fn mask(&self, mut predicate: impl FnMut(&MapTile) -> bool) -> EdgeMask {
        EdgeMask::from_neighbors(|direction| predicate(self.tile(direction)))
    }

    fn cardinal_mask(&self, mut predicate: impl FnMut(&MapTile) -> bool) -> EdgeMask {
        self.mask(|tile| predicate(tile)) & EdgeMask::SIDES
    }

    fn uncovered_mask(&self, player: PlayerId) -> EdgeMask {
        let layout = self.world.layout();
        EdgeMask::from_neighbors(|direction| {
            let (x, y) = layout.neighbor(self.x, self.y, direction);
            self.world.is_uncovered(player, x, y)
        })
    }
}

struct TransitionQueue<'a> {
    atlas: &'a Atlas,
    tables: &'a TransitionTables,
    source_offset: (u32, u32),
    draws: Transitions,
}

impl TransitionQueue<'_> {
    fn push(&mut self, layer: Option<(SheetId, SheetId)>, raw: EdgeMask) {
        if raw.is_empty() {
            return;
        }
        let Some((texture, mask)) = layer else {
            return;
        };
        let mask_index = self.tables.terrain.canonical_index(raw);
        let bounds = self
            .atlas
            .get(mask)
            .and_then(|sheet| sheet.cell_bounds(mask_index as u32, 0))
            .unwrap_or_else(full_tile);
        self.draws.push(TransitionDraw {
            texture,
            mask,
            mask_index,
            source_offset: self.source_offset,
            bounds,
        });
    }
}

/// Render data for tile `(x, y)` as seen by `fog_player`.
pub(crate) fn compute_tile(
    world: &dyn WorldView,
    atlas: &Atlas,
    tables: &TransitionTables,
    assets: &AssetTable,
    fog_player: Option<PlayerId>,
    x: u32,
    y: u32,
) -> RendererTile {
    let tile = *world.tile(x, y);
    let terrain_set = world.terrain_set();
    let around = Neighborhood { world, x, y };

    let cover = match fog_player {
        None => CoverMask::Visible,
        Some(player) if !world.is_uncovered(player, x, y) => {
            return RendererTile {
                terrain: tile.terrain,
                cover: CoverMask::Hidden,
                ..RendererTile::default()
            };
        }
        Some(player) => CoverMask::from_covered_neighbors(around.uncovered_mask(player).complement()),
    };

    let is_ocean = terrain_set.is_ocean(tile.terrain);
    let source_offset = texture_offset(x, y);
    let terrain_edges = around.mask(|neighbor| neighbor.terrain == tile.terrain);
    let ocean_edges = around.mask(|neighbor| terrain_set.is_ocean(neighbor.terrain));
    let coastal = is_ocean && ocean_edges != EdgeMask::FULL;

    let mut queue = TransitionQueue {
        atlas,
        tables,
        source_offset,
        draws: Transitions::new(),
    };
    if coastal {
        queue.push(assets.open_ocean.both(), ocean_edges);
    }
    let own_rank = terrain_set.dominance(tile.terrain);
    for rank in own_rank as u16 + 1..=terrain_set.max_dominance() as u16 {
        let Some(other) = terrain_set.at_rank(rank as u8) else {
            continue;
        };
        let edges = around.mask(|neighbor| neighbor.terrain == other);
        queue.push(assets.terrain(other).both(), edges);
    }
    if coastal {
        queue.push(assets.coast.both(), ocean_edges.complement());
    }

    let river_edges = around.cardinal_mask(|neighbor| neighbor.modifiers.contains(TileModifiers::RIVER));
    let river = if is_ocean {
        (!river_edges.is_empty()).then(|| RiverMask::new(river_edges, EdgeMask::empty()))
    } else if tile.modifiers.contains(TileModifiers::RIVER) {
        Some(RiverMask::new(river_edges, ocean_edges & EdgeMask::SIDES))
    } else {
        None
    };

    let mut roads = RoadMask::EMPTY;
    if tile.modifiers.contains(TileModifiers::ROAD) {
        roads.set_road(around.mask(|neighbor| neighbor.modifiers.contains(TileModifiers::ROAD)));
    }
    if tile.modifiers.contains(TileModifiers::RAIL) {
        roads.set_rail(around.mask(|neighbor| neighbor.modifiers.contains(TileModifiers::RAIL)));
    }

    let territory_edges = tile
        .owner
        .map(|owner| around.mask(|neighbor| neighbor.owner == Some(owner)));

    RendererTile {
        terrain: tile.terrain,
        is_ocean,
        base_texture: assets.terrain(tile.terrain).texture,
        source_offset,
        terrain_edges,
        river,
        roads,
        territory_edges,
        cover,
        transitions: queue.draws,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RendererConfig;
    use crate::assets::{AssetResolver, placeholder_atlas};
    use render_protocol::{TerrainSet, UnitInfo};
    use session::MapSession;
    use session::test_support::session_from_rows;

    struct Fixture {
        atlas: Atlas,
        tables: TransitionTables,
        assets: AssetTable,
    }

    impl Fixture {
        fn new(set: &TerrainSet) -> Self {
            let tables = TransitionTables::new();
            let config = RendererConfig::default();
            let atlas = placeholder_atlas(set, &tables, &config.coastline).unwrap();
            let assets = AssetResolver::default().resolve(&atlas, set, &config);
            Self {
                atlas,
                tables,
                assets,
            }
        }

        fn compute(&self, world: &MapSession, fog: Option<PlayerId>, x: u32, y: u32) -> RendererTile {
            compute_tile(world, &self.atlas, &self.tables, &self.assets, fog, x, y)
        }
    }

    fn terrain(world: &MapSession, name: &str) -> TerrainId {
        world.terrain_set().id(name).unwrap()
    }

    #[test]
    fn terrain_edges_wrap_around_the_map() {
        let world = session_from_rows(&["gdd", "ddd", "ddg"]);
        let fixture = Fixture::new(world.terrain_set());
        let tile = fixture.compute(&world, None, 0, 0);
        // (2, 2) is the top-left neighbour of (0, 0) through both seams
        assert_eq!(tile.terrain_edges, EdgeMask::TOP_LEFT);
        assert_eq!(tile.cover, CoverMask::Visible);
        assert_eq!(tile.source_offset, (0, 0));
        assert_eq!(fixture.compute(&world, None, 2, 1).source_offset, (64, 32));
    }

    #[test]
    fn higher_dominance_neighbours_queue_in_ascending_order() {
        // desert (1) surrounded by grassland (4) on the left and hills (7) below
        let world = session_from_rows(&["ddd", "gdd", "hhh"]);
        let fixture = Fixture::new(world.terrain_set());
        let tile = fixture.compute(&world, None, 1, 1);

        let grass = fixture.assets.terrain(terrain(&world, "grassland"));
        let hills = fixture.assets.terrain(terrain(&world, "hills"));
        let textures: Vec<SheetId> = tile.transitions.iter().map(|draw| draw.texture).collect();
        assert_eq!(textures, vec![grass.texture.unwrap(), hills.texture.unwrap()]);

        let left = EdgeMask::LEFT;
        assert_eq!(
            tile.transitions[0].mask_index,
            fixture.tables.terrain.canonical_index(left)
        );
        let below = EdgeMask::BOTTOM | EdgeMask::BOTTOM_LEFT | EdgeMask::BOTTOM_RIGHT;
        assert_eq!(
            tile.transitions[1].mask_index,
            fixture.tables.terrain.canonical_index(below)
        );
        assert_eq!(tile.base_texture, fixture.assets.terrain(terrain(&world, "desert")).texture);
    }

    #[test]
    fn lower_dominance_never_draws_over_higher() {
        let world = session_from_rows(&["ddd", "dmd", "ddd"]);
        let fixture = Fixture::new(world.terrain_set());
        assert!(fixture.compute(&world, None, 1, 1).transitions.is_empty());
        assert_eq!(fixture.compute(&world, None, 0, 0).transitions.len(), 1);
    }

    #[test]
    fn transition_bounds_come_from_the_mask_index() {
        let world = session_from_rows(&["ggg", "ddd", "ddd"]);
        let fixture = Fixture::new(world.terrain_set());
        let tile = fixture.compute(&world, None, 1, 1);
        assert_eq!(tile.transitions.len(), 1);
        let draw = tile.transitions[0];
        let sheet = fixture.atlas.get(draw.mask).unwrap();
        assert_eq!(Some(draw.bounds), sheet.cell_bounds(draw.mask_index as u32, 0));
        assert!(draw.bounds.height < TILE_SIZE);
        assert_eq!(draw.bounds.y, 0);
    }

    #[test]
    fn missing_bounds_index_falls_back_to_the_full_tile() {
        let world = session_from_rows(&["ggg", "ddd", "ddd"]);
        let fixture = Fixture::new(world.terrain_set());
        let mut atlas = Atlas::new();
        // same names, masks without a bounds index
        for (_, def) in world.terrain_set().iter() {
            atlas
                .insert(def.texture.as_str(), tiles::procedural::noise_texture(1, tiles::Rgba8::BLACK).unwrap())
                .unwrap();
            let mask = tiles::procedural::blend_mask_sheet(&fixture.tables.terrain).unwrap();
            let plain = tiles::SpriteSheet::tiles(mask.surface().clone()).unwrap();
            atlas.insert(def.blend_mask.as_str(), plain).unwrap();
        }
        let assets = AssetResolver::default().resolve(&atlas, world.terrain_set(), &RendererConfig::default());
        let tile = compute_tile(&world, &atlas, &fixture.tables, &assets, None, 1, 1);
        assert_eq!(tile.transitions[0].bounds, full_tile());
    }

    #[test]
    fn coastal_ocean_gets_forced_layers_around_dominance() {
        let world = session_from_rows(&["...", ".g.", "..."]);
        let fixture = Fixture::new(world.terrain_set());
        let ocean = fixture.compute(&world, None, 1, 0);

        let open = fixture.assets.open_ocean.texture.unwrap();
        let coast = fixture.assets.coast.texture.unwrap();
        let grass = fixture.assets.terrain(terrain(&world, "grassland")).texture.unwrap();
        let textures: Vec<SheetId> = ocean.transitions.iter().map(|draw| draw.texture).collect();
        assert_eq!(textures, vec![open, grass, coast]);
        assert_eq!(
            ocean.transitions[2].mask_index,
            fixture.tables.terrain.canonical_index(EdgeMask::BOTTOM)
        );

        // on a 3x3 torus every other tile is a neighbour
        let corner = fixture.compute(&world, None, 0, 0);
        assert_eq!(corner.transitions.len(), 3);

        let land = fixture.compute(&world, None, 1, 1);
        assert!(land.transitions.is_empty());
    }

    #[test]
    fn open_ocean_has_no_forced_layers() {
        let world = session_from_rows(&["....", "....", "....", "...."]);
        let fixture = Fixture::new(world.terrain_set());
        let tile = fixture.compute(&world, None, 2, 2);
        assert!(tile.transitions.is_empty());
        assert_eq!(tile.terrain_edges, EdgeMask::FULL);
        assert!(tile.is_ocean);
    }

    #[test]
    fn river_masks_for_land_and_mouths() {
        let mut world = session_from_rows(&["....", ".gg.", ".gg.", "...."]);
        world.add_modifiers(1, 1, TileModifiers::RIVER);
        world.add_modifiers(2, 1, TileModifiers::RIVER);
        let fixture = Fixture::new(world.terrain_set());

        let source = fixture.compute(&world, None, 1, 1);
        let river = source.river.unwrap();
        assert_eq!(river.river(), EdgeMask::RIGHT);
        assert_eq!(river.ocean(), EdgeMask::TOP | EdgeMask::LEFT);

        let mouth = fixture.compute(&world, None, 1, 0).river.unwrap();
        assert_eq!(mouth.river(), EdgeMask::BOTTOM);
        assert!(mouth.ocean().is_empty());

        // land without the modifier draws no river even next to one
        assert_eq!(fixture.compute(&world, None, 1, 2).river, None);
        // ocean with no river neighbour draws no mouth
        assert_eq!(fixture.compute(&world, None, 3, 3).river, None);
    }

    #[test]
    fn road_and_rail_are_packed_independently() {
        let mut world = session_from_rows(&["ggg", "ggg", "ggg"]);
        world.add_modifiers(1, 1, TileModifiers::ROAD | TileModifiers::RAIL);
        world.add_modifiers(2, 1, TileModifiers::ROAD);
        world.add_modifiers(0, 0, TileModifiers::RAIL);
        let fixture = Fixture::new(world.terrain_set());

        let hub = fixture.compute(&world, None, 1, 1);
        assert_eq!(hub.roads.road(), EdgeMask::RIGHT);
        assert_eq!(hub.roads.rail(), EdgeMask::TOP_LEFT);

        let plain = fixture.compute(&world, None, 1, 0);
        assert!(plain.roads.is_empty());
    }

    #[test]
    fn territory_fully_owned_neighbourhood_is_full() {
        let mut world = session_from_rows(&["ggggg", "ggggg", "ggggg", "ggggg", "ggggg"]);
        let owner = Some(PlayerId(1));
        for y in 1..4 {
            for x in 1..4 {
                world.set_owner(x, y, owner);
            }
        }
        let fixture = Fixture::new(world.terrain_set());
        assert_eq!(
            fixture.compute(&world, None, 2, 2).territory_edges,
            Some(EdgeMask::FULL)
        );
        let edge = fixture.compute(&world, None, 1, 2).territory_edges.unwrap();
        assert_eq!(
            edge,
            EdgeMask::TOP | EdgeMask::RIGHT | EdgeMask::BOTTOM | EdgeMask::TOP_RIGHT | EdgeMask::BOTTOM_RIGHT
        );
        assert_eq!(fixture.compute(&world, None, 0, 0).territory_edges, None);
    }

    #[test]
    fn cover_is_hidden_partial_or_visible() {
        let mut world = session_from_rows(&["ggggg", "ggggg", "ggggg", "ggggg", "ggggg"]);
        let player = PlayerId(0);
        world.uncover(player, 2, 2, 1);
        world.spawn_unit(
            0,
            0,
            UnitInfo {
                owner: player,
                kind: 0,
            },
        );
        let fixture = Fixture::new(world.terrain_set());

        let hidden = fixture.compute(&world, Some(player), 0, 0);
        assert_eq!(hidden.cover, CoverMask::Hidden);
        assert_eq!(hidden.cover.raw(), 256);
        assert!(hidden.transitions.is_empty());
        assert_eq!(hidden.base_texture, None);

        let inner = fixture.compute(&world, Some(player), 2, 2);
        assert_eq!(inner.cover, CoverMask::Visible);

        let rim = fixture.compute(&world, Some(player), 1, 1);
        assert_eq!(
            rim.cover,
            CoverMask::Partial(EdgeMask::TOP | EdgeMask::LEFT | EdgeMask::TOP_LEFT | EdgeMask::TOP_RIGHT | EdgeMask::BOTTOM_LEFT)
        );

        assert_eq!(fixture.compute(&world, None, 0, 0).cover, CoverMask::Visible);
    }
}

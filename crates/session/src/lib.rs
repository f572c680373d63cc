//! In-memory authoritative game session.
//!
//! [`MapSession`] owns the map tiles, units, cities and per-player
//! visibility, and notifies subscribers through [`SessionHooks`] after every
//! mutation so attached renderers can invalidate the affected tiles.

use std::collections::HashMap;

use bitvec::prelude::{BitVec, Lsb0};
use model::MapLayout;
use render_protocol::{
    CityInfo, HookId, MapEvent, MapHook, MapTile, PlayerId, ResourceId, SessionHooks,
    TerrainId, TerrainSet, TileDebugInfo, TileModifiers, UnitHandle, UnitInfo, WorldView,
};
use slotmap::SlotMap;
use smallvec::SmallVec;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_support;

pub type Occupants = SmallVec<[UnitHandle; 2]>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("terrain {terrain:?} is not part of a set of {count} terrains")]
    UnknownTerrain { terrain: TerrainId, count: usize },
    #[error("unit {0:?} does not exist")]
    UnknownUnit(UnitHandle),
    #[error("no city at ({x}, {y})")]
    NoCity { x: u32, y: u32 },
}

#[derive(Debug, Clone, Copy)]
struct PlacedUnit {
    info: UnitInfo,
    x: u32,
    y: u32,
}

pub struct MapSession {
    layout: MapLayout,
    terrain_set: TerrainSet,
    // every per-tile vector has layout.tile_count() entries
    tiles: Vec<MapTile>,
    occupancy: Vec<Occupants>,
    units: SlotMap<UnitHandle, PlacedUnit>,
    cities: HashMap<usize, CityInfo>,
    visibility: HashMap<PlayerId, BitVec<u32, Lsb0>>,
    debug: HashMap<usize, TileDebugInfo>,
    hooks: SlotMap<HookId, MapHook>,
    revision: u64,
}

impl MapSession {
    /// A map covered in the first ocean terrain of `terrain_set`.
    pub fn new(layout: MapLayout, terrain_set: TerrainSet) -> Self {
        let blank = Self::blank_tile(&terrain_set);
        Self {
            layout,
            terrain_set,
            tiles: vec![blank; layout.tile_count()],
            occupancy: vec![Occupants::new(); layout.tile_count()],
            units: SlotMap::with_key(),
            cities: HashMap::new(),
            visibility: HashMap::new(),
            debug: HashMap::new(),
            hooks: SlotMap::with_key(),
            revision: 0,
        }
    }

    fn blank_tile(terrain_set: &TerrainSet) -> MapTile {
        let ocean = terrain_set
            .iter()
            .find(|(_, terrain)| terrain.is_ocean)
            .map(|(id, _)| id)
            .unwrap_or_default();
        MapTile {
            terrain: ocean,
            ..MapTile::default()
        }
    }

    /// Number of events fired so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    fn emit(&mut self, event: MapEvent) {
        self.revision += 1;
        for hook in self.hooks.values_mut() {
            hook(&event);
        }
    }

    fn check_terrain(&self, terrain: TerrainId) -> Result<(), SessionError> {
        if (terrain.0 as usize) < self.terrain_set.len() {
            Ok(())
        } else {
            Err(SessionError::UnknownTerrain {
                terrain,
                count: self.terrain_set.len(),
            })
        }
    }

    fn update_tile(&mut self, x: u32, y: u32, update: impl FnOnce(&mut MapTile)) {
        let index = self.layout.index(x, y);
        let before = self.tiles[index];
        update(&mut self.tiles[index]);
        if self.tiles[index] != before {
            self.emit(MapEvent::TileChanged { x, y });
        }
    }

    pub fn set_terrain(&mut self, x: u32, y: u32, terrain: TerrainId) -> Result<(), SessionError> {
        self.check_terrain(terrain)?;
        self.update_tile(x, y, |tile| tile.terrain = terrain);
        Ok(())
    }

    pub fn set_modifiers(&mut self, x: u32, y: u32, modifiers: TileModifiers) {
        self.update_tile(x, y, |tile| tile.modifiers = modifiers);
    }

    pub fn add_modifiers(&mut self, x: u32, y: u32, modifiers: TileModifiers) {
        self.update_tile(x, y, |tile| tile.modifiers |= modifiers);
    }

    pub fn set_owner(&mut self, x: u32, y: u32, owner: Option<PlayerId>) {
        self.update_tile(x, y, |tile| tile.owner = owner);
    }

    pub fn set_resource(&mut self, x: u32, y: u32, resource: Option<ResourceId>) {
        self.update_tile(x, y, |tile| tile.resource = resource);
    }

    /// Sets the terrain of a wrapping rectangle and fires one event for it.
    pub fn fill_terrain(
        &mut self,
        x: i64,
        y: i64,
        width: u32,
        height: u32,
        terrain: TerrainId,
    ) -> Result<(), SessionError> {
        self.check_terrain(terrain)?;
        let columns = width.min(self.layout.width());
        let rows = height.min(self.layout.height());
        for row in 0..rows as i64 {
            for column in 0..columns as i64 {
                let (tile_x, tile_y) = self.layout.wrap(x + column, y + row);
                let index = self.layout.index(tile_x, tile_y);
                self.tiles[index].terrain = terrain;
            }
        }
        self.emit(MapEvent::RectChanged {
            x,
            y,
            width,
            height,
        });
        Ok(())
    }

    pub fn spawn_unit(&mut self, x: u32, y: u32, info: UnitInfo) -> UnitHandle {
        let index = self.layout.index(x, y);
        let handle = self.units.insert(PlacedUnit { info, x, y });
        self.occupancy[index].push(handle);
        self.emit(MapEvent::TileChanged { x, y });
        handle
    }

    /// Moves a unit on top of the stack at its destination.
    pub fn move_unit(&mut self, handle: UnitHandle, x: u32, y: u32) -> Result<(), SessionError> {
        let to = self.layout.index(x, y);
        let unit = self
            .units
            .get_mut(handle)
            .ok_or(SessionError::UnknownUnit(handle))?;
        let (from_x, from_y) = (unit.x, unit.y);
        unit.x = x;
        unit.y = y;
        let from = self.layout.index(from_x, from_y);
        self.occupancy[from].retain(|occupant| *occupant != handle);
        self.occupancy[to].push(handle);
        self.emit(MapEvent::TileChanged {
            x: from_x,
            y: from_y,
        });
        self.emit(MapEvent::TileChanged { x, y });
        Ok(())
    }

    pub fn remove_unit(&mut self, handle: UnitHandle) -> Result<UnitInfo, SessionError> {
        let unit = self
            .units
            .remove(handle)
            .ok_or(SessionError::UnknownUnit(handle))?;
        let index = self.layout.index(unit.x, unit.y);
        self.occupancy[index].retain(|occupant| *occupant != handle);
        self.emit(MapEvent::TileChanged {
            x: unit.x,
            y: unit.y,
        });
        Ok(unit.info)
    }

    pub fn unit_position(&self, handle: UnitHandle) -> Option<(u32, u32)> {
        self.units.get(handle).map(|unit| (unit.x, unit.y))
    }

    /// Founds a city, or replaces the one already on the tile.
    pub fn found_city(&mut self, x: u32, y: u32, city: CityInfo) {
        let index = self.layout.index(x, y);
        self.cities.insert(index, city);
        self.emit(MapEvent::TileChanged { x, y });
    }

    pub fn set_city_size(&mut self, x: u32, y: u32, size: u16) -> Result<(), SessionError> {
        let index = self.layout.index(x, y);
        let city = self
            .cities
            .get_mut(&index)
            .ok_or(SessionError::NoCity { x, y })?;
        city.size = size;
        self.emit(MapEvent::TileChanged { x, y });
        Ok(())
    }

    pub fn raze_city(&mut self, x: u32, y: u32) -> Result<CityInfo, SessionError> {
        let index = self.layout.index(x, y);
        let city = self
            .cities
            .remove(&index)
            .ok_or(SessionError::NoCity { x, y })?;
        self.emit(MapEvent::TileChanged { x, y });
        Ok(city)
    }

    /// Uncovers the square of tiles within `radius` of `(x, y)` for `player`.
    /// Returns how many tiles were newly uncovered.
    pub fn uncover(&mut self, player: PlayerId, x: i64, y: i64, radius: u32) -> usize {
        let layout = self.layout;
        let side = radius.saturating_mul(2).saturating_add(1);
        let bits = self
            .visibility
            .entry(player)
            .or_insert_with(|| BitVec::repeat(false, layout.tile_count()));
        let mut newly = 0;
        for row in 0..side.min(layout.height()) as i64 {
            for column in 0..side.min(layout.width()) as i64 {
                let (tile_x, tile_y) = layout.wrap(x - radius as i64 + column, y - radius as i64 + row);
                let index = layout.index(tile_x, tile_y);
                if !bits[index] {
                    bits.set(index, true);
                    newly += 1;
                }
            }
        }
        if newly > 0 {
            self.emit(MapEvent::RectChanged {
                x: x - radius as i64,
                y: y - radius as i64,
                width: side,
                height: side,
            });
        }
        newly
    }

    pub fn uncover_all(&mut self, player: PlayerId) {
        let count = self.layout.tile_count();
        self.visibility.insert(player, BitVec::repeat(true, count));
        self.emit(MapEvent::AllChanged);
    }

    /// Analysis data shown by the debug overlay. Fires no event; the overlay
    /// is redrawn every frame.
    pub fn set_debug_info(&mut self, x: u32, y: u32, info: TileDebugInfo) {
        let index = self.layout.index(x, y);
        self.debug.insert(index, info);
    }

    /// Swaps the terrain definitions, e.g. after new artwork changed the
    /// dominance order. Every tile must still name a terrain of the new set.
    pub fn replace_terrain_set(&mut self, terrain_set: TerrainSet) -> Result<(), SessionError> {
        if let Some(tile) = self
            .tiles
            .iter()
            .find(|tile| tile.terrain.0 as usize >= terrain_set.len())
        {
            return Err(SessionError::UnknownTerrain {
                terrain: tile.terrain,
                count: terrain_set.len(),
            });
        }
        self.terrain_set = terrain_set;
        self.emit(MapEvent::AllChanged);
        Ok(())
    }

    /// Starts over on a blank map of the new size. Units, cities, visibility
    /// and debug data are dropped.
    pub fn resize(&mut self, layout: MapLayout) {
        tracing::debug!(
            width = layout.width(),
            height = layout.height(),
            "resizing session map"
        );
        let blank = Self::blank_tile(&self.terrain_set);
        self.layout = layout;
        self.tiles = vec![blank; layout.tile_count()];
        self.occupancy = vec![Occupants::new(); layout.tile_count()];
        self.units.clear();
        self.cities.clear();
        self.visibility.clear();
        self.debug.clear();
        self.emit(MapEvent::Resized { layout });
    }
}

impl WorldView for MapSession {
    fn layout(&self) -> MapLayout {
        self.layout
    }

    fn terrain_set(&self) -> &TerrainSet {
        &self.terrain_set
    }

    fn tile(&self, x: u32, y: u32) -> &MapTile {
        &self.tiles[self.layout.index(x, y)]
    }

    fn is_uncovered(&self, player: PlayerId, x: u32, y: u32) -> bool {
        let index = self.layout.index(x, y);
        self.visibility
            .get(&player)
            .is_some_and(|bits| bits[index])
    }

    fn units_at(&self, x: u32, y: u32) -> &[UnitHandle] {
        &self.occupancy[self.layout.index(x, y)]
    }

    fn unit(&self, handle: UnitHandle) -> Option<&UnitInfo> {
        self.units.get(handle).map(|unit| &unit.info)
    }

    fn city_at(&self, x: u32, y: u32) -> Option<&CityInfo> {
        self.cities.get(&self.layout.index(x, y))
    }

    fn debug_info(&self, x: u32, y: u32) -> Option<TileDebugInfo> {
        self.debug.get(&self.layout.index(x, y)).copied()
    }
}

impl SessionHooks for MapSession {
    fn subscribe(&mut self, hook: MapHook) -> HookId {
        let id = self.hooks.insert(hook);
        tracing::info!(hooks = self.hooks.len(), "session hook subscribed");
        id
    }

    fn unsubscribe(&mut self, id: HookId) -> bool {
        let removed = self.hooks.remove(id).is_some();
        if removed {
            tracing::info!(hooks = self.hooks.len(), "session hook unsubscribed");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{record_events, session_from_rows};

    fn unit(owner: u8) -> UnitInfo {
        UnitInfo {
            owner: PlayerId(owner),
            kind: 0,
        }
    }

    #[test]
    fn new_session_is_all_ocean() {
        let session = MapSession::new(MapLayout::new(3, 2).unwrap(), TerrainSet::standard());
        let ocean = session.terrain_set().id("ocean").unwrap();
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(session.tile(x, y).terrain, ocean);
            }
        }
        assert_eq!(session.revision(), 0);
    }

    #[test]
    fn mutations_fire_tile_events() {
        let mut session = session_from_rows(&["....", "....", "....", "...."]);
        let (_, events) = record_events(&mut session);
        let grass = session.terrain_set().id("grassland").unwrap();

        session.set_terrain(2, 2, grass).unwrap();
        // unchanged value fires nothing
        session.set_terrain(2, 2, grass).unwrap();
        session.set_owner(1, 0, Some(PlayerId(3)));
        session.add_modifiers(3, 1, TileModifiers::ROAD | TileModifiers::RIVER);
        session.set_modifiers(3, 1, TileModifiers::RIVER);
        session.set_modifiers(3, 1, TileModifiers::RIVER);

        assert_eq!(
            *events.borrow(),
            vec![
                MapEvent::TileChanged { x: 2, y: 2 },
                MapEvent::TileChanged { x: 1, y: 0 },
                MapEvent::TileChanged { x: 3, y: 1 },
                MapEvent::TileChanged { x: 3, y: 1 },
            ]
        );
        assert_eq!(session.tile(3, 1).modifiers, TileModifiers::RIVER);
        assert_eq!(session.tile_wrapped(-2, 6).terrain, grass);
    }

    #[test]
    fn unknown_terrain_is_rejected() {
        let mut session = session_from_rows(&[".."]);
        assert_eq!(
            session.set_terrain(0, 0, TerrainId(42)),
            Err(SessionError::UnknownTerrain {
                terrain: TerrainId(42),
                count: 9
            })
        );
    }

    #[test]
    fn units_stack_topmost_last() {
        let mut session = session_from_rows(&["...", "..."]);
        let first = session.spawn_unit(1, 1, unit(0));
        let second = session.spawn_unit(1, 1, unit(1));
        assert_eq!(session.units_at(1, 1), &[first, second]);

        session.move_unit(first, 2, 0).unwrap();
        assert_eq!(session.units_at(1, 1), &[second]);
        assert_eq!(session.units_at(2, 0), &[first]);
        assert_eq!(session.unit_position(first), Some((2, 0)));

        let info = session.remove_unit(second).unwrap();
        assert_eq!(info.owner, PlayerId(1));
        assert!(session.units_at(1, 1).is_empty());
        assert_eq!(
            session.remove_unit(second),
            Err(SessionError::UnknownUnit(second))
        );
    }

    #[test]
    fn uncover_wraps_and_reports_new_tiles() {
        let mut session = session_from_rows(&["....", "....", "....", "...."]);
        let (_, events) = record_events(&mut session);
        let player = PlayerId(0);

        assert_eq!(session.uncover(player, 0, 0, 1), 9);
        assert!(session.is_uncovered(player, 3, 3));
        assert!(session.is_uncovered(player, 1, 1));
        assert!(!session.is_uncovered(player, 2, 2));
        assert!(!session.is_uncovered(PlayerId(1), 0, 0));

        assert_eq!(session.uncover(player, 0, 0, 1), 0);
        session.uncover_all(PlayerId(1));
        assert!(session.is_uncovered(PlayerId(1), 2, 2));
        assert_eq!(
            *events.borrow(),
            vec![
                MapEvent::RectChanged {
                    x: -1,
                    y: -1,
                    width: 3,
                    height: 3
                },
                MapEvent::AllChanged,
            ]
        );
    }

    #[test]
    fn cities_and_debug_info() {
        let mut session = session_from_rows(&["gg", "gg"]);
        session.found_city(
            1,
            0,
            CityInfo {
                owner: PlayerId(2),
                size: 3,
            },
        );
        session.set_city_size(1, 0, 12).unwrap();
        assert_eq!(session.city_at(1, 0).map(|city| city.size), Some(12));
        assert_eq!(
            session.set_city_size(0, 0, 1),
            Err(SessionError::NoCity { x: 0, y: 0 })
        );

        let info = TileDebugInfo {
            continent: Some(1),
            ..TileDebugInfo::default()
        };
        session.set_debug_info(0, 1, info);
        assert_eq!(session.debug_info(0, 1), Some(info));
        assert_eq!(session.debug_info(1, 1), None);

        assert_eq!(session.raze_city(1, 0).unwrap().size, 12);
        assert!(session.city_at(1, 0).is_none());
    }

    #[test]
    fn resize_and_terrain_set_replacement_fire_events() {
        let mut session = session_from_rows(&["gm", "d."]);
        let (_, events) = record_events(&mut session);

        let smaller = TerrainSet::new(vec![render_protocol::TerrainDef::new(
            "sea",
            0,
            true,
            [0, 0, 0],
        )])
        .unwrap();
        assert!(session.replace_terrain_set(smaller.clone()).is_err());

        let layout = MapLayout::new(5, 1).unwrap();
        session.resize(layout);
        assert_eq!(session.layout(), layout);
        session.replace_terrain_set(smaller).unwrap();

        assert_eq!(
            *events.borrow(),
            vec![MapEvent::Resized { layout }, MapEvent::AllChanged]
        );
    }

    #[test]
    fn unsubscribed_hooks_stop_receiving() {
        let mut session = session_from_rows(&["..", ".."]);
        let (id, events) = record_events(&mut session);
        assert_eq!(session.hook_count(), 1);
        assert!(session.unsubscribe(id));
        assert!(!session.unsubscribe(id));
        session.set_owner(0, 0, Some(PlayerId(0)));
        assert!(events.borrow().is_empty());
        assert_eq!(session.revision(), 1);
    }
}

//! Data exchanged between the game session and the tile renderer.
//!
//! The renderer only reads world state through [`WorldView`] and learns about
//! changes through the hooks in [`SessionHooks`].

mod terrain;

use bitflags::bitflags;
use model::MapLayout;
use serde::Deserialize;

pub use terrain::{TerrainDef, TerrainId, TerrainSet, TerrainSetError};

slotmap::new_key_type! {
    pub struct UnitHandle;
    pub struct HookId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u16);

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TileModifiers: u8 {
        const RIVER = 1 << 0;
        const ROAD = 1 << 1;
        const RAIL = 1 << 2;
        const IRRIGATION = 1 << 3;
    }
}

/// Authoritative state of one map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MapTile {
    pub terrain: TerrainId,
    pub modifiers: TileModifiers,
    pub resource: Option<ResourceId>,
    pub owner: Option<PlayerId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitInfo {
    pub owner: PlayerId,
    /// Sprite column in the unit sheet.
    pub kind: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CityInfo {
    pub owner: PlayerId,
    pub size: u16,
}

/// Analysis data a world may expose for the level 2 debug overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileDebugInfo {
    pub continent: Option<u16>,
    pub distance_to_edge: Option<u16>,
    /// Food, shields, trade.
    pub yields: Option<[u8; 3]>,
}

/// Read-only access to authoritative world state.
///
/// Coordinates passed to the per-tile accessors are in bounds of
/// [`WorldView::layout`]; implementations may panic otherwise.
pub trait WorldView {
    fn layout(&self) -> MapLayout;

    fn terrain_set(&self) -> &TerrainSet;

    fn tile(&self, x: u32, y: u32) -> &MapTile;

    fn is_uncovered(&self, player: PlayerId, x: u32, y: u32) -> bool;

    /// Units on a tile, topmost last.
    fn units_at(&self, x: u32, y: u32) -> &[UnitHandle];

    fn unit(&self, handle: UnitHandle) -> Option<&UnitInfo>;

    fn city_at(&self, x: u32, y: u32) -> Option<&CityInfo>;

    fn debug_info(&self, _x: u32, _y: u32) -> Option<TileDebugInfo> {
        None
    }

    fn tile_wrapped(&self, x: i64, y: i64) -> &MapTile {
        let (x, y) = self.layout().wrap(x, y);
        self.tile(x, y)
    }
}

/// Change notification fired by the session after a mutation is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapEvent {
    TileChanged { x: u32, y: u32 },
    RectChanged { x: i64, y: i64, width: u32, height: u32 },
    AllChanged,
    Resized { layout: MapLayout },
}

pub type MapHook = Box<dyn FnMut(&MapEvent)>;

/// Observer registration offered by a game session.
pub trait SessionHooks {
    fn subscribe(&mut self, hook: MapHook) -> HookId;

    /// Returns `false` when `id` was not subscribed.
    fn unsubscribe(&mut self, id: HookId) -> bool;
}

/// Visible window in map pixel space. Offsets wrap around the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    pub offset_x: i64,
    pub offset_y: i64,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(offset_x: i64, offset_y: i64, width: u32, height: u32) -> Self {
        Self {
            offset_x,
            offset_y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugLevel {
    #[default]
    Off,
    /// Terrain id and dominance.
    Terrain,
    /// Adds continent, distance to edge and yields when the world has them.
    Analysis,
}

impl DebugLevel {
    /// Numeric levels above 2 saturate.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => DebugLevel::Off,
            1 => DebugLevel::Terrain,
            _ => DebugLevel::Analysis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_levels_are_ordered() {
        assert_eq!(DebugLevel::from_level(0), DebugLevel::Off);
        assert_eq!(DebugLevel::from_level(1), DebugLevel::Terrain);
        assert_eq!(DebugLevel::from_level(9), DebugLevel::Analysis);
        assert!(DebugLevel::Analysis > DebugLevel::Terrain);
        assert_eq!(DebugLevel::default(), DebugLevel::Off);
    }

    #[test]
    fn modifiers_combine() {
        let tile = MapTile {
            modifiers: TileModifiers::ROAD | TileModifiers::RIVER,
            ..MapTile::default()
        };
        assert!(tile.modifiers.contains(TileModifiers::ROAD));
        assert!(!tile.modifiers.intersects(TileModifiers::RAIL | TileModifiers::IRRIGATION));
        assert_eq!(tile.owner, None);
    }
}

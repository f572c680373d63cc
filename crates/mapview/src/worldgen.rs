//! Seeded random worlds for the viewer.

use std::collections::VecDeque;

use anyhow::{Context, Result};
use model::{Direction, MapLayout};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use render_protocol::{
    CityInfo, PlayerId, ResourceId, TerrainId, TerrainSet, TileDebugInfo, TileModifiers, UnitInfo,
    WorldView,
};
use session::MapSession;

use crate::config::MapConfig;

const LAND_TERRAINS: [&str; 8] = [
    "desert",
    "tundra",
    "plains",
    "grassland",
    "swamp",
    "forest",
    "hills",
    "mountains",
];
const RIVERS: u32 = 6;
const RIVER_LENGTH: u32 = 12;
const RESOURCE_KINDS: u16 = 6;
const UNIT_KINDS: u8 = 4;

/// Builds a world over [`TerrainSet::standard`]. The same config always
/// yields the same world.
pub fn generate(config: &MapConfig) -> Result<MapSession> {
    let layout = MapLayout::new(config.width, config.height).context("map size")?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut world = MapSession::new(layout, TerrainSet::standard());
    let land = land_ids(world.terrain_set())?;

    grow_land(&mut world, &mut rng, &land, config.land_percent)?;
    let land_tiles = land_tiles(&world);
    if land_tiles.is_empty() {
        tracing::warn!("generated world has no land");
        return Ok(world);
    }

    carve_rivers(&mut world, &mut rng, &land_tiles);
    scatter_resources(&mut world, &mut rng, &land_tiles);
    for player in 0..config.players {
        settle(&mut world, &mut rng, &land_tiles, PlayerId(player));
    }
    annotate(&mut world);

    tracing::info!(
        width = layout.width(),
        height = layout.height(),
        land = land_tiles.len(),
        seed = config.seed,
        "generated world"
    );
    Ok(world)
}

fn land_ids(terrain_set: &TerrainSet) -> Result<Vec<TerrainId>> {
    LAND_TERRAINS
        .iter()
        .map(|name| {
            terrain_set
                .id(name)
                .with_context(|| format!("terrain set lacks {name}"))
        })
        .collect()
}

fn random_tile(layout: MapLayout, rng: &mut StdRng) -> (u32, u32) {
    (
        rng.gen_range(0..layout.width()),
        rng.gen_range(0..layout.height()),
    )
}

/// Random walks from a few seeds, each step painting one tile. Terrain bands
/// follow distance from the equator with some jitter.
fn grow_land(
    world: &mut MapSession,
    rng: &mut StdRng,
    land: &[TerrainId],
    land_percent: u8,
) -> Result<()> {
    let layout = world.layout();
    let target = layout.tile_count() * land_percent.min(100) as usize / 100;
    let mut painted = 0;
    let mut walkers: Vec<(u32, u32)> = (0..4).map(|_| random_tile(layout, rng)).collect();
    let ocean = world.tile(0, 0).terrain;
    let mut steps = 0;
    while painted < target && steps < layout.tile_count() * 40 {
        steps += 1;
        let walker = rng.gen_range(0..walkers.len());
        let (x, y) = walkers[walker];
        if world.tile(x, y).terrain == ocean {
            let latitude = (y as i64 * 2 - layout.height() as i64).unsigned_abs() as usize * 4
                / layout.height().max(1) as usize;
            let band = (latitude + rng.gen_range(0..land.len() - 3)).min(land.len() - 1);
            world.set_terrain(x, y, land[band])?;
            painted += 1;
        }
        let (dx, dy) = Direction::CARDINALS[rng.gen_range(0..Direction::CARDINALS.len())].offset();
        walkers[walker] = layout.wrap(x as i64 + dx, y as i64 + dy);
    }
    Ok(())
}

fn land_tiles(world: &MapSession) -> Vec<(u32, u32)> {
    let layout = world.layout();
    let terrain_set = world.terrain_set();
    (0..layout.tile_count())
        .map(|index| layout.position(index))
        .filter(|&(x, y)| !terrain_set.is_ocean(world.tile(x, y).terrain))
        .collect()
}

fn carve_rivers(world: &mut MapSession, rng: &mut StdRng, land_tiles: &[(u32, u32)]) {
    let layout = world.layout();
    for _ in 0..RIVERS {
        let Some(&(mut x, mut y)) = land_tiles.choose(rng) else {
            return;
        };
        for _ in 0..RIVER_LENGTH {
            if world.terrain_set().is_ocean(world.tile(x, y).terrain) {
                break;
            }
            world.add_modifiers(x, y, TileModifiers::RIVER);
            let direction = Direction::CARDINALS[rng.gen_range(0..Direction::CARDINALS.len())];
            (x, y) = layout.neighbor(x, y, direction);
        }
    }
}

fn scatter_resources(world: &mut MapSession, rng: &mut StdRng, land_tiles: &[(u32, u32)]) {
    for &(x, y) in land_tiles {
        if rng.gen_ratio(1, 12) {
            world.set_resource(x, y, Some(ResourceId(rng.gen_range(0..RESOURCE_KINDS))));
        }
    }
}

/// A city with roads to its neighbours, irrigation, owned territory and a
/// couple of units, visible to its owner.
fn settle(world: &mut MapSession, rng: &mut StdRng, land_tiles: &[(u32, u32)], player: PlayerId) {
    let layout = world.layout();
    let free: Vec<(u32, u32)> = land_tiles
        .iter()
        .copied()
        .filter(|&(x, y)| world.city_at(x, y).is_none())
        .collect();
    let Some(&(x, y)) = free.choose(rng) else {
        return;
    };
    world.found_city(
        x,
        y,
        CityInfo {
            owner: player,
            size: rng.gen_range(1..20),
        },
    );
    world.add_modifiers(x, y, TileModifiers::ROAD);
    for direction in Direction::ALL {
        let (nx, ny) = layout.neighbor(x, y, direction);
        if world.terrain_set().is_ocean(world.tile(nx, ny).terrain) {
            continue;
        }
        if rng.gen_bool(0.4) {
            world.add_modifiers(nx, ny, TileModifiers::ROAD);
        }
        if rng.gen_bool(0.3) {
            world.add_modifiers(nx, ny, TileModifiers::IRRIGATION);
        }
    }
    for row in -2..=2i64 {
        for column in -2..=2i64 {
            let (tx, ty) = layout.wrap(x as i64 + column, y as i64 + row);
            if world.tile(tx, ty).owner.is_none() {
                world.set_owner(tx, ty, Some(player));
            }
        }
    }
    for kind in 0..rng.gen_range(1..=3u8) {
        let (dx, dy) = Direction::ALL[rng.gen_range(0..Direction::ALL.len())].offset();
        let (ux, uy) = layout.wrap(x as i64 + dx, y as i64 + dy);
        world.spawn_unit(
            ux,
            uy,
            UnitInfo {
                owner: player,
                kind: kind % UNIT_KINDS,
            },
        );
    }
    world.uncover(player, x as i64, y as i64, 4);
}

/// Continent ids by flood fill, distance to the nearest ocean by breadth-first
/// search, and yields derived from the terrain rank.
fn annotate(world: &mut MapSession) {
    let layout = world.layout();
    let count = layout.tile_count();
    let is_land: Vec<bool> = (0..count)
        .map(|index| {
            let (x, y) = layout.position(index);
            !world.terrain_set().is_ocean(world.tile(x, y).terrain)
        })
        .collect();

    let mut continent: Vec<Option<u16>> = vec![None; count];
    let mut next_continent = 0u16;
    for start in 0..count {
        if !is_land[start] || continent[start].is_some() {
            continue;
        }
        let mut queue = VecDeque::from([start]);
        continent[start] = Some(next_continent);
        while let Some(index) = queue.pop_front() {
            let (x, y) = layout.position(index);
            for direction in Direction::CARDINALS {
                let (nx, ny) = layout.neighbor(x, y, direction);
                let neighbor = layout.index(nx, ny);
                if is_land[neighbor] && continent[neighbor].is_none() {
                    continent[neighbor] = Some(next_continent);
                    queue.push_back(neighbor);
                }
            }
        }
        next_continent = next_continent.saturating_add(1);
    }

    let mut distance: Vec<Option<u16>> = is_land
        .iter()
        .map(|land| if *land { None } else { Some(0) })
        .collect();
    let mut queue: VecDeque<usize> = (0..count).filter(|index| !is_land[*index]).collect();
    while let Some(index) = queue.pop_front() {
        let (x, y) = layout.position(index);
        let next = distance[index].map_or(0, |value| value.saturating_add(1));
        for direction in Direction::CARDINALS {
            let (nx, ny) = layout.neighbor(x, y, direction);
            let neighbor = layout.index(nx, ny);
            if distance[neighbor].is_none() {
                distance[neighbor] = Some(next);
                queue.push_back(neighbor);
            }
        }
    }

    for index in 0..count {
        let (x, y) = layout.position(index);
        let rank = world.terrain_set().dominance(world.tile(x, y).terrain);
        let info = TileDebugInfo {
            continent: continent[index],
            distance_to_edge: distance[index],
            yields: Some([
                (9 - rank.min(8)) / 3,
                rank / 3,
                u8::from(world.tile(x, y).modifiers.contains(TileModifiers::RIVER)),
            ]),
        };
        world.set_debug_info(x, y, info);
    }
}

/// Small random changes exercising incremental invalidation between frames.
pub fn random_edit(world: &mut MapSession, rng: &mut StdRng) -> Result<()> {
    let layout = world.layout();
    let (x, y) = random_tile(layout, rng);
    match rng.gen_range(0..4) {
        0 => {
            let terrain = TerrainId(rng.gen_range(0..world.terrain_set().len()) as u8);
            world.set_terrain(x, y, terrain)?;
        }
        1 => world.add_modifiers(x, y, TileModifiers::ROAD),
        2 => {
            let owner = rng.gen_bool(0.5).then(|| PlayerId(rng.gen_range(0..4)));
            world.set_owner(x, y, owner);
        }
        _ => {
            world.uncover(PlayerId(0), x as i64, y as i64, 1);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(seed: u64) -> MapConfig {
        MapConfig {
            width: 24,
            height: 16,
            seed,
            ..MapConfig::default()
        }
    }

    fn terrain_grid(world: &MapSession) -> Vec<TerrainId> {
        let layout = world.layout();
        (0..layout.tile_count())
            .map(|index| {
                let (x, y) = layout.position(index);
                world.tile(x, y).terrain
            })
            .collect()
    }

    #[test]
    fn same_seed_same_world() {
        let first = generate(&config(7)).unwrap();
        let second = generate(&config(7)).unwrap();
        assert_eq!(terrain_grid(&first), terrain_grid(&second));
        assert_eq!(first.revision(), second.revision());
    }

    #[test]
    fn worlds_mix_land_and_ocean() {
        let world = generate(&config(3)).unwrap();
        let land = land_tiles(&world).len();
        assert!(land > 0);
        assert!(land < world.layout().tile_count());
    }

    #[test]
    fn every_player_founds_a_visible_city() {
        let world = generate(&config(11)).unwrap();
        let layout = world.layout();
        for player in 0..MapConfig::default().players {
            let city = (0..layout.tile_count())
                .map(|index| layout.position(index))
                .find(|&(x, y)| world.city_at(x, y).is_some_and(|city| city.owner == PlayerId(player)));
            let (x, y) = city.expect("player has a city");
            assert!(world.is_uncovered(PlayerId(player), x, y));
        }
    }

    #[test]
    fn ocean_tiles_sit_at_distance_zero() {
        let world = generate(&config(5)).unwrap();
        let layout = world.layout();
        for index in 0..layout.tile_count() {
            let (x, y) = layout.position(index);
            let info = world.debug_info(x, y).unwrap();
            if world.terrain_set().is_ocean(world.tile(x, y).terrain) {
                assert_eq!(info.distance_to_edge, Some(0));
                assert_eq!(info.continent, None);
            } else {
                assert!(info.distance_to_edge.unwrap() >= 1);
                assert!(info.continent.is_some());
            }
        }
    }

    #[test]
    fn zero_sized_map_is_an_error() {
        let config = MapConfig {
            width: 0,
            ..MapConfig::default()
        };
        assert!(generate(&config).is_err());
    }
}

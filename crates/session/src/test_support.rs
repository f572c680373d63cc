use std::cell::RefCell;
use std::rc::Rc;

use model::MapLayout;
use render_protocol::{HookId, MapEvent, SessionHooks, TerrainSet, WorldView};

use crate::MapSession;

/// Standard terrain name for a map-row character.
///
/// `.` ocean, `d` desert, `t` tundra, `p` plains, `g` grassland, `s` swamp,
/// `f` forest, `h` hills, `m` mountains.
pub fn terrain_name(ch: char) -> Option<&'static str> {
    Some(match ch {
        '.' => "ocean",
        'd' => "desert",
        't' => "tundra",
        'p' => "plains",
        'g' => "grassland",
        's' => "swamp",
        'f' => "forest",
        'h' => "hills",
        'm' => "mountains",
        _ => return None,
    })
}

/// Session over [`TerrainSet::standard`] with one string per map row.
pub fn session_from_rows(rows: &[&str]) -> MapSession {
    let height = rows.len() as u32;
    let width = rows.first().map_or(0, |row| row.chars().count()) as u32;
    let layout = MapLayout::new(width, height).expect("rows describe a non-empty map");
    let mut session = MapSession::new(layout, TerrainSet::standard());
    for (y, row) in rows.iter().enumerate() {
        assert_eq!(row.chars().count() as u32, width, "row {y} has a different width");
        for (x, ch) in row.chars().enumerate() {
            let name = terrain_name(ch).unwrap_or_else(|| panic!("unknown terrain char {ch:?}"));
            let terrain = session
                .terrain_set()
                .id(name)
                .expect("standard set has every mapped terrain");
            session
                .set_terrain(x as u32, y as u32, terrain)
                .expect("standard terrain is valid");
        }
    }
    session
}

/// Subscribes a hook that appends every event to the returned log.
pub fn record_events(session: &mut impl SessionHooks) -> (HookId, Rc<RefCell<Vec<MapEvent>>>) {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    let id = session.subscribe(Box::new(move |event: &MapEvent| sink.borrow_mut().push(*event)));
    (id, events)
}

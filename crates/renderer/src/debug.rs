//! Numeric labels: city sizes and the debug overlay.

use model::TILE_SIZE;
use render_protocol::{DebugLevel, WorldView};
use smallvec::SmallVec;
use tiles::procedural::{GLYPH_HEIGHT, GLYPH_WIDTH, glyph_index};
use tiles::{Rgba8, SheetId};

use crate::renderer_frame::{Painter, VisibleTile};

const STROKE_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Lines of glyph text drawn with a dark outline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Label {
    lines: SmallVec<[String; 3]>,
}

impl Label {
    pub(crate) fn city_size(size: u16) -> Self {
        let mut label = Self::default();
        label.push(size.to_string());
        label
    }

    fn push(&mut self, line: String) {
        if !line.is_empty() {
            self.lines.push(line);
        }
    }

    fn height(&self) -> i64 {
        self.lines.len() as i64 * GLYPH_HEIGHT as i64
    }

    /// Lines are centred on the tile and stacked bottom up from its lower edge.
    pub(crate) fn draw(&self, painter: &mut Painter<'_>, glyphs: Option<SheetId>, x: i64, y: i64) {
        self.draw_at(painter, glyphs, x, y + TILE_SIZE as i64 - self.height());
    }

    fn draw_at(&self, painter: &mut Painter<'_>, glyphs: Option<SheetId>, x: i64, top: i64) {
        for (dx, dy) in STROKE_OFFSETS {
            self.pass(painter, glyphs, x + dx, top + dy, Rgba8::BLACK);
        }
        self.pass(painter, glyphs, x, top, Rgba8::WHITE);
    }

    fn pass(&self, painter: &mut Painter<'_>, glyphs: Option<SheetId>, x: i64, top: i64, color: Rgba8) {
        for (row, line) in self.lines.iter().enumerate() {
            let width = line.chars().count() as i64 * GLYPH_WIDTH as i64;
            let mut pen_x = x + (TILE_SIZE as i64 - width) / 2;
            let pen_y = top + row as i64 * GLYPH_HEIGHT as i64;
            for ch in line.chars() {
                if let Some(column) = glyph_index(ch) {
                    painter.tinted(glyphs, column, pen_x, pen_y, color);
                }
                pen_x += GLYPH_WIDTH as i64;
            }
        }
    }
}

/// Overlay text for one tile, or an empty label when the level shows nothing.
pub(crate) fn tile_label(world: &dyn WorldView, x: u32, y: u32, level: DebugLevel) -> Label {
    let mut label = Label::default();
    if level == DebugLevel::Off {
        return label;
    }
    let terrain = world.tile(x, y).terrain;
    let set = world.terrain_set();
    let dominance = if (terrain.0 as usize) < set.len() {
        set.dominance(terrain).to_string()
    } else {
        "-".to_owned()
    };
    label.push(format!("{}:{dominance}", terrain.0));

    if level < DebugLevel::Analysis {
        return label;
    }
    let Some(info) = world.debug_info(x, y) else {
        return label;
    };
    let place = [info.continent, info.distance_to_edge]
        .iter()
        .flatten()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join("-");
    label.push(place);
    if let Some([food, shields, trade]) = info.yields {
        label.push(format!("{food}/{shields}/{trade}"));
    }
    label
}

pub(crate) fn draw_tile_debug(
    painter: &mut Painter<'_>,
    glyphs: Option<SheetId>,
    world: &dyn WorldView,
    visible: VisibleTile,
    level: DebugLevel,
) {
    let label = tile_label(world, visible.x, visible.y, level);
    label.draw_at(painter, glyphs, visible.screen_x, visible.screen_y);
}

//! Placeholder artwork generated at startup so the renderer can run without
//! external image files. Every generator is deterministic.

use model::{Direction, EdgeMask, TEXTURE_SPAN, TILE_SIZE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use transitions::TransitionTable;

use crate::{AtlasError, PixelRect, Rgba8, Surface, SpriteSheet};

/// Characters available in [`glyph_sheet`], in column order.
pub const GLYPHS: &str = "0123456789-/:";
pub const GLYPH_WIDTH: u32 = 8;
pub const GLYPH_HEIGHT: u32 = 12;
const GLYPH_SCALE: u32 = 2;

// 3x5 bitmaps, one byte per row, bit 2 is the left column.
const GLYPH_ROWS: [[u8; 5]; 13] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b001, 0b001, 0b001],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
    [0b000, 0b000, 0b111, 0b000, 0b000],
    [0b001, 0b001, 0b010, 0b100, 0b100],
    [0b000, 0b010, 0b000, 0b010, 0b000],
];

const BLEND_BAND: u32 = 10;
const FOG_BAND: u32 = 8;
const COAST_BAND: u32 = 6;
const RIVER_COLOR: Rgba8 = Rgba8::opaque(48, 96, 200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconShape {
    Disc,
    Diamond,
    Square,
    Stripes,
}

/// Tileable 256x256 texture: `base` with smooth low-frequency variation and
/// per-pixel grain.
pub fn noise_texture(seed: u64, base: Rgba8) -> Result<SpriteSheet, AtlasError> {
    const LATTICE: u32 = 16;
    const STEP: u32 = TEXTURE_SPAN / LATTICE;

    let mut rng = StdRng::seed_from_u64(seed);
    let lattice: Vec<i32> = (0..LATTICE * LATTICE)
        .map(|_| rng.gen_range(-18..=18))
        .collect();
    let at = |x: u32, y: u32| lattice[((y % LATTICE) * LATTICE + x % LATTICE) as usize];

    let mut surface = Surface::new(TEXTURE_SPAN, TEXTURE_SPAN);
    for y in 0..TEXTURE_SPAN {
        let (cell_y, frac_y) = (y / STEP, (y % STEP) as i32);
        for x in 0..TEXTURE_SPAN {
            let (cell_x, frac_x) = (x / STEP, (x % STEP) as i32);
            let step = STEP as i32;
            let top = at(cell_x, cell_y) * (step - frac_x) + at(cell_x + 1, cell_y) * frac_x;
            let bottom =
                at(cell_x, cell_y + 1) * (step - frac_x) + at(cell_x + 1, cell_y + 1) * frac_x;
            let smooth = (top * (step - frac_y) + bottom * frac_y) / (step * step);
            let shift = smooth + rng.gen_range(-6..=6);
            let channel = |value: u8| (value as i32 + shift).clamp(0, 255) as u8;
            surface.set_pixel(
                x,
                y,
                Rgba8::opaque(channel(base.r), channel(base.g), channel(base.b)),
            );
        }
    }
    SpriteSheet::texture(surface)
}

/// Alpha of an edge ramp at `(x, y)` inside a tile: strongest on every side
/// and corner set in `mask`, fading to zero `band` pixels inward.
fn edge_ramp(mask: EdgeMask, x: u32, y: u32, band: u32) -> u8 {
    let last = TILE_SIZE - 1;
    let ramp = |distance: u32| {
        if distance >= band {
            0
        } else {
            (255 * (band - distance) / band) as u8
        }
    };
    let mut alpha = 0u8;
    for direction in Direction::ALL {
        if !mask.has(direction) {
            continue;
        }
        let distance = match direction {
            Direction::Top => y,
            Direction::Right => last - x,
            Direction::Bottom => last - y,
            Direction::Left => x,
            Direction::TopRight => y.max(last - x),
            Direction::BottomRight => (last - y).max(last - x),
            Direction::BottomLeft => (last - y).max(x),
            Direction::TopLeft => y.max(x),
        };
        alpha = alpha.max(ramp(distance));
    }
    alpha
}

fn mask_sheet(
    masks: &[EdgeMask],
    mut paint: impl FnMut(EdgeMask, u32, u32) -> Rgba8,
) -> Result<SpriteSheet, AtlasError> {
    let columns = masks.len().max(1) as u32;
    let mut surface = Surface::new(columns * TILE_SIZE, TILE_SIZE);
    for (column, mask) in masks.iter().enumerate() {
        let origin = column as u32 * TILE_SIZE;
        for y in 0..TILE_SIZE {
            for x in 0..TILE_SIZE {
                surface.set_pixel(origin + x, y, paint(*mask, x, y));
            }
        }
    }
    Ok(SpriteSheet::tiles(surface)?.with_bounds_index())
}

/// Alpha cutouts for dominance transitions, one column per canonical mask.
pub fn blend_mask_sheet(table: &TransitionTable) -> Result<SpriteSheet, AtlasError> {
    mask_sheet(table.canonical_masks(), |mask, x, y| {
        Rgba8::WHITE.with_alpha(edge_ramp(mask, x, y, BLEND_BAND))
    })
}

/// Darkening toward neighbours the viewer has not uncovered.
pub fn fog_edge_sheet(table: &TransitionTable) -> Result<SpriteSheet, AtlasError> {
    mask_sheet(table.canonical_masks(), |mask, x, y| {
        let alpha = edge_ramp(mask, x, y, FOG_BAND) as u32 * 220 / 255;
        Rgba8::BLACK.with_alpha(alpha as u8)
    })
}

/// Border lines drawn in white and tinted with the owner's colour.
///
/// Mask bits mark neighbours with the same owner, so lines go on the clear
/// sides and on clear corners whose adjacent sides are both set.
pub fn territory_sheet(table: &TransitionTable) -> Result<SpriteSheet, AtlasError> {
    const WIDTH: u32 = 2;
    let last = TILE_SIZE - 1;
    mask_sheet(table.canonical_masks(), move |mask, x, y| {
        let mut on = false;
        for direction in Direction::ALL {
            if mask.has(direction) {
                continue;
            }
            on |= match direction.adjacent_sides() {
                None => match direction {
                    Direction::Top => y < WIDTH,
                    Direction::Right => x > last - WIDTH,
                    Direction::Bottom => y > last - WIDTH,
                    _ => x < WIDTH,
                },
                Some((a, b)) if mask.has(a) && mask.has(b) => {
                    let near_x = if matches!(direction, Direction::TopLeft | Direction::BottomLeft)
                    {
                        x < WIDTH
                    } else {
                        x > last - WIDTH
                    };
                    let near_y = if matches!(direction, Direction::TopLeft | Direction::TopRight) {
                        y < WIDTH
                    } else {
                        y > last - WIDTH
                    };
                    near_x && near_y
                }
                Some(_) => false,
            };
        }
        if on { Rgba8::WHITE } else { Rgba8::TRANSPARENT }
    })
}

/// Opaque sprite drawn over tiles the viewer has never uncovered.
pub fn full_fog_sheet() -> Result<SpriteSheet, AtlasError> {
    SpriteSheet::tiles(Surface::filled(TILE_SIZE, TILE_SIZE, Rgba8::opaque(12, 12, 16)))
}

fn cardinal_masks() -> Vec<EdgeMask> {
    (0..16u8).map(EdgeMask::from_bits_retain).collect()
}

fn stroke(surface: &mut Surface, origin_x: u32, from: (i32, i32), to: (i32, i32), width: u32, color: Rgba8) {
    const STEPS: i32 = 64;
    let half = width as i32 / 2;
    for step in 0..=STEPS {
        let x = from.0 + (to.0 - from.0) * step / STEPS;
        let y = from.1 + (to.1 - from.1) * step / STEPS;
        let left = (x - half).clamp(0, TILE_SIZE as i32 - 1) as u32;
        let top = (y - half).clamp(0, TILE_SIZE as i32 - 1) as u32;
        let right = (x - half + width as i32).clamp(0, TILE_SIZE as i32) as u32;
        let bottom = (y - half + width as i32).clamp(0, TILE_SIZE as i32) as u32;
        surface.fill_rect(
            PixelRect::new(origin_x + left, top, right - left, bottom - top),
            color,
        );
    }
}

fn center() -> (i32, i32) {
    (TILE_SIZE as i32 / 2, TILE_SIZE as i32 / 2)
}

fn towards(direction: Direction, reach: i32) -> (i32, i32) {
    let (dx, dy) = direction.offset();
    let (cx, cy) = center();
    (cx + dx as i32 * reach, cy + dy as i32 * reach)
}

/// River channels keyed by the 4-bit cardinal river mask.
pub fn river_sheet() -> Result<SpriteSheet, AtlasError> {
    let masks = cardinal_masks();
    let mut surface = Surface::new(masks.len() as u32 * TILE_SIZE, TILE_SIZE);
    for (column, mask) in masks.iter().enumerate() {
        let origin = column as u32 * TILE_SIZE;
        for direction in Direction::CARDINALS {
            if mask.has(direction) {
                stroke(&mut surface, origin, center(), towards(direction, 16), 6, RIVER_COLOR);
            }
        }
        // a source or a lake when nothing connects
        let pool = if mask.is_empty() { 10 } else { 6 };
        let (cx, cy) = center();
        stroke(&mut surface, origin, (cx, cy), (cx, cy), pool, RIVER_COLOR);
    }
    SpriteSheet::tiles(surface)
}

/// Foam along the sides of a river tile that touch ocean, keyed by the
/// 4-bit cardinal ocean mask.
pub fn river_coast_sheet() -> Result<SpriteSheet, AtlasError> {
    mask_sheet(&cardinal_masks(), |mask, x, y| {
        let alpha = edge_ramp(mask, x, y, COAST_BAND) as u32 * 3 / 4;
        Rgba8::opaque(222, 232, 240).with_alpha(alpha as u8)
    })
}

/// Fans of fresh water entering an ocean tile, keyed by the river mask.
pub fn river_mouth_sheet() -> Result<SpriteSheet, AtlasError> {
    let masks = cardinal_masks();
    let mut surface = Surface::new(masks.len() as u32 * TILE_SIZE, TILE_SIZE);
    let color = RIVER_COLOR.with_alpha(170);
    for (column, mask) in masks.iter().enumerate() {
        let origin = column as u32 * TILE_SIZE;
        for direction in Direction::CARDINALS {
            if mask.has(direction) {
                stroke(&mut surface, origin, towards(direction, 16), towards(direction, 4), 10, color);
            }
        }
    }
    SpriteSheet::tiles(surface)
}

/// Nine columns: one segment per [`Direction`] in bit order, then a hub.
pub fn road_sheet(color: Rgba8, width: u32) -> Result<SpriteSheet, AtlasError> {
    let mut surface = Surface::new(9 * TILE_SIZE, TILE_SIZE);
    for direction in Direction::ALL {
        let origin = direction.index() as u32 * TILE_SIZE;
        stroke(&mut surface, origin, center(), towards(direction, 16), width, color);
    }
    let (cx, cy) = center();
    stroke(&mut surface, 8 * TILE_SIZE, (cx, cy), (cx, cy), width + 2, color);
    SpriteSheet::tiles(surface)
}

/// One icon per colour, drawn with a dark outline.
pub fn icon_sheet(colors: &[Rgba8], shape: IconShape) -> Result<SpriteSheet, AtlasError> {
    let columns = colors.len().max(1) as u32;
    let mut surface = Surface::new(columns * TILE_SIZE, TILE_SIZE);
    let outline = Rgba8::opaque(20, 20, 20);
    for (column, color) in colors.iter().enumerate() {
        let origin = column as u32 * TILE_SIZE;
        for y in 0..TILE_SIZE {
            for x in 0..TILE_SIZE {
                let dx = x as i32 - 15;
                let dy = y as i32 - 15;
                let (inside, edge) = match shape {
                    IconShape::Disc => {
                        let d = dx * dx + dy * dy;
                        (d <= 64, d <= 81)
                    }
                    IconShape::Diamond => {
                        let d = dx.abs() + dy.abs();
                        (d <= 9, d <= 11)
                    }
                    IconShape::Square => {
                        let d = dx.abs().max(dy.abs());
                        (d <= 8, d <= 10)
                    }
                    IconShape::Stripes => {
                        let stripe = (x + y) % 8 < 2 && x % 16 != 0;
                        (stripe, stripe)
                    }
                };
                let pixel = if inside {
                    *color
                } else if edge {
                    outline
                } else {
                    continue;
                };
                surface.set_pixel(origin + x, y, pixel);
            }
        }
    }
    SpriteSheet::tiles(surface)
}

pub fn glyph_index(ch: char) -> Option<u32> {
    GLYPHS.chars().position(|glyph| glyph == ch).map(|index| index as u32)
}

/// White glyphs on transparent cells, in [`GLYPHS`] order.
pub fn glyph_sheet() -> Result<SpriteSheet, AtlasError> {
    let mut surface = Surface::new(GLYPH_ROWS.len() as u32 * GLYPH_WIDTH, GLYPH_HEIGHT);
    for (column, rows) in GLYPH_ROWS.iter().enumerate() {
        let origin = column as u32 * GLYPH_WIDTH + 1;
        for (row, bits) in rows.iter().enumerate() {
            for bit in 0..3u32 {
                if bits & (0b100 >> bit) == 0 {
                    continue;
                }
                surface.fill_rect(
                    PixelRect::new(
                        origin + bit * GLYPH_SCALE,
                        1 + row as u32 * GLYPH_SCALE,
                        GLYPH_SCALE,
                        GLYPH_SCALE,
                    ),
                    Rgba8::WHITE,
                );
            }
        }
    }
    SpriteSheet::new(surface, GLYPH_WIDTH, GLYPH_HEIGHT)
}

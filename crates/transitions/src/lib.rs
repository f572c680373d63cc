//! Canonical transition tables.
//!
//! Blend artwork for a tile edge depends on which of the 8 neighbours
//! differ, but many of the 256 raw masks look identical: a corner neighbour is
//! invisible once an adjacent side already paints over that corner. A
//! [`TransitionTable`] folds the raw masks into the ordered list of visually
//! distinct ones (`canonical`) plus a 256-entry lookup, so a blend-mask sheet
//! needs one column per canonical mask instead of 256.

use model::EdgeMask;

/// Corners that stay visible under terrain-dominance blending, indexed by the
/// side bits of the mask. A corner counts only when both adjacent sides are clear.
const TERRAIN_EFFECTIVE_CORNERS: [u8; 16] = [
    0xF0, 0x60, 0xC0, 0x40, 0x90, 0x00, 0x80, 0x00, //
    0x30, 0x20, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00,
];

/// Corners that stay visible under territory blending. Bits mark neighbours
/// with the same owner, so a corner counts only when both adjacent sides are set.
const TERRITORY_EFFECTIVE_CORNERS: [u8; 16] = [
    0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x20, 0x30, //
    0x00, 0x80, 0x00, 0x90, 0x40, 0xC0, 0x60, 0xF0,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendStyle {
    TerrainDominance,
    Territory,
}

impl BlendStyle {
    pub fn effective_corners(self) -> [EdgeMask; 16] {
        let table = match self {
            BlendStyle::TerrainDominance => &TERRAIN_EFFECTIVE_CORNERS,
            BlendStyle::Territory => &TERRITORY_EFFECTIVE_CORNERS,
        };
        table.map(EdgeMask::from_bits_retain)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    canonical: Box<[EdgeMask]>,
    lut: [u8; 256],
}

impl TransitionTable {
    /// Builds the table from the visible-corner mask of each side combination.
    pub fn build(effective_corners: &[EdgeMask; 16]) -> Self {
        let mut canonical: Vec<EdgeMask> = Vec::new();
        let mut slots: [Option<u8>; 256] = [None; 256];

        for sides in 0..16u8 {
            let effective = effective_corners[sides as usize].corner_bits();
            for corners in (0..=0xF0u8).step_by(16) {
                let raw = sides | corners;
                let alt = sides | (corners & effective);
                let slot = match slots[alt as usize] {
                    Some(slot) => slot,
                    None => {
                        let slot = u8::try_from(canonical.len())
                            .expect("at most 256 canonical masks exist");
                        canonical.push(EdgeMask::from_bits_retain(alt));
                        slots[alt as usize] = Some(slot);
                        slot
                    }
                };
                slots[raw as usize] = Some(slot);
            }
        }

        let mut lut = [0u8; 256];
        for (raw, slot) in slots.iter().enumerate() {
            lut[raw] = slot.expect("every raw mask is visited once per side combination");
        }

        Self {
            canonical: canonical.into_boxed_slice(),
            lut,
        }
    }

    pub fn for_style(style: BlendStyle) -> Self {
        Self::build(&style.effective_corners())
    }

    pub fn canonical_index(&self, raw: EdgeMask) -> u8 {
        self.lut[raw.bits() as usize]
    }

    pub fn canonical_mask(&self, index: u8) -> EdgeMask {
        self.canonical[index as usize]
    }

    pub fn canonical_masks(&self) -> &[EdgeMask] {
        &self.canonical
    }

    /// Number of distinct blend sprites, i.e. sheet columns.
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    pub fn lut(&self) -> &[u8; 256] {
        &self.lut
    }
}

/// Both tables, built once at startup and shared by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTables {
    pub terrain: TransitionTable,
    pub territory: TransitionTable,
}

impl TransitionTables {
    pub fn new() -> Self {
        let tables = Self {
            terrain: TransitionTable::for_style(BlendStyle::TerrainDominance),
            territory: TransitionTable::for_style(BlendStyle::Territory),
        };
        tracing::debug!(
            terrain = tables.terrain.len(),
            territory = tables.territory.len(),
            "built transition tables"
        );
        tables
    }

    pub fn get(&self, style: BlendStyle) -> &TransitionTable {
        match style {
            BlendStyle::TerrainDominance => &self.terrain,
            BlendStyle::Territory => &self.territory,
        }
    }
}

impl Default for TransitionTables {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::Direction;

    fn corners_where(sides: u8, keep: impl Fn(bool, bool) -> bool) -> u8 {
        let sides = EdgeMask::from_bits_retain(sides);
        let mut corners = 0;
        for corner in Direction::CORNERS {
            let (a, b) = corner.adjacent_sides().unwrap();
            if keep(sides.has(a), sides.has(b)) {
                corners |= corner.mask().bits();
            }
        }
        corners
    }

    #[test]
    fn effective_corner_constants_follow_adjacency_rules() {
        for sides in 0..16u8 {
            assert_eq!(
                TERRAIN_EFFECTIVE_CORNERS[sides as usize],
                corners_where(sides, |a, b| !a && !b),
                "terrain sides {sides:#06b}"
            );
            assert_eq!(
                TERRITORY_EFFECTIVE_CORNERS[sides as usize],
                corners_where(sides, |a, b| a && b),
                "territory sides {sides:#06b}"
            );
        }
    }

    #[test]
    fn masks_with_equal_visible_corners_share_an_index() {
        for style in [BlendStyle::TerrainDominance, BlendStyle::Territory] {
            let effective = style.effective_corners();
            let table = TransitionTable::for_style(style);
            for r1 in 0..=255u8 {
                let m1 = EdgeMask::from_bits_retain(r1);
                let visible = effective[m1.side_bits() as usize].corner_bits();
                for r2 in 0..=255u8 {
                    let m2 = EdgeMask::from_bits_retain(r2);
                    let same_look = m1.side_bits() == m2.side_bits()
                        && m1.corner_bits() & visible == m2.corner_bits() & visible;
                    let same_index = table.canonical_index(m1) == table.canonical_index(m2);
                    assert_eq!(same_look, same_index, "{style:?} {r1:#04x} vs {r2:#04x}");
                }
            }
        }
    }

    #[test]
    fn table_size_counts_visible_corner_subsets() {
        for style in [BlendStyle::TerrainDominance, BlendStyle::Territory] {
            let expected: usize = style
                .effective_corners()
                .iter()
                .map(|corners| 1usize << corners.corner_bits().count_ones())
                .sum();
            let table = TransitionTable::for_style(style);
            assert_eq!(table.len(), expected);
            assert_eq!(table.len(), 47);
        }
    }

    #[test]
    fn canonical_masks_map_to_themselves() {
        let tables = TransitionTables::new();
        for style in [BlendStyle::TerrainDominance, BlendStyle::Territory] {
            let table = tables.get(style);
            for (index, mask) in table.canonical_masks().iter().enumerate() {
                assert_eq!(table.canonical_index(*mask) as usize, index);
            }
            assert_eq!(table.canonical_mask(0), EdgeMask::empty());
        }
    }

    #[test]
    fn side_only_table_collapses_to_sixteen() {
        let table = TransitionTable::build(&[EdgeMask::empty(); 16]);
        assert_eq!(table.len(), 16);
        for raw in 0..=255u8 {
            let mask = EdgeMask::from_bits_retain(raw);
            assert_eq!(table.canonical_mask(table.canonical_index(mask)).bits(), raw & 0x0F);
        }
    }

    #[test]
    fn diagonal_under_a_side_is_redundant_for_terrain() {
        let table = TransitionTable::for_style(BlendStyle::TerrainDominance);
        assert_eq!(
            table.canonical_index(EdgeMask::TOP),
            table.canonical_index(EdgeMask::TOP | EdgeMask::TOP_RIGHT | EdgeMask::TOP_LEFT)
        );
        assert_ne!(
            table.canonical_index(EdgeMask::TOP),
            table.canonical_index(EdgeMask::TOP | EdgeMask::BOTTOM_LEFT)
        );
    }

    #[test]
    fn territory_inner_corner_needs_both_sides() {
        let table = TransitionTable::for_style(BlendStyle::Territory);
        let inner = EdgeMask::TOP | EdgeMask::RIGHT;
        assert_ne!(
            table.canonical_index(inner),
            table.canonical_index(inner | EdgeMask::TOP_RIGHT)
        );
        assert_eq!(
            table.canonical_index(EdgeMask::TOP),
            table.canonical_index(EdgeMask::TOP | EdgeMask::TOP_RIGHT)
        );
        assert_eq!(
            table.canonical_mask(table.canonical_index(EdgeMask::FULL)),
            EdgeMask::FULL
        );
    }

    #[test]
    fn building_is_deterministic() {
        assert_eq!(
            TransitionTable::for_style(BlendStyle::Territory),
            TransitionTable::for_style(BlendStyle::Territory)
        );
    }
}

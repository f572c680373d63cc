use static_assertions::assert_eq_size;

use crate::EdgeMask;

const ROAD_SHIFT: u16 = 0;
const RAIL_SHIFT: u16 = 8;
const LANE_MASK: u16 = 0xFF;

/// Road and rail neighbour masks sharing one integer.
///
/// | rail (8) | road (8) |
/// 15       8 7        0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct RoadMask(u16);

impl RoadMask {
    pub const EMPTY: Self = Self(0);

    pub const fn new(road: EdgeMask, rail: EdgeMask) -> Self {
        Self(((road.bits() as u16) << ROAD_SHIFT) | ((rail.bits() as u16) << RAIL_SHIFT))
    }

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    pub const fn road(self) -> EdgeMask {
        EdgeMask::from_bits_retain(((self.0 >> ROAD_SHIFT) & LANE_MASK) as u8)
    }

    pub const fn rail(self) -> EdgeMask {
        EdgeMask::from_bits_retain(((self.0 >> RAIL_SHIFT) & LANE_MASK) as u8)
    }

    pub fn set_road(&mut self, road: EdgeMask) {
        self.0 = (self.0 & !(LANE_MASK << ROAD_SHIFT)) | ((road.bits() as u16) << ROAD_SHIFT);
    }

    pub fn set_rail(&mut self, rail: EdgeMask) {
        self.0 = (self.0 & !(LANE_MASK << RAIL_SHIFT)) | ((rail.bits() as u16) << RAIL_SHIFT);
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

const RIVER_SHIFT: u8 = 0;
const OCEAN_SHIFT: u8 = 4;
const NIBBLE_MASK: u8 = 0x0F;

/// Cardinal river and ocean neighbour masks sharing one byte.
///
/// | ocean (4) | river (4) |
/// 7         4 3         0
///
/// Only the side bits of an [`EdgeMask`] survive packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct RiverMask(u8);

impl RiverMask {
    pub const EMPTY: Self = Self(0);

    pub const fn new(river: EdgeMask, ocean: EdgeMask) -> Self {
        Self((river.side_bits() << RIVER_SHIFT) | (ocean.side_bits() << OCEAN_SHIFT))
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn river(self) -> EdgeMask {
        EdgeMask::from_bits_retain(self.river_index())
    }

    pub const fn ocean(self) -> EdgeMask {
        EdgeMask::from_bits_retain(self.ocean_index())
    }

    /// Column of the river sprite, `0..16`.
    pub const fn river_index(self) -> u8 {
        (self.0 >> RIVER_SHIFT) & NIBBLE_MASK
    }

    /// Column of the coastal blend sprite, `0..16`.
    pub const fn ocean_index(self) -> u8 {
        (self.0 >> OCEAN_SHIFT) & NIBBLE_MASK
    }
}

/// Raw encoding of [`CoverMask::Hidden`], one past the 8-bit edge range.
pub const COVER_HIDDEN_RAW: u16 = 256;

/// Fog-of-war state of one tile for the viewing player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CoverMask {
    /// Uncovered, and so are all neighbours.
    #[default]
    Visible,
    /// Uncovered; bits mark the neighbours still covered.
    Partial(EdgeMask),
    /// Never uncovered. Nothing but the full fog sprite is drawn.
    Hidden,
}

impl CoverMask {
    pub fn from_covered_neighbors(covered: EdgeMask) -> Self {
        if covered.is_empty() {
            CoverMask::Visible
        } else {
            CoverMask::Partial(covered)
        }
    }

    /// `0` visible, `1..=255` partial edge mask, `256` hidden.
    pub const fn raw(self) -> u16 {
        match self {
            CoverMask::Visible => 0,
            CoverMask::Partial(mask) => mask.bits() as u16,
            CoverMask::Hidden => COVER_HIDDEN_RAW,
        }
    }

    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(CoverMask::Visible),
            1..=255 => Some(CoverMask::Partial(EdgeMask::from_bits_retain(raw as u8))),
            COVER_HIDDEN_RAW => Some(CoverMask::Hidden),
            _ => None,
        }
    }

    pub const fn is_hidden(self) -> bool {
        matches!(self, CoverMask::Hidden)
    }
}

assert_eq_size!(RoadMask, u16);
assert_eq_size!(RiverMask, u8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn road_and_rail_occupy_separate_bytes() {
        let mask = RoadMask::new(EdgeMask::TOP | EdgeMask::LEFT, EdgeMask::BOTTOM_RIGHT);
        assert_eq!(mask.raw(), 0x2009);
        assert_eq!(mask.road(), EdgeMask::TOP | EdgeMask::LEFT);
        assert_eq!(mask.rail(), EdgeMask::BOTTOM_RIGHT);
    }

    #[test]
    fn setters_leave_the_other_lane_untouched() {
        let mut mask = RoadMask::new(EdgeMask::FULL, EdgeMask::FULL);
        mask.set_road(EdgeMask::RIGHT);
        assert_eq!(mask.road(), EdgeMask::RIGHT);
        assert_eq!(mask.rail(), EdgeMask::FULL);

        mask.set_rail(EdgeMask::empty());
        assert_eq!(mask.rail(), EdgeMask::empty());
        assert_eq!(mask.road(), EdgeMask::RIGHT);
        assert_eq!(mask.raw(), 0x0002);
        assert!(!mask.is_empty());
    }

    #[test]
    fn river_mask_keeps_only_cardinal_bits() {
        let mask = RiverMask::new(EdgeMask::TOP | EdgeMask::TOP_LEFT, EdgeMask::LEFT);
        assert_eq!(mask.river(), EdgeMask::TOP);
        assert_eq!(mask.ocean(), EdgeMask::LEFT);
        assert_eq!(mask.river_index(), 1);
        assert_eq!(mask.ocean_index(), 8);
        assert_eq!(mask.raw(), 0x81);
    }

    #[test]
    fn cover_mask_raw_encoding_is_nine_valued() {
        assert_eq!(CoverMask::Visible.raw(), 0);
        assert_eq!(CoverMask::Hidden.raw(), 256);
        assert_eq!(
            CoverMask::Partial(EdgeMask::FULL).raw(),
            255,
            "partial mask stays inside the 8-bit range"
        );
        for raw in 0..=256u16 {
            let cover = CoverMask::from_raw(raw).expect("raw value in range");
            assert_eq!(cover.raw(), raw);
        }
        assert_eq!(CoverMask::from_raw(257), None);
    }

    #[test]
    fn no_covered_neighbors_means_visible() {
        assert_eq!(
            CoverMask::from_covered_neighbors(EdgeMask::empty()),
            CoverMask::Visible
        );
        assert_eq!(
            CoverMask::from_covered_neighbors(EdgeMask::TOP),
            CoverMask::Partial(EdgeMask::TOP)
        );
    }
}

use bitflags::bitflags;

bitflags! {
    /// One bit per neighbour of a tile.
    ///
    /// | TL | BL | BR | TR | L | B | R | T |
    /// 7    6    5    4    3   2   1   0
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EdgeMask: u8 {
        const TOP = 1 << 0;
        const RIGHT = 1 << 1;
        const BOTTOM = 1 << 2;
        const LEFT = 1 << 3;
        const TOP_RIGHT = 1 << 4;
        const BOTTOM_RIGHT = 1 << 5;
        const BOTTOM_LEFT = 1 << 6;
        const TOP_LEFT = 1 << 7;

        const SIDES = 0x0F;
        const CORNERS = 0xF0;
    }
}

impl EdgeMask {
    /// Every neighbour matches. For territory this means no visible boundary.
    pub const FULL: Self = Self::all();

    pub const fn side_bits(self) -> u8 {
        self.bits() & 0x0F
    }

    pub const fn corner_bits(self) -> u8 {
        self.bits() & 0xF0
    }

    pub fn from_neighbors(mut predicate: impl FnMut(Direction) -> bool) -> Self {
        let mut mask = Self::empty();
        for direction in Direction::ALL {
            if predicate(direction) {
                mask |= direction.mask();
            }
        }
        mask
    }

    pub fn has(self, direction: Direction) -> bool {
        self.contains(direction.mask())
    }

    /// Drops each corner whose two adjacent sides are also set.
    ///
    /// Road icons use this so a full junction draws four straight segments
    /// instead of eight overlapping ones.
    pub fn without_covered_corners(self) -> Self {
        let mut mask = self;
        for corner in Direction::CORNERS {
            let Some((a, b)) = corner.adjacent_sides() else {
                continue;
            };
            if self.has(a) && self.has(b) {
                mask.remove(corner.mask());
            }
        }
        mask
    }
}

/// Neighbour directions in [`EdgeMask`] bit order. `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Top,
    Right,
    Bottom,
    Left,
    TopRight,
    BottomRight,
    BottomLeft,
    TopLeft,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Top,
        Direction::Right,
        Direction::Bottom,
        Direction::Left,
        Direction::TopRight,
        Direction::BottomRight,
        Direction::BottomLeft,
        Direction::TopLeft,
    ];

    pub const CARDINALS: [Direction; 4] = [
        Direction::Top,
        Direction::Right,
        Direction::Bottom,
        Direction::Left,
    ];

    pub const CORNERS: [Direction; 4] = [
        Direction::TopRight,
        Direction::BottomRight,
        Direction::BottomLeft,
        Direction::TopLeft,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn mask(self) -> EdgeMask {
        EdgeMask::from_bits_retain(1 << self as u8)
    }

    pub const fn offset(self) -> (i64, i64) {
        match self {
            Direction::Top => (0, -1),
            Direction::Right => (1, 0),
            Direction::Bottom => (0, 1),
            Direction::Left => (-1, 0),
            Direction::TopRight => (1, -1),
            Direction::BottomRight => (1, 1),
            Direction::BottomLeft => (-1, 1),
            Direction::TopLeft => (-1, -1),
        }
    }

    /// The two sides that meet at a corner, `None` for sides.
    pub const fn adjacent_sides(self) -> Option<(Direction, Direction)> {
        match self {
            Direction::TopRight => Some((Direction::Top, Direction::Right)),
            Direction::BottomRight => Some((Direction::Bottom, Direction::Right)),
            Direction::BottomLeft => Some((Direction::Bottom, Direction::Left)),
            Direction::TopLeft => Some((Direction::Top, Direction::Left)),
            _ => None,
        }
    }
}

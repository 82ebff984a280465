//! Compact 8-bit neighbor masks
//!
//! A [`RuleWindow`] packed into one byte. Used for log messages and for
//! quickly comparing neighborhoods.

use crate::rule::RuleWindow;

/// Neighbor direction flags
pub mod neighbors {
    pub const N: u8 = 0b0000_0001;  // North
    pub const NE: u8 = 0b0000_0010; // Northeast (corner)
    pub const E: u8 = 0b0000_0100;  // East
    pub const SE: u8 = 0b0000_1000; // Southeast (corner)
    pub const S: u8 = 0b0001_0000;  // South
    pub const SW: u8 = 0b0010_0000; // Southwest (corner)
    pub const W: u8 = 0b0100_0000;  // West
    pub const NW: u8 = 0b1000_0000; // Northwest (corner)

    pub const ORTHOGONAL: u8 = N | E | S | W;
}

/// `(x, y, flag)` for every window cell except the center
const WINDOW_FLAGS: [(usize, usize, u8); 8] = [
    (1, 0, neighbors::N),
    (2, 0, neighbors::NE),
    (2, 1, neighbors::E),
    (2, 2, neighbors::SE),
    (1, 2, neighbors::S),
    (0, 2, neighbors::SW),
    (0, 1, neighbors::W),
    (0, 0, neighbors::NW),
];

/// Pack a neighbor window into a bitmask (center cell is ignored)
pub fn mask_from_window(window: &RuleWindow) -> u8 {
    WINDOW_FLAGS
        .iter()
        .filter(|(x, y, _)| window[*y][*x])
        .fold(0, |mask, (_, _, flag)| mask | flag)
}

/// Unpack a bitmask into a neighbor window with an empty center
pub fn window_from_mask(mask: u8) -> RuleWindow {
    let mut window = [[false; 3]; 3];
    for (x, y, flag) in WINDOW_FLAGS {
        window[y][x] = mask & flag != 0;
    }
    window
}

/// Drop corner flags whose two adjacent edges are not both set.
///
/// Two masks that differ only in such corners select the same blob tile.
pub fn optimize_mask(mask: u8) -> u8 {
    use neighbors::*;

    let mut result = mask;

    // NW corner requires N and W
    if (mask & (N | W)) != (N | W) {
        result &= !NW;
    }
    // NE corner requires N and E
    if (mask & (N | E)) != (N | E) {
        result &= !NE;
    }
    // SE corner requires S and E
    if (mask & (S | E)) != (S | E) {
        result &= !SE;
    }
    // SW corner requires S and W
    if (mask & (S | W)) != (S | W) {
        result &= !SW;
    }

    result
}

//! First-match rule resolution and depth classification

use serde::{Deserialize, Serialize};

use crate::mask::{mask_from_window, optimize_mask};
use crate::rule::{AtlasCoord, AutotileRule, RuleWindow};

/// Number of neighbor cells in a radius-1 window
pub const RADIUS_1_CELLS: usize = 8;
/// Number of neighbor cells in a radius-2 window
pub const RADIUS_2_CELLS: usize = 24;

/// Find the display of the first rule (in list order) matching `window`
pub fn find_display(rules: &[AutotileRule], window: &RuleWindow) -> Option<AtlasCoord> {
    rules
        .iter()
        .find(|rule| rule.matches(window))
        .map(AutotileRule::display)
}

/// Like [`find_display`], but falls back to [`AtlasCoord::ZERO`] with a warning
/// when nothing matches
pub fn resolve_display(group: &str, rules: &[AutotileRule], window: &RuleWindow) -> AtlasCoord {
    match find_display(rules, window) {
        Some(display) => display,
        None => {
            let mask = mask_from_window(window);
            tracing::warn!(
                group,
                mask = %format!("{:#010b}", mask),
                blob = %format!("{:#010b}", optimize_mask(mask)),
                rules = rules.len(),
                "no autotile rule matched, using default display"
            );
            AtlasCoord::ZERO
        }
    }
}

/// How far a tile sits from the border of its same-group region
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    /// At least one of the 8 surrounding cells is not the same group
    #[default]
    Border,
    /// All 8 surrounding cells are the same group, but not all 24 at radius 2
    Shallow,
    /// All 24 cells within radius 2 are the same group
    Deep,
}

impl Depth {
    /// Classify from same-group neighbor counts at radius 1 and radius 2
    pub fn classify(radius_1_count: usize, radius_2_count: usize) -> Self {
        if radius_2_count >= RADIUS_2_CELLS {
            Depth::Deep
        } else if radius_1_count >= RADIUS_1_CELLS {
            Depth::Shallow
        } else {
            Depth::Border
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::window_from_mask;

    fn rule(codes: [[u8; 3]; 3], x: u32, y: u32) -> AutotileRule {
        AutotileRule::from_codes(codes, AtlasCoord::new(x, y)).unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        let rules = vec![
            rule([[1, 1, 1], [1, 1, 1], [1, 1, 1]], 5, 5),
            rule([[2, 0, 2], [0, 1, 0], [2, 0, 2]], 0, 1),
        ];
        let window = [[false; 3]; 3];
        assert_eq!(find_display(&rules, &window), Some(AtlasCoord::new(5, 5)));
    }

    #[test]
    fn test_skips_mismatching_rules() {
        let rules = vec![
            rule([[3, 3, 3], [3, 1, 3], [3, 3, 3]], 0, 3),
            rule([[2, 0, 2], [0, 1, 0], [2, 0, 2]], 0, 1),
        ];
        let window = [[false; 3]; 3];
        assert_eq!(find_display(&rules, &window), Some(AtlasCoord::new(0, 1)));
    }

    #[test]
    fn test_no_match_falls_back() {
        let rules = vec![rule([[3, 3, 3], [3, 1, 3], [3, 3, 3]], 0, 3)];
        let window = window_from_mask(0b0000_0001);
        assert_eq!(find_display(&rules, &window), None);
        assert_eq!(resolve_display("wall", &rules, &window), AtlasCoord::ZERO);
    }

    #[test]
    fn test_matching_is_deterministic() {
        let rules = vec![
            rule([[2, 0, 2], [0, 1, 3], [2, 3, 3]], 1, 0),
            rule([[3, 3, 3], [3, 1, 3], [3, 3, 3]], 0, 3),
        ];
        let window = window_from_mask(0xFF);
        let first = resolve_display("wall", &rules, &window);
        for _ in 0..10 {
            assert_eq!(resolve_display("wall", &rules, &window), first);
        }
    }

    #[test]
    fn test_depth_classification() {
        assert_eq!(Depth::classify(3, 5), Depth::Border);
        assert_eq!(Depth::classify(8, 20), Depth::Shallow);
        assert_eq!(Depth::classify(8, 24), Depth::Deep);
        assert!(Depth::Deep > Depth::Shallow && Depth::Shallow > Depth::Border);
    }
}

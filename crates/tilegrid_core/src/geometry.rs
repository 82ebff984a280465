//! Grid coordinates, sizes and cardinal directions

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A cell position on the grid. Also used for grid-corner coordinates.
///
/// `y` grows downwards: `(0, 0)` is the top-left cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Move by a whole number of cells
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Move `amount` cells towards `direction`
    pub fn step(self, direction: Direction, amount: i32) -> Self {
        let (dx, dy) = direction.vector();
        self.offset(dx * amount, dy * amount)
    }
}

impl From<[i32; 2]> for Position {
    fn from([x, y]: [i32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Position> for [i32; 2] {
    fn from(position: Position) -> Self {
        [position.x, position.y]
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Grid dimensions in cells
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Check if a position lies inside `[0, width) x [0, height)`
    pub fn contains(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && (position.x as i64) < self.width as i64
            && (position.y as i64) < self.height as i64
    }

    /// Number of cells
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Row-major index of an in-bounds position
    pub(crate) fn index_of(&self, position: Position) -> Option<usize> {
        self.contains(position)
            .then(|| position.y as usize * self.width as usize + position.x as usize)
    }

    /// Clamp each component into `[min, max]`
    pub fn clamp(self, min: GridSize, max: GridSize) -> Self {
        Self::new(
            self.width.min(max.width).max(min.width),
            self.height.min(max.height).max(min.height),
        )
    }

    /// Check if each component lies within `[min, max]`
    pub fn within(&self, min: GridSize, max: GridSize) -> bool {
        (min.width..=max.width).contains(&self.width)
            && (min.height..=max.height).contains(&self.height)
    }

    /// The size after growing (`amount > 0`) or shrinking along a direction's axis.
    /// Returns `None` when the result would be negative.
    pub fn resized(self, direction: Direction, amount: i64) -> Option<Self> {
        let (dx, dy) = direction.vector();
        let width = self.width as i64 + dx.abs() as i64 * amount;
        let height = self.height as i64 + dy.abs() as i64 * amount;
        Some(Self::new(
            u32::try_from(width).ok()?,
            u32::try_from(height).ok()?,
        ))
    }

    /// Every position, row by row
    pub fn positions(&self) -> impl Iterator<Item = Position> {
        let (width, height) = (self.width as i32, self.height as i32);
        (0..height).flat_map(move |y| (0..width).map(move |x| Position::new(x, y)))
    }

    /// Positions within `retreat` cells of the selected edge(s), sorted and deduplicated
    pub fn edge_positions(&self, edge: Edge, retreat: u32) -> Vec<Position> {
        let (width, height) = (self.width as i32, self.height as i32);
        let depth_x = retreat.min(self.width) as i32;
        let depth_y = retreat.min(self.height) as i32;

        let mut positions = BTreeSet::new();
        for direction in Direction::ALL.into_iter().filter(|d| edge.includes(*d)) {
            positions.extend(self.positions().filter(|position| match direction {
                Direction::Left => position.x < depth_x,
                Direction::Right => position.x >= width - depth_x,
                Direction::Top => position.y < depth_y,
                Direction::Bottom => position.y >= height - depth_y,
            }));
        }
        positions.into_iter().collect()
    }
}

impl From<[u32; 2]> for GridSize {
    fn from([width, height]: [u32; 2]) -> Self {
        Self { width, height }
    }
}

impl From<GridSize> for [u32; 2] {
    fn from(size: GridSize) -> Self {
        [size.width, size.height]
    }
}

impl From<(u32, u32)> for GridSize {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Size of one tile in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct TileSize {
    pub width: u32,
    pub height: u32,
}

impl TileSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for TileSize {
    fn default() -> Self {
        Self::new(16, 16)
    }
}

impl From<[u32; 2]> for TileSize {
    fn from([width, height]: [u32; 2]) -> Self {
        Self { width, height }
    }
}

impl From<TileSize> for [u32; 2] {
    fn from(size: TileSize) -> Self {
        [size.width, size.height]
    }
}

/// One of the four grid edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Top,
    Bottom,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Top,
        Direction::Bottom,
    ];

    /// Unit vector, with `y` growing downwards
    pub const fn vector(self) -> (i32, i32) {
        match self {
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Top => (0, -1),
            Direction::Bottom => (0, 1),
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Top => Direction::Bottom,
            Direction::Bottom => Direction::Top,
        }
    }

    /// Top and left edges sit at coordinate 0; changing them shifts every cell
    pub const fn is_low_edge(self) -> bool {
        matches!(self, Direction::Left | Direction::Top)
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Top => "top",
            Direction::Bottom => "bottom",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Edge selector for edge-position queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Edge {
    #[default]
    All,
    Side(Direction),
}

impl Edge {
    pub fn includes(self, direction: Direction) -> bool {
        match self {
            Edge::All => true,
            Edge::Side(side) => side == direction,
        }
    }
}

impl From<Direction> for Edge {
    fn from(direction: Direction) -> Self {
        Edge::Side(direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_matches_bounds() {
        let size = GridSize::new(4, 3);
        for x in -2..6 {
            for y in -2..5 {
                let expected = (0..4).contains(&x) && (0..3).contains(&y);
                assert_eq!(size.contains(Position::new(x, y)), expected, "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_clamp_and_within() {
        let min = GridSize::new(5, 5);
        let max = GridSize::new(10, 8);
        assert_eq!(GridSize::new(2, 20).clamp(min, max), GridSize::new(5, 8));
        assert!(GridSize::new(5, 8).within(min, max));
        assert!(!GridSize::new(4, 8).within(min, max));
    }

    #[test]
    fn test_resized_along_axis() {
        let size = GridSize::new(5, 5);
        assert_eq!(size.resized(Direction::Left, 2), Some(GridSize::new(7, 5)));
        assert_eq!(size.resized(Direction::Bottom, -1), Some(GridSize::new(5, 4)));
        assert_eq!(size.resized(Direction::Top, -6), None);
    }

    #[test]
    fn test_positions_are_row_major() {
        let positions: Vec<_> = GridSize::new(2, 2).positions().collect();
        assert_eq!(
            positions,
            vec![
                Position::new(0, 0),
                Position::new(1, 0),
                Position::new(0, 1),
                Position::new(1, 1),
            ]
        );
    }

    #[test]
    fn test_edge_positions() {
        let size = GridSize::new(4, 3);
        let right = size.edge_positions(Edge::Side(Direction::Right), 1);
        assert_eq!(
            right,
            vec![Position::new(3, 0), Position::new(3, 1), Position::new(3, 2)]
        );

        // Corners are shared by two edges but listed once
        assert_eq!(size.edge_positions(Edge::All, 1).len(), 10);
        assert_eq!(size.edge_positions(Edge::Side(Direction::Top), 2).len(), 8);
        assert!(size.edge_positions(Edge::All, 0).is_empty());
        assert_eq!(size.edge_positions(Edge::All, 9).len(), size.area());
    }

    #[test]
    fn test_direction_helpers() {
        assert_eq!(Direction::Top.opposite(), Direction::Bottom);
        assert!(Direction::Left.is_low_edge());
        assert!(!Direction::Right.is_low_edge());
        assert_eq!(Position::new(1, 1).step(Direction::Top, 2), Position::new(1, -1));
        assert!(Edge::All.includes(Direction::Bottom));
        assert!(!Edge::from(Direction::Left).includes(Direction::Right));
    }

    #[test]
    fn test_position_serializes_as_pair() {
        let json = serde_json::to_string(&Position::new(2, -1)).unwrap();
        assert_eq!(json, "[2,-1]");
    }
}

//! Neighborhood queries shared by autotiling and border tracing

use tilegrid_autotile::RuleWindow;

use crate::element::{ElementId, GridElement};
use crate::error::GridError;
use crate::geometry::Position;
use crate::layer::GridLayer;

/// Which cells around the subject are visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Adjacency {
    /// Orthogonal cells only (radius 1)
    Four,
    /// The whole `(2r+1)^2` window minus the center
    #[default]
    Eight,
}

/// Occupant of a visited neighbor cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Neighbor<'a> {
    /// The cell lies outside the grid; reads as solid
    OutOfGrid,
    Element(ElementId, &'a GridElement),
}

impl<'a> Neighbor<'a> {
    pub fn element(&self) -> Option<&'a GridElement> {
        match self {
            Neighbor::OutOfGrid => None,
            Neighbor::Element(_, element) => Some(element),
        }
    }
}

/// A square grid of per-neighbor values, indexed by `neighbor - center + radius`.
///
/// The subject's own cell is the exact center.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborGrid<T> {
    radius: u32,
    cells: Vec<T>,
}

impl<T: Clone + Default> NeighborGrid<T> {
    fn new(radius: u32) -> Self {
        let side = (radius * 2 + 1) as usize;
        Self {
            radius,
            cells: vec![T::default(); side * side],
        }
    }
}

impl<T> NeighborGrid<T> {
    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Side length, `2 * radius + 1`
    pub fn side(&self) -> usize {
        (self.radius * 2 + 1) as usize
    }

    /// Value at grid offset `(x, y)`, both in `0..side`
    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        let side = self.side();
        (x < side && y < side).then(|| &self.cells[y * side + x])
    }

    /// Value for a neighbor at `delta` from the center
    pub fn at_delta(&self, dx: i32, dy: i32) -> Option<&T> {
        let r = self.radius as i32;
        if dx.abs() > r || dy.abs() > r {
            return None;
        }
        self.get((dx + r) as usize, (dy + r) as usize)
    }

    /// Rows from top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.cells.chunks(self.side())
    }

    fn set(&mut self, x: usize, y: usize, value: T) {
        let side = self.side();
        self.cells[y * side + x] = value;
    }
}

impl NeighborGrid<bool> {
    /// The 3x3 window around the center, as consumed by autotile rules
    pub fn to_rule_window(&self) -> RuleWindow {
        let mut window = [[false; 3]; 3];
        for (y, row) in window.iter_mut().enumerate() {
            for (x, cell) in row.iter_mut().enumerate() {
                *cell = self
                    .at_delta(x as i32 - 1, y as i32 - 1)
                    .copied()
                    .unwrap_or(false);
            }
        }
        window
    }

    pub fn count(&self) -> usize {
        self.cells.iter().filter(|cell| **cell).count()
    }
}

/// Stateless neighbor evaluation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NeighborProcessor {
    pub adjacency: Adjacency,
    /// Only count autotile neighbors with the subject's group; out-of-grid cells never count
    pub same_group: bool,
}

impl NeighborProcessor {
    pub fn new(adjacency: Adjacency, same_group: bool) -> Self {
        Self {
            adjacency,
            same_group,
        }
    }

    /// Eight-adjacency, same-group: the autotile neighborhood
    pub fn autotile() -> Self {
        Self::new(Adjacency::Eight, true)
    }

    /// Number of matching neighbors
    pub fn amount_of_neighbors(
        &self,
        layer: &GridLayer,
        subject: &GridElement,
        radius: u32,
    ) -> Result<usize, GridError> {
        let mut amount = 0;
        self.visit(layer, subject, radius, |_, _, _| amount += 1)?;
        Ok(amount)
    }

    /// Presence grid of matching neighbors
    pub fn neighbors_bool_grid(
        &self,
        layer: &GridLayer,
        subject: &GridElement,
        radius: u32,
    ) -> Result<NeighborGrid<bool>, GridError> {
        let mut grid = NeighborGrid::new(radius);
        self.visit(layer, subject, radius, |x, y, _| grid.set(x, y, true))?;
        Ok(grid)
    }

    /// Grid of matching neighbor occupants
    pub fn neighbors_of<'a>(
        &self,
        layer: &'a GridLayer,
        subject: &GridElement,
        radius: u32,
    ) -> Result<NeighborGrid<Option<Neighbor<'a>>>, GridError> {
        let side = (radius * 2 + 1) as usize;
        let mut grid = NeighborGrid {
            radius,
            cells: vec![None; side * side],
        };
        self.visit(layer, subject, radius, |x, y, neighbor| {
            grid.set(x, y, Some(neighbor))
        })?;
        Ok(grid)
    }

    /// Check whether a single adjacent cell matches; used for edge tests
    pub fn is_matching_neighbor(
        &self,
        layer: &GridLayer,
        subject: &GridElement,
        position: Position,
    ) -> Result<bool, GridError> {
        let size = layer.grid_size()?;
        if !size.contains(position) {
            return Ok(!self.same_group);
        }
        Ok(layer
            .entry_at(position)
            .is_some_and(|(_, element)| self.accepts(subject, element)))
    }

    fn accepts(&self, subject: &GridElement, neighbor: &GridElement) -> bool {
        if !self.same_group {
            return true;
        }
        match (subject.autotile_group(), neighbor.autotile_group()) {
            (Some(group), Some(other)) => group == other,
            _ => false,
        }
    }

    fn positions(&self, center: Position, radius: u32) -> Result<Vec<Position>, GridError> {
        match self.adjacency {
            Adjacency::Eight => {
                let r = radius as i32;
                Ok((-r..=r)
                    .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
                    .filter(|&(dx, dy)| (dx, dy) != (0, 0))
                    .map(|(dx, dy)| center.offset(dx, dy))
                    .collect())
            }
            Adjacency::Four if radius == 1 => Ok(vec![
                center.offset(1, 0),
                center.offset(0, -1),
                center.offset(-1, 0),
                center.offset(0, 1),
            ]),
            Adjacency::Four => Err(GridError::InvalidAdjacencyConfiguration(format!(
                "four-adjacency requires radius 1, got {radius}"
            ))),
        }
    }

    /// Shared traversal: calls `on_match` with the grid offset of every matching neighbor
    fn visit<'a>(
        &self,
        layer: &'a GridLayer,
        subject: &GridElement,
        radius: u32,
        mut on_match: impl FnMut(usize, usize, Neighbor<'a>),
    ) -> Result<(), GridError> {
        let center = subject.position;
        layer.check_position(center)?;
        let size = layer.grid_size()?;
        let r = radius as i32;

        for position in self.positions(center, radius)? {
            let x = (position.x - center.x + r) as usize;
            let y = (position.y - center.y + r) as usize;

            if !size.contains(position) {
                if !self.same_group {
                    on_match(x, y, Neighbor::OutOfGrid);
                }
                continue;
            }

            if let Some((id, element)) = layer.entry_at(position) {
                if self.accepts(subject, element) {
                    on_match(x, y, Neighbor::Element(id, element));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{GridMap, LayerPosition};
    use crate::config::GridMapConfig;
    use crate::geometry::GridSize;

    fn map_with_layer() -> GridMap {
        let mut map = GridMap::new(GridMapConfig {
            grid_size: GridSize::new(5, 5),
            ..Default::default()
        });
        map.add_layer(GridLayer::new("ground"), LayerPosition::End)
            .unwrap();
        map
    }

    fn place(map: &mut GridMap, element: GridElement) {
        map.add_element("ground", element).unwrap().unwrap();
    }

    #[test]
    fn test_out_of_grid_counts_as_occupied() {
        let mut map = map_with_layer();
        let corner = GridElement::marker("a", Position::new(0, 0));
        place(&mut map, corner.clone());
        let layer = map.get_layer("ground").unwrap();

        let any = NeighborProcessor::new(Adjacency::Eight, false);
        assert_eq!(any.amount_of_neighbors(layer, &corner, 1).unwrap(), 5);

        let grid = any.neighbors_of(layer, &corner, 1).unwrap();
        assert_eq!(grid.get(0, 0), Some(&Some(Neighbor::OutOfGrid)));
        assert_eq!(grid.get(2, 2), Some(&None));
    }

    #[test]
    fn test_same_group_filter() {
        let mut map = map_with_layer();
        let wall = GridElement::autotile("wall", Position::new(2, 2), "wall");
        place(&mut map, wall.clone());
        place(&mut map, GridElement::autotile("wall", Position::new(3, 2), "wall"));
        place(&mut map, GridElement::autotile("water", Position::new(1, 2), "water"));
        place(&mut map, GridElement::marker("spawn", Position::new(2, 1)));
        let layer = map.get_layer("ground").unwrap();

        let same = NeighborProcessor::autotile();
        assert_eq!(same.amount_of_neighbors(layer, &wall, 1).unwrap(), 1);

        let grid = same.neighbors_bool_grid(layer, &wall, 1).unwrap();
        assert_eq!(grid.at_delta(1, 0), Some(&true));
        assert_eq!(grid.at_delta(-1, 0), Some(&false));
        assert_eq!(grid.at_delta(0, -1), Some(&false));

        let any = NeighborProcessor::new(Adjacency::Eight, false);
        assert_eq!(any.amount_of_neighbors(layer, &wall, 1).unwrap(), 3);
    }

    #[test]
    fn test_same_group_ignores_out_of_grid() {
        let mut map = map_with_layer();
        let corner = GridElement::autotile("wall", Position::new(0, 0), "wall");
        place(&mut map, corner.clone());
        let layer = map.get_layer("ground").unwrap();

        let same = NeighborProcessor::autotile();
        assert_eq!(same.amount_of_neighbors(layer, &corner, 2).unwrap(), 0);
        assert!(!same
            .is_matching_neighbor(layer, &corner, Position::new(-1, 0))
            .unwrap());
    }

    #[test]
    fn test_four_adjacency_requires_radius_one() {
        let mut map = map_with_layer();
        let wall = GridElement::autotile("wall", Position::new(2, 2), "wall");
        place(&mut map, wall.clone());
        place(&mut map, GridElement::autotile("wall", Position::new(3, 3), "wall"));
        place(&mut map, GridElement::autotile("wall", Position::new(2, 3), "wall"));
        let layer = map.get_layer("ground").unwrap();

        let four = NeighborProcessor::new(Adjacency::Four, true);
        assert_eq!(four.amount_of_neighbors(layer, &wall, 1).unwrap(), 1);
        assert!(matches!(
            four.amount_of_neighbors(layer, &wall, 2),
            Err(GridError::InvalidAdjacencyConfiguration(_))
        ));
    }

    #[test]
    fn test_center_offset_and_window() {
        let mut map = map_with_layer();
        let wall = GridElement::autotile("wall", Position::new(2, 2), "wall");
        place(&mut map, wall.clone());
        place(&mut map, GridElement::autotile("wall", Position::new(0, 0), "wall"));
        place(&mut map, GridElement::autotile("wall", Position::new(2, 1), "wall"));
        let layer = map.get_layer("ground").unwrap();

        let grid = NeighborProcessor::autotile()
            .neighbors_bool_grid(layer, &wall, 2)
            .unwrap();
        assert_eq!(grid.side(), 5);
        assert_eq!(grid.get(0, 0), Some(&true));
        assert_eq!(grid.get(2, 1), Some(&true));
        assert_eq!(grid.get(2, 2), Some(&false));
        assert_eq!(grid.count(), 2);

        let window = grid.to_rule_window();
        assert_eq!(window, [[false, true, false], [false; 3], [false; 3]]);
    }

    #[test]
    fn test_subject_out_of_bounds() {
        let map = map_with_layer();
        let layer = map.get_layer("ground").unwrap();
        let outside = GridElement::marker("a", Position::new(9, 9));
        assert!(matches!(
            NeighborProcessor::default().amount_of_neighbors(layer, &outside, 1),
            Err(GridError::PositionOutOfBounds { .. })
        ));
    }
}

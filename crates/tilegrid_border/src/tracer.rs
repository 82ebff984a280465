//! Incremental border tracing
//!
//! The tracer keeps a graph of axis-aligned lines running between grid
//! corners. Every line separates cells of the traced group from cells that
//! are empty, hold another group, or lie outside the grid. Each placed or
//! removed tile only touches the nodes along its four edges:
//!
//! - an edge that became interior is carved out of the line spanning it
//!   (`split`)
//! - an edge that became a border is linked in, extending or merging the
//!   collinear lines already ending at its corners (`process_border`)

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tilegrid_core::{
    Adjacency, Channel, ElementCreated, ElementRemoved, GridElement, GridError, GridLayer, GridMap,
    GridResized, NeighborProcessor, Position, RemovalCause,
};

/// Line direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Handle to a line in a tracer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(u64);

/// An axis-aligned boundary line between two grid corners; `start < end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Line {
    pub start: Position,
    pub end: Position,
    pub orientation: Orientation,
}

impl Line {
    fn new(a: Position, b: Position, orientation: Orientation) -> Self {
        let (start, end) = order(a, b);
        Self {
            start,
            end,
            orientation,
        }
    }

    /// Length in cells
    pub fn length(&self) -> i32 {
        (self.end.x - self.start.x) + (self.end.y - self.start.y)
    }

    /// Every grid corner the line passes through, start and end included
    pub fn corners(&self) -> impl Iterator<Item = Position> {
        let (start, end) = (self.start, self.end);
        (start.x..=end.x).flat_map(move |x| (start.y..=end.y).map(move |y| Position::new(x, y)))
    }

    /// Smallest line covering both
    fn span(&self, other: &Line) -> Line {
        Line {
            start: Position::new(self.start.x.min(other.start.x), self.start.y.min(other.start.y)),
            end: Position::new(self.end.x.max(other.end.x), self.end.y.max(other.end.y)),
            orientation: self.orientation,
        }
    }
}

fn order(a: Position, b: Position) -> (Position, Position) {
    (
        Position::new(a.x.min(b.x), a.y.min(b.y)),
        Position::new(a.x.max(b.x), a.y.max(b.y)),
    )
}

/// A grid corner with at most one incident line per orientation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Node {
    pub horizontal: Option<LineId>,
    pub vertical: Option<LineId>,
}

impl Node {
    pub fn line(&self, orientation: Orientation) -> Option<LineId> {
        match orientation {
            Orientation::Horizontal => self.horizontal,
            Orientation::Vertical => self.vertical,
        }
    }

    fn slot(&mut self, orientation: Orientation) -> &mut Option<LineId> {
        match orientation {
            Orientation::Horizontal => &mut self.horizontal,
            Orientation::Vertical => &mut self.vertical,
        }
    }

    fn is_empty(&self) -> bool {
        self.horizontal.is_none() && self.vertical.is_none()
    }
}

/// Sent after each traced tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileTraced {
    pub position: Position,
    /// False when the tile was removed
    pub placed: bool,
}

/// Sent whenever the line set may have changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinesChanged {
    pub line_count: usize,
}

/// Maintains the boundary lines of one autotile group on one layer
#[derive(Debug)]
pub struct BorderTracer {
    layer: String,
    group: String,
    processor: NeighborProcessor,
    nodes: HashMap<Position, Node>,
    lines: HashMap<LineId, Line>,
    next_line: u64,
    pub tile_traced: Channel<BorderTracer, TileTraced>,
    pub lines_changed: Channel<BorderTracer, LinesChanged>,
}

impl BorderTracer {
    /// A detached tracer; feed it with [`trace_tile`](Self::trace_tile) or use [`attach`](Self::attach)
    pub fn new(layer: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            group: group.into(),
            processor: NeighborProcessor::new(Adjacency::Four, true),
            nodes: HashMap::new(),
            lines: HashMap::new(),
            next_line: 0,
            tile_traced: Channel::new(),
            lines_changed: Channel::new(),
        }
    }

    /// Create a tracer for `group` on `layer`, trace the tiles already there
    /// and keep it updated through the layer's events.
    ///
    /// The layer only holds weak references; dropping the returned handle
    /// stops tracing.
    pub fn attach(map: &mut GridMap, layer: &str, group: &str) -> Result<Rc<RefCell<Self>>, GridError> {
        let tracer = Rc::new(RefCell::new(Self::new(layer, group)));
        let grid_layer = map.get_layer_mut(layer)?;
        tracer.borrow_mut().rebuild(grid_layer)?;

        let weak = Rc::downgrade(&tracer);
        grid_layer
            .events
            .element_created
            .subscribe(move |layer, event: &ElementCreated| {
                with_tracer(&weak, |tracer| {
                    match layer.element(event.id) {
                        Some(element) => tracer.on_tile(layer, element, true),
                        None => Ok(()),
                    }
                })
            });

        let weak = Rc::downgrade(&tracer);
        grid_layer
            .events
            .element_removed
            .subscribe(move |layer, event: &ElementRemoved| {
                if event.cause == RemovalCause::Resize {
                    return;
                }
                with_tracer(&weak, |tracer| tracer.on_tile(layer, &event.element, false))
            });

        let weak = Rc::downgrade(&tracer);
        grid_layer
            .events
            .grid_resized
            .subscribe(move |layer, event: &GridResized| {
                tracing::debug!(
                    direction = %event.direction,
                    amount = event.amount,
                    "grid resized, rebuilding border"
                );
                with_tracer(&weak, |tracer| tracer.rebuild(layer))
            });

        Ok(tracer)
    }

    pub fn layer(&self) -> &str {
        &self.layer
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn lines(&self) -> impl Iterator<Item = (LineId, &Line)> + '_ {
        self.lines.iter().map(|(id, line)| (*id, line))
    }

    pub fn line(&self, id: LineId) -> Option<&Line> {
        self.lines.get(&id)
    }

    /// Lines ordered by orientation, then start, then end
    pub fn sorted_lines(&self) -> Vec<Line> {
        let mut lines: Vec<Line> = self.lines.values().copied().collect();
        lines.sort_by_key(|line| {
            (
                line.orientation == Orientation::Vertical,
                line.start,
                line.end,
            )
        });
        lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn node(&self, position: Position) -> Option<&Node> {
        self.nodes.get(&position)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (Position, &Node)> + '_ {
        self.nodes.iter().map(|(position, node)| (*position, node))
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.lines.clear();
    }

    /// Retrace every tile of the group from scratch
    pub fn rebuild(&mut self, layer: &GridLayer) -> Result<(), GridError> {
        self.clear();
        let tiles: Vec<&GridElement> = layer
            .elements()
            .map(|(_, element)| element)
            .filter(|element| self.traces(element))
            .collect();
        for element in tiles {
            self.trace_edges(layer, element, true)?;
        }
        self.notify_lines_changed();
        Ok(())
    }

    fn traces(&self, element: &GridElement) -> bool {
        element.autotile_group() == Some(self.group.as_str())
    }

    fn on_tile(&mut self, layer: &GridLayer, element: &GridElement, placed: bool) -> Result<(), GridError> {
        if layer.name() != self.layer || !self.traces(element) {
            return Ok(());
        }
        self.trace_tile(layer, element, placed)
    }

    /// Update the lines around a tile that was just placed on, or removed from, `layer`
    pub fn trace_tile(&mut self, layer: &GridLayer, element: &GridElement, placed: bool) -> Result<(), GridError> {
        self.trace_edges(layer, element, placed)?;

        let traced = TileTraced {
            position: element.position,
            placed,
        };
        let mut channel = std::mem::take(&mut self.tile_traced);
        channel.emit(self, &traced);
        self.tile_traced = channel;

        self.notify_lines_changed();
        Ok(())
    }

    fn trace_edges(&mut self, layer: &GridLayer, element: &GridElement, placed: bool) -> Result<(), GridError> {
        let Position { x, y } = element.position;
        let edges = [
            (
                Position::new(x + 1, y),
                Position::new(x + 1, y),
                Position::new(x + 1, y + 1),
                Orientation::Vertical,
            ),
            (
                Position::new(x, y - 1),
                Position::new(x, y),
                Position::new(x + 1, y),
                Orientation::Horizontal,
            ),
            (
                Position::new(x - 1, y),
                Position::new(x, y),
                Position::new(x, y + 1),
                Orientation::Vertical,
            ),
            (
                Position::new(x, y + 1),
                Position::new(x, y + 1),
                Position::new(x + 1, y + 1),
                Orientation::Horizontal,
            ),
        ];

        for (across, a, b, orientation) in edges {
            let occupied = self.processor.is_matching_neighbor(layer, element, across)?;
            // Placing next to a tile hides the edge; removing next to one exposes it
            if occupied == placed {
                self.split(a, b, orientation);
            } else {
                self.process_border(a, b, orientation);
            }
        }
        Ok(())
    }

    /// Link the edge `a`-`b` into the border
    fn process_border(&mut self, a: Position, b: Position, orientation: Orientation) {
        let (a, b) = order(a, b);
        let line_a = self.nodes.get(&a).and_then(|node| node.line(orientation));
        let line_b = self.nodes.get(&b).and_then(|node| node.line(orientation));
        let edge = Line::new(a, b, orientation);

        match (line_a, line_b) {
            (Some(first), Some(second)) if first == second => {}
            (Some(first), Some(second)) => {
                tracing::trace!(?a, ?b, ?orientation, "merging lines");
                let merged = self.remove_line(first).span(&self.remove_line(second)).span(&edge);
                self.add_line(merged);
            }
            (Some(existing), None) | (None, Some(existing)) => {
                tracing::trace!(?a, ?b, ?orientation, "extending line");
                let extended = self.remove_line(existing).span(&edge);
                self.add_line(extended);
            }
            (None, None) => {
                tracing::trace!(?a, ?b, ?orientation, "new line");
                self.add_line(edge);
            }
        }
    }

    /// Carve the edge `a`-`b` out of the line spanning it
    fn split(&mut self, a: Position, b: Position, orientation: Orientation) {
        let (a, b) = order(a, b);
        let line_a = self.nodes.get(&a).and_then(|node| node.line(orientation));
        let line_b = self.nodes.get(&b).and_then(|node| node.line(orientation));

        match (line_a, line_b) {
            (Some(first), Some(second)) if first == second => {
                tracing::trace!(?a, ?b, ?orientation, "splitting line");
                let line = self.remove_line(first);
                self.add_line(Line::new(line.start, a, orientation));
                self.add_line(Line::new(b, line.end, orientation));
            }
            _ => {
                tracing::trace!(?a, ?b, ?orientation, "no line spans the edge, nothing to split");
            }
        }
    }

    /// Store a line and reference it from every corner it passes; zero-length lines are dropped
    fn add_line(&mut self, line: Line) -> Option<LineId> {
        if line.length() == 0 {
            return None;
        }
        let id = LineId(self.next_line);
        self.next_line += 1;
        for corner in line.corners() {
            *self.nodes.entry(corner).or_default().slot(line.orientation) = Some(id);
        }
        self.lines.insert(id, line);
        Some(id)
    }

    /// Drop a line, clearing its node references and pruning empty nodes.
    ///
    /// Callers only pass ids read from nodes, which always refer to live lines.
    fn remove_line(&mut self, id: LineId) -> Line {
        let Some(line) = self.lines.remove(&id) else {
            tracing::warn!(?id, "node referenced a missing line");
            return Line::new(Position::default(), Position::default(), Orientation::Horizontal);
        };
        for corner in line.corners() {
            if let Some(node) = self.nodes.get_mut(&corner) {
                let slot = node.slot(line.orientation);
                if *slot == Some(id) {
                    *slot = None;
                }
                if node.is_empty() {
                    self.nodes.remove(&corner);
                }
            }
        }
        line
    }

    fn notify_lines_changed(&mut self) {
        let event = LinesChanged {
            line_count: self.lines.len(),
        };
        let mut channel = std::mem::take(&mut self.lines_changed);
        channel.emit(self, &event);
        self.lines_changed = channel;
    }

    /// Check the graph invariants: positive lengths, reciprocal node references,
    /// no overlapping collinear lines and no empty nodes
    pub fn is_consistent(&self) -> bool {
        for (id, line) in &self.lines {
            if line.length() <= 0 || line.start > line.end {
                return false;
            }
            let axis_aligned = match line.orientation {
                Orientation::Horizontal => line.start.y == line.end.y,
                Orientation::Vertical => line.start.x == line.end.x,
            };
            if !axis_aligned {
                return false;
            }
            // Every corner must point back at the line, which also rules out overlaps
            if !line.corners().all(|corner| {
                self.nodes
                    .get(&corner)
                    .is_some_and(|node| node.line(line.orientation) == Some(*id))
            }) {
                return false;
            }
        }

        self.nodes.iter().all(|(position, node)| {
            !node.is_empty()
                && [Orientation::Horizontal, Orientation::Vertical]
                    .into_iter()
                    .all(|orientation| match node.line(orientation) {
                        Some(id) => self
                            .lines
                            .get(&id)
                            .is_some_and(|line| line.corners().any(|corner| corner == *position)),
                        None => true,
                    })
        })
    }
}

fn with_tracer(
    weak: &Weak<RefCell<BorderTracer>>,
    update: impl FnOnce(&mut BorderTracer) -> Result<(), GridError>,
) {
    let Some(tracer) = weak.upgrade() else {
        return;
    };
    let Ok(mut tracer) = tracer.try_borrow_mut() else {
        tracing::warn!("border tracer is busy, skipping update");
        return;
    };
    if let Err(error) = update(&mut tracer) {
        tracing::warn!(%error, layer = tracer.layer(), "border tracing failed");
    }
}

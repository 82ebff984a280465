//! Grid and tilemap layers
//!
//! A layer is a sparse 2-D array of elements. Element records live in a
//! generational arena; cells hold [`ElementId`] handles. Tilemap layers also
//! own autotile rule tables and re-format affected tiles after every
//! structural change.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::collections::HashMap;

use tilegrid_autotile::{resolve_display, AtlasCoord, AutotileRule, Depth, RuleTable};

use crate::element::{ElementId, ElementKind, GridElement, LayerId};
use crate::error::GridError;
use crate::events::{
    Channel, ElementCreated, ElementRemoved, GridResized, RemovalCause, TileFormatted,
};
use crate::geometry::{Direction, Edge, GridSize, Position};
use crate::neighbors::{Adjacency, NeighborProcessor};

/// Radius of the neighborhood whose autotile displays depend on a cell
const FORMAT_RADIUS: u32 = 2;

/// Per-layer event channels
#[derive(Debug, Default)]
pub struct LayerEvents {
    pub element_created: Channel<GridLayer, ElementCreated>,
    /// Every removal, whatever the cause
    pub element_removed: Channel<GridLayer, ElementRemoved>,
    /// Removals requested through `remove_element` / `remove_element_at` only
    pub element_directly_removed: Channel<GridLayer, ElementRemoved>,
    pub tile_formatted: Channel<GridLayer, TileFormatted>,
    pub grid_resized: Channel<GridLayer, GridResized>,
}

/// The type of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerType {
    Grid,
    Tilemap,
}

impl LayerType {
    /// Type tag used by persisted records
    pub fn type_tag(self) -> &'static str {
        match self {
            LayerType::Grid => "GridLayer",
            LayerType::Tilemap => "TilemapLayer",
        }
    }
}

/// Kind-specific layer data
#[derive(Debug, Clone)]
pub enum LayerData {
    /// Plain element storage
    Grid,
    /// Tileset-backed layer with autotile formatting
    Tilemap(TilemapData),
}

#[derive(Debug, Clone)]
pub struct TilemapData {
    /// Tileset image path
    pub tileset: String,
    /// Rules for groups without an override
    pub default_rules: RuleTable,
    /// Per-group overrides
    pub autotile_rules: HashMap<String, RuleTable>,
    /// When false, insertions and removals do not re-format neighbors
    pub auto_format: bool,
}

impl TilemapData {
    pub fn new(tileset: impl Into<String>, default_rules: RuleTable) -> Self {
        Self {
            tileset: tileset.into(),
            default_rules,
            autotile_rules: HashMap::new(),
            auto_format: true,
        }
    }

    /// The rule table used by `group`
    pub fn rules_for(&self, group: &str) -> RuleTable {
        self.autotile_rules
            .get(group)
            .unwrap_or(&self.default_rules)
            .clone()
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    element: Option<GridElement>,
}

/// Backing storage, created when the layer joins a map
#[derive(Debug)]
struct Grid {
    size: GridSize,
    cells: Vec<Option<ElementId>>,
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Grid {
    fn new(size: GridSize) -> Self {
        Self {
            size,
            cells: vec![None; size.area()],
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    fn id_at(&self, position: Position) -> Option<ElementId> {
        self.cells[self.size.index_of(position)?]
    }

    fn get(&self, id: ElementId) -> Option<&GridElement> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.element.as_ref()
    }

    fn get_mut(&mut self, id: ElementId) -> Option<&mut GridElement> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.element.as_mut()
    }

    /// Store an element and point its cell at it
    fn install(&mut self, element: GridElement) -> Option<ElementId> {
        let cell = self.size.index_of(element.position)?;
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.element = Some(element);
                ElementId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    element: Some(element),
                });
                ElementId {
                    index,
                    generation: 0,
                }
            }
        };
        self.cells[cell] = Some(id);
        Some(id)
    }

    /// Take an element out and clear its cell
    fn release(&mut self, id: ElementId) -> Option<GridElement> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let element = slot.element.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);

        if let Some(cell) = self.size.index_of(element.position) {
            if self.cells[cell] == Some(id) {
                self.cells[cell] = None;
            }
        }
        Some(element)
    }

    fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.cells.iter().filter_map(|cell| *cell)
    }
}

/// A named layer of elements
#[derive(Debug)]
pub struct GridLayer {
    name: String,
    pub(crate) id: Option<LayerId>,
    grid: Option<Grid>,
    pub(crate) concurrent: Vec<String>,
    pub events: LayerEvents,
    pub data: LayerData,
    rng: SmallRng,
}

impl GridLayer {
    /// Create a plain grid layer
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_data(name, LayerData::Grid)
    }

    /// Create a tilemap layer using `default_rules` for every autotile group
    pub fn tilemap(
        name: impl Into<String>,
        tileset: impl Into<String>,
        default_rules: RuleTable,
    ) -> Self {
        Self::with_data(
            name,
            LayerData::Tilemap(TilemapData::new(tileset, default_rules)),
        )
    }

    pub fn with_data(name: impl Into<String>, data: LayerData) -> Self {
        Self {
            name: name.into(),
            id: None,
            grid: None,
            concurrent: Vec::new(),
            events: LayerEvents::default(),
            data,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set once the layer joins a map
    pub fn id(&self) -> Option<LayerId> {
        self.id
    }

    pub fn layer_type(&self) -> LayerType {
        match &self.data {
            LayerData::Grid => LayerType::Grid,
            LayerData::Tilemap(_) => LayerType::Tilemap,
        }
    }

    pub fn is_tilemap(&self) -> bool {
        self.tilemap_data().is_some()
    }

    pub fn tilemap_data(&self) -> Option<&TilemapData> {
        match &self.data {
            LayerData::Tilemap(data) => Some(data),
            LayerData::Grid => None,
        }
    }

    /// Tileset path, for tilemap layers
    pub fn tileset(&self) -> Option<&str> {
        self.tilemap_data().map(|data| data.tileset.as_str())
    }

    /// Names of layers that may not hold an element at the same position
    pub fn concurrent_layers(&self) -> &[String] {
        &self.concurrent
    }

    /// Reseed the variation generator
    pub fn reseed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }

    pub(crate) fn init_grid(&mut self, size: GridSize) {
        self.grid = Some(Grid::new(size));
    }

    fn grid(&self) -> Result<&Grid, GridError> {
        self.grid
            .as_ref()
            .ok_or_else(|| GridError::GridNotInitialized(self.name.clone()))
    }

    pub fn grid_size(&self) -> Result<GridSize, GridError> {
        Ok(self.grid()?.size)
    }

    /// Check if a position is inside the grid. Always false before the layer joins a map.
    pub fn position_is_valid(&self, position: Position) -> bool {
        self.grid
            .as_ref()
            .is_some_and(|grid| grid.size.contains(position))
    }

    pub fn check_position(&self, position: Position) -> Result<(), GridError> {
        let size = self.grid_size()?;
        if size.contains(position) {
            Ok(())
        } else {
            Err(GridError::PositionOutOfBounds { position, size })
        }
    }

    pub fn element_at(&self, position: Position) -> Result<Option<&GridElement>, GridError> {
        self.check_position(position)?;
        Ok(self.entry_at(position).map(|(_, element)| element))
    }

    pub fn id_at(&self, position: Position) -> Result<Option<ElementId>, GridError> {
        self.check_position(position)?;
        Ok(self.grid()?.id_at(position))
    }

    /// Occupant of a cell; `None` when empty or out of bounds
    pub fn entry_at(&self, position: Position) -> Option<(ElementId, &GridElement)> {
        let grid = self.grid.as_ref()?;
        let id = grid.id_at(position)?;
        grid.get(id).map(|element| (id, element))
    }

    pub fn element(&self, id: ElementId) -> Option<&GridElement> {
        self.grid.as_ref()?.get(id)
    }

    /// Live elements, row by row
    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &GridElement)> + '_ {
        self.grid.iter().flat_map(|grid| {
            grid.ids()
                .filter_map(move |id| grid.get(id).map(|element| (id, element)))
        })
    }

    pub fn len(&self) -> usize {
        self.elements().count()
    }

    pub fn is_empty(&self) -> bool {
        self.elements().next().is_none()
    }

    /// Elements named `name`, row by row
    pub fn namesakes(&self, name: &str) -> Vec<ElementId> {
        self.elements()
            .filter(|(_, element)| element.name == name)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn amount_of_namesakes(&self, name: &str) -> usize {
        self.elements()
            .filter(|(_, element)| element.name == name)
            .count()
    }

    /// Elements touching the selected grid edge(s)
    pub fn edge_elements(&self, edge: Edge) -> Result<Vec<ElementId>, GridError> {
        let size = self.grid_size()?;
        Ok(size
            .edge_positions(edge, 1)
            .into_iter()
            .filter_map(|position| self.entry_at(position).map(|(id, _)| id))
            .collect())
    }

    /// Whether inserting `element` would overwrite or displace a locked element
    pub(crate) fn insert_blocked(&self, element: &GridElement) -> bool {
        if self
            .entry_at(element.position)
            .is_some_and(|(_, occupant)| occupant.locked)
        {
            return true;
        }
        element.unique
            && self
                .elements()
                .any(|(_, other)| other.locked && other.name == element.name)
    }

    /// Install an element. Lock checks and concurrent evictions are done by the map.
    pub(crate) fn insert(&mut self, mut element: GridElement) -> Result<ElementId, GridError> {
        self.check_position(element.position)?;

        let replaced_group = match self.id_at(element.position)? {
            Some(previous) => self
                .detach(previous, RemovalCause::Replaced)?
                .autotile_group()
                .filter(|&group| Some(group) != element.autotile_group())
                .map(str::to_string),
            None => None,
        };
        if element.unique {
            for namesake in self.namesakes(&element.name) {
                self.detach(namesake, RemovalCause::Namesake)?;
            }
        }

        element.layer = self.id;
        if let (LayerData::Tilemap(data), Some(autotile)) =
            (&self.data, element.as_autotile_mut())
        {
            autotile.rules = Some(data.rules_for(&autotile.group));
        }

        let position = element.position;
        let group = element.autotile_group().map(str::to_string);
        let name = self.name.clone();
        let id = self
            .grid
            .as_mut()
            .and_then(|grid| grid.install(element))
            .ok_or(GridError::GridNotInitialized(name))?;

        let formatted = if self.auto_formats() {
            let mut targets = vec![id];
            if let Some(group) = &group {
                targets.extend(self.group_ids_around(position, group, Some(id)));
            }
            // The overwritten tile's group lost a member here
            if let Some(group) = &replaced_group {
                targets.extend(self.group_ids_around(position, group, Some(id)));
            }
            self.format_ids(&targets)?
        } else {
            Vec::new()
        };

        for event in &formatted {
            self.emit_formatted(event);
        }
        self.emit_created(&ElementCreated { id, position });

        Ok(id)
    }

    /// Remove an element. Locked elements stay and `None` is returned.
    pub fn remove_element(&mut self, id: ElementId) -> Result<Option<GridElement>, GridError> {
        let element = self
            .grid()?
            .get(id)
            .ok_or(GridError::StaleElement)?;
        if element.locked {
            tracing::debug!(
                layer = %self.name,
                position = %element.position,
                "refusing to remove locked element"
            );
            return Ok(None);
        }
        self.detach(id, RemovalCause::Direct).map(Some)
    }

    /// Remove whatever occupies `position`
    pub fn remove_element_at(&mut self, position: Position) -> Result<Option<GridElement>, GridError> {
        match self.id_at(position)? {
            Some(id) => self.remove_element(id),
            None => Ok(None),
        }
    }

    /// Take an element out, re-format its group neighbors and emit removal events
    pub(crate) fn detach(&mut self, id: ElementId, cause: RemovalCause) -> Result<GridElement, GridError> {
        let mut element = self
            .grid
            .as_mut()
            .and_then(|grid| grid.release(id))
            .ok_or(GridError::StaleElement)?;
        element.layer = None;
        if let Some(autotile) = element.as_autotile_mut() {
            autotile.rules = None;
        }

        let reformat = !matches!(cause, RemovalCause::Replaced | RemovalCause::Resize);
        let formatted = match element.autotile_group() {
            Some(group) if reformat && self.auto_formats() => {
                let targets = self.group_ids_around(element.position, group, None);
                self.format_ids(&targets)?
            }
            _ => Vec::new(),
        };
        for event in &formatted {
            self.emit_formatted(event);
        }

        let event = ElementRemoved {
            element: element.clone(),
            cause,
        };
        self.emit_removed(&event);
        if cause == RemovalCause::Direct {
            self.emit_directly_removed(&event);
        }

        Ok(element)
    }

    /// Grow the grid by `amount` cells towards `direction`
    pub(crate) fn expand_towards(&mut self, direction: Direction, amount: u32) {
        self.resize_towards(direction, amount as i32);
    }

    /// Shrink the grid by `amount` cells towards `direction`, removing trimmed elements
    pub(crate) fn reduce_towards(&mut self, direction: Direction, amount: u32) {
        self.resize_towards(direction, -(amount as i32));
    }

    fn resize_towards(&mut self, direction: Direction, amount: i32) {
        let Some(old_size) = self.grid.as_ref().map(|grid| grid.size) else {
            return;
        };
        let Some(new_size) = old_size.resized(direction, amount as i64) else {
            return;
        };

        if amount < 0 {
            let trimmed = old_size.edge_positions(Edge::Side(direction), amount.unsigned_abs());
            for position in trimmed {
                if let Some((id, _)) = self.entry_at(position) {
                    // Locked elements are trimmed too
                    if let Err(error) = self.detach(id, RemovalCause::Resize) {
                        tracing::warn!(%error, layer = %self.name, %position, "failed to trim element");
                    }
                }
            }
        }

        let shift = if direction.is_low_edge() {
            let (dx, dy) = direction.vector();
            (-dx * amount, -dy * amount)
        } else {
            (0, 0)
        };

        if let Some(grid) = self.grid.as_mut() {
            let ids: Vec<ElementId> = grid.ids().collect();
            grid.size = new_size;
            grid.cells = vec![None; new_size.area()];
            for id in ids {
                let Some(element) = grid.get_mut(id) else {
                    continue;
                };
                element.position = element.position.offset(shift.0, shift.1);
                if let Some(cell) = new_size.index_of(element.position) {
                    grid.cells[cell] = Some(id);
                }
            }
        }

        if self.auto_formats() {
            let targets: Vec<ElementId> = self
                .elements()
                .filter(|(_, element)| element.is_autotile())
                .map(|(id, _)| id)
                .collect();
            match self.format_ids(&targets) {
                Ok(formatted) => {
                    for event in &formatted {
                        self.emit_formatted(event);
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, layer = %self.name, "failed to format tiles after resize");
                }
            }
        }

        let event = GridResized {
            direction,
            amount,
            old_size,
            new_size,
        };
        let mut events = std::mem::take(&mut self.events);
        events.grid_resized.emit(self, &event);
        self.events = events;
    }

    fn tilemap_data_mut(&mut self) -> Result<&mut TilemapData, GridError> {
        match &mut self.data {
            LayerData::Tilemap(data) => Ok(data),
            LayerData::Grid => Err(GridError::NotATilemapLayer(self.name.clone())),
        }
    }

    fn auto_formats(&self) -> bool {
        self.tilemap_data().is_some_and(|data| data.auto_format)
    }

    pub fn auto_format(&self) -> bool {
        self.auto_formats()
    }

    /// Enable or disable re-formatting cascades, e.g. around bulk loads
    pub fn set_auto_format(&mut self, enabled: bool) -> Result<(), GridError> {
        self.tilemap_data_mut()?.auto_format = enabled;
        Ok(())
    }

    /// The rule table `group` currently uses
    pub fn autotile_rules(&self, group: &str) -> Option<RuleTable> {
        self.tilemap_data().map(|data| data.rules_for(group))
    }

    /// Override the rules of one group and refresh its live tiles
    pub fn set_autotile_rules(&mut self, group: &str, rules: RuleTable) -> Result<(), GridError> {
        self.tilemap_data_mut()?
            .autotile_rules
            .insert(group.to_string(), rules.clone());

        let targets: Vec<ElementId> = self
            .elements()
            .filter(|(_, element)| element.autotile_group() == Some(group))
            .map(|(id, _)| id)
            .collect();

        if let Some(grid) = self.grid.as_mut() {
            for id in &targets {
                if let Some(autotile) = grid.get_mut(*id).and_then(GridElement::as_autotile_mut) {
                    autotile.rules = Some(rules.clone());
                }
            }
        }

        if self.auto_formats() {
            for event in &self.format_ids(&targets)? {
                self.emit_formatted(event);
            }
        }
        Ok(())
    }

    /// Append rules after the ones `group` currently uses
    pub fn add_autotile_rules(
        &mut self,
        group: &str,
        rules: impl IntoIterator<Item = AutotileRule>,
    ) -> Result<(), GridError> {
        let current = self
            .autotile_rules(group)
            .ok_or_else(|| GridError::NotATilemapLayer(self.name.clone()))?;
        self.set_autotile_rules(group, current.extended(rules))
    }

    /// Re-format one element. Returns its display afterwards.
    pub fn format_element(&mut self, id: ElementId) -> Result<Option<AtlasCoord>, GridError> {
        self.tilemap_data_mut()?;
        if self.element(id).is_none() {
            return Err(GridError::StaleElement);
        }
        if let Some(event) = self.format_one(id)? {
            self.emit_formatted(&event);
        }
        Ok(self.element(id).and_then(GridElement::display))
    }

    /// Re-format every tile in the layer
    pub fn format_all_tiles(&mut self) -> Result<(), GridError> {
        self.tilemap_data_mut()?;
        let targets: Vec<ElementId> = self
            .elements()
            .filter(|(_, element)| element.as_tile().is_some())
            .map(|(id, _)| id)
            .collect();
        for event in &self.format_ids(&targets)? {
            self.emit_formatted(event);
        }
        Ok(())
    }

    /// Same-group autotile elements within the format radius of `center`
    fn group_ids_around(&self, center: Position, group: &str, except: Option<ElementId>) -> Vec<ElementId> {
        let r = FORMAT_RADIUS as i32;
        (-r..=r)
            .flat_map(|dy| (-r..=r).map(move |dx| center.offset(dx, dy)))
            .filter_map(|position| self.entry_at(position))
            .filter(|(id, element)| {
                Some(*id) != except && element.autotile_group() == Some(group)
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// Format all targets first, then report the ones whose display changed
    fn format_ids(&mut self, targets: &[ElementId]) -> Result<Vec<TileFormatted>, GridError> {
        let mut formatted = Vec::new();
        for id in targets {
            if let Some(event) = self.format_one(*id)? {
                formatted.push(event);
            }
        }
        Ok(formatted)
    }

    fn format_one(&mut self, id: ElementId) -> Result<Option<TileFormatted>, GridError> {
        let Some(element) = self.element(id) else {
            return Ok(None);
        };
        let Some(previous) = element.display() else {
            return Ok(None);
        };

        let autotile_outcome = match element.as_autotile() {
            Some(autotile) => {
                let processor = NeighborProcessor::new(Adjacency::Eight, true);
                let window = processor.neighbors_bool_grid(self, element, 1)?;
                let deep_count = processor.amount_of_neighbors(self, element, 2)?;
                let depth = Depth::classify(window.count(), deep_count);
                let rules = autotile.rules.as_deref().unwrap_or(&[]);
                let base = resolve_display(&autotile.group, rules, &window.to_rule_window());
                Some((base, depth))
            }
            None => None,
        };

        let rng = &mut self.rng;
        let Some(element) = self.grid.as_mut().and_then(|grid| grid.get_mut(id)) else {
            return Ok(None);
        };
        let position = element.position;
        match (&mut element.kind, autotile_outcome) {
            (ElementKind::Autotile(autotile), Some((base, depth))) => {
                autotile.depth = depth;
                autotile.tile.display = base;
                if depth >= autotile.variation_depth {
                    autotile.tile.apply_variation(rng);
                }
            }
            (ElementKind::Tile(tile), _) => tile.apply_variation(rng),
            _ => return Ok(None),
        }

        let display = element.display().unwrap_or(previous);
        Ok((display != previous).then_some(TileFormatted {
            id,
            position,
            previous,
            display,
        }))
    }

    fn emit_created(&mut self, event: &ElementCreated) {
        let mut events = std::mem::take(&mut self.events);
        events.element_created.emit(self, event);
        self.events = events;
    }

    fn emit_removed(&mut self, event: &ElementRemoved) {
        let mut events = std::mem::take(&mut self.events);
        events.element_removed.emit(self, event);
        self.events = events;
    }

    fn emit_directly_removed(&mut self, event: &ElementRemoved) {
        let mut events = std::mem::take(&mut self.events);
        events.element_directly_removed.emit(self, event);
        self.events = events;
    }

    fn emit_formatted(&mut self, event: &TileFormatted) {
        let mut events = std::mem::take(&mut self.events);
        events.tile_formatted.emit(self, event);
        self.events = events;
    }
}

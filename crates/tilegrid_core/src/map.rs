//! The grid map: ordered layers sharing one grid size

use uuid::Uuid;

use tilegrid_autotile::AtlasCoord;

use crate::config::GridMapConfig;
use crate::element::{ElementId, GridElement, LayerId};
use crate::error::GridError;
use crate::events::{Channel, GridResized, RemovalCause};
use crate::geometry::{Direction, Edge, GridSize, Position, TileSize};
use crate::layer::GridLayer;

/// Where `add_layer` puts a new layer in paint order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayerPosition {
    #[default]
    End,
    /// Insert before the layer currently at this index (clamped to the end)
    At(usize),
}

/// A stack of layers over one bounded grid.
///
/// Every layer's grid size equals the map's grid size, and the grid size
/// always lies within `[min_grid_size, max_grid_size]`.
#[derive(Debug)]
pub struct GridMap {
    pub id: Uuid,
    tile_size: TileSize,
    grid_size: GridSize,
    min_grid_size: GridSize,
    max_grid_size: GridSize,
    layers: Vec<GridLayer>,
    next_layer_id: u32,
    /// Fired after every layer has been resized
    pub size_changed: Channel<GridMap, GridResized>,
}

impl GridMap {
    pub fn new(config: GridMapConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            tile_size: config.tile_size,
            grid_size: config
                .grid_size
                .clamp(config.min_grid_size, config.max_grid_size),
            min_grid_size: config.min_grid_size,
            max_grid_size: config.max_grid_size,
            layers: Vec::new(),
            next_layer_id: 0,
            size_changed: Channel::new(),
        }
    }

    /// The settings this map would be rebuilt from
    pub fn config(&self) -> GridMapConfig {
        GridMapConfig {
            tile_size: self.tile_size,
            grid_size: self.grid_size,
            min_grid_size: self.min_grid_size,
            max_grid_size: self.max_grid_size,
        }
    }

    pub fn tile_size(&self) -> TileSize {
        self.tile_size
    }

    pub fn grid_size(&self) -> GridSize {
        self.grid_size
    }

    pub fn min_grid_size(&self) -> GridSize {
        self.min_grid_size
    }

    pub fn max_grid_size(&self) -> GridSize {
        self.max_grid_size
    }

    /// Size in pixels
    pub fn size(&self) -> (u32, u32) {
        (
            self.grid_size.width * self.tile_size.width,
            self.grid_size.height * self.tile_size.height,
        )
    }

    pub fn position_is_valid(&self, position: Position) -> bool {
        self.grid_size.contains(position)
    }

    /// Register a layer and size its grid to the map
    pub fn add_layer(&mut self, mut layer: GridLayer, position: LayerPosition) -> Result<LayerId, GridError> {
        if self.has_layer(layer.name()) {
            return Err(GridError::DuplicateLayer(layer.name().to_string()));
        }

        let id = LayerId(self.next_layer_id);
        self.next_layer_id += 1;
        layer.id = Some(id);
        layer.init_grid(self.grid_size);

        tracing::debug!(layer = layer.name(), size = %self.grid_size, "adding layer");
        match position {
            LayerPosition::End => self.layers.push(layer),
            LayerPosition::At(index) => {
                let index = index.min(self.layers.len());
                self.layers.insert(index, layer);
            }
        }
        Ok(id)
    }

    fn layer_index(&self, name: &str) -> Result<usize, GridError> {
        self.layers
            .iter()
            .position(|layer| layer.name() == name)
            .ok_or_else(|| GridError::LayerNotFound(name.to_string()))
    }

    pub fn get_layer(&self, name: &str) -> Result<&GridLayer, GridError> {
        let index = self.layer_index(name)?;
        Ok(&self.layers[index])
    }

    pub fn get_layer_mut(&mut self, name: &str) -> Result<&mut GridLayer, GridError> {
        let index = self.layer_index(name)?;
        Ok(&mut self.layers[index])
    }

    pub fn has_layer(&self, name: &str) -> bool {
        self.layers.iter().any(|layer| layer.name() == name)
    }

    pub fn layer_by_id(&self, id: LayerId) -> Option<&GridLayer> {
        self.layers.iter().find(|layer| layer.id == Some(id))
    }

    pub fn layer_by_id_mut(&mut self, id: LayerId) -> Option<&mut GridLayer> {
        self.layers.iter_mut().find(|layer| layer.id == Some(id))
    }

    /// Layers in paint order
    pub fn layers(&self) -> &[GridLayer] {
        &self.layers
    }

    /// The layer painted right after `name`
    pub fn layer_above(&self, name: &str) -> Result<Option<&GridLayer>, GridError> {
        let index = self.layer_index(name)?;
        Ok(self.layers.get(index + 1))
    }

    /// The layer painted right before `name`
    pub fn layer_below(&self, name: &str) -> Result<Option<&GridLayer>, GridError> {
        let index = self.layer_index(name)?;
        Ok(index.checked_sub(1).map(|below| &self.layers[below]))
    }

    /// The element at the same position on the layer above
    pub fn element_above(&self, name: &str, position: Position) -> Result<Option<&GridElement>, GridError> {
        match self.layer_above(name)? {
            Some(layer) => layer.element_at(position),
            None => Ok(None),
        }
    }

    /// The element at the same position on the layer below
    pub fn element_below(&self, name: &str, position: Position) -> Result<Option<&GridElement>, GridError> {
        match self.layer_below(name)? {
            Some(layer) => layer.element_at(position),
            None => Ok(None),
        }
    }

    /// Declare layers mutually concurrent: at most one of them may hold an element at any position
    pub fn add_layer_concurrence(&mut self, names: &[&str]) -> Result<(), GridError> {
        for name in names {
            self.layer_index(name)?;
        }
        for &name in names {
            let layer = self.get_layer_mut(name)?;
            for &other in names.iter().filter(|&&other| other != name) {
                if !layer.concurrent.iter().any(|existing| existing == other) {
                    layer.concurrent.push(other.to_string());
                }
            }
        }
        Ok(())
    }

    /// Add an element to a layer.
    ///
    /// Returns `Ok(None)` without mutating anything when a locked element
    /// blocks the insertion: one at the target cell, one at the same cell
    /// of a concurrent layer, or (for unique elements) a locked namesake.
    /// Otherwise unlocked occupants of concurrent layers are evicted first.
    pub fn add_element(&mut self, layer: &str, element: GridElement) -> Result<Option<ElementId>, GridError> {
        let index = self.layer_index(layer)?;
        let target = &self.layers[index];
        let position = element.position;
        target.check_position(position)?;

        if target.insert_blocked(&element) {
            tracing::debug!(layer, %position, name = %element.name, "insertion blocked by locked element");
            return Ok(None);
        }

        let concurrent = target.concurrent.clone();
        for other in &concurrent {
            if let Some(occupant) = self.get_layer(other)?.element_at(position)? {
                if occupant.locked {
                    tracing::debug!(
                        layer,
                        concurrent = %other,
                        %position,
                        "insertion blocked by locked element on concurrent layer"
                    );
                    return Ok(None);
                }
            }
        }

        for other in &concurrent {
            let other_layer = self.get_layer_mut(other)?;
            if let Some(occupant) = other_layer.id_at(position)? {
                tracing::debug!(layer, concurrent = %other, %position, "evicting concurrent element");
                other_layer.detach(occupant, RemovalCause::Evicted)?;
            }
        }

        self.layers[index].insert(element).map(Some)
    }

    /// Add a plain tile to a tilemap layer
    pub fn create_tile_at(
        &mut self,
        layer: &str,
        position: Position,
        display: AtlasCoord,
    ) -> Result<Option<ElementId>, GridError> {
        self.require_tilemap(layer)?;
        self.add_element(layer, GridElement::tile("tile", position, display))
    }

    /// Add an autotile tile of `group` to a tilemap layer; the element is named after its group
    pub fn create_autotile_tile_at(
        &mut self,
        layer: &str,
        position: Position,
        group: &str,
    ) -> Result<Option<ElementId>, GridError> {
        self.require_tilemap(layer)?;
        self.add_element(layer, GridElement::autotile(group, position, group))
    }

    fn require_tilemap(&self, layer: &str) -> Result<(), GridError> {
        if self.get_layer(layer)?.is_tilemap() {
            Ok(())
        } else {
            Err(GridError::NotATilemapLayer(layer.to_string()))
        }
    }

    pub fn remove_element(&mut self, layer: &str, id: ElementId) -> Result<Option<GridElement>, GridError> {
        self.get_layer_mut(layer)?.remove_element(id)
    }

    pub fn remove_element_at(&mut self, layer: &str, position: Position) -> Result<Option<GridElement>, GridError> {
        self.get_layer_mut(layer)?.remove_element_at(position)
    }

    /// Every element of every layer, in paint order then row order
    pub fn all_elements(&self) -> impl Iterator<Item = (&GridLayer, ElementId, &GridElement)> + '_ {
        self.layers
            .iter()
            .flat_map(|layer| layer.elements().map(move |(id, element)| (layer, id, element)))
    }

    /// Every grid position, row by row
    pub fn positions(&self) -> impl Iterator<Item = Position> {
        self.grid_size.positions()
    }

    /// Positions within `retreat` cells of the selected edge(s)
    pub fn get_edge_positions(&self, edge: impl Into<Edge>, retreat: u32) -> Vec<Position> {
        self.grid_size.edge_positions(edge.into(), retreat)
    }

    /// Grow every layer by `amount` cells towards `direction`.
    ///
    /// Returns the new edge positions, or `None` (and changes nothing) if
    /// the new size would exceed the maximum.
    pub fn expand_towards(&mut self, direction: Direction, amount: u32) -> Option<Vec<Position>> {
        let new_size = self.checked_resize(direction, amount as i64)?;
        for layer in &mut self.layers {
            layer.expand_towards(direction, amount);
        }
        self.finish_resize(direction, amount as i32, new_size);
        Some(new_size.edge_positions(Edge::Side(direction), amount))
    }

    /// Shrink every layer by `amount` cells towards `direction`, removing trimmed elements.
    ///
    /// Returns the removed edge positions (in pre-resize coordinates), or
    /// `None` (and changes nothing) if the new size would drop below the minimum.
    pub fn reduce_towards(&mut self, direction: Direction, amount: u32) -> Option<Vec<Position>> {
        let new_size = self.checked_resize(direction, -(amount as i64))?;
        let removed = self
            .grid_size
            .edge_positions(Edge::Side(direction), amount);
        for layer in &mut self.layers {
            layer.reduce_towards(direction, amount);
        }
        self.finish_resize(direction, -(amount as i32), new_size);
        Some(removed)
    }

    fn checked_resize(&self, direction: Direction, amount: i64) -> Option<GridSize> {
        let new_size = self
            .grid_size
            .resized(direction, amount)
            .filter(|size| size.within(self.min_grid_size, self.max_grid_size));
        if new_size.is_none() {
            tracing::debug!(
                %direction,
                amount,
                size = %self.grid_size,
                min = %self.min_grid_size,
                max = %self.max_grid_size,
                "resize would leave the grid size bounds, ignoring"
            );
        }
        new_size
    }

    fn finish_resize(&mut self, direction: Direction, amount: i32, new_size: GridSize) {
        let event = GridResized {
            direction,
            amount,
            old_size: self.grid_size,
            new_size,
        };
        self.grid_size = new_size;

        let mut channel = std::mem::take(&mut self.size_changed);
        channel.emit(self, &event);
        self.size_changed = channel;
    }

    /// World coordinates of a grid corner.
    ///
    /// Inverting an axis measures it from the far side of the map, e.g. for
    /// renderers whose `y` grows upwards.
    pub fn grid_to_world(&self, position: Position, invert_x: bool, invert_y: bool) -> (f32, f32) {
        let (width, height) = self.size();
        let mut x = (position.x * self.tile_size.width as i32) as f32;
        let mut y = (position.y * self.tile_size.height as i32) as f32;
        if invert_x {
            x = width as f32 - x;
        }
        if invert_y {
            y = height as f32 - y;
        }
        (x, y)
    }

    /// The grid cell containing a world point
    pub fn world_to_grid(&self, world: (f32, f32), invert_x: bool, invert_y: bool) -> Position {
        let (width, height) = self.size();
        let (mut x, mut y) = world;
        if invert_x {
            x = width as f32 - x;
        }
        if invert_y {
            y = height as f32 - y;
        }
        Position::new(
            (x / self.tile_size.width as f32).floor() as i32,
            (y / self.tile_size.height as f32).floor() as i32,
        )
    }
}

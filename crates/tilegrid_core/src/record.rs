//! Persisted map records
//!
//! Maps are stored as plain serde records. Layer and element records carry a
//! `type` tag that is resolved through a [`RecordRegistry`] on load, so new
//! kinds can be registered without touching the reader. Autotile rule tables
//! are not persisted; the loader injects the application's default table and
//! overrides must be registered again afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use tilegrid_autotile::{AtlasCoord, RuleTable};

use crate::config::GridMapConfig;
use crate::element::{AutotileTile, ElementKind, GridElement, Tile, Variations};
use crate::error::RecordError;
use crate::geometry::{GridSize, Position, TileSize};
use crate::layer::{GridLayer, LayerData};
use crate::map::{GridMap, LayerPosition};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRecord {
    pub tile_size: TileSize,
    pub grid_size: GridSize,
    pub min_grid_size: GridSize,
    pub max_grid_size: GridSize,
    #[serde(default)]
    pub layers: Vec<LayerRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerRecord {
    #[serde(rename = "type")]
    pub layer_type: String,
    pub name: String,
    pub grid_size: GridSize,
    /// Tileset path, for tilemap layers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tileset: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concurrent: Vec<String>,
    #[serde(default)]
    pub elements: Vec<ElementRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    #[serde(rename = "type")]
    pub element_type: String,
    pub position: Position,
    pub name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<AtlasCoord>,
    #[serde(default, skip_serializing_if = "Variations::is_empty")]
    pub variations: Variations,
    /// Autotile group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ElementRecord {
    pub fn from_element(element: &GridElement) -> Self {
        let tile = element.as_tile();
        Self {
            element_type: element.kind.type_tag().to_string(),
            position: element.position,
            name: element.name.clone(),
            unique: element.unique,
            locked: element.locked,
            display: tile.map(|tile| tile.display),
            variations: tile.map(|tile| tile.variations.clone()).unwrap_or_default(),
            group: element.autotile_group().map(str::to_string),
        }
    }

    fn element(&self, kind: ElementKind) -> GridElement {
        GridElement::with_kind(self.name.clone(), self.position, kind)
            .with_unique(self.unique)
            .with_locked(self.locked)
    }

    fn tile(&self) -> Tile {
        Tile {
            display: self.display.unwrap_or(AtlasCoord::ZERO),
            variations: self.variations.clone(),
        }
    }
}

impl LayerRecord {
    pub fn from_layer(layer: &GridLayer) -> Result<Self, RecordError> {
        Ok(Self {
            layer_type: layer.layer_type().type_tag().to_string(),
            name: layer.name().to_string(),
            grid_size: layer.grid_size()?,
            tileset: layer.tileset().map(str::to_string),
            concurrent: layer.concurrent_layers().to_vec(),
            elements: layer
                .elements()
                .map(|(_, element)| ElementRecord::from_element(element))
                .collect(),
        })
    }
}

pub type LayerDecoder = Box<dyn Fn(&LayerRecord, &RuleTable) -> Result<GridLayer, RecordError>>;
pub type ElementDecoder = Box<dyn Fn(&ElementRecord) -> Result<GridElement, RecordError>>;

/// Type tag to decoder lookup for layer and element records
pub struct RecordRegistry {
    layers: HashMap<String, LayerDecoder>,
    elements: HashMap<String, ElementDecoder>,
}

impl RecordRegistry {
    /// A registry with no decoders
    pub fn empty() -> Self {
        Self {
            layers: HashMap::new(),
            elements: HashMap::new(),
        }
    }

    /// A registry with decoders for every built-in layer and element type
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_layer("GridLayer", |record, _| Ok(GridLayer::new(record.name.clone())));
        registry.register_layer("TilemapLayer", |record, rules| {
            Ok(GridLayer::tilemap(
                record.name.clone(),
                record.tileset.clone().unwrap_or_default(),
                rules.clone(),
            ))
        });

        registry.register_element("Element", |record| Ok(record.element(ElementKind::Marker)));
        registry.register_element("Tile", |record| Ok(record.element(ElementKind::Tile(record.tile()))));
        registry.register_element("AutotileTile", |record| {
            let group = record.group.clone().unwrap_or_else(|| record.name.clone());
            let mut autotile = AutotileTile::new(group);
            autotile.tile = record.tile();
            Ok(record.element(ElementKind::Autotile(autotile)))
        });

        registry
    }

    pub fn register_layer(
        &mut self,
        tag: impl Into<String>,
        decoder: impl Fn(&LayerRecord, &RuleTable) -> Result<GridLayer, RecordError> + 'static,
    ) {
        self.layers.insert(tag.into(), Box::new(decoder));
    }

    pub fn register_element(
        &mut self,
        tag: impl Into<String>,
        decoder: impl Fn(&ElementRecord) -> Result<GridElement, RecordError> + 'static,
    ) {
        self.elements.insert(tag.into(), Box::new(decoder));
    }

    pub fn decode_layer(&self, record: &LayerRecord, rules: &RuleTable) -> Result<GridLayer, RecordError> {
        let decoder = self
            .layers
            .get(&record.layer_type)
            .ok_or_else(|| RecordError::UnknownLayerType(record.layer_type.clone()))?;
        decoder(record, rules)
    }

    pub fn decode_element(&self, record: &ElementRecord) -> Result<GridElement, RecordError> {
        let decoder = self
            .elements
            .get(&record.element_type)
            .ok_or_else(|| RecordError::UnknownElementType(record.element_type.clone()))?;
        decoder(record)
    }
}

impl Default for RecordRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RecordRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordRegistry")
            .field("layers", &self.layers.keys().collect::<Vec<_>>())
            .field("elements", &self.elements.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl GridMap {
    pub fn to_record(&self) -> Result<MapRecord, RecordError> {
        let config = self.config();
        Ok(MapRecord {
            tile_size: config.tile_size,
            grid_size: config.grid_size,
            min_grid_size: config.min_grid_size,
            max_grid_size: config.max_grid_size,
            layers: self
                .layers()
                .iter()
                .map(LayerRecord::from_layer)
                .collect::<Result<_, _>>()?,
        })
    }

    /// Rebuild a map. Tilemap layers get `default_rules`; persisted displays are kept as-is.
    pub fn from_record(
        record: &MapRecord,
        registry: &RecordRegistry,
        default_rules: &RuleTable,
    ) -> Result<Self, RecordError> {
        let mut map = GridMap::new(GridMapConfig {
            tile_size: record.tile_size,
            grid_size: record.grid_size,
            min_grid_size: record.min_grid_size,
            max_grid_size: record.max_grid_size,
        });

        for layer_record in &record.layers {
            if layer_record.grid_size != map.grid_size() {
                tracing::warn!(
                    layer = %layer_record.name,
                    recorded = %layer_record.grid_size,
                    size = %map.grid_size(),
                    "layer grid size differs from the map, using the map's"
                );
            }

            let mut layer = registry.decode_layer(layer_record, default_rules)?;
            if let LayerData::Tilemap(data) = &mut layer.data {
                data.auto_format = false;
            }
            map.add_layer(layer, LayerPosition::End)?;

            for element_record in &layer_record.elements {
                let element = registry.decode_element(element_record)?;
                if map.add_element(&layer_record.name, element)?.is_none() {
                    tracing::warn!(
                        layer = %layer_record.name,
                        position = %element_record.position,
                        "element blocked by a locked element, skipping"
                    );
                }
            }

            if let LayerData::Tilemap(data) = &mut map.get_layer_mut(&layer_record.name)?.data {
                data.auto_format = true;
            }
        }

        for layer_record in &record.layers {
            if layer_record.concurrent.is_empty() {
                continue;
            }
            let mut names: Vec<&str> = vec![layer_record.name.as_str()];
            names.extend(layer_record.concurrent.iter().map(String::as_str));
            map.add_layer_concurrence(&names)?;
        }

        Ok(map)
    }
}

/// Write a map as pretty-printed JSON
pub fn save_map(map: &GridMap, path: &Path) -> Result<(), RecordError> {
    let json = serde_json::to_string_pretty(&map.to_record()?)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Read a map written by [`save_map`]
pub fn load_map(path: &Path, registry: &RecordRegistry, default_rules: &RuleTable) -> Result<GridMap, RecordError> {
    let json = std::fs::read_to_string(path)?;
    let record: MapRecord = serde_json::from_str(&json)?;
    GridMap::from_record(&record, registry, default_rules)
}

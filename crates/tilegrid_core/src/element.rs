//! Grid elements: markers, tiles and autotile tiles

use rand::Rng;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use tilegrid_autotile::{AtlasCoord, Depth, RuleTable};

use crate::error::{GridError, RecordError};
use crate::geometry::{Direction, GridSize, Position};
use crate::tileset::Tileset;

/// Handle to an element slot inside a layer.
///
/// Stays valid until the element is removed; a handle to a removed element
/// never resolves to a later occupant of the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// Handle to a layer inside a map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub(crate) u32);

/// A positioned, named occupant of one grid cell
#[derive(Debug, Clone, PartialEq)]
pub struct GridElement {
    pub position: Position,
    pub name: String,
    /// Only one element with this name may exist per layer
    pub unique: bool,
    /// Locked elements are never overwritten, evicted or removed
    pub locked: bool,
    pub(crate) layer: Option<LayerId>,
    pub kind: ElementKind,
}

/// Kind-specific payload of an element
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// A named element with no display
    Marker,
    Tile(Tile),
    Autotile(AutotileTile),
}

impl ElementKind {
    /// Type tag used by persisted records
    pub fn type_tag(&self) -> &'static str {
        match self {
            ElementKind::Marker => "Element",
            ElementKind::Tile(_) => "Tile",
            ElementKind::Autotile(_) => "AutotileTile",
        }
    }
}

impl GridElement {
    /// A detached element with no display
    pub fn marker(name: impl Into<String>, position: Position) -> Self {
        Self::with_kind(name, position, ElementKind::Marker)
    }

    /// A detached tile showing `display`
    pub fn tile(name: impl Into<String>, position: Position, display: AtlasCoord) -> Self {
        Self::with_kind(name, position, ElementKind::Tile(Tile::new(display)))
    }

    /// A detached autotile tile; its display is picked when it joins a tilemap layer
    pub fn autotile(name: impl Into<String>, position: Position, group: impl Into<String>) -> Self {
        Self::with_kind(
            name,
            position,
            ElementKind::Autotile(AutotileTile::new(group)),
        )
    }

    pub fn with_kind(name: impl Into<String>, position: Position, kind: ElementKind) -> Self {
        Self {
            position,
            name: name.into(),
            unique: false,
            locked: false,
            layer: None,
            kind,
        }
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Add a weighted display variation. No effect on markers.
    pub fn with_variation(mut self, display: AtlasCoord, weight: f32) -> Self {
        if let Some(tile) = self.as_tile_mut() {
            tile.variations.insert(display, weight);
        }
        self
    }

    /// The layer this element lives in
    pub fn layer(&self) -> Result<LayerId, GridError> {
        self.layer
            .ok_or_else(|| GridError::UnsetLayerReference(self.name.clone()))
    }

    pub fn is_attached(&self) -> bool {
        self.layer.is_some()
    }

    /// Tile data, for both plain and autotile tiles
    pub fn as_tile(&self) -> Option<&Tile> {
        match &self.kind {
            ElementKind::Marker => None,
            ElementKind::Tile(tile) => Some(tile),
            ElementKind::Autotile(autotile) => Some(&autotile.tile),
        }
    }

    pub fn as_tile_mut(&mut self) -> Option<&mut Tile> {
        match &mut self.kind {
            ElementKind::Marker => None,
            ElementKind::Tile(tile) => Some(tile),
            ElementKind::Autotile(autotile) => Some(&mut autotile.tile),
        }
    }

    pub fn as_autotile(&self) -> Option<&AutotileTile> {
        match &self.kind {
            ElementKind::Autotile(autotile) => Some(autotile),
            _ => None,
        }
    }

    pub fn as_autotile_mut(&mut self) -> Option<&mut AutotileTile> {
        match &mut self.kind {
            ElementKind::Autotile(autotile) => Some(autotile),
            _ => None,
        }
    }

    pub fn is_autotile(&self) -> bool {
        matches!(self.kind, ElementKind::Autotile(_))
    }

    pub fn autotile_group(&self) -> Option<&str> {
        self.as_autotile().map(|autotile| autotile.group.as_str())
    }

    /// Current display, if this element is a tile
    pub fn display(&self) -> Option<AtlasCoord> {
        self.as_tile().map(|tile| tile.display)
    }

    /// Grid edges this element touches, in `Direction::ALL` order
    pub fn edges(&self, size: GridSize) -> Vec<Direction> {
        let Position { x, y } = self.position;
        let (max_x, max_y) = (size.width as i32 - 1, size.height as i32 - 1);
        Direction::ALL
            .into_iter()
            .filter(|direction| match direction {
                Direction::Left => x == 0,
                Direction::Right => x == max_x,
                Direction::Top => y == 0,
                Direction::Bottom => y == max_y,
            })
            .collect()
    }

    pub fn is_on_edge(&self, size: GridSize) -> bool {
        !self.edges(size).is_empty()
    }
}

/// A tileset-backed element
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub display: AtlasCoord,
    pub variations: Variations,
}

impl Tile {
    pub fn new(display: AtlasCoord) -> Self {
        Self {
            display,
            variations: Variations::new(),
        }
    }

    /// Replace the display with a weighted variation draw, if any are registered
    pub fn apply_variation(&mut self, rng: &mut impl Rng) {
        if let Some(display) = self.variations.pick(rng) {
            self.display = display;
        }
    }

    /// Whether the current display has transparent pixels
    pub fn has_transparency<T: Tileset + ?Sized>(&self, tileset: &T) -> bool {
        tileset.tile_has_transparency(self.display)
    }
}

/// A tile whose display is chosen by matching its same-group neighborhood
#[derive(Debug, Clone, PartialEq)]
pub struct AutotileTile {
    pub tile: Tile,
    pub group: String,
    /// Assigned by the layer on insertion; `None` while detached
    pub rules: Option<RuleTable>,
    /// Depth computed by the last format pass
    pub depth: Depth,
    /// Variations only apply at or beyond this depth
    pub variation_depth: Depth,
}

impl AutotileTile {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            tile: Tile::new(AtlasCoord::ZERO),
            group: group.into(),
            rules: None,
            depth: Depth::Border,
            variation_depth: Depth::Border,
        }
    }

    pub fn is_deep(&self) -> bool {
        self.depth == Depth::Deep
    }
}

/// Weighted alternative displays, kept in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variations {
    entries: Vec<(AtlasCoord, f32)>,
    total: f32,
}

impl Variations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a display with a relative weight. Re-inserting a display replaces its weight.
    pub fn insert(&mut self, display: AtlasCoord, weight: f32) {
        match self.entries.iter_mut().find(|(coord, _)| *coord == display) {
            Some(entry) => {
                self.total += weight - entry.1;
                entry.1 = weight;
            }
            None => {
                self.entries.push((display, weight));
                self.total += weight;
            }
        }
    }

    pub fn remove(&mut self, display: AtlasCoord) -> Option<f32> {
        let index = self.entries.iter().position(|(coord, _)| *coord == display)?;
        let (_, weight) = self.entries.remove(index);
        self.total -= weight;
        Some(weight)
    }

    /// Sum of all weights
    pub fn total(&self) -> f32 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AtlasCoord, f32)> + '_ {
        self.entries.iter().copied()
    }

    /// Draw a display proportionally to its weight
    pub fn pick(&self, rng: &mut impl Rng) -> Option<AtlasCoord> {
        if self.entries.is_empty() || self.total <= 0.0 {
            return None;
        }

        let draw = rng.gen::<f32>() * self.total;
        let mut sum = 0.0;
        for (display, weight) in &self.entries {
            sum += weight;
            if draw < sum {
                return Some(*display);
            }
        }

        // Rounding can leave the draw at the very top of the range
        self.entries
            .iter()
            .rev()
            .find(|(_, weight)| *weight > 0.0)
            .map(|(display, _)| *display)
    }

    /// Parse a persisted `"x,y"` key
    pub fn parse_key(key: &str) -> Result<AtlasCoord, RecordError> {
        let invalid = || RecordError::InvalidVariationKey(key.to_string());
        let (x, y) = key.split_once(',').ok_or_else(invalid)?;
        let x = x.trim().parse().map_err(|_| invalid())?;
        let y = y.trim().parse().map_err(|_| invalid())?;
        Ok(AtlasCoord::new(x, y))
    }

    fn format_key(display: AtlasCoord) -> String {
        format!("{},{}", display.x, display.y)
    }
}

impl FromIterator<(AtlasCoord, f32)> for Variations {
    fn from_iter<I: IntoIterator<Item = (AtlasCoord, f32)>>(iter: I) -> Self {
        let mut variations = Variations::new();
        for (display, weight) in iter {
            variations.insert(display, weight);
        }
        variations
    }
}

impl Serialize for Variations {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (display, weight) in &self.entries {
            map.serialize_entry(&Self::format_key(*display), weight)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Variations {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VariationsVisitor;

        impl<'de> Visitor<'de> for VariationsVisitor {
            type Value = Variations;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of \"x,y\" keys to weights")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Variations, A::Error> {
                let mut variations = Variations::new();
                while let Some((key, weight)) = access.next_entry::<String, f32>()? {
                    let display = Variations::parse_key(&key).map_err(de::Error::custom)?;
                    variations.insert(display, weight);
                }
                Ok(variations)
            }
        }

        deserializer.deserialize_map(VariationsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_detached_element_has_no_layer() {
        let element = GridElement::marker("spawn", Position::new(1, 1));
        assert!(matches!(
            element.layer(),
            Err(GridError::UnsetLayerReference(name)) if name == "spawn"
        ));
    }

    #[test]
    fn test_capability_checks() {
        let marker = GridElement::marker("spawn", Position::new(0, 0));
        let tile = GridElement::tile("grass", Position::new(0, 0), AtlasCoord::new(2, 1));
        let wall = GridElement::autotile("wall", Position::new(0, 0), "wall");

        assert!(marker.as_tile().is_none());
        assert_eq!(tile.display(), Some(AtlasCoord::new(2, 1)));
        assert!(!tile.is_autotile());
        assert!(wall.is_autotile());
        assert_eq!(wall.autotile_group(), Some("wall"));
        assert_eq!(wall.kind.type_tag(), "AutotileTile");
    }

    #[test]
    fn test_edges() {
        let size = GridSize::new(5, 5);
        let corner = GridElement::marker("a", Position::new(0, 4));
        let inner = GridElement::marker("b", Position::new(2, 2));
        assert_eq!(corner.edges(size), vec![Direction::Left, Direction::Bottom]);
        assert!(!inner.is_on_edge(size));
    }

    #[test]
    fn test_reinsert_replaces_weight() {
        let mut variations = Variations::new();
        variations.insert(AtlasCoord::new(0, 0), 1.0);
        variations.insert(AtlasCoord::new(1, 0), 3.0);
        variations.insert(AtlasCoord::new(0, 0), 2.0);
        assert_eq!(variations.len(), 2);
        assert_eq!(variations.total(), 5.0);
        assert_eq!(variations.remove(AtlasCoord::new(1, 0)), Some(3.0));
        assert_eq!(variations.total(), 2.0);
    }

    #[test]
    fn test_pick_follows_weights() {
        let variations: Variations = [(AtlasCoord::new(0, 0), 1.0), (AtlasCoord::new(1, 0), 3.0)]
            .into_iter()
            .collect();
        let mut rng = SmallRng::seed_from_u64(7);

        let draws = 20_000;
        let heavy = (0..draws)
            .filter(|_| variations.pick(&mut rng) == Some(AtlasCoord::new(1, 0)))
            .count();
        let ratio = heavy as f64 / draws as f64;
        assert!((ratio - 0.75).abs() < 0.02, "ratio was {ratio}");
    }

    #[test]
    fn test_pick_empty() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(Variations::new().pick(&mut rng), None);
    }

    #[test]
    fn test_variation_serialization_keeps_order() {
        let variations: Variations = [(AtlasCoord::new(3, 1), 0.5), (AtlasCoord::new(0, 2), 2.0)]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&variations).unwrap();
        assert_eq!(json, r#"{"3,1":0.5,"0,2":2.0}"#);

        let parsed: Variations = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, variations);
    }

    #[test]
    fn test_invalid_variation_key() {
        assert!(matches!(
            Variations::parse_key("3;1"),
            Err(RecordError::InvalidVariationKey(_))
        ));
        assert!(serde_json::from_str::<Variations>(r#"{"a,b": 1.0}"#).is_err());
    }
}

//! End-to-end behavior across maps, autotiling and border tracing

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::rc::Rc;

use tilegrid::core::{load_map, save_map, ElementCreated, ElementRemoved, TileFormatted};
use tilegrid::prelude::*;

fn walls_map(width: u32, height: u32) -> GridMap {
    let mut map = GridMap::new(GridMapConfig {
        grid_size: GridSize::new(width, height),
        min_grid_size: GridSize::new(width, height),
        max_grid_size: GridSize::new(32, 32),
        ..Default::default()
    });
    map.add_layer(
        GridLayer::tilemap("walls", "walls.png", RuleTable::default_table().unwrap()),
        LayerPosition::End,
    )
    .unwrap();
    map
}

fn display_at(map: &GridMap, x: i32, y: i32) -> Option<AtlasCoord> {
    map.get_layer("walls")
        .unwrap()
        .element_at(Position::new(x, y))
        .unwrap()
        .and_then(GridElement::display)
}

#[test]
fn lone_wall_uses_lone_display() {
    let mut map = walls_map(5, 5);
    map.create_autotile_tile_at("walls", Position::new(2, 2), "wall")
        .unwrap()
        .unwrap();
    assert_eq!(display_at(&map, 2, 2), Some(AtlasCoord::new(0, 1)));
}

#[test]
fn enclosed_wall_uses_center_display() {
    let mut map = walls_map(5, 5);
    for y in 1..=3 {
        for x in 1..=3 {
            map.create_autotile_tile_at("walls", Position::new(x, y), "wall")
                .unwrap();
        }
    }
    let layer = map.get_layer("walls").unwrap();
    let center = layer.element_at(Position::new(2, 2)).unwrap().unwrap();
    let processor = NeighborProcessor::autotile();
    assert_eq!(processor.amount_of_neighbors(layer, center, 1).unwrap(), 8);
    assert_eq!(display_at(&map, 2, 2), Some(AtlasCoord::new(0, 3)));
}

#[test]
fn neighbors_are_formatted_before_creation_is_announced() {
    let mut map = walls_map(5, 5);
    map.create_autotile_tile_at("walls", Position::new(1, 2), "wall")
        .unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let layer = map.get_layer_mut("walls").unwrap();
    let sink = seen.clone();
    layer
        .events
        .tile_formatted
        .subscribe(move |_, event: &TileFormatted| sink.borrow_mut().push(format!("formatted {}", event.position)));
    let sink = seen.clone();
    layer
        .events
        .element_created
        .subscribe(move |layer, event: &ElementCreated| {
            // Neighbor already shows its final display
            let neighbor = layer.element_at(Position::new(1, 2)).unwrap().unwrap();
            assert_ne!(neighbor.display(), Some(AtlasCoord::new(0, 1)));
            sink.borrow_mut().push(format!("created {}", event.position));
        });

    map.create_autotile_tile_at("walls", Position::new(2, 2), "wall")
        .unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.last().map(String::as_str), Some("created (2, 2)"));
    assert!(seen.contains(&"formatted (1, 2)".to_string()));
}

#[test]
fn border_of_two_adjacent_tiles() {
    let mut map = walls_map(4, 4);
    let tracer = BorderTracer::attach(&mut map, "walls", "wall").unwrap();

    map.create_autotile_tile_at("walls", Position::new(1, 1), "wall")
        .unwrap();
    assert_eq!(tracer.borrow().line_count(), 4);
    assert!(tracer.borrow().lines().all(|(_, line)| line.length() == 1));

    map.create_autotile_tile_at("walls", Position::new(2, 1), "wall")
        .unwrap();
    let tracer = tracer.borrow();
    let lines = tracer.sorted_lines();
    assert_eq!(lines.len(), 4);
    let spans: Vec<(i32, i32, i32, i32, Orientation)> = lines
        .iter()
        .map(|line| (line.start.x, line.start.y, line.end.x, line.end.y, line.orientation))
        .collect();
    assert_eq!(
        spans,
        vec![
            (1, 1, 3, 1, Orientation::Horizontal),
            (1, 2, 3, 2, Orientation::Horizontal),
            (1, 1, 1, 2, Orientation::Vertical),
            (3, 1, 3, 2, Orientation::Vertical),
        ]
    );
    assert!(tracer.is_consistent());

    let segments = tracer.world_segments(&map);
    assert_eq!(segments[0].start, (16.0, 48.0));
    assert_eq!(segments[0].end, (48.0, 48.0));
}

#[test]
fn reduce_below_minimum_is_a_no_op() {
    let mut map = walls_map(5, 5);
    map.create_autotile_tile_at("walls", Position::new(0, 0), "wall")
        .unwrap();

    assert_eq!(map.reduce_towards(Direction::Left, 1), None);
    assert_eq!(map.grid_size(), GridSize::new(5, 5));
    assert_eq!(map.get_layer("walls").unwrap().len(), 1);
}

#[test]
fn unique_element_replaces_namesake() {
    let mut map = walls_map(5, 5);
    map.add_layer(GridLayer::new("doors"), LayerPosition::End)
        .unwrap();
    let removed = Rc::new(RefCell::new(Vec::new()));
    let sink = removed.clone();
    map.get_layer_mut("doors")
        .unwrap()
        .events
        .element_removed
        .subscribe(move |_, event: &ElementRemoved| sink.borrow_mut().push((event.element.position, event.cause)));

    map.add_element("doors", GridElement::marker("door", Position::new(0, 0)).with_unique(true))
        .unwrap()
        .unwrap();
    map.add_element("doors", GridElement::marker("door", Position::new(4, 4)).with_unique(true))
        .unwrap()
        .unwrap();

    let doors = map.get_layer("doors").unwrap();
    assert_eq!(doors.amount_of_namesakes("door"), 1);
    assert!(doors.element_at(Position::new(0, 0)).unwrap().is_none());
    assert!(doors.element_at(Position::new(4, 4)).unwrap().is_some());
    assert_eq!(
        *removed.borrow(),
        vec![(Position::new(0, 0), RemovalCause::Namesake)]
    );
}

#[test]
fn variations_follow_their_weights() {
    let variations: Variations = [(AtlasCoord::new(0, 0), 1.0), (AtlasCoord::new(1, 0), 3.0)]
        .into_iter()
        .collect();
    let mut rng = SmallRng::seed_from_u64(42);
    let draws = 10_000;
    let hits = (0..draws)
        .filter(|_| variations.pick(&mut rng) == Some(AtlasCoord::new(1, 0)))
        .count();
    let ratio = hits as f64 / draws as f64;
    assert!((0.72..0.78).contains(&ratio), "ratio was {ratio}");
}

#[test]
fn concurrent_layers_never_share_a_position() {
    let mut map = walls_map(6, 6);
    for name in ["floor", "water", "lava"] {
        map.add_layer(GridLayer::new(name), LayerPosition::End)
            .unwrap();
    }
    map.add_layer_concurrence(&["floor", "water", "lava"])
        .unwrap();

    let names = ["floor", "water", "lava"];
    let mut rng = SmallRng::seed_from_u64(5);
    for _ in 0..200 {
        let layer = names[rng.gen_range(0..names.len())];
        let position = Position::new(rng.gen_range(0..6), rng.gen_range(0..6));
        let element = GridElement::marker(layer, position).with_locked(rng.gen_bool(0.1));
        map.add_element(layer, element).unwrap();
    }

    for position in map.positions() {
        let occupants = names
            .iter()
            .filter(|name| map.get_layer(name).unwrap().element_at(position).unwrap().is_some())
            .count();
        assert!(occupants <= 1, "{position} is shared");
    }
}

#[test]
fn expand_then_reduce_restores_layout() {
    let mut map = walls_map(5, 5);
    let mut rng = SmallRng::seed_from_u64(9);
    for _ in 0..12 {
        let position = Position::new(rng.gen_range(0..5), rng.gen_range(0..5));
        map.create_autotile_tile_at("walls", position, "wall").unwrap();
    }
    let before: Vec<(Position, Option<AtlasCoord>)> = map
        .get_layer("walls")
        .unwrap()
        .elements()
        .map(|(_, element)| (element.position, element.display()))
        .collect();

    for direction in Direction::ALL {
        assert!(map.expand_towards(direction, 3).is_some());
        let removed = map.reduce_towards(direction, 3).unwrap();
        assert_eq!(removed.len(), 15);
        assert_eq!(map.grid_size(), GridSize::new(5, 5));

        let after: Vec<(Position, Option<AtlasCoord>)> = map
            .get_layer("walls")
            .unwrap()
            .elements()
            .map(|(_, element)| (element.position, element.display()))
            .collect();
        assert_eq!(after, before, "layout changed after resizing towards {direction}");
    }
}

#[test]
fn tracer_stays_consistent_and_matches_a_fresh_trace() {
    let mut map = walls_map(10, 8);
    let tracer = BorderTracer::attach(&mut map, "walls", "wall").unwrap();
    let mut rng = SmallRng::seed_from_u64(1234);

    for step in 0..400 {
        let position = Position::new(rng.gen_range(0..10), rng.gen_range(0..8));
        let group = if rng.gen_bool(0.8) { "wall" } else { "water" };
        if rng.gen_bool(0.65) {
            map.create_autotile_tile_at("walls", position, group).unwrap();
        } else {
            map.remove_element_at("walls", position).unwrap();
        }
        assert!(tracer.borrow().is_consistent(), "inconsistent after step {step}");
    }

    let mut fresh = BorderTracer::new("walls", "wall");
    fresh.rebuild(map.get_layer("walls").unwrap()).unwrap();
    assert_eq!(tracer.borrow().sorted_lines(), fresh.sorted_lines());
}

#[test]
fn save_and_load_keep_layers_and_displays() {
    let mut map = walls_map(6, 4);
    map.add_layer(GridLayer::new("objects"), LayerPosition::End)
        .unwrap();
    for x in 0..4 {
        map.create_autotile_tile_at("walls", Position::new(x, 1), "wall")
            .unwrap();
    }
    map.create_tile_at("walls", Position::new(5, 3), AtlasCoord::new(4, 4))
        .unwrap();
    map.add_element(
        "objects",
        GridElement::marker("spawn", Position::new(2, 2)).with_unique(true),
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("level.json");
    save_map(&map, &path).unwrap();

    let rules = RuleTable::default_table().unwrap();
    let loaded = load_map(&path, &RecordRegistry::new(), &rules).unwrap();

    assert_eq!(loaded.grid_size(), map.grid_size());
    let names: Vec<&str> = loaded.layers().iter().map(GridLayer::name).collect();
    assert_eq!(names, vec!["walls", "objects"]);
    for x in 0..4 {
        assert_eq!(display_at(&loaded, x, 1), display_at(&map, x, 1));
    }
    assert_eq!(display_at(&loaded, 5, 3), Some(AtlasCoord::new(4, 4)));
    let spawn = loaded
        .get_layer("objects")
        .unwrap()
        .element_at(Position::new(2, 2))
        .unwrap()
        .unwrap();
    assert!(spawn.unique);
}

#[test]
fn out_of_bounds_insertion_is_an_error() {
    let mut map = walls_map(5, 5);
    let result = map.create_autotile_tile_at("walls", Position::new(5, 0), "wall");
    assert!(matches!(result, Err(GridError::PositionOutOfBounds { .. })));
    assert!(matches!(
        map.create_tile_at("missing", Position::new(0, 0), AtlasCoord::ZERO),
        Err(GridError::LayerNotFound(_))
    ));
}

#[test]
fn overwriting_a_wall_reverts_its_neighbors() {
    let mut map = walls_map(5, 5);
    map.create_autotile_tile_at("walls", Position::new(1, 2), "wall")
        .unwrap();
    assert_eq!(display_at(&map, 1, 2), Some(AtlasCoord::new(0, 1)));
    map.create_autotile_tile_at("walls", Position::new(2, 2), "wall")
        .unwrap();
    let connected = display_at(&map, 1, 2);
    assert_ne!(connected, Some(AtlasCoord::new(0, 1)));

    map.create_tile_at("walls", Position::new(2, 2), AtlasCoord::new(7, 7))
        .unwrap();
    assert_eq!(display_at(&map, 1, 2), Some(AtlasCoord::new(0, 1)));

    map.create_autotile_tile_at("walls", Position::new(2, 2), "wall")
        .unwrap();
    assert_eq!(display_at(&map, 1, 2), connected);

    map.create_autotile_tile_at("walls", Position::new(2, 2), "water")
        .unwrap();
    assert_eq!(display_at(&map, 1, 2), Some(AtlasCoord::new(0, 1)));
    assert_eq!(display_at(&map, 2, 2), Some(AtlasCoord::new(0, 1)));
}

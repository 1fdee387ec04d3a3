use std::sync::Arc;

use visceral_reclaimer_config::GameConfig;
use visceral_reclaimer_core::{BuildingKind, CellCoord, Command, Event};
use visceral_reclaimer_world::{self as world, query, World};

fn new_world() -> World {
    let config = GameConfig::builtin().expect("builtin config");
    World::new(Arc::new(config), 4).expect("world")
}

fn place_wall(world: &mut World, cell: CellCoord) {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::PlaceBuilding {
            kind: BuildingKind::new("WALL"),
            cell,
        },
        &mut events,
    );
    assert!(
        events
            .iter()
            .any(|event| matches!(event, Event::BuildingPlaced { .. })),
        "wall at {cell} was not placed"
    );
}

fn assert_adjacent_steps(start: CellCoord, path: &[CellCoord]) {
    let mut previous = start;
    for &cell in path {
        assert_eq!(previous.manhattan_distance(cell), 1, "{previous} -> {cell}");
        previous = cell;
    }
}

#[test]
fn open_grid_path_has_manhattan_length() {
    let world = new_world();
    let (columns, _) = query::grid_dimensions(&world);
    let core = query::core_cell(&world);
    let start = CellCoord::new(columns - 1, 0);

    let path = query::find_path(&world, start, core).expect("open grid has a path");

    assert_eq!(path.len() as u32, start.manhattan_distance(core));
    assert_eq!(path.last(), Some(&core));
    assert_adjacent_steps(start, &path);
}

#[test]
fn walled_core_is_reached_through_its_only_opening() {
    let mut world = new_world();
    let core = query::core_cell(&world);
    let north = CellCoord::new(core.column(), core.row() - 1);
    let east = CellCoord::new(core.column() + 1, core.row());
    let west = CellCoord::new(core.column() - 1, core.row());
    let south = CellCoord::new(core.column(), core.row() + 1);
    for cell in [north, east, west] {
        place_wall(&mut world, cell);
    }
    let (columns, _) = query::grid_dimensions(&world);
    let start = CellCoord::new(columns - 1, 0);

    let path = query::find_path(&world, start, core).expect("one opening remains");

    assert_eq!(path.last(), Some(&core));
    assert_eq!(path.iter().rev().nth(1), Some(&south));
    assert!(path
        .iter()
        .filter(|&&cell| cell != core)
        .all(|&cell| !query::is_cell_blocked(&world, cell)));
    assert_adjacent_steps(start, &path);
}

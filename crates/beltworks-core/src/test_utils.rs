//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::economy::Economy;
use crate::id::ItemId;
use crate::world::World;
use beltworks_spatial::{Direction, GridPosition, TileKind};
use std::collections::BTreeSet;
use std::fmt::Write as _;

// ===========================================================================
// Positions
// ===========================================================================

pub fn p(x: i32, y: i32) -> GridPosition {
    GridPosition::new(x, y)
}

// ===========================================================================
// Layout builders
// ===========================================================================

/// Place `len` conveyors from `start` heading `dir`, all facing `dir`.
pub fn place_line<E: Economy>(world: &mut World<E>, start: GridPosition, dir: Direction, len: u32) {
    let mut pos = start;
    for _ in 0..len {
        world.place_tile(pos, TileKind::Conveyor, dir);
        pos = pos.neighbor(dir);
    }
}

/// A west-to-east production line on row `y` starting at `x = 0`:
/// spawner, belts, crusher, belts, smelter, belts, sell-pad, with `gap`
/// conveyors in each belt run. Occupies `4 + 3 * gap` cells.
pub fn build_ore_line<E: Economy>(world: &mut World<E>, y: i32, gap: u32) {
    let mut x = 0;
    for kind in [TileKind::Spawner, TileKind::Crusher, TileKind::Smelter] {
        world.place_tile(p(x, y), kind, Direction::East);
        place_line(world, p(x + 1, y), Direction::East, gap);
        x += 1 + gap as i32;
    }
    world.place_tile(p(x, y), TileKind::SellPad, Direction::East);
}

/// `rows` stacked ore lines, each with `gap`-long belt runs.
pub fn build_line_grid(rows: u32, gap: u32) -> World {
    let mut world = World::new(4 + 3 * gap, rows);
    for y in 0..rows as i32 {
        build_ore_line(&mut world, y, gap);
    }
    world
}

// ===========================================================================
// Assertions
// ===========================================================================

/// Every id in an occupancy buffer is live, each appears once, and every
/// live item sits in exactly one buffer.
pub fn assert_no_orphans<E: Economy>(world: &World<E>) {
    let occupied = world.occupied_items();
    let unique: BTreeSet<ItemId> = occupied.iter().copied().collect();
    assert_eq!(unique.len(), occupied.len(), "an item id sits in two cells");
    for id in &occupied {
        assert!(world.item(*id).is_some(), "occupancy refers to dead item {id}");
    }
    let live: BTreeSet<ItemId> = world.items().iter().map(|item| item.id).collect();
    assert_eq!(live, unique, "registry and occupancy disagree");
}

// ===========================================================================
// Diagnostics
// ===========================================================================

/// One character per cell, top row first.
pub fn dump_grid<E: Economy>(world: &World<E>) -> String {
    let grid = world.grid();
    let mut out = String::new();
    for y in (0..grid.height() as i32).rev() {
        for x in 0..grid.width() as i32 {
            let pos = p(x, y);
            let c = match world.tile_at(pos) {
                TileKind::Empty => '.',
                TileKind::Conveyor => match world.rotation_at(pos) {
                    Direction::East => '>',
                    Direction::South => 'v',
                    Direction::West => '<',
                    Direction::North => '^',
                },
                TileKind::Splitter => 'S',
                TileKind::Merger => 'M',
                TileKind::SellPad => '$',
                TileKind::Spawner => '*',
                TileKind::Smelter => 'm',
                TileKind::Crusher => 'c',
                TileKind::Press => 'p',
                TileKind::Roller => 'r',
                TileKind::FilterLeftRight
                | TileKind::FilterForwardRight
                | TileKind::FilterForwardLeft => 'F',
            };
            out.push(c);
        }
        let _ = writeln!(out);
    }
    out
}

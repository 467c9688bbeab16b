//! Shared setup for the runnable examples.

use beltworks_core::economy::Economy;
use beltworks_core::world::World;
use beltworks_spatial::{Direction, GridPosition, TileKind};
use tracing_subscriber::EnvFilter;

/// Install a console subscriber filtered by `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Machines of the demo line, west to east.
pub const PLATE_LINE: [TileKind; 5] = [
    TileKind::Spawner,
    TileKind::Crusher,
    TileKind::Smelter,
    TileKind::Press,
    TileKind::SellPad,
];

/// Grid width needed for [`build_plate_line`] with `gap`-long belt runs.
pub fn plate_line_width(gap: u32) -> u32 {
    PLATE_LINE.len() as u32 + (PLATE_LINE.len() as u32 - 1) * gap
}

/// An ore → dust → ingot → plate line on row `y`, every machine facing
/// east with `gap` conveyors between neighbours.
pub fn build_plate_line<E: Economy>(world: &mut World<E>, y: i32, gap: u32) {
    let mut x = 0;
    for (i, kind) in PLATE_LINE.into_iter().enumerate() {
        world.place_tile(GridPosition::new(x, y), kind, Direction::East);
        x += 1;
        if i + 1 == PLATE_LINE.len() {
            break;
        }
        for _ in 0..gap {
            world.place_tile(GridPosition::new(x, y), TileKind::Conveyor, Direction::East);
            x += 1;
        }
    }
}

//! Sorting filter: ore and dust arrive on one belt and a filter splits them.
//!
//! A forward/left filter sends dust straight on and everything else left,
//! into separate sell-pads. Sales are logged per pad.
//!
//! Run with: `cargo run -p beltworks-examples --example sorting_filter`

use beltworks_core::entity::{Branch, BranchRule};
use beltworks_core::event::{Event, EventKind};
use beltworks_core::item::ItemType;
use beltworks_core::world::World;
use beltworks_examples::init_tracing;
use beltworks_spatial::{Direction, GridPosition, TileKind};
use tracing::info;

fn p(x: i32, y: i32) -> GridPosition {
    GridPosition::new(x, y)
}

fn main() {
    init_tracing();

    let mut world = World::new(6, 4);
    // Feed belt, filter at (2,1), forward run east, left run north.
    world.place_tile(p(0, 1), TileKind::Conveyor, Direction::East);
    world.place_tile(p(1, 1), TileKind::Conveyor, Direction::East);
    world.place_tile(p(2, 1), TileKind::FilterForwardLeft, Direction::East);
    world.place_tile(p(3, 1), TileKind::Conveyor, Direction::East);
    world.place_tile(p(4, 1), TileKind::SellPad, Direction::East);
    world.place_tile(p(2, 2), TileKind::Conveyor, Direction::North);
    world.place_tile(p(2, 3), TileKind::SellPad, Direction::East);

    let filter = p(2, 1);
    world.set_filter_rule(filter, Branch::Forward, BranchRule::Only(ItemType::Dust));
    world.set_filter_rule(filter, Branch::Left, BranchRule::Any);

    world.events_mut().on(
        EventKind::ItemSold,
        Box::new(|e| {
            if let Event::ItemSold { item_type, at, .. } = e {
                info!(item = item_type.name(), pad = ?at, "sold");
            }
        }),
    );

    for i in 0..8 {
        let item_type = if i % 2 == 0 { ItemType::Ore } else { ItemType::Dust };
        // Wait for the feed belt to clear its entry before adding the next.
        while world
            .spawn_item_on(p(0, 1), item_type, 1.0, Direction::West)
            .is_none()
        {
            world.step();
        }
        world.run_ticks(30);
    }
    world.run_ticks(300);

    info!(
        money = world.economy().balance(),
        in_flight = world.item_count(),
        "done"
    );
}

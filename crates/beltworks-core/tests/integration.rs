//! Behavioural tests for the individual machines, driven through `World`.

use beltworks_core::entity::{Branch, BranchRule, ConveyorShape, MergeVariant};
use beltworks_core::event::{Event, EventKind};
use beltworks_core::item::ItemType;
use beltworks_core::test_utils::*;
use beltworks_core::world::{Variant, World};
use beltworks_spatial::{Direction, GridPosition, TileKind};
use std::cell::RefCell;
use std::rc::Rc;

/// Collect the positions of every sale.
fn record_sales(world: &mut World) -> Rc<RefCell<Vec<(GridPosition, ItemType, f32)>>> {
    let sales = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&sales);
    world.events_mut().on(
        EventKind::ItemSold,
        Box::new(move |e| {
            if let Event::ItemSold {
                at,
                item_type,
                value,
                ..
            } = e
            {
                sink.borrow_mut().push((*at, *item_type, *value));
            }
        }),
    );
    sales
}

// ===========================================================================
// Processors
// ===========================================================================

#[test]
fn crusher_converts_ore_and_multiplies_value() {
    let mut world = World::new(3, 1);
    world.place_tile(p(0, 0), TileKind::Crusher, Direction::East);
    world.place_tile(p(1, 0), TileKind::Conveyor, Direction::East);
    world.place_tile(p(2, 0), TileKind::SellPad, Direction::East);
    let sales = record_sales(&mut world);

    let processed = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&processed);
    world.events_mut().on(
        EventKind::ItemProcessed,
        Box::new(move |e| {
            if let Event::ItemProcessed {
                machine, output, ..
            } = e
            {
                sink.borrow_mut().push((*machine, *output));
            }
        }),
    );

    world
        .spawn_item_on(p(0, 0), ItemType::Ore, 1.0, Direction::West)
        .unwrap();
    world.run_ticks(400);

    assert_eq!(*processed.borrow(), vec![(TileKind::Crusher, ItemType::Dust)]);
    let sales = sales.borrow();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].1, ItemType::Dust);
    assert!((sales[0].2 - 1.5).abs() < 1e-6);
    assert_eq!(world.item_count(), 0);
}

#[test]
fn processor_refuses_wrong_input() {
    let mut world = World::new(1, 1);
    world.place_tile(p(0, 0), TileKind::Smelter, Direction::East);
    assert!(
        world
            .spawn_item_on(p(0, 0), ItemType::Ore, 1.0, Direction::West)
            .is_none()
    );
    assert!(
        world
            .spawn_item_on(p(0, 0), ItemType::Dust, 1.0, Direction::West)
            .is_some()
    );
}

#[test]
fn processed_item_is_held_until_done() {
    let mut world = World::new(2, 1);
    world.place_tile(p(0, 0), TileKind::Smelter, Direction::East);
    world.place_tile(p(1, 0), TileKind::SellPad, Direction::East);
    let id = world
        .spawn_item_on(p(0, 0), ItemType::Dust, 1.0, Direction::West)
        .unwrap();

    // Reaches the process cell after two passes (five ticks at 24/s).
    world.run_ticks(60);
    assert_eq!(world.item_id_at(p(0, 0), 2, 2), Some(id));
    assert_eq!(world.item(id).unwrap().item_type, ItemType::Dust);

    world.run_ticks(120);
    assert!(world.item(id).is_none(), "ingot should have been sold");
}

// ===========================================================================
// Spawner and sell-pad
// ===========================================================================

#[test]
fn spawner_fires_on_interval_and_clamps_when_blocked() {
    let mut world = World::new(1, 1);
    world.place_tile(p(0, 0), TileKind::Spawner, Direction::East);

    world.run_ticks(44);
    assert_eq!(world.item_count(), 0);
    world.step();
    assert_eq!(world.item_count(), 1);

    // Nowhere to go: exit, tail and spawn cell fill, then nothing more.
    world.run_ticks(600);
    assert_eq!(world.item_count(), 3);
    assert_no_orphans(&world);
}

#[test]
fn sell_pad_accepts_from_every_edge() {
    let mut world = World::new(3, 3);
    world.place_tile(p(1, 1), TileKind::SellPad, Direction::East);
    let feeders = [
        (p(0, 1), Direction::East),
        (p(2, 1), Direction::West),
        (p(1, 0), Direction::North),
        (p(1, 2), Direction::South),
    ];
    for (pos, facing) in feeders {
        world.place_tile(pos, TileKind::Conveyor, facing);
    }
    let start = world.economy().balance();
    for (pos, facing) in feeders {
        world
            .spawn_item_on(pos, ItemType::Ore, 1.0, facing.opposite())
            .unwrap();
    }
    world.run_ticks(60);
    assert_eq!(world.item_count(), 0);
    assert!((world.economy().balance() - start - 4.0).abs() < 1e-9);
}

// ===========================================================================
// Conveyors
// ===========================================================================

#[test]
fn turned_conveyor_carries_side_input() {
    let mut world = World::new(5, 5);
    world.place_tile(p(3, 2), TileKind::SellPad, Direction::East);
    world.place_tile(p(2, 2), TileKind::Conveyor, Direction::East);
    world.place_tile(p(2, 3), TileKind::Conveyor, Direction::South);
    assert_eq!(world.shape_at(p(2, 2)), Some(ConveyorShape::TurnLeft));

    let sales = record_sales(&mut world);
    world
        .spawn_item_on(p(2, 3), ItemType::Ore, 1.0, Direction::North)
        .unwrap();
    world.run_ticks(60);
    assert_eq!(sales.borrow().len(), 1);
    assert_eq!(sales.borrow()[0].0, p(3, 2));
}

#[test]
fn blocked_belt_queues_items_without_loss() {
    let mut world = World::new(2, 1);
    world.place_tile(p(0, 0), TileKind::Conveyor, Direction::East);
    world.place_tile(p(1, 0), TileKind::Conveyor, Direction::East);
    let mut spawned = 0;
    for _ in 0..40 {
        if world
            .spawn_item_on(p(0, 0), ItemType::Ore, 1.0, Direction::West)
            .is_some()
        {
            spawned += 1;
        }
        world.run_ticks(3);
    }
    // Each straight belt holds five items along its lane.
    assert_eq!(world.item_count(), spawned);
    assert_eq!(world.entity_at(p(1, 0)).unwrap().item_count(), 5);
    assert_eq!(world.entity_at(p(0, 0)).unwrap().item_count(), 5);
    assert_no_orphans(&world);
}

// ===========================================================================
// Splitters and filters
// ===========================================================================

/// Splitter at (2,2) facing east, fed from (1,2), with belts leading north
/// and south into sell-pads.
fn splitter_fixture() -> World {
    let mut world = World::new(5, 5);
    world.place_tile(p(2, 4), TileKind::SellPad, Direction::East);
    world.place_tile(p(2, 0), TileKind::SellPad, Direction::East);
    world.place_tile(p(2, 3), TileKind::Conveyor, Direction::North);
    world.place_tile(p(2, 1), TileKind::Conveyor, Direction::South);
    world.place_tile(p(1, 2), TileKind::Conveyor, Direction::East);
    world.place_tile(p(2, 2), TileKind::Conveyor, Direction::East);
    world
}

#[test]
fn splitter_alternates_between_branches() {
    let mut world = splitter_fixture();
    assert_eq!(world.tile_at(p(2, 2)), TileKind::Splitter);
    let sales = record_sales(&mut world);

    for _ in 0..4 {
        world
            .spawn_item_on(p(1, 2), ItemType::Ore, 1.0, Direction::West)
            .unwrap();
        world.run_ticks(90);
    }
    let at: Vec<GridPosition> = sales.borrow().iter().map(|s| s.0).collect();
    assert_eq!(at, vec![p(2, 4), p(2, 0), p(2, 4), p(2, 0)]);
}

/// Filter at (2,2) facing east with belts leading north and south.
fn filter_fixture(kind: TileKind) -> World {
    let mut world = World::new(5, 5);
    world.place_tile(p(2, 2), kind, Direction::East);
    world.place_tile(p(2, 3), TileKind::Conveyor, Direction::North);
    world.place_tile(p(2, 1), TileKind::Conveyor, Direction::South);
    world
}

#[test]
fn filter_routes_only_to_matching_branch() {
    let mut world = filter_fixture(TileKind::FilterLeftRight);
    let f = p(2, 2);
    world.set_filter_rule(f, Branch::Forward, BranchRule::Only(ItemType::Ore));
    world.set_filter_rule(f, Branch::Left, BranchRule::Block);
    world.set_filter_rule(f, Branch::Right, BranchRule::Any);

    let id = world
        .spawn_item_on(f, ItemType::Dust, 1.0, Direction::West)
        .unwrap();
    world.run_ticks(600);

    let south = world.entity_at(p(2, 1)).unwrap();
    assert!(south.contents().iter().any(|(_, held)| *held == id));
    assert_eq!(world.entity_at(p(2, 3)).unwrap().item_count(), 0);
}

#[test]
fn filter_toggle_flips_when_the_second_branch_takes_the_item() {
    let mut world = filter_fixture(TileKind::FilterLeftRight);
    let f = p(2, 2);
    world.set_filter_rule(f, Branch::Left, BranchRule::Block);
    world.set_filter_rule(f, Branch::Right, BranchRule::Any);

    world
        .spawn_item_on(f, ItemType::Dust, 1.0, Direction::West)
        .unwrap();
    world.run_ticks(300);
    assert_eq!(world.entity_at(p(2, 1)).unwrap().item_count(), 1);

    let save = world.to_save_data();
    let record = save
        .tiles
        .iter()
        .find(|r| (r.cx, r.cy) == (2, 2))
        .expect("routed filter differs from a fresh one");
    assert!(record.b0, "toggle flips after any routed item");
}

#[test]
fn filter_jams_until_a_rule_admits_the_item() {
    let mut world = filter_fixture(TileKind::FilterForwardLeft);
    let f = p(2, 2);
    assert_eq!(
        world.variant_at(f),
        Some(Variant::Split(beltworks_core::entity::SplitVariant::ForwardLeft))
    );
    world.set_filter_rule(f, Branch::Forward, BranchRule::Only(ItemType::Ore));
    world.set_filter_rule(f, Branch::Left, BranchRule::Block);

    let id = world
        .spawn_item_on(f, ItemType::Dust, 1.0, Direction::West)
        .unwrap();
    world.run_ticks(300);
    assert_eq!(world.item_id_at(f, 2, 2), Some(id));

    world.set_filter_rule(f, Branch::Left, BranchRule::Only(ItemType::Dust));
    world.run_ticks(60);
    assert_eq!(world.entity_at(f).unwrap().item_count(), 0);
    assert!(
        world
            .entity_at(p(2, 3))
            .unwrap()
            .contents()
            .iter()
            .any(|(_, held)| *held == id)
    );
}

// ===========================================================================
// Mergers
// ===========================================================================

#[test]
fn merger_drains_a_lane_its_variant_dropped() {
    let mut world = World::new(5, 5);
    world.place_tile(p(4, 2), TileKind::SellPad, Direction::East);
    world.place_tile(p(3, 2), TileKind::Conveyor, Direction::East);
    world.place_tile(p(1, 2), TileKind::Conveyor, Direction::East);
    world.place_tile(p(2, 3), TileKind::Conveyor, Direction::South);
    world.place_tile(p(2, 2), TileKind::Conveyor, Direction::East);
    let m = p(2, 2);
    assert_eq!(world.tile_at(m), TileKind::Merger);
    assert_eq!(world.variant_at(m), Some(Variant::Merge(MergeVariant::BackLeft)));

    let id = world
        .spawn_item_on(m, ItemType::Ore, 1.0, Direction::North)
        .unwrap();

    world.place_tile(p(2, 1), TileKind::Conveyor, Direction::North);
    assert_eq!(world.variant_at(m), Some(Variant::Merge(MergeVariant::BackLeft)));
    world.remove_tile(p(2, 3));
    assert_eq!(world.variant_at(m), Some(Variant::Merge(MergeVariant::BackRight)));
    assert!(world.item(id).is_some(), "variant change must not destroy items");

    let sales = record_sales(&mut world);
    world.run_ticks(120);
    assert_eq!(sales.borrow().len(), 1);
    assert!(world.item(id).is_none());
}

#[test]
fn merger_serves_both_inputs() {
    let mut world = World::new(5, 5);
    world.place_tile(p(4, 2), TileKind::SellPad, Direction::East);
    world.place_tile(p(3, 2), TileKind::Conveyor, Direction::East);
    world.place_tile(p(2, 3), TileKind::Conveyor, Direction::South);
    world.place_tile(p(2, 1), TileKind::Conveyor, Direction::North);
    world.place_tile(p(2, 2), TileKind::Conveyor, Direction::East);
    assert_eq!(world.variant_at(p(2, 2)), Some(Variant::Merge(MergeVariant::LeftRight)));
    let sales = record_sales(&mut world);

    world
        .spawn_item_on(p(2, 3), ItemType::Ore, 1.0, Direction::North)
        .unwrap();
    world
        .spawn_item_on(p(2, 1), ItemType::Dust, 1.0, Direction::South)
        .unwrap();
    world.run_ticks(120);

    let mut types: Vec<ItemType> = sales.borrow().iter().map(|s| s.1).collect();
    types.sort();
    assert_eq!(types, vec![ItemType::Ore, ItemType::Dust]);
}

//! Save/load round trips through bytes and through files on disk.

use beltworks_core::entity::{Branch, BranchRule, SplitVariant};
use beltworks_core::item::ItemType;
use beltworks_core::serialize::{SaveData, SaveError, decode, encode};
use beltworks_core::test_utils::*;
use beltworks_core::world::{Variant, World};
use beltworks_data::{DataLoadError, load_save_into, read_save_file, write_save_file};
use beltworks_spatial::{Direction, TileKind};
use proptest::prelude::*;
use std::path::PathBuf;

// ===========================================================================
// Fixtures
// ===========================================================================

/// An ore line that has been running long enough to hold items mid-belt and
/// mid-process, plus a configured filter.
fn populated_world() -> World {
    let mut world = World::new(10, 4);
    build_ore_line(&mut world, 0, 2);
    world.place_tile(p(4, 3), TileKind::FilterForwardLeft, Direction::North);
    world.set_filter_rule(p(4, 3), Branch::Forward, BranchRule::Only(ItemType::Plate));
    world.set_filter_rule(p(4, 3), Branch::Left, BranchRule::Block);
    world.run_ticks(500);
    world
}

fn temp_save_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("beltworks_it_{name}_{}.fgs", std::process::id()))
}

// ===========================================================================
// Byte round trips
// ===========================================================================

#[test]
fn empty_world_round_trips() {
    let world = World::new(7, 3);
    let save = world.to_save_data();
    assert_eq!(save, SaveData::empty(7, 3));
    assert_eq!(decode(&encode(&save)).unwrap(), save);

    let mut loaded = World::new(7, 3);
    loaded.load_bytes(&world.save_bytes()).unwrap();
    assert_eq!(loaded.to_save_data(), save);
    assert_eq!(loaded.item_count(), 0);
}

#[test]
fn populated_world_round_trips() {
    let world = populated_world();
    assert!(world.item_count() > 0);
    let save = world.to_save_data();
    assert_eq!(decode(&encode(&save)).unwrap(), save);

    let mut loaded = World::new(10, 4);
    loaded.load_bytes(&world.save_bytes()).unwrap();
    assert_eq!(loaded.to_save_data(), save);
    assert_eq!(loaded.item_count(), world.item_count());
    assert_eq!(loaded.items().next_id(), world.items().next_id());
    assert_eq!(
        loaded.filter_rule(p(4, 3), Branch::Forward),
        Some(BranchRule::Only(ItemType::Plate))
    );
    assert_eq!(
        loaded.variant_at(p(4, 3)),
        Some(Variant::Split(SplitVariant::ForwardLeft))
    );
    for id in world.occupied_items() {
        let (a, b) = (world.item(id).unwrap(), loaded.item(id).unwrap());
        assert_eq!(a.item_type, b.item_type);
        assert_eq!(a.value, b.value);
    }
    assert_no_orphans(&loaded);
}

#[test]
fn loaded_world_keeps_running() {
    let world = populated_world();
    let mut loaded = World::new(10, 4);
    loaded.load_bytes(&world.save_bytes()).unwrap();

    let before = loaded.economy().earned();
    loaded.run_ticks(1200);
    assert!(loaded.economy().earned() > before);
    assert_no_orphans(&loaded);
}

#[test]
fn load_replaces_previous_contents() {
    let source = World::new(4, 4);
    let mut target = World::new(4, 4);
    place_line(&mut target, p(0, 0), Direction::East, 4);
    target
        .spawn_item_on(p(0, 0), ItemType::Ore, 1.0, Direction::West)
        .unwrap();

    target.load_bytes(&source.save_bytes()).unwrap();
    assert_eq!(target.item_count(), 0);
    assert_eq!(target.entities().count(), 0);
}

// ===========================================================================
// Rejection
// ===========================================================================

#[test]
fn rejected_saves_leave_the_world_untouched() {
    let mut world = populated_world();
    let hash = world.state_hash();
    let good = world.save_bytes();

    let mut bad_magic = good.clone();
    bad_magic[0] ^= 0xFF;
    assert!(matches!(
        world.load_bytes(&bad_magic),
        Err(SaveError::InvalidMagic(_))
    ));

    let truncated = &good[..good.len() / 2];
    assert!(world.load_bytes(truncated).is_err());

    let other_size = World::new(3, 3).save_bytes();
    assert!(matches!(
        world.load_bytes(&other_size),
        Err(SaveError::DimensionMismatch { .. })
    ));

    assert_eq!(world.state_hash(), hash);
}

// ===========================================================================
// Files
// ===========================================================================

#[test]
fn save_file_round_trip_through_disk() {
    let path = temp_save_path("disk");
    let world = populated_world();
    write_save_file(&world, &path).unwrap();

    let save = read_save_file(&path).unwrap();
    assert_eq!(save, world.to_save_data());

    let mut loaded = World::new(10, 4);
    load_save_into(&mut loaded, &path).unwrap();
    assert_eq!(loaded.to_save_data(), save);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn missing_save_file_is_io_error() {
    let path = temp_save_path("missing");
    let _ = std::fs::remove_file(&path);
    let mut world = World::new(2, 2);
    assert!(matches!(
        load_save_into(&mut world, &path),
        Err(DataLoadError::Io(_))
    ));
}

// ===========================================================================
// Property: arbitrary edit histories survive a round trip
// ===========================================================================

const KINDS: [TileKind; 8] = [
    TileKind::Conveyor,
    TileKind::Conveyor,
    TileKind::Spawner,
    TileKind::Crusher,
    TileKind::Smelter,
    TileKind::SellPad,
    TileKind::FilterLeftRight,
    TileKind::Press,
];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn random_factories_round_trip(
        edits in proptest::collection::vec((0..6i32, 0..6i32, 0..KINDS.len(), 0..4u8), 1..30),
        ticks in 0..400u64,
    ) {
        let mut world = World::new(6, 6);
        for (x, y, kind, rot) in edits {
            let dir = Direction::from_rotation(rot).unwrap_or(Direction::East);
            world.place_tile(p(x, y), KINDS[kind], dir);
        }
        world.run_ticks(ticks);

        let save = world.to_save_data();
        let mut loaded = World::new(6, 6);
        prop_assert!(loaded.load_bytes(&encode(&save)).is_ok());
        prop_assert_eq!(loaded.to_save_data(), save);
        prop_assert_eq!(loaded.item_count(), world.item_count());
    }
}

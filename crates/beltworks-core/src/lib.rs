//! Beltworks Core -- a deterministic tile-grid logistics simulation.
//!
//! Belts, splitters, mergers, filters and processing machines move discrete
//! items across a 2D grid. Each occupied cell carries a tile entity with a
//! private 5x5 sub-cell buffer; items are owned by a central registry and
//! handed between entities by id.
//!
//! # Tick
//!
//! [`world::World::step`] advances one fixed tick (1/60 s by default):
//! every entity steps in row-major scan order, then buffered events are
//! delivered. [`world::World::update`] converts real elapsed time into whole
//! ticks.
//!
//! # Editing
//!
//! [`world::World::place_tile`] and [`world::World::remove_tile`] rebuild the
//! affected entity and rerun [`topology`] inference, which rewrites belts
//! into splitters and mergers and picks their variants and shapes from
//! neighbour connectivity.
//!
//! # Key Types
//!
//! - [`world::World`] -- grid, entities, items, clock, events, economy.
//! - [`entity::TileEntity`] -- one machine: conveyor, splitter, filter,
//!   merger, processor, spawner or sell-pad.
//! - [`item::ItemRegistry`] -- every live item, keyed by [`id::ItemId`].
//! - [`event::EventBus`] -- buffered, passive event delivery.
//! - [`config::SimConfig`] -- speeds, recipes, costs, tick rate.
//! - [`serialize`] -- the compact binary save format.

pub mod config;
pub mod economy;
pub mod entity;
pub mod event;
pub mod fixed;
pub mod id;
pub mod item;
pub mod serialize;
pub mod sim;
pub mod topology;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

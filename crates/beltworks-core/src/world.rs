//! The world simulation: owns the grid, the entity slots, the item registry
//! and the tick clock.
//!
//! # Architecture
//!
//! The `World` owns:
//! - A [`Grid`] of tile kinds and rotations
//! - One optional [`TileEntity`] per grid cell, parallel to the grid
//! - The [`ItemRegistry`] (every live item; entities hold ids only)
//! - A [`SimState`] (tick counter, real-time accumulator)
//! - An [`EventBus`] and an [`Economy`]
//!
//! # Tick
//!
//! Each tick increments the counter, then steps every entity in row-major
//! order (`y` outer, `x` inner), then delivers buffered events. The stepping
//! entity is taken out of its slot for the duration of its step so it can
//! hand items to neighbours through the shared slot array.
//!
//! # Editing
//!
//! Placement and removal are the only entry points that change the grid.
//! Both end with topology inference, which receives a `Layout`: a narrow
//! mutation capability whose `rebuild` is the one path that replaces an
//! entity during editing.

use crate::config::{ConfigError, SimConfig};
use crate::economy::{Economy, Wallet};
use crate::entity::{
    Branch, BranchRule, ConveyorShape, MergeVariant, SplitVariant, SubCell, TickContext,
    TileEntity,
};
use crate::event::{Event, EventBus};
use crate::fixed::{Fixed64, Ticks, f64_to_fixed64};
use crate::id::ItemId;
use crate::item::{Item, ItemRegistry, ItemType};
use crate::serialize::{ItemRecord, SaveData, SaveError, decode, encode};
use crate::sim::{AdvanceResult, SimState, StateHash};
use crate::topology::{self, InferenceReport};
use beltworks_spatial::{Direction, Grid, GridPosition, TileKind};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of a placement attempt. Refusals are expected conditions, not
/// errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    /// Placed; carries the kind after automatic upgrades.
    Placed(TileKind),
    OutOfBounds,
    Occupied,
    /// The kind cannot be placed by hand.
    NotPlaceable,
    InsufficientFunds,
}

impl PlaceOutcome {
    pub fn is_placed(self) -> bool {
        matches!(self, PlaceOutcome::Placed(_))
    }
}

/// Variant state of a splitter, filter or merger, for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Split(SplitVariant),
    Merge(MergeVariant),
}

// ---------------------------------------------------------------------------
// Layout capability
// ---------------------------------------------------------------------------

/// Mutable view of the grid and entity slots handed to topology inference.
/// Reads are unrestricted; writes go through tile, shape and variant setters.
pub(crate) struct Layout<'a> {
    grid: &'a mut Grid,
    entities: &'a mut [Option<TileEntity>],
    items: &'a mut ItemRegistry,
    config: &'a SimConfig,
}

impl Layout<'_> {
    pub fn grid(&self) -> &Grid {
        self.grid
    }

    pub fn tile(&self, pos: GridPosition) -> TileKind {
        self.grid.tile(pos)
    }

    pub fn entity(&self, pos: GridPosition) -> Option<&TileEntity> {
        let idx = self.grid.index(pos)?;
        self.entities[idx].as_ref()
    }

    fn entity_mut(&mut self, pos: GridPosition) -> Option<&mut TileEntity> {
        let idx = self.grid.index(pos)?;
        self.entities[idx].as_mut()
    }

    /// Rewrite the kind at `pos`, keeping its rotation, and rebuild the
    /// entity. Returns `false` if nothing changed.
    pub fn set_tile(&mut self, pos: GridPosition, kind: TileKind) -> bool {
        if !self.grid.in_bounds(pos) || self.grid.tile(pos) == kind {
            return false;
        }
        if self.grid.set_kind(pos, kind).is_err() {
            return false;
        }
        self.rebuild(pos);
        true
    }

    pub fn set_conveyor_shape(&mut self, pos: GridPosition, shape: ConveyorShape) -> bool {
        self.entity_mut(pos).is_some_and(|e| e.set_shape(shape))
    }

    pub fn set_split_variant(&mut self, pos: GridPosition, variant: SplitVariant) -> bool {
        self.entity_mut(pos)
            .is_some_and(|e| e.set_split_variant(variant))
    }

    pub fn set_merge_variant(&mut self, pos: GridPosition, variant: MergeVariant) -> bool {
        self.entity_mut(pos)
            .is_some_and(|e| e.set_merge_variant(variant))
    }

    /// Replace the entity at `pos` with a fresh one built from the grid,
    /// destroying whatever the old one carried.
    pub fn rebuild(&mut self, pos: GridPosition) {
        let Some(idx) = self.grid.index(pos) else {
            return;
        };
        let destroyed = self.entities[idx]
            .take()
            .map_or(0, |mut old| old.destroy_contained_items(self.items));
        let kind = self.grid.tile(pos);
        self.entities[idx] = TileEntity::new(pos, kind, self.grid.rotation(pos), self.config);
        debug!(?pos, kind = kind.name(), destroyed, "rebuilt tile entity");
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct World<E: Economy = Wallet> {
    grid: Grid,
    entities: Vec<Option<TileEntity>>,
    items: ItemRegistry,
    sim: SimState,
    events: EventBus,
    economy: E,
    config: SimConfig,
}

impl World<Wallet> {
    /// An empty world with default configuration and a starting wallet.
    pub fn new(width: u32, height: u32) -> Self {
        let config = SimConfig::default();
        let wallet = Wallet::new(config.economy.starting_money);
        Self::build(width, height, config, wallet)
    }

    /// An empty world with a validated configuration.
    pub fn with_config(width: u32, height: u32, config: SimConfig) -> Result<Self, ConfigError> {
        let wallet = Wallet::new(config.economy.starting_money);
        Self::with_economy(width, height, config, wallet)
    }
}

impl<E: Economy> World<E> {
    /// An empty world backed by a caller-supplied economy.
    pub fn with_economy(
        width: u32,
        height: u32,
        config: SimConfig,
        economy: E,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(width, height, config, economy))
    }

    fn build(width: u32, height: u32, config: SimConfig, economy: E) -> Self {
        let grid = Grid::new(width, height);
        let mut entities = Vec::new();
        entities.resize_with(grid.cell_count(), || None);
        Self {
            grid,
            entities,
            items: ItemRegistry::new(),
            sim: SimState::new(),
            events: EventBus::new(config.event_buffer_capacity),
            economy,
            config,
        }
    }

    fn layout(&mut self) -> Layout<'_> {
        Layout {
            grid: &mut self.grid,
            entities: &mut self.entities,
            items: &mut self.items,
            config: &self.config,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn tick(&self) -> Ticks {
        self.sim.tick
    }

    pub fn sim_state(&self) -> &SimState {
        &self.sim
    }

    pub fn economy(&self) -> &E {
        &self.economy
    }

    pub fn economy_mut(&mut self) -> &mut E {
        &mut self.economy
    }

    /// The event bus, for subscribing and suppressing.
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn items(&self) -> &ItemRegistry {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn tile_at(&self, pos: GridPosition) -> TileKind {
        self.grid.tile(pos)
    }

    pub fn rotation_at(&self, pos: GridPosition) -> Direction {
        self.grid.rotation(pos)
    }

    pub fn entity_at(&self, pos: GridPosition) -> Option<&TileEntity> {
        let idx = self.grid.index(pos)?;
        self.entities[idx].as_ref()
    }

    /// Every entity in scan order.
    pub fn entities(&self) -> impl Iterator<Item = &TileEntity> {
        self.entities.iter().flatten()
    }

    pub fn shape_at(&self, pos: GridPosition) -> Option<ConveyorShape> {
        self.entity_at(pos)?.shape()
    }

    pub fn variant_at(&self, pos: GridPosition) -> Option<Variant> {
        let entity = self.entity_at(pos)?;
        entity
            .split_variant()
            .map(Variant::Split)
            .or_else(|| entity.merge_variant().map(Variant::Merge))
    }

    /// Item at world-frame sub-cell `(u, v)` of the tile at `pos`.
    pub fn item_id_at(&self, pos: GridPosition, u: u8, v: u8) -> Option<ItemId> {
        self.entity_at(pos)?.item_id_at(SubCell::new(u, v))
    }

    /// Every item id referenced by any occupancy buffer, in scan order.
    pub fn occupied_items(&self) -> Vec<ItemId> {
        self.entities()
            .flat_map(|e| e.contents().into_iter().map(|(_, id)| id))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Ticking
    // -----------------------------------------------------------------------

    /// Accumulate `dt` seconds of real time and run every whole tick that
    /// fits. Non-finite or negative `dt` is ignored.
    pub fn update(&mut self, dt: f64) -> AdvanceResult {
        let mut result = AdvanceResult::default();
        if !dt.is_finite() || dt <= 0.0 {
            return result;
        }
        let step: Fixed64 = f64_to_fixed64(1.0 / f64::from(self.config.tick_rate));
        self.sim.accumulator = self
            .sim
            .accumulator
            .saturating_add(Fixed64::saturating_from_num(dt));
        while self.sim.accumulator >= step {
            self.sim.accumulator -= step;
            self.tick_once();
            result.steps_run += 1;
        }
        result
    }

    /// Run exactly one tick.
    pub fn step(&mut self) -> AdvanceResult {
        self.tick_once();
        AdvanceResult { steps_run: 1 }
    }

    /// Run `n` ticks.
    pub fn run_ticks(&mut self, n: u64) -> AdvanceResult {
        for _ in 0..n {
            self.tick_once();
        }
        AdvanceResult { steps_run: n }
    }

    fn tick_once(&mut self) {
        self.sim.tick += 1;
        let tick = self.sim.tick;
        for idx in 0..self.entities.len() {
            let Some(mut entity) = self.entities[idx].take() else {
                continue;
            };
            let mut ctx = TickContext {
                tick,
                items: &mut self.items,
                events: &mut self.events,
                economy: &mut self.economy,
                grid: &self.grid,
                entities: &mut self.entities,
            };
            entity.step(&mut ctx);
            self.entities[idx] = Some(entity);
        }
        self.events.deliver();
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Place `kind` at `pos` without charging, replacing whatever was there.
    /// A conveyor may be upgraded to a splitter or merger on the spot, and
    /// the neighbourhood is re-inferred afterwards.
    pub fn place_tile(
        &mut self,
        pos: GridPosition,
        kind: TileKind,
        facing: Direction,
    ) -> PlaceOutcome {
        if !self.grid.in_bounds(pos) {
            return PlaceOutcome::OutOfBounds;
        }
        if kind == TileKind::Empty {
            return PlaceOutcome::NotPlaceable;
        }
        // The placement-time upgrade only looks at neighbours, so it is
        // decided before the cell is written.
        let kind = if kind == TileKind::Conveyor {
            let decided = topology::decide_auto_tile_for_conveyor(&self.layout(), pos, facing);
            if decided != kind {
                debug!(?pos, from = kind.name(), to = decided.name(), "auto-tile at placement");
            }
            decided
        } else {
            kind
        };
        if self.grid.set(pos, kind, facing).is_err() {
            return PlaceOutcome::OutOfBounds;
        }
        self.layout().rebuild(pos);
        self.refresh_topology();

        let placed = self.grid.tile(pos);
        self.events.emit(Event::TilePlaced {
            kind: placed,
            at: pos,
            tick: self.sim.tick,
        });
        self.events.deliver();
        PlaceOutcome::Placed(placed)
    }

    /// Pay for and place a tile. Only empty cells and hand-placeable kinds
    /// are accepted.
    pub fn buy_tile(&mut self, pos: GridPosition, kind: TileKind, facing: Direction) -> PlaceOutcome {
        if !self.grid.in_bounds(pos) {
            return PlaceOutcome::OutOfBounds;
        }
        let Some(cost) = self.config.placement_cost(kind) else {
            return PlaceOutcome::NotPlaceable;
        };
        if self.grid.tile(pos) != TileKind::Empty {
            return PlaceOutcome::Occupied;
        }
        if !self.economy.try_spend_money(cost) {
            return PlaceOutcome::InsufficientFunds;
        }
        self.place_tile(pos, kind, facing)
    }

    /// Clear the tile at `pos`, destroying its items. Returns the removed kind.
    pub fn remove_tile(&mut self, pos: GridPosition) -> Option<TileKind> {
        let kind = self.grid.tile(pos);
        if kind == TileKind::Empty {
            return None;
        }
        let idx = self.grid.index(pos)?;
        if let Some(mut old) = self.entities[idx].take() {
            let destroyed = old.destroy_contained_items(&mut self.items);
            debug!(?pos, kind = kind.name(), destroyed, "removed tile");
        }
        self.grid.set(pos, TileKind::Empty, Direction::East).ok()?;
        self.refresh_topology();

        self.events.emit(Event::TileRemoved {
            kind,
            at: pos,
            tick: self.sim.tick,
        });
        self.events.deliver();
        Some(kind)
    }

    /// Remove a tile and refund part of its cost.
    pub fn sell_tile(&mut self, pos: GridPosition) -> Option<TileKind> {
        let kind = self.remove_tile(pos)?;
        let refund = self.config.refund_for(kind);
        if refund > 0.0 {
            self.economy.add_money(refund);
        }
        Some(kind)
    }

    /// Run topology inference over the whole grid.
    pub fn refresh_topology(&mut self) -> InferenceReport {
        let max_passes = self.config.max_inference_passes;
        topology::refresh(&mut self.layout(), max_passes)
    }

    /// Create an item directly on the tile at `pos` as if it had arrived
    /// from `from`. Returns `None` if the tile cannot take it.
    pub fn spawn_item_on(
        &mut self,
        pos: GridPosition,
        item_type: ItemType,
        value: f32,
        from: Direction,
    ) -> Option<ItemId> {
        let idx = self.grid.index(pos)?;
        let entity = self.entities[idx].as_mut()?;
        if !entity.can_accept(item_type, from) {
            return None;
        }
        let id = self.items.create(item_type, value);
        let item = self.items.get_mut(id)?;
        entity.accept(item, from, self.sim.tick);
        Some(id)
    }

    pub fn filter_rule(&self, pos: GridPosition, branch: Branch) -> Option<BranchRule> {
        self.entity_at(pos)?
            .filter_rules()
            .map(|rules| rules[branch.index()])
    }

    /// Set one branch rule of the filter at `pos`.
    pub fn set_filter_rule(&mut self, pos: GridPosition, branch: Branch, rule: BranchRule) -> bool {
        let Some(filter) = self
            .grid
            .index(pos)
            .and_then(|idx| self.entities[idx].as_mut())
            .and_then(TileEntity::filter_mut)
        else {
            return false;
        };
        filter.set_rule(branch, rule);
        true
    }

    /// Step a branch rule `delta` places around its ring. Returns the new rule.
    pub fn cycle_filter_rule(
        &mut self,
        pos: GridPosition,
        branch: Branch,
        delta: i32,
    ) -> Option<BranchRule> {
        let filter = self
            .grid
            .index(pos)
            .and_then(|idx| self.entities[idx].as_mut())
            .and_then(TileEntity::filter_mut)?;
        let rule = filter.rule(branch).cycle(delta);
        filter.set_rule(branch, rule);
        Some(rule)
    }

    // -----------------------------------------------------------------------
    // Hashing
    // -----------------------------------------------------------------------

    /// Hash of grid, entity state, occupancy and items. Equal for two worlds
    /// that will evolve identically.
    pub fn state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u32(self.grid.width());
        h.write_u32(self.grid.height());
        h.write_u64(self.sim.tick);
        for (kind, rot) in self.grid.cells() {
            h.write(&[kind.id(), rot.rotation()]);
        }
        for entity in self.entities() {
            entity.hash_into(&mut h, self.config.tick_rate);
        }
        h.write_u32(self.items.next_id());
        for item in self.items.iter() {
            h.write_u32(item.id.0);
            h.write(&[item.item_type.save_id()]);
            h.write_u32(item.value.to_bits());
            h.write_u64(item.entered_tick.unwrap_or(u64::MAX));
        }
        h.finish()
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Project the world into save records. Tile records are written only
    /// where an entity differs from a freshly built one.
    pub fn to_save_data(&self) -> SaveData {
        let tick_rate = self.config.tick_rate;
        let mut tiles = Vec::new();
        let mut items = Vec::new();
        for entity in self.entities() {
            let record = entity.write_save(tick_rate);
            let baseline = TileEntity::new(entity.pos(), entity.kind(), entity.facing(), &self.config)
                .map(|fresh| fresh.write_save(tick_rate));
            if baseline != Some(record) {
                tiles.push(record);
            }
            for (cell, id) in entity.contents() {
                let Some(item) = self.items.get(id) else {
                    continue;
                };
                items.push(ItemRecord {
                    id: id.0,
                    type_id: item.item_type.save_id(),
                    value: item.value,
                    cx: entity.pos().x as u32,
                    cy: entity.pos().y as u32,
                    u: cell.u,
                    v: cell.v,
                });
            }
        }
        SaveData {
            width: self.grid.width(),
            height: self.grid.height(),
            cells: self.grid.cells().collect(),
            next_item_id: self.items.next_id(),
            tiles,
            items,
        }
    }

    /// Replace the world's contents with a save. Validation happens before
    /// any mutation, so a rejected save leaves the world untouched. No
    /// inference runs: variants and shapes come from the tile records.
    pub fn apply_save(&mut self, save: &SaveData) -> Result<(), SaveError> {
        if save.width != self.grid.width() || save.height != self.grid.height() {
            return Err(SaveError::DimensionMismatch {
                expected_w: self.grid.width(),
                expected_h: self.grid.height(),
                found_w: save.width,
                found_h: save.height,
            });
        }
        if save.cells.len() != self.grid.cell_count() {
            return Err(SaveError::InvalidDimensions(save.width, save.height));
        }

        self.items.clear();
        for (idx, &(kind, facing)) in save.cells.iter().enumerate() {
            let pos = self.grid.position(idx);
            if self.grid.set(pos, kind, facing).is_ok() {
                self.entities[idx] = TileEntity::new(pos, kind, facing, &self.config);
            }
        }

        let tick_rate = self.config.tick_rate;
        for record in &save.tiles {
            let pos = GridPosition::new(record.cx as i32, record.cy as i32);
            match self
                .grid
                .index(pos)
                .and_then(|idx| self.entities[idx].as_mut())
            {
                Some(entity) => entity.read_save(record, tick_rate),
                None => warn!(?pos, "tile record without an entity, skipping"),
            }
        }

        let mut restored = 0usize;
        for record in &save.items {
            if self.restore_item(record) {
                restored += 1;
            }
        }
        self.items.set_next_id(save.next_item_id);
        self.sim.accumulator = Fixed64::ZERO;

        info!(
            width = save.width,
            height = save.height,
            tiles = self.grid.occupied_count(),
            items = restored,
            skipped = save.items.len() - restored,
            "applied save"
        );
        Ok(())
    }

    fn restore_item(&mut self, record: &ItemRecord) -> bool {
        let id = ItemId(record.id);
        let pos = GridPosition::new(record.cx as i32, record.cy as i32);
        let Some(item_type) = ItemType::from_save_id(record.type_id) else {
            warn!(item = %id, type_id = record.type_id, "unknown item type in save, skipping");
            return false;
        };
        if self.items.contains(id) {
            warn!(item = %id, "duplicate item id in save, skipping");
            return false;
        }
        let Some(entity) = self
            .grid
            .index(pos)
            .and_then(|idx| self.entities[idx].as_mut())
        else {
            warn!(item = %id, ?pos, "item outside any tile in save, skipping");
            return false;
        };
        if !entity.place_restored(SubCell::new(record.u, record.v), id) {
            warn!(item = %id, ?pos, u = record.u, v = record.v, "item sub-cell invalid or taken, skipping");
            return false;
        }
        self.items.restore(Item::new(id, item_type, record.value))
    }

    /// Encode the world to the binary save format.
    pub fn save_bytes(&self) -> Vec<u8> {
        encode(&self.to_save_data())
    }

    /// Decode and apply a binary save. On error the world is unchanged.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<(), SaveError> {
        let save = decode(bytes)?;
        self.apply_save(&save)
    }
}

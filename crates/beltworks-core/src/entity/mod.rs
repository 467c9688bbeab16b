//! Tile entities: one behavioural state machine per occupied cell.
//!
//! Every entity owns a private 5x5 sub-cell [`Occupancy`] buffer holding
//! item ids (never items). All geometry is written in the tile's own
//! east-facing frame, where `(0,2)` is the back edge and `(4,2)` the front
//! edge, and mapped to world frame through [`rotate_uv`].
//!
//! The concrete machines form a closed set ([`Behavior`]) dispatched by
//! `match`; the shared contract is the crate-private [`TileBehavior`]
//! trait. [`TileEntity`] pairs a behaviour with its [`Frame`] (position,
//! facing, occupancy and movement accumulator).
//!
//! # Movement
//!
//! Each tick a frame adds its speed (sub-cells per tick, fixed-point) to an
//! accumulator; every whole unit is one discrete shift pass. Items that
//! entered a tile on the current tick never move again that tick, which
//! keeps a single item from crossing several tiles in one step.

pub mod conveyor;
pub mod merger;
pub mod processor;
pub mod sellpad;
pub mod spawner;
pub mod splitter;

pub use conveyor::{Conveyor, ConveyorShape};
pub use merger::{MergeVariant, Merger};
pub use processor::Processor;
pub use sellpad::SellPad;
pub use spawner::Spawner;
pub use splitter::{Branch, BranchRule, Filter, SplitVariant, Splitter};

use crate::config::SimConfig;
use crate::economy::Economy;
use crate::event::EventBus;
use crate::fixed::{Fixed64, Ticks};
use crate::id::ItemId;
use crate::item::{Item, ItemRegistry, ItemType};
use crate::serialize::TileRecord;
use crate::sim::StateHash;
use beltworks_spatial::{Direction, Grid, GridPosition, TileKind};
use tracing::warn;

/// Sub-cells per tile edge.
pub const SUB_CELLS: u8 = 5;

// ---------------------------------------------------------------------------
// Sub-cell geometry
// ---------------------------------------------------------------------------

/// One of the 25 positions inside a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubCell {
    pub u: u8,
    pub v: u8,
}

impl SubCell {
    pub const fn new(u: u8, v: u8) -> Self {
        Self { u, v }
    }

    pub fn is_valid(self) -> bool {
        self.u < SUB_CELLS && self.v < SUB_CELLS
    }
}

/// Map a sub-cell from a tile's east-facing frame into world frame.
pub fn rotate_uv(cell: SubCell, facing: Direction) -> SubCell {
    let m = SUB_CELLS - 1;
    let SubCell { u, v } = cell;
    match facing {
        Direction::East => SubCell::new(u, v),
        Direction::South => SubCell::new(v, m - u),
        Direction::West => SubCell::new(m - u, m - v),
        Direction::North => SubCell::new(m - v, u),
    }
}

/// Inverse of [`rotate_uv`]: world frame back to the tile's own frame.
pub fn unrotate_uv(cell: SubCell, facing: Direction) -> SubCell {
    let inverse = match facing {
        Direction::South => Direction::North,
        Direction::North => Direction::South,
        other => other,
    };
    rotate_uv(cell, inverse)
}

/// An edge of a tile relative to its facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Front,
    Left,
    Back,
    Right,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Front, Side::Left, Side::Back, Side::Right];

    /// Which side of a tile facing `facing` lies toward world direction `edge`.
    pub fn of(edge: Direction, facing: Direction) -> Side {
        if edge == facing {
            Side::Front
        } else if edge == facing.left() {
            Side::Left
        } else if edge == facing.opposite() {
            Side::Back
        } else {
            Side::Right
        }
    }

    /// World direction of this side for a tile facing `facing`.
    pub fn toward(self, facing: Direction) -> Direction {
        match self {
            Side::Front => facing,
            Side::Left => facing.left(),
            Side::Back => facing.opposite(),
            Side::Right => facing.right(),
        }
    }

    /// The middle sub-cell on this edge, in the tile's own frame.
    pub fn edge_cell(self) -> SubCell {
        match self {
            Side::Front => SubCell::new(4, 2),
            Side::Left => SubCell::new(2, 4),
            Side::Back => SubCell::new(0, 2),
            Side::Right => SubCell::new(2, 0),
        }
    }
}

// ---------------------------------------------------------------------------
// Occupancy
// ---------------------------------------------------------------------------

/// 5x5 item-id buffer in the tile's own frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Occupancy {
    cells: [[Option<ItemId>; SUB_CELLS as usize]; SUB_CELLS as usize],
}

impl Occupancy {
    pub fn get(&self, cell: SubCell) -> Option<ItemId> {
        self.cells[cell.u as usize][cell.v as usize]
    }

    pub fn is_free(&self, cell: SubCell) -> bool {
        self.get(cell).is_none()
    }

    pub(crate) fn set(&mut self, cell: SubCell, id: ItemId) {
        self.cells[cell.u as usize][cell.v as usize] = Some(id);
    }

    pub(crate) fn take(&mut self, cell: SubCell) -> Option<ItemId> {
        self.cells[cell.u as usize][cell.v as usize].take()
    }

    /// Occupied cells in `u`-major order.
    pub fn iter(&self) -> impl Iterator<Item = (SubCell, ItemId)> + '_ {
        self.cells.iter().enumerate().flat_map(|(u, col)| {
            col.iter()
                .enumerate()
                .filter_map(move |(v, id)| id.map(|id| (SubCell::new(u as u8, v as u8), id)))
        })
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

// ---------------------------------------------------------------------------
// Tick context
// ---------------------------------------------------------------------------

/// Everything an entity may touch while stepping: the item registry, the
/// event bus, the economy, and the other entities (the stepping entity's
/// own slot is vacant for the duration of its step).
pub(crate) struct TickContext<'a> {
    pub tick: Ticks,
    pub items: &'a mut ItemRegistry,
    pub events: &'a mut EventBus,
    pub economy: &'a mut dyn Economy,
    pub grid: &'a Grid,
    pub entities: &'a mut [Option<TileEntity>],
}

impl TickContext<'_> {
    /// Hand item `id` to the entity at `target`, arriving from `from`.
    fn transfer(&mut self, id: ItemId, target: GridPosition, from: Direction) -> bool {
        let Some(idx) = self.grid.index(target) else {
            return false;
        };
        let Some(neighbor) = self.entities[idx].as_mut() else {
            return false;
        };
        let Some(item) = self.items.get_mut(id) else {
            return false;
        };
        if !neighbor.can_accept(item.item_type, from) {
            return false;
        }
        neighbor.accept(item, from, self.tick);
        true
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// State shared by every entity kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pos: GridPosition,
    facing: Direction,
    occ: Occupancy,
    move_acc: Fixed64,
    speed: Fixed64,
}

impl Frame {
    fn new(pos: GridPosition, facing: Direction, speed: Fixed64) -> Self {
        Self {
            pos,
            facing,
            occ: Occupancy::default(),
            move_acc: Fixed64::ZERO,
            speed,
        }
    }

    pub fn pos(&self) -> GridPosition {
        self.pos
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    pub fn occupancy(&self) -> &Occupancy {
        &self.occ
    }

    /// Accumulate one tick of movement and return the whole passes earned.
    fn take_passes(&mut self) -> u32 {
        self.move_acc += self.speed;
        let whole = self.move_acc.int();
        self.move_acc -= whole;
        whole.to_num::<u32>()
    }

    /// The item at `cell` if it exists and may move this tick. A dangling id
    /// is cleared.
    pub(crate) fn ready_item(&mut self, cell: SubCell, ctx: &TickContext<'_>) -> Option<ItemId> {
        let id = self.occ.get(cell)?;
        match ctx.items.get(id) {
            None => {
                warn!(pos = ?self.pos, item = %id, "dangling item id in occupancy, clearing");
                self.occ.take(cell);
                None
            }
            Some(item) if item.entered_this_tick(ctx.tick) => None,
            Some(_) => Some(id),
        }
    }

    /// Move an item one sub-cell inside this tile.
    pub(crate) fn shift(&mut self, from: SubCell, to: SubCell, ctx: &TickContext<'_>) -> bool {
        let Some(id) = self.ready_item(from, ctx) else {
            return false;
        };
        if !self.occ.is_free(to) {
            return false;
        }
        self.occ.take(from);
        self.occ.set(to, id);
        true
    }

    /// Pass the item at `cell` to the neighbour across `side`, if it accepts.
    pub(crate) fn hand_off(&mut self, cell: SubCell, side: Side, ctx: &mut TickContext<'_>) -> bool {
        let Some(id) = self.ready_item(cell, ctx) else {
            return false;
        };
        let dir = side.toward(self.facing);
        if ctx.transfer(id, self.pos.neighbor(dir), dir.opposite()) {
            self.occ.take(cell);
            true
        } else {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Behaviour contract
// ---------------------------------------------------------------------------

/// The per-kind half of the entity contract.
pub(crate) trait TileBehavior {
    /// Entry sub-cell (own frame) for items arriving across `side`.
    fn entry_cell(&self, side: Side) -> Option<SubCell>;

    /// Item-type gate applied on top of a free entry cell.
    fn admits(&self, _item_type: ItemType) -> bool {
        true
    }

    /// Whether the logical output faces `side`. Independent of occupancy.
    fn outputs_to(&self, side: Side) -> bool;

    /// Advance one tick; `passes` is the number of whole sub-cell shifts
    /// earned this tick.
    fn step(&mut self, frame: &mut Frame, ctx: &mut TickContext<'_>, passes: u32);

    fn write_save(&self, record: &mut TileRecord, tick_rate: u32);

    fn read_save(&mut self, record: &TileRecord, tick_rate: u32);
}

/// The closed set of machines.
#[derive(Debug, Clone, PartialEq)]
pub enum Behavior {
    Conveyor(Conveyor),
    Splitter(Splitter),
    Filter(Filter),
    Merger(Merger),
    Processor(Processor),
    Spawner(Spawner),
    SellPad(SellPad),
}

macro_rules! dispatch {
    ($behavior:expr, $b:ident => $body:expr) => {
        match $behavior {
            Behavior::Conveyor($b) => $body,
            Behavior::Splitter($b) => $body,
            Behavior::Filter($b) => $body,
            Behavior::Merger($b) => $body,
            Behavior::Processor($b) => $body,
            Behavior::Spawner($b) => $body,
            Behavior::SellPad($b) => $body,
        }
    };
}

// ---------------------------------------------------------------------------
// TileEntity
// ---------------------------------------------------------------------------

/// The runtime object bound to one occupied grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TileEntity {
    kind: TileKind,
    frame: Frame,
    behavior: Behavior,
}

impl TileEntity {
    /// Build a fresh entity for `kind`. Returns `None` for empty cells.
    pub fn new(
        pos: GridPosition,
        kind: TileKind,
        facing: Direction,
        config: &SimConfig,
    ) -> Option<TileEntity> {
        let behavior = match kind {
            TileKind::Empty => return None,
            TileKind::Conveyor => Behavior::Conveyor(Conveyor::default()),
            TileKind::Splitter => Behavior::Splitter(Splitter::new(SplitVariant::ForwardLeft)),
            TileKind::FilterLeftRight => Behavior::Filter(Filter::new(SplitVariant::LeftRight)),
            TileKind::FilterForwardRight => {
                Behavior::Filter(Filter::new(SplitVariant::ForwardRight))
            }
            TileKind::FilterForwardLeft => Behavior::Filter(Filter::new(SplitVariant::ForwardLeft)),
            TileKind::Merger => Behavior::Merger(Merger::new(MergeVariant::BackLeft)),
            TileKind::Smelter | TileKind::Crusher | TileKind::Press | TileKind::Roller => {
                let recipe = *config.recipe_for(kind)?;
                Behavior::Processor(Processor::new(kind, recipe, config.tick_rate))
            }
            TileKind::Spawner => Behavior::Spawner(Spawner::new(
                config.spawner.item_type,
                config.spawner.value,
                config.spawn_interval_ticks(),
            )),
            TileKind::SellPad => Behavior::SellPad(SellPad),
        };
        Some(TileEntity {
            kind,
            frame: Frame::new(pos, facing, config.speed_per_tick(kind)),
            behavior,
        })
    }

    pub fn kind(&self) -> TileKind {
        self.kind
    }

    pub fn pos(&self) -> GridPosition {
        self.frame.pos
    }

    pub fn facing(&self) -> Direction {
        self.frame.facing
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    fn behavior_entry(&self, side: Side) -> Option<SubCell> {
        dispatch!(&self.behavior, b => b.entry_cell(side))
    }

    /// World-frame entry sub-cell for an item arriving from `edge`.
    pub fn entry_cell_from(&self, edge: Direction) -> Option<SubCell> {
        self.behavior_entry(Side::of(edge, self.frame.facing))
            .map(|cell| rotate_uv(cell, self.frame.facing))
    }

    /// Whether this entity has an entry on `edge` at all. Used by topology
    /// inference; ignores occupancy.
    pub fn accepts_from(&self, edge: Direction) -> bool {
        self.behavior_entry(Side::of(edge, self.frame.facing)).is_some()
    }

    /// Whether an item of `item_type` arriving from `edge` fits right now.
    pub fn can_accept(&self, item_type: ItemType, edge: Direction) -> bool {
        let Some(cell) = self.behavior_entry(Side::of(edge, self.frame.facing)) else {
            return false;
        };
        self.frame.occ.is_free(cell) && dispatch!(&self.behavior, b => b.admits(item_type))
    }

    /// Place `item` on its entry cell and stamp its entered tick.
    ///
    /// # Panics
    ///
    /// Panics if [`TileEntity::can_accept`] would have returned `false`;
    /// callers must check first.
    pub fn accept(&mut self, item: &mut Item, edge: Direction, tick: Ticks) {
        let side = Side::of(edge, self.frame.facing);
        let admits = dispatch!(&self.behavior, b => b.admits(item.item_type));
        let cell = match self.behavior_entry(side) {
            Some(cell) if admits && self.frame.occ.is_free(cell) => cell,
            _ => panic!(
                "{} at {:?} cannot accept item {} from {:?}",
                self.kind.name(),
                self.frame.pos,
                item.id,
                edge
            ),
        };
        self.frame.occ.set(cell, item.id);
        item.mark_entered(tick);
    }

    /// Whether the logical output faces world direction `edge`.
    pub fn outputs_to(&self, edge: Direction) -> bool {
        let side = Side::of(edge, self.frame.facing);
        dispatch!(&self.behavior, b => b.outputs_to(side))
    }

    /// Item at a world-frame sub-cell.
    pub fn item_id_at(&self, cell: SubCell) -> Option<ItemId> {
        if !cell.is_valid() {
            return None;
        }
        self.frame.occ.get(unrotate_uv(cell, self.frame.facing))
    }

    /// Occupied world-frame sub-cells in `u`-major order.
    pub fn contents(&self) -> Vec<(SubCell, ItemId)> {
        let mut out: Vec<_> = self
            .frame
            .occ
            .iter()
            .map(|(cell, id)| (rotate_uv(cell, self.frame.facing), id))
            .collect();
        out.sort();
        out
    }

    pub fn item_count(&self) -> usize {
        self.frame.occ.len()
    }

    pub fn shape(&self) -> Option<ConveyorShape> {
        match &self.behavior {
            Behavior::Conveyor(c) => Some(c.shape),
            _ => None,
        }
    }

    /// Branch pair of a splitter or filter.
    pub fn split_variant(&self) -> Option<SplitVariant> {
        match &self.behavior {
            Behavior::Splitter(s) => Some(s.variant),
            Behavior::Filter(f) => Some(f.variant()),
            _ => None,
        }
    }

    pub fn merge_variant(&self) -> Option<MergeVariant> {
        match &self.behavior {
            Behavior::Merger(m) => Some(m.variant),
            _ => None,
        }
    }

    pub fn filter_rules(&self) -> Option<[BranchRule; 3]> {
        match &self.behavior {
            Behavior::Filter(f) => Some(f.rules()),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Crate-internal mutation
    // -----------------------------------------------------------------------

    pub(crate) fn step(&mut self, ctx: &mut TickContext<'_>) {
        let passes = self.frame.take_passes();
        let frame = &mut self.frame;
        dispatch!(&mut self.behavior, b => b.step(frame, ctx, passes))
    }

    /// Remove every contained item from the registry and clear the buffer.
    pub(crate) fn destroy_contained_items(&mut self, items: &mut ItemRegistry) -> usize {
        let cells: Vec<SubCell> = self.frame.occ.iter().map(|(cell, _)| cell).collect();
        let mut destroyed = 0;
        for cell in cells {
            if let Some(id) = self.frame.occ.take(cell)
                && items.remove(id).is_some()
            {
                destroyed += 1;
            }
        }
        destroyed
    }

    /// Put a restored item at a world-frame sub-cell. Refuses occupied or
    /// invalid cells.
    pub(crate) fn place_restored(&mut self, cell: SubCell, id: ItemId) -> bool {
        if !cell.is_valid() {
            return false;
        }
        let local = unrotate_uv(cell, self.frame.facing);
        if !self.frame.occ.is_free(local) {
            return false;
        }
        self.frame.occ.set(local, id);
        true
    }

    pub(crate) fn set_shape(&mut self, shape: ConveyorShape) -> bool {
        match &mut self.behavior {
            Behavior::Conveyor(c) if c.shape != shape => {
                c.shape = shape;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn set_split_variant(&mut self, variant: SplitVariant) -> bool {
        match &mut self.behavior {
            Behavior::Splitter(s) if s.variant != variant => {
                s.variant = variant;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn set_merge_variant(&mut self, variant: MergeVariant) -> bool {
        match &mut self.behavior {
            Behavior::Merger(m) if m.variant != variant => {
                m.variant = variant;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn filter_mut(&mut self) -> Option<&mut Filter> {
        match &mut self.behavior {
            Behavior::Filter(f) => Some(f),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Project sparse per-kind state into a generic record.
    pub fn write_save(&self, tick_rate: u32) -> TileRecord {
        let mut record = TileRecord {
            cx: self.frame.pos.x as u32,
            cy: self.frame.pos.y as u32,
            ..TileRecord::default()
        };
        dispatch!(&self.behavior, b => b.write_save(&mut record, tick_rate));
        record
    }

    pub(crate) fn read_save(&mut self, record: &TileRecord, tick_rate: u32) {
        dispatch!(&mut self.behavior, b => b.read_save(record, tick_rate))
    }

    /// Feed kind, facing, movement state, occupancy and persisted fields.
    pub(crate) fn hash_into(&self, h: &mut StateHash, tick_rate: u32) {
        h.write(&[self.kind.id(), self.frame.facing.rotation()]);
        h.write_fixed64(self.frame.move_acc);
        for (cell, id) in self.frame.occ.iter() {
            h.write(&[cell.u, cell.v]);
            h.write_u32(id.0);
        }
        let r = self.write_save(tick_rate);
        h.write_u32(r.f0.to_bits());
        h.write_u32(r.f1.to_bits());
        for i in [r.i0, r.i1, r.i2] {
            h.write(&i.to_le_bytes());
        }
        h.write(&[r.b0 as u8]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(kind: TileKind, facing: Direction) -> TileEntity {
        TileEntity::new(GridPosition::new(1, 1), kind, facing, &SimConfig::default()).unwrap()
    }

    #[test]
    fn rotate_uv_maps_front_edge_to_facing() {
        let front = Side::Front.edge_cell();
        assert_eq!(rotate_uv(front, Direction::East), SubCell::new(4, 2));
        assert_eq!(rotate_uv(front, Direction::South), SubCell::new(2, 0));
        assert_eq!(rotate_uv(front, Direction::West), SubCell::new(0, 2));
        assert_eq!(rotate_uv(front, Direction::North), SubCell::new(2, 4));
    }

    #[test]
    fn unrotate_inverts_rotate() {
        for facing in Direction::all() {
            for u in 0..SUB_CELLS {
                for v in 0..SUB_CELLS {
                    let c = SubCell::new(u, v);
                    assert_eq!(unrotate_uv(rotate_uv(c, facing), facing), c);
                }
            }
        }
    }

    #[test]
    fn side_round_trip() {
        for facing in Direction::all() {
            for side in Side::ALL {
                assert_eq!(Side::of(side.toward(facing), facing), side);
            }
        }
        assert_eq!(Side::of(Direction::North, Direction::East), Side::Left);
        assert_eq!(Side::of(Direction::West, Direction::East), Side::Back);
    }

    #[test]
    fn occupancy_iter_in_u_major_order() {
        let mut occ = Occupancy::default();
        occ.set(SubCell::new(3, 2), ItemId(2));
        occ.set(SubCell::new(0, 2), ItemId(1));
        let cells: Vec<_> = occ.iter().collect();
        assert_eq!(
            cells,
            vec![(SubCell::new(0, 2), ItemId(1)), (SubCell::new(3, 2), ItemId(2))]
        );
        assert_eq!(occ.len(), 2);
        assert_eq!(occ.take(SubCell::new(0, 2)), Some(ItemId(1)));
        assert_eq!(occ.len(), 1);
    }

    #[test]
    fn empty_kind_has_no_entity() {
        assert!(
            TileEntity::new(
                GridPosition::new(0, 0),
                TileKind::Empty,
                Direction::East,
                &SimConfig::default()
            )
            .is_none()
        );
    }

    #[test]
    fn conveyor_entry_is_world_rotated_back_edge() {
        let belt = entity(TileKind::Conveyor, Direction::North);
        assert_eq!(belt.entry_cell_from(Direction::South), Some(SubCell::new(2, 0)));
        assert!(belt.accepts_from(Direction::South));
        assert!(!belt.accepts_from(Direction::West));
        assert!(belt.outputs_to(Direction::North));
        assert!(!belt.outputs_to(Direction::South));
    }

    #[test]
    fn accept_marks_entered_and_blocks_second_item() {
        let mut belt = entity(TileKind::Conveyor, Direction::East);
        let mut a = Item::new(ItemId(1), ItemType::Ore, 1.0);
        assert!(belt.can_accept(a.item_type, Direction::West));
        belt.accept(&mut a, Direction::West, 7);
        assert!(a.entered_this_tick(7));
        assert_eq!(belt.item_id_at(SubCell::new(0, 2)), Some(ItemId(1)));
        assert!(!belt.can_accept(ItemType::Ore, Direction::West));
    }

    #[test]
    #[should_panic(expected = "cannot accept")]
    fn accept_without_entry_panics() {
        let mut belt = entity(TileKind::Conveyor, Direction::East);
        let mut item = Item::new(ItemId(1), ItemType::Ore, 1.0);
        belt.accept(&mut item, Direction::North, 0);
    }

    #[test]
    #[should_panic(expected = "cannot accept")]
    fn accept_of_wrong_input_panics() {
        let mut smelter = entity(TileKind::Smelter, Direction::East);
        let mut ore = Item::new(ItemId(1), ItemType::Ore, 1.0);
        assert!(!smelter.can_accept(ore.item_type, Direction::West));
        smelter.accept(&mut ore, Direction::West, 0);
    }

    #[test]
    fn dangling_id_is_cleared_on_step() {
        let mut belt = entity(TileKind::Conveyor, Direction::East);
        assert!(belt.place_restored(SubCell::new(2, 2), ItemId(42)));

        let grid = Grid::new(3, 3);
        let mut items = ItemRegistry::new();
        let mut events = EventBus::new(8);
        let mut wallet = crate::economy::Wallet::new(0.0);
        let mut entities: Vec<Option<TileEntity>> = (0..9).map(|_| None).collect();
        let mut ctx = TickContext {
            tick: 1,
            items: &mut items,
            events: &mut events,
            economy: &mut wallet,
            grid: &grid,
            entities: &mut entities,
        };
        belt.step(&mut ctx);

        assert_eq!(belt.item_count(), 0);
        assert!(belt.contents().is_empty());
    }

    #[test]
    fn destroy_removes_items_from_registry() {
        let mut items = ItemRegistry::new();
        let mut belt = entity(TileKind::Conveyor, Direction::East);
        let id = items.create(ItemType::Ore, 1.0);
        let item = items.get_mut(id).unwrap();
        belt.accept(item, Direction::West, 1);
        assert_eq!(belt.destroy_contained_items(&mut items), 1);
        assert!(items.is_empty());
        assert_eq!(belt.item_count(), 0);
    }

    #[test]
    fn place_restored_uses_world_frame() {
        let mut belt = entity(TileKind::Conveyor, Direction::South);
        assert!(belt.place_restored(SubCell::new(2, 4), ItemId(9)));
        assert_eq!(belt.item_id_at(SubCell::new(2, 4)), Some(ItemId(9)));
        assert!(!belt.place_restored(SubCell::new(2, 4), ItemId(10)));
        assert!(!belt.place_restored(SubCell::new(5, 0), ItemId(11)));
    }

    #[test]
    fn take_passes_accumulates_fractions() {
        let mut frame = Frame::new(
            GridPosition::new(0, 0),
            Direction::East,
            crate::fixed::per_tick(24.0, 60),
        );
        let total: u32 = (0..60).map(|_| frame.take_passes()).sum();
        // 24 sub-cells per second, give or take the final fraction.
        assert!((23..=24).contains(&total));
    }
}

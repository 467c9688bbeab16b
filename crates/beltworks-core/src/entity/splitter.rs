//! Splitters and filters: one back-fed stream routed to two of three exits.
//!
//! Both share the same internal layout (own frame):
//!
//! ```text
//!            (2,4) left exit
//!            (2,3)
//! (0,2)(1,2) (2,2) (3,2)(4,2) forward exit
//!            (2,1)
//!            (2,0) right exit
//! ```
//!
//! The decision cell `(2,2)` alternates between the two wired branches. A
//! filter additionally gates each branch with a [`BranchRule`]; an item no
//! branch admits stays in the decision cell.

use super::{Frame, Side, SubCell, TickContext, TileBehavior};
use crate::item::ItemType;
use crate::serialize::TileRecord;

// ---------------------------------------------------------------------------
// Branches and variants
// ---------------------------------------------------------------------------

/// One of the three possible outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    Forward,
    Left,
    Right,
}

impl Branch {
    pub const ALL: [Branch; 3] = [Branch::Forward, Branch::Left, Branch::Right];

    pub fn index(self) -> usize {
        match self {
            Branch::Forward => 0,
            Branch::Left => 1,
            Branch::Right => 2,
        }
    }

    pub fn side(self) -> Side {
        match self {
            Branch::Forward => Side::Front,
            Branch::Left => Side::Left,
            Branch::Right => Side::Right,
        }
    }

    /// `[near, exit]` cells of this branch's lane.
    fn lane(self) -> [SubCell; 2] {
        match self {
            Branch::Forward => [SubCell::new(3, 2), SubCell::new(4, 2)],
            Branch::Left => [SubCell::new(2, 3), SubCell::new(2, 4)],
            Branch::Right => [SubCell::new(2, 1), SubCell::new(2, 0)],
        }
    }
}

/// Which two branches are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitVariant {
    ForwardLeft,
    ForwardRight,
    LeftRight,
}

impl SplitVariant {
    pub const ALL: [SplitVariant; 3] = [
        SplitVariant::ForwardLeft,
        SplitVariant::ForwardRight,
        SplitVariant::LeftRight,
    ];

    pub fn index(self) -> i32 {
        match self {
            SplitVariant::ForwardLeft => 0,
            SplitVariant::ForwardRight => 1,
            SplitVariant::LeftRight => 2,
        }
    }

    pub fn from_index(i: i32) -> Option<SplitVariant> {
        usize::try_from(i).ok().and_then(|i| Self::ALL.get(i)).copied()
    }

    /// Wired branches in preference order.
    pub fn branches(self) -> [Branch; 2] {
        match self {
            SplitVariant::ForwardLeft => [Branch::Forward, Branch::Left],
            SplitVariant::ForwardRight => [Branch::Forward, Branch::Right],
            SplitVariant::LeftRight => [Branch::Left, Branch::Right],
        }
    }

    pub fn has(self, branch: Branch) -> bool {
        self.branches().contains(&branch)
    }
}

// ---------------------------------------------------------------------------
// Filter rules
// ---------------------------------------------------------------------------

/// Per-branch routing rule of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BranchRule {
    #[default]
    Any,
    /// Nothing passes.
    Block,
    Only(ItemType),
}

impl BranchRule {
    const RING: usize = ItemType::ALL.len() + 2;

    pub fn allows(self, item_type: ItemType) -> bool {
        match self {
            BranchRule::Any => true,
            BranchRule::Block => false,
            BranchRule::Only(t) => t == item_type,
        }
    }

    /// Persisted form: -1 any, -2 none, otherwise the item save id.
    pub fn encode(self) -> i32 {
        match self {
            BranchRule::Any => -1,
            BranchRule::Block => -2,
            BranchRule::Only(t) => i32::from(t.save_id()),
        }
    }

    pub fn decode(raw: i32) -> Option<BranchRule> {
        match raw {
            -1 => Some(BranchRule::Any),
            -2 => Some(BranchRule::Block),
            _ => u8::try_from(raw)
                .ok()
                .and_then(ItemType::from_save_id)
                .map(BranchRule::Only),
        }
    }

    fn ring_index(self) -> usize {
        match self {
            BranchRule::Any => 0,
            BranchRule::Only(t) => 1 + t.ordinal(),
            BranchRule::Block => Self::RING - 1,
        }
    }

    fn from_ring_index(i: usize) -> BranchRule {
        match i {
            0 => BranchRule::Any,
            i if i <= ItemType::ALL.len() => BranchRule::Only(ItemType::ALL[i - 1]),
            _ => BranchRule::Block,
        }
    }

    /// Step `delta` places around any → each item type → none → any.
    pub fn cycle(self, delta: i32) -> BranchRule {
        let ring = Self::RING as i64;
        let i = (self.ring_index() as i64 + i64::from(delta)).rem_euclid(ring);
        Self::from_ring_index(i as usize)
    }
}

// ---------------------------------------------------------------------------
// Shared routing pass
// ---------------------------------------------------------------------------

const DECISION: SubCell = SubCell::new(2, 2);
const INPUT_NEAR: SubCell = SubCell::new(1, 2);
const INPUT_FAR: SubCell = SubCell::new(0, 2);

fn route(
    frame: &mut Frame,
    ctx: &mut TickContext<'_>,
    variant: SplitVariant,
    toggle: &mut bool,
    rules: Option<&[BranchRule; 3]>,
) {
    // Every exit drains, wired or not, so a variant change strands nothing.
    for branch in Branch::ALL {
        frame.hand_off(branch.lane()[1], branch.side(), ctx);
    }
    for branch in Branch::ALL {
        let [near, exit] = branch.lane();
        frame.shift(near, exit, ctx);
    }

    if let Some(id) = frame.ready_item(DECISION, ctx)
        && let Some(item_type) = ctx.items.get(id).map(|item| item.item_type)
    {
        let mut order = variant.branches();
        if *toggle {
            order.reverse();
        }
        let used = order.iter().position(|branch| {
            let allowed = rules.is_none_or(|r| r[branch.index()].allows(item_type));
            allowed && frame.shift(DECISION, branch.lane()[0], ctx)
        });
        if used.is_some() {
            *toggle = !*toggle;
        }
    }

    frame.shift(INPUT_NEAR, DECISION, ctx);
    frame.shift(INPUT_FAR, INPUT_NEAR, ctx);
}

fn entry(side: Side) -> Option<SubCell> {
    (side == Side::Back).then_some(INPUT_FAR)
}

fn outputs(variant: SplitVariant, side: Side) -> bool {
    variant.branches().iter().any(|b| b.side() == side)
}

// ---------------------------------------------------------------------------
// Splitter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Splitter {
    pub variant: SplitVariant,
    /// When set, the second wired branch is preferred next.
    pub toggle: bool,
}

impl Splitter {
    pub fn new(variant: SplitVariant) -> Self {
        Self {
            variant,
            toggle: false,
        }
    }
}

impl TileBehavior for Splitter {
    fn entry_cell(&self, side: Side) -> Option<SubCell> {
        entry(side)
    }

    fn outputs_to(&self, side: Side) -> bool {
        outputs(self.variant, side)
    }

    fn step(&mut self, frame: &mut Frame, ctx: &mut TickContext<'_>, passes: u32) {
        for _ in 0..passes {
            route(frame, ctx, self.variant, &mut self.toggle, None);
        }
    }

    fn write_save(&self, record: &mut TileRecord, _tick_rate: u32) {
        record.i0 = self.variant.index();
        record.b0 = self.toggle;
    }

    fn read_save(&mut self, record: &TileRecord, _tick_rate: u32) {
        self.variant = SplitVariant::from_index(record.i0).unwrap_or(SplitVariant::ForwardLeft);
        self.toggle = record.b0;
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// A splitter whose branches only take items their rule admits. The wired
/// pair is fixed by the tile kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    variant: SplitVariant,
    rules: [BranchRule; 3],
    toggle: bool,
}

impl Filter {
    pub fn new(variant: SplitVariant) -> Self {
        Self {
            variant,
            rules: [BranchRule::Any; 3],
            toggle: false,
        }
    }

    pub fn variant(&self) -> SplitVariant {
        self.variant
    }

    /// Rules indexed forward, left, right.
    pub fn rules(&self) -> [BranchRule; 3] {
        self.rules
    }

    pub fn rule(&self, branch: Branch) -> BranchRule {
        self.rules[branch.index()]
    }

    pub fn set_rule(&mut self, branch: Branch, rule: BranchRule) {
        self.rules[branch.index()] = rule;
    }
}

impl TileBehavior for Filter {
    fn entry_cell(&self, side: Side) -> Option<SubCell> {
        entry(side)
    }

    fn outputs_to(&self, side: Side) -> bool {
        outputs(self.variant, side)
    }

    fn step(&mut self, frame: &mut Frame, ctx: &mut TickContext<'_>, passes: u32) {
        for _ in 0..passes {
            route(frame, ctx, self.variant, &mut self.toggle, Some(&self.rules));
        }
    }

    fn write_save(&self, record: &mut TileRecord, _tick_rate: u32) {
        record.i0 = self.rules[0].encode();
        record.i1 = self.rules[1].encode();
        record.i2 = self.rules[2].encode();
        record.b0 = self.toggle;
    }

    fn read_save(&mut self, record: &TileRecord, _tick_rate: u32) {
        for (slot, raw) in self.rules.iter_mut().zip([record.i0, record.i1, record.i2]) {
            *slot = BranchRule::decode(raw).unwrap_or_default();
        }
        self.toggle = record.b0;
    }
}

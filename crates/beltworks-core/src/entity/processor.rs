//! Processing machines (smelter, crusher, press, roller).
//!
//! A straight five-cell lane with the process cell at `(2,2)`. The item in
//! the process cell is held until its recipe timer runs out, then converted
//! in place and released.

use super::{Frame, Side, SubCell, TickContext, TileBehavior};
use crate::config::RecipeConfig;
use crate::event::Event;
use crate::fixed::{persisted_seconds_to_ticks, seconds_to_ticks, ticks_to_seconds};
use crate::id::ItemId;
use crate::item::ItemType;
use crate::serialize::TileRecord;
use beltworks_spatial::TileKind;

const LANE: [SubCell; 5] = [
    SubCell::new(0, 2),
    SubCell::new(1, 2),
    SubCell::new(2, 2),
    SubCell::new(3, 2),
    SubCell::new(4, 2),
];
const PROCESS: SubCell = LANE[2];

#[derive(Debug, Clone, PartialEq)]
pub struct Processor {
    machine: TileKind,
    recipe: RecipeConfig,
    process_ticks: u32,
    active: Option<ItemId>,
    remaining: u32,
    done: bool,
}

impl Processor {
    pub fn new(machine: TileKind, recipe: RecipeConfig, tick_rate: u32) -> Self {
        Self {
            machine,
            recipe,
            process_ticks: seconds_to_ticks(recipe.process_time, tick_rate),
            active: None,
            remaining: 0,
            done: false,
        }
    }

    pub fn recipe(&self) -> &RecipeConfig {
        &self.recipe
    }

    /// The item currently being processed.
    pub fn active(&self) -> Option<ItemId> {
        self.active
    }

    pub fn remaining_ticks(&self) -> u32 {
        self.remaining
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    fn reset(&mut self) {
        self.active = None;
        self.remaining = 0;
        self.done = false;
    }

    /// Start on whatever sits in the process cell, if it is a recipe input.
    fn try_start(&mut self, frame: &Frame, ctx: &TickContext<'_>) {
        let Some(id) = frame.occupancy().get(PROCESS) else {
            return;
        };
        if ctx
            .items
            .get(id)
            .is_some_and(|item| item.item_type == self.recipe.input)
        {
            self.active = Some(id);
            self.remaining = self.process_ticks;
            self.done = false;
        }
    }

    /// Advance the timer by one tick.
    fn tick_processing(&mut self, frame: &Frame, ctx: &mut TickContext<'_>) {
        let Some(id) = self.active else {
            self.try_start(frame, ctx);
            return;
        };
        if frame.occupancy().get(PROCESS) != Some(id) || !ctx.items.contains(id) {
            self.reset();
            return;
        }
        if self.done {
            return;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return;
        }
        if let Some(item) = ctx.items.get_mut(id) {
            item.item_type = self.recipe.output;
            item.value *= self.recipe.value_multiplier;
        }
        self.done = true;
        ctx.events.emit(Event::ItemProcessed {
            machine: self.machine,
            output: self.recipe.output,
            amount: 1,
            at: frame.pos(),
            tick: ctx.tick,
        });
    }
}

impl TileBehavior for Processor {
    fn entry_cell(&self, side: Side) -> Option<SubCell> {
        (side == Side::Back).then_some(LANE[0])
    }

    fn admits(&self, item_type: ItemType) -> bool {
        item_type == self.recipe.input
    }

    fn outputs_to(&self, side: Side) -> bool {
        side == Side::Front
    }

    fn step(&mut self, frame: &mut Frame, ctx: &mut TickContext<'_>, passes: u32) {
        self.tick_processing(frame, ctx);

        for _ in 0..passes {
            frame.hand_off(LANE[4], Side::Front, ctx);
            frame.shift(LANE[3], LANE[4], ctx);

            let held = self.active.is_some() && !self.done;
            if !held && frame.shift(PROCESS, LANE[3], ctx) && self.active.is_some() {
                self.reset();
            }

            if frame.shift(LANE[1], PROCESS, ctx) && self.active.is_none() {
                self.try_start(frame, ctx);
            }
            frame.shift(LANE[0], LANE[1], ctx);
        }
    }

    fn write_save(&self, record: &mut TileRecord, tick_rate: u32) {
        record.f0 = ticks_to_seconds(self.remaining, tick_rate);
        record.i0 = self
            .active
            .and_then(|id| i32::try_from(id.0).ok())
            .unwrap_or(-1);
        record.b0 = self.done;
    }

    fn read_save(&mut self, record: &TileRecord, tick_rate: u32) {
        self.remaining = persisted_seconds_to_ticks(record.f0, tick_rate);
        self.active = u32::try_from(record.i0).ok().map(ItemId);
        self.done = record.b0;
        if self.active.is_none() {
            self.reset();
        }
    }
}

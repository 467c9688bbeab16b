//! Item source. Has no input; creates an item at the centre on a fixed
//! interval and pushes it out the front.

use super::{Frame, Side, SubCell, TickContext, TileBehavior};
use crate::event::Event;
use crate::fixed::{persisted_seconds_to_ticks, ticks_to_seconds};
use crate::item::ItemType;
use crate::serialize::TileRecord;

const SPAWN: SubCell = SubCell::new(2, 2);
const TAIL: SubCell = SubCell::new(3, 2);
const EXIT: SubCell = SubCell::new(4, 2);

#[derive(Debug, Clone, PartialEq)]
pub struct Spawner {
    item_type: ItemType,
    value: f32,
    interval: u32,
    timer: u32,
}

impl Spawner {
    pub fn new(item_type: ItemType, value: f32, interval: u32) -> Self {
        Self {
            item_type,
            value,
            interval: interval.max(1),
            timer: 0,
        }
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn timer_ticks(&self) -> u32 {
        self.timer
    }
}

impl TileBehavior for Spawner {
    fn entry_cell(&self, _side: Side) -> Option<SubCell> {
        None
    }

    fn outputs_to(&self, side: Side) -> bool {
        side == Side::Front
    }

    fn step(&mut self, frame: &mut Frame, ctx: &mut TickContext<'_>, passes: u32) {
        for _ in 0..passes {
            frame.hand_off(EXIT, Side::Front, ctx);
            frame.shift(TAIL, EXIT, ctx);
            frame.shift(SPAWN, TAIL, ctx);
        }

        self.timer += 1;
        if self.timer < self.interval {
            return;
        }
        if !frame.occupancy().is_free(SPAWN) {
            // Blocked: hold at the interval instead of building a backlog.
            self.timer = self.interval;
            return;
        }
        let id = ctx.items.create(self.item_type, self.value);
        if let Some(item) = ctx.items.get_mut(id) {
            item.mark_entered(ctx.tick);
        }
        frame.occ.set(SPAWN, id);
        self.timer = 0;
        ctx.events.emit(Event::ItemSpawned {
            item: id,
            item_type: self.item_type,
            at: frame.pos(),
            tick: ctx.tick,
        });
    }

    fn write_save(&self, record: &mut TileRecord, tick_rate: u32) {
        record.f0 = ticks_to_seconds(self.timer, tick_rate);
    }

    fn read_save(&mut self, record: &TileRecord, tick_rate: u32) {
        self.timer = persisted_seconds_to_ticks(record.f0, tick_rate).min(self.interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawner_has_no_entry() {
        let s = Spawner::new(ItemType::Ore, 1.0, 45);
        for side in Side::ALL {
            assert_eq!(s.entry_cell(side), None);
        }
        assert!(s.outputs_to(Side::Front));
    }

    #[test]
    fn saved_timer_is_clamped_to_interval() {
        let mut s = Spawner::new(ItemType::Ore, 1.0, 45);
        s.read_save(
            &TileRecord {
                f0: 10.0,
                ..TileRecord::default()
            },
            60,
        );
        assert_eq!(s.timer_ticks(), 45);

        s.read_save(
            &TileRecord {
                f0: 0.25,
                ..TileRecord::default()
            },
            60,
        );
        assert_eq!(s.timer_ticks(), 15);
    }
}

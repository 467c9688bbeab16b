//! Sell-pad: accepts from every edge and sells what arrives.

use super::{Frame, Side, SubCell, TickContext, TileBehavior};
use crate::event::Event;
use crate::serialize::TileRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SellPad;

impl TileBehavior for SellPad {
    fn entry_cell(&self, side: Side) -> Option<SubCell> {
        Some(side.edge_cell())
    }

    fn outputs_to(&self, _side: Side) -> bool {
        false
    }

    /// Sells every item that arrived before this tick.
    fn step(&mut self, frame: &mut Frame, ctx: &mut TickContext<'_>, _passes: u32) {
        for side in Side::ALL {
            let cell = side.edge_cell();
            let Some(id) = frame.ready_item(cell, ctx) else {
                continue;
            };
            frame.occ.take(cell);
            let Some(item) = ctx.items.remove(id) else {
                continue;
            };
            ctx.economy.add_money(f64::from(item.value));
            ctx.events.emit(Event::ItemSold {
                item_type: item.item_type,
                value: item.value,
                amount: 1,
                at: frame.pos(),
                tick: ctx.tick,
            });
        }
    }

    fn write_save(&self, _record: &mut TileRecord, _tick_rate: u32) {}

    fn read_save(&mut self, _record: &TileRecord, _tick_rate: u32) {}
}

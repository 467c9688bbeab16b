//! Merger: up to two input edges feeding one forward lane, arbitrated
//! round-robin across the left, right and back lanes.

use super::{Frame, Side, SubCell, TickContext, TileBehavior};
use crate::serialize::TileRecord;

/// Which two input edges are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeVariant {
    BackLeft,
    BackRight,
    LeftRight,
}

impl MergeVariant {
    pub const ALL: [MergeVariant; 3] = [
        MergeVariant::BackLeft,
        MergeVariant::BackRight,
        MergeVariant::LeftRight,
    ];

    pub fn index(self) -> i32 {
        match self {
            MergeVariant::BackLeft => 0,
            MergeVariant::BackRight => 1,
            MergeVariant::LeftRight => 2,
        }
    }

    pub fn from_index(i: i32) -> Option<MergeVariant> {
        usize::try_from(i).ok().and_then(|i| Self::ALL.get(i)).copied()
    }

    pub fn has(self, side: Side) -> bool {
        matches!(
            (self, side),
            (MergeVariant::BackLeft, Side::Back | Side::Left)
                | (MergeVariant::BackRight, Side::Back | Side::Right)
                | (MergeVariant::LeftRight, Side::Left | Side::Right)
        )
    }

    /// Whether both wired edges are fed.
    pub fn is_fed(self, back: bool, left: bool, right: bool) -> bool {
        match self {
            MergeVariant::BackLeft => back && left,
            MergeVariant::BackRight => back && right,
            MergeVariant::LeftRight => left && right,
        }
    }
}

const DECISION: SubCell = SubCell::new(2, 2);
const OUT_NEAR: SubCell = SubCell::new(3, 2);
const EXIT: SubCell = SubCell::new(4, 2);

/// Round-robin lanes: `(side, cell next to the decision cell, entry cell)`.
const LANES: [(Side, SubCell, SubCell); 3] = [
    (Side::Left, SubCell::new(2, 3), SubCell::new(2, 4)),
    (Side::Right, SubCell::new(2, 1), SubCell::new(2, 0)),
    (Side::Back, SubCell::new(1, 2), SubCell::new(0, 2)),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Merger {
    pub variant: MergeVariant,
    /// Lane index tried first on the next feed.
    pub rr: u8,
}

impl Merger {
    pub fn new(variant: MergeVariant) -> Self {
        Self { variant, rr: 0 }
    }

    fn feed_decision(&mut self, frame: &mut Frame, ctx: &TickContext<'_>) {
        if !frame.occupancy().is_free(DECISION) {
            return;
        }
        for offset in 0..LANES.len() {
            let lane = (usize::from(self.rr) + offset) % LANES.len();
            let (side, near, _) = LANES[lane];
            // Unwired lanes still drain whatever is already on them.
            if !self.variant.has(side) && frame.occupancy().is_free(near) {
                continue;
            }
            if frame.shift(near, DECISION, ctx) {
                self.rr = ((lane + 1) % LANES.len()) as u8;
                return;
            }
        }
    }
}

impl TileBehavior for Merger {
    fn entry_cell(&self, side: Side) -> Option<SubCell> {
        if !self.variant.has(side) {
            return None;
        }
        LANES
            .iter()
            .find(|(lane_side, _, _)| *lane_side == side)
            .map(|(_, _, entry)| *entry)
    }

    fn outputs_to(&self, side: Side) -> bool {
        side == Side::Front
    }

    fn step(&mut self, frame: &mut Frame, ctx: &mut TickContext<'_>, passes: u32) {
        let [left, right, back] = LANES;
        for _ in 0..passes {
            frame.hand_off(EXIT, Side::Front, ctx);
            frame.shift(OUT_NEAR, EXIT, ctx);
            frame.shift(DECISION, OUT_NEAR, ctx);
            frame.shift(back.2, back.1, ctx);
            self.feed_decision(frame, ctx);
            frame.shift(left.2, left.1, ctx);
            frame.shift(right.2, right.1, ctx);
        }
    }

    fn write_save(&self, record: &mut TileRecord, _tick_rate: u32) {
        record.i0 = i32::from(self.rr);
        record.i1 = self.variant.index();
    }

    fn read_save(&mut self, record: &TileRecord, _tick_rate: u32) {
        self.rr = u8::try_from(record.i0.rem_euclid(LANES.len() as i32)).unwrap_or(0);
        self.variant = MergeVariant::from_index(record.i1).unwrap_or(MergeVariant::BackLeft);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_follow_variant() {
        let bl = Merger::new(MergeVariant::BackLeft);
        assert_eq!(bl.entry_cell(Side::Back), Some(SubCell::new(0, 2)));
        assert_eq!(bl.entry_cell(Side::Left), Some(SubCell::new(2, 4)));
        assert_eq!(bl.entry_cell(Side::Right), None);
        assert_eq!(bl.entry_cell(Side::Front), None);

        let lr = Merger::new(MergeVariant::LeftRight);
        assert_eq!(lr.entry_cell(Side::Back), None);
        assert_eq!(lr.entry_cell(Side::Right), Some(SubCell::new(2, 0)));
    }

    #[test]
    fn fed_check_needs_both_wired_edges() {
        assert!(MergeVariant::BackRight.is_fed(true, false, true));
        assert!(!MergeVariant::BackRight.is_fed(true, true, false));
        assert!(MergeVariant::LeftRight.is_fed(false, true, true));
    }

    #[test]
    fn save_round_trip() {
        let m = Merger {
            variant: MergeVariant::BackRight,
            rr: 2,
        };
        let mut rec = TileRecord::default();
        m.write_save(&mut rec, 60);
        assert_eq!((rec.i0, rec.i1), (2, 1));

        let mut n = Merger::new(MergeVariant::BackLeft);
        n.read_save(&rec, 60);
        assert_eq!(n, m);
    }

    #[test]
    fn corrupt_round_robin_is_wrapped() {
        let mut m = Merger::new(MergeVariant::BackLeft);
        m.read_save(
            &TileRecord {
                i0: 7,
                i1: 5,
                ..TileRecord::default()
            },
            60,
        );
        assert_eq!(m.rr, 1);
        assert_eq!(m.variant, MergeVariant::BackLeft);
    }
}

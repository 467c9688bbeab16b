//! Plain belt: one entry arm feeding the centre, one exit lane to the front.

use super::{Frame, Side, SubCell, TickContext, TileBehavior};
use crate::serialize::TileRecord;

/// Which edge feeds the belt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConveyorShape {
    #[default]
    Straight,
    /// Fed from the left side.
    TurnLeft,
    /// Fed from the right side.
    TurnRight,
}

impl ConveyorShape {
    pub const ALL: [ConveyorShape; 3] = [
        ConveyorShape::Straight,
        ConveyorShape::TurnLeft,
        ConveyorShape::TurnRight,
    ];

    pub fn index(self) -> i32 {
        match self {
            ConveyorShape::Straight => 0,
            ConveyorShape::TurnLeft => 1,
            ConveyorShape::TurnRight => 2,
        }
    }

    pub fn from_index(i: i32) -> Option<ConveyorShape> {
        usize::try_from(i).ok().and_then(|i| Self::ALL.get(i)).copied()
    }

    /// The input side this shape draws from.
    pub fn input_side(self) -> Side {
        match self {
            ConveyorShape::Straight => Side::Back,
            ConveyorShape::TurnLeft => Side::Left,
            ConveyorShape::TurnRight => Side::Right,
        }
    }

    pub fn for_input(side: Side) -> Option<ConveyorShape> {
        match side {
            Side::Back => Some(ConveyorShape::Straight),
            Side::Left => Some(ConveyorShape::TurnLeft),
            Side::Right => Some(ConveyorShape::TurnRight),
            Side::Front => None,
        }
    }

    /// Arm cells `[near, far]` leading into the centre.
    fn arm(self) -> [SubCell; 2] {
        match self {
            ConveyorShape::Straight => [SubCell::new(1, 2), SubCell::new(0, 2)],
            ConveyorShape::TurnLeft => [SubCell::new(2, 3), SubCell::new(2, 4)],
            ConveyorShape::TurnRight => [SubCell::new(2, 1), SubCell::new(2, 0)],
        }
    }
}

const CENTRE: SubCell = SubCell::new(2, 2);
const TAIL: SubCell = SubCell::new(3, 2);
const EXIT: SubCell = SubCell::new(4, 2);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Conveyor {
    pub shape: ConveyorShape,
}

impl TileBehavior for Conveyor {
    fn entry_cell(&self, side: Side) -> Option<SubCell> {
        (side == self.shape.input_side()).then(|| self.shape.arm()[1])
    }

    fn outputs_to(&self, side: Side) -> bool {
        side == Side::Front
    }

    fn step(&mut self, frame: &mut Frame, ctx: &mut TickContext<'_>, passes: u32) {
        for _ in 0..passes {
            frame.hand_off(EXIT, Side::Front, ctx);
            frame.shift(TAIL, EXIT, ctx);
            frame.shift(CENTRE, TAIL, ctx);

            // Active arm first, then drain arms left behind by a shape change.
            let arms = std::iter::once(self.shape)
                .chain(ConveyorShape::ALL.into_iter().filter(|s| *s != self.shape));
            for shape in arms {
                let [near, far] = shape.arm();
                frame.shift(near, CENTRE, ctx);
                frame.shift(far, near, ctx);
            }
        }
    }

    fn write_save(&self, record: &mut TileRecord, _tick_rate: u32) {
        record.i0 = self.shape.index();
    }

    fn read_save(&mut self, record: &TileRecord, _tick_rate: u32) {
        self.shape = ConveyorShape::from_index(record.i0).unwrap_or_default();
    }
}

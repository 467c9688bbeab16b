//! Edit-time topology inference.
//!
//! Belt cells (conveyor, splitter, merger) are rewritten into each other,
//! and splitter/merger variants and conveyor shapes are chosen, purely from
//! neighbour connectivity. [`refresh`] iterates four sub-passes until a pass
//! changes nothing or the pass budget runs out:
//!
//! 1. tile upgrades (conveyor / splitter / merger)
//! 2. merger variants
//! 3. splitter variants
//! 4. conveyor shapes
//!
//! Each sub-pass computes every cell's desired state from the current world
//! into a scratch list, then applies the list, so cells within one sub-pass
//! never see each other's updates.
//!
//! # Predicates
//!
//! - *fed*: the neighbour across an edge exists, is not a sell-pad, and
//!   outputs back into this cell.
//! - *accepts*: the neighbour across an edge exists and has an entry facing
//!   this cell.
//! - *open*: like *accepts*, but an in-bounds empty cell also counts, as a
//!   future connection. Only used for a merger's forward outlet; splitter
//!   upgrades need real consumers.

use crate::entity::{ConveyorShape, MergeVariant, Side, SplitVariant};
use crate::world::Layout;
use beltworks_spatial::{Direction, GridPosition, TileKind};
use tracing::{debug, warn};

/// What a [`refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InferenceReport {
    pub passes: u32,
    /// Cells whose kind, variant or shape changed, summed over passes.
    pub changes: u32,
    /// Whether the last pass changed nothing.
    pub converged: bool,
}

// ---------------------------------------------------------------------------
// Connectivity predicates
// ---------------------------------------------------------------------------

fn neighbor_outputs_into(layout: &Layout<'_>, pos: GridPosition, edge: Direction) -> bool {
    layout
        .entity(pos.neighbor(edge))
        .is_some_and(|n| n.kind() != TileKind::SellPad && n.outputs_to(edge.opposite()))
}

fn neighbor_accepts(layout: &Layout<'_>, pos: GridPosition, edge: Direction) -> bool {
    layout
        .entity(pos.neighbor(edge))
        .is_some_and(|n| n.accepts_from(edge.opposite()))
}

fn can_output_to(layout: &Layout<'_>, pos: GridPosition, edge: Direction) -> bool {
    let target = pos.neighbor(edge);
    if !layout.grid().in_bounds(target) {
        return false;
    }
    match layout.entity(target) {
        None => true,
        Some(n) => n.accepts_from(edge.opposite()),
    }
}

/// Fed flags for the back, left and right sides of a cell.
#[derive(Debug, Clone, Copy)]
struct Inputs {
    back: bool,
    left: bool,
    right: bool,
}

impl Inputs {
    fn of(layout: &Layout<'_>, pos: GridPosition, facing: Direction) -> Self {
        let fed = |side: Side| neighbor_outputs_into(layout, pos, side.toward(facing));
        Self {
            back: fed(Side::Back),
            left: fed(Side::Left),
            right: fed(Side::Right),
        }
    }

    fn count(self) -> usize {
        [self.back, self.left, self.right]
            .into_iter()
            .filter(|b| *b)
            .count()
    }

    fn has(self, side: Side) -> bool {
        match side {
            Side::Back => self.back,
            Side::Left => self.left,
            Side::Right => self.right,
            Side::Front => false,
        }
    }
}

/// Accept flags for the front, left and right sides of a cell.
#[derive(Debug, Clone, Copy)]
struct Outputs {
    front: bool,
    left: bool,
    right: bool,
}

impl Outputs {
    fn of(layout: &Layout<'_>, pos: GridPosition, facing: Direction) -> Self {
        let accepts = |side: Side| neighbor_accepts(layout, pos, side.toward(facing));
        Self {
            front: accepts(Side::Front),
            left: accepts(Side::Left),
            right: accepts(Side::Right),
        }
    }

    fn count(self) -> usize {
        [self.front, self.left, self.right]
            .into_iter()
            .filter(|b| *b)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Placement-time decision
// ---------------------------------------------------------------------------

/// One-shot upgrade for a conveyor being placed at `pos`, before any
/// neighbourhood refresh. Looks only at the neighbours.
pub(crate) fn decide_auto_tile_for_conveyor(
    layout: &Layout<'_>,
    pos: GridPosition,
    facing: Direction,
) -> TileKind {
    let ins = Inputs::of(layout, pos, facing);
    let outs = Outputs::of(layout, pos, facing);
    if outs.front && ins.count() >= 2 {
        TileKind::Merger
    } else if (outs.left && outs.right) || (outs.front && outs.left) || (outs.front && outs.right)
    {
        TileKind::Splitter
    } else {
        TileKind::Conveyor
    }
}

// ---------------------------------------------------------------------------
// Sub-passes
// ---------------------------------------------------------------------------

/// Cells of the given kinds, with their facing, in scan order.
fn cells_of(layout: &Layout<'_>, keep: impl Fn(TileKind) -> bool) -> Vec<(GridPosition, Direction)> {
    let grid = layout.grid();
    grid.positions()
        .filter(|&pos| keep(grid.tile(pos)) && layout.entity(pos).is_some())
        .map(|pos| (pos, grid.rotation(pos)))
        .collect()
}

fn desired_kind(layout: &Layout<'_>, pos: GridPosition, facing: Direction) -> TileKind {
    let ins = Inputs::of(layout, pos, facing);
    if can_output_to(layout, pos, facing) && ins.count() >= 2 {
        return TileKind::Merger;
    }
    if ins.back && Outputs::of(layout, pos, facing).count() >= 2 {
        return TileKind::Splitter;
    }
    TileKind::Conveyor
}

fn refresh_auto_tiles(layout: &mut Layout<'_>) -> u32 {
    let plan: Vec<(GridPosition, TileKind)> = cells_of(layout, TileKind::is_belt_family)
        .into_iter()
        .map(|(pos, facing)| (pos, desired_kind(layout, pos, facing)))
        .filter(|&(pos, kind)| layout.tile(pos) != kind)
        .collect();

    let mut changes = 0;
    for (pos, kind) in plan {
        debug!(?pos, to = kind.name(), "auto-tile");
        if layout.set_tile(pos, kind) {
            changes += 1;
        }
    }
    changes
}

fn desired_merge_variant(current: MergeVariant, ins: Inputs) -> MergeVariant {
    if current.is_fed(ins.back, ins.left, ins.right) {
        return current;
    }
    if ins.back {
        if ins.left {
            return MergeVariant::BackLeft;
        }
        if ins.right {
            return MergeVariant::BackRight;
        }
        return current;
    }
    if ins.left && ins.right {
        return MergeVariant::LeftRight;
    }
    current
}

fn refresh_merger_variants(layout: &mut Layout<'_>) -> u32 {
    let plan: Vec<(GridPosition, MergeVariant)> = cells_of(layout, |k| k == TileKind::Merger)
        .into_iter()
        .filter_map(|(pos, facing)| {
            let current = layout.entity(pos)?.merge_variant()?;
            let wanted = desired_merge_variant(current, Inputs::of(layout, pos, facing));
            (wanted != current).then_some((pos, wanted))
        })
        .collect();

    plan.into_iter()
        .filter(|&(pos, variant)| layout.set_merge_variant(pos, variant))
        .count() as u32
}

fn desired_split_variant(current: SplitVariant, outs: Outputs) -> SplitVariant {
    if outs.left && outs.right {
        SplitVariant::LeftRight
    } else if outs.front && outs.left {
        SplitVariant::ForwardLeft
    } else if outs.front && outs.right {
        SplitVariant::ForwardRight
    } else {
        current
    }
}

fn refresh_splitter_variants(layout: &mut Layout<'_>) -> u32 {
    let plan: Vec<(GridPosition, SplitVariant)> = cells_of(layout, |k| k == TileKind::Splitter)
        .into_iter()
        .filter_map(|(pos, facing)| {
            let current = layout.entity(pos)?.split_variant()?;
            let wanted = desired_split_variant(current, Outputs::of(layout, pos, facing));
            (wanted != current).then_some((pos, wanted))
        })
        .collect();

    plan.into_iter()
        .filter(|&(pos, variant)| layout.set_split_variant(pos, variant))
        .count() as u32
}

fn desired_shape(current: ConveyorShape, ins: Inputs) -> ConveyorShape {
    if ins.has(current.input_side()) {
        return current;
    }
    [Side::Back, Side::Left, Side::Right]
        .into_iter()
        .find(|&side| ins.has(side))
        .and_then(ConveyorShape::for_input)
        .unwrap_or_default()
}

fn refresh_conveyor_shapes(layout: &mut Layout<'_>) -> u32 {
    let plan: Vec<(GridPosition, ConveyorShape)> = cells_of(layout, |k| k == TileKind::Conveyor)
        .into_iter()
        .filter_map(|(pos, facing)| {
            let current = layout.entity(pos)?.shape()?;
            let wanted = desired_shape(current, Inputs::of(layout, pos, facing));
            (wanted != current).then_some((pos, wanted))
        })
        .collect();

    plan.into_iter()
        .filter(|&(pos, shape)| layout.set_conveyor_shape(pos, shape))
        .count() as u32
}

// ---------------------------------------------------------------------------
// Fixed-point driver
// ---------------------------------------------------------------------------

/// Run inference passes until one changes nothing, at most `max_passes`.
pub(crate) fn refresh(layout: &mut Layout<'_>, max_passes: u32) -> InferenceReport {
    let mut report = InferenceReport::default();
    for pass in 1..=max_passes {
        let changed = refresh_auto_tiles(layout)
            + refresh_merger_variants(layout)
            + refresh_splitter_variants(layout)
            + refresh_conveyor_shapes(layout);
        report.passes = pass;
        report.changes += changed;
        debug!(pass, changed, "topology pass");
        if changed == 0 {
            report.converged = true;
            break;
        }
    }
    if !report.converged {
        warn!(
            passes = report.passes,
            changes = report.changes,
            "topology inference hit its pass budget without converging"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ins(back: bool, left: bool, right: bool) -> Inputs {
        Inputs { back, left, right }
    }

    fn outs(front: bool, left: bool, right: bool) -> Outputs {
        Outputs { front, left, right }
    }

    #[test]
    fn merger_variant_is_sticky_while_fed() {
        assert_eq!(
            desired_merge_variant(MergeVariant::LeftRight, ins(true, true, true)),
            MergeVariant::LeftRight
        );
    }

    #[test]
    fn merger_variant_prefers_back_edge() {
        assert_eq!(
            desired_merge_variant(MergeVariant::LeftRight, ins(true, false, true)),
            MergeVariant::BackRight
        );
        assert_eq!(
            desired_merge_variant(MergeVariant::BackRight, ins(true, true, false)),
            MergeVariant::BackLeft
        );
        assert_eq!(
            desired_merge_variant(MergeVariant::BackLeft, ins(false, true, true)),
            MergeVariant::LeftRight
        );
        assert_eq!(
            desired_merge_variant(MergeVariant::BackRight, ins(false, true, false)),
            MergeVariant::BackRight
        );
    }

    #[test]
    fn splitter_variant_priority() {
        let cur = SplitVariant::ForwardRight;
        assert_eq!(
            desired_split_variant(cur, outs(true, true, true)),
            SplitVariant::LeftRight
        );
        assert_eq!(
            desired_split_variant(cur, outs(true, true, false)),
            SplitVariant::ForwardLeft
        );
        assert_eq!(
            desired_split_variant(SplitVariant::LeftRight, outs(true, false, true)),
            SplitVariant::ForwardRight
        );
        assert_eq!(desired_split_variant(cur, outs(true, false, false)), cur);
    }

    #[test]
    fn shape_keeps_fed_input_then_falls_back_in_order() {
        assert_eq!(
            desired_shape(ConveyorShape::TurnRight, ins(true, false, true)),
            ConveyorShape::TurnRight
        );
        assert_eq!(
            desired_shape(ConveyorShape::TurnRight, ins(false, true, false)),
            ConveyorShape::TurnLeft
        );
        assert_eq!(
            desired_shape(ConveyorShape::Straight, ins(false, true, true)),
            ConveyorShape::TurnLeft
        );
        assert_eq!(
            desired_shape(ConveyorShape::TurnLeft, ins(false, false, false)),
            ConveyorShape::Straight
        );
    }
}

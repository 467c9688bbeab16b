//! Spatial lattice for the factory floor.
//!
//! Provides compass [`Direction`]s with the persisted rotation encoding,
//! [`GridPosition`]s, the fixed [`TileKind`] catalog, and the [`Grid`]
//! that stores one tile id and one rotation per cell.
//!
//! Coordinates are y-up: `North` is `+y`, `East` is `+x`. Cells are scanned
//! row-major (y outer, x inner), which is also the order of the flat
//! storage index.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A position on the 2D grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The adjacent position one step in `dir`.
    pub fn neighbor(&self, dir: Direction) -> GridPosition {
        let (dx, dy) = dir.offset();
        GridPosition::new(self.x + dx, self.y + dy)
    }

    /// Manhattan distance to another position.
    pub fn manhattan_distance(&self, other: &GridPosition) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }
}

/// Cardinal direction. The discriminant is the persisted rotation value:
/// rotation increases clockwise starting from east.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    East = 0,
    South = 1,
    West = 2,
    North = 3,
}

impl Direction {
    /// All four directions in rotation order.
    pub fn all() -> [Direction; 4] {
        [
            Direction::East,
            Direction::South,
            Direction::West,
            Direction::North,
        ]
    }

    /// Decode a persisted rotation. Returns `None` outside `0..=3`.
    pub fn from_rotation(rot: u8) -> Option<Direction> {
        match rot {
            0 => Some(Direction::East),
            1 => Some(Direction::South),
            2 => Some(Direction::West),
            3 => Some(Direction::North),
            _ => None,
        }
    }

    /// The persisted rotation value (0..=3).
    pub fn rotation(self) -> u8 {
        self as u8
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::North => Direction::South,
        }
    }

    /// Quarter turn counter-clockwise.
    pub fn left(self) -> Direction {
        match self {
            Direction::East => Direction::North,
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
        }
    }

    /// Quarter turn clockwise.
    pub fn right(self) -> Direction {
        match self {
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
            Direction::North => Direction::East,
        }
    }

    /// Unit offset `(dx, dy)` for this direction (y-up).
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::East => (1, 0),
            Direction::South => (0, -1),
            Direction::West => (-1, 0),
            Direction::North => (0, 1),
        }
    }
}

// ---------------------------------------------------------------------------
// Tile catalog
// ---------------------------------------------------------------------------

/// The fixed machine catalog. The discriminant is the persisted tile id.
///
/// Filters come in three tile ids, one per branch pair; their variant is
/// part of the id rather than entity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum TileKind {
    Empty = 0,
    Conveyor = 1,
    Smelter = 2,
    SellPad = 3,
    Spawner = 4,
    Crusher = 5,
    Splitter = 6,
    Merger = 7,
    Press = 8,
    Roller = 9,
    FilterLeftRight = 10,
    FilterForwardRight = 11,
    FilterForwardLeft = 12,
}

impl TileKind {
    /// Every kind, in id order.
    pub const ALL: [TileKind; 13] = [
        TileKind::Empty,
        TileKind::Conveyor,
        TileKind::Smelter,
        TileKind::SellPad,
        TileKind::Spawner,
        TileKind::Crusher,
        TileKind::Splitter,
        TileKind::Merger,
        TileKind::Press,
        TileKind::Roller,
        TileKind::FilterLeftRight,
        TileKind::FilterForwardRight,
        TileKind::FilterForwardLeft,
    ];

    /// Decode a persisted tile id.
    pub fn from_id(id: u32) -> Option<TileKind> {
        TileKind::ALL.get(usize::try_from(id).ok()?).copied()
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Diagnostic name, e.g. `TILE_CONVEYOR`.
    pub fn name(self) -> &'static str {
        match self {
            TileKind::Empty => "TILE_EMPTY",
            TileKind::Conveyor => "TILE_CONVEYOR",
            TileKind::Smelter => "TILE_SMELTER",
            TileKind::SellPad => "TILE_SELLPAD",
            TileKind::Spawner => "TILE_SPAWNER",
            TileKind::Crusher => "TILE_CRUSHER",
            TileKind::Splitter => "TILE_SPLITTER",
            TileKind::Merger => "TILE_MERGER",
            TileKind::Press => "TILE_PRESS",
            TileKind::Roller => "TILE_ROLLER",
            TileKind::FilterLeftRight => "TILE_FILTER_LR",
            TileKind::FilterForwardRight => "TILE_FILTER_FR",
            TileKind::FilterForwardLeft => "TILE_FILTER_FL",
        }
    }

    /// Conveyor, splitter and merger share one cell and are rewritten into
    /// each other by topology inference.
    pub fn is_belt_family(self) -> bool {
        matches!(
            self,
            TileKind::Conveyor | TileKind::Splitter | TileKind::Merger
        )
    }

    pub fn is_filter(self) -> bool {
        matches!(
            self,
            TileKind::FilterLeftRight | TileKind::FilterForwardRight | TileKind::FilterForwardLeft
        )
    }

    /// Machines that transform one item type into another.
    pub fn is_processor(self) -> bool {
        matches!(
            self,
            TileKind::Smelter | TileKind::Crusher | TileKind::Press | TileKind::Roller
        )
    }
}

/// Diagnostic tile name for a raw id. Unknown ids map to `TILE_UNKNOWN`.
pub fn tile_name(id: u32) -> &'static str {
    TileKind::from_id(id).map_or("TILE_UNKNOWN", TileKind::name)
}

/// Diagnostic rotation name: RIGHT, DOWN, LEFT, UP, or ERROR.
pub fn rotation_name(rot: u8) -> &'static str {
    match rot {
        0 => "RIGHT",
        1 => "DOWN",
        2 => "LEFT",
        3 => "UP",
        _ => "ERROR",
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpatialError {
    #[error("position ({}, {}) is outside the {width}x{height} grid", .position.x, .position.y)]
    OutOfBounds {
        position: GridPosition,
        width: u32,
        height: u32,
    },
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// Two parallel per-cell arrays: tile kind and rotation.
///
/// Every in-bounds cell always holds exactly one kind (possibly
/// [`TileKind::Empty`]) and one rotation. Dimensions are fixed at
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    height: u32,
    tiles: Vec<TileKind>,
    rotations: Vec<Direction>,
}

impl Grid {
    /// Create an all-empty grid facing east.
    pub fn new(width: u32, height: u32) -> Self {
        let cells = width as usize * height as usize;
        Self {
            width,
            height,
            tiles: vec![TileKind::Empty; cells],
            rotations: vec![Direction::East; cells],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn in_bounds(&self, pos: GridPosition) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// Flat row-major index of `pos`, or `None` when out of bounds.
    pub fn index(&self, pos: GridPosition) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    /// Inverse of [`Grid::index`].
    pub fn position(&self, index: usize) -> GridPosition {
        let w = self.width.max(1) as usize;
        GridPosition::new((index % w) as i32, (index / w) as i32)
    }

    /// Tile kind at `pos`. Out-of-bounds cells read as empty.
    pub fn tile(&self, pos: GridPosition) -> TileKind {
        self.index(pos).map_or(TileKind::Empty, |i| self.tiles[i])
    }

    /// Rotation at `pos`. Out-of-bounds cells read as east.
    pub fn rotation(&self, pos: GridPosition) -> Direction {
        self.index(pos).map_or(Direction::East, |i| self.rotations[i])
    }

    /// Overwrite one cell.
    pub fn set(
        &mut self,
        pos: GridPosition,
        kind: TileKind,
        facing: Direction,
    ) -> Result<(), SpatialError> {
        let idx = self.index(pos).ok_or(SpatialError::OutOfBounds {
            position: pos,
            width: self.width,
            height: self.height,
        })?;
        self.tiles[idx] = kind;
        self.rotations[idx] = facing;
        Ok(())
    }

    /// Change only the kind, keeping the player-owned rotation.
    pub fn set_kind(&mut self, pos: GridPosition, kind: TileKind) -> Result<(), SpatialError> {
        let facing = self.rotation(pos);
        self.set(pos, kind, facing)
    }

    /// All positions in scan order (y outer, x inner).
    pub fn positions(&self) -> impl Iterator<Item = GridPosition> + use<> {
        let (w, h) = (self.width as i32, self.height as i32);
        (0..h).flat_map(move |y| (0..w).map(move |x| GridPosition::new(x, y)))
    }

    /// `(kind, rotation)` pairs in scan order.
    pub fn cells(&self) -> impl Iterator<Item = (TileKind, Direction)> + '_ {
        self.tiles.iter().copied().zip(self.rotations.iter().copied())
    }

    /// Number of non-empty cells.
    pub fn occupied_count(&self) -> usize {
        self.tiles.iter().filter(|t| **t != TileKind::Empty).count()
    }
}

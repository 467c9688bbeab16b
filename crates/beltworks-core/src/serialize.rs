//! Compact binary save format.
//!
//! Layout (little-endian, unsigned LEB128 varints, zigzag for signed):
//!
//! ```text
//! u32 magic | u8 version | varint width | varint height
//! RLE cells: (varint run, varint (tile_id << 2 | rotation))* until w*h filled
//! varint next_item_id
//! varint tile_count  { varint cx, varint cy, f32 f0, f32 f1, zz i0, zz i1, zz i2, u8 b0 }*
//! varint item_count  { varint id, u8 type, f32 value, varint cx, varint cy, u8 u, u8 v }*
//! ```
//!
//! [`decode`] never touches a live world; applying a decoded [`SaveData`]
//! is done by `World::apply_save`, which validates before mutating.

use beltworks_spatial::{Direction, TileKind};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a save ("FGS1").
pub const SAVE_MAGIC: u32 = 0x4647_5331;

/// Current format version.
pub const SAVE_VERSION: u8 = 2;

/// Upper bound on `width * height` accepted from a stream.
pub const MAX_CELLS: u64 = 1 << 24;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors from decoding or applying a save.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SaveError {
    #[error("unexpected end of data at byte {0}")]
    UnexpectedEof(usize),
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SAVE_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported save version: expected {}, got {}", SAVE_VERSION, .0)]
    UnsupportedVersion(u8),
    #[error("varint too long at byte {0}")]
    VarIntTooLong(usize),
    #[error("run-length data overflows the grid")]
    RleOverflow,
    #[error("unknown tile id {0}")]
    UnknownTile(u32),
    #[error("invalid grid dimensions {0}x{1}")]
    InvalidDimensions(u32, u32),
    #[error("save is {found_w}x{found_h} but the world is {expected_w}x{expected_h}")]
    DimensionMismatch {
        expected_w: u32,
        expected_h: u32,
        found_w: u32,
        found_h: u32,
    },
    #[error("{0} trailing bytes after save data")]
    TrailingBytes(usize),
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Sparse per-tile state. Field meaning depends on the tile kind.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TileRecord {
    pub cx: u32,
    pub cy: u32,
    pub f0: f32,
    pub f1: f32,
    pub i0: i32,
    pub i1: i32,
    pub i2: i32,
    pub b0: bool,
}

/// One in-flight item. `u`/`v` are world-frame sub-cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemRecord {
    pub id: u32,
    pub type_id: u8,
    pub value: f32,
    pub cx: u32,
    pub cy: u32,
    pub u: u8,
    pub v: u8,
}

/// A decoded save, independent of any live world.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveData {
    pub width: u32,
    pub height: u32,
    /// Row-major `(kind, rotation)` per cell.
    pub cells: Vec<(TileKind, Direction)>,
    pub next_item_id: u32,
    pub tiles: Vec<TileRecord>,
    pub items: Vec<ItemRecord>,
}

impl SaveData {
    /// An all-empty save of the given size.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![(TileKind::Empty, Direction::East); width as usize * height as usize],
            next_item_id: 1,
            tiles: Vec::new(),
            items: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Primitive writer / reader
// ---------------------------------------------------------------------------

fn zigzag(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}

fn unzigzag(v: u32) -> i32 {
    ((v >> 1) as i32) ^ -((v & 1) as i32)
}

#[derive(Default)]
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn varint(&mut self, mut v: u32) {
        while v >= 0x80 {
            self.buf.push((v as u8 & 0x7F) | 0x80);
            v >>= 7;
        }
        self.buf.push(v as u8);
    }

    fn zz(&mut self, v: i32) {
        self.varint(zigzag(v));
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], SaveError> {
        let bytes = self
            .data
            .get(self.pos..self.pos + N)
            .ok_or(SaveError::UnexpectedEof(self.pos))?;
        self.pos += N;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, SaveError> {
        Ok(self.take::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32, SaveError> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn f32(&mut self) -> Result<f32, SaveError> {
        Ok(f32::from_le_bytes(self.take()?))
    }

    fn varint(&mut self) -> Result<u32, SaveError> {
        let start = self.pos;
        let mut result: u32 = 0;
        for shift in (0..35).step_by(7) {
            let byte = self.u8()?;
            let bits = u32::from(byte & 0x7F);
            if shift == 28 && bits > 0x0F {
                return Err(SaveError::VarIntTooLong(start));
            }
            result |= bits << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(SaveError::VarIntTooLong(start))
    }

    fn zz(&mut self) -> Result<i32, SaveError> {
        Ok(unzigzag(self.varint()?))
    }
}

// ---------------------------------------------------------------------------
// Encode / decode
// ---------------------------------------------------------------------------

fn pack(cell: (TileKind, Direction)) -> u32 {
    (u32::from(cell.0.id()) << 2) | u32::from(cell.1.rotation())
}

/// Serialize a save to bytes.
pub fn encode(save: &SaveData) -> Vec<u8> {
    let mut w = Writer::default();
    w.u32(SAVE_MAGIC);
    w.u8(SAVE_VERSION);
    w.varint(save.width);
    w.varint(save.height);

    let mut cells = save.cells.iter().copied().map(pack).peekable();
    while let Some(packed) = cells.next() {
        let mut run = 1u32;
        while cells.next_if_eq(&packed).is_some() {
            run += 1;
        }
        w.varint(run);
        w.varint(packed);
    }

    w.varint(save.next_item_id);

    w.varint(save.tiles.len() as u32);
    for t in &save.tiles {
        w.varint(t.cx);
        w.varint(t.cy);
        w.f32(t.f0);
        w.f32(t.f1);
        w.zz(t.i0);
        w.zz(t.i1);
        w.zz(t.i2);
        w.u8(u8::from(t.b0));
    }

    w.varint(save.items.len() as u32);
    for it in &save.items {
        w.varint(it.id);
        w.u8(it.type_id);
        w.f32(it.value);
        w.varint(it.cx);
        w.varint(it.cy);
        w.u8(it.u);
        w.u8(it.v);
    }
    w.buf
}

/// Parse a save. Fails on bad magic, unknown version, malformed cells,
/// truncation or trailing bytes.
pub fn decode(data: &[u8]) -> Result<SaveData, SaveError> {
    let mut r = Reader::new(data);
    let magic = r.u32()?;
    if magic != SAVE_MAGIC {
        return Err(SaveError::InvalidMagic(magic));
    }
    let version = r.u8()?;
    if version != SAVE_VERSION {
        return Err(SaveError::UnsupportedVersion(version));
    }
    let width = r.varint()?;
    let height = r.varint()?;
    let total = u64::from(width) * u64::from(height);
    if width == 0 || height == 0 || total > MAX_CELLS {
        return Err(SaveError::InvalidDimensions(width, height));
    }
    let total = total as usize;

    let mut cells = Vec::with_capacity(total);
    while cells.len() < total {
        let run = r.varint()? as usize;
        let packed = r.varint()?;
        if run > total - cells.len() {
            return Err(SaveError::RleOverflow);
        }
        let kind = TileKind::from_id(packed >> 2).ok_or(SaveError::UnknownTile(packed >> 2))?;
        let rotation = Direction::from_rotation((packed & 3) as u8).unwrap_or(Direction::East);
        cells.extend(std::iter::repeat_n((kind, rotation), run));
    }

    let next_item_id = r.varint()?;

    let tile_count = r.varint()? as usize;
    let mut tiles = Vec::with_capacity(tile_count.min(r.remaining()));
    for _ in 0..tile_count {
        tiles.push(TileRecord {
            cx: r.varint()?,
            cy: r.varint()?,
            f0: r.f32()?,
            f1: r.f32()?,
            i0: r.zz()?,
            i1: r.zz()?,
            i2: r.zz()?,
            b0: r.u8()? != 0,
        });
    }

    let item_count = r.varint()? as usize;
    let mut items = Vec::with_capacity(item_count.min(r.remaining()));
    for _ in 0..item_count {
        items.push(ItemRecord {
            id: r.varint()?,
            type_id: r.u8()?,
            value: r.f32()?,
            cx: r.varint()?,
            cy: r.varint()?,
            u: r.u8()?,
            v: r.u8()?,
        });
    }

    if r.remaining() > 0 {
        return Err(SaveError::TrailingBytes(r.remaining()));
    }

    Ok(SaveData {
        width,
        height,
        cells,
        next_item_id,
        tiles,
        items,
    })
}

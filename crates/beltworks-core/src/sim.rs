//! Tick clock, advance results and the desync hash.
//!
//! The world advances in fixed ticks. [`World::step`](crate::world::World::step)
//! runs exactly one; [`World::update`](crate::world::World::update) feeds real
//! elapsed seconds into [`SimState::accumulator`] and runs as many whole ticks
//! as fit, carrying the remainder.

use crate::fixed::{Fixed64, Ticks};

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SimState {
    /// Incremented by 1 at the start of each tick.
    pub tick: Ticks,

    /// Unspent real time, in seconds.
    pub accumulator: Fixed64,
}

impl SimState {
    pub fn new() -> Self {
        Self {
            tick: 0,
            accumulator: Fixed64::ZERO,
        }
    }
}

impl Default for SimState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Advance result
// ---------------------------------------------------------------------------

/// Result of a `World::update()` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceResult {
    /// Number of ticks actually executed.
    pub steps_run: u64,
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// Deterministic FNV-1a (64-bit) hash of world state, for comparing runs.
/// Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

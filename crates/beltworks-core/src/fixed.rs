use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Sub-cells per tick for a speed given in sub-cells per second.
#[inline]
pub fn per_tick(per_second: f64, tick_rate: u32) -> Fixed64 {
    f64_to_fixed64(per_second / f64::from(tick_rate.max(1)))
}

/// Whole ticks covering `seconds`, rounded to nearest and at least one.
#[inline]
pub fn seconds_to_ticks(seconds: f64, tick_rate: u32) -> u32 {
    let ticks = (seconds * f64::from(tick_rate)).round();
    if ticks.is_finite() && ticks >= 1.0 {
        ticks.min(f64::from(u32::MAX)) as u32
    } else {
        1
    }
}

/// Seconds represented by a tick count, as persisted in save records.
#[inline]
pub fn ticks_to_seconds(ticks: u32, tick_rate: u32) -> f32 {
    (f64::from(ticks) / f64::from(tick_rate.max(1))) as f32
}

/// Restore a persisted seconds value to ticks. Negative or NaN reads as 0.
#[inline]
pub fn persisted_seconds_to_ticks(seconds: f32, tick_rate: u32) -> u32 {
    let ticks = (f64::from(seconds) * f64::from(tick_rate)).round();
    if ticks.is_finite() && ticks > 0.0 {
        ticks.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

//! Tempo-derived timing.

use crate::{STEPS_PER_BAR, STEPS_PER_PATTERN};

/// Seconds between consecutive steps (sixteenth notes) at `bpm`.
#[inline]
pub fn seconds_per_step(bpm: f64) -> f64 {
    60.0 / bpm / (STEPS_PER_BAR / 4) as f64
}

/// Whether `bpm` can drive the scheduler.
pub fn is_valid_bpm(bpm: f64) -> bool {
    bpm.is_finite() && bpm > 0.0
}

/// Step shown to the listener at audio time `now`.
///
/// Counts whole steps elapsed since `play_start` from `start_step`,
/// wrapping at the pattern length. Before `play_start` the start step is
/// shown.
pub fn display_step(start_step: usize, play_start: f64, now: f64, seconds_per_step: f64) -> usize {
    if seconds_per_step <= 0.0 || now <= play_start {
        return start_step % STEPS_PER_PATTERN;
    }
    let elapsed = libm::floor((now - play_start) / seconds_per_step) as usize;
    (start_step + elapsed) % STEPS_PER_PATTERN
}

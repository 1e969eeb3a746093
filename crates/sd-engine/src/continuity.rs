//! Continuous-mode pattern advance at bar boundaries.

use sd_ir::{PlaybackMode, STEPS_PER_BAR};

use crate::store::StateStore;

/// Advances to the next pattern after the last step of every bar when
/// continuous mode is on and there is more than one pattern.
///
/// The switch only swaps data in the store. Scheduling time and cursors
/// are untouched, so there is no gap at the boundary.
#[derive(Debug, Default)]
pub struct ContinuityController {
    switches: u64,
    failures: u64,
}

impl ContinuityController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `step` is the last step of a bar.
    pub fn is_bar_end(step: usize) -> bool {
        step % STEPS_PER_BAR == STEPS_PER_BAR - 1
    }

    /// Called right after a bar's last step was scheduled. Returns the
    /// new pattern index if a switch happened. Failures are logged and
    /// leave the current pattern playing.
    pub fn on_bar_end<S: StateStore + ?Sized>(&mut self, store: &mut S) -> Option<usize> {
        if store.playback_mode() != PlaybackMode::Continuous {
            return None;
        }
        let count = store.pattern_count();
        if count <= 1 {
            return None;
        }
        let from = store.current_pattern();
        let next = (from + 1) % count;
        match store.switch_pattern(next) {
            Ok(()) => {
                self.switches += 1;
                log::debug!("continuous: pattern {from} -> {next}");
                Some(next)
            }
            Err(e) => {
                self.failures += 1;
                log::error!("continuous: switch {from} -> {next} failed, staying: {e}");
                None
            }
        }
    }

    pub fn switches(&self) -> u64 {
        self.switches
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }
}

//! Adaptive lookahead horizon.

/// Tick samples per adjustment.
pub const WINDOW: usize = 10;
pub const MIN_LOOKAHEAD: f64 = 0.05;
pub const MAX_LOOKAHEAD: f64 = 0.5;
/// Horizon change per adjustment, in seconds.
pub const ADJUST_STEP: f64 = 0.01;

/// Grow the horizon when the slowest tick exceeds this share of it.
const GROW_THRESHOLD: f64 = 0.5;
/// Shrink it when the average tick is below this share.
const SHRINK_THRESHOLD: f64 = 0.1;

/// Collects tick execution times and nudges the lookahead horizon.
#[derive(Debug, Default)]
pub struct LookaheadTuner {
    window: heapless::Vec<f64, WINDOW>,
}

impl LookaheadTuner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }

    /// Record one tick's execution time (seconds). Once a full window is
    /// collected, returns the new horizon if it should change.
    pub fn observe(&mut self, exec: f64, horizon: f64) -> Option<f64> {
        if self.window.push(exec).is_err() || !self.window.is_full() {
            return None;
        }
        let max = self.window.iter().copied().fold(0.0, f64::max);
        let avg = self.window.iter().sum::<f64>() / WINDOW as f64;
        self.window.clear();

        let next = if max > horizon * GROW_THRESHOLD {
            horizon + ADJUST_STEP
        } else if avg < horizon * SHRINK_THRESHOLD && horizon > MIN_LOOKAHEAD {
            horizon - ADJUST_STEP
        } else {
            return None;
        };
        let next = next.clamp(MIN_LOOKAHEAD, MAX_LOOKAHEAD);
        (next != horizon).then_some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(t: &mut LookaheadTuner, exec: f64, horizon: f64) -> Option<f64> {
        let mut out = None;
        for _ in 0..WINDOW {
            out = t.observe(exec, horizon);
        }
        out
    }

    #[test]
    fn waits_for_full_window() {
        let mut t = LookaheadTuner::new();
        for _ in 0..WINDOW - 1 {
            assert_eq!(t.observe(1.0, 0.1), None);
        }
        assert!(t.observe(1.0, 0.1).is_some());
    }

    #[test]
    fn slow_ticks_grow_horizon() {
        let mut t = LookaheadTuner::new();
        let h = feed(&mut t, 0.06, 0.1).expect("grow");
        assert!((h - 0.11).abs() < 1e-12);
    }

    #[test]
    fn fast_ticks_shrink_horizon() {
        let mut t = LookaheadTuner::new();
        let h = feed(&mut t, 0.001, 0.1).expect("shrink");
        assert!((h - 0.09).abs() < 1e-12);
    }

    #[test]
    fn steady_ticks_keep_horizon() {
        let mut t = LookaheadTuner::new();
        assert_eq!(feed(&mut t, 0.02, 0.1), None);
    }

    #[test]
    fn clamped_to_bounds() {
        let mut t = LookaheadTuner::new();
        assert_eq!(feed(&mut t, 0.0, MIN_LOOKAHEAD), None);
        assert_eq!(feed(&mut t, 10.0, MAX_LOOKAHEAD), None);
        let h = feed(&mut t, 0.0, 0.055).expect("shrink");
        assert_eq!(h, MIN_LOOKAHEAD);
    }
}

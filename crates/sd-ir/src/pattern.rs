//! 64-step trigger patterns.

/// Steps in one pattern.
pub const STEPS_PER_PATTERN: usize = 64;

/// Steps in one bar. Pattern continuity switches happen at bar ends.
pub const STEPS_PER_BAR: usize = 16;

/// An ordered sequence of on/off trigger slots, one per step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepPattern([bool; STEPS_PER_PATTERN]);

impl Default for StepPattern {
    fn default() -> Self {
        Self([false; STEPS_PER_PATTERN])
    }
}

impl StepPattern {
    /// An empty pattern.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pattern from a step string, repeated to fill 64 steps.
    ///
    /// `x`, `X` and `1` are active steps; any other non-whitespace
    /// character is a rest. `"x..."` gives a trigger on every beat.
    pub fn repeating(steps: &str) -> Self {
        let mut pattern = Self::default();
        let cells: alloc::vec::Vec<bool> = steps
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| matches!(c, 'x' | 'X' | '1'))
            .collect();
        if cells.is_empty() {
            return pattern;
        }
        for (i, slot) in pattern.0.iter_mut().enumerate() {
            *slot = cells[i % cells.len()];
        }
        pattern
    }

    /// Whether `step` triggers. Out-of-range steps are inactive.
    pub fn get(&self, step: usize) -> bool {
        self.0.get(step).copied().unwrap_or(false)
    }

    /// Set one step. Out-of-range steps are ignored.
    pub fn set(&mut self, step: usize, active: bool) {
        if let Some(slot) = self.0.get_mut(step) {
            *slot = active;
        }
    }

    /// Number of active steps.
    pub fn active_count(&self) -> usize {
        self.0.iter().filter(|&&s| s).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeating_fills_all_steps() {
        let p = StepPattern::repeating("x...");
        assert_eq!(p.active_count(), 16);
        assert!(p.get(0));
        assert!(!p.get(1));
        assert!(p.get(60));
    }

    #[test]
    fn repeating_ignores_whitespace() {
        let p = StepPattern::repeating("x . x .");
        assert!(p.get(0) && p.get(2) && !p.get(1));
    }

    #[test]
    fn empty_string_is_silent() {
        assert_eq!(StepPattern::repeating("  ").active_count(), 0);
    }

    #[test]
    fn out_of_range_is_inactive() {
        let mut p = StepPattern::repeating("x");
        p.set(64, false);
        assert!(!p.get(64));
        assert_eq!(p.active_count(), 64);
    }
}

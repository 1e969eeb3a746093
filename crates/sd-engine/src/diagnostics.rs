//! Per-bar timing capture for a reference channel.
//!
//! For every note on the reference channel the collector keeps the
//! scheduled start, the audible duration and the end time the graph
//! reported. A bar is reported once its last note has had time to end.
//! Nothing here feeds back into scheduling.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use sd_ir::STEPS_PER_BAR;

use crate::config::DiagnosticsConfig;

/// Reports kept for inspection.
pub const HISTORY_LEN: usize = 16;

/// Timing of one step on the reference channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepTiming {
    pub scheduled_start: f64,
    pub audible_duration: f64,
    /// End time reported by the graph, if it arrived in time
    pub actual_end: Option<f64>,
}

impl StepTiming {
    pub fn expected_end(&self) -> f64 {
        self.scheduled_start + self.audible_duration
    }

    /// Actual minus expected end, in seconds.
    pub fn end_drift(&self) -> Option<f64> {
        self.actual_end.map(|end| end - self.expected_end())
    }
}

/// Timing summary of one bar. Steps with no note are `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct BarReport {
    pub bar: u64,
    pub steps: [Option<StepTiming>; STEPS_PER_BAR],
}

impl BarReport {
    /// Mean absolute end drift over steps with a reported end.
    pub fn average_end_drift(&self) -> Option<f64> {
        let drifts: Vec<f64> = self.steps.iter().flatten().filter_map(|s| s.end_drift()).collect();
        if drifts.is_empty() {
            return None;
        }
        Some(drifts.iter().map(|d| d.abs()).sum::<f64>() / drifts.len() as f64)
    }

    /// Steps that have a note.
    pub fn note_count(&self) -> usize {
        self.steps.iter().flatten().count()
    }
}

impl fmt::Display for BarReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "step timing for bar {}", self.bar + 1)?;
        for (i, row) in self.steps.iter().enumerate() {
            write!(f, "step {:>2} | ", i + 1)?;
            match row {
                Some(t) => {
                    write!(f, "start {:.5} s | ", t.scheduled_start)?;
                    match t.actual_end {
                        Some(end) => writeln!(
                            f,
                            "end {:.5} s | audible {:.5} s | expected {:.5} s | drift {:.5} s",
                            end,
                            t.audible_duration,
                            t.expected_end(),
                            end - t.expected_end()
                        )?,
                        None => writeln!(f, "end pending | audible {:.5} s", t.audible_duration)?,
                    }
                }
                None => writeln!(f, "---")?,
            }
        }
        match self.average_end_drift() {
            Some(avg) => write!(f, "avg end drift: {avg:.6} s"),
            None => write!(f, "no completed steps"),
        }
    }
}

#[derive(Debug)]
struct PendingBar {
    steps: [Option<StepTiming>; STEPS_PER_BAR],
    flush_at: Option<f64>,
}

impl Default for PendingBar {
    fn default() -> Self {
        Self { steps: [None; STEPS_PER_BAR], flush_at: None }
    }
}

/// Collects [`StepTiming`]s into bars and emits [`BarReport`]s.
#[derive(Debug)]
pub struct DiagnosticsCollector {
    config: DiagnosticsConfig,
    pending: BTreeMap<u64, PendingBar>,
    history: VecDeque<BarReport>,
}

fn locate(absolute_step: u64) -> (u64, usize) {
    let bar_len = STEPS_PER_BAR as u64;
    (absolute_step / bar_len, (absolute_step % bar_len) as usize)
}

impl DiagnosticsCollector {
    pub fn new(config: DiagnosticsConfig) -> Self {
        Self { config, pending: BTreeMap::new(), history: VecDeque::with_capacity(HISTORY_LEN) }
    }

    pub fn reference_channel(&self) -> usize {
        self.config.reference_channel
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Forget pending bars. History is kept.
    pub fn reset(&mut self) {
        self.pending.clear();
    }

    /// A note was scheduled on the reference channel.
    pub fn note_scheduled(&mut self, absolute_step: u64, start: f64, audible_duration: f64) {
        if !self.config.enabled {
            return;
        }
        let (bar, idx) = locate(absolute_step);
        self.pending.entry(bar).or_default().steps[idx] =
            Some(StepTiming { scheduled_start: start, audible_duration, actual_end: None });
    }

    /// The graph reported the end of the reference note at `absolute_step`.
    /// Ends for bars already reported or never recorded are ignored.
    pub fn note_ended(&mut self, absolute_step: u64, end_time: f64) {
        let (bar, idx) = locate(absolute_step);
        if let Some(timing) = self.pending.get_mut(&bar).and_then(|b| b.steps[idx].as_mut()) {
            timing.actual_end = Some(end_time);
        }
    }

    /// The last step of `bar` was scheduled at `step_time`. The bar is
    /// reported once its last note has ended plus the flush margin.
    pub fn bar_scheduled(&mut self, absolute_step: u64, step_time: f64) {
        if !self.config.enabled {
            return;
        }
        let (bar, idx) = locate(absolute_step);
        let pending = self.pending.entry(bar).or_default();
        let audible = pending.steps[idx].map(|s| s.audible_duration).unwrap_or(0.0);
        pending.flush_at = Some(step_time + audible + self.config.flush_margin);
    }

    /// Report every bar whose flush time has passed. Returns how many.
    pub fn flush(&mut self, now: f64) -> usize {
        let due: Vec<u64> = self
            .pending
            .iter()
            .filter(|(_, b)| b.flush_at.is_some_and(|t| t <= now))
            .map(|(bar, _)| *bar)
            .collect();
        for bar in &due {
            if let Some(pending) = self.pending.remove(bar) {
                let report = BarReport { bar: *bar, steps: pending.steps };
                log::debug!("{report}");
                if self.history.len() == HISTORY_LEN {
                    self.history.pop_front();
                }
                self.history.push_back(report);
            }
        }
        due.len()
    }

    /// Most recent reports, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &BarReport> {
        self.history.iter()
    }

    pub fn latest(&self) -> Option<&BarReport> {
        self.history.back()
    }
}

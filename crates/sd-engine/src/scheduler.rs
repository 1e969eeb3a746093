//! Lookahead scheduler.
//!
//! A repeating tick keeps a window of steps scheduled ahead of the audio
//! clock. Step times come from a tempo anchor, so each interval is exactly
//! one step at the tempo in force, however late the tick wakes up. The
//! display step shown to observers is derived from the audio clock, never
//! from the scheduling cursor.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use sd_ir::timing::{display_step, is_valid_bpm, seconds_per_step};
use sd_ir::{Transport, STEPS_PER_PATTERN};

use crate::clock::{AudioClock, ClockError};
use crate::config::SchedulerConfig;
use crate::continuity::ContinuityController;
use crate::diagnostics::{BarReport, DiagnosticsCollector};
use crate::graph::{GraphEvent, NoteSink, MAX_CHANNELS};
use crate::lookahead::LookaheadTuner;
use crate::registry::{LiveNote, NoteRegistry};
use crate::render::render_step;
use crate::store::StateStore;

/// Ticks slower than this are logged.
const SLOW_TICK: Duration = Duration::from_millis(5);

/// Notes unreported this long after their expected end are dropped.
const EXPIRE_GRACE: f64 = 1.0;

/// Point on the timeline from which step times are computed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TempoAnchor {
    pub time: f64,
    pub absolute_step: u64,
    pub bpm: f64,
}

impl TempoAnchor {
    /// Start time of `absolute_step` at this anchor's tempo.
    pub fn time_of(&self, absolute_step: u64) -> f64 {
        let steps = absolute_step.saturating_sub(self.absolute_step) as f64;
        self.time + steps * seconds_per_step(self.bpm)
    }
}

/// Everything the scheduler tracks while running.
#[derive(Clone, Debug, PartialEq)]
pub struct SchedulerState {
    /// Audio clock time of the next step to schedule
    pub next_step_time: f64,
    /// Scheduling cursor in [0, 64)
    pub current_step: usize,
    /// Steps scheduled since start, offset by the start step. Never wraps.
    pub absolute_step: u64,
    /// Audio time of the first step
    pub play_start: f64,
    /// Step playback resumed from
    pub start_step: usize,
    anchor: TempoAnchor,
    display_anchor: TempoAnchor,
    /// Tempo changes scheduled but not yet reached by the audio clock, oldest first
    pending_anchors: VecDeque<TempoAnchor>,
}

impl SchedulerState {
    pub fn anchor(&self) -> TempoAnchor {
        self.anchor
    }

    /// Move the display onto every tempo change the audio clock has reached.
    fn promote_display_anchor(&mut self, now: f64) {
        while let Some(next) = self.pending_anchors.front() {
            if next.time > now {
                break;
            }
            self.display_anchor = *next;
            self.pending_anchors.pop_front();
        }
    }

    /// Step the listener hears at `now`.
    pub fn display_step(&self, now: f64) -> usize {
        let a = &self.display_anchor;
        let step = (a.absolute_step % STEPS_PER_PATTERN as u64) as usize;
        display_step(step, a.time, now, seconds_per_step(a.bpm))
    }
}

/// What one tick did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickSummary {
    pub steps_scheduled: usize,
    pub notes_started: usize,
    pub notes_ended: usize,
    /// Pattern made current by continuous mode during this tick
    pub switched_to: Option<usize>,
    pub display_step: usize,
    pub bars_reported: usize,
    pub elapsed: Duration,
}

/// Keeps audio scheduled ahead of the audio clock.
///
/// Idle until [`start`](Self::start), then driven by [`tick`](Self::tick)
/// every `tick_interval` until [`stop`](Self::stop).
pub struct LookaheadScheduler {
    config: SchedulerConfig,
    lookahead: f64,
    state: Option<SchedulerState>,
    registry: NoteRegistry,
    continuity: ContinuityController,
    diagnostics: DiagnosticsCollector,
    tuner: Option<LookaheadTuner>,
    /// Last gain sent per channel
    gains: Vec<f32>,
    bad_tempo_logged: bool,
    excess_channels_logged: bool,
}

impl LookaheadScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let tuner = config.adaptive_lookahead.then(LookaheadTuner::new);
        Self {
            lookahead: config.lookahead,
            diagnostics: DiagnosticsCollector::new(config.diagnostics.clone()),
            config,
            state: None,
            registry: NoteRegistry::new(),
            continuity: ContinuityController::new(),
            tuner,
            gains: Vec::new(),
            bad_tempo_logged: false,
            excess_channels_logged: false,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&SchedulerState> {
        self.state.as_ref()
    }

    /// Current lookahead horizon in seconds.
    pub fn lookahead(&self) -> f64 {
        self.lookahead
    }

    /// Notes handed to the graph that have not ended yet.
    pub fn live_notes(&self) -> usize {
        self.registry.len()
    }

    pub fn continuity(&self) -> &ContinuityController {
        &self.continuity
    }

    /// Recent bar timing reports, oldest first.
    pub fn bar_reports(&self) -> impl Iterator<Item = &BarReport> {
        self.diagnostics.history()
    }

    /// Begin playback from the store's current step.
    ///
    /// Returns `Ok(false)` if already running. If the clock cannot resume
    /// nothing is changed and the caller may try again.
    pub fn start<C, S>(&mut self, clock: &C, store: &mut S) -> Result<bool, ClockError>
    where
        C: AudioClock + ?Sized,
        S: StateStore + ?Sized,
    {
        if self.state.is_some() {
            return Ok(false);
        }
        if let Err(e) = clock.resume() {
            log::warn!("audio clock did not resume, start deferred: {e}");
            return Err(e);
        }

        let start_step = store.transport().current_step % STEPS_PER_PATTERN;
        let play_start = clock.now() + self.config.start_delay;
        let anchor = TempoAnchor { time: play_start, absolute_step: start_step as u64, bpm: store.bpm() };
        self.state = Some(SchedulerState {
            next_step_time: play_start,
            current_step: start_step,
            absolute_step: start_step as u64,
            play_start,
            start_step,
            anchor,
            display_anchor: anchor,
            pending_anchors: VecDeque::new(),
        });
        self.registry.clear();
        self.gains.clear();
        self.diagnostics.reset();
        self.lookahead = self.config.lookahead;
        if let Some(tuner) = &mut self.tuner {
            tuner.reset();
        }
        self.bad_tempo_logged = false;
        store.set_transport(Transport { playing: true, current_step: start_step });
        log::info!("scheduler started at step {start_step}, first step at {play_start:.3} s");
        Ok(true)
    }

    /// Run one scheduling pass. Does nothing while idle.
    pub fn tick<C, S, N>(&mut self, clock: &C, store: &mut S, sink: &mut N) -> TickSummary
    where
        C: AudioClock + ?Sized,
        S: StateStore + ?Sized,
        N: NoteSink + ?Sized,
    {
        let Some(mut state) = self.state.take() else {
            return TickSummary::default();
        };
        let entered = Instant::now();
        let now = clock.now();
        let mut summary = TickSummary { notes_ended: self.drain_events(now, store, sink), ..Default::default() };
        self.sync_gains(store, sink);
        let channel_count = store.channels().len();
        if channel_count > MAX_CHANNELS && !self.excess_channels_logged {
            log::warn!("{channel_count} channels, only the first {MAX_CHANNELS} play");
        }
        self.excess_channels_logged = channel_count > MAX_CHANNELS;

        loop {
            let bpm = store.bpm();
            if !is_valid_bpm(bpm) {
                if !self.bad_tempo_logged {
                    log::warn!("tempo {bpm} is not playable, holding");
                    self.bad_tempo_logged = true;
                }
                break;
            }
            self.bad_tempo_logged = false;
            if bpm != state.anchor.bpm {
                state.anchor = TempoAnchor { time: state.next_step_time, absolute_step: state.absolute_step, bpm };
                state.pending_anchors.push_back(state.anchor);
            }
            if state.next_step_time >= now + self.lookahead {
                break;
            }

            let step = state.current_step;
            let time = state.next_step_time;
            let absolute = state.absolute_step;
            summary.notes_started += render_step(step, time, absolute, store, sink, &mut self.registry);
            if self.diagnostics.is_enabled() {
                let reference = self.diagnostics.reference_channel();
                if let Some(ap) = store.active_playback(reference).filter(|ap| ap.scheduled_time == time) {
                    self.diagnostics.note_scheduled(absolute, time, ap.duration);
                }
            }

            state.absolute_step += 1;
            state.current_step = (step + 1) % STEPS_PER_PATTERN;
            state.next_step_time = state.anchor.time_of(state.absolute_step);
            summary.steps_scheduled += 1;

            if ContinuityController::is_bar_end(step) {
                self.diagnostics.bar_scheduled(absolute, time);
                if let Some(next) = self.continuity.on_bar_end(store) {
                    summary.switched_to = Some(next);
                    self.gains.clear();
                    self.sync_gains(store, sink);
                }
            }
        }

        state.promote_display_anchor(now);
        summary.display_step = state.display_step(now);
        store.set_transport(Transport { playing: true, current_step: summary.display_step });
        summary.bars_reported = self.diagnostics.flush(now);
        self.state = Some(state);

        summary.elapsed = entered.elapsed();
        if summary.elapsed > SLOW_TICK {
            log::warn!("slow scheduler tick: {:?} for {} steps", summary.elapsed, summary.steps_scheduled);
        }
        if let Some(tuner) = &mut self.tuner {
            if let Some(next) = tuner.observe(summary.elapsed.as_secs_f64(), self.lookahead) {
                log::debug!("lookahead {:.0} ms -> {:.0} ms", self.lookahead * 1000.0, next * 1000.0);
                self.lookahead = next;
            }
        }
        summary
    }

    /// Silence everything and return to idle. Safe to call when idle.
    /// Returns whether playback was running.
    pub fn stop<S, N>(&mut self, store: &mut S, sink: &mut N) -> bool
    where
        S: StateStore + ?Sized,
        N: NoteSink + ?Sized,
    {
        let was_running = self.state.take().is_some();
        if let Err(e) = sink.stop_all() {
            log::warn!("stop: graph did not take stop command: {e}");
        }
        sink.release_retired();
        self.registry.clear();
        self.gains.clear();
        self.diagnostics.reset();
        store.clear_active_playback();
        store.set_transport(Transport { playing: false, current_step: 0 });
        if was_running {
            log::info!("scheduler stopped");
        }
        was_running
    }

    /// Handle end reports from the graph, then expire notes whose report
    /// never came. Returns the number of notes ended.
    fn drain_events<S, N>(&mut self, now: f64, store: &mut S, sink: &mut N) -> usize
    where
        S: StateStore + ?Sized,
        N: NoteSink + ?Sized,
    {
        sink.release_retired();
        let mut ended = 0;
        while let Some(GraphEvent::Ended { key, end_time }) = sink.poll_event() {
            if let Some(note) = self.registry.remove(key) {
                self.note_ended(store, note, end_time);
                ended += 1;
            }
        }
        for (_, note) in self.registry.expire(now, EXPIRE_GRACE) {
            log::debug!("note on channel {} at {:.3} s never reported its end", note.channel, note.scheduled_time);
            self.note_ended(store, note, note.expected_end());
            ended += 1;
        }
        ended
    }

    /// Clear the channel's active playback unless a later note replaced it.
    fn note_ended<S: StateStore + ?Sized>(&mut self, store: &mut S, note: LiveNote, end_time: f64) {
        if note.channel == self.diagnostics.reference_channel() {
            self.diagnostics.note_ended(note.absolute_step, end_time);
        }
        if self.registry.has_note_at(note.channel, note.scheduled_time) {
            return;
        }
        let current = store.active_playback(note.channel);
        if current.is_some_and(|ap| ap.scheduled_time == note.scheduled_time) {
            store.set_active_playback(note.channel, None);
        }
    }

    /// Send channel gains that changed since the last sync.
    fn sync_gains<S, N>(&mut self, store: &S, sink: &mut N)
    where
        S: StateStore + ?Sized,
        N: NoteSink + ?Sized,
    {
        let channels = store.channels();
        let any_solo = channels.iter().any(|c| c.solo);
        // NaN never compares equal, so new slots are always sent
        let channels = &channels[..channels.len().min(MAX_CHANNELS)];
        self.gains.resize(channels.len(), f32::NAN);
        for (i, ch) in channels.iter().enumerate() {
            let gain = ch.effective_gain(any_solo);
            if self.gains[i] == gain {
                continue;
            }
            match sink.set_channel_gain(i, gain) {
                Ok(()) => self.gains[i] = gain,
                Err(e) => log::warn!("channel {i} gain not sent: {e}"),
            }
        }
    }
}

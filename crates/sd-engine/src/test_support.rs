//! In-memory collaborators for engine tests.

use std::cell::Cell;
use std::collections::VecDeque;

use sd_ir::{ActivePlayback, Channel, PlaybackMode, Transport, DEFAULT_BPM};

use crate::clock::{AudioClock, ClockError};
use crate::graph::{GraphError, GraphEvent, NoteSink};
use crate::registry::NoteKey;
use crate::store::{StateStore, SwitchError};
use crate::voice::Voice;

pub struct TestStore {
    pub patterns: Vec<Vec<Channel>>,
    pub current: usize,
    pub bpm: f64,
    pub mode: PlaybackMode,
    pub transport: Transport,
    pub fail_switch: bool,
    pub transport_writes: usize,
}

impl TestStore {
    pub fn with_channels(channels: Vec<Channel>) -> Self {
        Self::with_patterns(1, channels)
    }

    /// `count` patterns with the same channels.
    pub fn with_patterns(count: usize, channels: Vec<Channel>) -> Self {
        Self {
            patterns: (0..count).map(|_| channels.clone()).collect(),
            current: 0,
            bpm: DEFAULT_BPM,
            mode: PlaybackMode::Single,
            transport: Transport::default(),
            fail_switch: false,
            transport_writes: 0,
        }
    }
}

impl StateStore for TestStore {
    fn bpm(&self) -> f64 {
        self.bpm
    }

    fn playback_mode(&self) -> PlaybackMode {
        self.mode
    }

    fn channels(&self) -> &[Channel] {
        &self.patterns[self.current]
    }

    fn transport(&self) -> Transport {
        self.transport
    }

    fn set_transport(&mut self, transport: Transport) {
        self.transport = transport;
        self.transport_writes += 1;
    }

    fn set_active_playback(&mut self, channel: usize, playback: Option<ActivePlayback>) {
        if let Some(ch) = self.patterns[self.current].get_mut(channel) {
            ch.active_playback = playback;
        }
    }

    fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    fn current_pattern(&self) -> usize {
        self.current
    }

    fn switch_pattern(&mut self, index: usize) -> Result<(), SwitchError> {
        if self.fail_switch {
            return Err(SwitchError::Rehydrate { channel: 0, reason: "test failure".into() });
        }
        if index >= self.patterns.len() {
            return Err(SwitchError::InvalidIndex { index, count: self.patterns.len() });
        }
        self.current = index;
        Ok(())
    }
}

/// Clock moved by hand.
pub struct ManualClock {
    pub now: Cell<f64>,
    pub fail_resume: Cell<bool>,
    pub resumes: Cell<u32>,
}

impl ManualClock {
    pub fn new(now: f64) -> Self {
        Self { now: Cell::new(now), fail_resume: Cell::new(false), resumes: Cell::new(0) }
    }

    pub fn set(&self, now: f64) {
        self.now.set(now);
    }

    pub fn advance(&self, dt: f64) {
        self.now.set(self.now.get() + dt);
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }

    fn resume(&self) -> Result<(), ClockError> {
        self.resumes.set(self.resumes.get() + 1);
        if self.fail_resume.get() {
            Err(ClockError::Suspended("no user gesture".into()))
        } else {
            Ok(())
        }
    }
}

/// Sink that records commands instead of playing them.
pub struct RecordingSink {
    pub sample_rate: u32,
    pub started: Vec<(NoteKey, Voice)>,
    /// Notes ever started, including ones since ended or cleared
    pub started_total: usize,
    pub stopped: Vec<NoteKey>,
    pub stop_all_calls: usize,
    pub gains: Vec<(usize, f32)>,
    pub events: VecDeque<GraphEvent>,
    pub refuse: bool,
}

impl RecordingSink {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            started: Vec::new(),
            started_total: 0,
            stopped: Vec::new(),
            stop_all_calls: 0,
            gains: Vec::new(),
            events: VecDeque::new(),
            refuse: false,
        }
    }

    /// Queue an end event for every started note, ending at `end_time`.
    pub fn end_all(&mut self, end_time: f64) {
        for (key, _) in self.started.drain(..) {
            self.events.push_back(GraphEvent::Ended { key, end_time });
        }
    }
}

impl NoteSink for RecordingSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start_note(&mut self, key: NoteKey, voice: Voice) -> Result<(), GraphError> {
        if self.refuse {
            return Err(GraphError::QueueFull);
        }
        self.started.push((key, voice));
        self.started_total += 1;
        Ok(())
    }

    fn stop_note(&mut self, key: NoteKey) -> Result<(), GraphError> {
        self.stopped.push(key);
        Ok(())
    }

    fn stop_all(&mut self) -> Result<(), GraphError> {
        self.stop_all_calls += 1;
        self.started.clear();
        Ok(())
    }

    fn set_channel_gain(&mut self, channel: usize, gain: f32) -> Result<(), GraphError> {
        self.gains.push((channel, gain));
        Ok(())
    }

    fn poll_event(&mut self) -> Option<GraphEvent> {
        self.events.pop_front()
    }
}

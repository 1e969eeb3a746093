//! Session: the sequence bank the scheduler plays from.

use sd_engine::{StateStore, SwitchError};
use sd_ir::{ActivePlayback, Channel, PlaybackMode, Sequence, Transport, STEPS_PER_PATTERN};

/// An ordered, non-empty list of sequences with one current.
#[derive(Clone, Debug)]
pub struct Session {
    sequences: Vec<Sequence>,
    current: usize,
    mode: PlaybackMode,
    transport: Transport,
}

impl Session {
    pub fn new(first: Sequence) -> Self {
        Self {
            sequences: vec![first],
            current: 0,
            mode: PlaybackMode::Single,
            transport: Transport::default(),
        }
    }

    /// Append a sequence, returning its index.
    pub fn add_sequence(&mut self, sequence: Sequence) -> usize {
        self.sequences.push(sequence);
        self.sequences.len() - 1
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn current(&self) -> &Sequence {
        &self.sequences[self.current]
    }

    /// Live edits go here; the scheduler picks them up on its next step.
    pub fn current_mut(&mut self) -> &mut Sequence {
        &mut self.sequences[self.current]
    }

    pub fn set_playback_mode(&mut self, mode: PlaybackMode) {
        self.mode = mode;
    }

    /// Set the step the next start resumes from.
    pub fn seek(&mut self, step: usize) {
        self.transport.current_step = step % STEPS_PER_PATTERN;
    }
}

/// Check every loaded sample of `sequence` can play and build the
/// reversed buffers it will need.
fn rehydrate(sequence: &Sequence) -> Result<(), SwitchError> {
    for (i, ch) in sequence.channels.iter().enumerate() {
        let Some(sample) = ch.sample() else {
            continue;
        };
        sample
            .validate()
            .map_err(|e| SwitchError::Rehydrate { channel: i, reason: e.to_string() })?;
        if ch.reverse {
            ch.reversed_sample();
        }
    }
    Ok(())
}

impl StateStore for Session {
    fn bpm(&self) -> f64 {
        self.current().bpm
    }

    fn playback_mode(&self) -> PlaybackMode {
        self.mode
    }

    fn channels(&self) -> &[Channel] {
        &self.current().channels
    }

    fn transport(&self) -> Transport {
        self.transport
    }

    fn set_transport(&mut self, transport: Transport) {
        self.transport = transport;
    }

    fn set_active_playback(&mut self, channel: usize, playback: Option<ActivePlayback>) {
        if let Some(ch) = self.current_mut().channels.get_mut(channel) {
            ch.active_playback = playback;
        }
    }

    fn clear_active_playback(&mut self) {
        self.current_mut().clear_active_playback();
    }

    fn pattern_count(&self) -> usize {
        self.sequences.len()
    }

    fn current_pattern(&self) -> usize {
        self.current
    }

    fn switch_pattern(&mut self, index: usize) -> Result<(), SwitchError> {
        let count = self.sequences.len();
        let incoming = self.sequences.get(index).ok_or(SwitchError::InvalidIndex { index, count })?;
        rehydrate(incoming)?;
        self.current_mut().clear_active_playback();
        self.current = index;
        Ok(())
    }
}

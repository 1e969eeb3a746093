//! The State Store seam.
//!
//! The scheduler never caches channel data: every tick it reads tempo,
//! mode and channels through this trait, and it publishes transport and
//! active-playback snapshots back through it.

use sd_ir::{ActivePlayback, Channel, PlaybackMode, Transport};

/// A pattern switch was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SwitchError {
    #[error("pattern {index} out of range ({count} patterns)")]
    InvalidIndex { index: usize, count: usize },
    #[error("channel {channel} could not be rehydrated: {reason}")]
    Rehydrate { channel: usize, reason: String },
}

/// Project state read and written by the scheduler.
pub trait StateStore {
    /// Tempo of the current pattern.
    fn bpm(&self) -> f64;

    fn playback_mode(&self) -> PlaybackMode;

    /// Channels of the current pattern.
    fn channels(&self) -> &[Channel];

    fn transport(&self) -> Transport;

    fn set_transport(&mut self, transport: Transport);

    /// Record (or clear) the note most recently scheduled on `channel`.
    fn set_active_playback(&mut self, channel: usize, playback: Option<ActivePlayback>);

    fn active_playback(&self, channel: usize) -> Option<ActivePlayback> {
        self.channels().get(channel).and_then(|c| c.active_playback)
    }

    /// Clear active playback on every channel of the current pattern.
    fn clear_active_playback(&mut self) {
        for i in 0..self.channels().len() {
            self.set_active_playback(i, None);
        }
    }

    fn pattern_count(&self) -> usize;

    fn current_pattern(&self) -> usize;

    /// Make pattern `index` current. On error the current pattern is kept.
    fn switch_pattern(&mut self, index: usize) -> Result<(), SwitchError>;
}

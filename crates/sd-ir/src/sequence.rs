//! Sequences (patterns of channels) and transport state.

use alloc::string::String;
use alloc::vec::Vec;

use crate::Channel;

/// Tempo for a new sequence.
pub const DEFAULT_BPM: f64 = 120.0;

/// A pattern: channels sharing one tempo and one 64-step length.
#[derive(Clone, Debug)]
pub struct Sequence {
    pub name: String,
    pub bpm: f64,
    pub channels: Vec<Channel>,
}

impl Sequence {
    pub fn new(name: &str) -> Self {
        Self { name: name.into(), bpm: DEFAULT_BPM, channels: Vec::new() }
    }

    /// Whether any channel is soloed.
    pub fn any_solo(&self) -> bool {
        self.channels.iter().any(|c| c.solo)
    }

    /// Clear every channel's active-playback snapshot.
    pub fn clear_active_playback(&mut self) {
        for ch in &mut self.channels {
            ch.active_playback = None;
        }
    }
}

/// How playback moves between patterns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Loop the current pattern.
    #[default]
    Single,
    /// Advance to the next pattern at each bar end.
    Continuous,
}

/// Transport state published for observers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Transport {
    pub playing: bool,
    /// Display step in [0, 64)
    pub current_step: usize,
}

//! Core data types for the stepdeck sequencer.
//!
//! This crate defines the data model shared by the engine and the
//! controller: sample buffers, 64-step patterns, channels with their
//! per-note processing parameters, and sequences.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod audio_buffer;
mod channel;
mod pattern;
mod sample;
mod sequence;
pub mod timing;

pub use audio_buffer::AudioBuffer;
pub use channel::{
    ActivePlayback, Channel, EqGains, FilterSettings, TrimError, DEFAULT_FILTER_Q, DEFAULT_VOLUME,
    HIGH_PASS_MIN_HZ, LOW_PASS_MAX_HZ, PITCH_RANGE_SEMITONES,
};
pub use pattern::{StepPattern, STEPS_PER_BAR, STEPS_PER_PATTERN};
pub use sample::{Sample, SampleError};
pub use sequence::{PlaybackMode, Sequence, Transport, DEFAULT_BPM};

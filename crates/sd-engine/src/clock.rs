//! Audio clocks.
//!
//! The scheduler reads time from an [`AudioClock`], which must be the
//! clock the audio graph renders against. [`FrameClock`] is the clock the
//! graph itself advances, one tick per rendered frame.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The audio clock could not be started.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    #[error("audio clock is suspended: {0}")]
    Suspended(String),
}

/// High-resolution audio time source.
pub trait AudioClock {
    /// Current audio time in seconds.
    fn now(&self) -> f64;

    /// Make sure the clock is running. Called once per `start`.
    fn resume(&self) -> Result<(), ClockError> {
        Ok(())
    }
}

/// Frame counter shared between the audio graph and the scheduler.
#[derive(Clone, Debug)]
pub struct FrameClock {
    frames: Arc<AtomicU64>,
    sample_rate: u32,
}

impl FrameClock {
    pub fn new(sample_rate: u32) -> Self {
        Self { frames: Arc::new(AtomicU64::new(0)), sample_rate: sample_rate.max(1) }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames rendered so far.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Advance by `n` frames.
    #[inline]
    pub fn advance(&self, n: u64) {
        self.frames.fetch_add(n, Ordering::Release);
    }

    /// Output frame nearest to `time` seconds. Negative times map to 0.
    pub fn frame_at(&self, time: f64) -> u64 {
        if time <= 0.0 {
            return 0;
        }
        (time * self.sample_rate as f64).round() as u64
    }

    /// Time in seconds of output frame `frame`.
    pub fn time_of(&self, frame: u64) -> f64 {
        frame as f64 / self.sample_rate as f64
    }
}

impl AudioClock for FrameClock {
    fn now(&self) -> f64 {
        self.time_of(self.frames())
    }
}

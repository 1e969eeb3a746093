//! Channel: one sample lane with its steps and processing parameters.

use alloc::sync::Arc;
use core::cell::OnceCell;

use crate::{Sample, StepPattern};

/// Default channel volume.
pub const DEFAULT_VOLUME: f32 = 0.8;
/// Default filter resonance (Butterworth).
pub const DEFAULT_FILTER_Q: f32 = 0.707;
/// High-pass stage is only inserted above this cutoff.
pub const HIGH_PASS_MIN_HZ: f32 = 20.0;
/// Low-pass stage is only inserted below this cutoff.
pub const LOW_PASS_MAX_HZ: f32 = 20_000.0;
/// Pitch offsets are clamped to four octaves either way.
pub const PITCH_RANGE_SEMITONES: f32 = 48.0;

/// Invalid trim bounds.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("trim bounds must satisfy 0 <= start < end <= 1 (got {start}..{end})")]
pub struct TrimError {
    pub start: f32,
    pub end: f32,
}

/// Cutoff and resonance for one filter stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterSettings {
    pub cutoff: f32,
    pub q: f32,
}

/// Three-band EQ gains in dB.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EqGains {
    pub low: f32,
    pub mid: f32,
    pub high: f32,
}

/// Snapshot of the note most recently scheduled on a channel.
///
/// Written when a note is scheduled so observers can draw a playhead
/// without querying the audio graph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActivePlayback {
    /// Audio clock time the note starts
    pub scheduled_time: f64,
    /// Audible duration in seconds
    pub duration: f64,
    pub trim_start: f32,
    pub trim_end: f32,
    pub reversed: bool,
}

impl ActivePlayback {
    /// Fraction of the note played at `now`, clamped to [0, 1].
    pub fn progress(&self, now: f64) -> f64 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((now - self.scheduled_time) / self.duration).clamp(0.0, 1.0)
    }
}

/// One sequencer channel.
#[derive(Clone, Debug)]
pub struct Channel {
    pub name: alloc::string::String,
    sample: Option<Arc<Sample>>,
    reversed: OnceCell<Arc<Sample>>,
    pub steps: StepPattern,
    pub volume: f32,
    pub mute: bool,
    pub solo: bool,
    pub pitch_semitones: f32,
    pub reverse: bool,
    trim_start: f32,
    trim_end: f32,
    pub high_pass: FilterSettings,
    pub low_pass: FilterSettings,
    pub eq: EqGains,
    /// Fade-in time in seconds
    pub fade_in: f64,
    /// Fade-out time in seconds
    pub fade_out: f64,
    pub active_playback: Option<ActivePlayback>,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            name: alloc::string::String::new(),
            sample: None,
            reversed: OnceCell::new(),
            steps: StepPattern::default(),
            volume: DEFAULT_VOLUME,
            mute: false,
            solo: false,
            pitch_semitones: 0.0,
            reverse: false,
            trim_start: 0.0,
            trim_end: 1.0,
            high_pass: FilterSettings { cutoff: HIGH_PASS_MIN_HZ, q: DEFAULT_FILTER_Q },
            low_pass: FilterSettings { cutoff: LOW_PASS_MAX_HZ, q: DEFAULT_FILTER_Q },
            eq: EqGains::default(),
            fade_in: 0.0,
            fade_out: 0.0,
            active_playback: None,
        }
    }
}

impl Channel {
    /// Empty channel with default parameters.
    pub fn new(name: &str) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Channel playing `sample`.
    pub fn with_sample(name: &str, sample: Arc<Sample>) -> Self {
        let mut ch = Self::new(name);
        ch.set_sample(Some(sample));
        ch
    }

    /// The loaded sample, if any.
    pub fn sample(&self) -> Option<&Arc<Sample>> {
        self.sample.as_ref()
    }

    /// Replace the sample. Drops the cached reversed copy.
    pub fn set_sample(&mut self, sample: Option<Arc<Sample>>) {
        self.sample = sample;
        self.reversed = OnceCell::new();
    }

    /// Reversed copy of the sample, computed on first use.
    pub fn reversed_sample(&self) -> Option<&Arc<Sample>> {
        let sample = self.sample.as_ref()?;
        Some(self.reversed.get_or_init(|| Arc::new(sample.reversed())))
    }

    /// Whether the reversed copy has been computed.
    pub fn has_reversed_cached(&self) -> bool {
        self.reversed.get().is_some()
    }

    pub fn trim_start(&self) -> f32 {
        self.trim_start
    }

    pub fn trim_end(&self) -> f32 {
        self.trim_end
    }

    /// Set the trim window as fractions of the full sample.
    pub fn set_trim(&mut self, start: f32, end: f32) -> Result<(), TrimError> {
        let valid = start.is_finite()
            && end.is_finite()
            && (0.0..=1.0).contains(&start)
            && (0.0..=1.0).contains(&end)
            && end > start;
        if !valid {
            return Err(TrimError { start, end });
        }
        self.trim_start = start;
        self.trim_end = end;
        Ok(())
    }

    /// Playback rate for the pitch offset: `2^(semitones/12)`.
    /// A non-finite pitch plays at the original rate.
    pub fn playback_rate(&self) -> f64 {
        let semitones = if self.pitch_semitones.is_finite() {
            self.pitch_semitones.clamp(-PITCH_RANGE_SEMITONES, PITCH_RANGE_SEMITONES)
        } else {
            0.0
        };
        libm::pow(2.0, semitones as f64 / 12.0)
    }

    /// Output gain after mute and solo. `any_solo` is whether any
    /// channel in the sequence is soloed.
    pub fn effective_gain(&self, any_solo: bool) -> f32 {
        if self.mute || (any_solo && !self.solo) {
            0.0
        } else {
            self.volume
        }
    }
}

//! Sample data types.

use arrayvec::ArrayString;

use crate::AudioBuffer;

/// Why a sample cannot be played.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SampleError {
    #[error("sample has no frames")]
    Empty,
    #[error("sample rate is zero")]
    ZeroRate,
    #[error("unsupported channel count {0}")]
    Channels(u16),
}

/// An immutable, loaded audio sample.
#[derive(Clone, Debug, Default)]
pub struct Sample {
    /// Sample name
    pub name: ArrayString<32>,
    /// Planar f32 audio data (mono or stereo)
    pub data: AudioBuffer,
    /// Native sample rate in Hz
    pub sample_rate: u32,
}

impl Sample {
    /// Create a sample from decoded audio.
    pub fn new(name: &str, data: AudioBuffer, sample_rate: u32) -> Self {
        let mut n = ArrayString::new();
        for c in name.chars() {
            if n.try_push(c).is_err() {
                break;
            }
        }
        Self { name: n, data, sample_rate }
    }

    /// Length in frames.
    pub fn frames(&self) -> usize {
        self.data.frames()
    }

    /// Returns true if the sample has no data.
    pub fn is_empty(&self) -> bool {
        self.data.frames() == 0
    }

    /// Length in seconds at the native rate.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.data.frames() as f64 / self.sample_rate as f64
    }

    /// Same sample played back to front.
    pub fn reversed(&self) -> Self {
        Self {
            name: self.name,
            data: self.data.reversed(),
            sample_rate: self.sample_rate,
        }
    }

    /// Check the sample can be rendered.
    pub fn validate(&self) -> Result<(), SampleError> {
        if self.is_empty() {
            return Err(SampleError::Empty);
        }
        if self.sample_rate == 0 {
            return Err(SampleError::ZeroRate);
        }
        match self.data.channels() {
            1 | 2 => Ok(()),
            n => Err(SampleError::Channels(n)),
        }
    }

    /// Linearly interpolated stereo read at a fractional frame position.
    ///
    /// Mono data is duplicated to both sides. Reads outside the buffer
    /// return silence, and the last frame blends toward zero.
    #[inline]
    pub fn read_stereo(&self, pos: f64) -> (f32, f32) {
        let frames = self.data.frames();
        if pos < 0.0 || frames == 0 || self.data.channels() == 0 {
            return (0.0, 0.0);
        }
        let idx = pos as usize;
        if idx >= frames {
            return (0.0, 0.0);
        }
        let frac = (pos - idx as f64) as f32;
        let read = |ch: u16| {
            let plane = self.data.channel(ch);
            let a = plane[idx];
            let b = if idx + 1 < frames { plane[idx + 1] } else { 0.0 };
            a + (b - a) * frac
        };
        let left = read(0);
        let right = if self.data.channels() > 1 { read(1) } else { left };
        (left, right)
    }
}

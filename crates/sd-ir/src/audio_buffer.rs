//! Multichannel f32 audio buffer with planar layout.

use alloc::vec;
use alloc::vec::Vec;

/// A multichannel f32 audio buffer in planar layout.
///
/// Data is stored as `channels` contiguous planes of `frames` samples each.
/// `data[ch * frames + frame]` gives the sample for channel `ch` at `frame`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioBuffer {
    data: Vec<f32>,
    channels: u16,
    frames: usize,
}

impl AudioBuffer {
    /// Create a new silent buffer with the given dimensions.
    pub fn new(channels: u16, frames: usize) -> Self {
        Self {
            data: vec![0.0; channels as usize * frames],
            channels,
            frames,
        }
    }

    /// Build a single-channel buffer from samples.
    pub fn from_mono(samples: Vec<f32>) -> Self {
        let frames = samples.len();
        Self { data: samples, channels: 1, frames }
    }

    /// Build a buffer from interleaved samples. Trailing partial frames are dropped.
    pub fn from_interleaved(channels: u16, interleaved: &[f32]) -> Self {
        if channels == 0 {
            return Self::default();
        }
        let chs = channels as usize;
        let frames = interleaved.len() / chs;
        let mut buf = Self::new(channels, frames);
        for (i, frame) in interleaved.chunks_exact(chs).enumerate() {
            for (ch, &s) in frame.iter().enumerate() {
                buf.data[ch * frames + i] = s;
            }
        }
        buf
    }

    /// Number of channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Read-only access to one channel's sample data.
    pub fn channel(&self, ch: u16) -> &[f32] {
        let start = ch as usize * self.frames;
        &self.data[start..start + self.frames]
    }

    /// Mutable access to one channel's sample data.
    pub fn channel_mut(&mut self, ch: u16) -> &mut [f32] {
        let start = ch as usize * self.frames;
        let len = self.frames;
        &mut self.data[start..start + len]
    }

    /// A copy of this buffer with every channel played back to front.
    pub fn reversed(&self) -> Self {
        let mut out = self.clone();
        for ch in 0..self.channels {
            out.channel_mut(ch).reverse();
        }
        out
    }

    /// Peak absolute sample value across all channels.
    pub fn peak(&self) -> f32 {
        self.data.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_silent() {
        let buf = AudioBuffer::new(2, 4);
        assert_eq!(buf.channels(), 2);
        assert_eq!(buf.frames(), 4);
        assert!(buf.channel(0).iter().all(|&s| s == 0.0));
        assert!(buf.channel(1).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn channel_mut_writes_correctly() {
        let mut buf = AudioBuffer::new(2, 2);
        buf.channel_mut(0)[0] = 1.0;
        buf.channel_mut(1)[1] = -0.5;
        assert_eq!(buf.channel(0), &[1.0, 0.0]);
        assert_eq!(buf.channel(1), &[0.0, -0.5]);
    }

    #[test]
    fn interleaved_is_split_into_planes() {
        let buf = AudioBuffer::from_interleaved(2, &[0.1, 0.2, 0.3, 0.4, 0.5]);
        assert_eq!(buf.frames(), 2);
        assert_eq!(buf.channel(0), &[0.1, 0.3]);
        assert_eq!(buf.channel(1), &[0.2, 0.4]);
    }

    #[test]
    fn reversed_flips_each_channel() {
        let buf = AudioBuffer::from_interleaved(2, &[1.0, -1.0, 2.0, -2.0, 3.0, -3.0]);
        let rev = buf.reversed();
        assert_eq!(rev.channel(0), &[3.0, 2.0, 1.0]);
        assert_eq!(rev.channel(1), &[-3.0, -2.0, -1.0]);
        // Source untouched
        assert_eq!(buf.channel(0), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn peak_finds_largest_magnitude() {
        let buf = AudioBuffer::from_mono(vec![0.2, -0.9, 0.5]);
        assert!((buf.peak() - 0.9).abs() < 1e-6);
    }
}

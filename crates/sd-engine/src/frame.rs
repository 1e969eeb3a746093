//! Audio frame type.

/// A stereo audio frame (f32, nominal range -1.0..=1.0).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Frame {
    pub left: f32,
    pub right: f32,
}

impl Frame {
    /// Create a silent frame.
    pub const fn silence() -> Self {
        Self { left: 0.0, right: 0.0 }
    }

    /// Create a mono frame (same value for both channels).
    pub const fn mono(value: f32) -> Self {
        Self { left: value, right: value }
    }

    pub const fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    /// Mix another frame into this one.
    #[inline]
    pub fn mix(&mut self, other: Frame) {
        self.left += other.left;
        self.right += other.right;
    }

    /// Scale both sides by `gain`.
    #[inline]
    pub fn scaled(self, gain: f32) -> Frame {
        Frame { left: self.left * gain, right: self.right * gain }
    }

    /// Clamp to full scale and convert to 16-bit PCM.
    pub fn to_i16(self) -> (i16, i16) {
        let conv = |s: f32| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16;
        (conv(self.left), conv(self.right))
    }

    /// Larger absolute value of the two sides.
    pub fn peak(self) -> f32 {
        self.left.abs().max(self.right.abs())
    }
}

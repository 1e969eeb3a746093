//! Biquad filter stages (RBJ cookbook coefficients).
//!
//! Each stage is a direct-form-I biquad with independent left/right state.

use std::f64::consts::{SQRT_2, TAU};

use crate::Frame;

/// Corner frequency of the low EQ band.
pub const LOW_SHELF_HZ: f32 = 250.0;
/// Center frequency of the mid EQ band.
pub const MID_PEAK_HZ: f32 = 1000.0;
/// Resonance of the mid EQ band.
pub const MID_PEAK_Q: f32 = 1.0;
/// Corner frequency of the high EQ band.
pub const HIGH_SHELF_HZ: f32 = 4000.0;

const FALLBACK_Q: f32 = 0.707;

/// Filter response and its parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterKind {
    HighPass { cutoff: f32, q: f32 },
    LowPass { cutoff: f32, q: f32 },
    LowShelf { freq: f32, gain_db: f32 },
    Peaking { freq: f32, q: f32, gain_db: f32 },
    HighShelf { freq: f32, gain_db: f32 },
}

#[derive(Clone, Copy, Debug, Default)]
struct History {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

/// A stereo biquad stage.
#[derive(Clone, Debug)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    left: History,
    right: History,
}

fn sane_q(q: f32) -> f64 {
    if q.is_finite() && q > 0.0 {
        q as f64
    } else {
        FALLBACK_Q as f64
    }
}

impl Biquad {
    /// Design a stage for `kind` at `sample_rate`. Frequencies are kept
    /// between 1 Hz and just under Nyquist.
    pub fn new(kind: FilterKind, sample_rate: u32) -> Self {
        let fs = sample_rate.max(1) as f64;
        let clamp_freq = |f: f32| (f as f64).clamp(1.0, fs * 0.49);
        let w0 = |f: f32| TAU * clamp_freq(f) / fs;

        // (b0, b1, b2, a0, a1, a2)
        let c = match kind {
            FilterKind::LowPass { cutoff, q } => {
                let w = w0(cutoff);
                let (sin, cos) = w.sin_cos();
                let alpha = sin / (2.0 * sane_q(q));
                let b1 = 1.0 - cos;
                (b1 / 2.0, b1, b1 / 2.0, 1.0 + alpha, -2.0 * cos, 1.0 - alpha)
            }
            FilterKind::HighPass { cutoff, q } => {
                let w = w0(cutoff);
                let (sin, cos) = w.sin_cos();
                let alpha = sin / (2.0 * sane_q(q));
                let b0 = (1.0 + cos) / 2.0;
                (b0, -(1.0 + cos), b0, 1.0 + alpha, -2.0 * cos, 1.0 - alpha)
            }
            FilterKind::Peaking { freq, q, gain_db } => {
                let a = 10f64.powf(gain_db as f64 / 40.0);
                let w = w0(freq);
                let (sin, cos) = w.sin_cos();
                let alpha = sin / (2.0 * sane_q(q));
                (
                    1.0 + alpha * a,
                    -2.0 * cos,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos,
                    1.0 - alpha / a,
                )
            }
            FilterKind::LowShelf { freq, gain_db } => {
                let a = 10f64.powf(gain_db as f64 / 40.0);
                let w = w0(freq);
                let (sin, cos) = w.sin_cos();
                // Shelf slope S = 1
                let k = 2.0 * a.sqrt() * (sin / 2.0 * SQRT_2);
                (
                    a * ((a + 1.0) - (a - 1.0) * cos + k),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos),
                    a * ((a + 1.0) - (a - 1.0) * cos - k),
                    (a + 1.0) + (a - 1.0) * cos + k,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos),
                    (a + 1.0) + (a - 1.0) * cos - k,
                )
            }
            FilterKind::HighShelf { freq, gain_db } => {
                let a = 10f64.powf(gain_db as f64 / 40.0);
                let w = w0(freq);
                let (sin, cos) = w.sin_cos();
                let k = 2.0 * a.sqrt() * (sin / 2.0 * SQRT_2);
                (
                    a * ((a + 1.0) + (a - 1.0) * cos + k),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos),
                    a * ((a + 1.0) + (a - 1.0) * cos - k),
                    (a + 1.0) - (a - 1.0) * cos + k,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos),
                    (a + 1.0) - (a - 1.0) * cos - k,
                )
            }
        };
        let (b0, b1, b2, a0, a1, a2) = c;
        Self {
            b0: (b0 / a0) as f32,
            b1: (b1 / a0) as f32,
            b2: (b2 / a0) as f32,
            a1: (a1 / a0) as f32,
            a2: (a2 / a0) as f32,
            left: History::default(),
            right: History::default(),
        }
    }

    #[inline]
    fn step(&self, h: &mut History, x: f32) -> f32 {
        let y = self.b0 * x + self.b1 * h.x1 + self.b2 * h.x2 - self.a1 * h.y1 - self.a2 * h.y2;
        h.x2 = h.x1;
        h.x1 = x;
        h.y2 = h.y1;
        h.y1 = y;
        y
    }

    /// Filter one stereo frame.
    #[inline]
    pub fn process(&mut self, frame: Frame) -> Frame {
        let mut left = self.left;
        let mut right = self.right;
        let out = Frame::new(self.step(&mut left, frame.left), self.step(&mut right, frame.right));
        self.left = left;
        self.right = right;
        out
    }

    /// Clear the filter memory.
    pub fn reset(&mut self) {
        self.left = History::default();
        self.right = History::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 44100;

    /// Steady-state RMS of a sine at `freq` through `kind`.
    fn rms_through(kind: FilterKind, freq: f64) -> f64 {
        let mut f = Biquad::new(kind, SR);
        let n = SR as usize / 2;
        let mut acc = 0.0;
        let mut count = 0;
        for i in 0..n {
            let x = (TAU * freq * i as f64 / SR as f64).sin() as f32;
            let y = f.process(Frame::mono(x)).left as f64;
            if i > n / 2 {
                acc += y * y;
                count += 1;
            }
        }
        (acc / count as f64).sqrt()
    }

    const SINE_RMS: f64 = std::f64::consts::FRAC_1_SQRT_2;

    #[test]
    fn low_pass_cuts_highs() {
        let lp = FilterKind::LowPass { cutoff: 500.0, q: 0.707 };
        assert!(rms_through(lp, 8000.0) < SINE_RMS * 0.05);
        assert!((rms_through(lp, 50.0) - SINE_RMS).abs() < 0.05);
    }

    #[test]
    fn high_pass_cuts_lows() {
        let hp = FilterKind::HighPass { cutoff: 2000.0, q: 0.707 };
        assert!(rms_through(hp, 60.0) < SINE_RMS * 0.05);
        assert!((rms_through(hp, 12000.0) - SINE_RMS).abs() < 0.05);
    }

    #[test]
    fn peaking_boosts_center() {
        let pk = FilterKind::Peaking { freq: MID_PEAK_HZ, q: MID_PEAK_Q, gain_db: 6.0 };
        let gain = rms_through(pk, MID_PEAK_HZ as f64) / SINE_RMS;
        // +6 dB is about 2x amplitude
        assert!((gain - 2.0).abs() < 0.1, "gain {gain}");
    }

    #[test]
    fn shelves_move_their_band_only() {
        let low = FilterKind::LowShelf { freq: LOW_SHELF_HZ, gain_db: -12.0 };
        assert!(rms_through(low, 40.0) < SINE_RMS * 0.35);
        assert!((rms_through(low, 10000.0) - SINE_RMS).abs() < 0.05);

        let high = FilterKind::HighShelf { freq: HIGH_SHELF_HZ, gain_db: -12.0 };
        assert!(rms_through(high, 15000.0) < SINE_RMS * 0.35);
        assert!((rms_through(high, 100.0) - SINE_RMS).abs() < 0.05);
    }

    #[test]
    fn bad_q_and_extreme_cutoff_stay_stable() {
        let lp = FilterKind::LowPass { cutoff: 90_000.0, q: 0.0 };
        let out = rms_through(lp, 1000.0);
        assert!(out.is_finite());
        assert!((out - SINE_RMS).abs() < 0.1);
    }

    #[test]
    fn reset_clears_memory() {
        let mut f = Biquad::new(FilterKind::LowPass { cutoff: 100.0, q: 0.707 }, SR);
        for _ in 0..100 {
            f.process(Frame::mono(1.0));
        }
        f.reset();
        assert_eq!(f.process(Frame::silence()), Frame::silence());
    }
}

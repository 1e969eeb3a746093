//! Linear fade envelope for one note.

/// Gain curve over a note's audible duration.
///
/// Fade-in and fade-out are each clamped to half the audible duration.
/// The fade-out always ends at the audible boundary and never starts
/// before the fade-in has finished.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FadeEnvelope {
    audible: f64,
    fade_in: f64,
    fade_out: f64,
    fade_out_start: f64,
}

fn non_negative(t: f64) -> f64 {
    if t.is_finite() && t > 0.0 {
        t
    } else {
        0.0
    }
}

impl FadeEnvelope {
    pub fn new(audible: f64, fade_in: f64, fade_out: f64) -> Self {
        let audible = non_negative(audible);
        let half = audible / 2.0;
        let fade_in = non_negative(fade_in).min(half);
        let fade_out = non_negative(fade_out).min(half);
        let fade_out_start = (audible - fade_out).max(fade_in);
        Self { audible, fade_in, fade_out, fade_out_start }
    }

    pub fn audible(&self) -> f64 {
        self.audible
    }

    /// Clamped fade-in time.
    pub fn fade_in(&self) -> f64 {
        self.fade_in
    }

    /// Clamped fade-out time.
    pub fn fade_out(&self) -> f64 {
        self.fade_out
    }

    /// Time (from note start) the fade-out ramp begins.
    pub fn fade_out_start(&self) -> f64 {
        self.fade_out_start
    }

    /// Gain at `t` seconds after the note starts.
    #[inline]
    pub fn gain_at(&self, t: f64) -> f32 {
        if t < 0.0 || t >= self.audible {
            return 0.0;
        }
        if self.fade_in > 0.0 && t < self.fade_in {
            return (t / self.fade_in) as f32;
        }
        if self.fade_out > 0.0 && t > self.fade_out_start {
            let span = self.audible - self.fade_out_start;
            return ((self.audible - t) / span) as f32;
        }
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn overlong_fades_are_clamped_to_half() {
        let env = FadeEnvelope::new(3.0, 2.0, 2.0);
        assert_eq!(env.fade_in(), 1.5);
        assert_eq!(env.fade_out(), 1.5);
        assert!(close(env.gain_at(0.0), 0.0));
        assert!(close(env.gain_at(0.75), 0.5));
        assert!(close(env.gain_at(1.5), 1.0));
        assert!(close(env.gain_at(2.25), 0.5));
        assert!(close(env.gain_at(3.0), 0.0));
        assert!(env.gain_at(2.999) < 0.01);
    }

    #[test]
    fn no_fades_holds_unity() {
        let env = FadeEnvelope::new(1.0, 0.0, 0.0);
        assert!(close(env.gain_at(0.0), 1.0));
        assert!(close(env.gain_at(0.999), 1.0));
        assert!(close(env.gain_at(1.0), 0.0));
    }

    #[test]
    fn fade_out_ends_at_boundary() {
        let env = FadeEnvelope::new(2.0, 0.0, 0.5);
        assert_eq!(env.fade_out_start(), 1.5);
        assert!(close(env.gain_at(1.5), 1.0));
        assert!(close(env.gain_at(1.75), 0.5));
    }

    #[test]
    fn fade_out_never_starts_before_fade_in_ends() {
        let env = FadeEnvelope::new(1.0, 0.5, 0.5);
        assert_eq!(env.fade_out_start(), 0.5);
        let env = FadeEnvelope::new(1.0, 0.4, 0.1);
        assert!((env.fade_out_start() - 0.9).abs() < 1e-12);
        assert!(close(env.gain_at(0.2), 0.5));
    }

    #[test]
    fn garbage_times_mean_no_fade() {
        let env = FadeEnvelope::new(1.0, f64::NAN, -3.0);
        assert_eq!(env.fade_in(), 0.0);
        assert_eq!(env.fade_out(), 0.0);
    }
}

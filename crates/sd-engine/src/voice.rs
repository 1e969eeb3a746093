//! Voice: one scheduled note instance on the audio thread.

use std::sync::Arc;

use sd_ir::Sample;

use crate::envelope::FadeEnvelope;
use crate::filter::Biquad;
use crate::render::{NotePlan, MAX_STAGES};
use crate::Frame;

/// A single voice reading a trimmed region of a sample.
#[derive(Clone, Debug)]
pub struct Voice {
    source: Arc<Sample>,
    /// Channel whose gain applies to this voice
    pub channel: usize,
    start_frame: u64,
    began_at: Option<u64>,
    /// Read position in source frames
    position: f64,
    end_position: f64,
    /// Source frames advanced per output frame
    increment: f64,
    total_frames: u64,
    rendered: u64,
    output_rate: f64,
    chain: heapless::Vec<Biquad, MAX_STAGES>,
    envelope: FadeEnvelope,
    /// Is the voice still producing audio?
    pub playing: bool,
}

impl Voice {
    /// Build the voice for a planned note at `output_rate`.
    pub fn from_plan(plan: &NotePlan, output_rate: u32) -> Self {
        let out = output_rate.max(1) as f64;
        let src = plan.source.sample_rate as f64;
        let mut chain = heapless::Vec::new();
        for kind in &plan.stages {
            // Capacities match, so this cannot overflow
            let _ = chain.push(Biquad::new(*kind, output_rate));
        }
        Self {
            source: plan.source.clone(),
            channel: plan.channel,
            start_frame: if plan.start_time > 0.0 { (plan.start_time * out).round() as u64 } else { 0 },
            began_at: None,
            position: plan.offset * src,
            end_position: (plan.offset + plan.region_duration) * src,
            increment: plan.playback_rate * src / out,
            total_frames: (plan.audible_duration * out).round().max(1.0) as u64,
            rendered: 0,
            output_rate: out,
            chain,
            envelope: plan.envelope,
            playing: true,
        }
    }

    /// Output frame the voice is scheduled to start on.
    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    /// Frames produced so far.
    pub fn rendered(&self) -> u64 {
        self.rendered
    }

    /// Audio time the voice stopped (or will stop, if still playing).
    pub fn end_time(&self) -> f64 {
        let began = self.began_at.unwrap_or(self.start_frame);
        (began + self.rendered) as f64 / self.output_rate
    }

    /// Render the frame at absolute output frame `now`.
    ///
    /// Returns silence before the start frame. A voice that arrives late
    /// starts on its first rendered frame, from its planned offset.
    #[inline]
    pub fn render(&mut self, now: u64) -> Frame {
        if !self.playing || now < self.start_frame {
            return Frame::silence();
        }
        if self.began_at.is_none() {
            self.began_at = Some(now);
        }
        if self.rendered >= self.total_frames || self.position >= self.end_position {
            self.playing = false;
            return Frame::silence();
        }

        let (l, r) = self.source.read_stereo(self.position);
        let mut frame = Frame::new(l, r);
        for stage in self.chain.iter_mut() {
            frame = stage.process(frame);
        }
        let gain = self.envelope.gain_at(self.rendered as f64 / self.output_rate);

        self.position += self.increment;
        self.rendered += 1;
        if self.rendered >= self.total_frames {
            self.playing = false;
        }
        frame.scaled(gain)
    }
}

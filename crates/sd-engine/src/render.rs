//! Step renderer: turns one (channel, step, time) into a scheduled note.

use std::sync::Arc;

use sd_ir::{ActivePlayback, Channel, Sample, HIGH_PASS_MIN_HZ, LOW_PASS_MAX_HZ};

use crate::envelope::FadeEnvelope;
use crate::filter::{FilterKind, HIGH_SHELF_HZ, LOW_SHELF_HZ, MID_PEAK_HZ, MID_PEAK_Q};
use crate::graph::{NoteSink, MAX_CHANNELS};
use crate::registry::{LiveNote, NoteRegistry};
use crate::store::StateStore;
use crate::voice::Voice;

/// Upper bound on processing stages: HPF, LPF and three EQ bands.
pub const MAX_STAGES: usize = 5;

/// Shortest region a note may have, in seconds.
pub const MIN_REGION: f64 = 0.001;

/// Everything needed to start one note, computed from a channel snapshot.
#[derive(Clone, Debug)]
pub struct NotePlan {
    pub channel: usize,
    pub step: usize,
    pub start_time: f64,
    /// Forward or reversed buffer
    pub source: Arc<Sample>,
    pub reversed: bool,
    pub playback_rate: f64,
    /// Start of the region within the source, in seconds
    pub offset: f64,
    /// Length of the region within the source, in seconds
    pub region_duration: f64,
    /// Real-time length after the rate change
    pub audible_duration: f64,
    pub stages: heapless::Vec<FilterKind, MAX_STAGES>,
    pub envelope: FadeEnvelope,
    pub trim_start: f32,
    pub trim_end: f32,
}

impl NotePlan {
    /// Snapshot observers use to draw a playhead.
    pub fn active_playback(&self) -> ActivePlayback {
        ActivePlayback {
            scheduled_time: self.start_time,
            duration: self.audible_duration,
            trim_start: self.trim_start,
            trim_end: self.trim_end,
            reversed: self.reversed,
        }
    }
}

/// Stages for `channel`, in fixed order. Stages that would do nothing are
/// left out rather than set to identity.
pub fn processing_chain(channel: &Channel) -> heapless::Vec<FilterKind, MAX_STAGES> {
    let mut stages = heapless::Vec::new();
    let mut push = |k| {
        // At most MAX_STAGES pushes below
        let _ = stages.push(k);
    };
    if channel.high_pass.cutoff > HIGH_PASS_MIN_HZ {
        push(FilterKind::HighPass { cutoff: channel.high_pass.cutoff, q: channel.high_pass.q });
    }
    if channel.low_pass.cutoff < LOW_PASS_MAX_HZ {
        push(FilterKind::LowPass { cutoff: channel.low_pass.cutoff, q: channel.low_pass.q });
    }
    if channel.eq.low != 0.0 {
        push(FilterKind::LowShelf { freq: LOW_SHELF_HZ, gain_db: channel.eq.low });
    }
    if channel.eq.mid != 0.0 {
        push(FilterKind::Peaking { freq: MID_PEAK_HZ, q: MID_PEAK_Q, gain_db: channel.eq.mid });
    }
    if channel.eq.high != 0.0 {
        push(FilterKind::HighShelf { freq: HIGH_SHELF_HZ, gain_db: channel.eq.high });
    }
    stages
}

/// Plan the note channel `index` plays at `step`, or `None` if the channel
/// has no sample or the step is off.
pub fn plan_note(channel: &Channel, index: usize, step: usize, start_time: f64) -> Option<NotePlan> {
    if !channel.steps.get(step) {
        return None;
    }
    let forward = channel.sample()?;
    if forward.is_empty() || forward.sample_rate == 0 {
        return None;
    }
    let (source, reversed) = match channel.reverse.then(|| channel.reversed_sample()).flatten() {
        Some(rev) => (rev.clone(), true),
        None => (forward.clone(), false),
    };

    let playback_rate = channel.playback_rate();
    let full = source.duration();
    let trim_start = channel.trim_start();
    let trim_end = channel.trim_end();
    let offset = if reversed {
        full * (1.0 - trim_end as f64)
    } else {
        full * trim_start as f64
    };
    let region_duration = full * (trim_end - trim_start) as f64;
    let audible_duration = region_duration.max(MIN_REGION) / playback_rate;

    Some(NotePlan {
        channel: index,
        step,
        start_time,
        source,
        reversed,
        playback_rate,
        offset,
        region_duration,
        audible_duration,
        stages: processing_chain(channel),
        envelope: FadeEnvelope::new(audible_duration, channel.fade_in, channel.fade_out),
        trim_start,
        trim_end,
    })
}

/// Schedule every channel's note for `step` at `start_time`.
///
/// Each started note is registered and its channel's active-playback
/// snapshot is written. Channels past [`MAX_CHANNELS`] have no gain slot
/// in the graph and are skipped. Returns the number of notes started.
pub fn render_step<S, N>(
    step: usize,
    start_time: f64,
    absolute_step: u64,
    store: &mut S,
    sink: &mut N,
    registry: &mut NoteRegistry,
) -> usize
where
    S: StateStore + ?Sized,
    N: NoteSink + ?Sized,
{
    let mut started = 0;
    for index in 0..store.channels().len().min(MAX_CHANNELS) {
        let Some(plan) = plan_note(&store.channels()[index], index, step, start_time) else {
            continue;
        };
        let key = registry.insert(LiveNote {
            channel: index,
            step,
            scheduled_time: start_time,
            audible_duration: plan.audible_duration,
            absolute_step,
        });
        let voice = Voice::from_plan(&plan, sink.sample_rate());
        match sink.start_note(key, voice) {
            Ok(()) => {
                store.set_active_playback(index, Some(plan.active_playback()));
                started += 1;
            }
            Err(e) => {
                registry.remove(key);
                log::warn!("dropped note on channel {index} at step {step}: {e}");
            }
        }
    }
    started
}

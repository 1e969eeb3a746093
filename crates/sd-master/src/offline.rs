//! Faster-than-real-time rendering through the same scheduler and graph
//! the device uses. The frame counter stands in for the audio clock.

use sd_engine::{audio_graph, BarReport, Frame, FrameClock, LookaheadScheduler, SchedulerConfig};

use crate::session::Session;

/// Output of an offline render.
#[derive(Clone, Debug, Default)]
pub struct Bounce {
    pub frames: Vec<Frame>,
    pub notes_started: usize,
    pub bar_reports: Vec<BarReport>,
}

/// Play `session` from its current step for `frame_count` frames, then stop.
/// The scheduler ticks once per `tick_interval` of rendered audio.
pub fn render_session(
    session: &mut Session,
    config: &SchedulerConfig,
    sample_rate: u32,
    frame_count: usize,
) -> Bounce {
    let clock = FrameClock::new(sample_rate);
    let (mut graph, mut handle) = audio_graph(clock.clone());
    let mut scheduler = LookaheadScheduler::new(config.clone());
    let mut bounce = Bounce { frames: vec![Frame::silence(); frame_count], ..Default::default() };

    if let Err(e) = scheduler.start(&clock, session) {
        log::error!("offline render could not start: {e}");
        return bounce;
    }

    let block = ((config.tick_interval * sample_rate as f64).round() as usize).max(1);
    for chunk in bounce.frames.chunks_mut(block) {
        let summary = scheduler.tick(&clock, session, &mut handle);
        bounce.notes_started += summary.notes_started;
        graph.render_block(chunk);
    }

    bounce.bar_reports = scheduler.bar_reports().cloned().collect();
    scheduler.stop(session, &mut handle);
    log::debug!(
        "offline render: {} frames, {} notes, {} bars timed",
        frame_count,
        bounce.notes_started,
        bounce.bar_reports.len()
    );
    bounce
}

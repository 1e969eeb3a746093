//! The audio graph and the command seam the scheduler drives it through.
//!
//! [`AudioGraph`] lives on the audio thread. The scheduler holds the
//! matching [`GraphHandle`] and talks to it over two lock-free queues:
//! commands in, end-of-note events out. Rendering advances the shared
//! [`FrameClock`], so the graph is also the audio clock.

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::clock::FrameClock;
use crate::registry::NoteKey;
use crate::voice::Voice;
use crate::voice_pool::{VoicePool, MAX_VOICES};
use crate::Frame;

/// Channels with an individually controllable gain.
pub const MAX_CHANNELS: usize = 64;

/// Slots in each direction of the command/event queues.
pub const QUEUE_CAPACITY: usize = 1024;

/// Voices the graph can hand back before the scheduler collects them:
/// a full pool plus a full command queue of steals.
pub const RETIRED_CAPACITY: usize = MAX_VOICES + QUEUE_CAPACITY;

/// Scheduler → graph.
#[derive(Debug)]
pub enum GraphCommand {
    Start { key: NoteKey, voice: Voice },
    Stop(NoteKey),
    StopAll,
    SetChannelGain { channel: usize, gain: f32 },
}

/// Graph → scheduler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GraphEvent {
    /// A note finished, was stopped, or was stolen.
    Ended { key: NoteKey, end_time: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("graph command queue is full")]
    QueueFull,
}

/// Where the step renderer sends notes.
pub trait NoteSink {
    /// Output sample rate of the graph.
    fn sample_rate(&self) -> u32;

    fn start_note(&mut self, key: NoteKey, voice: Voice) -> Result<(), GraphError>;

    fn stop_note(&mut self, key: NoteKey) -> Result<(), GraphError>;

    /// Silence and drop every voice.
    fn stop_all(&mut self) -> Result<(), GraphError>;

    fn set_channel_gain(&mut self, channel: usize, gain: f32) -> Result<(), GraphError>;

    /// Next pending event from the graph, if any.
    fn poll_event(&mut self) -> Option<GraphEvent>;

    /// Drop voices the graph has finished with, so their samples are
    /// freed off the audio thread. Returns how many were released.
    fn release_retired(&mut self) -> usize {
        0
    }
}

/// Audio-thread side.
pub struct AudioGraph {
    commands: HeapCons<GraphCommand>,
    events: HeapProd<GraphEvent>,
    retired: HeapProd<Voice>,
    pool: VoicePool,
    gains: [f32; MAX_CHANNELS],
    clock: FrameClock,
    dropped_events: u64,
    unreturned_voices: u64,
}

/// Scheduler side.
pub struct GraphHandle {
    commands: HeapProd<GraphCommand>,
    events: HeapCons<GraphEvent>,
    retired: HeapCons<Voice>,
    clock: FrameClock,
}

/// Create a connected graph and handle rendering against `clock`.
pub fn audio_graph(clock: FrameClock) -> (AudioGraph, GraphHandle) {
    let (cmd_tx, cmd_rx) = HeapRb::<GraphCommand>::new(QUEUE_CAPACITY).split();
    let (evt_tx, evt_rx) = HeapRb::<GraphEvent>::new(QUEUE_CAPACITY).split();
    let (ret_tx, ret_rx) = HeapRb::<Voice>::new(RETIRED_CAPACITY).split();
    let graph = AudioGraph {
        commands: cmd_rx,
        events: evt_tx,
        retired: ret_tx,
        pool: VoicePool::new(),
        gains: [1.0; MAX_CHANNELS],
        clock: clock.clone(),
        dropped_events: 0,
        unreturned_voices: 0,
    };
    let handle = GraphHandle { commands: cmd_tx, events: evt_rx, retired: ret_rx, clock };
    (graph, handle)
}

impl AudioGraph {
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn active_voices(&self) -> usize {
        self.pool.active_count()
    }

    /// Ended events lost because the scheduler was not draining.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events
    }

    /// Voices dropped on the audio thread because the scheduler was not
    /// collecting retired voices.
    pub fn unreturned_voices(&self) -> u64 {
        self.unreturned_voices
    }

    fn emit(&mut self, event: GraphEvent) {
        if self.events.try_push(event).is_err() {
            self.dropped_events += 1;
        }
    }

    fn retire(&mut self, voice: Voice) {
        retire(&mut self.retired, &mut self.unreturned_voices, voice);
    }

    /// Apply all pending commands.
    pub fn process_commands(&mut self) {
        while let Some(cmd) = self.commands.try_pop() {
            match cmd {
                GraphCommand::Start { key, voice } => {
                    if let Some((stolen, old)) = self.pool.allocate(key, voice) {
                        let end_time = self.clock.time_of(self.clock.frames());
                        self.emit(GraphEvent::Ended { key: stolen, end_time });
                        self.retire(old);
                    }
                }
                GraphCommand::Stop(key) => {
                    if let Some(old) = self.pool.kill(key) {
                        let end_time = self.clock.time_of(self.clock.frames());
                        self.emit(GraphEvent::Ended { key, end_time });
                        self.retire(old);
                    }
                }
                GraphCommand::StopAll => {
                    let retired = &mut self.retired;
                    let unreturned = &mut self.unreturned_voices;
                    self.pool.kill_all(|_, voice| retire(retired, unreturned, voice));
                }
                GraphCommand::SetChannelGain { channel, gain } => {
                    if let Some(g) = self.gains.get_mut(channel) {
                        *g = gain;
                    }
                }
            }
        }
    }

    /// Render the next frame without reading commands.
    #[inline]
    fn next_frame(&mut self) -> Frame {
        let now = self.clock.frames();
        let frame = self.pool.render(now, &self.gains);
        let events = &mut self.events;
        let dropped = &mut self.dropped_events;
        let retired = &mut self.retired;
        let unreturned = &mut self.unreturned_voices;
        self.pool.reap_finished(|key, voice| {
            let end_time = voice.end_time();
            if events.try_push(GraphEvent::Ended { key, end_time }).is_err() {
                *dropped += 1;
            }
            retire(retired, unreturned, voice);
        });
        self.clock.advance(1);
        frame
    }

    /// Apply pending commands and render one frame.
    pub fn render_frame(&mut self) -> Frame {
        self.process_commands();
        self.next_frame()
    }

    /// Fill `out` with frames, applying commands once at the block start.
    pub fn render_block(&mut self, out: &mut [Frame]) {
        self.process_commands();
        for frame in out.iter_mut() {
            *frame = self.next_frame();
        }
    }

    /// Fill an interleaved device buffer with `channels` samples per frame.
    /// The stereo pair goes to the first two channels; any others are zeroed.
    pub fn render_interleaved(&mut self, data: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.fill_interleaved(data, channels));
        #[cfg(not(feature = "alloc_check"))]
        self.fill_interleaved(data, channels);
    }

    fn fill_interleaved(&mut self, data: &mut [f32], channels: usize) {
        self.process_commands();
        for chunk in data.chunks_mut(channels) {
            let frame = self.next_frame();
            for (i, sample) in chunk.iter_mut().enumerate() {
                *sample = match i {
                    0 => frame.left,
                    1 if channels > 1 => frame.right,
                    _ => 0.0,
                };
            }
            if channels == 1 {
                chunk[0] = (frame.left + frame.right) * 0.5;
            }
        }
    }
}

/// Queue a voice for release on the scheduler thread. Only when the queue
/// is full is it dropped here.
fn retire(retired: &mut HeapProd<Voice>, unreturned: &mut u64, voice: Voice) {
    if let Err(voice) = retired.try_push(voice) {
        *unreturned += 1;
        drop(voice);
    }
}

impl GraphHandle {
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    fn send(&mut self, cmd: GraphCommand) -> Result<(), GraphError> {
        self.commands.try_push(cmd).map_err(|_| GraphError::QueueFull)
    }
}

impl NoteSink for GraphHandle {
    fn sample_rate(&self) -> u32 {
        self.clock.sample_rate()
    }

    fn start_note(&mut self, key: NoteKey, voice: Voice) -> Result<(), GraphError> {
        self.send(GraphCommand::Start { key, voice })
    }

    fn stop_note(&mut self, key: NoteKey) -> Result<(), GraphError> {
        self.send(GraphCommand::Stop(key))
    }

    fn stop_all(&mut self) -> Result<(), GraphError> {
        self.send(GraphCommand::StopAll)
    }

    fn set_channel_gain(&mut self, channel: usize, gain: f32) -> Result<(), GraphError> {
        self.send(GraphCommand::SetChannelGain { channel, gain })
    }

    fn poll_event(&mut self) -> Option<GraphEvent> {
        self.events.try_pop()
    }

    fn release_retired(&mut self) -> usize {
        let mut released = 0;
        while let Some(voice) = self.retired.try_pop() {
            drop(voice);
            released += 1;
        }
        released
    }
}

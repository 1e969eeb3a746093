//! Playback engine for stepdeck.
//!
//! The lookahead scheduler reads patterns through a [`StateStore`], plans
//! each due step with the step renderer, and hands voices to the
//! [`AudioGraph`] over a lock-free queue. The graph renders on the audio
//! thread and advances the [`FrameClock`] the scheduler reads time from.

pub mod clock;
pub mod config;
pub mod continuity;
pub mod diagnostics;
pub mod envelope;
pub mod filter;
mod frame;
pub mod graph;
pub mod lookahead;
pub mod registry;
pub mod render;
pub mod scheduler;
pub mod store;
pub mod voice;
pub mod voice_pool;

#[cfg(test)]
mod test_support;

pub use clock::{AudioClock, ClockError, FrameClock};
pub use config::{ConfigError, DiagnosticsConfig, SchedulerConfig};
pub use diagnostics::{BarReport, StepTiming};
pub use frame::Frame;
pub use graph::{audio_graph, AudioGraph, GraphError, GraphEvent, GraphHandle, NoteSink};
pub use registry::NoteKey;
pub use render::{plan_note, NotePlan};
pub use scheduler::{LookaheadScheduler, SchedulerState, TickSummary};
pub use store::{StateStore, SwitchError};

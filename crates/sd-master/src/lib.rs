//! Headless controller for stepdeck.
//!
//! Owns the session and drives real-time playback: the device callback
//! renders the audio graph, a scheduler thread feeds it notes. The CLI
//! and tests share the offline path, which runs the same scheduler
//! against a frame counter.

mod config;
mod offline;
mod session;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use sd_audio::{AudioError, AudioOutput, CpalOutput};
use sd_engine::{audio_graph, ClockError, ConfigError, GraphHandle, LookaheadScheduler, SchedulerConfig};

// Re-export common types so callers don't need sd-ir/sd-engine directly.
pub use config::{load_config, parse_config, ConfigLoadError, RenderConfig, StepdeckConfig};
pub use offline::{render_session, Bounce};
pub use sd_engine::{BarReport, Frame, StateStore};
pub use sd_formats::{frames_to_wav, load_wav, load_wav_file, write_wav, FormatError};
pub use sd_ir::{AudioBuffer, Channel, PlaybackMode, Sample, Sequence, StepPattern, Transport};
pub use session::Session;

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Clock(#[from] ClockError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("no channel {0} in the current sequence")]
    NoChannel(usize),
}

/// Scheduler and graph handle, parked here while idle.
struct Engine {
    scheduler: LookaheadScheduler,
    handle: GraphHandle,
}

struct PlaybackHandle {
    stop_signal: Arc<AtomicBool>,
    thread: Option<JoinHandle<Engine>>,
}

/// Headless sequencer controller.
pub struct Controller {
    session: Arc<Mutex<Session>>,
    config: SchedulerConfig,
    output: Option<CpalOutput>,
    engine: Option<Engine>,
    playback: Option<PlaybackHandle>,
}

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Controller {
    pub fn new(session: Session, config: SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            config,
            output: None,
            engine: None,
            playback: None,
        })
    }

    // --- Session access ---

    /// Shared session, for observers that outlive a borrow of the controller.
    pub fn session(&self) -> Arc<Mutex<Session>> {
        self.session.clone()
    }

    /// Edit the session under its lock. Edits apply from the next scheduled step.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        f(&mut lock(&self.session))
    }

    pub fn transport(&self) -> Transport {
        lock(&self.session).transport()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Load a WAV file into `channel` of the current sequence.
    pub fn load_sample(&self, channel: usize, path: &Path) -> Result<(), ControllerError> {
        let sample = load_wav_file(path)?;
        let mut session = lock(&self.session);
        let ch = session
            .current_mut()
            .channels
            .get_mut(channel)
            .ok_or(ControllerError::NoChannel(channel))?;
        log::info!("loaded {} ({:.3} s) into channel {channel}", path.display(), sample.duration());
        ch.set_sample(Some(Arc::new(sample)));
        Ok(())
    }

    // --- Real-time playback ---

    /// Open the device and build the graph once. Later starts reuse them.
    fn ensure_output(&mut self) -> Result<(), AudioError> {
        if self.output.as_ref().is_some_and(CpalOutput::has_stream) && self.engine.is_some() {
            return Ok(());
        }
        let mut output = CpalOutput::new()?;
        let (graph, handle) = audio_graph(output.clock());
        output.build_stream(graph)?;
        self.engine = Some(Engine { scheduler: LookaheadScheduler::new(self.config.clone()), handle });
        self.output = Some(output);
        Ok(())
    }

    /// Start playback from the transport's current step.
    ///
    /// Returns `Ok(false)` if already playing. A device that will not
    /// resume leaves the controller idle.
    pub fn start(&mut self) -> Result<bool, ControllerError> {
        if self.playback.is_some() {
            return Ok(false);
        }
        self.ensure_output()?;
        let (Some(output), Some(mut engine)) = (self.output.as_ref(), self.engine.take()) else {
            return Err(AudioError::NoStream.into());
        };

        let started = engine.scheduler.start(output, &mut *lock(&self.session));
        match started {
            Ok(true) => {}
            Ok(false) => log::warn!("scheduler was already running"),
            Err(e) => {
                self.engine = Some(engine);
                return Err(e.into());
            }
        }

        let clock = output.clock();
        let session = self.session.clone();
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop = stop_signal.clone();
        let interval = self.config.tick_duration();

        let thread = std::thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                {
                    let mut session = lock(&session);
                    engine.scheduler.tick(&clock, &mut *session, &mut engine.handle);
                }
                std::thread::sleep(interval);
            }
            engine.scheduler.stop(&mut *lock(&session), &mut engine.handle);
            engine
        });

        self.playback = Some(PlaybackHandle { stop_signal, thread: Some(thread) });
        Ok(true)
    }

    /// Stop playback, silence every note and rewind to step 0.
    /// Safe to call when idle. Returns whether playback was running.
    pub fn stop(&mut self) -> bool {
        let Some(mut pb) = self.playback.take() else {
            let mut session = lock(&self.session);
            session.clear_active_playback();
            session.set_transport(Transport { playing: false, current_step: 0 });
            return false;
        };

        pb.stop_signal.store(true, Ordering::Relaxed);
        if let Some(thread) = pb.thread.take() {
            match thread.join() {
                Ok(engine) => self.engine = Some(engine),
                Err(_) => {
                    log::error!("scheduler thread panicked, audio output will be rebuilt");
                    self.output = None;
                    let mut session = lock(&self.session);
                    session.clear_active_playback();
                    session.set_transport(Transport { playing: false, current_step: 0 });
                }
            }
        }
        if let Some(output) = self.output.as_mut() {
            if let Err(e) = output.stop() {
                log::warn!("could not pause audio output: {e}");
            }
        }
        true
    }

    pub fn is_running(&self) -> bool {
        self.playback.is_some()
    }

    /// Bar timing reports from the last run, oldest first.
    pub fn bar_reports(&self) -> Vec<BarReport> {
        self.engine
            .as_ref()
            .map(|e| e.scheduler.bar_reports().cloned().collect())
            .unwrap_or_default()
    }

    // --- Offline rendering ---

    /// Render `max_frames` from a snapshot of the session. Live playback is untouched.
    pub fn render_frames(&self, sample_rate: u32, max_frames: usize) -> Vec<Frame> {
        let mut snapshot = lock(&self.session).clone();
        render_session(&mut snapshot, &self.config, sample_rate, max_frames).frames
    }

    pub fn render_to_wav(&self, sample_rate: u32, max_seconds: f64) -> Vec<u8> {
        let max_frames = (sample_rate as f64 * max_seconds.max(0.0)).round() as usize;
        let frames = self.render_frames(sample_rate, max_frames);
        frames_to_wav(&frames, sample_rate)
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

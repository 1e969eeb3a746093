//! Audio output trait and error types.

/// Error type for audio operations.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("device init error: {0}")]
    DeviceInit(String),
    #[error("stream create error: {0}")]
    StreamCreate(String),
    #[error("playback error: {0}")]
    Playback(String),
    #[error("no audio device available")]
    NoDevice,
    #[error("no stream has been built")]
    NoStream,
}

/// Trait for audio output backends.
pub trait AudioOutput {
    /// Get the sample rate.
    fn sample_rate(&self) -> u32;

    /// Start (or resume) the device.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Pause the device.
    fn stop(&mut self) -> Result<(), AudioError>;
}

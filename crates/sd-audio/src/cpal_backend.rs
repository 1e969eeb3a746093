//! CPAL-based audio output backend.
//!
//! The device callback owns the [`AudioGraph`] and renders it directly,
//! so the device's frame count is the audio clock.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use sd_engine::{AudioClock, AudioGraph, ClockError, FrameClock};

use crate::traits::{AudioError, AudioOutput};

/// CPAL-based audio output.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    clock: FrameClock,
}

impl CpalOutput {
    /// Open the default output device.
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut config: StreamConfig = config.into();
        // Force stereo output; the graph renders a stereo pair
        config.channels = 2;

        log::info!(
            "audio device {:?} at {} Hz",
            device.name().unwrap_or_else(|_| "unknown".into()),
            config.sample_rate.0
        );
        let clock = FrameClock::new(config.sample_rate.0);
        Ok(Self { device, config, stream: None, clock })
    }

    /// Clock the graph must be created with.
    pub fn clock(&self) -> FrameClock {
        self.clock.clone()
    }

    /// Build the stream around `graph`. The stream starts paused; it is
    /// started by [`AudioClock::resume`] or [`AudioOutput::start`].
    pub fn build_stream(&mut self, mut graph: AudioGraph) -> Result<(), AudioError> {
        let channels = self.config.channels as usize;

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    graph.render_interleaved(data, channels);
                },
                |err| log::error!("audio stream error: {err}"),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn start(&mut self) -> Result<(), AudioError> {
        let stream = self.stream.as_ref().ok_or(AudioError::NoStream)?;
        stream.play().map_err(|e| AudioError::Playback(e.to_string()))
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        if let Some(ref stream) = self.stream {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }
}

impl AudioClock for CpalOutput {
    fn now(&self) -> f64 {
        self.clock.now()
    }

    fn resume(&self) -> Result<(), ClockError> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| ClockError::Suspended(AudioError::NoStream.to_string()))?;
        stream.play().map_err(|e| ClockError::Suspended(e.to_string()))
    }
}

//! Audio capture module
//!
//! Provides audio recording capabilities using cpal, which works with
//! PipeWire, PulseAudio, and ALSA backends.
//!
//! Captured chunks are streamed over a channel into the orchestrator,
//! which appends them to the active session's `AudioBuffer`. The capture
//! itself holds no session state.

pub mod buffer;
pub mod cpal_capture;

pub use buffer::AudioBuffer;

use crate::config::AudioConfig;
use crate::error::AudioError;
use tokio::sync::mpsc;

/// Trait for audio capture implementations
#[async_trait::async_trait]
pub trait AudioCapture: Send + Sync {
    /// Start capturing audio.
    /// Returns a channel receiver for audio chunks (f32 samples, mono,
    /// resampled to the configured rate). The channel closes once capture
    /// stops and the last chunk has been flushed.
    async fn start(&mut self) -> Result<mpsc::Receiver<Vec<f32>>, AudioError>;

    /// Stop capturing and release the device
    async fn stop(&mut self) -> Result<(), AudioError>;
}

/// Factory function to create audio capture
pub fn create_capture(config: &AudioConfig) -> Result<Box<dyn AudioCapture>, AudioError> {
    Ok(Box::new(cpal_capture::CpalCapture::new(config)?))
}

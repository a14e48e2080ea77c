//! Per-session audio buffer
//!
//! Accumulates captured samples for the duration of one recording session.
//! The buffer is closed for writes before being handed to the transcription
//! gateway; pushes after close are dropped.

/// Ordered sequence of PCM samples (f32, mono) owned by a single session.
#[derive(Debug)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    max_samples: usize,
    closed: bool,
}

impl AudioBuffer {
    /// Create a buffer capped at `max_duration_secs` of audio
    pub fn new(sample_rate: u32, max_duration_secs: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
            max_samples: sample_rate as usize * max_duration_secs as usize,
            closed: false,
        }
    }

    /// Append a chunk of captured samples.
    ///
    /// Ignored once the buffer is closed; truncates at the duration cap.
    pub fn push(&mut self, chunk: &[f32]) {
        if self.closed {
            return;
        }
        let remaining = self.max_samples.saturating_sub(self.samples.len());
        let take = chunk.len().min(remaining);
        self.samples.extend_from_slice(&chunk[..take]);
    }

    /// Close the buffer for writes. Must be called before handoff to the
    /// transcription gateway.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Consume the buffer, yielding the captured samples
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

//! Transcription gateway
//!
//! Wraps the local whisper.cpp speech model behind a narrow contract:
//! audio samples in, text plus detected language out. Transport and
//! inference failures surface only as `GatewayError` kinds.

pub mod whisper;

use crate::config::ModelConfig;
use crate::error::GatewayError;
use crate::mode::Language;

/// Minimum sample count the gateway accepts (0.1 s at 16 kHz).
/// The orchestrator short-circuits well above this; the gateway rejects
/// pathological input independently.
pub const MIN_GATEWAY_SAMPLES: usize = 1600;

/// Immutable result of one transcription
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResult {
    pub text: String,
    pub language: Language,
}

/// Trait for speech-to-text gateway implementations
pub trait Transcriber: Send + Sync {
    /// Transcribe audio samples (f32, mono, 16 kHz) to text.
    ///
    /// `language_hint` forces decoding in a concrete language; None
    /// enables auto-detection.
    fn transcribe(
        &self,
        samples: &[f32],
        language_hint: Option<&str>,
    ) -> Result<TranscriptionResult, GatewayError>;
}

/// Factory function to create the whisper-backed transcriber
pub fn create_transcriber(config: &ModelConfig) -> Result<Box<dyn Transcriber>, GatewayError> {
    tracing::info!("Creating transcriber: model={}", config.name);
    Ok(Box::new(whisper::WhisperTranscriber::new(config)?))
}

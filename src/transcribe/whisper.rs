//! Whisper-based speech-to-text transcription
//!
//! Uses whisper.cpp via the whisper-rs crate for fast, local transcription
//! with built-in language identification.

use super::{Transcriber, TranscriptionResult, MIN_GATEWAY_SAMPLES};
use crate::config::{Config, ModelConfig};
use crate::error::GatewayError;
use crate::mode::Language;
use std::path::PathBuf;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Whisper-based transcriber
pub struct WhisperTranscriber {
    /// Whisper context (holds the model)
    ctx: WhisperContext,
    /// Number of threads to use
    threads: usize,
}

impl WhisperTranscriber {
    /// Create a new whisper transcriber, loading the model eagerly
    pub fn new(config: &ModelConfig) -> Result<Self, GatewayError> {
        let model_path = resolve_model_path(&config.name)?;

        tracing::info!("Loading whisper model from {:?}", model_path);
        let start = std::time::Instant::now();

        let ctx = WhisperContext::new_with_params(
            model_path
                .to_str()
                .ok_or_else(|| GatewayError::ModelUnavailable("Invalid model path".to_string()))?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| GatewayError::ModelUnavailable(e.to_string()))?;

        tracing::info!("Model loaded in {:.2}s", start.elapsed().as_secs_f32());

        let threads = config.threads.unwrap_or_else(|| num_cpus::get().min(4));

        Ok(Self { ctx, threads })
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(
        &self,
        samples: &[f32],
        language_hint: Option<&str>,
    ) -> Result<TranscriptionResult, GatewayError> {
        if samples.len() < MIN_GATEWAY_SAMPLES {
            return Err(GatewayError::EmptyAudio);
        }

        let duration_secs = samples.len() as f32 / 16000.0;
        tracing::debug!(
            "Transcribing {:.2}s of audio ({} samples)",
            duration_secs,
            samples.len()
        );

        let start = std::time::Instant::now();

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| GatewayError::ModelUnavailable(e.to_string()))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        // None enables whisper's language auto-detection
        params.set_language(language_hint);
        params.set_n_threads(self.threads as i32);

        // Disable output we don't need
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        // Improve transcription quality
        params.set_suppress_blank(true);

        // For short recordings, use single segment mode
        if duration_secs < 30.0 {
            params.set_single_segment(true);
        }

        state
            .full(params, samples)
            .map_err(|e| GatewayError::ModelUnavailable(e.to_string()))?;

        // Detected language (the decode language when a hint was given)
        let lang_id = state.full_lang_id_from_state();
        let language = whisper_rs::get_lang_str(lang_id)
            .map(Language::from_code)
            .unwrap_or(Language::Unknown);

        let mut text = String::new();
        for segment in state.as_iter() {
            text.push_str(&segment.to_string());
        }

        let result = text.trim().to_string();

        tracing::info!(
            "Transcription completed in {:.2}s (language: {}): {:?}",
            start.elapsed().as_secs_f32(),
            language,
            if result.chars().count() > 50 {
                format!("{}...", result.chars().take(50).collect::<String>())
            } else {
                result.clone()
            }
        );

        Ok(TranscriptionResult {
            text: result,
            language,
        })
    }
}

/// Resolve model name to a ggml file path
fn resolve_model_path(model: &str) -> Result<PathBuf, GatewayError> {
    // If it's already an absolute path, use it directly
    let path = PathBuf::from(model);
    if path.is_absolute() && path.exists() {
        return Ok(path);
    }

    let model_filename = match model {
        "tiny" => "ggml-tiny.bin",
        "tiny.en" => "ggml-tiny.en.bin",
        "base" => "ggml-base.bin",
        "base.en" => "ggml-base.en.bin",
        "small" => "ggml-small.bin",
        "small.en" => "ggml-small.en.bin",
        "medium" => "ggml-medium.bin",
        "medium.en" => "ggml-medium.en.bin",
        "large" | "large-v3" => "ggml-large-v3.bin",
        "large-v3-turbo" => "ggml-large-v3-turbo.bin",
        other if other.ends_with(".bin") => other,
        other => {
            return Err(GatewayError::ModelUnavailable(format!(
                "Unknown model: '{}'. Valid models: tiny, base, small, medium, large-v3, large-v3-turbo",
                other
            )));
        }
    };

    let models_dir = Config::models_dir();
    let model_path = models_dir.join(model_filename);
    if model_path.exists() {
        return Ok(model_path);
    }

    // Also check current directory and ./models/
    let cwd_path = PathBuf::from(model_filename);
    if cwd_path.exists() {
        return Ok(cwd_path);
    }
    let local_models_path = PathBuf::from("models").join(model_filename);
    if local_models_path.exists() {
        return Ok(local_models_path);
    }

    Err(GatewayError::ModelUnavailable(format!(
        "Model '{}' not found. Looked in:\n  - {}\n  - {}\n  - {}\n\nDownload from: https://huggingface.co/ggerganov/whisper.cpp/tree/main",
        model,
        model_path.display(),
        cwd_path.display(),
        local_models_path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_model_rejected() {
        let err = resolve_model_path("enormous-v9").unwrap_err();
        assert!(matches!(err, GatewayError::ModelUnavailable(_)));
    }
}

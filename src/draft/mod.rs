//! Drafting gateway
//!
//! Wraps the text-generation backend behind a narrow contract: spoken
//! intent plus a target language in, a polished message out. The only
//! failure kinds that escape are `ModelUnavailable` (backend unreachable,
//! including timeouts) and `DraftRejected` (empty or clearly malformed
//! output).

pub mod ollama;

use crate::config::GenerationConfig;
use crate::error::GatewayError;
use crate::mode::Language;

/// Drafts shorter than this (after trimming) are rejected as malformed
pub const MIN_DRAFT_CHARS: usize = 2;

/// Immutable result of one drafting call
#[derive(Debug, Clone, PartialEq)]
pub struct DraftResult {
    pub text: String,
}

/// Trait for text-generation gateway implementations
pub trait Drafter: Send + Sync {
    /// Rewrite the transcribed intent into a polished message in the
    /// given language.
    fn draft(&self, intent: &str, language: Language) -> Result<DraftResult, GatewayError>;

    /// Check whether the backend is reachable and the model is present.
    /// Used at startup to degrade gracefully to transcription mode.
    fn is_available(&self) -> bool;

    /// Human-readable backend name for logging
    fn name(&self) -> &'static str;
}

/// Factory function to create the configured drafter
pub fn create_drafter(config: &GenerationConfig) -> Result<Box<dyn Drafter>, GatewayError> {
    // config.validate() already restricts the provider to ollama
    tracing::info!(
        "Creating drafter: provider={}, model={}",
        config.provider,
        config.model
    );
    Ok(Box::new(ollama::OllamaDrafter::new(config)))
}

/// Validate raw backend output, normalizing it into a `DraftResult`.
///
/// Shared by backends so the rejection floor stays consistent.
pub fn validate_draft(raw: &str, error_template: &str) -> Result<DraftResult, GatewayError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(GatewayError::DraftRejected("empty response".to_string()));
    }
    if trimmed.len() < MIN_DRAFT_CHARS {
        return Err(GatewayError::DraftRejected(format!(
            "response below minimum length ({} chars)",
            trimmed.len()
        )));
    }
    if trimmed == error_template {
        return Err(GatewayError::DraftRejected(
            "backend returned its error template".to_string(),
        ));
    }

    Ok(DraftResult {
        text: trimmed.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_normal_draft() {
        let result = validate_draft("  Hi, the meeting moved to 3pm.  ", "ERROR").unwrap();
        assert_eq!(result.text, "Hi, the meeting moved to 3pm.");
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert!(matches!(
            validate_draft("   ", "ERROR"),
            Err(GatewayError::DraftRejected(_))
        ));
    }

    #[test]
    fn test_validate_rejects_below_floor() {
        assert!(matches!(
            validate_draft("x", "ERROR"),
            Err(GatewayError::DraftRejected(_))
        ));
    }

    #[test]
    fn test_validate_rejects_error_template() {
        assert!(matches!(
            validate_draft("ERROR", "ERROR"),
            Err(GatewayError::DraftRejected(_))
        ));
    }
}

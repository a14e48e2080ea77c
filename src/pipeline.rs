//! Processing pipeline
//!
//! The processing phase of a session, expressed as a pure function over
//! the gateway traits: samples in, deliverable text out. Keeping this
//! free of I/O and channel plumbing makes the mode semantics directly
//! testable.

use crate::draft::Drafter;
use crate::error::GatewayError;
use crate::mode::{resolve_language, Language, Mode, ModeSnapshot};
use crate::text::normalize_transcript;
use crate::transcribe::Transcriber;

/// Deliverable result of one processing run
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutput {
    /// Text ready for the clipboard
    pub text: String,
    /// Language the text is in
    pub language: Language,
    /// True when the text came from the drafting gateway
    pub drafted: bool,
    /// True when drafting was requested but the verbatim transcript was
    /// delivered instead
    pub draft_fallback: bool,
}

/// Run one session's audio through the gateways.
///
/// Returns `Ok(None)` when the transcript is empty (silence, breath
/// noise) so the caller can discard the session without treating it as
/// a failure. Transcription errors propagate; drafting errors do not:
/// any drafting failure falls back to the verbatim transcript.
pub fn produce_text(
    samples: &[f32],
    snapshot: &ModeSnapshot,
    transcriber: &dyn Transcriber,
    drafter: Option<&dyn Drafter>,
    last_language: Option<Language>,
) -> Result<Option<SessionOutput>, GatewayError> {
    let hint = snapshot.language_preference.model_hint();
    let transcription = transcriber.transcribe(samples, hint)?;

    if transcription.text.trim().is_empty() {
        tracing::debug!("Empty transcript, discarding session");
        return Ok(None);
    }

    let language = resolve_language(
        snapshot.language_preference,
        transcription.language,
        last_language,
    );

    let verbatim = normalize_transcript(&transcription.text);

    if snapshot.mode == Mode::Drafting {
        if let Some(drafter) = drafter {
            match drafter.draft(&transcription.text, language) {
                Ok(draft) => {
                    return Ok(Some(SessionOutput {
                        text: draft.text,
                        language,
                        drafted: true,
                        draft_fallback: false,
                    }));
                }
                Err(e) => {
                    // Never lose the user's words over a drafting problem
                    tracing::warn!("Drafting failed, delivering verbatim transcript: {}", e);
                    return Ok(Some(SessionOutput {
                        text: verbatim,
                        language,
                        drafted: false,
                        draft_fallback: true,
                    }));
                }
            }
        }
        tracing::warn!("Drafting mode active but no drafter configured, delivering verbatim");
    }

    Ok(Some(SessionOutput {
        text: verbatim,
        language,
        drafted: false,
        draft_fallback: false,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::DraftResult;
    use crate::mode::{LanguagePreference, Mode};
    use crate::transcribe::TranscriptionResult;

    struct FakeTranscriber {
        text: String,
        language: Language,
    }

    impl Transcriber for FakeTranscriber {
        fn transcribe(
            &self,
            _samples: &[f32],
            _language_hint: Option<&str>,
        ) -> Result<TranscriptionResult, GatewayError> {
            Ok(TranscriptionResult {
                text: self.text.clone(),
                language: self.language,
            })
        }
    }

    struct FakeDrafter {
        result: Result<String, GatewayError>,
    }

    impl Drafter for FakeDrafter {
        fn draft(&self, _intent: &str, _language: Language) -> Result<DraftResult, GatewayError> {
            self.result
                .as_ref()
                .map(|text| DraftResult { text: text.clone() })
                .map_err(|e| match e {
                    GatewayError::ModelUnavailable(m) => {
                        GatewayError::ModelUnavailable(m.clone())
                    }
                    GatewayError::DraftRejected(m) => GatewayError::DraftRejected(m.clone()),
                    GatewayError::EmptyAudio => GatewayError::EmptyAudio,
                })
        }

        fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    fn snapshot(mode: Mode) -> ModeSnapshot {
        ModeSnapshot {
            mode,
            language_preference: LanguagePreference::Auto,
            model: "base".to_string(),
            draft_model: "llama3.1:8b".to_string(),
            min_samples: 8000,
            sample_rate: 16000,
        }
    }

    #[test]
    fn test_transcription_mode_normalizes_verbatim() {
        let transcriber = FakeTranscriber {
            text: "  remember to buy milk   and eggs ".to_string(),
            language: Language::En,
        };

        let output = produce_text(
            &[0.0; 16000],
            &snapshot(Mode::Transcription),
            &transcriber,
            None,
            None,
        )
        .unwrap()
        .unwrap();

        assert_eq!(output.text, "Remember to buy milk and eggs.");
        assert_eq!(output.language, Language::En);
        assert!(!output.draft_fallback);
    }

    #[test]
    fn test_empty_transcript_is_discarded() {
        let transcriber = FakeTranscriber {
            text: "   ".to_string(),
            language: Language::Unknown,
        };

        let output = produce_text(
            &[0.0; 16000],
            &snapshot(Mode::Transcription),
            &transcriber,
            None,
            None,
        )
        .unwrap();

        assert!(output.is_none());
    }

    #[test]
    fn test_drafting_mode_delivers_draft() {
        let transcriber = FakeTranscriber {
            text: "uh tell maria the meeting moved to three".to_string(),
            language: Language::En,
        };
        let drafter = FakeDrafter {
            result: Ok("Hi Maria, the meeting has moved to 3pm.".to_string()),
        };

        let output = produce_text(
            &[0.0; 16000],
            &snapshot(Mode::Drafting),
            &transcriber,
            Some(&drafter),
            None,
        )
        .unwrap()
        .unwrap();

        assert_eq!(output.text, "Hi Maria, the meeting has moved to 3pm.");
        assert!(output.drafted);
        assert!(!output.draft_fallback);
    }

    #[test]
    fn test_draft_rejection_falls_back_to_verbatim() {
        let transcriber = FakeTranscriber {
            text: "tell maria the meeting moved".to_string(),
            language: Language::En,
        };
        let drafter = FakeDrafter {
            result: Err(GatewayError::DraftRejected("empty response".to_string())),
        };

        let output = produce_text(
            &[0.0; 16000],
            &snapshot(Mode::Drafting),
            &transcriber,
            Some(&drafter),
            None,
        )
        .unwrap()
        .unwrap();

        assert_eq!(output.text, "Tell maria the meeting moved.");
        assert!(output.draft_fallback);
    }

    #[test]
    fn test_draft_timeout_falls_back_to_verbatim() {
        let transcriber = FakeTranscriber {
            text: "status update is done".to_string(),
            language: Language::En,
        };
        let drafter = FakeDrafter {
            result: Err(GatewayError::ModelUnavailable("timed out".to_string())),
        };

        let output = produce_text(
            &[0.0; 16000],
            &snapshot(Mode::Drafting),
            &transcriber,
            Some(&drafter),
            None,
        )
        .unwrap()
        .unwrap();

        assert_eq!(output.text, "Status update is done.");
        assert!(output.draft_fallback);
    }

    #[test]
    fn test_transcription_error_propagates() {
        struct FailingTranscriber;
        impl Transcriber for FailingTranscriber {
            fn transcribe(
                &self,
                _samples: &[f32],
                _language_hint: Option<&str>,
            ) -> Result<TranscriptionResult, GatewayError> {
                Err(GatewayError::ModelUnavailable("model gone".to_string()))
            }
        }

        let result = produce_text(
            &[0.0; 16000],
            &snapshot(Mode::Transcription),
            &FailingTranscriber,
            None,
            None,
        );

        assert!(matches!(result, Err(GatewayError::ModelUnavailable(_))));
    }

    #[test]
    fn test_detected_language_carried_through() {
        let transcriber = FakeTranscriber {
            text: "recuerda comprar leche".to_string(),
            language: Language::Es,
        };

        let output = produce_text(
            &[0.0; 16000],
            &snapshot(Mode::Transcription),
            &transcriber,
            None,
            Some(Language::En),
        )
        .unwrap()
        .unwrap();

        assert_eq!(output.language, Language::Es);
    }

    #[test]
    fn test_unknown_detection_uses_last_language() {
        let transcriber = FakeTranscriber {
            text: "mm hm okay".to_string(),
            language: Language::Unknown,
        };

        let output = produce_text(
            &[0.0; 16000],
            &snapshot(Mode::Transcription),
            &transcriber,
            None,
            Some(Language::Es),
        )
        .unwrap()
        .unwrap();

        assert_eq!(output.language, Language::Es);
    }
}

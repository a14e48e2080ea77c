//! End-to-end session flow tests with mock gateways.
//!
//! Exercises the processing pipeline and session state machine the way
//! the daemon drives them, without real audio or models.

use dicta::config::Config;
use dicta::draft::{DraftResult, Drafter};
use dicta::error::GatewayError;
use dicta::history::History;
use dicta::mode::{Language, LanguagePreference, Mode, ModeSnapshot};
use dicta::pipeline::produce_text;
use dicta::session::{Session, SessionState};
use dicta::transcribe::{Transcriber, TranscriptionResult};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Transcriber returning a fixed result, counting invocations
struct ScriptedTranscriber {
    text: &'static str,
    language: Language,
    calls: AtomicUsize,
}

impl ScriptedTranscriber {
    fn new(text: &'static str, language: Language) -> Self {
        Self {
            text,
            language,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Transcriber for ScriptedTranscriber {
    fn transcribe(
        &self,
        samples: &[f32],
        _language_hint: Option<&str>,
    ) -> Result<TranscriptionResult, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(!samples.is_empty());
        Ok(TranscriptionResult {
            text: self.text.to_string(),
            language: self.language,
        })
    }
}

/// Drafter that can be scripted to succeed, reject, or time out
enum DrafterScript {
    Succeed(&'static str),
    Reject,
    TimeOut,
}

struct ScriptedDrafter {
    script: DrafterScript,
    seen_language: std::sync::Mutex<Option<Language>>,
}

impl ScriptedDrafter {
    fn new(script: DrafterScript) -> Self {
        Self {
            script,
            seen_language: std::sync::Mutex::new(None),
        }
    }
}

impl Drafter for ScriptedDrafter {
    fn draft(&self, _intent: &str, language: Language) -> Result<DraftResult, GatewayError> {
        *self.seen_language.lock().unwrap() = Some(language);
        match self.script {
            DrafterScript::Succeed(text) => Ok(DraftResult {
                text: text.to_string(),
            }),
            DrafterScript::Reject => Err(GatewayError::DraftRejected("empty response".into())),
            DrafterScript::TimeOut => {
                Err(GatewayError::ModelUnavailable("request timed out".into()))
            }
        }
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn snapshot(mode: Mode, preference: LanguagePreference) -> ModeSnapshot {
    ModeSnapshot {
        mode,
        language_preference: preference,
        model: "base".to_string(),
        draft_model: "llama3.1:8b".to_string(),
        min_samples: 8000,
        sample_rate: 16000,
    }
}

fn one_second_of_audio() -> Vec<f32> {
    vec![0.01; 16000]
}

#[test]
fn transcription_session_delivers_normalized_verbatim() {
    let transcriber =
        ScriptedTranscriber::new("  remember to buy milk   and eggs ", Language::En);

    let output = produce_text(
        &one_second_of_audio(),
        &snapshot(Mode::Transcription, LanguagePreference::Auto),
        &transcriber,
        None,
        None,
    )
    .unwrap()
    .expect("text should be produced");

    assert_eq!(output.text, "Remember to buy milk and eggs.");
    assert_eq!(output.language, Language::En);
    assert!(!output.drafted);
    assert_eq!(transcriber.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn drafting_session_passes_detected_language_to_drafter() {
    let transcriber = ScriptedTranscriber::new("dile a maria que llego tarde", Language::Es);
    let drafter = ScriptedDrafter::new(DrafterScript::Succeed(
        "Hola Maria, voy a llegar tarde. Lo siento.",
    ));

    let output = produce_text(
        &one_second_of_audio(),
        &snapshot(Mode::Drafting, LanguagePreference::Auto),
        &transcriber,
        Some(&drafter),
        None,
    )
    .unwrap()
    .expect("draft should be produced");

    assert_eq!(output.text, "Hola Maria, voy a llegar tarde. Lo siento.");
    assert_eq!(output.language, Language::Es);
    assert!(output.drafted);
    assert_eq!(*drafter.seen_language.lock().unwrap(), Some(Language::Es));
}

#[test]
fn draft_timeout_delivers_verbatim_transcript() {
    let transcriber = ScriptedTranscriber::new("the deploy finished without errors", Language::En);
    let drafter = ScriptedDrafter::new(DrafterScript::TimeOut);

    let output = produce_text(
        &one_second_of_audio(),
        &snapshot(Mode::Drafting, LanguagePreference::Auto),
        &transcriber,
        Some(&drafter),
        None,
    )
    .unwrap()
    .expect("fallback text should be produced");

    assert_eq!(output.text, "The deploy finished without errors.");
    assert!(output.draft_fallback);
    assert!(!output.drafted);
}

#[test]
fn draft_rejection_delivers_verbatim_transcript() {
    let transcriber = ScriptedTranscriber::new("ping me when you are free", Language::En);
    let drafter = ScriptedDrafter::new(DrafterScript::Reject);

    let output = produce_text(
        &one_second_of_audio(),
        &snapshot(Mode::Drafting, LanguagePreference::Auto),
        &transcriber,
        Some(&drafter),
        None,
    )
    .unwrap()
    .expect("fallback text should be produced");

    assert_eq!(output.text, "Ping me when you are free.");
    assert!(output.draft_fallback);
}

#[test]
fn forced_language_preference_wins_over_detection() {
    let transcriber = ScriptedTranscriber::new("send it tomorrow", Language::En);
    let drafter = ScriptedDrafter::new(DrafterScript::Succeed("Lo envio manana."));

    let output = produce_text(
        &one_second_of_audio(),
        &snapshot(Mode::Drafting, LanguagePreference::Es),
        &transcriber,
        Some(&drafter),
        None,
    )
    .unwrap()
    .unwrap();

    assert_eq!(output.language, Language::Es);
    assert_eq!(*drafter.seen_language.lock().unwrap(), Some(Language::Es));
}

#[test]
fn silent_session_produces_no_output() {
    let transcriber = ScriptedTranscriber::new("   ", Language::Unknown);

    let output = produce_text(
        &one_second_of_audio(),
        &snapshot(Mode::Transcription, LanguagePreference::Auto),
        &transcriber,
        None,
        None,
    )
    .unwrap();

    assert!(output.is_none());
}

#[test]
fn transcription_failure_is_terminal() {
    struct BrokenTranscriber;
    impl Transcriber for BrokenTranscriber {
        fn transcribe(
            &self,
            _samples: &[f32],
            _language_hint: Option<&str>,
        ) -> Result<TranscriptionResult, GatewayError> {
            Err(GatewayError::ModelUnavailable("model file missing".into()))
        }
    }

    let result = produce_text(
        &one_second_of_audio(),
        &snapshot(Mode::Transcription, LanguagePreference::Auto),
        &BrokenTranscriber,
        None,
        None,
    );

    assert!(matches!(result, Err(GatewayError::ModelUnavailable(_))));
}

#[test]
fn session_buffer_is_frozen_before_processing() {
    let config = Config::default();
    let mut session = Session::new(1, config.snapshot(), config.audio.max_duration_secs);

    session.buffer.push(&one_second_of_audio());
    session.buffer.close();

    // Late chunks from a winding-down capture thread must not land
    session.buffer.push(&[1.0; 4000]);
    assert_eq!(session.buffer.len(), 16000);
}

#[test]
fn short_recording_is_below_processing_threshold() {
    let config = Config::default();
    let mut session = Session::new(1, config.snapshot(), config.audio.max_duration_secs);

    // 0.2s at 16 kHz, under the 500 ms default floor
    session.buffer.push(&vec![0.01; 3200]);
    assert!(!session.has_enough_audio());

    session.buffer.push(&vec![0.01; 4800]);
    assert!(session.has_enough_audio());
}

#[test]
fn duplicate_start_is_visible_through_state_guards() {
    let config = Config::default();
    let mut state = SessionState::Idle;
    assert!(state.is_idle());

    state = SessionState::Recording(Session::new(
        1,
        config.snapshot(),
        config.audio.max_duration_secs,
    ));

    // The control loop only starts a session from Idle; a second press
    // while recording finds the guard closed
    assert!(!state.is_idle());
    assert!(state.is_recording());
    assert_eq!(state.session_id(), Some(1));
}

#[test]
fn delivered_text_is_recoverable_from_history() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");

    let transcriber = ScriptedTranscriber::new("send the report by friday", Language::En);
    let output = produce_text(
        &one_second_of_audio(),
        &snapshot(Mode::Transcription, LanguagePreference::Auto),
        &transcriber,
        None,
        None,
    )
    .unwrap()
    .expect("text should be produced");

    let mut history = History::load(path.clone(), 50);
    history
        .record(&output.text, output.language, Mode::Transcription)
        .unwrap();

    // A fresh load sees the delivered text, newest first
    let reloaded = History::load(path, 50);
    assert_eq!(reloaded.recent(1)[0].text, "Send the report by friday.");
    assert_eq!(reloaded.recent(1)[0].language, Language::En);
}

#[test]
fn session_ids_are_monotonic_across_outcomes() {
    let config = Config::default();

    // Cancelled or discarded sessions never reuse their id
    let first = Session::new(1, config.snapshot(), config.audio.max_duration_secs);
    drop(first);
    let second = Session::new(2, config.snapshot(), config.audio.max_duration_secs);
    assert_eq!(second.id, 2);
}

//! Mode policy: operating mode, language preference, and the per-session
//! configuration snapshot.
//!
//! The snapshot is taken once when a session is created. A config change
//! made while a recording is in flight never touches that session.

use serde::{Deserialize, Serialize};

/// Operating mode for text production
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Verbatim speech-to-text output (cosmetic normalization only)
    #[default]
    Transcription,
    /// AI-rewritten message from spoken intent
    Drafting,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Transcription => write!(f, "transcription"),
            Mode::Drafting => write!(f, "drafting"),
        }
    }
}

/// User language preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LanguagePreference {
    /// Follow whatever language the speech model detects
    #[default]
    Auto,
    En,
    Es,
}

impl LanguagePreference {
    /// Language hint passed to the speech model, None enables auto-detection
    pub fn model_hint(self) -> Option<&'static str> {
        match self {
            LanguagePreference::Auto => None,
            LanguagePreference::En => Some("en"),
            LanguagePreference::Es => Some("es"),
        }
    }
}

/// A language as detected by (or resolved for) a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Es,
    Unknown,
}

impl Language {
    /// Map a whisper language code to a supported language
    pub fn from_code(code: &str) -> Self {
        match code {
            "en" => Language::En,
            "es" => Language::Es,
            _ => Language::Unknown,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Immutable per-session configuration snapshot.
///
/// Read by every new session at creation time; the orchestrator never
/// consults the live config while a session is in flight.
#[derive(Debug, Clone)]
pub struct ModeSnapshot {
    pub mode: Mode,
    pub language_preference: LanguagePreference,
    /// Whisper model name (resolved to a ggml file by the gateway)
    pub model: String,
    /// Ollama model used in drafting mode
    pub draft_model: String,
    /// Minimum captured samples before processing is worth attempting
    pub min_samples: usize,
    pub sample_rate: u32,
}

/// Resolve the language handed to the drafting gateway.
///
/// A concrete preference overrides detection. With `auto`, the detected
/// language wins; an unknown detection falls back to the last successfully
/// used language, then English.
pub fn resolve_language(
    preference: LanguagePreference,
    detected: Language,
    last_used: Option<Language>,
) -> Language {
    match preference {
        LanguagePreference::En => Language::En,
        LanguagePreference::Es => Language::Es,
        LanguagePreference::Auto => match detected {
            Language::Unknown => match last_used {
                Some(lang) if lang != Language::Unknown => lang,
                _ => Language::En,
            },
            lang => lang,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concrete_preference_overrides_detection() {
        let lang = resolve_language(LanguagePreference::Es, Language::En, None);
        assert_eq!(lang, Language::Es);
    }

    #[test]
    fn test_auto_follows_detection() {
        let lang = resolve_language(LanguagePreference::Auto, Language::Es, Some(Language::En));
        assert_eq!(lang, Language::Es);
    }

    #[test]
    fn test_unknown_falls_back_to_last_used() {
        let lang = resolve_language(LanguagePreference::Auto, Language::Unknown, Some(Language::Es));
        assert_eq!(lang, Language::Es);
    }

    #[test]
    fn test_unknown_defaults_to_english() {
        let lang = resolve_language(LanguagePreference::Auto, Language::Unknown, None);
        assert_eq!(lang, Language::En);
    }

    #[test]
    fn test_language_from_code() {
        assert_eq!(Language::from_code("en"), Language::En);
        assert_eq!(Language::from_code("es"), Language::Es);
        assert_eq!(Language::from_code("fr"), Language::Unknown);
        assert_eq!(Language::from_code(""), Language::Unknown);
    }

    #[test]
    fn test_mode_serde_rejects_unknown() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            #[allow(dead_code)]
            mode: Mode,
        }
        assert!(toml::from_str::<Wrapper>("mode = \"drafting\"").is_ok());
        assert!(toml::from_str::<Wrapper>("mode = \"polish\"").is_err());
    }
}

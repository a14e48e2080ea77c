//! Configuration loading and types for dicta
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/dicta/config.toml)
//! 3. Environment variables (DICTA_*)
//! 4. CLI arguments (highest priority)
//!
//! Mode and language values are validated here, at load time. A session
//! never sees the raw document, only a `ModeSnapshot`.

use crate::error::DictaError;
use crate::mode::{LanguagePreference, Mode, ModeSnapshot};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Dicta Configuration
#
# Location: ~/.config/dicta/config.toml
# All settings can be overridden via CLI flags

# State file for status-bar integrations (Waybar, polybar, etc.)
# Use "auto" for the default location ($XDG_RUNTIME_DIR/dicta/state),
# a custom path, or "disabled" to turn off. The daemon writes the session
# phase ("idle", "recording", "processing", "delivering") whenever it changes.
state_file = "auto"

[hotkey]
# Key that starts (and, depending on mode, stops) recording
# Common choices: SCROLLLOCK, PAUSE, RIGHTALT, F13-F24
# Use `evtest` to find key names for your keyboard
key = "SCROLLLOCK"

# Optional modifier keys that must also be held
# Example: modifiers = ["LEFTCTRL", "LEFTALT"]
modifiers = []

# Optional dedicated stop key (useful with mode = "toggle")
# stop_key = "F14"

# Key that cancels an in-flight session without delivering anything
cancel_key = "ESC"

# Activation mode: "push_to_talk" or "toggle"
# - push_to_talk: hold the key to record, release to process (default)
# - toggle: press once to start, press again to stop
# mode = "push_to_talk"

# Enable built-in hotkey detection (default: true)
# Set to false when using compositor keybindings with `dicta record` instead
# enabled = true

[audio]
# Audio input device ("default" uses the system default)
device = "default"

# Sample rate in Hz (whisper expects 16000)
sample_rate = 16000

# Maximum recording duration in seconds; reaching it acts as a stop signal
max_duration_secs = 60

# Recordings shorter than this are discarded without processing
min_duration_ms = 500

[model]
# Whisper model for transcription
# Options: tiny, base, small, medium, large-v3, large-v3-turbo
# Or provide an absolute path to a custom .bin model file
name = "base"

# Language: "auto" for detection, or a concrete "en" / "es"
language = "auto"

# Number of CPU threads for inference (omit for auto-detection)
# threads = 4

[generation]
# Drafting mode: rewrite the spoken intent into a polished message using a
# locally hosted LLM. When disabled, the verbatim transcript is delivered.
enabled = false

# Only "ollama" is supported
provider = "ollama"

# Ollama model used for drafting
model = "llama3.1:8b"

# Ollama server URL
url = "http://localhost:11434"

# Bounded wait for a draft; a timeout counts as the backend being unavailable
timeout_secs = 30

# Optional standing context folded into every drafting prompt
# (e.g. "these messages go to my engineering team")
# context = ""

[delivery]
# "clipboard" copies the final text; "paste" additionally simulates Ctrl+V
mode = "clipboard"

[delivery.notification]
# Desktop notifications for session-state changes (best effort)
on_recording_start = false
on_delivered = true
on_cancelled = true
on_failure = true

[history]
# Keep a local record of delivered texts, recoverable with `dicta history`
enabled = true

# Most recent entries kept; older ones are dropped
max_entries = 50

# "auto" stores the file at ~/.local/share/dicta/history.json
# path = "auto"
"#;

/// Hotkey activation mode
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivationMode {
    /// Hold key to record, release to stop (default)
    #[default]
    PushToTalk,
    /// Press once to start recording, press again to stop
    Toggle,
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub hotkey: HotkeyConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub history: HistoryConfig,

    /// Optional path to a state file for status-bar integrations.
    /// "auto" resolves to $XDG_RUNTIME_DIR/dicta/state.
    #[serde(default = "default_state_file")]
    pub state_file: Option<String>,
}

/// Hotkey detection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HotkeyConfig {
    /// Key name (evdev KEY_* constant name, without the KEY_ prefix)
    #[serde(default = "default_hotkey_key")]
    pub key: String,

    /// Optional modifier keys that must also be held
    #[serde(default)]
    pub modifiers: Vec<String>,

    /// Optional dedicated stop key (independent of the start key)
    #[serde(default)]
    pub stop_key: Option<String>,

    /// Key that cancels the in-flight session
    #[serde(default = "default_cancel_key")]
    pub cancel_key: Option<String>,

    /// Activation mode: push_to_talk (hold to record) or toggle
    #[serde(default)]
    pub mode: ActivationMode,

    /// Enable built-in hotkey detection; disable when driving the daemon
    /// with `dicta record start/stop` from compositor keybindings
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Audio capture configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioConfig {
    /// PipeWire/PulseAudio device name, or "default"
    #[serde(default = "default_device")]
    pub device: String,

    /// Sample rate in Hz (whisper expects 16000)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Maximum recording duration in seconds; acts as a stop signal
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: u32,

    /// Recordings shorter than this are discarded without processing
    #[serde(default = "default_min_duration_ms")]
    pub min_duration_ms: u32,
}

/// Whisper speech-to-text configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    /// Model name (tiny, base, small, medium, large-v3, large-v3-turbo)
    /// or an absolute path to a .bin file
    #[serde(default = "default_model")]
    pub name: String,

    /// "auto" for detection, or a concrete "en" / "es"
    #[serde(default)]
    pub language: LanguagePreference,

    /// Number of threads for inference (None = auto-detect)
    #[serde(default)]
    pub threads: Option<usize>,
}

/// Drafting (generative) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// Enable drafting mode
    #[serde(default)]
    pub enabled: bool,

    /// Backend provider; only "ollama" is supported
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Ollama model used for drafting
    #[serde(default = "default_draft_model")]
    pub model: String,

    /// Ollama server URL
    #[serde(default = "default_ollama_url")]
    pub url: String,

    /// Bounded wait for a draft, in seconds
    #[serde(default = "default_draft_timeout")]
    pub timeout_secs: u64,

    /// Optional standing context folded into every drafting prompt
    #[serde(default)]
    pub context: Option<String>,
}

/// Notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    /// Notify when recording starts
    #[serde(default)]
    pub on_recording_start: bool,

    /// Notify with a text preview once the final text is delivered
    #[serde(default = "default_true")]
    pub on_delivered: bool,

    /// Notify when the user cancels an in-flight session
    #[serde(default = "default_true")]
    pub on_cancelled: bool,

    /// Notify when a session fails or falls back to the verbatim transcript
    #[serde(default = "default_true")]
    pub on_failure: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            on_recording_start: false,
            on_delivered: true,
            on_cancelled: true,
            on_failure: true,
        }
    }
}

/// Clipboard delivery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
    /// Delivery mode
    #[serde(default)]
    pub mode: DeliveryMode,

    /// Notification settings
    #[serde(default)]
    pub notification: NotificationConfig,
}

/// Delivery history configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryConfig {
    /// Keep a persisted record of delivered texts
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Most recent entries kept
    #[serde(default = "default_history_max_entries")]
    pub max_entries: usize,

    /// History file location; "auto" resolves to the data directory
    #[serde(default = "default_auto")]
    pub path: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_history_max_entries(),
            path: default_auto(),
        }
    }
}

/// Delivery mode selection
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Copy final text to the clipboard (requires wl-copy)
    #[default]
    Clipboard,
    /// Copy to clipboard then simulate Ctrl+V (requires wl-copy and ydotool)
    Paste,
}

fn default_hotkey_key() -> String {
    "SCROLLLOCK".to_string()
}

fn default_cancel_key() -> Option<String> {
    Some("ESC".to_string())
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_max_duration() -> u32 {
    60
}

fn default_min_duration_ms() -> u32 {
    500
}

fn default_model() -> String {
    "base".to_string()
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_draft_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_draft_timeout() -> u64 {
    30
}

fn default_state_file() -> Option<String> {
    Some("auto".to_string())
}

fn default_history_max_entries() -> usize {
    50
}

fn default_auto() -> String {
    "auto".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            key: default_hotkey_key(),
            modifiers: vec![],
            stop_key: None,
            cancel_key: default_cancel_key(),
            mode: ActivationMode::default(),
            enabled: true,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
            max_duration_secs: default_max_duration(),
            min_duration_ms: default_min_duration_ms(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            language: LanguagePreference::default(),
            threads: None,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: default_draft_model(),
            url: default_ollama_url(),
            timeout_secs: default_draft_timeout(),
            context: None,
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            mode: DeliveryMode::default(),
            notification: NotificationConfig::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hotkey: HotkeyConfig::default(),
            audio: AudioConfig::default(),
            model: ModelConfig::default(),
            generation: GenerationConfig::default(),
            delivery: DeliveryConfig::default(),
            history: HistoryConfig::default(),
            state_file: default_state_file(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "dicta")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the runtime directory for ephemeral files (state, pid)
    pub fn runtime_dir() -> PathBuf {
        std::env::var("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
            .join("dicta")
    }

    /// Resolve the state file path from config.
    /// Returns None if disabled, the default path for "auto".
    pub fn resolve_state_file(&self) -> Option<PathBuf> {
        self.state_file
            .as_ref()
            .and_then(|path| match path.to_lowercase().as_str() {
                "disabled" | "none" | "off" | "false" => None,
                "auto" => Some(Self::runtime_dir().join("state")),
                _ => Some(PathBuf::from(path)),
            })
    }

    /// Get the data directory path (for models)
    pub fn data_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "dicta")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get the models directory path
    pub fn models_dir() -> PathBuf {
        Self::data_dir().join("models")
    }

    /// Resolve the delivery history file path
    pub fn history_file(&self) -> PathBuf {
        if self.history.path == "auto" {
            Self::data_dir().join("history.json")
        } else {
            PathBuf::from(&self.history.path)
        }
    }

    /// Current operating mode derived from the generation section
    pub fn mode(&self) -> Mode {
        if self.generation.enabled {
            Mode::Drafting
        } else {
            Mode::Transcription
        }
    }

    /// Take the immutable per-session snapshot of the live configuration
    pub fn snapshot(&self) -> ModeSnapshot {
        let min_samples =
            (self.audio.min_duration_ms as u64 * self.audio.sample_rate as u64 / 1000) as usize;
        ModeSnapshot {
            mode: self.mode(),
            language_preference: self.model.language,
            model: self.model.name.clone(),
            draft_model: self.generation.model.clone(),
            min_samples,
            sample_rate: self.audio.sample_rate,
        }
    }

    /// Validate cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), DictaError> {
        if self.generation.enabled && self.generation.provider != "ollama" {
            return Err(DictaError::Config(format!(
                "Unsupported generation provider: '{}'. Only 'ollama' is supported.",
                self.generation.provider
            )));
        }
        if self.audio.sample_rate == 0 {
            return Err(DictaError::Config(
                "audio.sample_rate must be non-zero".to_string(),
            ));
        }
        if self.audio.max_duration_secs == 0 {
            return Err(DictaError::Config(
                "audio.max_duration_secs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, DictaError> {
    let mut config = Config::default();

    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| DictaError::Config(format!("Failed to read config: {}", e)))?;

            config = toml::from_str(&contents)
                .map_err(|e| DictaError::Config(format!("Invalid config: {}", e)))?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    // Override from environment variables
    if let Ok(key) = std::env::var("DICTA_HOTKEY") {
        config.hotkey.key = key;
    }
    if let Ok(model) = std::env::var("DICTA_MODEL") {
        config.model.name = model;
    }
    if let Ok(url) = std::env::var("DICTA_OLLAMA_URL") {
        config.generation.url = url;
    }

    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.hotkey.key, "SCROLLLOCK");
        assert_eq!(config.hotkey.mode, ActivationMode::PushToTalk);
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.model.name, "base");
        assert_eq!(config.mode(), Mode::Transcription);
        assert_eq!(config.delivery.mode, DeliveryMode::Clipboard);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_string_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.model.language, LanguagePreference::Auto);
        assert!(config.delivery.notification.on_cancelled);
        assert!(config.history.enabled);
        assert_eq!(config.history.max_entries, 50);
    }

    #[test]
    fn test_cancelled_notification_has_own_switch() {
        let toml_str = r#"
            [delivery.notification]
            on_delivered = false
            on_cancelled = true
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(!config.delivery.notification.on_delivered);
        assert!(config.delivery.notification.on_cancelled);
    }

    #[test]
    fn test_history_file_resolution() {
        let mut config = Config::default();
        assert!(config.history_file().ends_with("history.json"));

        config.history.path = "/tmp/dicta-history.json".to_string();
        assert_eq!(
            config.history_file(),
            PathBuf::from("/tmp/dicta-history.json")
        );
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
            [hotkey]
            key = "PAUSE"
            modifiers = ["LEFTCTRL"]
            mode = "toggle"
            stop_key = "F14"

            [audio]
            device = "default"
            max_duration_secs = 30

            [model]
            name = "small"
            language = "es"

            [generation]
            enabled = true
            model = "mistral"

            [delivery]
            mode = "paste"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.hotkey.key, "PAUSE");
        assert_eq!(config.hotkey.modifiers, vec!["LEFTCTRL"]);
        assert_eq!(config.hotkey.mode, ActivationMode::Toggle);
        assert_eq!(config.hotkey.stop_key.as_deref(), Some("F14"));
        assert_eq!(config.model.language, LanguagePreference::Es);
        assert_eq!(config.mode(), Mode::Drafting);
        assert_eq!(config.delivery.mode, DeliveryMode::Paste);
    }

    #[test]
    fn test_invalid_language_rejected_at_load() {
        let toml_str = r#"
            [model]
            language = "fr"
        "#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }

    #[test]
    fn test_invalid_provider_rejected() {
        let toml_str = r#"
            [generation]
            enabled = true
            provider = "openai"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_snapshot_min_samples() {
        let config = Config::default();
        let snapshot = config.snapshot();
        // 500 ms at 16 kHz
        assert_eq!(snapshot.min_samples, 8000);
        assert_eq!(snapshot.mode, Mode::Transcription);
    }

    #[test]
    fn test_resolve_state_file() {
        let mut config = Config::default();
        assert!(config.resolve_state_file().is_some());

        config.state_file = Some("disabled".to_string());
        assert!(config.resolve_state_file().is_none());

        config.state_file = Some("/tmp/custom-state".to_string());
        assert_eq!(
            config.resolve_state_file(),
            Some(PathBuf::from("/tmp/custom-state"))
        );
    }
}

//! Error types for dicta
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.
//!
//! Gateway errors are the only error kinds that cross the orchestrator
//! boundary: transport and model failures are folded into them at the
//! gateway edge.

use thiserror::Error;

/// Top-level error type for the dicta application
#[derive(Error, Debug)]
pub enum DictaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Hotkey error: {0}")]
    Hotkey(#[from] HotkeyError),

    #[error("Audio capture error: {0}")]
    Audio(#[from] AudioError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to hotkey detection
#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("Cannot open input device '{0}'. Is the user in the 'input' group?\n  Run: sudo usermod -aG input $USER\n  Then log out and back in.")]
    DeviceAccess(String),

    #[error("Unknown key name: '{0}'. Use evtest to find valid key names.")]
    UnknownKey(String),

    #[error("No keyboard device found in /dev/input/")]
    NoKeyboard,

    #[error("Hotkey detection not supported: {0}")]
    NotSupported(String),

    #[error("evdev error: {0}")]
    Evdev(String),
}

/// Errors related to audio capture
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio connection failed: {0}")]
    Connection(String),

    #[error("Audio device not found: '{0}'. List devices with: pactl list sources short")]
    DeviceNotFound(String),

    #[error("Audio stream error: {0}")]
    StreamError(String),
}

/// Errors reported by the transcription and drafting gateways.
///
/// These are the only error kinds the orchestrator ever sees from a
/// gateway; raw HTTP, model, or inference errors never escape.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The audio buffer is below the minimum sample floor. Handled
    /// upstream as a no-op; the gateway rejects it independently.
    #[error("not enough audio to transcribe")]
    EmptyAudio,

    /// The backing model or runtime cannot be reached (includes timeouts).
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// The drafting backend returned empty or clearly malformed output.
    /// Recoverable: the orchestrator falls back to the verbatim transcript.
    #[error("draft rejected: {0}")]
    DraftRejected(String),
}

/// Errors related to clipboard delivery
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("wl-copy not found in PATH. Install wl-clipboard via your package manager.")]
    WlCopyNotFound,

    #[error("ydotool not found in PATH. Install via your package manager.")]
    YdotoolNotFound,

    #[error("ydotool daemon not running.\n  Start with: systemctl --user start ydotool")]
    YdotoolNotRunning,

    #[error("Clipboard write failed: {0}")]
    ClipboardFailed(String),

    #[error("Paste keystroke failed: {0}")]
    PasteFailed(String),

    #[error("All delivery methods failed. Ensure wl-copy is available.")]
    AllMethodsFailed,
}

/// Result type alias using DictaError
pub type Result<T> = std::result::Result<T, DictaError>;

#[cfg(target_os = "linux")]
impl From<evdev::Error> for HotkeyError {
    fn from(e: evdev::Error) -> Self {
        HotkeyError::Evdev(e.to_string())
    }
}

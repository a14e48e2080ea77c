//! Desktop notifications for session events
//!
//! Platform-specific, best-effort notifications:
//! - Linux: notify-send (libnotify)
//! - macOS: osascript (AppleScript)
//!
//! Failures are logged and never propagate.

use crate::config::NotificationConfig;
use std::process::Stdio;
use tokio::process::Command;

/// Session milestones the user may want surfaced on the desktop
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    /// Recording has started
    RecordingStarted,
    /// Text was delivered (preview truncated for display)
    Delivered { preview: String, drafted: bool },
    /// Drafting failed; the verbatim transcript was delivered instead
    DraftFallback { preview: String },
    /// The user cancelled the session; nothing was delivered
    Cancelled,
    /// The session failed outright
    Failed { reason: String },
}

/// Truncate text for notification display
fn preview(text: &str) -> String {
    if text.chars().count() > 80 {
        format!("{}...", text.chars().take(80).collect::<String>())
    } else {
        text.to_string()
    }
}

impl SessionNotice {
    /// Build a delivered notice with a truncated preview
    pub fn delivered(text: &str, drafted: bool) -> Self {
        SessionNotice::Delivered {
            preview: preview(text),
            drafted,
        }
    }

    /// Build a fallback notice with a truncated preview
    pub fn draft_fallback(text: &str) -> Self {
        SessionNotice::DraftFallback {
            preview: preview(text),
        }
    }
}

/// Send the notification for a session notice, honoring the per-event
/// config switches.
pub async fn notify_session(config: &NotificationConfig, notice: &SessionNotice) {
    match notice {
        SessionNotice::RecordingStarted => {
            if config.on_recording_start {
                send("Recording", "Listening...").await;
            }
        }
        SessionNotice::Delivered { preview, drafted } => {
            if config.on_delivered {
                let title = if *drafted {
                    "Draft copied to clipboard"
                } else {
                    "Copied to clipboard"
                };
                send(title, preview).await;
            }
        }
        SessionNotice::DraftFallback { preview } => {
            // Always surfaced; the user asked for a draft and got the
            // transcript instead
            send("Draft unavailable, copied transcript", preview).await;
        }
        SessionNotice::Cancelled => {
            if config.on_cancelled {
                send("Dictation cancelled", "Nothing was delivered").await;
            }
        }
        SessionNotice::Failed { reason } => {
            if config.on_failure {
                send("Dictation failed", reason).await;
            }
        }
    }
}

/// Send a desktop notification with the given title and body.
///
/// Async and non-blocking; failures are logged, never returned.
pub async fn send(title: &str, body: &str) {
    #[cfg(target_os = "linux")]
    send_linux(title, body).await;

    #[cfg(target_os = "macos")]
    send_macos(title, body).await;

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        tracing::debug!("Notifications not supported on this platform");
        let _ = (title, body); // Suppress unused warnings
    }
}

/// Send a notification on Linux using notify-send
#[cfg(target_os = "linux")]
async fn send_linux(title: &str, body: &str) {
    let result = Command::new("notify-send")
        .args(["--app-name=Dicta", "--expire-time=3000", title, body])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    if let Err(e) = result {
        tracing::debug!("Failed to send notification: {}", e);
    }
}

/// Send a notification on macOS using osascript
#[cfg(target_os = "macos")]
async fn send_macos(title: &str, body: &str) {
    let escaped_title = title.replace('"', "\\\"");
    let escaped_body = body.replace('"', "\\\"");

    let script = format!(
        r#"display notification "{}" with title "{}""#,
        escaped_body, escaped_title
    );

    let result = Command::new("osascript")
        .args(["-e", &script])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    if let Err(e) = result {
        tracing::debug!("Failed to send notification: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncation() {
        let long = "x".repeat(200);
        let notice = SessionNotice::delivered(&long, false);
        match notice {
            SessionNotice::Delivered { preview, .. } => {
                assert!(preview.chars().count() <= 83);
                assert!(preview.ends_with("..."));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_short_preview_unchanged() {
        let notice = SessionNotice::delivered("hello", true);
        assert_eq!(
            notice,
            SessionNotice::Delivered {
                preview: "hello".to_string(),
                drafted: true,
            }
        );
    }
}

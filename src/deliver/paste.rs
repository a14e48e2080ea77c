//! Paste delivery
//!
//! Copies text to the clipboard with wl-copy, then simulates Ctrl+V
//! with ydotool so the text lands in the focused application directly.
//! Avoids direct typing, which breaks on non-US keyboard layouts.
//!
//! Requires:
//! - wl-copy installed (for clipboard access)
//! - ydotool installed (for Ctrl+V simulation)
//! - ydotoold daemon running (systemctl --user start ydotool)

use super::clipboard::{binary_available, copy_to_clipboard};
use super::DeliverySink;
use crate::error::DeliveryError;
use std::process::Stdio;
use tokio::process::Command;

/// Paste delivery sink (clipboard + Ctrl+V)
pub struct PasteSink;

impl PasteSink {
    /// Create a new paste sink
    pub fn new() -> Self {
        Self
    }

    /// Simulate Ctrl+V using ydotool.
    /// 29 = KEY_LEFTCTRL, 47 = KEY_V; code:1 is press, code:0 is release.
    async fn simulate_ctrl_v(&self) -> Result<(), DeliveryError> {
        let output = Command::new("ydotool")
            .args(["key", "29:1", "47:1", "47:0", "29:0"])
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DeliveryError::YdotoolNotFound
                } else {
                    DeliveryError::PasteFailed(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);

            if stderr.contains("socket") || stderr.contains("connect") || stderr.contains("daemon")
            {
                return Err(DeliveryError::YdotoolNotRunning);
            }

            return Err(DeliveryError::PasteFailed(stderr.to_string()));
        }

        Ok(())
    }
}

impl Default for PasteSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DeliverySink for PasteSink {
    async fn deliver(&self, text: &str) -> Result<(), DeliveryError> {
        if text.is_empty() {
            return Ok(());
        }

        copy_to_clipboard(text).await?;

        // Give the compositor a moment to register the clipboard owner
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        self.simulate_ctrl_v().await?;

        tracing::info!(
            "Text pasted via clipboard + Ctrl+V ({} chars)",
            text.chars().count()
        );
        Ok(())
    }

    async fn is_available(&self) -> bool {
        if !binary_available("wl-copy").await {
            return false;
        }

        if !binary_available("ydotool").await {
            return false;
        }

        // A no-op type checks that ydotoold is actually reachable
        Command::new("ydotool")
            .args(["type", ""])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "paste (clipboard + Ctrl+V)"
    }
}

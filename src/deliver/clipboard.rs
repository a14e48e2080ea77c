//! Clipboard delivery
//!
//! Uses wl-copy to place text on the Wayland clipboard. The most
//! reliable sink, since it works on all Wayland compositors.
//!
//! Requires: wl-clipboard package installed

use super::DeliverySink;
use crate::error::DeliveryError;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Clipboard delivery sink
pub struct ClipboardSink;

impl ClipboardSink {
    /// Create a new clipboard sink
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClipboardSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Write text to the clipboard via wl-copy's stdin
pub(super) async fn copy_to_clipboard(text: &str) -> Result<(), DeliveryError> {
    let mut child = Command::new("wl-copy")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DeliveryError::WlCopyNotFound
            } else {
                DeliveryError::ClipboardFailed(e.to_string())
            }
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .await
            .map_err(|e| DeliveryError::ClipboardFailed(e.to_string()))?;

        // Close stdin to signal EOF
        drop(stdin);
    }

    let status = child
        .wait()
        .await
        .map_err(|e| DeliveryError::ClipboardFailed(e.to_string()))?;

    if !status.success() {
        return Err(DeliveryError::ClipboardFailed(
            "wl-copy exited with error".to_string(),
        ));
    }

    Ok(())
}

/// Check whether a binary exists on PATH
pub(super) async fn binary_available(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

#[async_trait::async_trait]
impl DeliverySink for ClipboardSink {
    async fn deliver(&self, text: &str) -> Result<(), DeliveryError> {
        if text.is_empty() {
            return Ok(());
        }

        copy_to_clipboard(text).await?;

        tracing::info!("Text copied to clipboard ({} chars)", text.chars().count());
        Ok(())
    }

    async fn is_available(&self) -> bool {
        binary_available("wl-copy").await
    }

    fn name(&self) -> &'static str {
        "clipboard (wl-copy)"
    }
}

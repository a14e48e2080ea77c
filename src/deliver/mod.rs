//! Text delivery module
//!
//! Hands finished text to the user via the clipboard, optionally
//! followed by a simulated paste.
//!
//! Fallback chain for `mode = "paste"`:
//! 1. paste - wl-copy then ydotool Ctrl+V (requires ydotoold daemon)
//! 2. clipboard - wl-copy only, user pastes manually
//!
//! `mode = "clipboard"` uses the clipboard sink alone.

pub mod clipboard;
pub mod paste;

use crate::config::{DeliveryConfig, DeliveryMode};
use crate::error::DeliveryError;

/// Trait for delivery sink implementations
#[async_trait::async_trait]
pub trait DeliverySink: Send + Sync {
    /// Deliver text to the user
    async fn deliver(&self, text: &str) -> Result<(), DeliveryError>;

    /// Check if this sink is usable right now
    async fn is_available(&self) -> bool;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Factory function that returns a fallback chain of delivery sinks
pub fn create_delivery_chain(config: &DeliveryConfig) -> Vec<Box<dyn DeliverySink>> {
    let mut chain: Vec<Box<dyn DeliverySink>> = Vec::new();

    match config.mode {
        DeliveryMode::Clipboard => {
            chain.push(Box::new(clipboard::ClipboardSink::new()));
        }
        DeliveryMode::Paste => {
            chain.push(Box::new(paste::PasteSink::new()));
            // Text still reaches the clipboard if the paste step is broken
            chain.push(Box::new(clipboard::ClipboardSink::new()));
        }
    }

    chain
}

/// Try each sink in the chain until one succeeds
pub async fn deliver_with_fallback(
    chain: &[Box<dyn DeliverySink>],
    text: &str,
) -> Result<&'static str, DeliveryError> {
    for sink in chain {
        if !sink.is_available().await {
            tracing::debug!("{} not available, trying next", sink.name());
            continue;
        }

        match sink.deliver(text).await {
            Ok(()) => {
                tracing::debug!("Text delivered via {}", sink.name());
                return Ok(sink.name());
            }
            Err(e) => {
                tracing::warn!("{} failed: {}, trying next", sink.name(), e);
            }
        }
    }

    Err(DeliveryError::AllMethodsFailed)
}

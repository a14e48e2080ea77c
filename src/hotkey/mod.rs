//! Hotkey detection module
//!
//! Kernel-level key event detection using evdev, which works on all
//! Wayland compositors because it operates at the Linux input subsystem
//! level. Requires the user to be in the 'input' group.
//!
//! On other platforms, use compositor keybindings with the
//! `dicta record start/stop` commands instead.

#[cfg(target_os = "linux")]
pub mod evdev_listener;

use crate::config::HotkeyConfig;
use crate::error::HotkeyError;
use tokio::sync::mpsc;

/// Events emitted by the hotkey listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// The start hotkey was pressed
    Pressed,
    /// The start hotkey was released
    Released,
    /// The dedicated stop key was pressed
    StopPressed,
    /// The cancel key was pressed (abort the active session)
    CancelPressed,
}

/// Trait for hotkey detection implementations
#[async_trait::async_trait]
pub trait HotkeyListener: Send + Sync {
    /// Start listening for hotkey events
    /// Returns a channel receiver for events
    async fn start(&mut self) -> Result<mpsc::Receiver<HotkeyEvent>, HotkeyError>;

    /// Stop listening and clean up
    async fn stop(&mut self) -> Result<(), HotkeyError>;
}

/// Factory function to create the appropriate hotkey listener
#[cfg(target_os = "linux")]
pub fn create_listener(config: &HotkeyConfig) -> Result<Box<dyn HotkeyListener>, HotkeyError> {
    Ok(Box::new(evdev_listener::EvdevListener::new(config)?))
}

/// Factory function to create the appropriate hotkey listener
///
/// Built-in hotkey detection only exists on Linux. Elsewhere, bind
/// `dicta record start/stop` to compositor or OS shortcuts.
#[cfg(not(target_os = "linux"))]
pub fn create_listener(_config: &HotkeyConfig) -> Result<Box<dyn HotkeyListener>, HotkeyError> {
    Err(HotkeyError::NotSupported(
        "Built-in hotkey detection is only supported on Linux. \
         Bind 'dicta record start/stop' to a system shortcut instead."
            .to_string(),
    ))
}

//! Dicta: hotkey dictation with local speech-to-text and AI drafting
//!
//! This library provides the core functionality for:
//! - Detecting hotkey presses via evdev (kernel-level, works on all compositors)
//! - Capturing audio via cpal (supports PipeWire, PulseAudio, ALSA)
//! - Transcribing speech using whisper.cpp (fast, local, offline)
//! - Optionally rewriting the spoken intent into a polished message via Ollama
//! - Delivering the final text to the clipboard (wl-copy), optionally pasting
//!
//! # Architecture
//!
//! ```text
//!                  ┌─────────────────────────────────────┐
//!                  │            Orchestrator             │
//!                  │  Idle / Recording / Processing /    │
//!                  │           Delivering                │
//!                  └─────────────────────────────────────┘
//!                                   │
//!          ┌────────────────────────┼────────────────────────┐
//!          ▼                        ▼                        ▼
//! ┌──────────────┐         ┌──────────────┐         ┌──────────────┐
//! │    Hotkey    │         │    Audio     │         │   Session    │
//! │   (evdev)    │         │    (cpal)    │         │    State     │
//! └──────────────┘         └──────────────┘         └──────────────┘
//!          │ press/release          │ sample chunks
//!          ▼                        ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  [Press] ──▶ Record into buffer ──▶ [Release] ──▶ Close buffer  │
//! └─────────────────────────────────────────────────────────────────┘
//!                                   │
//!                                   ▼
//!                          ┌──────────────┐
//!                          │   Whisper    │  transcription gateway
//!                          │ (whisper-rs) │  (text + detected language)
//!                          └──────────────┘
//!                                   │
//!                   transcription   │   drafting mode only
//!                   mode            ▼
//!                          ┌──────────────┐
//!                          │    Ollama    │  drafting gateway
//!                          │    (ureq)    │  (falls back to verbatim)
//!                          └──────────────┘
//!                                   │
//!                                   ▼
//!                          ┌──────────────┐
//!                          │   Delivery   │
//!                          │ wl-copy / +  │
//!                          │   Ctrl+V     │
//!                          └──────────────┘
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod deliver;
pub mod draft;
pub mod error;
pub mod history;
pub mod hotkey;
pub mod mode;
pub mod notify;
pub mod orchestrator;
pub mod pipeline;
pub mod session;
pub mod text;
pub mod transcribe;

pub use cli::{Cli, Commands, RecordAction};
pub use config::Config;
pub use error::{DictaError, Result};
pub use orchestrator::Orchestrator;

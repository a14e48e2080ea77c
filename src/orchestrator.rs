//! Orchestrator - main event loop
//!
//! Coordinates the hotkey listener, audio capture, gateways, and
//! delivery sinks around the session state machine. All state
//! transitions happen here, in one task; gateway work runs on blocking
//! tasks that report back through their join handles.

use crate::audio::{self, AudioBuffer, AudioCapture};
use crate::config::{ActivationMode, Config};
use crate::deliver::{self, DeliverySink};
use crate::draft::{self, Drafter};
use crate::error::{DictaError, GatewayError, Result};
use crate::history::History;
use crate::hotkey::{self, HotkeyEvent};
use crate::mode::{Language, Mode};
use crate::notify::{self, SessionNotice};
use crate::pipeline::{self, SessionOutput};
use crate::session::{Session, SessionOutcome, SessionState};
use crate::transcribe::{self, Transcriber};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Write state to file for external integrations (e.g., Waybar)
fn write_state_file(path: &PathBuf, state: &str) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create state file directory: {}", e);
            return;
        }
    }

    if let Err(e) = std::fs::write(path, state) {
        tracing::warn!("Failed to write state file: {}", e);
    } else {
        tracing::trace!("State file updated: {}", state);
    }
}

/// Remove state file on shutdown
fn cleanup_state_file(path: &PathBuf) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove state file: {}", e);
        }
    }
}

/// Write PID file for external control via signals
fn write_pid_file() -> Option<PathBuf> {
    let pid_path = Config::runtime_dir().join("pid");

    if let Some(parent) = pid_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create PID file directory: {}", e);
            return None;
        }
    }

    let pid = std::process::id();
    if let Err(e) = std::fs::write(&pid_path, pid.to_string()) {
        tracing::warn!("Failed to write PID file: {}", e);
        return None;
    }

    tracing::debug!("PID file written: {:?} (pid={})", pid_path, pid);
    Some(pid_path)
}

/// Remove PID file on shutdown
fn cleanup_pid_file(path: &PathBuf) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove PID file: {}", e);
        }
    }
}

/// How long the control loop waits for the capture thread to flush its
/// last chunks after stop. A wedged thread must not park the loop.
const CHUNK_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Drain remaining chunks into the buffer until the channel closes or
/// the time limit passes. Returns false when the drain was cut short.
async fn drain_chunks(
    rx: &mut mpsc::Receiver<Vec<f32>>,
    buffer: &mut AudioBuffer,
    limit: Duration,
) -> bool {
    let drain = async {
        while let Some(chunk) = rx.recv().await {
            buffer.push(&chunk);
        }
    };
    tokio::time::timeout(limit, drain).await.is_ok()
}

/// In-flight processing task for one session
struct ProcessingTask {
    session_id: u64,
    handle: JoinHandle<std::result::Result<Option<SessionOutput>, GatewayError>>,
}

/// Main orchestrator that coordinates all components
pub struct Orchestrator {
    config: Config,
    state_file_path: Option<PathBuf>,
    pid_file_path: Option<PathBuf>,
    /// Monotonic session id source
    next_session_id: u64,
    /// Language of the last delivered session, used when detection is
    /// inconclusive
    last_language: Option<Language>,
    /// Persisted record of delivered texts, if enabled
    history: Option<History>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given configuration
    pub fn new(config: Config) -> Self {
        let state_file_path = config.resolve_state_file();
        let history = if config.history.enabled {
            Some(History::load(
                config.history_file(),
                config.history.max_entries,
            ))
        } else {
            None
        };

        Self {
            config,
            state_file_path,
            pid_file_path: None,
            next_session_id: 0,
            last_language: None,
            history,
        }
    }

    /// Update the state file if configured
    fn update_state(&self, state_name: &str) {
        if let Some(ref path) = self.state_file_path {
            write_state_file(path, state_name);
        }
    }

    fn allocate_session_id(&mut self) -> u64 {
        self.next_session_id += 1;
        self.next_session_id
    }

    /// Start a new session: spin up audio capture and enter Recording.
    /// A start request in any state but Idle is ignored.
    async fn start_session(
        &mut self,
        state: &mut SessionState,
        audio_capture: &mut Option<Box<dyn AudioCapture>>,
        chunk_rx: &mut Option<mpsc::Receiver<Vec<f32>>>,
        drafting_available: bool,
    ) {
        if !state.is_idle() {
            tracing::debug!("Start request ignored, current state: {}", state);
            return;
        }

        let mut snapshot = self.config.snapshot();
        if snapshot.mode == Mode::Drafting && !drafting_available {
            tracing::warn!("Drafting backend unavailable, session runs in transcription mode");
            snapshot.mode = Mode::Transcription;
        }

        let id = self.allocate_session_id();

        match audio::create_capture(&self.config.audio) {
            Ok(mut capture) => match capture.start().await {
                Ok(rx) => {
                    *chunk_rx = Some(rx);
                    *audio_capture = Some(capture);
                    *state = SessionState::Recording(Session::new(
                        id,
                        snapshot,
                        self.config.audio.max_duration_secs,
                    ));
                    self.update_state("recording");
                    tracing::info!("Recording started (session #{})", id);

                    notify::notify_session(
                        &self.config.delivery.notification,
                        &SessionNotice::RecordingStarted,
                    )
                    .await;
                }
                Err(e) => {
                    tracing::error!("Failed to start audio: {}", e);
                }
            },
            Err(e) => {
                tracing::error!("Failed to create audio capture: {}", e);
            }
        }
    }

    /// Stop recording and hand the buffer to the gateways.
    ///
    /// Sessions under the minimum duration are quietly discarded.
    async fn stop_session(
        &mut self,
        state: &mut SessionState,
        audio_capture: &mut Option<Box<dyn AudioCapture>>,
        chunk_rx: &mut Option<mpsc::Receiver<Vec<f32>>>,
        processing: &mut Option<ProcessingTask>,
        transcriber: &Arc<Box<dyn Transcriber>>,
        drafter: &Option<Arc<Box<dyn Drafter>>>,
    ) {
        if !state.is_recording() {
            tracing::debug!("Stop request ignored, current state: {}", state);
            return;
        }

        let duration = state.recording_duration().unwrap_or_default();
        tracing::info!("Recording stopped ({:.1}s)", duration.as_secs_f32());

        if let Some(mut capture) = audio_capture.take() {
            if let Err(e) = capture.stop().await {
                tracing::warn!("Audio stop error: {}", e);
            }
        }

        let mut session = match std::mem::take(state) {
            SessionState::Recording(session) => session,
            other => {
                *state = other;
                return;
            }
        };

        // Drain chunks flushed by the capture shutdown; the channel
        // closes once the capture thread drops its sender
        if let Some(mut rx) = chunk_rx.take() {
            if !drain_chunks(&mut rx, &mut session.buffer, CHUNK_DRAIN_TIMEOUT).await {
                tracing::warn!("Timed out draining audio chunks, processing what was captured");
            }
        }

        // Freeze the buffer before any gateway sees it
        session.buffer.close();

        if !session.has_enough_audio() {
            tracing::debug!(
                "Recording too short ({:.2}s), ignoring",
                session.buffer.duration_secs()
            );
            self.finish_session(state, SessionOutcome::Discarded);
            return;
        }

        tracing::info!(
            "Processing {:.1}s of audio (session #{})",
            session.buffer.duration_secs(),
            session.id
        );

        let id = session.id;
        let snapshot = session.snapshot.clone();
        let samples = session.buffer.into_samples();
        let last_language = self.last_language;
        let transcriber = Arc::clone(transcriber);
        let drafter = drafter.clone();

        let handle = tokio::task::spawn_blocking(move || {
            pipeline::produce_text(
                &samples,
                &snapshot,
                transcriber.as_ref().as_ref(),
                drafter.as_deref().map(|d| d.as_ref()),
                last_language,
            )
        });

        *processing = Some(ProcessingTask {
            session_id: id,
            handle,
        });
        *state = SessionState::Processing {
            id,
            started_at: std::time::Instant::now(),
        };
        self.update_state("processing");
    }

    /// Cancel whatever is in flight without delivering anything.
    ///
    /// Recording: the buffer is dropped. Processing: the task handle is
    /// dropped and its eventual result discarded. Idle: no-op.
    async fn cancel_session(
        &mut self,
        state: &mut SessionState,
        audio_capture: &mut Option<Box<dyn AudioCapture>>,
        chunk_rx: &mut Option<mpsc::Receiver<Vec<f32>>>,
        processing: &mut Option<ProcessingTask>,
    ) {
        match state {
            SessionState::Idle => {
                tracing::debug!("Cancel request ignored, already idle");
            }
            SessionState::Recording(session) => {
                tracing::info!("Session #{} cancelled during recording", session.id);
                if let Some(mut capture) = audio_capture.take() {
                    let _ = capture.stop().await;
                }
                *chunk_rx = None;
                notify::notify_session(
                    &self.config.delivery.notification,
                    &SessionNotice::Cancelled,
                )
                .await;
                self.finish_session(state, SessionOutcome::Cancelled);
            }
            SessionState::Processing { id, .. } => {
                tracing::info!("Session #{} cancelled during processing", id);
                if let Some(task) = processing.take() {
                    // The blocking task may keep running to completion;
                    // aborting the handle guarantees its result is dropped
                    task.handle.abort();
                }
                notify::notify_session(
                    &self.config.delivery.notification,
                    &SessionNotice::Cancelled,
                )
                .await;
                self.finish_session(state, SessionOutcome::Cancelled);
            }
            SessionState::Delivering { id } => {
                // Delivery is a quick, committed step; too late to cancel
                tracing::debug!("Cancel request ignored, session #{} is delivering", id);
            }
        }
    }

    /// Deliver gateway output, then return to idle
    async fn deliver_output(
        &mut self,
        state: &mut SessionState,
        session_id: u64,
        output: SessionOutput,
        delivery_chain: &[Box<dyn DeliverySink>],
    ) {
        *state = SessionState::Delivering { id: session_id };
        self.update_state("delivering");

        match deliver::deliver_with_fallback(delivery_chain, &output.text).await {
            Ok(sink_name) => {
                tracing::info!(
                    "Session #{} delivered via {} ({} chars, language: {})",
                    session_id,
                    sink_name,
                    output.text.chars().count(),
                    output.language
                );

                self.last_language = Some(output.language);

                if let Some(history) = self.history.as_mut() {
                    let mode = if output.drafted {
                        Mode::Drafting
                    } else {
                        Mode::Transcription
                    };
                    if let Err(e) = history.record(&output.text, output.language, mode) {
                        tracing::warn!("Failed to record delivery history: {}", e);
                    }
                }

                let notice = if output.draft_fallback {
                    SessionNotice::draft_fallback(&output.text)
                } else {
                    SessionNotice::delivered(&output.text, output.drafted)
                };
                notify::notify_session(&self.config.delivery.notification, &notice).await;

                self.finish_session(
                    state,
                    SessionOutcome::Delivered {
                        language: output.language,
                    },
                );
            }
            Err(e) => {
                tracing::error!("Session #{} delivery failed: {}", session_id, e);
                notify::notify_session(
                    &self.config.delivery.notification,
                    &SessionNotice::Failed {
                        reason: e.to_string(),
                    },
                )
                .await;
                self.finish_session(
                    state,
                    SessionOutcome::Failed {
                        reason: e.to_string(),
                    },
                );
            }
        }
    }

    /// Record the outcome and return to idle
    fn finish_session(&mut self, state: &mut SessionState, outcome: SessionOutcome) {
        tracing::debug!("Session finished: {:?}", outcome);
        *state = SessionState::Idle;
        self.update_state("idle");
    }

    /// Run the orchestrator main loop
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Starting dicta daemon");

        // PID file enables external control via signals
        self.pid_file_path = write_pid_file();

        let mut sigusr1 = signal(SignalKind::user_defined1())
            .map_err(|e| DictaError::Config(format!("Failed to set up SIGUSR1 handler: {}", e)))?;
        let mut sigusr2 = signal(SignalKind::user_defined2())
            .map_err(|e| DictaError::Config(format!("Failed to set up SIGUSR2 handler: {}", e)))?;
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| DictaError::Config(format!("Failed to set up SIGTERM handler: {}", e)))?;

        if let Some(ref path) = self.state_file_path {
            tracing::info!("State file: {:?}", path);
        }

        // Hotkey listener (if enabled)
        let mut hotkey_listener = if self.config.hotkey.enabled {
            tracing::info!("Hotkey: {}", self.config.hotkey.key);
            Some(hotkey::create_listener(&self.config.hotkey)?)
        } else {
            tracing::info!(
                "Built-in hotkey disabled, use 'dicta record' commands or compositor keybindings"
            );
            None
        };

        // Delivery chain
        let delivery_chain = deliver::create_delivery_chain(&self.config.delivery);
        tracing::debug!(
            "Delivery chain: {}",
            delivery_chain
                .iter()
                .map(|s| s.name())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        // Transcription gateway: load the model up front so the first
        // session doesn't pay the cost
        tracing::info!("Loading transcription model: {}", self.config.model.name);
        let transcriber: Arc<Box<dyn Transcriber>> =
            Arc::new(transcribe::create_transcriber(&self.config.model)?);
        tracing::info!("Model loaded, ready for voice input");

        // Drafting gateway, probed once at startup. An unreachable
        // backend degrades new sessions to transcription mode; per-session
        // fallback covers failures after a successful probe.
        let mut drafting_available = false;
        let drafter: Option<Arc<Box<dyn Drafter>>> = if self.config.generation.enabled {
            let drafter = draft::create_drafter(&self.config.generation)?;
            if drafter.is_available() {
                tracing::info!(
                    "Drafting enabled ({} via {})",
                    self.config.generation.model,
                    drafter.name()
                );
                drafting_available = true;
            } else {
                tracing::warn!(
                    "Drafting backend at {} unreachable, sessions will deliver verbatim transcripts",
                    self.config.generation.url
                );
                notify::send(
                    "Drafting unavailable",
                    "Ollama is not reachable; dictation continues in transcription mode",
                )
                .await;
            }
            Some(Arc::new(drafter))
        } else {
            None
        };

        let mut hotkey_rx = if let Some(ref mut listener) = hotkey_listener {
            Some(listener.start().await?)
        } else {
            None
        };

        let mut state = SessionState::Idle;
        let mut audio_capture: Option<Box<dyn AudioCapture>> = None;
        let mut chunk_rx: Option<mpsc::Receiver<Vec<f32>>> = None;
        let mut processing: Option<ProcessingTask> = None;

        let max_duration = Duration::from_secs(self.config.audio.max_duration_secs as u64);
        let activation_mode = self.config.hotkey.mode;

        if self.config.hotkey.enabled {
            let mode_desc = match activation_mode {
                ActivationMode::PushToTalk => "hold to record, release to process",
                ActivationMode::Toggle => "press to start/stop recording",
            };
            tracing::info!(
                "Listening for hotkey: {} ({})",
                self.config.hotkey.key,
                mode_desc
            );
        }

        self.update_state("idle");

        loop {
            tokio::select! {
                // Hotkey events (only if the listener is enabled)
                Some(hotkey_event) = async {
                    match &mut hotkey_rx {
                        Some(rx) => rx.recv().await,
                        None => std::future::pending().await,
                    }
                } => {
                    match (hotkey_event, activation_mode) {
                        (HotkeyEvent::Pressed, ActivationMode::PushToTalk) => {
                            self.start_session(&mut state, &mut audio_capture, &mut chunk_rx, drafting_available).await;
                        }
                        (HotkeyEvent::Released, ActivationMode::PushToTalk) => {
                            self.stop_session(
                                &mut state,
                                &mut audio_capture,
                                &mut chunk_rx,
                                &mut processing,
                                &transcriber,
                                &drafter,
                            ).await;
                        }
                        (HotkeyEvent::Pressed, ActivationMode::Toggle) => {
                            if state.is_recording() {
                                self.stop_session(
                                    &mut state,
                                    &mut audio_capture,
                                    &mut chunk_rx,
                                    &mut processing,
                                    &transcriber,
                                    &drafter,
                                ).await;
                            } else {
                                self.start_session(&mut state, &mut audio_capture, &mut chunk_rx, drafting_available).await;
                            }
                        }
                        (HotkeyEvent::Released, ActivationMode::Toggle) => {
                            tracing::trace!("Ignoring release in toggle mode");
                        }
                        (HotkeyEvent::StopPressed, _) => {
                            self.stop_session(
                                &mut state,
                                &mut audio_capture,
                                &mut chunk_rx,
                                &mut processing,
                                &transcriber,
                                &drafter,
                            ).await;
                        }
                        (HotkeyEvent::CancelPressed, _) => {
                            self.cancel_session(
                                &mut state,
                                &mut audio_capture,
                                &mut chunk_rx,
                                &mut processing,
                            ).await;
                        }
                    }
                }

                // Audio chunks stream into the active session's buffer
                chunk = async {
                    match &mut chunk_rx {
                        Some(rx) => rx.recv().await,
                        None => std::future::pending().await,
                    }
                } => {
                    match chunk {
                        Some(chunk) => {
                            if let SessionState::Recording(session) = &mut state {
                                session.buffer.push(&chunk);
                            }
                        }
                        None => {
                            // Capture thread went away
                            chunk_rx = None;
                        }
                    }
                }

                // Gateway task finished
                result = async {
                    match &mut processing {
                        Some(task) => (&mut task.handle).await,
                        None => std::future::pending().await,
                    }
                } => {
                    let session_id = processing
                        .take()
                        .map(|t| t.session_id)
                        .unwrap_or_default();

                    match result {
                        Ok(Ok(Some(output))) => {
                            self.deliver_output(&mut state, session_id, output, &delivery_chain).await;
                        }
                        Ok(Ok(None)) => {
                            tracing::debug!("Session #{} produced no text, discarding", session_id);
                            self.finish_session(&mut state, SessionOutcome::Discarded);
                        }
                        Ok(Err(GatewayError::EmptyAudio)) => {
                            tracing::debug!("Session #{} had too little audio, discarding", session_id);
                            self.finish_session(&mut state, SessionOutcome::Discarded);
                        }
                        Ok(Err(e)) => {
                            tracing::error!("Session #{} failed: {}", session_id, e);
                            notify::notify_session(
                                &self.config.delivery.notification,
                                &SessionNotice::Failed { reason: e.to_string() },
                            ).await;
                            self.finish_session(
                                &mut state,
                                SessionOutcome::Failed { reason: e.to_string() },
                            );
                        }
                        Err(e) if e.is_cancelled() => {
                            tracing::debug!("Session #{} task aborted", session_id);
                        }
                        Err(e) => {
                            tracing::error!("Session #{} task panicked: {}", session_id, e);
                            self.finish_session(
                                &mut state,
                                SessionOutcome::Failed { reason: e.to_string() },
                            );
                        }
                    }
                }

                // Recording timeout acts as a stop signal
                _ = tokio::time::sleep(Duration::from_millis(100)), if state.is_recording() => {
                    if let Some(duration) = state.recording_duration() {
                        if duration > max_duration {
                            tracing::warn!(
                                "Recording reached the {:.0}s limit, stopping",
                                max_duration.as_secs_f32()
                            );
                            self.stop_session(
                                &mut state,
                                &mut audio_capture,
                                &mut chunk_rx,
                                &mut processing,
                                &transcriber,
                                &drafter,
                            ).await;
                        }
                    }
                }

                // SIGUSR1 - start recording (for compositor keybindings)
                _ = sigusr1.recv() => {
                    tracing::debug!("Received SIGUSR1 (start recording)");
                    self.start_session(&mut state, &mut audio_capture, &mut chunk_rx, drafting_available).await;
                }

                // SIGUSR2 - stop recording (for compositor keybindings)
                _ = sigusr2.recv() => {
                    tracing::debug!("Received SIGUSR2 (stop recording)");
                    self.stop_session(
                        &mut state,
                        &mut audio_capture,
                        &mut chunk_rx,
                        &mut processing,
                        &transcriber,
                        &drafter,
                    ).await;
                }

                // Graceful shutdown (SIGINT from Ctrl+C)
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT, shutting down...");
                    break;
                }

                // Graceful shutdown (SIGTERM from systemctl stop)
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down...");
                    break;
                }
            }
        }

        // Cleanup
        if let Some(task) = processing.take() {
            task.handle.abort();
        }
        if let Some(mut capture) = audio_capture.take() {
            let _ = capture.stop().await;
        }
        if let Some(mut listener) = hotkey_listener {
            listener.stop().await?;
        }

        if let Some(ref path) = self.state_file_path {
            cleanup_state_file(path);
        }
        if let Some(ref path) = self.pid_file_path {
            cleanup_pid_file(path);
        }

        tracing::info!("Daemon stopped");

        Ok(())
    }
}

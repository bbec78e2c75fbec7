use std::sync::Arc;
use std::time::Duration;

use glimpse_config::{Config, Settings, SettingsState, SettingsUpdate};
use glimpse_types::{AppEvent, CaptureResult, SettingKey, WindowGeometry};
use kanal::{AsyncReceiver, AsyncSender};
use tokio::sync::watch;

use crate::backends::BackendFactory;
use crate::cache::{HistoryStore, TranslationCache};
use crate::error::CoreError;
use crate::events::EventSink;
use crate::live::LiveModeScheduler;
use crate::orchestrator::{CaptureOrchestrator, PromptPolicy, TriggerOutcome};
use crate::retranslate::{RetranslationOutcome, RetranslationSlot, RetranslationWorker};

/// Requests from the host UI
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    TriggerCapture,
    /// `None` uses the configured capture interval
    StartLiveMode {
        interval_ms: Option<u64>,
    },
    StopLiveMode,
    SetLiveInterval(u64),
    RequestRetranslation {
        target_language: String,
    },
    ApplySettings(SettingsUpdate),
    UpdateGeometry(WindowGeometry),
    RequestStop,
    ClearHistory,
    Shutdown,
}

/// Everything the control task receives
#[derive(Debug)]
pub enum ControlMessage {
    Ui(UiCommand),
    CaptureFinished {
        cycle_id: u64,
        result: CaptureResult,
    },
    RetranslationFinished {
        request_id: u64,
        outcome: RetranslationOutcome,
    },
    LiveTick {
        generation: u64,
    },
}

/// Cloneable handle the host uses to drive a running session
#[derive(Clone)]
pub struct SessionHandle {
    tx: AsyncSender<ControlMessage>,
    last_text: watch::Receiver<String>,
}

impl SessionHandle {
    pub async fn send(&self, command: UiCommand) -> Result<(), CoreError> {
        self.tx
            .send(ControlMessage::Ui(command))
            .await
            .map_err(|_| CoreError::ChannelClosed)
    }

    /// Non-async variant for callers on blocking threads (e.g. hotkey polling)
    pub fn try_send(&self, command: UiCommand) -> Result<bool, CoreError> {
        self.tx
            .try_send(ControlMessage::Ui(command))
            .map_err(|_| CoreError::ChannelClosed)
    }

    pub async fn trigger_capture(&self) -> Result<(), CoreError> {
        self.send(UiCommand::TriggerCapture).await
    }

    pub async fn start_live_mode(&self, interval_ms: Option<u64>) -> Result<(), CoreError> {
        self.send(UiCommand::StartLiveMode { interval_ms }).await
    }

    pub async fn stop_live_mode(&self) -> Result<(), CoreError> {
        self.send(UiCommand::StopLiveMode).await
    }

    pub async fn request_retranslation(
        &self,
        target_language: impl Into<String>,
    ) -> Result<(), CoreError> {
        self.send(UiCommand::RequestRetranslation {
            target_language: target_language.into(),
        })
        .await
    }

    pub async fn apply_settings(&self, update: SettingsUpdate) -> Result<(), CoreError> {
        self.send(UiCommand::ApplySettings(update)).await
    }

    pub async fn shutdown(&self) -> Result<(), CoreError> {
        self.send(UiCommand::Shutdown).await
    }

    pub fn last_recognized_text(&self) -> String {
        self.last_text.borrow().clone()
    }
}

/// Owns the orchestration state and runs the control loop
pub struct Session {
    settings: SettingsState,
    geometry: WindowGeometry,
    orchestrator: CaptureOrchestrator,
    live: LiveModeScheduler,
    retranslation: RetranslationSlot,
    history: Arc<dyn HistoryStore>,
    events: EventSink,
    control_tx: AsyncSender<ControlMessage>,
    control_rx: AsyncReceiver<ControlMessage>,
    stop_timeout: Duration,
}

impl Session {
    /// Build a session, restoring history from `history`.
    ///
    /// Returns the session, a handle for the host and the UI event receiver.
    pub fn new(
        config: &Config,
        settings: SettingsState,
        geometry: WindowGeometry,
        backends: Arc<dyn BackendFactory>,
        history: Arc<dyn HistoryStore>,
    ) -> (Self, SessionHandle, AsyncReceiver<AppEvent>) {
        let (control_tx, control_rx) = kanal::bounded_async(config.channel_capacity);
        let (event_tx, event_rx) = kanal::bounded_async(config.channel_capacity);
        let events = EventSink::new(event_tx);

        let entries = history.load().unwrap_or_else(|e| {
            tracing::error!("[SESSION] Failed to load history: {e}");
            Vec::new()
        });
        let cache = TranslationCache::with_entries(config.history_limit, entries);
        tracing::info!("[SESSION] Restored {} history entries", cache.len());

        let orchestrator = CaptureOrchestrator::new(
            cache,
            backends.clone(),
            events.clone(),
            control_tx.clone(),
        );
        let live = LiveModeScheduler::new(control_tx.clone(), events.clone());
        let retranslation = RetranslationSlot::new(RetranslationWorker::new(backends));

        let handle = SessionHandle {
            tx: control_tx.clone(),
            last_text: orchestrator.subscribe_last_text(),
        };

        let session = Self {
            settings,
            geometry,
            orchestrator,
            live,
            retranslation,
            history,
            events,
            control_tx,
            control_rx,
            stop_timeout: Duration::from_millis(config.worker_stop_timeout_ms),
        };

        (session, handle, event_rx)
    }

    /// Run until `Shutdown`, then stop workers and save history.
    ///
    /// Returns the final settings so the host can persist them. A failed
    /// history save is logged and does not hold the settings back.
    pub async fn run(mut self) -> Settings {
        tracing::info!("[SESSION] Control loop started");
        self.orchestrator
            .check_prerequisites(&self.settings, PromptPolicy::Silent);

        loop {
            let Ok(message) = self.control_rx.recv().await else {
                tracing::warn!("[SESSION] Control channel closed");
                break;
            };

            match message {
                ControlMessage::Ui(UiCommand::Shutdown) => {
                    tracing::info!("[SESSION] Shutdown requested");
                    break;
                }
                ControlMessage::Ui(command) => self.handle_command(command),
                ControlMessage::CaptureFinished { cycle_id, result } => {
                    self.orchestrator.on_capture_finished(cycle_id, result);
                }
                ControlMessage::RetranslationFinished {
                    request_id,
                    outcome,
                } => self.on_retranslation_finished(request_id, outcome),
                ControlMessage::LiveTick { generation } => self.on_live_tick(generation),
            }
        }

        self.shutdown().await
    }

    fn handle_command(&mut self, command: UiCommand) {
        tracing::debug!("[SESSION] Command: {:?}", std::mem::discriminant(&command));
        match command {
            UiCommand::TriggerCapture => {
                self.orchestrator
                    .trigger_capture(&self.settings, &self.geometry);
            }
            UiCommand::StartLiveMode { interval_ms } => self.start_live(interval_ms),
            UiCommand::StopLiveMode => self.stop_live(),
            UiCommand::SetLiveInterval(interval_ms) => {
                self.apply_settings(SettingsUpdate {
                    capture_interval_ms: Some(interval_ms),
                    ..Default::default()
                });
            }
            UiCommand::RequestRetranslation { target_language } => {
                self.request_retranslation(target_language);
            }
            UiCommand::ApplySettings(mut update) => {
                // The live flag follows the scheduler, never the other way round
                let live = update.live_mode.take();
                self.apply_settings(update);
                match live {
                    Some(true) => self.start_live(None),
                    Some(false) => self.stop_live(),
                    None => {}
                }
            }
            UiCommand::UpdateGeometry(geometry) => self.geometry = geometry,
            UiCommand::RequestStop => self.orchestrator.request_stop(),
            UiCommand::ClearHistory => self.clear_history(),
            UiCommand::Shutdown => {}
        }
    }

    fn apply_settings(&mut self, update: SettingsUpdate) {
        let changed = self.settings.apply_changes(update);
        if changed.is_empty() {
            return;
        }
        if changed.contains(&SettingKey::CaptureIntervalMs) {
            self.live
                .set_interval(self.settings.settings().capture_interval_ms);
        }
        self.events.emit(AppEvent::SettingsChanged(changed));
    }

    fn start_live(&mut self, interval_ms: Option<u64>) {
        let interval_ms = interval_ms.unwrap_or(self.settings.settings().capture_interval_ms);
        if self
            .live
            .start(interval_ms, &self.settings, &self.orchestrator)
        {
            self.set_live_flag(true);
        }
    }

    fn stop_live(&mut self) {
        self.live.stop();
        self.set_live_flag(false);
    }

    fn set_live_flag(&mut self, running: bool) {
        self.settings.apply_changes(SettingsUpdate {
            live_mode: Some(running),
            ..Default::default()
        });
    }

    fn on_live_tick(&mut self, generation: u64) {
        if !self.live.accept_tick(generation) {
            tracing::debug!("[LIVE] Ignoring stale tick {generation}");
            return;
        }
        match self
            .orchestrator
            .trigger_capture(&self.settings, &self.geometry)
        {
            TriggerOutcome::PrerequisitesMissing(_) => {
                tracing::warn!("[LIVE] Prerequisites lost, stopping live mode");
                self.stop_live();
            }
            TriggerOutcome::AlreadyRunning => {
                tracing::debug!("[LIVE] Previous capture still running, skipping tick");
            }
            _ => {}
        }
    }

    fn request_retranslation(&mut self, target_language: String) {
        let text = self.orchestrator.last_recognized_text();
        let engine = self.settings.engine_config();
        match self
            .retranslation
            .request(text, target_language, engine, &self.control_tx)
        {
            Ok(request_id) => tracing::debug!("[RETRANSLATE] Request {request_id} started"),
            Err(refused) => {
                tracing::warn!("[RETRANSLATE] Refused: {refused}");
                self.events.emit(AppEvent::RetranslationFailed {
                    message: refused.to_string(),
                });
            }
        }
    }

    fn on_retranslation_finished(&mut self, request_id: u64, outcome: RetranslationOutcome) {
        if !self.retranslation.finish(request_id) {
            tracing::debug!("[RETRANSLATE] Discarding unknown request {request_id}");
            return;
        }
        match outcome.result {
            Ok(translated_text) => self.events.emit(AppEvent::RetranslationCompleted {
                source_text: outcome.source_text,
                translated_text,
                target_language: outcome.target_language,
            }),
            Err(message) => {
                tracing::error!("[RETRANSLATE] {message}");
                self.events
                    .emit(AppEvent::RetranslationFailed { message });
            }
        }
    }

    fn clear_history(&mut self) {
        self.orchestrator.clear_history();
        if let Err(e) = self.history.save(&[]) {
            tracing::error!("[SESSION] Failed to clear saved history: {e}");
        }
        tracing::info!("[SESSION] History cleared");
        self.events.emit(AppEvent::HistoryCleared);
    }

    async fn shutdown(mut self) -> Settings {
        self.live.stop();
        self.retranslation.abort();
        self.orchestrator.shutdown(self.stop_timeout).await;

        let entries = self.orchestrator.cache().entries();
        match self.history.save(&entries) {
            Ok(()) => tracing::info!("[SESSION] Saved {} history entries", entries.len()),
            Err(e) => tracing::error!("[SESSION] Failed to save history: {e}"),
        }

        self.settings.settings().clone()
    }
}

use std::sync::Arc;
use std::time::Duration;

use glimpse_config::SettingsState;
use glimpse_types::{
    AppEvent, CaptureFailure, CaptureResult, CaptureSuccess, FailureKind, WindowGeometry,
};
use kanal::AsyncSender;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backends::BackendFactory;
use crate::cache::TranslationCache;
use crate::events::EventSink;
use crate::session::ControlMessage;
use crate::worker::{CaptureJob, run_capture_cycle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Running { cycle_id: u64 },
    /// Terminal; late worker results are discarded
    Closing,
}

/// Whether a failed prerequisite check is surfaced to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptPolicy {
    Silent,
    Notify,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started { cycle_id: u64 },
    /// A cycle is in flight. The request is dropped, not queued.
    AlreadyRunning,
    PrerequisitesMissing(Vec<String>),
    InvalidRegion,
    Closing,
}

struct InFlight {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Single entry point for capture requests.
///
/// Lives on the control task. Enforces at most one capture worker in flight
/// and applies worker results to the cache and last recognized text.
pub struct CaptureOrchestrator {
    state: OrchestratorState,
    next_cycle: u64,
    cache: TranslationCache,
    last_text: watch::Sender<String>,
    backends: Arc<dyn BackendFactory>,
    events: EventSink,
    completions: AsyncSender<ControlMessage>,
    in_flight: Option<InFlight>,
}

impl CaptureOrchestrator {
    pub fn new(
        cache: TranslationCache,
        backends: Arc<dyn BackendFactory>,
        events: EventSink,
        completions: AsyncSender<ControlMessage>,
    ) -> Self {
        let (last_text, _) = watch::channel(String::new());
        Self {
            state: OrchestratorState::Idle,
            next_cycle: 1,
            cache,
            last_text,
            backends,
            events,
            completions,
            in_flight: None,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, OrchestratorState::Running { .. })
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn clear_history(&mut self) {
        self.cache.clear();
    }

    /// Returns `true` when the selected provider and engine are ready,
    /// otherwise logs what is missing and, with `Notify`, tells the UI.
    pub fn check_prerequisites(&self, settings: &SettingsState, policy: PromptPolicy) -> bool {
        let missing = settings.missing_prerequisites();
        if missing.is_empty() {
            return true;
        }
        tracing::warn!("[ORCHESTRATOR] Prerequisites missing: {}", missing.join(", "));
        if policy == PromptPolicy::Notify {
            self.events.emit(AppEvent::PrerequisitesMissing { missing });
        }
        false
    }

    pub fn trigger_capture(
        &mut self,
        settings: &SettingsState,
        geometry: &WindowGeometry,
    ) -> TriggerOutcome {
        match self.state {
            OrchestratorState::Closing => {
                tracing::debug!("[ORCHESTRATOR] Closing, capture request ignored");
                return TriggerOutcome::Closing;
            }
            OrchestratorState::Running { cycle_id } => {
                tracing::warn!("[ORCHESTRATOR] Capture {cycle_id} already running");
                return TriggerOutcome::AlreadyRunning;
            }
            OrchestratorState::Idle => {}
        }

        if !self.check_prerequisites(settings, PromptPolicy::Notify) {
            tracing::warn!("[ORCHESTRATOR] Capture cancelled: prerequisite check failed");
            return TriggerOutcome::PrerequisitesMissing(settings.missing_prerequisites());
        }

        let region = geometry.capture_region();
        if !region.is_valid() {
            tracing::error!("[ORCHESTRATOR] Invalid capture region {region}");
            self.events.emit(AppEvent::CaptureFailed(CaptureFailure {
                kind: FailureKind::CaptureRegion,
                message: format!("Invalid capture dimensions: {region}"),
            }));
            return TriggerOutcome::InvalidRegion;
        }

        let cycle_id = self.next_cycle;
        self.next_cycle += 1;

        let job = CaptureJob {
            cycle_id,
            region,
            settings: settings.snapshot(),
            cache: self.cache.snapshot(),
        };

        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let backends = self.backends.clone();
            let cancel = cancel.clone();
            let completions = self.completions.clone();
            async move {
                let result = run_capture_cycle(job, backends, cancel).await;
                if completions
                    .send(ControlMessage::CaptureFinished { cycle_id, result })
                    .await
                    .is_err()
                {
                    tracing::debug!(">>> [WORKER] cycle {cycle_id}: control task gone");
                }
            }
        });

        self.in_flight = Some(InFlight { cancel, handle });
        self.state = OrchestratorState::Running { cycle_id };
        tracing::info!("[ORCHESTRATOR] Capture {cycle_id} started ({region})");
        self.events
            .emit(AppEvent::CaptureStateChanged { running: true });

        TriggerOutcome::Started { cycle_id }
    }

    /// Apply a worker result. Returns `false` when the result was discarded.
    pub fn on_capture_finished(&mut self, cycle_id: u64, result: CaptureResult) -> bool {
        match self.state {
            OrchestratorState::Closing => {
                tracing::debug!("[ORCHESTRATOR] Discarding late result of cycle {cycle_id}");
                return false;
            }
            OrchestratorState::Running { cycle_id: current } if current == cycle_id => {}
            _ => {
                tracing::warn!("[ORCHESTRATOR] Discarding result of unknown cycle {cycle_id}");
                return false;
            }
        }

        self.in_flight = None;
        self.state = OrchestratorState::Idle;

        match result {
            CaptureResult::Success(success) => {
                self.apply_success(&success);
                tracing::info!(
                    "[ORCHESTRATOR] Capture {cycle_id} completed ({} chars, cache hit: {})",
                    success.recognized_text.len(),
                    success.cache_hit
                );
                self.events.emit(AppEvent::CaptureCompleted(success));
            }
            CaptureResult::Failure(failure) => {
                tracing::error!("[ORCHESTRATOR] Capture {cycle_id} failed: {failure}");
                self.events.emit(AppEvent::CaptureFailed(failure));
            }
        }
        self.events
            .emit(AppEvent::CaptureStateChanged { running: false });
        true
    }

    fn apply_success(&mut self, success: &CaptureSuccess) {
        if success.recognized_text.is_empty() {
            tracing::debug!("[ORCHESTRATOR] Empty result, keeping previous last text");
            return;
        }
        self.cache
            .record(&success.recognized_text, &success.translated_text);
        self.last_text.send_replace(success.recognized_text.clone());
    }

    pub fn last_recognized_text(&self) -> String {
        self.last_text.borrow().clone()
    }

    /// Receiver that always sees the latest recognized text
    pub fn subscribe_last_text(&self) -> watch::Receiver<String> {
        self.last_text.subscribe()
    }

    /// Best-effort cooperative stop of the in-flight worker
    pub fn request_stop(&self) {
        if let Some(in_flight) = &self.in_flight {
            tracing::info!("[ORCHESTRATOR] Stop requested for running capture");
            in_flight.cancel.cancel();
        }
    }

    /// Enter `Closing`, stop the worker and wait up to `timeout` before detaching it
    pub async fn shutdown(&mut self, timeout: Duration) {
        self.state = OrchestratorState::Closing;
        let Some(in_flight) = self.in_flight.take() else {
            return;
        };

        in_flight.cancel.cancel();
        match tokio::time::timeout(timeout, in_flight.handle).await {
            Ok(Ok(())) => tracing::info!("[ORCHESTRATOR] Capture worker stopped"),
            Ok(Err(e)) => tracing::error!("[ORCHESTRATOR] Capture worker panicked: {e}"),
            Err(_) => tracing::warn!(
                "[ORCHESTRATOR] Capture worker did not stop within {timeout:?}, detaching"
            ),
        }
    }
}

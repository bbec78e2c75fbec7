use std::time::Duration;

use glimpse_config::SettingsState;
use glimpse_types::AppEvent;
use kanal::AsyncSender;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::events::EventSink;
use crate::orchestrator::{CaptureOrchestrator, PromptPolicy};
use crate::session::ControlMessage;

/// Shortest allowed live mode interval
pub const MIN_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveModeState {
    Stopped,
    Running { interval_ms: u64 },
}

/// Repeating capture timer.
///
/// The timer task only posts `LiveTick` messages to the control task; the tick
/// handler there decides whether to capture. Each (re)arm bumps a generation
/// counter so ticks from a disarmed timer are ignored.
pub struct LiveModeScheduler {
    state: LiveModeState,
    generation: u64,
    timer: Option<CancellationToken>,
    ticks: AsyncSender<ControlMessage>,
    events: EventSink,
}

impl LiveModeScheduler {
    pub fn new(ticks: AsyncSender<ControlMessage>, events: EventSink) -> Self {
        Self {
            state: LiveModeState::Stopped,
            generation: 0,
            timer: None,
            ticks,
            events,
        }
    }

    pub fn state(&self) -> LiveModeState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, LiveModeState::Running { .. })
    }

    /// Arm the timer. The first capture happens one interval after start.
    ///
    /// Returns `false` when prerequisites are unmet.
    pub fn start(
        &mut self,
        interval_ms: u64,
        settings: &SettingsState,
        orchestrator: &CaptureOrchestrator,
    ) -> bool {
        if self.is_running() {
            tracing::debug!("[LIVE] Start called but already active");
            return true;
        }

        if !orchestrator.check_prerequisites(settings, PromptPolicy::Notify) {
            tracing::warn!("[LIVE] Not starting: prerequisites missing");
            return false;
        }

        let interval_ms = clamp_interval(interval_ms);
        self.arm(interval_ms);
        self.state = LiveModeState::Running { interval_ms };
        tracing::info!("[LIVE] Started (Interval: {interval_ms} ms)");
        self.events.emit(AppEvent::LiveModeChanged { running: true });
        true
    }

    /// Disarm the timer. Does nothing when already stopped.
    pub fn stop(&mut self) {
        if !self.is_running() {
            tracing::debug!("[LIVE] Stop called but not active");
            return;
        }
        self.disarm();
        self.state = LiveModeState::Stopped;
        tracing::info!("[LIVE] Stopped");
        self.events.emit(AppEvent::LiveModeChanged { running: false });
    }

    /// Change the period. A running timer is re-armed without an extra tick.
    pub fn set_interval(&mut self, interval_ms: u64) {
        let LiveModeState::Running { interval_ms: current } = self.state else {
            return;
        };
        let interval_ms = clamp_interval(interval_ms);
        if interval_ms == current {
            return;
        }
        self.disarm();
        self.arm(interval_ms);
        self.state = LiveModeState::Running { interval_ms };
        tracing::info!("[LIVE] Interval changed to {interval_ms} ms");
    }

    /// Whether a tick from `generation` should trigger a capture
    pub fn accept_tick(&self, generation: u64) -> bool {
        self.is_running() && generation == self.generation
    }

    fn arm(&mut self, interval_ms: u64) {
        self.generation += 1;
        let generation = self.generation;
        let token = CancellationToken::new();
        let period = Duration::from_millis(interval_ms);

        tokio::spawn({
            let token = token.clone();
            let ticks = self.ticks.clone();
            async move {
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = interval.tick() => {
                            if ticks.send(ControlMessage::LiveTick { generation }).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                tracing::debug!("[LIVE] Timer {generation} exited");
            }
        });

        self.timer = Some(token);
    }

    fn disarm(&mut self) {
        if let Some(token) = self.timer.take() {
            token.cancel();
        }
        // Invalidate ticks already queued by the old timer
        self.generation += 1;
    }
}

impl Drop for LiveModeScheduler {
    fn drop(&mut self) {
        if let Some(token) = self.timer.take() {
            token.cancel();
        }
    }
}

pub fn clamp_interval(interval_ms: u64) -> u64 {
    interval_ms.max(MIN_INTERVAL_MS)
}

use glimpse_types::AppEvent;
use kanal::AsyncSender;

/// Outbound side of the UI channel.
///
/// Sends never block the control task; when the UI falls behind events are
/// dropped with a warning.
#[derive(Clone)]
pub struct EventSink {
    tx: AsyncSender<AppEvent>,
}

impl EventSink {
    pub fn new(tx: AsyncSender<AppEvent>) -> Self {
        Self { tx }
    }

    pub fn emit(&self, event: AppEvent) {
        match self.tx.try_send(event) {
            Ok(true) => {}
            Ok(false) => tracing::warn!("[EVENTS] UI channel full, event dropped"),
            Err(_) => tracing::debug!("[EVENTS] UI channel closed, event dropped"),
        }
    }
}

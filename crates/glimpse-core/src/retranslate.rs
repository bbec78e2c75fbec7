use std::sync::Arc;

use glimpse_config::EngineConfig;
use kanal::AsyncSender;
use tokio::task::JoinHandle;

use crate::backends::BackendFactory;
use crate::session::ControlMessage;

/// Re-translates text with a new target language. Never touches OCR or the cache.
#[derive(Clone)]
pub struct RetranslationWorker {
    backends: Arc<dyn BackendFactory>,
}

impl RetranslationWorker {
    pub fn new(backends: Arc<dyn BackendFactory>) -> Self {
        Self { backends }
    }

    /// The translated text, or `<engine> Error: <reason>` for the UI
    pub async fn run(
        &self,
        text: &str,
        target_language: &str,
        engine: &EngineConfig,
    ) -> Result<String, String> {
        let translator = self.backends.engine(engine);
        let engine_name = translator.kind().display_name();
        tracing::info!("[RETRANSLATE] {engine_name} -> '{target_language}'");
        translator
            .translate(text, target_language, None)
            .await
            .map(|t| t.text)
            .map_err(|e| format!("{engine_name} Error: {e}"))
    }
}

/// Finished re-translation as delivered to the control task
#[derive(Debug, Clone, PartialEq)]
pub struct RetranslationOutcome {
    pub source_text: String,
    pub target_language: String,
    pub result: Result<String, String>,
}

/// Why a re-translation request was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetranslationRefused {
    #[error("No text captured previously.")]
    NoText,

    #[error("Translation already in progress.")]
    InFlight,

    #[error("Target language cannot be empty.")]
    NoTargetLanguage,
}

/// Admits at most one re-translation at a time
pub struct RetranslationSlot {
    worker: RetranslationWorker,
    next_request: u64,
    in_flight: Option<(u64, JoinHandle<()>)>,
}

impl RetranslationSlot {
    pub fn new(worker: RetranslationWorker) -> Self {
        Self {
            worker,
            next_request: 1,
            in_flight: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Spawn a re-translation whose outcome is posted back to `completions`
    pub fn request(
        &mut self,
        text: String,
        target_language: String,
        engine: EngineConfig,
        completions: &AsyncSender<ControlMessage>,
    ) -> Result<u64, RetranslationRefused> {
        if text.is_empty() {
            return Err(RetranslationRefused::NoText);
        }
        if self.is_busy() {
            return Err(RetranslationRefused::InFlight);
        }
        if target_language.trim().is_empty() {
            return Err(RetranslationRefused::NoTargetLanguage);
        }

        let request_id = self.next_request;
        self.next_request += 1;

        let handle = tokio::spawn({
            let worker = self.worker.clone();
            let completions = completions.clone();
            async move {
                let result = worker.run(&text, &target_language, &engine).await;
                let outcome = RetranslationOutcome {
                    source_text: text,
                    target_language,
                    result,
                };
                if completions
                    .send(ControlMessage::RetranslationFinished {
                        request_id,
                        outcome,
                    })
                    .await
                    .is_err()
                {
                    tracing::debug!("[RETRANSLATE] Control task gone, request {request_id} dropped");
                }
            }
        });

        self.in_flight = Some((request_id, handle));
        Ok(request_id)
    }

    /// Release the slot. Returns `false` for an unknown request.
    pub fn finish(&mut self, request_id: u64) -> bool {
        match &self.in_flight {
            Some((id, _)) if *id == request_id => {
                self.in_flight = None;
                true
            }
            _ => false,
        }
    }

    /// Abort an in-flight request during shutdown
    pub fn abort(&mut self) {
        if let Some((id, handle)) = self.in_flight.take() {
            tracing::debug!("[RETRANSLATE] Aborting request {id}");
            handle.abort();
        }
    }
}

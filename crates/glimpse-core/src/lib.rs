pub mod backends;
pub mod cache;
pub mod error;
pub mod events;
pub mod live;
pub mod orchestrator;
pub mod retranslate;
pub mod session;
pub mod worker;

pub use backends::{BackendFactory, HttpBackends};
pub use cache::{CacheSnapshot, HistoryStore, MemoryHistoryStore, TranslationCache};
pub use error::CoreError;
pub use events::EventSink;
pub use live::{LiveModeScheduler, LiveModeState};
pub use orchestrator::{CaptureOrchestrator, OrchestratorState, PromptPolicy, TriggerOutcome};
pub use retranslate::{RetranslationRefused, RetranslationWorker};
pub use session::{ControlMessage, Session, SessionHandle, UiCommand};
pub use worker::{CaptureJob, run_capture_cycle};

#[cfg(test)]
mod tests;

use std::sync::Arc;

use glimpse_config::SettingsSnapshot;
use glimpse_ocr::encode_png;
use glimpse_types::{CaptureRegion, CaptureResult, CaptureSuccess, FailureKind};
use tokio_util::sync::CancellationToken;

use crate::backends::BackendFactory;
use crate::cache::CacheSnapshot;

/// Everything one capture cycle needs, frozen at dispatch
#[derive(Debug, Clone)]
pub struct CaptureJob {
    pub cycle_id: u64,
    pub region: CaptureRegion,
    pub settings: SettingsSnapshot,
    pub cache: CacheSnapshot,
}

/// One capture → OCR → cache lookup or translate cycle.
///
/// Translation errors are reported in-band and the cycle still succeeds;
/// capture and OCR errors abort it.
pub async fn run_capture_cycle(
    job: CaptureJob,
    backends: Arc<dyn BackendFactory>,
    cancel: CancellationToken,
) -> CaptureResult {
    let cycle = job.cycle_id;

    if !job.region.is_valid() {
        return CaptureResult::failure(
            FailureKind::CaptureRegion,
            format!("Invalid capture dimensions: {}", job.region),
        );
    }

    // Capture and encode on a blocking thread
    let capturer = backends.capturer();
    let region = job.region;
    let png = tokio::task::spawn_blocking(move || {
        let image = capturer.capture(region)?;
        encode_png(&image)
    })
    .await;

    let png = match png {
        Ok(Ok(png)) => png,
        Ok(Err(e)) => {
            tracing::error!(">>> [WORKER] cycle {cycle}: capture failed: {e:#}");
            return CaptureResult::failure(FailureKind::CaptureRegion, format!("{e:#}"));
        }
        Err(e) => {
            tracing::error!(">>> [WORKER] cycle {cycle}: capture task error: {e}");
            return CaptureResult::failure(FailureKind::CaptureRegion, e.to_string());
        }
    };
    tracing::debug!(">>> [WORKER] cycle {cycle}: captured {} bytes", png.len());

    if cancel.is_cancelled() {
        return cancelled();
    }

    let provider = backends.provider(&job.settings.provider);
    let language_hint = job.settings.provider.language_hint();
    let recognized = tokio::select! {
        _ = cancel.cancelled() => return cancelled(),
        result = provider.recognize(&png, language_hint) => result,
    };

    let recognized_text = match recognized {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            tracing::error!(">>> [WORKER] cycle {cycle}: {} failed: {e}", provider.name());
            return CaptureResult::failure(FailureKind::Provider(e.kind()), e.to_string());
        }
    };

    if recognized_text.is_empty() {
        tracing::debug!(">>> [WORKER] cycle {cycle}: no text detected");
        return CaptureResult::Success(CaptureSuccess {
            recognized_text,
            translated_text: String::new(),
            cache_hit: false,
        });
    }

    if let Some(cached) = job.cache.lookup(&recognized_text) {
        tracing::debug!(">>> [WORKER] cycle {cycle}: cache hit");
        return CaptureResult::Success(CaptureSuccess {
            translated_text: cached.to_string(),
            recognized_text,
            cache_hit: true,
        });
    }

    let engine = backends.engine(&job.settings.engine);
    let engine_name = engine.kind().display_name();
    let translated = tokio::select! {
        _ = cancel.cancelled() => return cancelled(),
        result = engine.translate(&recognized_text, &job.settings.target_language, None) => result,
    };

    let translated_text = match translated {
        Ok(translation) => {
            tracing::debug!(
                ">>> [WORKER] cycle {cycle}: translated from '{}'",
                translation.from.as_deref().unwrap_or("unknown")
            );
            translation.text
        }
        Err(e) => {
            tracing::warn!(">>> [WORKER] cycle {cycle}: {engine_name} failed: {e}");
            error_marker(engine_name, &e.kind().to_string())
        }
    };

    CaptureResult::Success(CaptureSuccess {
        recognized_text,
        translated_text,
        cache_hit: false,
    })
}

/// In-band translation failure text shown in place of a translation
pub fn error_marker(engine_name: &str, reason: &str) -> String {
    format!("[{engine_name} Error: {reason}]")
}

fn cancelled() -> CaptureResult {
    CaptureResult::failure(FailureKind::Cancelled, "Capture cancelled")
}

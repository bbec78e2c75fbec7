use std::sync::Arc;

use glimpse_types::{BackendErrorKind, CaptureRegion, CaptureResult, CaptureSuccess, FailureKind};
use tokio_util::sync::CancellationToken;

use super::fakes::{FakeBackends, ready_settings};
use crate::cache::TranslationCache;
use crate::worker::{CaptureJob, run_capture_cycle};

fn job(cache: &TranslationCache) -> CaptureJob {
    CaptureJob {
        cycle_id: 1,
        region: CaptureRegion::new(0, 0, 64, 32),
        settings: ready_settings().snapshot(),
        cache: cache.snapshot(),
    }
}

async fn run(backends: &Arc<FakeBackends>, job: CaptureJob) -> CaptureResult {
    run_capture_cycle(job, backends.clone(), CancellationToken::new()).await
}

#[tokio::test]
async fn test_translates_recognized_text() {
    let backends = Arc::new(FakeBackends::recognizing("  Bonjour  "));
    let result = run(&backends, job(&TranslationCache::new(20))).await;

    assert_eq!(
        result,
        CaptureResult::Success(CaptureSuccess {
            recognized_text: "Bonjour".into(),
            translated_text: "Bonjour [en]".into(),
            cache_hit: false,
        })
    );
    assert_eq!(backends.counters.captures(), 1);
    assert_eq!(backends.counters.translations(), 1);
}

#[tokio::test]
async fn test_empty_text_skips_translation() {
    let backends = Arc::new(FakeBackends::recognizing(" \n\t "));
    let result = run(&backends, job(&TranslationCache::new(20))).await;

    assert_eq!(
        result,
        CaptureResult::Success(CaptureSuccess {
            recognized_text: String::new(),
            translated_text: String::new(),
            cache_hit: false,
        })
    );
    assert_eq!(backends.counters.translations(), 0);
}

#[tokio::test]
async fn test_cache_hit_skips_translation() {
    let mut cache = TranslationCache::new(20);
    cache.record("Hallo", "Hello (cached)");
    let backends = Arc::new(FakeBackends::recognizing("Hallo"));

    let result = run(&backends, job(&cache)).await;

    assert_eq!(
        result,
        CaptureResult::Success(CaptureSuccess {
            recognized_text: "Hallo".into(),
            translated_text: "Hello (cached)".into(),
            cache_hit: true,
        })
    );
    assert_eq!(backends.counters.translations(), 0);
}

#[tokio::test]
async fn test_quota_error_becomes_marker() {
    let backends = Arc::new(FakeBackends::recognizing("Hallo").with_quota_exceeded());
    let result = run(&backends, job(&TranslationCache::new(20))).await;

    let CaptureResult::Success(success) = result else {
        panic!("translation errors must not fail the cycle");
    };
    assert_eq!(
        success.translated_text,
        "[Google Translate (Unofficial) Error: QuotaExceeded]"
    );
    assert!(!success.cache_hit);
}

#[tokio::test]
async fn test_provider_error_aborts_cycle() {
    let backends = Arc::new(FakeBackends::failing_ocr());
    let result = run(&backends, job(&TranslationCache::new(20))).await;

    let CaptureResult::Failure(failure) = result else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, FailureKind::Provider(BackendErrorKind::Network));
    assert_eq!(backends.counters.translations(), 0);
}

#[tokio::test]
async fn test_invalid_region_never_captures() {
    let backends = Arc::new(FakeBackends::recognizing("text"));
    let mut job = job(&TranslationCache::new(20));
    job.region = CaptureRegion::new(0, 0, 0, 10);

    let result = run(&backends, job).await;

    let CaptureResult::Failure(failure) = result else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, FailureKind::CaptureRegion);
    assert_eq!(backends.counters.captures(), 0);
}

#[tokio::test]
async fn test_cancelled_before_ocr() {
    let backends = Arc::new(FakeBackends::recognizing("text"));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result =
        run_capture_cycle(job(&TranslationCache::new(20)), backends.clone(), cancel).await;

    let CaptureResult::Failure(failure) = result else {
        panic!("expected failure");
    };
    assert_eq!(failure.kind, FailureKind::Cancelled);
    assert_eq!(backends.counters.recognitions(), 0);
}

use std::sync::Arc;
use std::time::Duration;

use glimpse_config::{Settings, SettingsState, SettingsUpdate};
use glimpse_types::{AppEvent, HistoryEntry, SettingKey};
use kanal::AsyncReceiver;
use tokio::task::JoinHandle;

use super::fakes::{FakeBackends, drain, geometry, ready_settings, test_config, wait_for};
use crate::cache::{HistoryStore, MemoryHistoryStore};
use crate::error::CoreError;
use crate::retranslate::{RetranslationSlot, RetranslationWorker};
use crate::session::{Session, SessionHandle, UiCommand};

struct Running {
    handle: SessionHandle,
    events: AsyncReceiver<AppEvent>,
    task: JoinHandle<Settings>,
    backends: Arc<FakeBackends>,
    history: Arc<MemoryHistoryStore>,
}

fn spawn(settings: SettingsState, history: MemoryHistoryStore) -> Running {
    spawn_with(settings, history, FakeBackends::recognizing("Hallo"))
}

fn spawn_with(
    settings: SettingsState,
    history: MemoryHistoryStore,
    backends: FakeBackends,
) -> Running {
    let backends = Arc::new(backends);
    let history = Arc::new(history);
    let (session, handle, events) = Session::new(
        &test_config(),
        settings,
        geometry(),
        backends.clone(),
        history.clone(),
    );
    Running {
        handle,
        events,
        task: tokio::spawn(session.run()),
        backends,
        history,
    }
}

async fn capture(running: &Running) {
    running.handle.trigger_capture().await.unwrap();
    wait_for(&running.events, |e| {
        *e == AppEvent::CaptureStateChanged { running: false }
    })
    .await;
}

#[tokio::test]
async fn test_capture_cycle_and_history_saved_on_shutdown() {
    let running = spawn(ready_settings(), MemoryHistoryStore::default());

    capture(&running).await;
    assert_eq!(running.handle.last_recognized_text(), "Hallo");

    running.handle.shutdown().await.unwrap();
    let settings = running.task.await.unwrap();

    assert_eq!(settings.target_language_code, "en");
    assert_eq!(
        running.history.load().unwrap(),
        vec![HistoryEntry::new("Hallo", "Hallo [en]")]
    );
}

#[tokio::test]
async fn test_restored_history_serves_cache_hits() {
    let history = MemoryHistoryStore::new(vec![HistoryEntry::new("Hallo", "Hello (saved)")]);
    let running = spawn(ready_settings(), history);

    running.handle.trigger_capture().await.unwrap();
    let AppEvent::CaptureCompleted(success) =
        wait_for(&running.events, |e| matches!(e, AppEvent::CaptureCompleted(_))).await
    else {
        unreachable!()
    };

    assert!(success.cache_hit);
    assert_eq!(success.translated_text, "Hello (saved)");
    assert_eq!(running.backends.counters.translations(), 0);

    running.handle.shutdown().await.unwrap();
    running.task.await.unwrap();
}

#[tokio::test]
async fn test_retranslation_leaves_cache_untouched() {
    let running = spawn(ready_settings(), MemoryHistoryStore::default());
    capture(&running).await;

    running.handle.request_retranslation("ja").await.unwrap();
    let event = wait_for(&running.events, |e| {
        matches!(e, AppEvent::RetranslationCompleted { .. })
    })
    .await;

    assert_eq!(
        event,
        AppEvent::RetranslationCompleted {
            source_text: "Hallo".into(),
            translated_text: "Hallo [ja]".into(),
            target_language: "ja".into(),
        }
    );
    assert_eq!(running.backends.counters.captures(), 1);
    assert_eq!(running.backends.counters.translations(), 2);

    running.handle.shutdown().await.unwrap();
    running.task.await.unwrap();
    assert_eq!(
        running.history.load().unwrap(),
        vec![HistoryEntry::new("Hallo", "Hallo [en]")]
    );
}

#[tokio::test]
async fn test_second_retranslation_refused_while_in_flight() {
    let backends =
        FakeBackends::recognizing("Hallo").with_translate_delay(Duration::from_millis(200));
    let running = spawn_with(ready_settings(), MemoryHistoryStore::default(), backends);
    capture(&running).await;

    running.handle.request_retranslation("ja").await.unwrap();
    running.handle.request_retranslation("fr").await.unwrap();

    let refused = wait_for(&running.events, |e| {
        matches!(e, AppEvent::RetranslationFailed { .. })
    })
    .await;
    assert_eq!(
        refused,
        AppEvent::RetranslationFailed {
            message: "Translation already in progress.".into()
        }
    );
    let AppEvent::RetranslationCompleted {
        target_language, ..
    } = wait_for(&running.events, |e| {
        matches!(e, AppEvent::RetranslationCompleted { .. })
    })
    .await
    else {
        unreachable!()
    };
    assert_eq!(target_language, "ja");

    // The slot is free again once the first request finished
    running.handle.request_retranslation("fr").await.unwrap();
    wait_for(&running.events, |e| {
        matches!(e, AppEvent::RetranslationCompleted { target_language, .. } if target_language == "fr")
    })
    .await;

    running.handle.shutdown().await.unwrap();
    running.task.await.unwrap();
}

#[tokio::test]
async fn test_retranslation_without_text_is_refused() {
    let running = spawn(ready_settings(), MemoryHistoryStore::default());

    running.handle.request_retranslation("ja").await.unwrap();
    let event = wait_for(&running.events, |e| {
        matches!(e, AppEvent::RetranslationFailed { .. })
    })
    .await;

    assert_eq!(
        event,
        AppEvent::RetranslationFailed {
            message: "No text captured previously.".into()
        }
    );
    assert_eq!(running.backends.counters.translations(), 0);

    running.handle.shutdown().await.unwrap();
    running.task.await.unwrap();
}

#[tokio::test]
async fn test_clear_history_empties_store() {
    let history = MemoryHistoryStore::new(vec![HistoryEntry::new("a", "b")]);
    let running = spawn(ready_settings(), history);

    running.handle.send(UiCommand::ClearHistory).await.unwrap();
    wait_for(&running.events, |e| *e == AppEvent::HistoryCleared).await;
    assert!(running.history.load().unwrap().is_empty());

    running.handle.shutdown().await.unwrap();
    running.task.await.unwrap();
    assert!(running.history.load().unwrap().is_empty());
}

#[tokio::test]
async fn test_settings_changed_only_when_value_changes() {
    let running = spawn(ready_settings(), MemoryHistoryStore::default());

    running
        .handle
        .apply_settings(SettingsUpdate {
            target_language_code: Some("en".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    running
        .handle
        .apply_settings(SettingsUpdate {
            target_language_code: Some("de".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let event = wait_for(&running.events, |e| {
        matches!(e, AppEvent::SettingsChanged(_))
    })
    .await;
    assert_eq!(
        event,
        AppEvent::SettingsChanged(vec![SettingKey::TargetLanguageCode])
    );
    assert!(drain(&running.events).is_empty());

    // New target applies to the next capture
    capture(&running).await;
    running.handle.shutdown().await.unwrap();
    let settings = running.task.await.unwrap();

    assert_eq!(settings.target_language_code, "de");
    assert_eq!(
        running.history.load().unwrap(),
        vec![HistoryEntry::new("Hallo", "Hallo [de]")]
    );
}

#[tokio::test]
async fn test_capture_refused_until_prerequisites_met() {
    let settings = SettingsState::new(Settings {
        ocr_provider: glimpse_config::OcrProviderKind::CloudOcrService,
        translation_engine: glimpse_config::EngineKind::WebTranslate,
        ..Default::default()
    });
    let running = spawn(settings, MemoryHistoryStore::default());

    running.handle.trigger_capture().await.unwrap();
    let event = wait_for(&running.events, |e| {
        matches!(e, AppEvent::PrerequisitesMissing { .. })
    })
    .await;
    assert_eq!(
        event,
        AppEvent::PrerequisitesMissing {
            missing: vec!["API Key (OCR.space)".into()]
        }
    );

    running
        .handle
        .apply_settings(SettingsUpdate {
            ocr_space_api_key: Some("key".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    capture(&running).await;
    assert_eq!(running.backends.counters.captures(), 1);

    running.handle.shutdown().await.unwrap();
    running.task.await.unwrap();
}

struct UnwritableHistory;

impl HistoryStore for UnwritableHistory {
    fn load(&self) -> Result<Vec<HistoryEntry>, CoreError> {
        Ok(Vec::new())
    }

    fn save(&self, _entries: &[HistoryEntry]) -> Result<(), CoreError> {
        Err(CoreError::History("history.json: read-only file system".into()))
    }
}

#[tokio::test]
async fn test_settings_returned_when_history_save_fails() {
    let (session, handle, events) = Session::new(
        &test_config(),
        ready_settings(),
        geometry(),
        Arc::new(FakeBackends::recognizing("Hallo")),
        Arc::new(UnwritableHistory),
    );
    let task = tokio::spawn(session.run());

    handle
        .apply_settings(SettingsUpdate {
            target_language_code: Some("ja".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    handle.trigger_capture().await.unwrap();
    wait_for(&events, |e| *e == AppEvent::CaptureStateChanged { running: false }).await;

    handle.shutdown().await.unwrap();
    let settings = task.await.unwrap();
    assert_eq!(settings.target_language_code, "ja");
}

#[tokio::test]
async fn test_live_flag_in_settings_update_drives_scheduler() {
    let running = spawn(ready_settings(), MemoryHistoryStore::default());

    running
        .handle
        .apply_settings(SettingsUpdate {
            live_mode: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
    wait_for(&running.events, |e| *e == AppEvent::LiveModeChanged { running: true }).await;

    running
        .handle
        .apply_settings(SettingsUpdate {
            live_mode: Some(false),
            ..Default::default()
        })
        .await
        .unwrap();
    wait_for(&running.events, |e| *e == AppEvent::LiveModeChanged { running: false }).await;

    running.handle.shutdown().await.unwrap();
    let settings = running.task.await.unwrap();
    assert!(!settings.live_mode);
}

#[tokio::test]
async fn test_live_flag_not_set_when_prerequisites_missing() {
    let settings = SettingsState::new(Settings {
        ocr_provider: glimpse_config::OcrProviderKind::CloudOcrService,
        translation_engine: glimpse_config::EngineKind::WebTranslate,
        ..Default::default()
    });
    let running = spawn(settings, MemoryHistoryStore::default());

    running
        .handle
        .apply_settings(SettingsUpdate {
            live_mode: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
    wait_for(&running.events, |e| {
        matches!(e, AppEvent::PrerequisitesMissing { .. })
    })
    .await;

    running.handle.shutdown().await.unwrap();
    let settings = running.task.await.unwrap();
    assert!(!settings.live_mode);
}

#[tokio::test]
async fn test_retranslation_outlives_closed_control_channel() {
    let backends = Arc::new(FakeBackends::recognizing("Hallo"));
    let mut slot = RetranslationSlot::new(RetranslationWorker::new(backends.clone()));
    let (tx, rx) = kanal::bounded_async(1);
    drop(rx);

    slot.request(
        "Hallo".into(),
        "ja".into(),
        ready_settings().engine_config(),
        &tx,
    )
    .unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while backends.counters.translations() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert!(slot.is_busy());
    slot.abort();
    assert!(!slot.is_busy());
}

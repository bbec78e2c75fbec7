use std::path::PathBuf;

use glimpse_types::SettingKey;
use kanal::{Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::ocr::{OcrProviderKind, OcrSpaceEngine, ProviderConfig};
use crate::translator::{EngineConfig, EngineKind};

fn default_ocr_language() -> String {
    "eng".to_string()
}

fn default_target_language() -> String {
    "en".to_string()
}

fn default_capture_interval_ms() -> u64 {
    5000
}

fn default_scale() -> bool {
    true
}

/// User-facing settings, as loaded from the profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ocr_provider: OcrProviderKind,
    pub google_credentials_path: Option<PathBuf>,
    pub ocr_space_api_key: Option<String>,
    #[serde(default = "default_ocr_language")]
    pub ocr_language_code: String,
    pub ocr_space_engine: OcrSpaceEngine,
    #[serde(default = "default_scale")]
    pub ocr_space_scale: bool,
    pub ocr_space_detect_orientation: bool,
    pub tesseract_cmd_path: Option<PathBuf>,
    #[serde(default = "default_ocr_language")]
    pub tesseract_language_code: String,
    pub translation_engine: EngineKind,
    pub deepl_api_key: Option<String>,
    #[serde(default = "default_target_language")]
    pub target_language_code: String,
    #[serde(default = "default_capture_interval_ms")]
    pub capture_interval_ms: u64,
    pub live_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ocr_provider: OcrProviderKind::default(),
            google_credentials_path: None,
            ocr_space_api_key: None,
            ocr_language_code: default_ocr_language(),
            ocr_space_engine: OcrSpaceEngine::default(),
            ocr_space_scale: default_scale(),
            ocr_space_detect_orientation: false,
            tesseract_cmd_path: None,
            tesseract_language_code: default_ocr_language(),
            translation_engine: EngineKind::default(),
            deepl_api_key: None,
            target_language_code: default_target_language(),
            capture_interval_ms: default_capture_interval_ms(),
            live_mode: false,
        }
    }
}

/// Partial update; `None` leaves a setting untouched.
///
/// Kinds arrive as string keys so unknown values can be validated here.
/// An empty string or path clears an optional credential.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SettingsUpdate {
    pub ocr_provider: Option<String>,
    pub google_credentials_path: Option<PathBuf>,
    pub ocr_space_api_key: Option<String>,
    pub ocr_language_code: Option<String>,
    pub ocr_space_engine: Option<u8>,
    pub ocr_space_scale: Option<bool>,
    pub ocr_space_detect_orientation: Option<bool>,
    pub tesseract_cmd_path: Option<PathBuf>,
    pub tesseract_language_code: Option<String>,
    pub translation_engine: Option<String>,
    pub deepl_api_key: Option<String>,
    pub target_language_code: Option<String>,
    pub capture_interval_ms: Option<u64>,
    pub live_mode: Option<bool>,
}

/// Value returned by [`SettingsState::get`]
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Text(String),
    Secret(Option<String>),
    Path(Option<PathBuf>),
    Number(u64),
    Flag(bool),
    OcrProvider(OcrProviderKind),
    Engine(EngineKind),
}

/// Cached credential presence, recomputed when a credential field changes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadinessFlags {
    pub google_credentials_valid: bool,
    pub ocr_space_key_set: bool,
    pub deepl_key_set: bool,
}

impl ReadinessFlags {
    fn compute(settings: &Settings) -> Self {
        Self {
            google_credentials_valid: settings
                .google_credentials_path
                .as_ref()
                .is_some_and(|p| p.is_file()),
            ocr_space_key_set: non_blank(settings.ocr_space_api_key.as_deref()),
            deepl_key_set: non_blank(settings.deepl_api_key.as_deref()),
        }
    }
}

fn non_blank(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Current configuration owned by the control task.
///
/// Workers never see this directly; they get a [`SettingsSnapshot`].
pub struct SettingsState {
    settings: Settings,
    readiness: ReadinessFlags,
    listeners: Vec<Sender<Vec<SettingKey>>>,
}

impl SettingsState {
    pub fn new(settings: Settings) -> Self {
        let settings = sanitize(settings);
        let readiness = ReadinessFlags::compute(&settings);
        Self {
            settings,
            readiness,
            listeners: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn readiness(&self) -> ReadinessFlags {
        self.readiness
    }

    /// Receives the changed keys of every effective update
    pub fn subscribe(&mut self) -> Receiver<Vec<SettingKey>> {
        let (tx, rx) = kanal::unbounded();
        self.listeners.push(tx);
        rx
    }

    pub fn get(&self, key: SettingKey) -> SettingValue {
        let s = &self.settings;
        match key {
            SettingKey::OcrProvider => SettingValue::OcrProvider(s.ocr_provider),
            SettingKey::GoogleCredentialsPath => {
                SettingValue::Path(s.google_credentials_path.clone())
            }
            SettingKey::OcrSpaceApiKey => SettingValue::Secret(s.ocr_space_api_key.clone()),
            SettingKey::OcrLanguageCode => SettingValue::Text(s.ocr_language_code.clone()),
            SettingKey::OcrSpaceEngine => SettingValue::Number(s.ocr_space_engine.get().into()),
            SettingKey::OcrSpaceScale => SettingValue::Flag(s.ocr_space_scale),
            SettingKey::OcrSpaceDetectOrientation => {
                SettingValue::Flag(s.ocr_space_detect_orientation)
            }
            SettingKey::TesseractCmdPath => SettingValue::Path(s.tesseract_cmd_path.clone()),
            SettingKey::TesseractLanguageCode => {
                SettingValue::Text(s.tesseract_language_code.clone())
            }
            SettingKey::TranslationEngine => SettingValue::Engine(s.translation_engine),
            SettingKey::DeeplApiKey => SettingValue::Secret(s.deepl_api_key.clone()),
            SettingKey::TargetLanguageCode => SettingValue::Text(s.target_language_code.clone()),
            SettingKey::CaptureIntervalMs => SettingValue::Number(s.capture_interval_ms),
            SettingKey::LiveMode => SettingValue::Flag(s.live_mode),
        }
    }

    /// Applies the keys present in `update` and returns those whose value changed
    pub fn apply_changes(&mut self, update: SettingsUpdate) -> Vec<SettingKey> {
        let mut changed = Vec::new();
        let s = &mut self.settings;

        if let Some(key) = update.ocr_provider {
            let kind = OcrProviderKind::from(key);
            assign(&mut s.ocr_provider, kind, SettingKey::OcrProvider, &mut changed);
        }
        if let Some(path) = update.google_credentials_path {
            let path = (!path.as_os_str().is_empty()).then_some(path);
            assign(
                &mut s.google_credentials_path,
                path,
                SettingKey::GoogleCredentialsPath,
                &mut changed,
            );
        }
        if let Some(key) = update.ocr_space_api_key {
            assign(
                &mut s.ocr_space_api_key,
                secret(key),
                SettingKey::OcrSpaceApiKey,
                &mut changed,
            );
        }
        if let Some(code) = update.ocr_language_code {
            if code.trim().is_empty() {
                tracing::warn!("Ignoring empty OCR language code");
            } else {
                assign(
                    &mut s.ocr_language_code,
                    code,
                    SettingKey::OcrLanguageCode,
                    &mut changed,
                );
            }
        }
        if let Some(engine) = update.ocr_space_engine {
            match OcrSpaceEngine::new(engine) {
                Some(engine) => assign(
                    &mut s.ocr_space_engine,
                    engine,
                    SettingKey::OcrSpaceEngine,
                    &mut changed,
                ),
                None => tracing::warn!("Ignoring invalid OCR.space engine {engine}"),
            }
        }
        if let Some(scale) = update.ocr_space_scale {
            assign(&mut s.ocr_space_scale, scale, SettingKey::OcrSpaceScale, &mut changed);
        }
        if let Some(detect) = update.ocr_space_detect_orientation {
            assign(
                &mut s.ocr_space_detect_orientation,
                detect,
                SettingKey::OcrSpaceDetectOrientation,
                &mut changed,
            );
        }
        if let Some(path) = update.tesseract_cmd_path {
            let path = (!path.as_os_str().is_empty()).then_some(path);
            assign(
                &mut s.tesseract_cmd_path,
                path,
                SettingKey::TesseractCmdPath,
                &mut changed,
            );
        }
        if let Some(code) = update.tesseract_language_code {
            if code.trim().is_empty() {
                tracing::warn!("Ignoring empty Tesseract language code");
            } else {
                assign(
                    &mut s.tesseract_language_code,
                    code,
                    SettingKey::TesseractLanguageCode,
                    &mut changed,
                );
            }
        }
        if let Some(key) = update.translation_engine {
            let kind = EngineKind::from(key);
            assign(
                &mut s.translation_engine,
                kind,
                SettingKey::TranslationEngine,
                &mut changed,
            );
        }
        if let Some(key) = update.deepl_api_key {
            assign(&mut s.deepl_api_key, secret(key), SettingKey::DeeplApiKey, &mut changed);
        }
        if let Some(code) = update.target_language_code {
            if code.trim().is_empty() {
                tracing::warn!("Ignoring empty target language code");
            } else {
                assign(
                    &mut s.target_language_code,
                    code,
                    SettingKey::TargetLanguageCode,
                    &mut changed,
                );
            }
        }
        if let Some(interval) = update.capture_interval_ms {
            if interval == 0 {
                tracing::warn!("Ignoring non-positive capture interval");
            } else {
                assign(
                    &mut s.capture_interval_ms,
                    interval,
                    SettingKey::CaptureIntervalMs,
                    &mut changed,
                );
            }
        }
        if let Some(live) = update.live_mode {
            assign(&mut s.live_mode, live, SettingKey::LiveMode, &mut changed);
        }

        if changed.iter().any(SettingKey::is_credential) {
            self.refresh_readiness();
        }

        if !changed.is_empty() {
            tracing::info!("Settings changed: {:?}", changed);
            self.notify(&changed);
        }

        changed
    }

    /// Resolves the selected OCR provider's configuration
    pub fn provider_config(&self) -> ProviderConfig {
        self.provider_config_for(self.settings.ocr_provider)
    }

    pub fn provider_config_for(&self, kind: OcrProviderKind) -> ProviderConfig {
        let s = &self.settings;
        match kind {
            OcrProviderKind::CloudVision => ProviderConfig::CloudVision {
                credentials_path: s.google_credentials_path.clone(),
            },
            OcrProviderKind::CloudOcrService => ProviderConfig::CloudOcrService {
                api_key: s.ocr_space_api_key.clone(),
                language: s.ocr_language_code.clone(),
                engine: s.ocr_space_engine,
                scale: s.ocr_space_scale,
                detect_orientation: s.ocr_space_detect_orientation,
            },
            OcrProviderKind::Local => ProviderConfig::Local {
                command: s.tesseract_cmd_path.clone(),
                language: s.tesseract_language_code.clone(),
            },
        }
    }

    /// Resolves the selected translation engine's configuration
    pub fn engine_config(&self) -> EngineConfig {
        self.engine_config_for(self.settings.translation_engine)
    }

    pub fn engine_config_for(&self, kind: EngineKind) -> EngineConfig {
        let s = &self.settings;
        match kind {
            EngineKind::CloudTranslate => EngineConfig::CloudTranslate {
                credentials_path: s.google_credentials_path.clone(),
            },
            EngineKind::WebTranslate => EngineConfig::WebTranslate,
            EngineKind::ThirdPartyKeyed => EngineConfig::ThirdPartyKeyed {
                api_key: s.deepl_api_key.clone(),
            },
        }
    }

    pub fn provider_prerequisites_met(&self, kind: OcrProviderKind) -> bool {
        self.provider_config_for(kind).is_ready()
    }

    pub fn engine_prerequisites_met(&self, kind: EngineKind) -> bool {
        self.engine_config_for(kind).is_ready()
    }

    /// Missing requirements of the selected provider and engine; empty when ready.
    ///
    /// The shared Google credential is listed once.
    pub fn missing_prerequisites(&self) -> Vec<String> {
        let mut missing = Vec::new();
        let provider_missing = self.provider_config().missing_requirement();
        let google_listed = provider_missing
            .as_ref()
            .is_some_and(|m| m.starts_with("Google Credentials"));
        missing.extend(provider_missing);

        let engine = self.engine_config();
        if let Some(m) = engine.missing_requirement()
            && !(google_listed && engine.uses_google_credentials())
        {
            missing.push(m);
        }
        missing
    }

    /// Immutable copy handed to workers at dispatch time
    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            provider: self.provider_config(),
            engine: self.engine_config(),
            target_language: self.settings.target_language_code.clone(),
        }
    }

    fn refresh_readiness(&mut self) {
        let old = self.readiness;
        self.readiness = ReadinessFlags::compute(&self.settings);
        if old.google_credentials_valid != self.readiness.google_credentials_valid {
            tracing::info!(
                "Google credentials valid state changed: {}",
                self.readiness.google_credentials_valid
            );
        }
        if old.ocr_space_key_set != self.readiness.ocr_space_key_set {
            tracing::info!(
                "OCR.space key set state changed: {}",
                self.readiness.ocr_space_key_set
            );
        }
        if old.deepl_key_set != self.readiness.deepl_key_set {
            tracing::info!("DeepL key set state changed: {}", self.readiness.deepl_key_set);
        }
    }

    fn notify(&mut self, changed: &[SettingKey]) {
        self.listeners
            .retain(|tx| tx.try_send(changed.to_vec()).is_ok());
    }
}

/// Settings a capture cycle needs, frozen at dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsSnapshot {
    pub provider: ProviderConfig,
    pub engine: EngineConfig,
    pub target_language: String,
}

fn assign<T: PartialEq>(field: &mut T, value: T, key: SettingKey, changed: &mut Vec<SettingKey>) {
    if *field != value {
        *field = value;
        changed.push(key);
    }
}

fn secret(value: String) -> Option<String> {
    let value = value.trim().to_string();
    (!value.is_empty()).then_some(value)
}

fn sanitize(mut settings: Settings) -> Settings {
    if settings.capture_interval_ms == 0 {
        settings.capture_interval_ms = default_capture_interval_ms();
    }
    if settings.target_language_code.trim().is_empty() {
        settings.target_language_code = default_target_language();
    }
    settings
}

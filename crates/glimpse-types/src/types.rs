use std::fmt;

use serde::{Deserialize, Serialize};

/// Events raised by the core towards the host UI
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    CaptureCompleted(CaptureSuccess),
    CaptureFailed(CaptureFailure),
    /// A capture cycle started (`true`) or finished (`false`)
    CaptureStateChanged {
        running: bool,
    },
    LiveModeChanged {
        running: bool,
    },
    RetranslationCompleted {
        source_text: String,
        translated_text: String,
        target_language: String,
    },
    RetranslationFailed {
        message: String,
    },
    PrerequisitesMissing {
        missing: Vec<String>,
    },
    SettingsChanged(Vec<SettingKey>),
    HistoryCleared,
}

/// Screen rectangle in absolute screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub top: i32,
    pub left: i32,
    pub width: i32,
    pub height: i32,
}

impl CaptureRegion {
    pub fn new(top: i32, left: i32, width: i32, height: i32) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl fmt::Display for CaptureRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} at ({}, {})",
            self.width, self.height, self.left, self.top
        )
    }
}

/// Geometry reported by the host window.
///
/// `frame` is the window position on screen, `content` the text area relative
/// to the frame. Only the text area is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    pub frame: CaptureRegion,
    pub content: CaptureRegion,
}

impl WindowGeometry {
    /// Geometry whose text area covers all of `region`
    pub fn from_screen_region(region: CaptureRegion) -> Self {
        Self {
            frame: region,
            content: CaptureRegion::new(0, 0, region.width, region.height),
        }
    }

    pub fn capture_region(&self) -> CaptureRegion {
        CaptureRegion {
            top: self.frame.top + self.content.top,
            left: self.frame.left + self.content.left,
            width: self.content.width,
            height: self.content.height,
        }
    }
}

/// One recognized/translated pair kept in history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub source_text: String,
    pub translated_text: String,
}

impl HistoryEntry {
    pub fn new(source_text: impl Into<String>, translated_text: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
            translated_text: translated_text.into(),
        }
    }
}

/// Failure categories shared by OCR providers and translation engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendErrorKind {
    NotConfigured,
    Unauthorized,
    QuotaExceeded,
    Unsupported,
    Network,
    Unknown,
}

impl BackendErrorKind {
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Unauthorized,
            // 456 is DeepL's "quota exceeded"
            429 | 456 => Self::QuotaExceeded,
            400 | 404 | 415 | 422 => Self::Unsupported,
            500..=599 => Self::Network,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotConfigured => "NotConfigured",
            Self::Unauthorized => "Unauthorized",
            Self::QuotaExceeded => "QuotaExceeded",
            Self::Unsupported => "Unsupported",
            Self::Network => "Network",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Outcome of one capture cycle
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureResult {
    Success(CaptureSuccess),
    Failure(CaptureFailure),
}

impl CaptureResult {
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure(CaptureFailure {
            kind,
            message: message.into(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSuccess {
    pub recognized_text: String,
    /// Translation, or an in-band `[<Engine> Error: <reason>]` marker
    pub translated_text: String,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for CaptureFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    CaptureRegion,
    Provider(BackendErrorKind),
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CaptureRegion => f.write_str("Screen Capture Error"),
            Self::Provider(kind) => write!(f, "OCR Error ({kind})"),
            Self::Cancelled => f.write_str("Cancelled"),
        }
    }
}

/// Names of user-facing settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    OcrProvider,
    GoogleCredentialsPath,
    OcrSpaceApiKey,
    OcrLanguageCode,
    OcrSpaceEngine,
    OcrSpaceScale,
    OcrSpaceDetectOrientation,
    TesseractCmdPath,
    TesseractLanguageCode,
    TranslationEngine,
    DeeplApiKey,
    TargetLanguageCode,
    CaptureIntervalMs,
    LiveMode,
}

impl SettingKey {
    pub fn is_credential(&self) -> bool {
        matches!(
            self,
            Self::GoogleCredentialsPath | Self::OcrSpaceApiKey | Self::DeeplApiKey
        )
    }
}

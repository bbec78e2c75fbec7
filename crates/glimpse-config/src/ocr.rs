use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const DEFAULT_TESSERACT_CMD: &str = "tesseract";

/// Known OCR backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OcrProviderKind {
    #[default]
    CloudVision,
    CloudOcrService,
    Local,
}

impl OcrProviderKind {
    pub const ALL: [OcrProviderKind; 3] = [Self::CloudVision, Self::CloudOcrService, Self::Local];

    pub fn key(&self) -> &'static str {
        match self {
            Self::CloudVision => "google_vision",
            Self::CloudOcrService => "ocr_space",
            Self::Local => "tesseract",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::CloudVision => "Google Cloud Vision",
            Self::CloudOcrService => "OCR.space",
            Self::Local => "Tesseract (local)",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

impl From<String> for OcrProviderKind {
    fn from(key: String) -> Self {
        Self::from_key(&key).unwrap_or_else(|| {
            tracing::warn!("Unknown OCR provider '{key}', falling back to default");
            Self::default()
        })
    }
}

impl From<OcrProviderKind> for String {
    fn from(kind: OcrProviderKind) -> Self {
        kind.key().to_string()
    }
}

impl fmt::Display for OcrProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// OCR.space engine selector (1 is faster, 2 handles more scripts)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrSpaceEngine(u8);

impl OcrSpaceEngine {
    pub fn new(engine: u8) -> Option<Self> {
        matches!(engine, 1 | 2).then_some(Self(engine))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for OcrSpaceEngine {
    fn default() -> Self {
        Self(1)
    }
}

/// Everything one OCR provider needs, resolved from the current settings
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderConfig {
    CloudVision {
        credentials_path: Option<PathBuf>,
    },
    CloudOcrService {
        api_key: Option<String>,
        language: String,
        engine: OcrSpaceEngine,
        scale: bool,
        detect_orientation: bool,
    },
    Local {
        command: Option<PathBuf>,
        language: String,
    },
}

impl ProviderConfig {
    pub fn kind(&self) -> OcrProviderKind {
        match self {
            Self::CloudVision { .. } => OcrProviderKind::CloudVision,
            Self::CloudOcrService { .. } => OcrProviderKind::CloudOcrService,
            Self::Local { .. } => OcrProviderKind::Local,
        }
    }

    /// Language hint passed along with the image. Empty means auto-detect.
    pub fn language_hint(&self) -> &str {
        match self {
            Self::CloudVision { .. } => "",
            Self::CloudOcrService { language, .. } | Self::Local { language, .. } => language,
        }
    }

    pub fn tesseract_command(&self) -> PathBuf {
        match self {
            Self::Local {
                command: Some(command),
                ..
            } if !command.as_os_str().is_empty() => command.clone(),
            _ => PathBuf::from(DEFAULT_TESSERACT_CMD),
        }
    }

    /// Describes the missing requirement, `None` when the provider is ready.
    ///
    /// Evaluated against the filesystem on every call so a deleted credential
    /// file is noticed without a settings change.
    pub fn missing_requirement(&self) -> Option<String> {
        let name = self.kind().display_name();
        match self {
            Self::CloudVision { credentials_path } => {
                (!credentials_file_exists(credentials_path.as_ref()))
                    .then(|| format!("Google Credentials ({name})"))
            }
            Self::CloudOcrService { api_key, .. } => {
                (!is_set(api_key.as_deref())).then(|| format!("API Key ({name})"))
            }
            Self::Local { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.missing_requirement().is_none()
    }
}

pub(crate) fn credentials_file_exists(path: Option<&PathBuf>) -> bool {
    path.is_some_and(|p| !p.as_os_str().is_empty() && p.is_file())
}

pub(crate) fn is_set(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_key_falls_back_to_default() {
        let kind: OcrProviderKind = serde_json::from_str("\"abbyy\"").unwrap();
        assert_eq!(kind, OcrProviderKind::CloudVision);

        let kind: OcrProviderKind = serde_json::from_str("\"tesseract\"").unwrap();
        assert_eq!(kind, OcrProviderKind::Local);
    }

    #[test]
    fn test_ocr_space_requires_key() {
        let config = ProviderConfig::CloudOcrService {
            api_key: Some("   ".into()),
            language: "eng".into(),
            engine: OcrSpaceEngine::default(),
            scale: true,
            detect_orientation: false,
        };

        assert_eq!(
            config.missing_requirement().as_deref(),
            Some("API Key (OCR.space)")
        );
    }

    #[test]
    fn test_vision_requires_existing_file() {
        let config = ProviderConfig::CloudVision {
            credentials_path: Some(PathBuf::from("/definitely/not/here.json")),
        };
        assert!(!config.is_ready());

        let file = tempfile::NamedTempFile::new().unwrap();
        let config = ProviderConfig::CloudVision {
            credentials_path: Some(file.path().to_path_buf()),
        };
        assert!(config.is_ready());
    }

    #[test]
    fn test_local_is_always_ready() {
        let config = ProviderConfig::Local {
            command: None,
            language: "jpn".into(),
        };
        assert!(config.is_ready());
        assert_eq!(config.tesseract_command(), PathBuf::from("tesseract"));
        assert_eq!(config.language_hint(), "jpn");
    }

    #[test]
    fn test_ocr_space_engine_range() {
        assert!(OcrSpaceEngine::new(2).is_some());
        assert!(OcrSpaceEngine::new(3).is_none());
    }
}

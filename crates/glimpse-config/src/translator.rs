use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ocr::{credentials_file_exists, is_set};

/// Known translation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EngineKind {
    #[default]
    CloudTranslate,
    WebTranslate,
    ThirdPartyKeyed,
}

impl EngineKind {
    pub const ALL: [EngineKind; 3] = [
        Self::CloudTranslate,
        Self::WebTranslate,
        Self::ThirdPartyKeyed,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::CloudTranslate => "google_cloud_v3",
            Self::WebTranslate => "googletrans",
            Self::ThirdPartyKeyed => "deepl_free",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::CloudTranslate => "Google Cloud API v3",
            Self::WebTranslate => "Google Translate (Unofficial)",
            Self::ThirdPartyKeyed => "DeepL Free/Pro",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

impl From<String> for EngineKind {
    fn from(key: String) -> Self {
        Self::from_key(&key).unwrap_or_else(|| {
            tracing::warn!("Unknown translation engine '{key}', falling back to default");
            Self::default()
        })
    }
}

impl From<EngineKind> for String {
    fn from(kind: EngineKind) -> Self {
        kind.key().to_string()
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Everything one translation engine needs, resolved from the current settings
#[derive(Debug, Clone, PartialEq)]
pub enum EngineConfig {
    CloudTranslate { credentials_path: Option<PathBuf> },
    WebTranslate,
    ThirdPartyKeyed { api_key: Option<String> },
}

impl EngineConfig {
    pub fn kind(&self) -> EngineKind {
        match self {
            Self::CloudTranslate { .. } => EngineKind::CloudTranslate,
            Self::WebTranslate => EngineKind::WebTranslate,
            Self::ThirdPartyKeyed { .. } => EngineKind::ThirdPartyKeyed,
        }
    }

    /// Describes the missing requirement, `None` when the engine is ready
    pub fn missing_requirement(&self) -> Option<String> {
        let name = self.kind().display_name();
        match self {
            Self::CloudTranslate { credentials_path } => {
                (!credentials_file_exists(credentials_path.as_ref()))
                    .then(|| format!("Google Credentials ({name})"))
            }
            Self::WebTranslate => None,
            Self::ThirdPartyKeyed { api_key } => {
                (!is_set(api_key.as_deref())).then(|| format!("DeepL API Key ({name})"))
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.missing_requirement().is_none()
    }

    /// Whether this engine shares the Google credential file with the OCR side
    pub fn uses_google_credentials(&self) -> bool {
        matches!(self, Self::CloudTranslate { .. })
    }
}

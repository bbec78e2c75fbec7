mod deepl;
mod google_cloud;
mod web;

pub use deepl::ThirdPartyKeyedEngine;
pub use google_cloud::{CloudTranslateApi, CloudTranslateEngine, HttpCloudTranslateApi};
pub use web::WebTranslateEngine;

use glimpse_config::network::NetworkConfig;
use glimpse_config::{EngineConfig, EngineKind};
use glimpse_types::BackendErrorKind;

pub type LanguageCode = String;

/// Translation engine interface
#[async_trait::async_trait]
pub trait TranslationEngine: Send + Sync {
    /// Translate `text` into `target`. `source` of `None` lets the engine detect it.
    async fn translate(
        &self,
        text: &str,
        target: &str,
        source: Option<&str>,
    ) -> Result<Translation, TranslateError>;

    fn kind(&self) -> EngineKind;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub text: String,
    /// Source language, when supplied or detected
    pub from: Option<LanguageCode>,
}

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Unsupported language pair: {from} -> {to}")]
    UnsupportedLanguagePair { from: String, to: String },

    #[error("Quota exceeded")]
    QuotaExceeded,

    #[error("Authentication error")]
    AuthenticationError,
}

impl TranslateError {
    pub fn kind(&self) -> BackendErrorKind {
        match self {
            Self::NotConfigured(_) => BackendErrorKind::NotConfigured,
            Self::ApiError(_) => BackendErrorKind::Unknown,
            Self::Http { status, .. } => BackendErrorKind::from_http_status(*status),
            Self::NetworkError(e) => match e.status() {
                Some(status) => BackendErrorKind::from_http_status(status.as_u16()),
                None if e.is_timeout() || e.is_connect() || e.is_request() => {
                    BackendErrorKind::Network
                }
                None => BackendErrorKind::Unknown,
            },
            Self::UnsupportedLanguagePair { .. } => BackendErrorKind::Unsupported,
            Self::QuotaExceeded => BackendErrorKind::QuotaExceeded,
            Self::AuthenticationError => BackendErrorKind::Unauthorized,
        }
    }
}

/// Build the engine described by `config`.
///
/// Construction never fails; missing credentials surface as
/// `TranslateError::NotConfigured` on the first `translate` call.
pub fn build_engine(
    config: &EngineConfig,
    client: &reqwest::Client,
    network: &NetworkConfig,
) -> Box<dyn TranslationEngine> {
    match config {
        EngineConfig::CloudTranslate { credentials_path } => {
            Box::new(CloudTranslateEngine::new(HttpCloudTranslateApi::new(
                client.clone(),
                network.cloud_translate_url.clone(),
                credentials_path.clone(),
            )))
        }
        EngineConfig::WebTranslate => Box::new(WebTranslateEngine::new(
            client.clone(),
            network.web_translate_url.clone(),
        )),
        EngineConfig::ThirdPartyKeyed { api_key } => Box::new(ThirdPartyKeyedEngine::new(
            client.clone(),
            network.deepl_url.clone(),
            api_key.clone(),
        )),
    }
}

/// Undo the HTML escaping some endpoints apply to translated text
pub(crate) fn unescape_html(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

pub(crate) fn mask_secret(message: &str, secret: &str) -> String {
    if secret.is_empty() {
        message.to_string()
    } else {
        message.replace(secret, "****")
    }
}

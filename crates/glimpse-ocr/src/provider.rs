use glimpse_types::BackendErrorKind;

/// OCR backend interface
#[async_trait::async_trait]
pub trait OcrProvider: Send + Sync {
    /// Recognize text in PNG `image`. An empty `language_hint` means auto-detect.
    async fn recognize(&self, image: &[u8], language_hint: &str) -> Result<String, OcrError>;

    /// Human readable provider name
    fn name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Local OCR failed: {0}")]
    Local(String),
}

impl OcrError {
    pub fn kind(&self) -> BackendErrorKind {
        match self {
            Self::NotConfigured(_) => BackendErrorKind::NotConfigured,
            Self::ApiError(_) | Self::Local(_) => BackendErrorKind::Unknown,
            Self::Http { status, .. } => BackendErrorKind::from_http_status(*status),
            Self::NetworkError(e) => reqwest_error_kind(e),
            Self::AuthenticationError(_) => BackendErrorKind::Unauthorized,
        }
    }
}

fn reqwest_error_kind(e: &reqwest::Error) -> BackendErrorKind {
    if let Some(status) = e.status() {
        BackendErrorKind::from_http_status(status.as_u16())
    } else if e.is_timeout() || e.is_connect() || e.is_request() {
        BackendErrorKind::Network
    } else {
        BackendErrorKind::Unknown
    }
}

/// Replace every occurrence of `secret` so keys never reach logs or the UI
pub(crate) fn mask_secret(message: &str, secret: &str) -> String {
    if secret.is_empty() {
        message.to_string()
    } else {
        message.replace(secret, "****")
    }
}

use std::env;

use serde::{Deserialize, Serialize};

/// Service endpoints and HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub vision_url: String,
    pub ocr_space_url: String,
    /// Base of the Cloud Translation v3 API, without the project path
    pub cloud_translate_url: String,
    pub web_translate_url: String,
    /// Overrides the DeepL endpoint otherwise picked from the key type
    pub deepl_url: Option<String>,
    pub http_timeout_secs: u64,
}

impl NetworkConfig {
    pub fn new() -> Self {
        let var = |name: &str, default: &str| env::var(name).unwrap_or_else(|_| default.to_string());

        let http_timeout_secs = env::var("GLIMPSE_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30); // 30 seconds default, as OCR uploads can be slow

        Self {
            vision_url: var(
                "GLIMPSE_VISION_URL",
                "https://vision.googleapis.com/v1/images:annotate",
            ),
            ocr_space_url: var("GLIMPSE_OCR_SPACE_URL", "https://api.ocr.space/parse/image"),
            cloud_translate_url: var(
                "GLIMPSE_CLOUD_TRANSLATE_URL",
                "https://translation.googleapis.com/v3",
            ),
            web_translate_url: var(
                "GLIMPSE_WEB_TRANSLATE_URL",
                "https://translate.googleapis.com/translate_a/single",
            ),
            deepl_url: env::var("GLIMPSE_DEEPL_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            http_timeout_secs,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::new()
    }
}

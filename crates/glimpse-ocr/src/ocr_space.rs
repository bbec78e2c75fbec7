use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use glimpse_config::{OcrProviderKind, OcrSpaceEngine};
use serde_json::Value;

use crate::provider::{OcrError, OcrProvider, mask_secret};

const DEFAULT_LANGUAGE: &str = "eng";

/// OCR through the OCR.space REST API
pub struct CloudOcrServiceProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    engine: OcrSpaceEngine,
    scale: bool,
    detect_orientation: bool,
}

impl CloudOcrServiceProvider {
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        api_key: Option<String>,
        engine: OcrSpaceEngine,
        scale: bool,
        detect_orientation: bool,
    ) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            engine,
            scale,
            detect_orientation,
        }
    }
}

#[async_trait::async_trait]
impl OcrProvider for CloudOcrServiceProvider {
    async fn recognize(&self, image: &[u8], language_hint: &str) -> Result<String, OcrError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| OcrError::NotConfigured("OCR.space API Key not provided".into()))?;

        let language = if language_hint.is_empty() {
            tracing::warn!("OCR.space selected without an OCR language, defaulting to '{DEFAULT_LANGUAGE}'");
            DEFAULT_LANGUAGE
        } else {
            language_hint
        };

        let params = [
            ("apikey", api_key.to_string()),
            ("language", language.to_string()),
            ("isOverlayRequired", "false".to_string()),
            (
                "base64Image",
                format!("data:image/png;base64,{}", STANDARD.encode(image)),
            ),
            ("OCREngine", self.engine.get().to_string()),
            ("scale", self.scale.to_string()),
            ("detectOrientation", self.detect_orientation.to_string()),
        ];

        tracing::debug!(
            "Sending image to OCR.space API (Lang: {language}, Engine: {})...",
            self.engine.get()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| mask_network_error(e, api_key))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OcrError::Http {
                status: status.as_u16(),
                message: mask_secret(&message, api_key),
            });
        }

        let json: Value = response.json().await.map_err(|_| {
            OcrError::ApiError("Invalid response format from OCR.space".into())
        })?;

        let text = parse_response(&json).map_err(|e| match e {
            OcrError::ApiError(message) => OcrError::ApiError(mask_secret(&message, api_key)),
            other => other,
        })?;
        tracing::debug!("OCR.space result received (Length: {}).", text.len());
        Ok(text)
    }

    fn name(&self) -> &str {
        OcrProviderKind::CloudOcrService.display_name()
    }
}

fn mask_network_error(error: reqwest::Error, api_key: &str) -> OcrError {
    // reqwest errors may echo the form body; keep the kind, drop the details
    if error.is_timeout() || error.is_connect() {
        OcrError::NetworkError(error.without_url())
    } else {
        OcrError::ApiError(mask_secret(&error.to_string(), api_key))
    }
}

fn first_error_message(json: &Value) -> Option<String> {
    match &json["ErrorMessage"] {
        Value::Array(items) => items.first().and_then(|v| v.as_str()).map(str::to_string),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn parse_response(json: &Value) -> Result<String, OcrError> {
    if json["IsErroredOnProcessing"].as_bool().unwrap_or(false) {
        let details =
            first_error_message(json).unwrap_or_else(|| "Unknown OCR.space Error".to_string());
        return Err(OcrError::ApiError(format!("OCR.space Error: {details}")));
    }

    match json["ParsedResults"].as_array().and_then(|r| r.first()) {
        Some(result) => Ok(result["ParsedText"]
            .as_str()
            .map(|s| s.trim().to_string())
            .unwrap_or_default()),
        None => {
            if let Some(message) = first_error_message(json) {
                tracing::warn!("OCR.space returned no results but message: {message}");
            }
            Ok(String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use glimpse_types::BackendErrorKind;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_text() {
        let json = json!({
            "ParsedResults": [{ "ParsedText": "Hello world\r\n" }],
            "IsErroredOnProcessing": false
        });
        assert_eq!(parse_response(&json).unwrap(), "Hello world");
    }

    #[test]
    fn test_parse_processing_error() {
        let json = json!({
            "IsErroredOnProcessing": true,
            "ErrorMessage": ["E201: Invalid language"]
        });
        let err = parse_response(&json).unwrap_err();
        assert_eq!(err.to_string(), "API error: OCR.space Error: E201: Invalid language");
    }

    #[test]
    fn test_parse_empty_results_is_no_text() {
        let json = json!({ "IsErroredOnProcessing": false, "ErrorMessage": "Timed out" });
        assert_eq!(parse_response(&json).unwrap(), "");
    }

    #[tokio::test]
    async fn test_missing_key_fails_fast() {
        let provider = CloudOcrServiceProvider::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/unreachable".into(),
            None,
            OcrSpaceEngine::default(),
            true,
            false,
        );
        let err = provider.recognize(b"png", "eng").await.unwrap_err();
        assert_eq!(err.kind(), BackendErrorKind::NotConfigured);
    }
}

use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use glimpse_config::{GoogleCredentials, OcrProviderKind};
use serde_json::{Value, json};

use crate::provider::{OcrError, OcrProvider};


/// OCR through the Cloud Vision `images:annotate` endpoint
pub struct CloudVisionProvider {
    client: reqwest::Client,
    endpoint: String,
    credentials_path: Option<PathBuf>,
}

impl CloudVisionProvider {
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        credentials_path: Option<PathBuf>,
    ) -> Self {
        Self {
            client,
            endpoint,
            credentials_path,
        }
    }

    fn credentials(&self) -> Result<GoogleCredentials, OcrError> {
        let path = self
            .credentials_path
            .as_ref()
            .ok_or_else(|| OcrError::NotConfigured("Google credentials path not set".into()))?;
        GoogleCredentials::load(path).map_err(|e| OcrError::NotConfigured(e.to_string()))
    }
}

#[async_trait::async_trait]
impl OcrProvider for CloudVisionProvider {
    async fn recognize(&self, image: &[u8], language_hint: &str) -> Result<String, OcrError> {
        let credentials = self.credentials()?;
        let (header, value) = credentials.auth.header();

        let body = request_body(image, language_hint);

        tracing::debug!("Sending image to Google Cloud Vision API...");
        let response = self
            .client
            .post(&self.endpoint)
            .header(header, value)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OcrError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to parse response: {e}")))?;

        let text = parse_response(&json)?;
        tracing::debug!("Google Vision OCR result received (Length: {}).", text.len());
        Ok(text)
    }

    fn name(&self) -> &str {
        OcrProviderKind::CloudVision.display_name()
    }
}

fn request_body(image: &[u8], language_hint: &str) -> Value {
    let mut request = json!({
        "image": { "content": STANDARD.encode(image) },
        "features": [{ "type": "TEXT_DETECTION" }],
    });
    if !language_hint.is_empty() {
        request["imageContext"] = json!({ "languageHints": [language_hint] });
    }
    json!({ "requests": [request] })
}

fn parse_response(json: &Value) -> Result<String, OcrError> {
    let response = &json["responses"][0];

    if let Some(message) = response["error"]["message"].as_str() {
        if message.contains("CREDENTIALS_MISSING") || message.contains("PERMISSION_DENIED") {
            return Err(OcrError::AuthenticationError(
                "Check Google Cloud credentials/permissions".into(),
            ));
        }
        return Err(OcrError::ApiError(format!("Vision API Error: {message}")));
    }

    Ok(response["textAnnotations"][0]["description"]
        .as_str()
        .map(|s| s.trim().to_string())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use glimpse_types::BackendErrorKind;

    use super::*;

    #[test]
    fn test_parse_first_annotation() {
        let json = json!({
            "responses": [{
                "textAnnotations": [
                    { "description": "  こんにちは\n世界 \n" },
                    { "description": "こんにちは" }
                ]
            }]
        });
        assert_eq!(parse_response(&json).unwrap(), "こんにちは\n世界");
    }

    #[test]
    fn test_parse_no_text() {
        let json = json!({ "responses": [{}] });
        assert_eq!(parse_response(&json).unwrap(), "");
    }

    #[test]
    fn test_parse_permission_error() {
        let json = json!({
            "responses": [{ "error": { "message": "PERMISSION_DENIED: billing disabled" } }]
        });
        assert_eq!(
            parse_response(&json).unwrap_err().kind(),
            BackendErrorKind::Unauthorized
        );
    }

    #[test]
    fn test_language_hint_only_when_given() {
        let body = request_body(b"png", "ja");
        assert_eq!(body["requests"][0]["imageContext"]["languageHints"][0], "ja");

        let body = request_body(b"png", "");
        assert!(body["requests"][0].get("imageContext").is_none());
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_fast() {
        let provider = CloudVisionProvider::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/unreachable".into(),
            None,
        );
        let err = provider.recognize(b"png", "").await.unwrap_err();
        assert_eq!(err.kind(), BackendErrorKind::NotConfigured);
    }
}

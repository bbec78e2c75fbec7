use std::path::PathBuf;

use glimpse_config::{EngineKind, GoogleCredentials};
use serde_json::{Value, json};

use crate::{TranslateError, Translation, TranslationEngine, unescape_html};

/// The two Cloud Translation calls the engine is built on
#[async_trait::async_trait]
pub trait CloudTranslateApi: Send + Sync {
    async fn detect_language(&self, text: &str) -> Result<String, TranslateError>;

    async fn translate_text(
        &self,
        text: &str,
        target: &str,
        source: Option<&str>,
    ) -> Result<String, TranslateError>;
}

/// Google Cloud Translation with built-in source language detection.
///
/// With no source language the text is detected first, and when it is already
/// in the target language it is returned unchanged without a translate call.
pub struct CloudTranslateEngine<A> {
    api: A,
}

impl<A: CloudTranslateApi> CloudTranslateEngine<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl<A: CloudTranslateApi> TranslationEngine for CloudTranslateEngine<A> {
    async fn translate(
        &self,
        text: &str,
        target: &str,
        source: Option<&str>,
    ) -> Result<Translation, TranslateError> {
        if text.is_empty() {
            return Ok(Translation {
                text: String::new(),
                from: source.map(str::to_string),
            });
        }

        let source = match source {
            Some(code) => code.to_string(),
            None => {
                let detected = self.api.detect_language(text).await?;
                if same_language(&detected, target) {
                    tracing::debug!(
                        "Google V3 detected '{detected}' matching target, skipping translation"
                    );
                    return Ok(Translation {
                        text: text.to_string(),
                        from: Some(detected),
                    });
                }
                detected
            }
        };

        tracing::debug!("Requesting Google V3 translation: target='{target}', source='{source}'");
        let translated = self.api.translate_text(text, target, Some(source.as_str())).await?;

        Ok(Translation {
            text: translated,
            from: Some(source),
        })
    }

    fn kind(&self) -> EngineKind {
        EngineKind::CloudTranslate
    }
}

/// `en` matches `en` and `en-US`, but `zh-CN` does not match `zh-TW`
fn same_language(detected: &str, target: &str) -> bool {
    let detected = detected.trim().to_lowercase();
    let target = target.trim().to_lowercase();
    if detected == target {
        return true;
    }
    let base = |code: &str| code.split(['-', '_']).next().unwrap_or("").to_string();
    let has_region = |code: &str| code.contains(['-', '_']);
    (!has_region(&detected) || !has_region(&target)) && base(&detected) == base(&target)
}

/// Cloud Translation v3 over REST, authenticated from the credential file
pub struct HttpCloudTranslateApi {
    client: reqwest::Client,
    base_url: String,
    credentials_path: Option<PathBuf>,
}

impl HttpCloudTranslateApi {
    pub fn new(client: reqwest::Client, base_url: String, credentials_path: Option<PathBuf>) -> Self {
        Self {
            client,
            base_url,
            credentials_path,
        }
    }

    fn credentials(&self) -> Result<(GoogleCredentials, String), TranslateError> {
        let path = self.credentials_path.as_ref().ok_or_else(|| {
            TranslateError::NotConfigured("Google credentials path not set".into())
        })?;
        let credentials = GoogleCredentials::load(path)
            .map_err(|e| TranslateError::NotConfigured(e.to_string()))?;
        let project_id = credentials.project_id.clone().ok_or_else(|| {
            TranslateError::NotConfigured(
                "Could not determine project ID from credentials file".into(),
            )
        })?;
        Ok((credentials, project_id))
    }

    async fn call(&self, method: &str, body: Value) -> Result<Value, TranslateError> {
        let (credentials, project_id) = self.credentials()?;
        let (header, value) = credentials.auth.header();
        let url = format!(
            "{}/projects/{project_id}/locations/global:{method}",
            self.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header(header, value)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => TranslateError::AuthenticationError,
                429 => TranslateError::QuotaExceeded,
                code => TranslateError::Http {
                    status: code,
                    message: api_error_message(&message),
                },
            });
        }

        response
            .json()
            .await
            .map_err(|e| TranslateError::ApiError(format!("Failed to parse response: {e}")))
    }
}

#[async_trait::async_trait]
impl CloudTranslateApi for HttpCloudTranslateApi {
    async fn detect_language(&self, text: &str) -> Result<String, TranslateError> {
        let json = self
            .call(
                "detectLanguage",
                json!({ "content": text, "mimeType": "text/plain" }),
            )
            .await?;
        parse_detect_response(&json)
    }

    async fn translate_text(
        &self,
        text: &str,
        target: &str,
        source: Option<&str>,
    ) -> Result<String, TranslateError> {
        let mut body = json!({
            "contents": [text],
            "mimeType": "text/plain",
            "targetLanguageCode": target,
        });
        if let Some(source) = source {
            body["sourceLanguageCode"] = json!(source);
        }
        let json = self.call("translateText", body).await?;
        parse_translate_response(&json)
    }
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

fn parse_detect_response(json: &Value) -> Result<String, TranslateError> {
    json["languages"][0]["languageCode"]
        .as_str()
        .filter(|code| !code.is_empty() && *code != "und")
        .map(str::to_string)
        .ok_or_else(|| TranslateError::ApiError("Language detection returned no result".into()))
}

fn parse_translate_response(json: &Value) -> Result<String, TranslateError> {
    json["translations"][0]["translatedText"]
        .as_str()
        .map(unescape_html)
        .ok_or_else(|| TranslateError::ApiError("Translation failed: No result from Google V3 API".into()))
}

use glimpse_config::EngineKind;
use serde_json::Value;

use crate::{TranslateError, Translation, TranslationEngine, unescape_html};

/// Unofficial Google Translate web endpoint. Needs no credentials.
pub struct WebTranslateEngine {
    client: reqwest::Client,
    endpoint: String,
}

impl WebTranslateEngine {
    pub fn new(client: reqwest::Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait::async_trait]
impl TranslationEngine for WebTranslateEngine {
    async fn translate(
        &self,
        text: &str,
        target: &str,
        source: Option<&str>,
    ) -> Result<Translation, TranslateError> {
        let target = target.to_lowercase();
        if text.is_empty() {
            return Ok(Translation {
                text: String::new(),
                from: source.map(str::to_string),
            });
        }

        let source = source.map(str::to_lowercase);
        let sl = source.as_deref().unwrap_or("auto");

        tracing::debug!("Requesting web translation: target='{target}', source='{sl}'");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", sl),
                ("tl", target.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                429 => TranslateError::QuotaExceeded,
                code => TranslateError::Http {
                    status: code,
                    message: "Google Translate web endpoint rejected the request".into(),
                },
            });
        }

        let json: Value = response.json().await.map_err(|_| {
            TranslateError::ApiError(
                "No valid result from web endpoint (blocked/API change?)".into(),
            )
        })?;

        let (translated, detected) = parse_response(&json)?;
        tracing::debug!(
            "Web translation received (Detected: {}).",
            detected.as_deref().unwrap_or("unknown")
        );

        Ok(Translation {
            text: translated,
            from: source.or(detected),
        })
    }

    fn kind(&self) -> EngineKind {
        EngineKind::WebTranslate
    }
}

/// Response shape: `[[["translated", "original", ...], ...], null, "detected", ...]`
fn parse_response(json: &Value) -> Result<(String, Option<String>), TranslateError> {
    let sentences = json[0].as_array().ok_or_else(|| {
        TranslateError::ApiError("No valid result from web endpoint (blocked/API change?)".into())
    })?;

    let translated: String = sentences
        .iter()
        .filter_map(|sentence| sentence[0].as_str())
        .collect();

    if translated.is_empty() {
        return Err(TranslateError::ApiError(
            "Web endpoint returned an empty translation".into(),
        ));
    }

    let detected = json[2].as_str().map(str::to_lowercase);
    Ok((unescape_html(&translated), detected))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_joins_sentences() {
        let json = json!([
            [
                ["Hello. ", "こんにちは。", null, null, 10],
                ["How are you?", "お元気ですか？", null, null, 10]
            ],
            null,
            "ja"
        ]);
        let (text, detected) = parse_response(&json).unwrap();
        assert_eq!(text, "Hello. How are you?");
        assert_eq!(detected.as_deref(), Some("ja"));
    }

    #[test]
    fn test_parse_unexpected_shape() {
        assert!(parse_response(&json!({"error": "blocked"})).is_err());
        assert!(parse_response(&json!([[], null, "en"])).is_err());
    }
}

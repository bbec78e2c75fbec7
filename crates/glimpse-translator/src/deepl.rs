use glimpse_config::EngineKind;

use crate::{TranslateError, Translation, TranslationEngine, mask_secret, unescape_html};

const FREE_API_URL: &str = "https://api-free.deepl.com/v2/translate";
const PRO_API_URL: &str = "https://api.deepl.com/v2/translate";

/// DeepL Free/Pro engine keyed by a user API key
#[derive(Clone)]
pub struct ThirdPartyKeyedEngine {
    client: reqwest::Client,
    api_url: Option<String>,
    api_key: Option<String>,
}

impl ThirdPartyKeyedEngine {
    /// `api_url` of `None` picks the Free or Pro endpoint from the key
    pub fn new(client: reqwest::Client, api_url: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            api_url,
            api_key,
        }
    }

    fn endpoint(&self, api_key: &str) -> &str {
        match &self.api_url {
            Some(url) => url,
            None if is_free_key(api_key) => FREE_API_URL,
            None => PRO_API_URL,
        }
    }
}

/// Free-tier keys carry a `:fx` suffix
fn is_free_key(api_key: &str) -> bool {
    api_key.trim().ends_with(":fx")
}

/// DeepL wants regional variants for some targets and bare codes for sources
fn target_code(code: &str) -> String {
    match code.to_uppercase().as_str() {
        "EN" => "EN-US".to_string(),
        "PT" => "PT-PT".to_string(),
        "ZH-CN" | "ZH-TW" => "ZH".to_string(),
        other => other.to_string(),
    }
}

fn source_code(code: &str) -> String {
    match code.to_uppercase().as_str() {
        "ZH-CN" | "ZH-TW" => "ZH".to_string(),
        other => other.split('-').next().unwrap_or(other).to_string(),
    }
}

#[async_trait::async_trait]
impl TranslationEngine for ThirdPartyKeyedEngine {
    async fn translate(
        &self,
        text: &str,
        target: &str,
        source: Option<&str>,
    ) -> Result<Translation, TranslateError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| TranslateError::NotConfigured("DeepL API Key not provided".into()))?;

        if text.is_empty() {
            return Ok(Translation {
                text: String::new(),
                from: source.map(str::to_string),
            });
        }

        let target_dl = target_code(target);
        let source_dl = source.map(source_code);

        let mut params = vec![("text", text.to_string()), ("target_lang", target_dl.clone())];
        if let Some(source_dl) = &source_dl {
            params.push(("source_lang", source_dl.clone()));
        }

        tracing::debug!(
            "Requesting DeepL translation: target='{target_dl}', source='{}'",
            source_dl.as_deref().unwrap_or("auto")
        );

        let response = self
            .client
            .post(self.endpoint(api_key))
            .header("Authorization", format!("DeepL-Auth-Key {api_key}"))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        match status.as_u16() {
            456 | 429 => return Err(TranslateError::QuotaExceeded),
            401 | 403 => return Err(TranslateError::AuthenticationError),
            _ => {}
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            let message = mask_secret(&message, api_key);
            if status.as_u16() == 400 && message.contains("not supported") {
                return Err(TranslateError::UnsupportedLanguagePair {
                    from: source_dl.unwrap_or_else(|| "auto".into()),
                    to: target_dl,
                });
            }
            return Err(TranslateError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let json: serde_json::Value = response.json().await.map_err(|e| {
            TranslateError::ApiError(format!("Failed to parse response: {}", e))
        })?;

        let translation = &json["translations"][0];
        let translated_text = translation["text"]
            .as_str()
            .ok_or_else(|| TranslateError::ApiError("No text result from DeepL API".to_string()))?;
        let detected = translation["detected_source_language"]
            .as_str()
            .map(str::to_lowercase);

        Ok(Translation {
            text: unescape_html(translated_text),
            from: source.map(str::to_string).or(detected),
        })
    }

    fn kind(&self) -> EngineKind {
        EngineKind::ThirdPartyKeyed
    }
}

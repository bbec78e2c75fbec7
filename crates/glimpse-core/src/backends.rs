use std::sync::Arc;
use std::time::Duration;

use glimpse_config::network::NetworkConfig;
use glimpse_config::{EngineConfig, ProviderConfig};
use glimpse_ocr::{OcrProvider, ScreenCapturer, XcapCapturer};
use glimpse_translator::TranslationEngine;

use crate::error::CoreError;

/// Resolves configuration into live backends at dispatch time
pub trait BackendFactory: Send + Sync {
    fn capturer(&self) -> Arc<dyn ScreenCapturer>;
    fn provider(&self, config: &ProviderConfig) -> Box<dyn OcrProvider>;
    fn engine(&self, config: &EngineConfig) -> Box<dyn TranslationEngine>;
}

/// Real screen capture plus HTTP/CLI backends sharing one client
pub struct HttpBackends {
    client: reqwest::Client,
    network: NetworkConfig,
    capturer: Arc<dyn ScreenCapturer>,
}

impl HttpBackends {
    pub fn new(network: NetworkConfig) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(network.http_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            network,
            capturer: Arc::new(XcapCapturer),
        })
    }
}

impl BackendFactory for HttpBackends {
    fn capturer(&self) -> Arc<dyn ScreenCapturer> {
        self.capturer.clone()
    }

    fn provider(&self, config: &ProviderConfig) -> Box<dyn OcrProvider> {
        glimpse_ocr::build_provider(config, &self.client, &self.network)
    }

    fn engine(&self, config: &EngineConfig) -> Box<dyn TranslationEngine> {
        glimpse_translator::build_engine(config, &self.client, &self.network)
    }
}

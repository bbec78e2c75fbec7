mod capture;
mod ocr_space;
mod provider;
mod tesseract;
mod vision;

pub use capture::{ScreenCapturer, XcapCapturer, capture_screen_region, encode_png};
pub use ocr_space::CloudOcrServiceProvider;
pub use provider::{OcrError, OcrProvider};
pub use tesseract::LocalOcrProvider;
pub use vision::CloudVisionProvider;

use glimpse_config::ProviderConfig;
use glimpse_config::network::NetworkConfig;

/// Build the provider described by `config`.
///
/// Construction never fails; missing credentials surface as
/// `OcrError::NotConfigured` on the first `recognize` call.
pub fn build_provider(
    config: &ProviderConfig,
    client: &reqwest::Client,
    network: &NetworkConfig,
) -> Box<dyn OcrProvider> {
    match config {
        ProviderConfig::CloudVision { credentials_path } => Box::new(CloudVisionProvider::new(
            client.clone(),
            network.vision_url.clone(),
            credentials_path.clone(),
        )),
        ProviderConfig::CloudOcrService {
            api_key,
            engine,
            scale,
            detect_orientation,
            ..
        } => Box::new(CloudOcrServiceProvider::new(
            client.clone(),
            network.ocr_space_url.clone(),
            api_key.clone(),
            *engine,
            *scale,
            *detect_orientation,
        )),
        ProviderConfig::Local { .. } => {
            Box::new(LocalOcrProvider::new(config.tesseract_command()))
        }
    }
}

#[cfg(test)]
mod tests {
    use glimpse_config::OcrSpaceEngine;

    use super::*;

    #[test]
    fn test_build_provider_matches_kind() {
        let client = reqwest::Client::new();
        let network = NetworkConfig::new();

        let vision = build_provider(
            &ProviderConfig::CloudVision {
                credentials_path: None,
            },
            &client,
            &network,
        );
        assert_eq!(vision.name(), "Google Cloud Vision");

        let ocr_space = build_provider(
            &ProviderConfig::CloudOcrService {
                api_key: Some("k".into()),
                language: "eng".into(),
                engine: OcrSpaceEngine::default(),
                scale: true,
                detect_orientation: false,
            },
            &client,
            &network,
        );
        assert_eq!(ocr_space.name(), "OCR.space");

        let local = build_provider(
            &ProviderConfig::Local {
                command: None,
                language: "eng".into(),
            },
            &client,
            &network,
        );
        assert_eq!(local.name(), "Tesseract (local)");
    }
}

use std::env;

use serde::{Deserialize, Serialize};

use self::network::NetworkConfig;

pub mod credentials;
pub mod network;
pub mod ocr;
pub mod settings;
pub mod translator;

pub use credentials::{CredentialError, GoogleAuth, GoogleCredentials};
pub use ocr::{OcrProviderKind, OcrSpaceEngine, ProviderConfig};
pub use settings::{
    ReadinessFlags, SettingValue, Settings, SettingsSnapshot, SettingsState, SettingsUpdate,
};
pub use translator::{EngineConfig, EngineKind};

const MIN_STOP_TIMEOUT_MS: u64 = 500;
const MAX_STOP_TIMEOUT_MS: u64 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub network: NetworkConfig,
    pub settings: Settings,

    /// Maximum number of history entries kept in the translation cache
    pub history_limit: usize,
    /// How long shutdown waits for an in-flight worker before detaching it
    pub worker_stop_timeout_ms: u64,
    /// Capacity of the UI command and event channels
    pub channel_capacity: usize,
}

impl Config {
    pub fn new() -> Self {
        let history_limit = env::var("GLIMPSE_HISTORY_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20); // 20 entries default

        let worker_stop_timeout_ms = env::var("GLIMPSE_WORKER_STOP_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(750)
            .clamp(MIN_STOP_TIMEOUT_MS, MAX_STOP_TIMEOUT_MS);

        let channel_capacity = env::var("GLIMPSE_CHANNEL_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(256);

        Config {
            network: NetworkConfig::new(),
            settings: Settings::default(),

            history_limit,
            worker_stop_timeout_ms,
            channel_capacity,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use directories::ProjectDirs;
use glimpse_config::Settings;
use serde::{Deserialize, Serialize};

/// Platform directories for profiles and history
pub struct AppDirs {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl AppDirs {
    pub fn locate() -> anyhow::Result<Self> {
        let dirs = ProjectDirs::from("dev", "glimpse", "glimpse")
            .context("Could not determine a home directory")?;
        Ok(Self {
            config_dir: dirs.config_dir().to_path_buf(),
            data_dir: dirs.data_dir().to_path_buf(),
        })
    }

    pub fn history_file(&self) -> PathBuf {
        self.data_dir.join("history.json")
    }
}

/// Represents a user profile
#[derive(Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub value: Settings,
}

/// Named settings profiles stored as JSON files
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(config_dir: &Path) -> Self {
        Self {
            dir: config_dir.join("profiles"),
        }
    }

    fn file(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Load a profile by name, falling back to `main` and then to defaults
    pub fn load(&self, name: &str) -> anyhow::Result<Settings> {
        for candidate in [name, "main"] {
            let file = self.file(candidate);
            if file.exists() {
                let data = fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let profile: Profile = serde_json::from_str(&data)
                    .with_context(|| format!("Invalid profile {}", file.display()))?;
                tracing::info!("[PROFILE] Loaded profile '{}'", profile.name);
                return Ok(profile.value);
            }
            tracing::warn!("[PROFILE] Profile '{candidate}' not found");
        }
        tracing::info!("[PROFILE] Using default settings");
        Ok(Settings::default())
    }

    pub fn save(&self, name: &str, settings: &Settings) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let profile = Profile {
            name: name.into(),
            value: settings.clone(),
        };
        let file = self.file(name);
        fs::write(&file, serde_json::to_string_pretty(&profile)?)
            .with_context(|| format!("Failed to write {}", file.display()))?;
        tracing::info!("[PROFILE] Saved profile '{name}'");
        Ok(file)
    }
}

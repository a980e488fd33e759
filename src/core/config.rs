use crate::core::column_filter::DEFAULT_FILTERED_SUFFIX;
use crate::models::audio::{TranscriberBackend, TranscriberConfig};
use crate::models::inference::{ModelBackend, ModelConfig};
use crate::models::landmarks::TrackingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Selects the mock model when "true" (the default), the hosted one otherwise
pub const USE_MOCK_MODEL_VAR: &str = "USE_MOCK_MODEL";
/// Endpoint URL of the hosted model
pub const MODEL_PATH_VAR: &str = "MODEL_PATH";

/// Live recording behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordingConfig {
    /// Record tracked landmarks as soon as the session starts
    pub auto_start: bool,
    /// Recent frames shown in the live preview
    pub preview_rows: usize,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            auto_start: true,
            preview_rows: 5,
        }
    }
}

/// Where landmark tables are read from and written to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Exported session recordings
    pub data_dir: PathBuf,
    /// Output directory for filtered tables; `None` writes next to the input
    pub filtered_dir: Option<PathBuf>,
    /// Appended to the file stem of filtered landmark tables
    pub filtered_suffix: String,
}

impl StorageConfig {
    pub fn filtered_output_dir(&self, input: &Path) -> PathBuf {
        match &self.filtered_dir {
            Some(dir) => dir.clone(),
            None => input
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    /// `<data_dir>/recording_<YYYYmmdd_HHMMSS>.parquet`
    pub fn recording_path(&self, at: chrono::DateTime<chrono::Utc>) -> PathBuf {
        self.data_dir
            .join(format!("recording_{}.parquet", at.format("%Y%m%d_%H%M%S")))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let mut data_dir = home_dir();
        data_dir.push(".signchat");
        data_dir.push("landmarks");

        Self {
            data_dir,
            filtered_dir: None,
            filtered_suffix: DEFAULT_FILTERED_SUFFIX.to_string(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    pub tracking: TrackingConfig,
    pub model: ModelConfig,
    pub transcriber: TranscriberConfig,
    pub recording: RecordingConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from file, creating with defaults if it doesn't exist.
    /// Environment overrides are applied after loading and never written back.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path()?;

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            config
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    /// Apply `USE_MOCK_MODEL` and `MODEL_PATH` from a variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(USE_MOCK_MODEL_VAR) {
            self.model.backend = if value.eq_ignore_ascii_case("true") {
                ModelBackend::Mock
            } else {
                ModelBackend::Hosted
            };
        }

        if let Some(url) = lookup(MODEL_PATH_VAR) {
            self.model.endpoint_url = Some(url);
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.model.vocabulary.is_empty() {
            return Err("Model vocabulary cannot be empty".into());
        }

        if self.model.backend == ModelBackend::Hosted
            && self.model.endpoint_url.as_deref().map_or(true, str::is_empty)
        {
            return Err(format!(
                "Hosted model requires an endpoint URL (set model.endpoint_url or {})",
                MODEL_PATH_VAR
            )
            .into());
        }

        if self.model.request_timeout_secs == 0 || self.model.request_timeout_secs > 600 {
            return Err(format!(
                "Invalid model request timeout: {}. Must be between 1 and 600 seconds",
                self.model.request_timeout_secs
            )
            .into());
        }

        if self.transcriber.backend == TranscriberBackend::HuggingFace
            && self.transcriber.api_url.is_empty()
        {
            return Err("Hugging Face transcriber requires an API URL".into());
        }

        if self.transcriber.request_timeout_secs == 0 {
            return Err("Transcriber request timeout must be at least 1 second".into());
        }

        if self.recording.preview_rows == 0 || self.recording.preview_rows > 100 {
            return Err(format!(
                "Invalid preview rows: {}. Must be between 1 and 100",
                self.recording.preview_rows
            )
            .into());
        }

        if self.storage.filtered_suffix.is_empty() {
            return Err("Filtered file suffix cannot be empty".into());
        }

        if self.storage.data_dir.as_os_str().is_empty() {
            return Err("Storage data directory cannot be empty".into());
        }

        Ok(())
    }

    /// Reset to default configuration
    pub fn reset() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Self::default();
        config.save()?;
        Ok(config)
    }

    /// Get the configuration file path
    fn get_config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| "Could not determine home directory")?;

        let mut path = PathBuf::from(home);
        path.push(".signchat");
        path.push("config");
        path.push("settings.json");

        Ok(path)
    }
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

use std::time::Duration;

use config::{Config, ConfigError, File};
use serde::Deserialize;

use crate::application::services::ExecutorConfig;

use super::Environment;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub jobs: JobStoreSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub media: MediaSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Layered configuration: `appsettings.{environment}` file when
    /// present, overridden by `APP__`-prefixed environment variables.
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        let configuration = Config::builder()
            .add_source(
                File::with_name(&format!("appsettings.{}", environment.as_str())).required(false),
            )
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        configuration.try_deserialize()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// How long `/upload` waits for the job to finish before giving the
    /// caller a timeout envelope. The job itself keeps running.
    pub upload_wait_secs: u64,
    pub max_upload_mb: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            upload_wait_secs: 900,
            max_upload_mb: 512,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStoreProviderSetting {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobStoreSettings {
    pub provider: JobStoreProviderSetting,
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for JobStoreSettings {
    fn default() -> Self {
        Self {
            provider: JobStoreProviderSetting::Memory,
            database_url: String::new(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageProviderSetting {
    #[default]
    Memory,
    Local,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub provider: StorageProviderSetting,
    pub local_path: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: StorageProviderSetting::Memory,
            local_path: "./artifacts".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaProviderSetting {
    /// Deterministic in-process stand-ins; no network or subprocesses.
    #[default]
    Scripted,
    /// ffmpeg plus remote speech/translation/synthesis APIs.
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    pub provider: MediaProviderSetting,
    pub ffmpeg_binary: String,
    pub transcription: TranscriptionApiSettings,
    pub translation: TranslationApiSettings,
    pub synthesis: SynthesisApiSettings,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            provider: MediaProviderSetting::Scripted,
            ffmpeg_binary: "ffmpeg".to_string(),
            transcription: TranscriptionApiSettings::default(),
            translation: TranslationApiSettings::default(),
            synthesis: SynthesisApiSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscriptionApiSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl Default for TranscriptionApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "whisper-1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TranslationApiSettings {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SynthesisApiSettings {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub workers: usize,
    pub queue_capacity: usize,
    pub stage_timeout_secs: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 64,
            stage_timeout_secs: 600,
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
        }
    }
}

impl PipelineSettings {
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            stage_timeout: Duration::from_secs(self.stage_timeout_secs),
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub enable_json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            enable_json: false,
        }
    }
}

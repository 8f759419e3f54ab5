use std::collections::HashMap;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, Source};
use serde::Deserialize;

use crate::application::services::{ProcessorConfig, ReaperConfig};
use crate::infrastructure::observability::TracingConfig;
use crate::infrastructure::retry::BackoffPolicy;

use super::Environment;

/// Pre-`APP__` variable names still honoured by deployments.
const LEGACY_VARIABLES: [(&str, &str); 5] = [
    ("DATABASE_URL", "database.url"),
    ("RABBITMQ_URL", "queue.url"),
    ("GEMINI_API_KEY", "gemini.api_key"),
    ("GEMINI_EXTRACTION_MODEL", "gemini.structuring_model"),
    ("GEMINI_GENERATION_MODEL", "gemini.generation_model"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub queue: QueueSettings,
    pub gemini: GeminiSettings,
    pub worker: WorkerSettings,
    pub startup: StartupSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueSettings {
    pub url: String,
    pub queue_name: String,
    pub prefetch: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSettings {
    pub api_key: String,
    pub base_url: String,
    pub structuring_model: String,
    pub generation_model: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSettings {
    pub stage_timeout_secs: u64,
    pub store_timeout_secs: u64,
    pub shutdown_grace_secs: u64,
    pub completion_attempts: u32,
    pub stale_after_secs: u64,
    pub reap_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartupSettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub deadline_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Settings {
    /// Loads `appsettings.{environment}.toml` (optional) and the process environment.
    pub fn load(environment: Environment) -> Result<Self, SettingsError> {
        let file = File::with_name(&format!("appsettings.{}", environment.as_str())).required(false);
        Self::from_sources(file, std::env::vars().collect())
    }

    /// Layers defaults, `file`, `APP__SECTION__KEY` variables and legacy variables, in that order.
    pub fn from_sources<S>(file: S, vars: HashMap<String, String>) -> Result<Self, SettingsError>
    where
        S: Source + Send + Sync + 'static,
    {
        let mut builder = Self::defaults()?.add_source(file).add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(Some(vars.clone())),
        );

        for (variable, key) in LEGACY_VARIABLES {
            if let Some(value) = vars.get(variable).filter(|v| !v.trim().is_empty()) {
                builder = builder.set_override(key, value.as_str())?;
            }
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("database.max_connections", 5)?
            .set_default("database.run_migrations", true)?
            .set_default("queue.queue_name", "problem_generation")?
            .set_default("queue.prefetch", 1)?
            .set_default("gemini.api_key", "")?
            .set_default("gemini.base_url", "https://generativelanguage.googleapis.com")?
            .set_default("gemini.structuring_model", "gemini-2.5-flash")?
            .set_default("gemini.generation_model", "gemini-2.5-pro")?
            .set_default("gemini.request_timeout_secs", 300)?
            .set_default("worker.stage_timeout_secs", 300)?
            .set_default("worker.store_timeout_secs", 30)?
            .set_default("worker.shutdown_grace_secs", 30)?
            .set_default("worker.completion_attempts", 3)?
            .set_default("worker.stale_after_secs", 3600)?
            .set_default("worker.reap_interval_secs", 300)?
            .set_default("startup.max_attempts", 8)?
            .set_default("startup.base_delay_ms", 500)?
            .set_default("startup.max_delay_ms", 10_000)?
            .set_default("startup.deadline_secs", 120)?
            .set_default("logging.level", "info,examsmith=debug")?
            .set_default("logging.json", false)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.gemini.api_key.trim().is_empty() {
            return Err(SettingsError::Invalid(
                "gemini.api_key (or GEMINI_API_KEY) must be set".to_string(),
            ));
        }
        if self.queue.prefetch != 1 {
            return Err(SettingsError::Invalid(format!(
                "queue.prefetch must be 1 so each worker holds one job at a time, got {}",
                self.queue.prefetch
            )));
        }
        if self.worker.stage_timeout_secs == 0 || self.worker.store_timeout_secs == 0 {
            return Err(SettingsError::Invalid(
                "worker timeouts must be greater than zero".to_string(),
            ));
        }

        let worst_case = self.processor_config().worst_case_duration();
        if self.reaper_config().stale_after <= worst_case {
            return Err(SettingsError::Invalid(format!(
                "worker.stale_after_secs ({}) must exceed the worst-case job duration of {}s",
                self.worker.stale_after_secs,
                worst_case.as_secs_f64()
            )));
        }
        Ok(())
    }

    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            stage_timeout: Duration::from_secs(self.worker.stage_timeout_secs),
            store_timeout: Duration::from_secs(self.worker.store_timeout_secs),
            completion_attempts: self.worker.completion_attempts,
            ..ProcessorConfig::default()
        }
    }

    pub fn reaper_config(&self) -> ReaperConfig {
        ReaperConfig {
            stale_after: Duration::from_secs(self.worker.stale_after_secs),
            interval: Duration::from_secs(self.worker.reap_interval_secs),
        }
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts: self.startup.max_attempts,
            base_delay: Duration::from_millis(self.startup.base_delay_ms),
            max_delay: Duration::from_millis(self.startup.max_delay_ms),
            deadline: Duration::from_secs(self.startup.deadline_secs),
            ..BackoffPolicy::default()
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.worker.shutdown_grace_secs)
    }

    pub fn gemini_request_timeout(&self) -> Duration {
        Duration::from_secs(self.gemini.request_timeout_secs)
    }

    pub fn tracing_config(&self, environment: Environment) -> TracingConfig {
        TracingConfig {
            environment: environment.to_string(),
            default_level: self.logging.level.clone(),
            json_format: self.logging.json,
        }
    }
}

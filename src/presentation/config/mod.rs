mod environment;
mod settings;

pub use environment::Environment;
pub use settings::{
    DatabaseSettings, GeminiSettings, LoggingSettings, QueueSettings, Settings, SettingsError,
    StartupSettings, WorkerSettings,
};

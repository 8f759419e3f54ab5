pub mod config;
mod shutdown;
mod worker;

pub use config::{Environment, Settings, SettingsError};
pub use shutdown::{ShutdownEvent, cancel_after_grace, wait_for_shutdown_signal};
pub use worker::{WorkerError, run_worker};

/// Configuration for tracing initialization.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub environment: String,
    /// Directive used when `RUST_LOG` is not set.
    pub default_level: String,
    pub json_format: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            environment: "local".to_string(),
            default_level: "info,examsmith=debug".to_string(),
            json_format: false,
        }
    }
}

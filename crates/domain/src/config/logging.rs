use serde::{Deserialize, Serialize};

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive (default: "info")
    /// Examples: "debug", "info,zonemux_application=trace"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit one JSON object per event instead of human readable lines
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

use super::RequestsLoggingLevel;
use crate::audio::OutputFormat;
use crate::config::DEFAULT_MAX_DURATION_SECONDS;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub metrics_port: u16,
    pub frontend_dir_path: Option<String>,
    /// Requested durations are clamped to this.
    pub max_duration_seconds: u32,
    pub output_format: OutputFormat,
    pub usage_cleanup_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            metrics_port: 9091,
            frontend_dir_path: None,
            max_duration_seconds: DEFAULT_MAX_DURATION_SECONDS,
            output_format: OutputFormat::Mp3,
            usage_cleanup_interval: Duration::from_secs(600),
        }
    }
}

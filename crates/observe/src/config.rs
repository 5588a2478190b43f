use tracing::Level;

/// How log events are filtered, formatted and where they are written.
#[derive(Debug, Clone)]
pub struct Config {
    /// https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
    pub(crate) env_filter: String,
    /// Events at this level or more severe go to stderr, the rest to stdout.
    pub(crate) stderr_threshold: Level,
    pub(crate) use_json_format: bool,
}

impl Config {
    pub fn new(env_filter: &str, use_json_format: bool) -> Self {
        Self {
            env_filter: env_filter.to_string(),
            use_json_format,
            ..Default::default()
        }
    }

    pub fn with_stderr_threshold(self, stderr_threshold: Level) -> Self {
        Self {
            stderr_threshold,
            ..self
        }
    }

    pub fn env_filter(&self) -> &str {
        &self.env_filter
    }

    pub fn use_json_format(&self) -> bool {
        self.use_json_format
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env_filter: "info".to_string(),
            stderr_threshold: Level::ERROR,
            use_json_format: false,
        }
    }
}

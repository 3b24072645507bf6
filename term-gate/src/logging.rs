//! Logging setup for gate runs.
//!
//! The crate logs through `tracing` with dotted field names (`dataset.name`,
//! `rule.type`, `rule.column`, `result.status`) so JSON output can be indexed
//! directly. Applications install a subscriber once, typically with
//! [`setup::init_logging`].

/// Shortens a field value for logging, keeping whole characters.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &value[..end])
}

pub mod setup {
    use crate::config::GateConfig;
    use crate::error::{GateError, Result};
    use tracing::Level;

    /// Subscriber configuration.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Level for everything outside this crate
        pub level: Level,
        /// Level for `term_gate` itself
        pub gate_level: Level,
        pub json_format: bool,
        /// Full filter directive, overriding both levels
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::WARN,
                gate_level: Level::INFO,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// JSON lines at INFO, for log shipping.
        pub fn structured() -> Self {
            Self {
                json_format: true,
                ..Self::default()
            }
        }

        /// Plain text with debug output from the gate.
        pub fn development() -> Self {
            Self {
                level: Level::INFO,
                gate_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        /// Uses the configuration document's `log_level` for the gate.
        pub fn from_gate_config(config: &GateConfig) -> Result<Self> {
            Ok(Self::default().with_gate_level(parse_level(&config.log_level)?))
        }

        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        pub fn with_gate_level(mut self, level: Level) -> Self {
            self.gate_level = level;
            self
        }

        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                format!(
                    "{},term_gate={}",
                    self.level.as_str().to_lowercase(),
                    self.gate_level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Parses a level name. Python-style `WARNING` and `CRITICAL` are accepted.
    pub fn parse_level(value: &str) -> Result<Level> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok(Level::TRACE),
            "DEBUG" => Ok(Level::DEBUG),
            "INFO" => Ok(Level::INFO),
            "WARN" | "WARNING" => Ok(Level::WARN),
            "ERROR" | "CRITICAL" => Ok(Level::ERROR),
            other => Err(GateError::config(format!("Unknown log_level '{other}'"))),
        }
    }

    /// Installs the global subscriber. `RUST_LOG` takes precedence over the
    /// configured filter. Fails if a subscriber is already installed.
    pub fn init_logging(config: LoggingConfig) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| GateError::Internal(format!("Failed to install logging: {e}")))
    }
}

//! Logging bootstrap from a configuration section.
//!
//! ```yaml
//! logging:
//!   level: debug
//!   filter: "configue=trace,app=info"
//!   format: compact
//!   ansi: false
//! ```

use crate::error::{ConfigueError, Result};
use crate::value::Value;
use serde::Deserialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

/// A logging section, as read from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default level when no `filter` is given.
    pub level: String,
    /// `EnvFilter` directives; takes precedence over `level`.
    pub filter: Option<String>,
    pub format: LogFormat,
    pub ansi: bool,
    /// Include the event target (module path) in each line.
    pub target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            filter: None,
            format: LogFormat::Full,
            ansi: false,
            target: true,
        }
    }
}

impl LoggingConfig {
    /// Read a logging section. `null` gives the defaults.
    pub fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.to_json()?).map_err(|err| ConfigueError::Logging {
            message: err.to_string(),
        })
    }

    pub fn env_filter(&self) -> Result<EnvFilter> {
        let directives = self.filter.as_deref().unwrap_or(&self.level);
        EnvFilter::try_new(directives).map_err(|err| ConfigueError::Logging {
            message: format!("invalid filter {directives:?}: {err}"),
        })
    }

    /// Install as the global subscriber, writing to stderr.
    ///
    /// Returns `false` when a global subscriber was already set; the
    /// existing one is kept.
    pub fn install(&self) -> Result<bool> {
        let filter = self.env_filter()?;
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(self.ansi)
            .with_target(self.target);

        let installed = match self.format {
            LogFormat::Full => builder.try_init(),
            LogFormat::Compact => builder.compact().try_init(),
        };

        match installed {
            Ok(()) => Ok(true),
            Err(err) => {
                warn!(error = %err, "Logging is already configured, keeping the existing subscriber");
                Ok(false)
            }
        }
    }
}

pub(crate) fn configure(value: &Value) -> Result<()> {
    LoggingConfig::from_value(value)?.install()?;
    Ok(())
}
